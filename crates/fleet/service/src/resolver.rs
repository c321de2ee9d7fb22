//! Truck resolution by driver name or by device.

use color_eyre::eyre::WrapErr as _;
use fleet_core::{ReservedPrefixes, TruckAssignment, current_assignment, match_driver};
use fleet_storage::DeviceRegistry;
use fleet_upstream::Telematics;

/// Outcome of resolving a driver's truck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverTruck {
    /// The driver is currently assigned to this truck.
    Assigned(String),
    /// No driver matched the name.
    DriverNotFound,
    /// The driver exists but has no current vehicle.
    NoVehicleAssigned,
}

impl DriverTruck {
    /// The assigned truck, if any.
    pub fn truck(&self) -> Option<&str> {
        match self {
            Self::Assigned(truck) => Some(truck),
            _ => None,
        }
    }
}

/// Resolves drivers to trucks through the telematics feed.
#[derive(Clone)]
pub struct TruckResolver<T> {
    telematics: T,
    reserved: ReservedPrefixes,
    window: Option<chrono::TimeDelta>,
}

impl<T> TruckResolver<T> {
    /// Create a resolver skipping vehicles with the given reserved prefixes.
    pub fn new(telematics: T, reserved: ReservedPrefixes) -> Self {
        Self {
            telematics,
            reserved,
            window: None,
        }
    }

    /// Only consider assignments that started within `window` of now.
    pub fn recent(mut self, window: chrono::TimeDelta) -> Self {
        self.window = Some(window);
        self
    }
}

impl<T: Telematics> TruckResolver<T> {
    /// Find the truck a driver is currently assigned to.
    pub async fn truck_for_driver(&self, driver_name: &str) -> color_eyre::eyre::Result<DriverTruck> {
        let drivers = self
            .telematics
            .list_drivers()
            .await
            .wrap_err("failed to list drivers")?;

        let Some(driver) = match_driver(&drivers, driver_name) else {
            tracing::info!(driver = %driver_name, "driver not found");
            return Ok(DriverTruck::DriverNotFound);
        };

        tracing::info!(driver = %driver.name, driver_id = %driver.id, "matched driver");

        let since = self.window.map(|window| chrono::Utc::now() - window);
        let assignments = self
            .telematics
            .list_assignments(since)
            .await
            .wrap_err("failed to list driver-vehicle assignments")?;

        match current_assignment(&assignments, &driver.id, &self.reserved) {
            Some(vehicle) => {
                let truck = vehicle.truck_number();
                tracing::info!(driver_id = %driver.id, truck = %truck, "resolved assigned truck");
                Ok(DriverTruck::Assigned(truck))
            }
            None => Ok(DriverTruck::NoVehicleAssigned),
        }
    }
}

/// Look up the truck a device is mapped to.
pub fn truck_for_device<R: DeviceRegistry>(
    registry: &R,
    device_id: &str,
) -> color_eyre::eyre::Result<TruckAssignment> {
    registry
        .resolve(device_id)
        .wrap_err_with(|| format!("failed to resolve device {device_id}"))
}
