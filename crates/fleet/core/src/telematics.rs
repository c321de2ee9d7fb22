//! Telematics records: drivers, vehicles, and their assignments.

use std::collections::HashMap;

/// Fallback truck number when a vehicle has neither an asset id nor a name.
pub const UNKNOWN_TRUCK: &str = "Unknown";

/// A telematics driver.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Driver {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// A telematics vehicle reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub external_ids: HashMap<String, String>,
}

impl Vehicle {
    /// Truck number for this vehicle: external asset id, then name.
    pub fn truck_number(&self) -> String {
        self.external_ids
            .get("assetId")
            .filter(|id| !id.is_empty())
            .or(self.name.as_ref().filter(|name| !name.is_empty()))
            .cloned()
            .unwrap_or_else(|| UNKNOWN_TRUCK.to_string())
    }
}

/// Driver reference inside an assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DriverRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A driver-vehicle assignment from the telematics feed.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverVehicleAssignment {
    #[serde(default)]
    pub driver: Option<DriverRef>,
    #[serde(default)]
    pub vehicle: Option<Vehicle>,
    #[serde(default)]
    pub assignment_type: Option<String>,
}

/// Vehicle name prefixes that mark test or rental units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedPrefixes(Vec<String>);

impl ReservedPrefixes {
    /// Build from a list of prefixes. Blank entries are dropped.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            prefixes
                .into_iter()
                .map(Into::into)
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        )
    }

    /// Parse a comma separated list, e.g. `RT-,VT-`.
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    /// Check whether a vehicle is reserved.
    pub fn is_reserved(&self, vehicle: &Vehicle) -> bool {
        let truck = vehicle.truck_number();
        let candidates = [vehicle.name.as_deref(), Some(truck.as_str())];
        candidates
            .into_iter()
            .flatten()
            .any(|value| self.0.iter().any(|p| value.starts_with(p.as_str())))
    }
}

impl Default for ReservedPrefixes {
    fn default() -> Self {
        Self::new(["RT-", "VT-"])
    }
}

/// Find a driver by display name.
///
/// An exact case-insensitive match wins; otherwise the first driver whose
/// name contains the query (case-insensitive) is returned.
pub fn match_driver<'a>(drivers: &'a [Driver], query: &str) -> Option<&'a Driver> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return None;
    }

    drivers
        .iter()
        .find(|d| d.name.to_lowercase() == query)
        .or_else(|| drivers.iter().find(|d| d.name.to_lowercase().contains(&query)))
}

/// Find the current vehicle assignment for a driver id, skipping reserved vehicles.
pub fn current_assignment<'a>(
    assignments: &'a [DriverVehicleAssignment],
    driver_id: &str,
    reserved: &ReservedPrefixes,
) -> Option<&'a Vehicle> {
    assignments.iter().find_map(|a| {
        let driver = a.driver.as_ref()?;
        let vehicle = a.vehicle.as_ref()?;
        if driver.id.as_deref() != Some(driver_id) || vehicle.id.is_none() {
            return None;
        }
        (!reserved.is_reserved(vehicle)).then_some(vehicle)
    })
}
