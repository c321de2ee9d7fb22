//! Storage traits.

use fleet_core::{DeviceAssignment, TruckAssignment, UnassignOutcome};

/// Device to truck mapping operations.
pub trait DeviceRegistry: Send + Sync {
    /// Map a device to a truck, replacing any prior truck.
    fn assign(&self, device_id: &str, truck: &str) -> color_eyre::eyre::Result<DeviceAssignment>;

    /// Look up the truck a device is mapped to.
    fn resolve(&self, device_id: &str) -> color_eyre::eyre::Result<TruckAssignment>;

    /// Clear the truck of a device, keeping its row.
    fn unassign(&self, device_id: &str) -> color_eyre::eyre::Result<UnassignOutcome>;

    /// List every stored mapping.
    fn list_assignments(&self) -> color_eyre::eyre::Result<Vec<DeviceAssignment>>;
}
