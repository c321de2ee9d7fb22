//! Device to truck mapping types.

/// Partition under which every device row is stored.
pub const DEVICE_PARTITION: &str = "DEVICE";

/// A stored device assignment.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAssignment {
    /// Opaque identifier generated on the tablet.
    pub device_install_id: String,
    /// Assigned truck. Empty when the device was unassigned.
    pub truck_number: String,
    /// Last time the row was written.
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl DeviceAssignment {
    /// The current truck, if any.
    pub fn truck(&self) -> Option<&str> {
        let truck = self.truck_number.trim();
        (!truck.is_empty()).then_some(truck)
    }
}

/// Result of resolving a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TruckAssignment {
    /// The device is mapped to this truck.
    Assigned(String),
    /// No row exists or the truck was cleared.
    Unassigned,
}

impl TruckAssignment {
    /// Build from an optional stored row.
    pub fn from_row(row: Option<&DeviceAssignment>) -> Self {
        match row.and_then(DeviceAssignment::truck) {
            Some(truck) => Self::Assigned(truck.to_string()),
            None => Self::Unassigned,
        }
    }

    /// The assigned truck, if any.
    pub fn truck(&self) -> Option<&str> {
        match self {
            Self::Assigned(truck) => Some(truck),
            Self::Unassigned => None,
        }
    }
}

/// Result of unassigning a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnassignOutcome {
    /// A row existed and its truck was cleared.
    Unassigned,
    /// There was nothing to clear.
    AlreadyUnassigned,
}

/// Trim a request field, treating blank values as missing.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
