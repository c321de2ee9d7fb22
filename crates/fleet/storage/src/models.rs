//! Database models.

use diesel::prelude::*;

use crate::schema::device_assignments;

/// Device assignment record.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = device_assignments, primary_key(partition_key, device_id))]
pub struct DeviceAssignmentRow {
    pub partition_key: String,
    pub device_id: String,
    pub truck_number: String,
    pub updated_at: chrono::NaiveDateTime,
}

impl From<DeviceAssignmentRow> for fleet_core::DeviceAssignment {
    fn from(row: DeviceAssignmentRow) -> Self {
        Self {
            device_install_id: row.device_id,
            truck_number: row.truck_number,
            updated_at: chrono::DateTime::from_naive_utc_and_offset(row.updated_at, chrono::Utc),
        }
    }
}

/// New device assignment for insertion.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = device_assignments)]
pub struct NewDeviceAssignment<'a> {
    pub partition_key: &'a str,
    pub device_id: &'a str,
    pub truck_number: &'a str,
    pub updated_at: chrono::NaiveDateTime,
}
