//! Diesel schema definitions.

diesel::table! {
    device_assignments (partition_key, device_id) {
        partition_key -> Text,
        device_id -> Text,
        truck_number -> Text,
        updated_at -> Timestamp,
    }
}
