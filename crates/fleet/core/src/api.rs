//! Request and response bodies of the HTTP surface.

use serde::{Deserialize, Deserializer, Serialize};

/// Body of an assignment request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    #[serde(default)]
    pub device_install_id: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub truck_number: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub pin: Option<String>,
}

/// Body of a request naming only a device.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRequest {
    #[serde(default)]
    pub device_install_id: Option<String>,
}

/// Assignment state of a device, returned by assign and resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AssignmentStatus {
    Assigned {
        #[serde(rename = "truckNumber")]
        truck_number: String,
    },
    Unassigned,
}

/// Result of an unassignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnassignResponse {
    pub ok: bool,
    pub device_install_id: String,
    pub message: String,
}

/// Truck currently driven by a driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedTruckResponse {
    pub truck_number: String,
}

/// Error body for every failing route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Outcome of one document sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Truck the designated account is assigned to, if any.
    pub assigned_truck: Option<String>,
    /// Documents uploaded into the assigned folder.
    pub uploaded: Vec<String>,
    /// Documents already present by name.
    pub skipped: Vec<String>,
    /// Documents whose download or upload failed.
    pub failed: Vec<String>,
    /// Folders whose grant was revoked.
    pub revoked: Vec<String>,
    /// Folders newly shared.
    pub granted: Vec<String>,
}

/// Tablets post truck numbers and PINs either as strings or as bare numbers.
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextOrNumber {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(
        Option::<TextOrNumber>::deserialize(deserializer)?.map(|v| match v {
            TextOrNumber::Text(s) => s,
            TextOrNumber::Number(n) => n.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_truck_number() {
        let req: AssignRequest = serde_json::from_str(
            r#"{"deviceInstallId":"dev-abc","truckNumber":4521,"pin":"0000"}"#,
        )
        .unwrap();
        assert_eq!(req.truck_number.as_deref(), Some("4521"));
        assert_eq!(req.pin.as_deref(), Some("0000"));
    }

    #[test]
    fn test_missing_fields_default() {
        let req: AssignRequest = serde_json::from_str("{}").unwrap();
        assert!(req.device_install_id.is_none());
        assert!(req.truck_number.is_none());
    }

    #[test]
    fn test_status_wire_format() {
        let assigned = AssignmentStatus::Assigned {
            truck_number: "4521".into(),
        };
        assert_eq!(
            serde_json::to_value(&assigned).unwrap(),
            serde_json::json!({ "status": "assigned", "truckNumber": "4521" })
        );
        assert_eq!(
            serde_json::to_value(AssignmentStatus::Unassigned).unwrap(),
            serde_json::json!({ "status": "unassigned" })
        );
    }
}
