//! Device registry routes.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use fleet_core::{
    AssignRequest, AssignmentStatus, DeviceAssignment, DeviceRequest, TruckAssignment,
    UnassignOutcome, UnassignResponse, non_blank,
};
use fleet_storage::DeviceRegistry;

use crate::{ApiError, configured};

const REGISTRY_SETTINGS: &str = "DEVICE_MAP_DATABASE_URL";

/// State of the registry routes.
#[derive(Clone)]
pub struct RegistryState<R> {
    pub registry: Option<R>,
    /// Enrollment PIN. Unset accepts any submission.
    pub enroll_pin: Option<Arc<str>>,
}

/// Parse an optional JSON body; an empty body is the default value.
fn parse_body<T: serde::de::DeserializeOwned + Default>(body: &[u8]) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::Validation(format!("Invalid JSON body: {e}")))
}

/// `POST /api/assignDeviceTruck`
pub async fn assign_device_truck<R>(
    State(state): State<RegistryState<R>>,
    body: Bytes,
) -> Result<Json<AssignmentStatus>, ApiError>
where
    R: DeviceRegistry,
{
    let request: AssignRequest = parse_body(&body)?;
    let (Some(device_id), Some(truck)) = (
        non_blank(request.device_install_id.as_deref()),
        non_blank(request.truck_number.as_deref()),
    ) else {
        return Err(ApiError::Validation(
            "Missing deviceInstallId or truckNumber".into(),
        ));
    };

    let submitted = request.pin.as_deref().map(str::trim);
    if state
        .enroll_pin
        .as_deref()
        .is_some_and(|expected| submitted != Some(expected))
    {
        tracing::warn!(device_id = %device_id, "enrollment rejected: PIN mismatch");
        return Err(ApiError::Forbidden("Invalid PIN".into()));
    }

    let registry = configured(&state.registry, REGISTRY_SETTINGS)?;
    let assignment = registry.assign(device_id, truck)?;

    tracing::info!(device_id = %device_id, truck = %assignment.truck_number, "device enrolled");

    Ok(Json(AssignmentStatus::Assigned {
        truck_number: assignment.truck_number,
    }))
}

/// `POST /api/resolveDeviceTruck`
pub async fn resolve_device_truck<R>(
    State(state): State<RegistryState<R>>,
    body: Bytes,
) -> Result<Json<AssignmentStatus>, ApiError>
where
    R: DeviceRegistry,
{
    let request: DeviceRequest = parse_body(&body)?;
    let device_id = non_blank(request.device_install_id.as_deref())
        .ok_or_else(|| ApiError::Validation("Missing deviceInstallId".into()))?;

    let registry = configured(&state.registry, REGISTRY_SETTINGS)?;
    let status = match fleet_service::truck_for_device(registry, device_id)? {
        TruckAssignment::Assigned(truck_number) => AssignmentStatus::Assigned { truck_number },
        TruckAssignment::Unassigned => AssignmentStatus::Unassigned,
    };

    tracing::debug!(device_id = %device_id, status = ?status, "resolved device");
    Ok(Json(status))
}

/// `GET /api/unassignDevice?deviceInstallId=`
pub async fn unassign_device_query<R>(
    State(state): State<RegistryState<R>>,
    Query(query): Query<DeviceRequest>,
) -> Result<Json<UnassignResponse>, ApiError>
where
    R: DeviceRegistry,
{
    unassign(&state, query.device_install_id.as_deref())
}

/// `POST /api/unassignDevice`, with the device id in the query or the body.
pub async fn unassign_device_body<R>(
    State(state): State<RegistryState<R>>,
    Query(query): Query<DeviceRequest>,
    body: Bytes,
) -> Result<Json<UnassignResponse>, ApiError>
where
    R: DeviceRegistry,
{
    if non_blank(query.device_install_id.as_deref()).is_some() {
        return unassign(&state, query.device_install_id.as_deref());
    }
    let request: DeviceRequest = parse_body(&body)?;
    unassign(&state, request.device_install_id.as_deref())
}

fn unassign<R: DeviceRegistry>(
    state: &RegistryState<R>,
    device_id: Option<&str>,
) -> Result<Json<UnassignResponse>, ApiError> {
    let device_id = non_blank(device_id)
        .ok_or_else(|| ApiError::Validation("Missing deviceInstallId".into()))?;
    let registry = configured(&state.registry, REGISTRY_SETTINGS)?;

    let message = match registry.unassign(device_id)? {
        UnassignOutcome::Unassigned => {
            tracing::info!(device_id = %device_id, "device unassigned");
            "Device unassigned."
        }
        UnassignOutcome::AlreadyUnassigned => "Device was not assigned.",
    };

    Ok(Json(UnassignResponse {
        ok: true,
        device_install_id: device_id.to_string(),
        message: message.to_string(),
    }))
}

/// `GET /api/devices`
pub async fn list_devices<R>(
    State(state): State<RegistryState<R>>,
) -> Result<Json<Vec<DeviceAssignment>>, ApiError>
where
    R: DeviceRegistry,
{
    let registry = configured(&state.registry, REGISTRY_SETTINGS)?;
    Ok(Json(registry.list_assignments()?))
}
