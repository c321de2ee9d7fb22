//! Driver lookup and truck document routes.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use fleet_core::{AssignedTruckResponse, TruckDocument, non_blank};
use fleet_service::{DocumentLocator, DriverTruck, TruckResolver};
use fleet_upstream::{DocumentLibrary, Telematics, TokenSource};

use crate::{ApiError, configured};

const TELEMATICS_SETTINGS: &str = "SAMSARA_API_TOKEN";
const GRAPH_SETTINGS: &str =
    "GRAPH_TENANT_ID, GRAPH_CLIENT_ID, GRAPH_CLIENT_SECRET, GRAPH_SITE_ID or GRAPH_DRIVE_ID";

#[derive(Debug, serde::Deserialize)]
pub struct DriverQuery {
    #[serde(default)]
    pub driver: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct TruckQuery {
    #[serde(default)]
    pub truck: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemQuery {
    #[serde(default)]
    pub item_id: Option<String>,
}

/// `GET /api/getAssignedTruck?driver=`
pub async fn get_assigned_truck<T>(
    State(resolver): State<Option<TruckResolver<T>>>,
    Query(query): Query<DriverQuery>,
) -> Result<Json<AssignedTruckResponse>, ApiError>
where
    T: Telematics,
{
    let driver = non_blank(query.driver.as_deref())
        .ok_or_else(|| ApiError::Validation("Missing driver".into()))?;
    let resolver = configured(&resolver, TELEMATICS_SETTINGS)?;

    match resolver.truck_for_driver(driver).await? {
        DriverTruck::Assigned(truck_number) => Ok(Json(AssignedTruckResponse { truck_number })),
        DriverTruck::DriverNotFound => Err(ApiError::NotFound("Driver not found".into())),
        DriverTruck::NoVehicleAssigned => Err(ApiError::NotFound(
            "Driver not currently assigned to a vehicle".into(),
        )),
    }
}

/// `GET /api/getTruckDocuments?truck=`
pub async fn get_truck_documents<K, L>(
    State(locator): State<Option<DocumentLocator<K, L>>>,
    Query(query): Query<TruckQuery>,
) -> Result<Json<Vec<TruckDocument>>, ApiError>
where
    K: TokenSource,
    L: DocumentLibrary,
{
    let truck = non_blank(query.truck.as_deref())
        .ok_or_else(|| ApiError::Validation("Missing truck".into()))?;
    let locator = configured(&locator, GRAPH_SETTINGS)?;

    let documents = locator.documents_for_truck(truck).await?;
    tracing::info!(truck = %truck, count = documents.len(), "listed truck documents");
    Ok(Json(documents))
}

/// `GET /api/viewTruckDocument?itemId=`
pub async fn view_truck_document<K, L>(
    State(locator): State<Option<DocumentLocator<K, L>>>,
    Query(query): Query<ItemQuery>,
) -> Result<Response, ApiError>
where
    K: TokenSource,
    L: DocumentLibrary,
{
    let item_id = non_blank(query.item_id.as_deref())
        .ok_or_else(|| ApiError::Validation("Missing itemId".into()))?;
    let locator = configured(&locator, GRAPH_SETTINGS)?;

    let content = locator.open_document(item_id).await?;

    let content_type = HeaderValue::from_str(&content.mime_type)
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&format!(
        "inline; filename=\"{}\"",
        header_safe_file_name(&content.file_name)
    ))
    .unwrap_or(HeaderValue::from_static("inline"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
            (
                header::CACHE_CONTROL,
                HeaderValue::from_static("private, max-age=0, must-revalidate"),
            ),
        ],
        content.bytes,
    )
        .into_response())
}

/// Keep printable ASCII only; quotes and backslashes would end the
/// quoted filename early.
fn header_safe_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect()
}
