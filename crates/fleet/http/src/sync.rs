//! On-demand document sync.

use axum::Json;
use axum::extract::State;
use fleet_core::SyncReport;
use fleet_service::DocumentSyncer;
use fleet_upstream::{DocumentLibrary, Telematics, TokenSource, TruckFolders};

use crate::{ApiError, configured};

const SYNC_SETTINGS: &str = "SAMSARA_API_TOKEN, graph settings or TRUCKDOCS_USER_ID";

/// `POST /api/sync`
pub async fn run_sync<T, K, L, F>(
    State(syncer): State<Option<DocumentSyncer<T, K, L, F>>>,
) -> Result<Json<SyncReport>, ApiError>
where
    T: Telematics,
    K: TokenSource,
    L: DocumentLibrary,
    F: TruckFolders,
{
    let syncer = configured(&syncer, SYNC_SETTINGS)?;
    tracing::info!("sync requested");
    Ok(Json(syncer.run_once().await?))
}
