//! Fleet HTTP Layer
//!
//! Axum handlers for device enrollment, driver lookup, truck documents, and
//! on-demand sync. Every route lives under `/api`.

mod devices;
mod error;
mod middleware;
mod sync;
mod trucks;

pub use devices::*;
pub use error::ApiError;
pub use middleware::*;
pub use sync::*;
pub use trucks::*;

pub(crate) use error::configured;

use axum::Router;
use fleet_service::{DocumentLocator, DocumentSyncer, TruckResolver};
use fleet_storage::DeviceRegistry;
use fleet_upstream::{DocumentLibrary, Telematics, TokenSource, TruckFolders};

/// Create the device registry router.
///
/// A `None` registry keeps the routes mounted; they answer with a
/// configuration error.
pub fn registry_router<R>(registry: Option<R>, enroll_pin: Option<String>) -> Router
where
    R: DeviceRegistry + Clone + 'static,
{
    use axum::routing::{get, post};

    Router::new()
        .route("/api/assignDeviceTruck", post(assign_device_truck::<R>))
        .route("/api/resolveDeviceTruck", post(resolve_device_truck::<R>))
        .route(
            "/api/unassignDevice",
            get(unassign_device_query::<R>).post(unassign_device_body::<R>),
        )
        .route("/api/devices", get(list_devices::<R>))
        .with_state(RegistryState {
            registry,
            enroll_pin: enroll_pin.map(Into::into),
        })
}

/// Create the driver lookup router.
pub fn driver_router<T>(resolver: Option<TruckResolver<T>>) -> Router
where
    T: Telematics + Clone + 'static,
{
    use axum::routing::get;

    Router::new()
        .route("/api/getAssignedTruck", get(get_assigned_truck::<T>))
        .with_state(resolver)
}

/// Create the truck document router.
pub fn document_router<K, L>(locator: Option<DocumentLocator<K, L>>) -> Router
where
    K: TokenSource + Clone + 'static,
    L: DocumentLibrary + Clone + 'static,
{
    use axum::routing::get;

    Router::new()
        .route("/api/getTruckDocuments", get(get_truck_documents::<K, L>))
        .route("/api/viewTruckDocument", get(view_truck_document::<K, L>))
        .with_state(locator)
}

/// Create the sync router.
pub fn sync_router<T, K, L, F>(syncer: Option<DocumentSyncer<T, K, L, F>>) -> Router
where
    T: Telematics + Clone + 'static,
    K: TokenSource + Clone + 'static,
    L: DocumentLibrary + Clone + 'static,
    F: TruckFolders + Clone + 'static,
{
    use axum::routing::post;

    Router::new()
        .route("/api/sync", post(run_sync::<T, K, L, F>))
        .with_state(syncer)
}
