//! Service wiring and the periodic sync loop.

use std::time::Duration;

use axum::Router;
use color_eyre::eyre::WrapErr as _;
use fleet_service::{DocumentLocator, DocumentSyncer, TruckResolver};
use fleet_storage::SqliteStorage;
use fleet_upstream::{
    DocumentLibrary, FolderTreeClient, GraphClient, IdentityClient, LibraryClient, Telematics,
    TelematicsClient, TokenSource, TruckFolders,
};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

pub type Resolver = TruckResolver<TelematicsClient>;
pub type Locator = DocumentLocator<IdentityClient, LibraryClient>;
pub type Syncer = DocumentSyncer<TelematicsClient, IdentityClient, LibraryClient, FolderTreeClient>;

/// Services built from whatever configuration is present.
#[derive(Clone, Default)]
pub struct Services {
    pub registry: Option<SqliteStorage>,
    pub resolver: Option<Resolver>,
    pub locator: Option<Locator>,
    pub syncer: Option<Syncer>,
}

impl Services {
    pub fn from_config(config: &ServerConfig) -> color_eyre::eyre::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("truckdocs-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .wrap_err("failed to build HTTP client")?;

        let registry = match config.database_url() {
            Some(url) => {
                let storage =
                    SqliteStorage::new(url).wrap_err("failed to initialize device registry")?;
                storage
                    .run_migrations()
                    .wrap_err("failed to run migrations")?;
                Some(storage)
            }
            None => {
                tracing::warn!("DEVICE_MAP_DATABASE_URL not set, device routes disabled");
                None
            }
        };

        let resolver = match config.samsara_token() {
            Some(token) => Some(TruckResolver::new(
                TelematicsClient::new(http.clone(), &config.samsara_base_url, token),
                config.reserved_prefixes(),
            )),
            None => {
                tracing::warn!("SAMSARA_API_TOKEN not set, driver lookup and sync disabled");
                None
            }
        };

        let graph = config
            .graph()
            .map(|settings| -> color_eyre::eyre::Result<_> {
                let client = GraphClient::new(http.clone(), &config.graph_base_url)?;
                let tokens = IdentityClient::new(
                    http.clone(),
                    &config.graph_login_url,
                    settings.tenant_id,
                    settings.client_id,
                    settings.client_secret,
                );
                let library = LibraryClient::new(client.clone(), settings.site_id, settings.drive_id);
                Ok((client, DocumentLocator::new(tokens, library)))
            })
            .transpose()?;
        if graph.is_none() {
            tracing::warn!("graph settings incomplete, document routes and sync disabled");
        }

        let syncer = match (&resolver, &graph, config.truckdocs_user_id()) {
            (Some(resolver), Some((client, locator)), Some(owner)) => Some(DocumentSyncer::new(
                resolver.clone(),
                locator.clone(),
                FolderTreeClient::new(client.clone(), owner),
                &config.test_driver_name,
            )),
            _ => {
                tracing::warn!("sync not configured");
                None
            }
        };

        Ok(Self {
            registry,
            resolver,
            locator: graph.map(|(_, locator)| locator),
            syncer,
        })
    }
}

/// Build the full application router.
pub fn router(services: &Services, enroll_pin: Option<String>) -> Router {
    Router::new()
        .merge(fleet_http::registry_router(
            services.registry.clone(),
            enroll_pin,
        ))
        .merge(fleet_http::driver_router(services.resolver.clone()))
        .merge(fleet_http::document_router(services.locator.clone()))
        .merge(fleet_http::sync_router(services.syncer.clone()))
        .layer(axum::middleware::from_fn(fleet_http::logging_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Run sync passes forever on a fixed interval. The first pass runs
/// immediately; a failed pass is logged and the loop carries on.
pub async fn sync_loop<T, K, L, F>(syncer: DocumentSyncer<T, K, L, F>, every: Duration)
where
    T: Telematics,
    K: TokenSource,
    L: DocumentLibrary,
    F: TruckFolders,
{
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        match syncer.run_once().await {
            Ok(report) => tracing::info!(
                truck = ?report.assigned_truck,
                uploaded = report.uploaded.len(),
                failed = report.failed.len(),
                "scheduled sync finished"
            ),
            Err(e) => tracing::error!(error = ?e, "scheduled sync failed"),
        }
    }
}
