//! Truck documents server.

use clap::Parser as _;
use color_eyre::eyre::WrapErr as _;
use truckdocs_server::app::{self, Services};
use truckdocs_server::config::ServerConfig;

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = ServerConfig::parse();
    tracing::info!("truckdocs-server starting");

    let services = Services::from_config(&config)?;

    match (&services.syncer, config.sync_interval()) {
        (Some(syncer), Some(every)) => {
            tracing::info!(every_secs = every.as_secs(), "scheduling document sync");
            tokio::spawn(app::sync_loop(syncer.clone(), every));
        }
        (Some(_), None) => tracing::info!("scheduled sync disabled"),
        (None, _) => {}
    }

    let app = app::router(&services, config.enroll_pin());

    tracing::info!(addr = %config.bind_addr, "listening");

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .wrap_err("failed to bind")?;

    axum::serve(listener, app).await.wrap_err("server error")?;

    Ok(())
}
