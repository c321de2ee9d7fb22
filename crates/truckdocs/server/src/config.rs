//! Server configuration from flags and environment.

use std::net::SocketAddr;

use fleet_core::ReservedPrefixes;

/// Truck documents server.
///
/// Every upstream setting is optional. Routes whose settings are missing
/// stay mounted and answer with a configuration error.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "truckdocs-server", version)]
pub struct ServerConfig {
    /// Listen address.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: SocketAddr,

    /// SQLite database path of the device registry.
    #[arg(long, env = "DEVICE_MAP_DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, env = "SAMSARA_API_TOKEN", hide_env_values = true)]
    pub samsara_api_token: Option<String>,

    #[arg(long, env = "SAMSARA_BASE_URL", default_value = fleet_upstream::DEFAULT_TELEMATICS_URL)]
    pub samsara_base_url: String,

    #[arg(long, env = "GRAPH_TENANT_ID")]
    pub graph_tenant_id: Option<String>,

    #[arg(long, env = "GRAPH_CLIENT_ID")]
    pub graph_client_id: Option<String>,

    #[arg(long, env = "GRAPH_CLIENT_SECRET", hide_env_values = true)]
    pub graph_client_secret: Option<String>,

    /// Site holding the document library.
    #[arg(long, env = "GRAPH_SITE_ID")]
    pub graph_site_id: Option<String>,

    /// Drive of the document library.
    #[arg(long, env = "GRAPH_DRIVE_ID")]
    pub graph_drive_id: Option<String>,

    #[arg(long, env = "GRAPH_BASE_URL", default_value = fleet_upstream::DEFAULT_GRAPH_URL)]
    pub graph_base_url: String,

    #[arg(long, env = "GRAPH_LOGIN_URL", default_value = fleet_upstream::DEFAULT_LOGIN_URL)]
    pub graph_login_url: String,

    /// User whose drive holds the per-truck folders.
    #[arg(long, env = "TRUCKDOCS_USER_ID")]
    pub truckdocs_user_id: Option<String>,

    /// Display name of the account whose folder access follows its truck.
    #[arg(long, env = "TEST_DRIVER_NAME", default_value = fleet_service::DEFAULT_TEST_DRIVER)]
    pub test_driver_name: String,

    /// Comma-separated vehicle name prefixes never treated as trucks.
    #[arg(long, env = "RESERVED_VEHICLE_PREFIXES")]
    pub reserved_vehicle_prefixes: Option<String>,

    /// PIN required to enroll a device. Unset accepts any enrollment.
    #[arg(long, env = "DEVICE_ENROLL_PIN", hide_env_values = true)]
    pub device_enroll_pin: Option<String>,

    /// Seconds between sync passes; 0 disables the loop.
    #[arg(long, env = "SYNC_INTERVAL_SECS", default_value_t = 300)]
    pub sync_interval_secs: u64,
}

/// Settings of the graph document library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphSettings<'a> {
    pub tenant_id: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub site_id: &'a str,
    pub drive_id: &'a str,
}

fn present(value: &Option<String>) -> Option<&str> {
    fleet_core::non_blank(value.as_deref())
}

impl ServerConfig {
    pub fn reserved_prefixes(&self) -> ReservedPrefixes {
        match present(&self.reserved_vehicle_prefixes) {
            Some(list) => ReservedPrefixes::parse(list),
            None => ReservedPrefixes::default(),
        }
    }

    pub fn enroll_pin(&self) -> Option<String> {
        present(&self.device_enroll_pin).map(str::to_string)
    }

    pub fn database_url(&self) -> Option<&str> {
        present(&self.database_url)
    }

    pub fn samsara_token(&self) -> Option<&str> {
        present(&self.samsara_api_token)
    }

    pub fn truckdocs_user_id(&self) -> Option<&str> {
        present(&self.truckdocs_user_id)
    }

    /// The graph settings, if all of them are present.
    pub fn graph(&self) -> Option<GraphSettings<'_>> {
        Some(GraphSettings {
            tenant_id: present(&self.graph_tenant_id)?,
            client_id: present(&self.graph_client_id)?,
            client_secret: present(&self.graph_client_secret)?,
            site_id: present(&self.graph_site_id)?,
            drive_id: present(&self.graph_drive_id)?,
        })
    }

    /// Interval of the sync loop, `None` when disabled.
    pub fn sync_interval(&self) -> Option<std::time::Duration> {
        (self.sync_interval_secs > 0)
            .then(|| std::time::Duration::from_secs(self.sync_interval_secs))
    }
}

#[cfg(test)]
impl ServerConfig {
    /// Parse flags only, ignoring the process environment.
    pub(crate) fn from_flags(args: &[&str]) -> ServerConfig {
        use clap::{CommandFactory as _, FromArgMatches as _};

        let matches = ServerConfig::command()
            .mut_args(|arg| arg.env(None::<&'static str>))
            .try_get_matches_from(std::iter::once("truckdocs-server").chain(args.iter().copied()))
            .unwrap();
        ServerConfig::from_arg_matches(&matches).unwrap()
    }
}
