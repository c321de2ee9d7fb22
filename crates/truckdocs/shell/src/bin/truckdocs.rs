//! Truck documents terminal client.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::WrapErr as _;
use truckdocs_shell::{
    ApiClient, ConsoleSink, DEFAULT_API_BASE, DeviceIdentity, DirCache, OfflineCache as _,
    PromptEnroller, Shell, ShellBackend as _, StatusSink as _,
};

#[derive(Parser)]
#[command(name = "truckdocs")]
#[command(about = "Truck documents on a fleet tablet", long_about = None)]
struct Cli {
    /// Base URL of the truck documents API.
    #[arg(long, env = "TRUCKDOCS_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// Directory holding the device id and offline documents.
    #[arg(long, env = "TRUCKDOCS_DATA_DIR", default_value = ".truckdocs")]
    data_dir: PathBuf,

    /// Do not contact the server; show offline documents only.
    #[arg(long)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve or enroll this device, list its truck's documents, and
    /// refresh the offline copies (default)
    Run {
        /// Ask for a PIN during enrollment
        #[arg(long)]
        pin: bool,
    },

    /// Release this device from its truck
    Unassign,

    /// List documents available offline
    ListCached,

    /// Write an offline document to a file
    Open {
        /// Document name as listed by `list-cached`
        name: String,

        /// Output path, defaults to the document name
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cache = DirCache::new(cli.data_dir.join("cache"));

    match cli.command.unwrap_or(Commands::Run { pin: false }) {
        Commands::Run { pin } => {
            let identity = DeviceIdentity::load_or_create(&cli.data_dir)?;
            let mut shell = Shell::new(
                api_client(&cli.api_base)?,
                cache,
                PromptEnroller::stdio(pin),
                ConsoleSink,
                identity.id(),
            );
            shell.run(cli.offline).await?;
        }
        Commands::Unassign => {
            if cli.offline {
                color_eyre::eyre::bail!("unassign needs the server; drop --offline");
            }
            let identity = DeviceIdentity::load_or_create(&cli.data_dir)?;
            let response = api_client(&cli.api_base)?.unassign(identity.id()).await?;
            println!("{}", response.message);
        }
        Commands::ListCached => {
            let entries = cache.list()?;
            ConsoleSink.cached(&entries);
        }
        Commands::Open { name, output } => {
            let bytes = cache
                .read(&name)?
                .ok_or_else(|| color_eyre::eyre::eyre!("{name} is not available offline"))?;
            let output = output.unwrap_or_else(|| PathBuf::from(&name));
            std::fs::write(&output, bytes)
                .wrap_err_with(|| format!("failed to write {}", output.display()))?;
            println!("Saved {}", output.display());
        }
    }

    Ok(())
}

fn api_client(base: &str) -> color_eyre::eyre::Result<ApiClient> {
    let http = reqwest::Client::builder()
        .user_agent(concat!("truckdocs/", env!("CARGO_PKG_VERSION")))
        .build()
        .wrap_err("failed to build HTTP client")?;
    Ok(ApiClient::new(http, base))
}
