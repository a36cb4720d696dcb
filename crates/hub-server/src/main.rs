use clap::Parser;
use hub_server::api::{ApiServer, AppState};
use hub_server::config::Config;
use hub_server::store::HubStore;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "mockhub", about = "Management hub for WireMock instances")]
struct Args {
    /// Path to a YAML config file.
    #[arg(short, long, env = "MOCKHUB_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, overrides the config file.
    #[arg(short, long, env = "MOCKHUB_LISTEN")]
    listen: Option<SocketAddr>,

    /// JSON snapshot file for stored data, overrides the config file.
    #[arg(short, long, env = "MOCKHUB_DATA_FILE")]
    data_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if let Some(data_file) = args.data_file {
        config.data_file = Some(data_file);
    }

    let store = match &config.data_file {
        Some(path) => {
            info!("Persisting hub data to {}", path.display());
            HubStore::load(path)?
        }
        None => {
            info!("No data file configured, running in-memory");
            HubStore::in_memory()
        }
    };

    let state = Arc::new(AppState::new(Arc::new(store), &config.wiremock));
    ApiServer::new(config.listen, state).run().await
}
