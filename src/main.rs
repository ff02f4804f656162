//! rest-pipeline server binary.
//!
//! Serves every configured collection from an in-memory store.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use rest_pipeline::collection::MemoryCollection;
use rest_pipeline::config::{load_config, ServiceConfig};
use rest_pipeline::lifecycle::{spawn_signal_handler, Shutdown};
use rest_pipeline::observability::{init_logging, init_metrics};
use rest_pipeline::{Application, HttpServer};

#[derive(Debug, Parser)]
#[command(name = "rest-pipeline", version, about = "REST resource server")]
struct Cli {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "rest-pipeline starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        collections = config.collections.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let mut builder = Application::builder().charsets(config.negotiation.charsets.clone());
    if let Some(public_url) = &config.negotiation.public_url {
        builder = builder.public_url(public_url.clone());
    }
    for spec in &config.collections {
        let store = Arc::new(MemoryCollection::new(spec.name.clone()));
        builder = builder.collection(spec.clone(), store);
    }
    let app = Arc::new(builder.build()?);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(&config, app);
    let serving = server.run(listener, shutdown.subscribe());
    spawn_signal_handler(shutdown);
    serving.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
