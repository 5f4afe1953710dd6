//! app-logger demo server.
//!
//! Serves a few routes behind the access log middleware so the emitted
//! records can be inspected:
//!
//! ```text
//! curl -XPOST localhost:8080/echo -H 'content-type: application/json' -d '{"sid":"s-1"}'
//! curl localhost:8080/health
//! curl -XPOST localhost:8080/upload -F file=@Cargo.toml
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app_logger::config::{load_config, AppConfig};
use app_logger::http::HttpServer;

#[derive(Parser)]
#[command(name = "app-logger")]
#[command(about = "Demo server for the contextual access logger", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind address
    #[arg(short, long)]
    bind: Option<String>,

    /// Override the record level (DEBUG, INFO, WARN, ERROR)
    #[arg(short, long)]
    level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "app_logger=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if let Some(level) = cli.level {
        config.logger.level = level;
    }

    tracing::info!(
        bind_address = %config.server.bind_address,
        level = %config.logger.level,
        output = ?config.logger.output,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config);
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
