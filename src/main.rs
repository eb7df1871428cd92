//! storegate: admission and connection acquisition service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Request ──▶ ┌──────────────┐ admitted ┌──────────────────┐  handle  ┌──────────┐
//!                 │ AdmissionGate│─────────▶│ConnectionAcquirer│─────────▶│ one query│
//!     429 ◀────── │ (per caller) │          │ (fixed retry)    │          └────┬─────┘
//!                 └──────────────┘          └──────────────────┘               │
//!                                                                         release()
//! ```
//!
//! Configuration is read once from an optional TOML file and `DB_*`
//! environment variables. Missing connection fields are logged as warnings
//! and the process still starts.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use storegate::config::loader::{load_with, report_findings};
use storegate::http::HttpServer;
use storegate::lifecycle::{signals, Shutdown};
use storegate::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "storegate")]
#[command(about = "Admission control and store connection acquisition", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "STOREGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let (mut config, findings) = load_with(cli.config.as_deref(), |key| std::env::var(key).ok())?;
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }

    logging::init_logging(&config.observability);
    tracing::info!("storegate v{} starting", env!("CARGO_PKG_VERSION"));
    report_findings(&findings);

    tracing::info!(
        bind_address = %config.server.bind_address,
        max_attempts = config.retries.max_attempts,
        retry_delay_ms = config.retries.delay_ms,
        admission_capacity = config.admission.capacity,
        admission_window_ms = config.admission.window_ms,
        tls = config.database.tls.is_some(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.server.bind_address).await?;

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(&config);
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
