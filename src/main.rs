//! mock-proxy
//!
//! Answers HTTP requests from a fixture directory, an upstream, or both.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────┐
//!                       │                   MOCK PROXY                     │
//!                       │                                                  │
//!   Client Request      │  ┌─────────┐    ┌────────────┐                   │
//!   ────────────────────┼─▶│  http   │───▶│  dispatch  │◀── resilience     │
//!                       │  │ server  │    │ (per mode) │    (mode + breaker)│
//!                       │  └─────────┘    └─────┬──────┘                   │
//!                       │                  ┌────┴─────┐                    │
//!                       │                  ▼          ▼                    │
//!                       │           ┌──────────┐ ┌──────────┐              │
//!                       │           │ fixtures │◀│  proxy   │──────────────┼──▶ Upstream
//!                       │           │  store   │ │forwarder │  (capture)   │
//!                       │           └──────────┘ └──────────┘              │
//!   Client Response     │                                                  │
//!   ◀───────────────────┼── response envelope                              │
//!                       └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use tokio::net::TcpListener;

use mock_proxy::cli::Cli;
use mock_proxy::http::HttpServer;
use mock_proxy::lifecycle::{signals, Shutdown};
use mock_proxy::observability::{logging, metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("mock-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    let server = HttpServer::from_config(config.clone())?;
    let core = server.core();
    tracing::info!(
        mode = %core.mode,
        fixtures = ?core.fixture_root,
        upstream = ?core.upstream.as_ref().map(|u| u.as_str()),
        timeout_secs = core.timeout.as_secs(),
        record = core.capture,
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

    let listener = TcpListener::bind(config.listener.socket_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::shutdown_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
