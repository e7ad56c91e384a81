//! Roads Proxy - A caching proxy for the Overpass API
//!
//! Serves `/api/roads` and its stats/clear/warm-up siblings.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roads_proxy::api::{create_router, AppState};
use roads_proxy::config::Config;
use roads_proxy::tasks::spawn_warmup_task;
use roads_proxy::upstream::ReqwestUpstream;

/// Main entry point for the roads proxy.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the upstream client, road cache and shop directory
/// 4. Start the scheduled warm-up task if enabled
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roads_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Roads Proxy");

    let config = Config::from_env();
    info!(
        "Configuration loaded: ttl={}s, max_entries={}, mirrors={}, timeout={}s, port={}, warmup_interval={}s",
        config.cache_ttl,
        config.max_entries,
        config.mirrors.len(),
        config.upstream_timeout,
        config.server_port,
        config.warmup_interval
    );

    let upstream = ReqwestUpstream::new().context("building upstream HTTP client")?;
    let state =
        AppState::from_config(&config, Arc::new(upstream)).context("wiring application state")?;
    info!("Road cache initialized");

    let warmup_handle = (config.warmup_interval > 0).then(|| {
        info!("Scheduled warm-up enabled");
        spawn_warmup_task(
            state.roads.clone(),
            state.directory.clone(),
            state.warmup,
            config.warmup_interval,
        )
    });

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(warmup_handle))
        .await
        .context("serving HTTP")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the warm-up task and allows graceful shutdown.
async fn shutdown_signal(warmup_handle: Option<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if let Some(handle) = warmup_handle {
        handle.abort();
        warn!("Warm-up task aborted");
    }
}
