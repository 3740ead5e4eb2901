//! `ytd` — the lifecycle integrator / composition root (§4.J).
//!
//! Loads configuration from the process environment, bootstraps every
//! component, starts the background job-purge sweep, serves the Axum
//! router, and drains the worker pool on SIGINT/SIGTERM before exiting.

use std::time::Duration;

use tokio::signal;
use tracing::{info, warn};
use ytd_core::Config;

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT"),
        () = terminate => info!("received SIGTERM"),
    }
}

/// Periodically drops terminal job records older than `job_retention_sec`
/// so the in-memory Job Store doesn't grow without bound (§4.F).
fn spawn_purge_sweep(
    job_store: std::sync::Arc<ytd_engine::JobStore>,
    interval: Duration,
    retention: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let purged = job_store.purge_older_than(retention).await;
            if purged > 0 {
                info!(purged, "swept terminal job records past retention");
            }
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone())),
        )
        .init();

    info!(port = config.port, workers = config.workers, "ytd starting");

    if !config.require_api_key {
        warn!("REQUIRE_API_KEY is false; the admission surface is unauthenticated");
    }

    let port = config.port;
    let purge_interval = Duration::from_secs(config.job_purge_interval_sec);
    let job_retention = Duration::from_secs(config.job_retention_sec);

    let (ctx, worker_handles) = ytd_http::bootstrap(config).await?;
    let job_store = ctx.job_store.clone();
    let worker_pool = ctx.worker_pool.clone();

    let purge_handle = spawn_purge_sweep(job_store, purge_interval, job_retention);

    let app = ytd_http::create_router(ctx);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("shutting down worker pool");
    worker_pool
        .shutdown(Duration::from_secs(30), worker_handles)
        .await;
    purge_handle.abort();

    info!("shutdown complete");
    Ok(())
}
