//! `persistsvc` — chat-message persistence daemon.
//!
//! Lifecycle: load config, hold a pidfile, start the worker pool and job
//! monitor, serve a minimal health/version surface, run until SIGTERM or
//! Ctrl-C, then drain in-flight jobs before exiting.

mod config;
mod http;
mod pidfile;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use clap::Parser;
use persist_worker::{JobMonitor, WorkerPool};
use pidfile::PidFileGuard;
use tokio::sync::watch;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "persistsvc", about = "Chat-message persistence daemon")]
struct Args {
    /// Path to persistsvc.toml. Falls back to PERSISTSVC_CONFIG, then
    /// ~/.persistsvc/persistsvc.toml.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "persistsvc=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = config::PersistConfig::load(args.config.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("config load failed ({e}), using defaults");
        config::PersistConfig::default()
    });

    let _pidfile = PidFileGuard::acquire(&config.service_pid_file)?;

    // A short-lived connection just to create the schema; the worker pool
    // and job monitor each open their own sessions per step from here on.
    let conn = rusqlite::Connection::open(&config.database_connection)?;
    persist_store::init_db(&conn)?;
    drop(conn);
    let db_path: Arc<str> = Arc::from(config.database_connection.as_str());

    let marker_threshold = chrono::Duration::seconds(config.marker_threshold_seconds);
    let pool = WorkerPool::spawn(config.persister_threads, db_path.clone(), marker_threshold);
    let monitor = JobMonitor::new(
        db_path.clone(),
        pool.sender(),
        StdDuration::from_secs(config.persister_poll_seconds),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor_handle = tokio::spawn(monitor.run(shutdown_rx));

    let listener = tokio::net::TcpListener::bind(&config.http_bind).await?;
    info!(bind = %config.http_bind, "persistsvc listening");
    let http_server = axum::serve(listener, http::router());

    tokio::select! {
        result = http_server => {
            if let Err(e) = result {
                tracing::error!(error = %e, "http server exited");
            }
        }
        _ = shutdown_signal() => {
            info!("shutdown signal received");
        }
    }

    let _ = shutdown_tx.send(true);
    let _ = monitor_handle.await;
    pool.stop().await;

    info!("persistsvc stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
