use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};

use storefront_api as api;

/// Storefront order, payment and notification service
#[derive(Debug, Parser)]
#[command(name = "storefront-api", version, about)]
struct Cli {
    /// Directory holding default.toml and per-environment overrides
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,

    /// Overrides the configured bind host
    #[arg(long)]
    host: Option<String>,

    /// Overrides the configured port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = api::config::load_config_from(&cli.config_dir)
        .context("failed to load configuration")?;
    if let Some(host) = cli.host {
        cfg.host = host;
    }
    if let Some(port) = cli.port {
        cfg.port = port;
    }
    api::config::init_tracing(cfg.log_level(), cfg.log_json);
    api::config::log_loaded_config(&cfg, &cli.config_dir);
    api::handlers::health::init_start_time();

    let store = api::store::create_store(&cfg.store_backend, &cfg.redis_url)
        .await
        .with_context(|| format!("failed to open the {} store", cfg.store_backend))?;
    let notifier = api::notifications::NotificationDispatcher::from_config(&cfg.notifications)
        .context("failed to initialise notification channels")?;
    if cfg.notifications.admin_email.is_none() {
        warn!("admin email not configured; staff alerts will only go out by text, if at all");
    }

    let addr = cfg.bind_address();
    let environment = cfg.environment.clone();
    let app = api::build_router(api::AppState::new(cfg, store, notifier));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, %environment, "storefront-api listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
