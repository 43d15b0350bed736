//! hb-lb (Heatboard Leaderboard) - Race timing aggregation service
//!
//! Watches the timing-system data folder, recomputes rankings on change and
//! serves them to the venue displays.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use hb_common::config::{load_settings, resolve_config_path};
use hb_common::events::RunTrigger;
use hb_common::{EventBus, SettingsStore};
use hb_lb::engine::Engine;
use hb_lb::scheduler::{Scheduler, SchedulerConfig};
use hb_lb::snapshot::SnapshotPublisher;
use hb_lb::watcher::PollingWatcher;
use hb_lb::{build_router, AppState};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Capacity of the run event broadcast channel
const EVENT_BUS_CAPACITY: usize = 100;

/// Command-line arguments for hb-lb
#[derive(Parser, Debug)]
#[command(name = "hb-lb")]
#[command(about = "Race timing leaderboard service for Heatboard")]
#[command(version)]
struct Args {
    /// Settings file (TOML)
    #[arg(short, long, env = "HB_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on, overriding the settings file
    #[arg(short, long, env = "HB_PORT")]
    port: Option<u16>,

    /// Timing-system data folder, overriding the settings file
    #[arg(short, long, env = "HB_SOURCE_ROOT")]
    source_root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Settings first: the default log level comes from the file
    let config_path = resolve_config_path(args.config.as_deref());
    let mut settings = load_settings(&config_path);
    if let Some(port) = args.port {
        settings.port = port;
    }
    if let Some(root) = args.source_root {
        settings.source_root_path = root;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| settings.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Heatboard Leaderboard (hb-lb) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Settings file: {}", config_path.display());

    run(SettingsStore::new(settings, config_path)).await
}

async fn run(store: SettingsStore) -> Result<()> {
    let settings = store.snapshot().await;
    info!("Source root: {}", settings.source_root_path.display());
    if !settings.events_dir().is_dir() {
        warn!(
            "Events directory {} does not exist yet; serving an empty leaderboard",
            settings.events_dir().display()
        );
    }

    let bus = EventBus::new(EVENT_BUS_CAPACITY);
    let publisher = Arc::new(SnapshotPublisher::new());
    let engine = Arc::new(Engine::new(store.clone(), Arc::clone(&publisher)));

    let (scheduler, handle) = Scheduler::new(
        SchedulerConfig::from_settings(&settings),
        engine,
        bus.clone(),
    );
    scheduler.spawn();
    PollingWatcher::new(store.clone(), handle.clone()).spawn();
    handle.notify(RunTrigger::Startup);

    let state = AppState::new(
        store,
        publisher,
        handle,
        bus,
        settings.static_dir.clone(),
    );
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("hb-lb listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("hb-lb stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
