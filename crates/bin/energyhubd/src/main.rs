//! # energyhubd — energyhub daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize the `SQLite` archive, falling back to degraded in-memory
//!   operation when the storage path is not writable
//! - Construct the thing registry and (optionally) the simulated household
//! - Construct application services, injecting ports via traits
//! - Pump registry events into the services, coalescing balance updates
//! - Drive the 1 Hz sampler
//! - Build the axum router, bind and serve
//! - Handle graceful shutdown (SIGTERM/SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod root_meter_file;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use energyhub_adapter_http_axum::state::AppState;
use energyhub_adapter_storage_sqlite_sqlx::{Config as DbConfig, SqliteArchive};
use energyhub_adapter_virtual::{SimulatedHome, VirtualRegistry};
use energyhub_app::event_bus::InProcessEventBus;
use energyhub_app::ports::{ThingEvent, ThingRegistry};
use energyhub_app::services::energy_logger::EnergyLogger;
use energyhub_app::services::energy_manager::EnergyManager;
use energyhub_domain::sample_rate::SampleRate;
use energyhub_domain::time::now;

use crate::config::Config;
use crate::root_meter_file::FileRootMeterStore;

/// Delay that coalesces bursts of state changes into one balance recompute.
const BALANCE_UPDATE_DELAY: Duration = Duration::from_millis(50);

type Manager = EnergyManager<VirtualRegistry, FileRootMeterStore, Arc<InProcessEventBus>>;
type Logger = EnergyLogger<SqliteArchive, Arc<InProcessEventBus>, Local>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configuration
    let config = Config::load()?;

    // Logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    tracing::info!("configuration loaded");

    // Archive; a failure here degrades the system instead of aborting it.
    let archive = match DbConfig::in_storage_path(Path::new(&config.paths.storage))
        .build()
        .await
    {
        Ok(db) => {
            tracing::info!("energy log database ready");
            Some(SqliteArchive::new(db.pool().clone()))
        }
        Err(err) => {
            tracing::error!(%err, "unable to open energy log database, energy logs will not be available");
            None
        }
    };

    // Event bus
    let event_bus = Arc::new(InProcessEventBus::default());

    // Registry + integrations
    let registry = VirtualRegistry::new();
    let home = config
        .simulation
        .enabled
        .then(|| SimulatedHome::new(registry.clone()));

    // Services
    let store = FileRootMeterStore::in_settings_path(Path::new(&config.paths.settings));
    let logger: Arc<Logger> = Arc::new(EnergyLogger::new(
        archive,
        Arc::clone(&event_bus),
        Local,
    ));
    let manager: Arc<Manager> = Arc::new(EnergyManager::new(
        registry.clone(),
        store,
        Arc::clone(&event_bus),
    ));

    logger.startup(now()).await;
    let latest = logger.latest_balance(SampleRate::Any).await;
    manager.startup(latest.as_ref()).await;

    // Housekeeping: drop archived series of things no longer in the registry.
    for thing_id in logger.logged_things().await {
        if registry.thing(thing_id).await.is_none() {
            tracing::info!(thing = %thing_id, "clearing logs of unknown thing");
            logger.remove_thing(thing_id).await;
        }
    }

    // Balance recompute, coalescing bursts of state changes.
    let (balance_tx, mut balance_rx) = mpsc::channel::<()>(64);
    {
        let manager = Arc::clone(&manager);
        let logger = Arc::clone(&logger);
        tokio::spawn(async move {
            while balance_rx.recv().await.is_some() {
                tokio::time::sleep(BALANCE_UPDATE_DELAY).await;
                while balance_rx.try_recv().is_ok() {}
                if let Some(balance) = manager.update_power_balance().await {
                    logger.log_power_balance(&balance, now()).await;
                }
            }
        });
    }

    // Registry event pump.
    let (thing_tx, mut thing_rx) = mpsc::channel::<ThingEvent>(64);
    {
        let manager = Arc::clone(&manager);
        let logger = Arc::clone(&logger);
        let registry = registry.clone();
        let balance_tx = balance_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = thing_rx.recv().await {
                match event {
                    ThingEvent::Added(info) => {
                        manager.watch_thing(&info).await;
                    }
                    ThingEvent::Removed(thing_id) => {
                        manager.unwatch_thing(thing_id).await;
                        logger.remove_thing(thing_id).await;
                    }
                    ThingEvent::StateChanged { thing_id, reading } => {
                        let Some(info) = registry.thing(thing_id).await else {
                            continue;
                        };
                        if info.affects_balance() {
                            let _ = balance_tx.send(()).await;
                        }
                        if info.is_logged() {
                            logger.log_thing_power(thing_id, reading, now()).await;
                        }
                    }
                }
            }
            tracing::debug!("thing event channel closed");
        });
    }

    // Sampler driver.
    {
        let logger = Arc::clone(&logger);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                logger.sample_tick(now()).await;
            }
        });
    }

    // Simulated household driver.
    if let Some(mut home) = home {
        let interval_secs = config.simulation.interval_secs;
        let events = thing_tx.clone();
        tokio::spawn(async move {
            home.announce(&events).await;
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                home.advance(interval_secs as f64, &events).await;
            }
        });
        tracing::info!("virtual household ready");
    }

    // HTTP
    let state = AppState::new(manager, logger, event_bus);
    let app = energyhub_adapter_http_axum::router::build(state);

    let bind_addr = config.bind_addr();
    tracing::info!(addr = %bind_addr, "energyhubd listening");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl-C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
