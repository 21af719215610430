//! Stakemate — Entry Point
//!
//! Loads configuration, initializes all subsystems, and runs until shutdown.
//! The room state machine, ledger, sweeper, and web API all share one
//! database pool and one event bus.

mod config;
mod db;
mod error;
mod events;
mod ledger;
mod logging;
mod roadmap;
mod rooms;
mod sweeper;
mod web;

use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use crate::config::Config;
use crate::db::pool;
use crate::events::bus::EventBus;
use crate::ledger::Ledger;
use crate::rooms::machine::RoomService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (ignore if missing)
    let _ = dotenvy::dotenv();

    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    logging::structured::init_logging(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        sweeper_enabled = config.sweeper.enabled,
        "stakemate starting"
    );

    // Initialize database
    let db_pool = pool::create_pool(&config.database.url, config.database.max_connections).await?;
    pool::run_migrations(&db_pool).await?;
    info!("database connected and migrations applied");

    // Initialize event bus
    let event_bus = Arc::new(EventBus::new(1024));

    // Initialize ledger
    let ledger = Arc::new(Ledger::new(db_pool.clone()));

    // Initialize room state machine
    let room_service = Arc::new(RoomService::new(
        db_pool.clone(),
        event_bus.clone(),
        config.rooms.clone(),
    ));

    // Spawn deadline sweeper
    let _sweeper_handle = if config.sweeper.enabled {
        let db = db_pool.clone();
        let service = room_service.clone();
        let interval = config.sweeper.interval_secs;
        Some(tokio::spawn(async move {
            sweeper::run_sweeper_loop(db, service, interval).await;
        }))
    } else {
        None
    };

    // Spawn web server (if enabled)
    let _web_handle = if config.web.enabled {
        let web_server = web::server::WebServer::new(
            config.web.clone(),
            db_pool.clone(),
            room_service.clone(),
            ledger.clone(),
            event_bus.clone(),
        );
        Some(tokio::spawn(async move {
            if let Err(e) = web_server.start().await {
                error!(error = %e, "web server error");
            }
        }))
    } else {
        None
    };

    info!("all subsystems started, waiting for shutdown signal");

    // Wait for shutdown signal
    let shutdown = async {
        let ctrl_c = signal::ctrl_c();
        #[cfg(unix)]
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");

        tokio::select! {
            _ = ctrl_c => { info!("received SIGINT"); }
            _ = sigterm.recv() => { info!("received SIGTERM"); }
        }
    };

    shutdown.await;

    info!("shutdown complete");
    Ok(())
}
