//! messpay-daemon: payout settlement service.
//!
//! Single OS process running a Tokio async runtime. The admin dashboard
//! talks to it over the HTTP reporting API.

mod commands;
mod config;
mod events;
mod http;
mod scheduler;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use messpay_settlement::cycle::to_timestamp;

use messpay_ledger::SettlementSettings;

use crate::config::DaemonConfig;
use crate::events::{EventBus, EventFilter, EventType};

/// Daemon-wide shared state.
pub struct DaemonState {
    /// Database connection. One writer at a time.
    pub db: Arc<Mutex<rusqlite::Connection>>,
    pub config: DaemonConfig,
    /// Settlement parameters validated at startup.
    pub settlement: SettlementSettings,
    /// Event bus for payout notifications.
    pub event_bus: EventBus,
    /// Wall clock.
    pub clock: fn() -> DateTime<Utc>,
    /// Shutdown signal sender.
    pub shutdown_tx: broadcast::Sender<()>,
}

impl DaemonState {
    pub fn new(
        conn: rusqlite::Connection,
        config: DaemonConfig,
        settlement: SettlementSettings,
        clock: fn() -> DateTime<Utc>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            db: Arc::new(Mutex::new(conn)),
            config,
            settlement,
            event_bus: EventBus::new(1000),
            clock,
            shutdown_tx,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config; logging needs its level
    let config = DaemonConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_directive())),
        )
        .init();

    info!("messpay daemon starting");

    // 2. Validate settlement policy; a bad rate fails startup
    let settlement = config.settlement_settings()?;
    let addr: SocketAddr = config
        .server
        .listen_addr
        .parse()
        .with_context(|| format!("server.listen_addr '{}'", config.server.listen_addr))?;
    info!(
        rate = %settlement.rate,
        offset = %settlement.offset,
        include_cash_pending = config.settlement.include_cash_pending,
        "settlement policy"
    );

    // 3. Open database
    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating {}", data_dir.display()))?;
    let conn = messpay_db::open(&data_dir.join("messpay.db"))?;

    // 4. Build daemon state
    let precompute_secs = config.settlement.precompute_interval_secs;
    let state = Arc::new(DaemonState::new(conn, config, settlement, Utc::now));

    // 5. Payout notifications go to the log
    tokio::spawn(events::log_events(
        state.event_bus.subscribe(),
        EventFilter {
            categories: Some(vec!["payout".to_string(), "system".to_string()]),
        },
    ));

    // 6. Optional pre-computation of the current cycle
    if precompute_secs > 0 {
        info!(every_secs = precompute_secs, "report scheduler enabled");
        tokio::spawn(scheduler::run(
            state.clone(),
            Duration::from_secs(precompute_secs),
            state.shutdown_tx.subscribe(),
        ));
    }

    state.event_bus.emit(
        EventType::DaemonStarted,
        to_timestamp(Utc::now()),
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
        }),
    );

    // 7. Serve until shutdown
    let mut shutdown_rx = state.shutdown_tx.subscribe();
    tokio::select! {
        result = http::serve(state.clone(), addr) => {
            if let Err(e) = result {
                error!("HTTP server error: {e:#}");
            }
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    // Stop the scheduler
    let _ = state.shutdown_tx.send(());

    info!("Daemon stopped");
    Ok(())
}
