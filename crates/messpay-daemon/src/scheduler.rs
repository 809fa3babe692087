//! Optional background pre-computation.
//!
//! Regenerates the current cycle's report on a fixed interval so the
//! ledger is warm before an admin asks for it. Not required for
//! correctness: every `GET /payouts` regenerates anyway.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use messpay_db::queries::settings;
use messpay_settlement::cycle::{current_cycle, to_timestamp};
use messpay_types::SettlementCycle;

use crate::events::EventType;
use crate::DaemonState;

/// Run until a shutdown signal arrives.
pub async fn run(state: Arc<DaemonState>, period: Duration, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = precompute(&state).await {
                    warn!(error = %format!("{e:#}"), "scheduled report run failed");
                    state.event_bus.emit(
                        EventType::ErrorOccurred,
                        to_timestamp((state.clock)()),
                        serde_json::json!({ "source": "scheduler", "error": format!("{e:#}") }),
                    );
                }
            }
            _ = shutdown.recv() => {
                info!("report scheduler stopping");
                break;
            }
        }
    }
}

/// Regenerate the cycle containing now and record the run.
pub async fn precompute(state: &DaemonState) -> anyhow::Result<SettlementCycle> {
    let now = (state.clock)();
    let at = to_timestamp(now);
    let cycle = current_cycle(now, state.settlement.offset);

    let rows = {
        let mut db = state.db.lock().await;
        let run = messpay_ledger::run_report(&mut db, &state.settlement, cycle, at)?;
        settings::record_precompute(&db, &cycle, at)?;
        run.rows.len()
    };

    state.event_bus.emit(
        EventType::ReportGenerated,
        at,
        serde_json::json!({ "cycle": cycle.to_string(), "rows": rows, "scheduled": true }),
    );
    Ok(cycle)
}
