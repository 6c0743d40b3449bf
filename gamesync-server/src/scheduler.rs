//! Background Schedulers
//!
//! ## State Logger
//! Periodically logs the latest shared snapshot. It only reads
//! [`SyncEngine::snapshot`](gamesync_core::SyncEngine::snapshot) and never
//! takes part in merges. Stops when the shutdown flag is raised.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::state::AppState;

pub fn start_state_logger(
    state: AppState,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => log_snapshot(&state),
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("[Scheduler] State logger stopped");
    })
}

fn log_snapshot(state: &AppState) {
    let snapshot = state.engine().snapshot();
    match serde_json::to_string(&*snapshot) {
        Ok(json) => tracing::info!(
            version = snapshot.version,
            peers = snapshot.len(),
            "[StateLogger] {}",
            json
        ),
        Err(e) => tracing::warn!("[StateLogger] failed to encode snapshot: {}", e),
    }
}
