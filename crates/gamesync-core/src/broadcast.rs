//! Broadcast Engine: fan a snapshot out to every registered sink.
//!
//! Delivery is a non-blocking `try_send` into each peer's bounded outbound
//! queue, so one slow or dead sink costs the fan-out nothing. Sinks that are
//! closed or full are reported back as [`SyncError::SinkDeliveryFailure`]; the
//! caller deregisters them once the serialization point is released.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;

use gamesync_types::{ServerFrame, SharedState, SyncError};

use crate::registry::{Lease, Registry};

/// Outcome of one broadcast call.
#[derive(Debug, Default)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: Vec<(Lease, SyncError)>,
}

/// Cumulative broadcast counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastStats {
    pub broadcasts: u64,
    pub deliveries: u64,
    pub failures: u64,
}

#[derive(Default)]
pub struct Broadcaster {
    broadcasts: AtomicU64,
    deliveries: AtomicU64,
    failures: AtomicU64,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `snapshot` on every sink in `registry`.
    ///
    /// Never fails as a whole; per-sink failures are returned in the report.
    pub fn broadcast(&self, registry: &Registry, snapshot: &Arc<SharedState>) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for (lease, sink) in registry.active_sinks() {
            match sink.try_send(ServerFrame::snapshot(Arc::clone(snapshot))) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => report.failed.push((
                    lease,
                    SyncError::SinkDeliveryFailure {
                        identity: lease.identity(),
                        reason: "outbound queue full".to_string(),
                    },
                )),
                Err(TrySendError::Closed(_)) => report.failed.push((
                    lease,
                    SyncError::SinkDeliveryFailure {
                        identity: lease.identity(),
                        reason: "sink closed".to_string(),
                    },
                )),
            }
        }

        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.deliveries.fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.failures.fetch_add(report.failed.len() as u64, Ordering::Relaxed);

        tracing::trace!(
            version = snapshot.version,
            delivered = report.delivered,
            failed = report.failed.len(),
            "broadcast snapshot"
        );
        report
    }

    pub fn stats(&self) -> BroadcastStats {
        BroadcastStats {
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}
