//! Synchronization engine facade.
//!
//! Ties the [`Registry`], [`StateMerger`] and [`Broadcaster`] together:
//!
//! ```text
//! submit(lease, update)
//!   ├── merger.merge()       ── lock held ──┐
//!   ├── broadcaster.broadcast()             │ versions reach every sink in order
//!   └── release ────────────────────────────┘
//!   └── reap failed sinks → deregister → vacate → broadcast departure
//! ```

use std::sync::Arc;

use gamesync_types::{PeerId, PeerState, SharedState, SyncConfig, SyncError};

use crate::broadcast::{BroadcastStats, Broadcaster};
use crate::merger::StateMerger;
use crate::registry::{Lease, Outbound, Registry};

pub struct SyncEngine {
    config: SyncConfig,
    registry: Registry,
    merger: StateMerger,
    broadcaster: Broadcaster,
}

impl SyncEngine {
    pub fn new(config: SyncConfig) -> Arc<Self> {
        let registry = Registry::new(config.max_peers, config.outbound_queue);
        Arc::new(Self { config, registry, merger: StateMerger::new(), broadcaster: Broadcaster::new() })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn register(&self) -> Result<(Lease, Outbound), SyncError> {
        match self.registry.register() {
            Ok((lease, outbound)) => {
                tracing::info!(
                    peer = %lease.identity(),
                    epoch = lease.epoch(),
                    active = self.registry.len(),
                    "peer registered"
                );
                Ok((lease, outbound))
            }
            Err(err) => {
                tracing::warn!(capacity = self.registry.capacity(), "registration refused: {}", err);
                Err(err)
            }
        }
    }

    /// Merge one inbound update and fan the resulting snapshot out.
    pub fn submit(&self, lease: &Lease, update: PeerState) -> Result<Arc<SharedState>, SyncError> {
        let (snapshot, report) = {
            let merged = self.merger.merge(&self.registry, lease, update).inspect_err(|err| {
                tracing::warn!(peer = %lease.identity(), "dropping update: {}", err);
            })?;
            let report = self.broadcaster.broadcast(&self.registry, merged.snapshot());
            (merged.into_snapshot(), report)
        };

        self.reap(report.failed);
        Ok(snapshot)
    }

    /// Tear down `lease`'s registration and clear its slot.
    ///
    /// Returns false if it was already torn down.
    pub fn deregister(&self, lease: &Lease) -> bool {
        if !self.registry.deregister(lease) {
            return false;
        }
        tracing::info!(peer = %lease.identity(), active = self.registry.len(), "peer deregistered");
        self.retire(vec![*lease]);
        true
    }

    /// Deregister every sink a broadcast failed on.
    fn reap(&self, failed: Vec<(Lease, SyncError)>) {
        let mut departed = Vec::with_capacity(failed.len());
        self.evict_failed(failed, &mut departed);
        self.retire(departed);
    }

    fn evict_failed(&self, failed: Vec<(Lease, SyncError)>, departed: &mut Vec<Lease>) {
        for (lease, err) in failed {
            tracing::warn!(peer = %lease.identity(), "{}", err);
            if self.registry.deregister(&lease) {
                tracing::info!(peer = %lease.identity(), active = self.registry.len(), "peer deregistered");
                departed.push(lease);
            }
        }
    }

    /// Vacate departed slots, announcing each change to the remaining peers.
    ///
    /// A departure broadcast can itself hit failing sinks; those are queued
    /// here instead of recursing.
    fn retire(&self, mut departed: Vec<Lease>) {
        while let Some(lease) = departed.pop() {
            let failed = match self.merger.vacate(&lease) {
                Some(merged) => self.broadcaster.broadcast(&self.registry, merged.snapshot()).failed,
                None => continue,
            };
            self.evict_failed(failed, &mut departed);
        }
    }

    pub fn is_live(&self, lease: &Lease) -> bool {
        self.registry.is_live(lease)
    }

    /// Latest snapshot, for observers that must not take part in the merge.
    pub fn snapshot(&self) -> Arc<SharedState> {
        self.merger.snapshot()
    }

    pub fn active_peers(&self) -> Vec<PeerId> {
        self.registry.identities()
    }

    pub fn capacity(&self) -> u16 {
        self.registry.capacity()
    }

    pub fn broadcast_stats(&self) -> BroadcastStats {
        self.broadcaster.stats()
    }
}
