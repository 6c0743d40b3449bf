//! State Merger: the single serialization point for every slot change.
//!
//! All merges and vacates run under one `parking_lot::Mutex` around the
//! [`SlotTable`]. A successful call hands back a [`Merged`] that keeps the
//! lock held; whatever the caller does with it before dropping (the fan-out)
//! is therefore ordered exactly like the versions themselves.

use parking_lot::{Mutex, MutexGuard};
use std::ops::Deref;
use std::sync::Arc;

use gamesync_types::{PeerState, SharedState, SyncError};

use crate::registry::{Lease, Registry};
use crate::slots::SlotTable;

/// A freshly published snapshot with the serialization point still held.
pub struct Merged<'a> {
    _serialized: MutexGuard<'a, SlotTable>,
    snapshot: Arc<SharedState>,
}

impl Merged<'_> {
    pub fn snapshot(&self) -> &Arc<SharedState> {
        &self.snapshot
    }

    /// Release the serialization point and keep the snapshot.
    pub fn into_snapshot(self) -> Arc<SharedState> {
        self.snapshot
    }
}

impl Deref for Merged<'_> {
    type Target = SharedState;

    fn deref(&self) -> &SharedState {
        &self.snapshot
    }
}

#[derive(Default)]
pub struct StateMerger {
    table: Mutex<SlotTable>,
}

impl StateMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `update` to `lease`'s slot.
    ///
    /// Liveness is checked inside the critical section: an update racing a
    /// deregistration either lands before the slot is vacated or is refused
    /// with [`SyncError::UnknownPeer`].
    pub fn merge(
        &self,
        registry: &Registry,
        lease: &Lease,
        update: PeerState,
    ) -> Result<Merged<'_>, SyncError> {
        let mut table = self.table.lock();
        if !registry.is_live(lease) {
            return Err(SyncError::UnknownPeer { identity: lease.identity() });
        }

        let snapshot = table.apply(lease, update);
        tracing::debug!(peer = %lease.identity(), version = snapshot.version, "merged update");
        Ok(Merged { _serialized: table, snapshot })
    }

    /// Clear a departed peer's slot; `None` if it held nothing.
    pub fn vacate(&self, lease: &Lease) -> Option<Merged<'_>> {
        let mut table = self.table.lock();
        let snapshot = table.vacate(lease)?;
        tracing::debug!(peer = %lease.identity(), version = snapshot.version, "vacated slot");
        Some(Merged { _serialized: table, snapshot })
    }

    /// Latest published snapshot (read-only accessor for observers).
    pub fn snapshot(&self) -> Arc<SharedState> {
        Arc::clone(self.table.lock().current())
    }
}
