//! Registry of connected peers.
//!
//! Owns identity assignment and the outbound sink of every live connection.
//! Lookups during broadcast only take DashMap shard read locks, so a fan-out
//! never waits on an unrelated register/deregister for longer than one shard
//! operation.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

use gamesync_types::{PeerId, ServerFrame, SyncError};

/// Sending half of a peer's bounded outbound queue.
pub type PeerSink = mpsc::Sender<ServerFrame>;
/// Receiving half, drained by the connection's writer.
pub type Outbound = mpsc::Receiver<ServerFrame>;

/// Proof of one registration: an identity plus the epoch it was issued in.
///
/// Identities are reused after teardown; the epoch tells a stale connection
/// apart from the one that now holds the same identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lease {
    identity: PeerId,
    epoch: u64,
}

impl Lease {
    pub fn identity(&self) -> PeerId {
        self.identity
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Live binding of an identity to its outbound sink.
struct Registration {
    lease: Lease,
    sink: PeerSink,
}

pub struct Registry {
    capacity: u16,
    queue_len: usize,
    peers: DashMap<PeerId, Registration>,
    next_epoch: AtomicU64,
}

impl Registry {
    pub fn new(capacity: u16, queue_len: usize) -> Self {
        Self {
            capacity,
            queue_len: queue_len.max(1),
            peers: DashMap::with_capacity(usize::from(capacity)),
            next_epoch: AtomicU64::new(1),
        }
    }

    /// Claim the lowest free identity and open its outbound queue.
    ///
    /// The queue already holds the `welcome` frame when this returns, so it is
    /// always the first thing the peer receives.
    pub fn register(&self) -> Result<(Lease, Outbound), SyncError> {
        for identity in PeerId::all(self.capacity) {
            if let Entry::Vacant(slot) = self.peers.entry(identity) {
                let lease = Lease { identity, epoch: self.next_epoch.fetch_add(1, Ordering::Relaxed) };
                // one extra slot keeps room for the welcome frame
                let (sink, outbound) = mpsc::channel(self.queue_len + 1);
                let welcome = ServerFrame::Welcome { identity, capacity: self.capacity };
                if let Err(e) = sink.try_send(welcome) {
                    tracing::error!(peer = %identity, "welcome frame not queued: {}", e);
                }
                slot.insert(Registration { lease, sink });
                return Ok((lease, outbound));
            }
        }

        Err(SyncError::CapacityExceeded { capacity: self.capacity })
    }

    /// Remove the registration behind `lease`.
    ///
    /// Returns false when it is already gone or the identity now belongs to a
    /// newer connection, so calling it twice is harmless.
    pub fn deregister(&self, lease: &Lease) -> bool {
        self.peers.remove_if(&lease.identity, |_, registration| registration.lease == *lease).is_some()
    }

    pub fn is_live(&self, lease: &Lease) -> bool {
        self.peers.get(&lease.identity).is_some_and(|registration| registration.lease == *lease)
    }

    /// Current sinks ordered by identity.
    ///
    /// The sinks are cloned handles; they are meant to be dropped at the end of
    /// one broadcast.
    pub fn active_sinks(&self) -> Vec<(Lease, PeerSink)> {
        let mut sinks: Vec<(Lease, PeerSink)> = self
            .peers
            .iter()
            .map(|entry| (entry.lease, entry.sink.clone()))
            .collect();
        sinks.sort_by_key(|(lease, _)| lease.identity);
        sinks
    }

    /// Identities with a live registration, ascending.
    pub fn identities(&self) -> Vec<PeerId> {
        let mut identities: Vec<PeerId> = self.peers.iter().map(|entry| *entry.key()).collect();
        identities.sort_unstable();
        identities
    }

    pub fn capacity(&self) -> u16 {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
