//! Subscriber registry and donation fan-out.
//!
//! Each feed connection registers once and receives an [`Outbound`] queue.
//! The connection task drains that queue onto its socket; the registry only
//! ever enqueues, so a slow socket never stalls a broadcast.

use dashmap::DashMap;
use purse_protocol::{DonationEvent, ProtocolError};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

/// Identifier assigned to a subscriber on registration.
pub type SubscriberId = u64;

/// Receiving end of a subscriber's outbound queue.
///
/// Payloads are pre-encoded JSON text frames, shared between recipients.
pub type Outbound = mpsc::UnboundedReceiver<Arc<str>>;

/// Registry entry.
#[derive(Debug)]
struct Subscriber {
    sender: mpsc::UnboundedSender<Arc<str>>,
    remote_addr: Option<SocketAddr>,
}

/// Result of a broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Subscribers the event was enqueued for.
    pub delivered: usize,
    /// Subscribers removed because delivery failed.
    pub pruned: usize,
}

/// The set of open feed connections.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    subscribers: DashMap<SubscriberId, Subscriber>,
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber.
    ///
    /// Returns its id and the queue the connection must drain.
    pub fn register(&self, remote_addr: Option<SocketAddr>) -> (SubscriberId, Outbound) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (sender, receiver) = mpsc::unbounded_channel();

        self.subscribers.insert(
            id,
            Subscriber {
                sender,
                remote_addr,
            },
        );

        info!(
            subscriber = id,
            remote = ?remote_addr,
            subscribers = self.subscribers.len(),
            "New feed subscriber connected"
        );

        (id, receiver)
    }

    /// Remove a subscriber. Returns `false` if it was already gone.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        match self.subscribers.remove(&id) {
            Some((_, subscriber)) => {
                debug!(
                    subscriber = id,
                    remote = ?subscriber.remote_addr,
                    subscribers = self.subscribers.len(),
                    "Feed subscriber removed"
                );
                true
            }
            None => false,
        }
    }

    /// Check whether a subscriber is still registered.
    #[must_use]
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.contains_key(&id)
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Whether nobody is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Send `event` to every registered subscriber.
    ///
    /// Members are snapshotted first; subscribers whose queue is closed are
    /// removed after the loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be encoded. Nobody is contacted
    /// in that case.
    pub fn broadcast(&self, event: &DonationEvent) -> Result<BroadcastReport, ProtocolError> {
        let payload: Arc<str> = Arc::from(event.to_json()?);
        Ok(self.broadcast_raw(payload))
    }

    /// Send a pre-encoded text frame to every registered subscriber.
    pub fn broadcast_raw(&self, payload: Arc<str>) -> BroadcastReport {
        let targets: Vec<(SubscriberId, mpsc::UnboundedSender<Arc<str>>)> = self
            .subscribers
            .iter()
            .map(|entry| (*entry.key(), entry.value().sender.clone()))
            .collect();

        let mut report = BroadcastReport::default();
        let mut failed = Vec::new();

        for (id, sender) in targets {
            if sender.send(Arc::clone(&payload)).is_ok() {
                report.delivered += 1;
            } else {
                failed.push(id);
            }
        }

        for id in failed {
            if self.unregister(id) {
                debug!(subscriber = id, "Pruned subscriber after failed delivery");
                report.pruned += 1;
            }
        }

        trace!(
            delivered = report.delivered,
            pruned = report.pruned,
            "Broadcast complete"
        );
        info!("Total feed subscribers: {}", self.subscribers.len());

        report
    }
}
