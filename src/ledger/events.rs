//! Custody notifications
//!
//! Provides a broadcast channel for pushing ledger events to observers
//! (audit logs, front ends). Events are observational only.

use crate::types::{Address, Amount, TxId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Maximum number of events to buffer per subscriber
const BROADCAST_CAPACITY: usize = 256;

/// Events emitted after a custody operation commits
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CustodyEvent {
    /// A transfer was proposed
    Submitted {
        id: TxId,
        destination: Address,
        amount: Amount,
    },
    /// A signer approved a pending transfer
    Approved {
        id: TxId,
        signer: Address,
        approvals: usize,
    },
    /// A transfer settled
    Executed { id: TxId },
    /// Value was added to the pool
    Deposited { from: Address, amount: Amount },
}

/// Broadcaster for custody events
#[derive(Debug)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<CustodyEvent>,
}

impl EventBroadcaster {
    /// Create a new broadcaster
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { sender }
    }

    /// Send an event to all subscribers
    pub fn broadcast(&self, event: CustodyEvent) {
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<CustodyEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
