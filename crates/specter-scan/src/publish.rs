//! Event fan-out to dashboard subscribers.
//!
//! One `ScanEvent` per cycle goes out over a broadcast channel: every
//! current subscriber receives an identical copy, and a cycle with zero
//! subscribers still succeeds.

use tokio::sync::broadcast;

use specter_core::ScanEvent;

/// Topic name, used for log correlation with dashboard consumers.
pub const DASHBOARD_TOPIC: &str = "dashboard.feed";

/// Cloneable handle to the per-cycle event channel.
#[derive(Clone)]
pub struct ScanPublisher {
    tx: broadcast::Sender<ScanEvent>,
}

impl ScanPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Register a new subscriber; it receives every event published after
    /// this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.tx.subscribe()
    }

    /// Fire-and-forget publish. Delivery never blocks on subscriber
    /// presence; no subscribers is not an error.
    pub fn publish(&self, event: ScanEvent) {
        match self.tx.send(event) {
            Ok(receivers) => {
                tracing::debug!(
                    topic = DASHBOARD_TOPIC,
                    subscribers = receivers,
                    "Scan event published"
                );
            }
            Err(_) => {
                tracing::debug!(topic = DASHBOARD_TOPIC, "No subscribers; event dropped");
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
