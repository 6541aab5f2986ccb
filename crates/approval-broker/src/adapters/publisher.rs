//! State-changed publisher adapter.
//!
//! Bridges the engine's [`StateListener`] port onto the shared bus: every
//! mutation becomes a broadcast [`BrokerEvent::StateChanged`] carrying the
//! full new state and the structural diff.

use crate::domain::{ApprovalState, StateDiff};
use crate::ipc::payloads::BrokerEvent;
use crate::ports::StateListener;
use message_bus::{EventPublisher, InMemoryMessageBus};
use std::sync::Arc;
use tracing::debug;

/// Publishes state-changed events to the bus.
pub struct BusStatePublisher {
    bus: Arc<InMemoryMessageBus<BrokerEvent>>,
}

impl BusStatePublisher {
    pub fn new(bus: Arc<InMemoryMessageBus<BrokerEvent>>) -> Self {
        Self { bus }
    }
}

impl StateListener for BusStatePublisher {
    fn on_state_changed(&self, state: &ApprovalState, diff: &StateDiff) {
        let receivers = self.bus.publish(BrokerEvent::StateChanged {
            state: state.clone(),
            diff: diff.clone(),
        });
        debug!(
            receivers,
            ops = diff.ops.len(),
            "published state-changed event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publishes_state_changed() {
        let bus = Arc::new(InMemoryMessageBus::new());
        let publisher = BusStatePublisher::new(Arc::clone(&bus));
        let mut subscription = bus.subscribe();

        let state = ApprovalState::default();
        publisher.on_state_changed(&state, &StateDiff::default());

        let BrokerEvent::StateChanged { state: seen, diff } =
            subscription.recv().await.unwrap();
        assert_eq!(seen, state);
        assert!(diff.is_empty());
    }
}
