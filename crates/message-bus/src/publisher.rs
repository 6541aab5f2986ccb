//! # Event Publisher
//!
//! Defines the publishing side of the bus and the in-memory implementation.

use crate::actions::{ActionError, ActionHandler};
use crate::subscriber::Subscription;
use crate::{ActionRegistry, DEFAULT_CHANNEL_CAPACITY};
use serde_json::Value;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Trait for publishing events to the bus.
///
/// Publishing is synchronous: the event is handed to the broadcast channel
/// before the call returns, so a subsystem's state mutation and its
/// notification cannot interleave with other bus traffic.
pub trait EventPublisher<E>: Send + Sync {
    /// Publish an event to the bus.
    ///
    /// Returns the number of active subscribers that received the event.
    fn publish(&self, event: E) -> usize;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

/// In-memory implementation of the message bus.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer event
/// fan-out, and an [`ActionRegistry`] for request/response actions. Suitable
/// for single-process operation.
pub struct InMemoryMessageBus<E> {
    /// Broadcast sender for events.
    sender: broadcast::Sender<E>,

    /// Named request/response handlers.
    actions: ActionRegistry,

    /// Total events published.
    events_published: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl<E: Clone + Debug + Send + 'static> InMemoryMessageBus<E> {
    /// Create a new in-memory bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            actions: ActionRegistry::new(),
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to all events on the bus.
    ///
    /// Returns a `Subscription` handle that can be used to receive events.
    #[must_use]
    pub fn subscribe(&self) -> Subscription<E> {
        debug!("New subscription created");
        Subscription::new(self.sender.subscribe())
    }

    /// Registers a request/response action handler.
    ///
    /// # Errors
    /// `DuplicateAction` if the name is already registered.
    pub fn register_action(&self, name: &str, handler: ActionHandler) -> Result<(), ActionError> {
        self.actions.register(name, handler)
    }

    /// Invokes a registered action and awaits its response.
    ///
    /// # Errors
    /// `UnknownAction` if nothing is registered under `name`; otherwise the
    /// handler's own error.
    pub async fn call_action(&self, name: &str, payload: Value) -> Result<Value, ActionError> {
        self.actions.call(name, payload).await
    }

    /// Returns true if an action handler is registered under `name`.
    #[must_use]
    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains(name)
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<E: Clone + Debug + Send + 'static> Default for InMemoryMessageBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone + Debug + Send + 'static> EventPublisher<E> for InMemoryMessageBus<E> {
    fn publish(&self, event: E) -> usize {
        // Always increment counter (event was attempted)
        self.events_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(event) {
            Ok(receiver_count) => {
                debug!(receivers = receiver_count, "Event published");
                receiver_count
            }
            Err(e) => {
                // No receivers - event is dropped
                warn!(error = %e, "Event dropped (no receivers)");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
