//! # Event Subscriber
//!
//! Defines the subscription side of the bus.

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The bus was closed.
    #[error("Message bus closed")]
    Closed,
}

/// A subscription handle for receiving events.
///
/// When dropped, the underlying broadcast receiver is released.
pub struct Subscription<E> {
    /// The broadcast receiver.
    receiver: broadcast::Receiver<E>,
}

impl<E: Clone> Subscription<E> {
    /// Create a new subscription.
    pub(crate) fn new(receiver: broadcast::Receiver<E>) -> Self {
        Self { receiver }
    }

    /// Receive the next event.
    ///
    /// A slow subscriber that lags behind the channel capacity skips the
    /// missed events and continues from the oldest retained one.
    ///
    /// # Returns
    ///
    /// - `Some(event)` - The next event
    /// - `None` - The channel was closed (bus dropped)
    pub async fn recv(&mut self) -> Option<E> {
        loop {
            match self.receiver.recv().await {
                Ok(e) => return Some(e),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Subscriber lagged, some events dropped");
                    continue;
                }
            }
        }
    }

    /// Try to receive the next event without blocking.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(event))` - An event was available
    /// - `Ok(None)` - No event available (would block)
    /// - `Err(SubscriptionError::Closed)` - The channel was closed
    pub fn try_recv(&mut self) -> Result<Option<E>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(e) => return Ok(Some(e)),
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            }
        }
    }
}
