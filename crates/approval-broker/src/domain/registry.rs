//! Creator-side settlement registry.
//!
//! Every tracked request has exactly one entry here, holding the sender half
//! of the creator-facing future. Settlement is one-shot: the sender is taken
//! out of an explicit slot on first use, so a second settle attempt finds the
//! slot empty rather than relying on channel behavior.

use super::errors::ApprovalError;
use super::outcome::ApprovalOutcome;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// What the creator-facing future resolves to.
pub type SettledOutcome = Result<ApprovalOutcome, ApprovalError>;

/// The sender half held by the registry while a request is pending.
#[derive(Debug)]
struct PendingCallback {
    sender: Option<oneshot::Sender<SettledOutcome>>,
}

impl PendingCallback {
    fn settle(&mut self, outcome: SettledOutcome) -> bool {
        match self.sender.take() {
            // The creator may have dropped its future already.
            Some(tx) => tx.send(outcome).is_ok(),
            None => false,
        }
    }
}

/// The creator-facing future, returned when a request is added.
///
/// Resolves when the request is accepted, rejected, or cleared.
#[derive(Debug)]
pub struct PendingApproval {
    id: String,
    rx: oneshot::Receiver<SettledOutcome>,
}

impl PendingApproval {
    /// The identifier of the underlying request.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Future for PendingApproval {
    type Output = SettledOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(ApprovalError::BrokerDropped)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Maps request ids to their unsettled creator callbacks.
#[derive(Debug, Default)]
pub struct CallbackRegistry {
    entries: HashMap<String, PendingCallback>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new request id and returns its creator-facing future.
    ///
    /// The caller is responsible for rejecting duplicate ids before
    /// registering.
    pub fn register(&mut self, id: &str) -> PendingApproval {
        let (tx, rx) = oneshot::channel();
        self.entries
            .insert(id.to_string(), PendingCallback { sender: Some(tx) });
        PendingApproval {
            id: id.to_string(),
            rx,
        }
    }

    /// Settles and removes the entry for `id`. Returns false when the id is
    /// unknown or the entry was already settled.
    pub fn settle(&mut self, id: &str, outcome: SettledOutcome) -> bool {
        match self.entries.remove(id) {
            Some(mut callback) => callback.settle(outcome),
            None => false,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
