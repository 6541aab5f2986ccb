//! Settlement shapes for the completion protocol.
//!
//! The creator-facing future settles with an [`ApprovalOutcome`]: a raw
//! value when the request was created with `expects_result = false`, or a
//! [`ResultEnvelope`] otherwise. The stored flag, not the accept call shape,
//! selects the variant.
//!
//! [`ResultCallbacks`] are one-shot: the first call to `success` or `error`
//! wins, guarded by an explicit settled slot rather than channel semantics
//! alone. Callbacks delivered for an accept that did not wait for a result
//! are inert; invoking them is silently ignored.

use super::entities::Rejection;
use super::errors::ApprovalError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// What the acceptor's future resolves to.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AcceptResult {
    /// The value reported by the creator's post-approval work, when any.
    pub value: Option<Value>,
}

/// The value delivered to the creator-facing future on acceptance.
#[derive(Clone, Debug)]
pub enum ApprovalOutcome {
    /// Raw accepted value (`expects_result = false`).
    Value(Option<Value>),
    /// Result envelope (`expects_result = true`).
    Envelope(ResultEnvelope),
}

/// The `{value, callbacks}` shape delivered when the request expects a
/// richer result.
#[derive(Clone, Debug)]
pub struct ResultEnvelope {
    /// The accepted value.
    pub value: Option<Value>,
    /// One-shot handles for reporting the outcome of post-approval work.
    pub callbacks: ResultCallbacks,
}

type ResultSender = oneshot::Sender<Result<AcceptResult, ApprovalError>>;

/// One-shot settlement handles carried inside a [`ResultEnvelope`].
#[derive(Clone)]
pub struct ResultCallbacks {
    slot: Arc<Mutex<Option<ResultSender>>>,
}

impl std::fmt::Debug for ResultCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCallbacks")
            .field("settled", &!self.is_live())
            .finish()
    }
}

impl ResultCallbacks {
    /// Creates callbacks wired to a waiting acceptor.
    pub(crate) fn wired() -> (Self, oneshot::Receiver<Result<AcceptResult, ApprovalError>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                slot: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// Creates inert callbacks: no acceptor is waiting, every call is a
    /// silent no-op.
    pub(crate) fn inert() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Reports post-approval success. Returns true if this call settled the
    /// acceptor's future; false if the callbacks were inert or already
    /// settled.
    pub fn success(&self, value: Option<Value>) -> bool {
        self.settle(Ok(AcceptResult { value }))
    }

    /// Reports post-approval failure. Returns true if this call settled the
    /// acceptor's future.
    pub fn error(&self, rejection: Rejection) -> bool {
        self.settle(Err(ApprovalError::ResultFailed {
            message: rejection.message,
        }))
    }

    fn settle(&self, result: Result<AcceptResult, ApprovalError>) -> bool {
        let sender = self
            .slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        match sender {
            // The acceptor may have dropped its future; that is not an error.
            Some(tx) => tx.send(result).is_ok(),
            None => false,
        }
    }

    fn is_live(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .is_some()
    }
}

/// The acceptor's future, returned by `accept`.
///
/// Immediately settled unless the accept waited for a result, in which case
/// it resolves when the creator invokes one of the result callbacks.
#[derive(Debug)]
pub struct AcceptTicket {
    rx: oneshot::Receiver<Result<AcceptResult, ApprovalError>>,
}

impl AcceptTicket {
    /// A ticket that resolves when the paired sender settles.
    pub(crate) fn pending(rx: oneshot::Receiver<Result<AcceptResult, ApprovalError>>) -> Self {
        Self { rx }
    }

    /// A ticket settled before it is returned.
    pub(crate) fn settled(result: Result<AcceptResult, ApprovalError>) -> Self {
        let (tx, rx) = oneshot::channel();
        // The receiver is held right here; the send cannot fail.
        let _ = tx.send(result);
        Self { rx }
    }
}

impl Future for AcceptTicket {
    type Output = Result<AcceptResult, ApprovalError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(ApprovalError::BrokerDropped)),
            Poll::Pending => Poll::Pending,
        }
    }
}
