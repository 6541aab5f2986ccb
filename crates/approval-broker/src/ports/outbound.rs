//! Outbound (Driven) ports for the approval broker.
//!
//! These traits define the broker's dependencies on the outside world:
//! time, id generation, the decision-maker surface, and state-change
//! observers.

use crate::domain::{ApprovalState, Rejection, StateDiff, Timestamp};
use async_trait::async_trait;

/// Time source for consistent timestamp handling.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Returns the current timestamp in milliseconds.
    fn now(&self) -> Timestamp;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}

/// Identifier source for requests and flows created without a caller id.
pub trait IdSource: Send + Sync {
    /// Returns a fresh identifier, unique for the lifetime of the broker.
    fn next_id(&self) -> String;
}

/// Default UUID-backed id source.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdSource;

impl IdSource for UuidIdSource {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Decision-maker surface the broker pokes when a request or flow is
/// created in "show" mode.
///
/// The hook takes no arguments; the presenter reads whatever it needs from
/// the broker's state. The engine does not depend on the outcome: a failure
/// is logged and the request stays tracked.
#[async_trait]
pub trait RequestDisplay: Send + Sync {
    /// Asks the presenter to surface the pending approval state.
    async fn show_approval_request(&self) -> Result<(), Rejection>;
}

/// Display that accepts everything without presenting anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpDisplay;

#[async_trait]
impl RequestDisplay for NoOpDisplay {
    async fn show_approval_request(&self) -> Result<(), Rejection> {
        Ok(())
    }
}

/// Observer notified after every state mutation, with the structural diff
/// against the previous state.
///
/// Called synchronously from the mutation path, before control returns to
/// the caller.
pub trait StateListener: Send + Sync {
    fn on_state_changed(&self, state: &ApprovalState, diff: &StateDiff);
}

/// Listener that discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpListener;

impl StateListener for NoOpListener {
    fn on_state_changed(&self, _state: &ApprovalState, _diff: &StateDiff) {}
}

/// Deterministic time source for testing.
#[cfg(test)]
pub struct MockTimeSource {
    now: std::sync::atomic::AtomicU64,
}

#[cfg(test)]
impl MockTimeSource {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: std::sync::atomic::AtomicU64::new(now),
        }
    }

    pub fn advance(&self, millis: u64) {
        self.now
            .fetch_add(millis, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        self.now.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// Sequential id source for deterministic test assertions.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct SequentialIdSource {
    counter: std::sync::atomic::AtomicU64,
}

#[cfg(test)]
impl IdSource for SequentialIdSource {
    fn next_id(&self) -> String {
        let n = self
            .counter
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        format!("generated-{n}")
    }
}

/// Display that counts how often it was poked.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    pub shows: std::sync::atomic::AtomicUsize,
    pub fail_with: std::sync::Mutex<Option<Rejection>>,
}

#[cfg(test)]
impl RecordingDisplay {
    pub fn failing(rejection: Rejection) -> Self {
        Self {
            fail_with: std::sync::Mutex::new(Some(rejection)),
            ..Self::default()
        }
    }

    pub fn show_count(&self) -> usize {
        self.shows.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl RequestDisplay for RecordingDisplay {
    async fn show_approval_request(&self) -> Result<(), Rejection> {
        self.shows
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(rejection) = self.fail_with.lock().unwrap().clone() {
            return Err(rejection);
        }
        Ok(())
    }
}

/// Listener that records every notification it receives.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingListener {
    pub notifications: std::sync::Mutex<Vec<(ApprovalState, StateDiff)>>,
}

#[cfg(test)]
impl StateListener for RecordingListener {
    fn on_state_changed(&self, state: &ApprovalState, diff: &StateDiff) {
        self.notifications
            .lock()
            .unwrap()
            .push((state.clone(), diff.clone()));
    }
}
