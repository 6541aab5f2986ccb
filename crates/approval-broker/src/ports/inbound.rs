//! # Inbound Port - ApprovalApi
//!
//! Primary driving port exposing the approval broker API.
//!
//! Callers are the creators of approval requests (anything that needs a
//! decision) and the decision-maker surface that settles them. Mutations
//! take `&mut self`: the broker has a single logical owner, and concurrent
//! access happens at the adapter layer, not here.

use crate::domain::{
    AcceptOptions, AcceptTicket, AddRequestArgs, ApprovalError, ApprovalRequest, ApprovalState,
    CountFilter, HasFilter, PendingApproval, Rejection, RequestData,
};
use async_trait::async_trait;
use serde_json::Value;

/// Primary API for the approval broker.
///
/// # Errors
///
/// Operations report failures in a fixed precedence: input validation,
/// then duplicate detection, then existence, then flow misuse. See
/// [`ApprovalError`].
#[async_trait]
pub trait ApprovalApi: Send {
    /// Tracks a new approval request and returns the creator-facing future.
    ///
    /// # Errors
    /// - `InvalidRequest`: malformed id, origin, kind, or data
    /// - `AlreadyPending`: an unsettled request with the same origin and
    ///   kind exists and the kind is not rate-limit excluded
    fn add(&mut self, args: AddRequestArgs) -> Result<PendingApproval, ApprovalError>;

    /// Like [`add`](Self::add), but also pokes the decision-maker surface
    /// after the request is tracked. A presentation failure is logged and
    /// does not undo the add.
    async fn add_and_show(
        &mut self,
        args: AddRequestArgs,
    ) -> Result<PendingApproval, ApprovalError>;

    /// Returns a snapshot of the pending request with the given id.
    fn get(&self, id: &str) -> Option<ApprovalRequest>;

    /// Whether any pending request matches the filter.
    fn has(&self, filter: &HasFilter) -> bool;

    /// Number of pending requests matching the filter.
    fn count(&self, filter: &CountFilter) -> usize;

    /// Number of pending requests overall.
    fn total_count(&self) -> usize;

    /// Replaces the mutable `request_state` of a pending request.
    ///
    /// # Errors
    /// - `NotFound`: no pending request with that id
    fn update_request_state(
        &mut self,
        id: &str,
        state: RequestData,
    ) -> Result<(), ApprovalError>;

    /// Approves a pending request, settling the creator's future.
    ///
    /// The returned ticket resolves immediately unless
    /// `options.wait_for_result` is set and the request expects a result,
    /// in which case it resolves when the creator reports back through the
    /// delivered callbacks.
    ///
    /// # Errors
    /// - `NotFound`: no pending request with that id
    fn accept(
        &mut self,
        id: &str,
        value: Option<Value>,
        options: AcceptOptions,
    ) -> Result<AcceptTicket, ApprovalError>;

    /// Rejects a pending request, failing the creator's future.
    ///
    /// # Errors
    /// - `NotFound`: no pending request with that id
    fn reject(&mut self, id: &str, rejection: Rejection) -> Result<(), ApprovalError>;

    /// Removes every pending request, rejecting each creator's future with
    /// the given rejection. Returns how many requests were cleared.
    fn clear(&mut self, rejection: Rejection) -> usize;

    /// Opens a nested approval flow, pokes the decision-maker surface, and
    /// returns the flow id. A fresh id is generated when omitted.
    async fn start_flow(&mut self, id: Option<String>) -> Result<String, ApprovalError>;

    /// Closes the innermost flow, which must be the one named.
    ///
    /// # Errors
    /// - `NoApprovalFlows`: no flow is open
    /// - `InvalidFlowEnd`: `id` is not the innermost open flow
    fn end_flow(&mut self, id: &str) -> Result<(), ApprovalError>;

    /// A snapshot of the full aggregate state.
    fn state_snapshot(&self) -> ApprovalState;
}
