//! Approval broker error types.
//!
//! All failures are local and synchronous to the call that triggered them:
//! the broker never retries internally and never swallows an error. The
//! variants map onto the failure categories callers must distinguish:
//! malformed input, duplicate pending requests, unknown ids, settlement
//! misuse, and flow-stack misuse.

use super::entities::Rejection;
use thiserror::Error;

/// Approval broker error type.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApprovalError {
    /// Malformed arguments: empty ids/origins/kinds, an already registered
    /// id, opaque data that is not a plain key-value mapping, or an
    /// ambiguous/empty query filter.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// A request for this (origin, kind) pair is already pending and the
    /// kind is not in the rate-limit exclusion set.
    #[error("Approval request of kind '{kind}' already pending for origin '{origin}'")]
    AlreadyPending { origin: String, kind: String },

    /// No pending request exists under this id.
    #[error("Approval request not found: '{id}'")]
    NotFound { id: String },

    /// `accept` asked to wait for a result, but the request was created
    /// with `expects_result = false`. The request has already been removed
    /// and the creator settled when this is delivered.
    #[error("Approval request '{id}' does not support result callbacks")]
    NoResultSupport { id: String },

    /// `end_flow` called with no flows open.
    #[error("No approval flows to end")]
    NoApprovalFlows,

    /// `end_flow` called with an id that is not the innermost open flow.
    /// Carries the rejected id and the full ordered list of open flow ids.
    #[error("Flow '{id}' is not the innermost approval flow (open flows: {open:?})")]
    InvalidFlowEnd { id: String, open: Vec<String> },

    /// The request was rejected by the decision-maker (or swept by a bulk
    /// clear). Delivered through the creator-facing future.
    #[error("Approval request rejected: {}", .0.message)]
    Rejected(Rejection),

    /// Post-approval work reported through result callbacks failed.
    #[error("Post-approval work failed: {message}")]
    ResultFailed { message: String },

    /// The broker was dropped before the request settled.
    #[error("Approval broker dropped before the request settled")]
    BrokerDropped,
}

impl ApprovalError {
    /// Convenience constructor for validation failures.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_request_display() {
        let err = ApprovalError::invalid("origin must be a non-empty string");
        assert!(err.to_string().contains("origin must be a non-empty string"));
    }

    #[test]
    fn test_already_pending_display() {
        let err = ApprovalError::AlreadyPending {
            origin: "https://x.test".to_string(),
            kind: "tx".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("https://x.test"));
        assert!(msg.contains("tx"));
    }

    #[test]
    fn test_invalid_flow_end_carries_open_flows() {
        let err = ApprovalError::InvalidFlowEnd {
            id: "flow-a".to_string(),
            open: vec!["flow-a".to_string(), "flow-b".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("flow-a"));
        assert!(msg.contains("flow-b"));
    }

    #[test]
    fn test_rejected_display_uses_message() {
        let err = ApprovalError::Rejected(Rejection::new("user denied"));
        assert!(err.to_string().contains("user denied"));
    }
}
