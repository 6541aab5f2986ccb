//! Core domain entities for the approval broker.
//!
//! An [`ApprovalRequest`] is the externally observable record of a pending
//! decision; it lives in the state store from `add` until `accept`, `reject`
//! or a bulk `clear` removes it. An [`ApprovalFlow`] is a caller-declared
//! nested scope spanning several approval steps, tracked as a LIFO stack.

use super::errors::ApprovalError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Timestamp in milliseconds since UNIX epoch.
pub type Timestamp = u64;

/// Opaque keyed payload attached to a request (plain mapping, never a
/// sequence).
pub type RequestData = serde_json::Map<String, Value>;

/// A pending approval request.
///
/// `request_data` is immutable after creation; `request_state` may be
/// replaced wholesale via `update_request_state`. `expects_result` is fixed
/// at creation and selects the settlement shape delivered to the creator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Unique request id.
    pub id: String,
    /// The party that requested approval.
    pub origin: String,
    /// Category tag distinguishing kinds of requests from the same origin.
    pub kind: String,
    /// Timestamp when the request was created (ms).
    pub created_at: Timestamp,
    /// Opaque creation-time payload.
    pub request_data: Option<RequestData>,
    /// Opaque mutable payload.
    pub request_state: Option<RequestData>,
    /// Whether the creator expects a result envelope on acceptance.
    pub expects_result: bool,
}

/// A nested approval sequence frame.
///
/// Flows carry no payload beyond their id; their ordering in the stack is
/// the contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalFlow {
    /// Unique flow id.
    pub id: String,
}

/// Caller-supplied rejection delivered to the creator-facing future.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    /// Human-readable reason.
    pub message: String,
    /// Optional structured detail.
    pub data: Option<Value>,
}

impl Rejection {
    /// Creates a rejection with a message and no structured detail.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }

    /// Attaches structured detail.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Broker configuration.
#[derive(Clone, Debug, Default)]
pub struct BrokerConfig {
    /// Request kinds exempt from the one-pending-per-(origin, kind) rule.
    pub rate_limit_exclusions: HashSet<String>,
}

impl BrokerConfig {
    /// Creates a configuration with the given excluded kinds.
    pub fn with_exclusions<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rate_limit_exclusions: kinds.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if the kind is exempt from duplicate detection.
    #[must_use]
    pub fn is_excluded(&self, kind: &str) -> bool {
        self.rate_limit_exclusions.contains(kind)
    }

    /// Configuration for tests: one well-known excluded kind.
    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self::with_exclusions(["unrestricted"])
    }
}

/// Validates that a string field is non-empty.
///
/// # Errors
/// `InvalidRequest` naming the field.
pub fn require_non_empty(field: &'static str, value: &str) -> Result<(), ApprovalError> {
    if value.is_empty() {
        return Err(ApprovalError::invalid(format!(
            "{field} must be a non-empty string"
        )));
    }
    Ok(())
}

/// Validates that an opaque payload is a plain key-value mapping.
///
/// # Errors
/// `InvalidRequest` if the value is a sequence or any other non-object
/// shape.
pub fn require_plain_mapping(
    field: &'static str,
    value: Value,
) -> Result<RequestData, ApprovalError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ApprovalError::invalid(format!(
            "{field} must be a plain key-value mapping, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
