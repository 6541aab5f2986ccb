//! # IPC Message Payloads
//!
//! Request/response types for the bus-facing action surface, plus the
//! broadcast event. Every payload carries a correlation id for request
//! tracking.
//!
//! Opaque `request_data`/`request_state` fields arrive as raw JSON and are
//! shape-checked (plain mapping, never a sequence) when converted into
//! domain arguments. Result envelopes and their callbacks never cross the
//! bus; the add response carries only the settled value.

use crate::domain::{
    require_plain_mapping, AddRequestArgs, ApprovalError, ApprovalOutcome, ApprovalState,
    CountFilter, HasFilter, Rejection, RequestData, SettledOutcome, StateDiff,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Broadcast event published after every mutating action.
#[derive(Debug, Clone, Serialize)]
pub enum BrokerEvent {
    /// The aggregate state changed; carries the full new state and the
    /// structural diff against the previous one.
    StateChanged {
        state: ApprovalState,
        diff: StateDiff,
    },
}

/// Request to track a new approval request (with or without poking the
/// decision-maker surface; the action name selects the mode).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddRequestPayload {
    /// Correlation ID for request tracking.
    pub correlation_id: Uuid,
    /// Request id; generated when omitted.
    #[serde(default)]
    pub id: Option<String>,
    /// The requesting party.
    pub origin: String,
    /// Request category.
    pub kind: String,
    /// Opaque creation-time payload; must be a plain mapping if present.
    #[serde(default)]
    pub request_data: Option<Value>,
    /// Opaque mutable payload; must be a plain mapping if present.
    #[serde(default)]
    pub request_state: Option<Value>,
    /// Whether the creator expects a result envelope on acceptance.
    #[serde(default)]
    pub expects_result: bool,
}

impl AddRequestPayload {
    /// Validates the opaque payload shapes and converts into domain
    /// arguments.
    pub fn into_args(self) -> Result<AddRequestArgs, ApprovalError> {
        let request_data = self
            .request_data
            .map(|value| require_plain_mapping("request_data", value))
            .transpose()?;
        let request_state = self
            .request_state
            .map(|value| require_plain_mapping("request_state", value))
            .transpose()?;
        Ok(AddRequestArgs {
            id: self.id,
            origin: self.origin,
            kind: self.kind,
            request_data,
            request_state,
            expects_result: self.expects_result,
        })
    }
}

/// Response to an add request, sent once the request settles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddRequestResponse {
    /// Correlation ID matching the request.
    pub correlation_id: Uuid,
    /// The (possibly generated) request id.
    pub id: String,
    /// Whether the request was approved.
    pub approved: bool,
    /// The accepted value, if any.
    pub value: Option<Value>,
    /// Error message if the request was rejected or cleared.
    pub error: Option<String>,
}

impl AddRequestResponse {
    /// Builds the response from a settled creator-facing outcome.
    pub fn from_outcome(correlation_id: Uuid, id: String, outcome: SettledOutcome) -> Self {
        match outcome {
            Ok(ApprovalOutcome::Value(value)) => Self {
                correlation_id,
                id,
                approved: true,
                value,
                error: None,
            },
            // Callbacks stay on this side of the bus.
            Ok(ApprovalOutcome::Envelope(envelope)) => Self {
                correlation_id,
                id,
                approved: true,
                value: envelope.value,
                error: None,
            },
            Err(e) => Self {
                correlation_id,
                id,
                approved: false,
                value: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Existence query over pending requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HasRequestPayload {
    /// Correlation ID for request tracking.
    pub correlation_id: Uuid,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
}

impl HasRequestPayload {
    /// Validates that exactly one filter kind was supplied.
    pub fn into_filter(self) -> Result<HasFilter, ApprovalError> {
        HasFilter::from_fields(self.id, self.origin, self.kind)
    }
}

/// Response to an existence query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HasRequestResponse {
    /// Correlation ID matching the request.
    pub correlation_id: Uuid,
    pub exists: bool,
}

/// Count query over pending requests. Omit both fields to count
/// everything via the dedicated total-count action instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountRequestPayload {
    /// Correlation ID for request tracking.
    pub correlation_id: Uuid,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
}

impl CountRequestPayload {
    pub fn into_filter(self) -> Result<CountFilter, ApprovalError> {
        CountFilter::from_fields(self.origin, self.kind)
    }
}

/// Aggregate count query (no filter).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotalCountPayload {
    /// Correlation ID for request tracking.
    pub correlation_id: Uuid,
}

/// Response to a count query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountResponse {
    /// Correlation ID matching the request.
    pub correlation_id: Uuid,
    pub count: usize,
}

/// Request to approve a pending request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptRequestPayload {
    /// Correlation ID for request tracking.
    pub correlation_id: Uuid,
    /// The request to approve.
    pub id: String,
    /// The accepted value delivered to the creator.
    #[serde(default)]
    pub value: Option<Value>,
    /// Keep the response pending until post-approval work reports back.
    #[serde(default)]
    pub wait_for_result: bool,
}

/// Response to an accept, sent once the acceptor's side settles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptRequestResponse {
    /// Correlation ID matching the request.
    pub correlation_id: Uuid,
    /// The value reported by post-approval work, when waited for.
    pub value: Option<Value>,
}

/// Request to reject a pending request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectRequestPayload {
    /// Correlation ID for request tracking.
    pub correlation_id: Uuid,
    /// The request to reject.
    pub id: String,
    /// Delivered to the creator as the failure.
    pub error: Rejection,
}

/// Request to replace the mutable state of a pending request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRequestStatePayload {
    /// Correlation ID for request tracking.
    pub correlation_id: Uuid,
    pub id: String,
    /// Must be a plain mapping.
    pub request_state: Value,
}

impl UpdateRequestStatePayload {
    pub fn into_state(self) -> Result<RequestData, ApprovalError> {
        require_plain_mapping("request_state", self.request_state)
    }
}

/// Request to open a nested approval flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartFlowPayload {
    /// Correlation ID for request tracking.
    pub correlation_id: Uuid,
    /// Flow id; generated when omitted.
    #[serde(default)]
    pub id: Option<String>,
}

/// Response carrying the id of the opened flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartFlowResponse {
    /// Correlation ID matching the request.
    pub correlation_id: Uuid,
    pub id: String,
}

/// Request to close the innermost flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndFlowPayload {
    /// Correlation ID for request tracking.
    pub correlation_id: Uuid,
    pub id: String,
}

/// Request to reject every pending request in one sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearRequestsPayload {
    /// Correlation ID for request tracking.
    pub correlation_id: Uuid,
    /// Delivered to every creator as the failure.
    pub error: Rejection,
}

/// Response to a clear.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearRequestsResponse {
    /// Correlation ID matching the request.
    pub correlation_id: Uuid,
    /// How many requests were swept.
    pub cleared: usize,
}

/// Request for the full aggregate state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetStatePayload {
    /// Correlation ID for request tracking.
    pub correlation_id: Uuid,
}

/// Response carrying the aggregate state snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetStateResponse {
    /// Correlation ID matching the request.
    pub correlation_id: Uuid,
    pub state: ApprovalState,
}

/// Bare acknowledgement for actions with no payload to return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    /// Correlation ID matching the request.
    pub correlation_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_add_payload_rejects_sequence_data() {
        let payload = AddRequestPayload {
            correlation_id: Uuid::new_v4(),
            id: None,
            origin: "a".to_string(),
            kind: "t".to_string(),
            request_data: Some(json!([1, 2, 3])),
            request_state: None,
            expects_result: false,
        };
        assert!(matches!(
            payload.into_args(),
            Err(ApprovalError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_add_payload_accepts_plain_mapping() {
        let payload = AddRequestPayload {
            correlation_id: Uuid::new_v4(),
            id: Some("req-1".to_string()),
            origin: "a".to_string(),
            kind: "t".to_string(),
            request_data: Some(json!({"amount": 5})),
            request_state: Some(json!({"step": 1})),
            expects_result: true,
        };
        let args = payload.into_args().unwrap();
        assert_eq!(args.id.as_deref(), Some("req-1"));
        assert!(args.expects_result);
        assert_eq!(args.request_data.unwrap()["amount"], json!(5));
    }

    #[test]
    fn test_add_payload_deserializes_with_defaults() {
        let payload: AddRequestPayload = serde_json::from_value(json!({
            "correlation_id": Uuid::new_v4(),
            "origin": "a",
            "kind": "t"
        }))
        .unwrap();
        assert!(payload.id.is_none());
        assert!(!payload.expects_result);
    }

    #[test]
    fn test_response_from_settled_outcomes() {
        let id = Uuid::new_v4();
        let approved = AddRequestResponse::from_outcome(
            id,
            "req-1".to_string(),
            Ok(ApprovalOutcome::Value(Some(json!("ok")))),
        );
        assert!(approved.approved);
        assert_eq!(approved.value, Some(json!("ok")));

        let rejected = AddRequestResponse::from_outcome(
            id,
            "req-1".to_string(),
            Err(ApprovalError::Rejected(Rejection::new("no"))),
        );
        assert!(!rejected.approved);
        assert!(rejected.error.unwrap().contains("no"));
    }

    #[test]
    fn test_has_payload_requires_single_filter_kind() {
        let payload = HasRequestPayload {
            correlation_id: Uuid::new_v4(),
            id: Some("req-1".to_string()),
            origin: Some("a".to_string()),
            kind: None,
        };
        assert!(payload.into_filter().is_err());
    }
}
