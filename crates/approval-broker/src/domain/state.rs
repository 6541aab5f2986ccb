//! State store: the canonical, externally observable broker state.
//!
//! The store is exclusively owned by the lifecycle engine; every mutation
//! goes through [`StateContainer::update`], which applies the mutator
//! synchronously and returns the structural diff for the state-changed
//! broadcast. Nothing is persisted: all fields are transient by policy (see
//! [`state_metadata`]).

use super::diff::{diff_values, StateDiff};
use super::entities::ApprovalRequest;
use super::flows::FlowStack;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The aggregate broker state.
///
/// Invariant: `pending_approval_count == pending_approvals.len()` at every
/// externally observable point.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApprovalState {
    /// Pending requests by id.
    pub pending_approvals: BTreeMap<String, ApprovalRequest>,
    /// Maintained aggregate count.
    pub pending_approval_count: usize,
    /// Open approval flows, innermost last.
    pub approval_flows: FlowStack,
}

/// Visibility flags for one aggregate-state field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateMetadata {
    /// Whether the field participates in cross-restart persistence.
    pub persist: bool,
    /// Whether the field may appear in anonymized telemetry snapshots.
    pub include_in_telemetry: bool,
}

/// Visibility policy for every aggregate-state field.
///
/// Pending approvals and flows never survive a restart; the pending map is
/// additionally exempt from anonymized capture.
#[must_use]
pub fn state_metadata() -> BTreeMap<&'static str, StateMetadata> {
    BTreeMap::from([
        (
            "pending_approvals",
            StateMetadata {
                persist: false,
                include_in_telemetry: false,
            },
        ),
        (
            "pending_approval_count",
            StateMetadata {
                persist: false,
                include_in_telemetry: true,
            },
        ),
        (
            "approval_flows",
            StateMetadata {
                persist: false,
                include_in_telemetry: true,
            },
        ),
    ])
}

/// Exclusive state holder with diff-producing updates.
#[derive(Debug, Default)]
pub struct StateContainer {
    state: ApprovalState,
}

impl StateContainer {
    /// Creates a container holding the empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the current state.
    #[must_use]
    pub fn read(&self) -> &ApprovalState {
        &self.state
    }

    /// Clones the current state.
    #[must_use]
    pub fn snapshot(&self) -> ApprovalState {
        self.state.clone()
    }

    /// Applies `mutator` to the state and returns its result together with
    /// the structural diff of the change.
    ///
    /// The mutator runs to completion synchronously; the state is never
    /// observable mid-mutation.
    pub fn update<T>(&mut self, mutator: impl FnOnce(&mut ApprovalState) -> T) -> (T, StateDiff) {
        let before = to_tree(&self.state);
        let result = mutator(&mut self.state);
        let after = to_tree(&self.state);
        (result, diff_values(&before, &after))
    }

    /// Projects the serialized state through a metadata predicate, keeping
    /// only fields whose flags satisfy it.
    #[must_use]
    pub fn filtered_snapshot(&self, keep: impl Fn(&StateMetadata) -> bool) -> Value {
        let metadata = state_metadata();
        match to_tree(&self.state) {
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .filter(|(field, _)| {
                        metadata.get(field.as_str()).is_some_and(&keep)
                    })
                    .collect(),
            ),
            other => other,
        }
    }
}

// The state is plain data with string keys; serialization cannot fail.
fn to_tree(state: &ApprovalState) -> Value {
    serde_json::to_value(state).unwrap_or(Value::Null)
}
