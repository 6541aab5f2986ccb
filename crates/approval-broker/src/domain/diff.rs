//! Structural diff between two serialized state trees.
//!
//! The state-changed event carries both the full aggregate state and the
//! structural change that produced it. The diff is computed by recursive
//! comparison of the serialized old/new trees: objects are walked key by
//! key; everything else (scalars, sequences) is compared whole.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The kind of change at a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffKind {
    /// The path exists only in the new tree.
    Added,
    /// The path exists only in the old tree.
    Removed,
    /// The path exists in both trees with different values.
    Changed,
}

/// A single change entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiffOp {
    /// Slash-separated path from the root, e.g. `/pending_approvals/req-1`.
    pub path: String,
    /// The kind of change.
    pub op: DiffKind,
    /// The new value at the path; `None` for removals.
    pub value: Option<Value>,
}

/// An ordered list of changes between two state trees.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDiff {
    /// The changes, in tree order.
    pub ops: Vec<DiffOp>,
}

impl StateDiff {
    /// Returns true if the trees were identical.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Computes the structural diff from `old` to `new`.
#[must_use]
pub fn diff_values(old: &Value, new: &Value) -> StateDiff {
    let mut diff = StateDiff::default();
    diff_into(old, new, "", &mut diff);
    diff
}

fn diff_into(old: &Value, new: &Value, path: &str, diff: &mut StateDiff) {
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            for (key, old_value) in old_map {
                let child = format!("{path}/{key}");
                match new_map.get(key) {
                    Some(new_value) => diff_into(old_value, new_value, &child, diff),
                    None => diff.ops.push(DiffOp {
                        path: child,
                        op: DiffKind::Removed,
                        value: None,
                    }),
                }
            }
            for (key, new_value) in new_map {
                if !old_map.contains_key(key) {
                    diff.ops.push(DiffOp {
                        path: format!("{path}/{key}"),
                        op: DiffKind::Added,
                        value: Some(new_value.clone()),
                    });
                }
            }
        }
        (old_value, new_value) => {
            if old_value != new_value {
                diff.ops.push(DiffOp {
                    path: if path.is_empty() {
                        "/".to_string()
                    } else {
                        path.to_string()
                    },
                    op: DiffKind::Changed,
                    value: Some(new_value.clone()),
                });
            }
        }
    }
}
