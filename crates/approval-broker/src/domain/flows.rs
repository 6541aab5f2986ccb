//! Flow stack: nested approval sequences as a LIFO structure.
//!
//! Flows must close in strict reverse order of opening; the lifecycle engine
//! enforces the top-id match before popping. The stack serializes as the
//! plain ordered flow list inside the aggregate state.

use super::entities::ApprovalFlow;
use serde::{Deserialize, Serialize};

/// Ordered LIFO stack of open approval flows.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowStack(Vec<ApprovalFlow>);

impl FlowStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a flow onto the top of the stack.
    pub fn push(&mut self, flow: ApprovalFlow) {
        self.0.push(flow);
    }

    /// Pops the top flow, if any.
    pub fn pop(&mut self) -> Option<ApprovalFlow> {
        self.0.pop()
    }

    /// Returns the innermost (top) flow.
    #[must_use]
    pub fn top(&self) -> Option<&ApprovalFlow> {
        self.0.last()
    }

    /// Returns all open flow ids in opening order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.0.iter().map(|f| f.id.clone()).collect()
    }

    /// Returns the number of open flows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no flows are open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
