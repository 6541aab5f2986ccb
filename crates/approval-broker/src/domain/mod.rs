//! # Domain Layer - Approval Broker
//!
//! Pure business logic for tracking and settling approval requests.
//!
//! ## Components
//!
//! - `entities`: ApprovalRequest, ApprovalFlow, Rejection, BrokerConfig
//! - `state`: aggregate state, visibility metadata, diff-producing container
//! - `diff`: structural diff between serialized state trees
//! - `index`: derived origin/kind counts for O(1) duplicate checks
//! - `registry`: creator-side settlement handles and the pending future
//! - `outcome`: settlement shapes delivered on acceptance
//! - `flows`: LIFO stack of nested approval flows
//! - `engine`: the request lifecycle orchestrator owning all of the above
//! - `value_objects`: creation arguments, accept options, query filters
//! - `errors`: ApprovalError enumeration

pub mod diff;
pub mod engine;
pub mod entities;
pub mod errors;
pub mod flows;
pub mod index;
pub mod outcome;
pub mod registry;
pub mod state;
pub mod value_objects;

pub use diff::*;
pub use engine::*;
pub use entities::*;
pub use errors::*;
pub use flows::*;
pub use index::*;
pub use outcome::*;
pub use registry::*;
pub use state::*;
pub use value_objects::*;
