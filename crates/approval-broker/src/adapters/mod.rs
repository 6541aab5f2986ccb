//! Adapters layer for the approval broker.
//!
//! Connects the ports to the shared bus: state-changed broadcasting and
//! the named action surface.

pub mod publisher;
pub mod service;

pub use publisher::BusStatePublisher;
pub use service::{actions, ApprovalService};
