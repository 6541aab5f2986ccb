//! Ports layer for the approval broker.
//!
//! Defines the hexagonal architecture port traits:
//! - Inbound (Driving) ports: API exposed to callers
//! - Outbound (Driven) ports: dependencies on time, ids, the
//!   decision-maker surface, and state observers

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
