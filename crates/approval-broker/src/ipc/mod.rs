//! # IPC Layer - Approval Broker
//!
//! Wire payloads and the message handler that translates them into engine
//! calls. The bus itself lives in the `message-bus` crate; the adapters
//! layer registers the actions.

pub mod handler;
pub mod payloads;

pub use handler::*;
pub use payloads::*;
