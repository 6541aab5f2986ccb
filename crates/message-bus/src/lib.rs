//! # Message Bus - In-Process Communication Between Subsystems
//!
//! Two complementary surfaces:
//!
//! - **Broadcast events**: fire-and-forget notifications fanned out to every
//!   subscriber (`publish` / `subscribe`).
//! - **Named actions**: request/response handlers registered under a string
//!   name and invoked with a JSON payload (`register_action` / `call_action`).
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ Subsystem A  │                    │ Subsystem B  │
//! │              │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │ Message Bus  │ ─────────┘
//!                  │              │  subscribe() / call_action()
//!                  └──────────────┘
//! ```
//!
//! The bus carries no domain types: it is generic over the event type, and
//! action payloads are `serde_json::Value`. Subsystems receive the bus as an
//! injected dependency at construction time.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod actions;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use actions::{ActionError, ActionHandler, ActionRegistry, BoxedActionFuture};
pub use publisher::{EventPublisher, InMemoryMessageBus};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before older events lapse.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
