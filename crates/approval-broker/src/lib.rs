//! # Approval Broker
//!
//! Tracks requests awaiting an external decision-maker until they are
//! approved, rejected, or swept, enforcing at-most-one-pending-request per
//! (origin, kind) and supporting nested multi-step approval flows that must
//! close in strict reverse order of opening.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | 1 | `pending_approval_count` equals the map size | `domain/engine.rs` - every `store.update` recomputes it |
//! | 2 | Stored ids and registered callbacks are 1:1 | `domain/engine.rs` - `add` / `take_request` / `clear` |
//! | 3 | The origin/kind index is exactly derived from the store | `domain/engine.rs` - increment/decrement beside insert/remove |
//! | 4 | At most one pending request per non-excluded (origin, kind) | `domain/engine.rs` - `add` duplicate check |
//! | 5 | Flows pop only from the top, only by the matching id | `domain/engine.rs` - `end_flow` precheck |
//!
//! ## Completion Protocol
//!
//! ```text
//! creator ──add()──→ [PENDING] ──accept()──→ creator future resolves
//!    │                   │                   (raw value or result envelope)
//!    │                   ├──reject()──────→ creator future fails
//!    future              └──clear()───────→ creator future fails (bulk)
//!
//! acceptor ──accept(wait_for_result)──→ ticket pending until the creator
//!            calls callbacks.success / callbacks.error (first call wins)
//! ```
//!
//! Removal from the store is the serialization point: for a given id, at
//! most one of accept / reject / clear-induced-reject settles it; any later
//! attempt fails with not-found.
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      OUTER LAYER                                │
//! │  adapters/ - bus action registration, state-changed publisher   │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MIDDLE LAYER                               │
//! │  ports/inbound.rs  - ApprovalApi trait                          │
//! │  ports/outbound.rs - TimeSource, IdSource, RequestDisplay,      │
//! │                      StateListener traits                       │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      INNER LAYER                                │
//! │  domain/engine.rs        - request lifecycle orchestrator       │
//! │  domain/state.rs         - aggregate state, diffing container   │
//! │  domain/registry.rs      - creator-side settlement handles      │
//! │  domain/outcome.rs       - settlement shapes, result callbacks  │
//! │  domain/index.rs         - derived origin/kind counts           │
//! │  domain/flows.rs         - LIFO flow stack                      │
//! │  domain/errors.rs        - ApprovalError enum                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod domain;
pub mod ipc;
pub mod ports;

pub use adapters::*;
pub use domain::*;
pub use ipc::*;
pub use ports::*;
