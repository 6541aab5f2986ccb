//! # Action Registry
//!
//! Named request/response handlers for the bus. A subsystem registers a
//! handler under a string name ("subsystem.verb"); any collaborator can then
//! invoke it with a JSON payload and await the JSON response.
//!
//! Handlers are installed once and never replaced: a duplicate registration
//! is a wiring bug and fails loudly.

use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from action registration and invocation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// No handler is registered under the requested name.
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// A handler is already registered under this name.
    #[error("Action already registered: {0}")]
    DuplicateAction(String),

    /// The handler rejected the request.
    #[error("Action failed: {0}")]
    Handler(String),

    /// The payload could not be decoded by the handler.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// Boxed future returned by an action handler.
pub type BoxedActionFuture = Pin<Box<dyn Future<Output = Result<Value, ActionError>> + Send>>;

/// An action handler: JSON payload in, JSON response (or error) out.
pub type ActionHandler = Arc<dyn Fn(Value) -> BoxedActionFuture + Send + Sync>;

/// Registry mapping action names to handlers.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    handlers: Arc<RwLock<HashMap<String, ActionHandler>>>,
}

impl ActionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under `name`.
    ///
    /// # Errors
    /// `DuplicateAction` if the name is already taken.
    pub fn register(&self, name: &str, handler: ActionHandler) -> Result<(), ActionError> {
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if handlers.contains_key(name) {
            warn!(action = name, "Duplicate action registration rejected");
            return Err(ActionError::DuplicateAction(name.to_string()));
        }

        handlers.insert(name.to_string(), handler);
        debug!(action = name, "Action handler registered");
        Ok(())
    }

    /// Invokes the handler registered under `name`.
    ///
    /// # Errors
    /// `UnknownAction` if no handler exists; otherwise whatever the handler
    /// returns.
    pub async fn call(&self, name: &str, payload: Value) -> Result<Value, ActionError> {
        let handler = {
            let handlers = self
                .handlers
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            handlers
                .get(name)
                .cloned()
                .ok_or_else(|| ActionError::UnknownAction(name.to_string()))?
        };

        debug!(action = name, "Action invoked");
        handler(payload).await
    }

    /// Returns true if a handler is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains_key(name)
    }

    /// Returns the number of registered actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Returns true if no actions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
