//! Bus action registration for the approval broker.
//!
//! [`ApprovalService`] wires an [`IpcHandler`] onto an injected bus,
//! registering one handler per named action. Settlement-bearing actions
//! (add, accept-with-wait) obtain their future while holding the handler
//! lock and await it after releasing, so the broker stays callable while a
//! response is pending.

use crate::domain::{ApprovalError, BrokerConfig};
use crate::ipc::handler::IpcHandler;
use crate::ipc::payloads::*;
use crate::ports::{IdSource, RequestDisplay, TimeSource};
use message_bus::{ActionError, InMemoryMessageBus};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Action names exposed on the bus.
pub mod actions {
    /// Track a request without poking the decision-maker surface.
    pub const ADD: &str = "approval.add";
    /// Track a request and poke the decision-maker surface.
    pub const ADD_AND_SHOW: &str = "approval.add_and_show";
    /// Existence query.
    pub const HAS: &str = "approval.has";
    /// Filtered count query.
    pub const COUNT: &str = "approval.count";
    /// Aggregate count query.
    pub const COUNT_TOTAL: &str = "approval.count_total";
    /// Approve a pending request.
    pub const ACCEPT: &str = "approval.accept";
    /// Reject a pending request.
    pub const REJECT: &str = "approval.reject";
    /// Replace the mutable state of a pending request.
    pub const UPDATE_REQUEST_STATE: &str = "approval.update_request_state";
    /// Open a nested approval flow.
    pub const START_FLOW: &str = "approval.start_flow";
    /// Close the innermost approval flow.
    pub const END_FLOW: &str = "approval.end_flow";
    /// Reject every pending request.
    pub const CLEAR: &str = "approval.clear";
    /// Full aggregate state snapshot.
    pub const GET_STATE: &str = "approval.get_state";
}

fn to_action_error(error: ApprovalError) -> ActionError {
    match error {
        ApprovalError::InvalidRequest { .. } => ActionError::InvalidPayload(error.to_string()),
        other => ActionError::Handler(other.to_string()),
    }
}

fn decode<T: DeserializeOwned>(payload: Value) -> Result<T, ActionError> {
    serde_json::from_value(payload).map_err(|e| ActionError::InvalidPayload(e.to_string()))
}

fn encode<T: Serialize>(response: &T) -> Result<Value, ActionError> {
    serde_json::to_value(response).map_err(|e| ActionError::Handler(e.to_string()))
}

/// The approval broker, attached to a bus.
///
/// Holds the handler behind an async lock shared with the registered
/// action closures.
pub struct ApprovalService<C: TimeSource + 'static, G: IdSource + 'static> {
    handler: Arc<Mutex<IpcHandler<C, G>>>,
    bus: Arc<InMemoryMessageBus<BrokerEvent>>,
}

impl ApprovalService<crate::ports::SystemTimeSource, crate::ports::UuidIdSource> {
    /// Builds a production broker on the given bus: system time, UUID ids,
    /// state changes published as bus events, all actions registered.
    pub fn attach(
        config: BrokerConfig,
        display: Arc<dyn RequestDisplay>,
        bus: Arc<InMemoryMessageBus<BrokerEvent>>,
    ) -> Result<Self, ActionError> {
        Self::attach_with_sources(
            config,
            crate::ports::SystemTimeSource,
            crate::ports::UuidIdSource,
            display,
            bus,
        )
    }
}

impl<C: TimeSource + 'static, G: IdSource + 'static> ApprovalService<C, G> {
    /// [`attach`](ApprovalService::attach) with explicit time and id
    /// sources.
    pub fn attach_with_sources(
        config: BrokerConfig,
        clock: C,
        ids: G,
        display: Arc<dyn RequestDisplay>,
        bus: Arc<InMemoryMessageBus<BrokerEvent>>,
    ) -> Result<Self, ActionError> {
        let listener = Arc::new(super::publisher::BusStatePublisher::new(Arc::clone(&bus)));
        let engine = crate::domain::ApprovalEngine::with_sources(
            config, clock, ids, display, listener,
        );
        let service = Self {
            handler: Arc::new(Mutex::new(IpcHandler::new(engine))),
            bus,
        };
        service.register()?;
        Ok(service)
    }

    /// Shared access to the handler, for in-process callers that bypass
    /// the bus.
    pub fn handler(&self) -> Arc<Mutex<IpcHandler<C, G>>> {
        Arc::clone(&self.handler)
    }

    /// Registers every action on the bus. Fails if any name is taken.
    fn register(&self) -> Result<(), ActionError> {
        self.register_add(actions::ADD, false)?;
        self.register_add(actions::ADD_AND_SHOW, true)?;
        self.register_has()?;
        self.register_count()?;
        self.register_count_total()?;
        self.register_accept()?;
        self.register_reject()?;
        self.register_update_request_state()?;
        self.register_start_flow()?;
        self.register_end_flow()?;
        self.register_clear()?;
        self.register_get_state()?;
        info!("approval broker actions registered");
        Ok(())
    }

    fn register_add(&self, name: &str, show: bool) -> Result<(), ActionError> {
        let handler = Arc::clone(&self.handler);
        self.bus.register_action(
            name,
            Arc::new(move |payload| {
                let handler = Arc::clone(&handler);
                Box::pin(async move {
                    let payload: AddRequestPayload = decode(payload)?;
                    let correlation_id = payload.correlation_id;
                    // The lock is released before awaiting settlement, so
                    // accept/reject stay reachable while this is pending.
                    let pending = {
                        let mut guard = handler.lock().await;
                        if show {
                            guard
                                .handle_add_and_show(payload)
                                .await
                                .map_err(to_action_error)?
                        } else {
                            guard.handle_add(payload).map_err(to_action_error)?
                        }
                    };
                    let id = pending.id().to_string();
                    let outcome = pending.await;
                    encode(&AddRequestResponse::from_outcome(correlation_id, id, outcome))
                })
            }),
        )
    }

    fn register_has(&self) -> Result<(), ActionError> {
        let handler = Arc::clone(&self.handler);
        self.bus.register_action(
            actions::HAS,
            Arc::new(move |payload| {
                let handler = Arc::clone(&handler);
                Box::pin(async move {
                    let payload: HasRequestPayload = decode(payload)?;
                    let response = handler
                        .lock()
                        .await
                        .handle_has(payload)
                        .map_err(to_action_error)?;
                    encode(&response)
                })
            }),
        )
    }

    fn register_count(&self) -> Result<(), ActionError> {
        let handler = Arc::clone(&self.handler);
        self.bus.register_action(
            actions::COUNT,
            Arc::new(move |payload| {
                let handler = Arc::clone(&handler);
                Box::pin(async move {
                    let payload: CountRequestPayload = decode(payload)?;
                    let response = handler
                        .lock()
                        .await
                        .handle_count(payload)
                        .map_err(to_action_error)?;
                    encode(&response)
                })
            }),
        )
    }

    fn register_count_total(&self) -> Result<(), ActionError> {
        let handler = Arc::clone(&self.handler);
        self.bus.register_action(
            actions::COUNT_TOTAL,
            Arc::new(move |payload| {
                let handler = Arc::clone(&handler);
                Box::pin(async move {
                    let payload: TotalCountPayload = decode(payload)?;
                    let response = handler.lock().await.handle_total_count(payload);
                    encode(&response)
                })
            }),
        )
    }

    fn register_accept(&self) -> Result<(), ActionError> {
        let handler = Arc::clone(&self.handler);
        self.bus.register_action(
            actions::ACCEPT,
            Arc::new(move |payload| {
                let handler = Arc::clone(&handler);
                Box::pin(async move {
                    let payload: AcceptRequestPayload = decode(payload)?;
                    let correlation_id = payload.correlation_id;
                    let ticket = {
                        let mut guard = handler.lock().await;
                        guard.handle_accept(payload).map_err(to_action_error)?
                    };
                    let result = ticket.await.map_err(to_action_error)?;
                    encode(&AcceptRequestResponse {
                        correlation_id,
                        value: result.value,
                    })
                })
            }),
        )
    }

    fn register_reject(&self) -> Result<(), ActionError> {
        let handler = Arc::clone(&self.handler);
        self.bus.register_action(
            actions::REJECT,
            Arc::new(move |payload| {
                let handler = Arc::clone(&handler);
                Box::pin(async move {
                    let payload: RejectRequestPayload = decode(payload)?;
                    let response = handler
                        .lock()
                        .await
                        .handle_reject(payload)
                        .map_err(to_action_error)?;
                    encode(&response)
                })
            }),
        )
    }

    fn register_update_request_state(&self) -> Result<(), ActionError> {
        let handler = Arc::clone(&self.handler);
        self.bus.register_action(
            actions::UPDATE_REQUEST_STATE,
            Arc::new(move |payload| {
                let handler = Arc::clone(&handler);
                Box::pin(async move {
                    let payload: UpdateRequestStatePayload = decode(payload)?;
                    let response = handler
                        .lock()
                        .await
                        .handle_update_request_state(payload)
                        .map_err(to_action_error)?;
                    encode(&response)
                })
            }),
        )
    }

    fn register_start_flow(&self) -> Result<(), ActionError> {
        let handler = Arc::clone(&self.handler);
        self.bus.register_action(
            actions::START_FLOW,
            Arc::new(move |payload| {
                let handler = Arc::clone(&handler);
                Box::pin(async move {
                    let payload: StartFlowPayload = decode(payload)?;
                    let response = handler
                        .lock()
                        .await
                        .handle_start_flow(payload)
                        .await
                        .map_err(to_action_error)?;
                    encode(&response)
                })
            }),
        )
    }

    fn register_end_flow(&self) -> Result<(), ActionError> {
        let handler = Arc::clone(&self.handler);
        self.bus.register_action(
            actions::END_FLOW,
            Arc::new(move |payload| {
                let handler = Arc::clone(&handler);
                Box::pin(async move {
                    let payload: EndFlowPayload = decode(payload)?;
                    let response = handler
                        .lock()
                        .await
                        .handle_end_flow(payload)
                        .map_err(to_action_error)?;
                    encode(&response)
                })
            }),
        )
    }

    fn register_clear(&self) -> Result<(), ActionError> {
        let handler = Arc::clone(&self.handler);
        self.bus.register_action(
            actions::CLEAR,
            Arc::new(move |payload| {
                let handler = Arc::clone(&handler);
                Box::pin(async move {
                    let payload: ClearRequestsPayload = decode(payload)?;
                    let response = handler.lock().await.handle_clear(payload);
                    encode(&response)
                })
            }),
        )
    }

    fn register_get_state(&self) -> Result<(), ActionError> {
        let handler = Arc::clone(&self.handler);
        self.bus.register_action(
            actions::GET_STATE,
            Arc::new(move |payload| {
                let handler = Arc::clone(&handler);
                Box::pin(async move {
                    let payload: GetStatePayload = decode(payload)?;
                    let response = handler.lock().await.handle_get_state(payload);
                    encode(&response)
                })
            }),
        )
    }
}
