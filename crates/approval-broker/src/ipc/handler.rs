//! IPC message handler translating wire payloads into engine calls.

use crate::domain::{AcceptOptions, AcceptTicket, ApprovalEngine, ApprovalError, PendingApproval};
use crate::ipc::payloads::*;
use crate::ports::{IdSource, TimeSource};

/// Handles IPC messages for the approval broker.
///
/// Owns the engine. Payload-shape validation happens here; everything else
/// is delegated. Add and accept return futures rather than responses: the
/// caller awaits settlement and builds the response from the outcome.
pub struct IpcHandler<C: TimeSource, G: IdSource> {
    engine: ApprovalEngine<C, G>,
}

impl<C: TimeSource, G: IdSource> IpcHandler<C, G> {
    pub fn new(engine: ApprovalEngine<C, G>) -> Self {
        Self { engine }
    }

    /// Returns a reference to the underlying engine.
    pub fn engine(&self) -> &ApprovalEngine<C, G> {
        &self.engine
    }

    /// Returns a mutable reference to the underlying engine.
    pub fn engine_mut(&mut self) -> &mut ApprovalEngine<C, G> {
        &mut self.engine
    }

    /// Handles an add action. The returned future settles when the
    /// request is accepted, rejected, or cleared.
    pub fn handle_add(
        &mut self,
        payload: AddRequestPayload,
    ) -> Result<PendingApproval, ApprovalError> {
        self.engine.add(payload.into_args()?)
    }

    /// Handles an add action in "show" mode.
    pub async fn handle_add_and_show(
        &mut self,
        payload: AddRequestPayload,
    ) -> Result<PendingApproval, ApprovalError> {
        self.engine.add_and_show(payload.into_args()?).await
    }

    /// Handles an existence query.
    pub fn handle_has(
        &self,
        payload: HasRequestPayload,
    ) -> Result<HasRequestResponse, ApprovalError> {
        let correlation_id = payload.correlation_id;
        let filter = payload.into_filter()?;
        Ok(HasRequestResponse {
            correlation_id,
            exists: self.engine.has(&filter),
        })
    }

    /// Handles a filtered count query.
    pub fn handle_count(
        &self,
        payload: CountRequestPayload,
    ) -> Result<CountResponse, ApprovalError> {
        let correlation_id = payload.correlation_id;
        let filter = payload.into_filter()?;
        Ok(CountResponse {
            correlation_id,
            count: self.engine.count(&filter),
        })
    }

    /// Handles an aggregate count query.
    pub fn handle_total_count(&self, payload: TotalCountPayload) -> CountResponse {
        CountResponse {
            correlation_id: payload.correlation_id,
            count: self.engine.total_count(),
        }
    }

    /// Handles an accept action. The returned ticket resolves immediately
    /// unless the payload asked to wait for a result.
    pub fn handle_accept(
        &mut self,
        payload: AcceptRequestPayload,
    ) -> Result<AcceptTicket, ApprovalError> {
        self.engine.accept(
            &payload.id,
            payload.value,
            AcceptOptions {
                wait_for_result: payload.wait_for_result,
            },
        )
    }

    /// Handles a reject action.
    pub fn handle_reject(
        &mut self,
        payload: RejectRequestPayload,
    ) -> Result<AckResponse, ApprovalError> {
        self.engine.reject(&payload.id, payload.error)?;
        Ok(AckResponse {
            correlation_id: payload.correlation_id,
        })
    }

    /// Handles an update-request-state action.
    pub fn handle_update_request_state(
        &mut self,
        payload: UpdateRequestStatePayload,
    ) -> Result<AckResponse, ApprovalError> {
        let correlation_id = payload.correlation_id;
        let id = payload.id.clone();
        let state = payload.into_state()?;
        self.engine.update_request_state(&id, state)?;
        Ok(AckResponse { correlation_id })
    }

    /// Handles a start-flow action.
    pub async fn handle_start_flow(
        &mut self,
        payload: StartFlowPayload,
    ) -> Result<StartFlowResponse, ApprovalError> {
        let id = self.engine.start_flow(payload.id).await?;
        Ok(StartFlowResponse {
            correlation_id: payload.correlation_id,
            id,
        })
    }

    /// Handles an end-flow action.
    pub fn handle_end_flow(&mut self, payload: EndFlowPayload) -> Result<AckResponse, ApprovalError> {
        self.engine.end_flow(&payload.id)?;
        Ok(AckResponse {
            correlation_id: payload.correlation_id,
        })
    }

    /// Handles a clear action.
    pub fn handle_clear(&mut self, payload: ClearRequestsPayload) -> ClearRequestsResponse {
        let cleared = self.engine.clear(payload.error);
        ClearRequestsResponse {
            correlation_id: payload.correlation_id,
            cleared,
        }
    }

    /// Handles a get-state query.
    pub fn handle_get_state(&self, payload: GetStatePayload) -> GetStateResponse {
        GetStateResponse {
            correlation_id: payload.correlation_id,
            state: self.engine.state_snapshot(),
        }
    }
}
