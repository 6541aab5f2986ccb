//! Request lifecycle engine.
//!
//! Orchestrates the full life of an approval request: validated creation,
//! duplicate detection against the origin/kind index, settlement through
//! the callback registry, bulk clearing, and the nested flow stack. The
//! engine exclusively owns the state store, index, and registry; every
//! mutation updates all three before control returns to the caller, and
//! the state listener is notified with the structural diff after each one.
//!
//! Failure precedence is fixed: input validation, then duplicate
//! detection, then existence, then flow misuse.

use super::entities::{
    require_non_empty, ApprovalFlow, ApprovalRequest, BrokerConfig, Rejection, RequestData,
};
use super::errors::ApprovalError;
use super::index::OriginIndex;
use super::outcome::{AcceptResult, AcceptTicket, ApprovalOutcome, ResultCallbacks, ResultEnvelope};
use super::registry::{CallbackRegistry, PendingApproval};
use super::state::{ApprovalState, StateContainer};
use super::value_objects::{AcceptOptions, AddRequestArgs, CountFilter, HasFilter};
use crate::domain::diff::StateDiff;
use crate::ports::{
    ApprovalApi, IdSource, RequestDisplay, StateListener, SystemTimeSource, TimeSource,
    UuidIdSource,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// The approval broker core.
///
/// Generic over its time and id sources so tests run deterministically;
/// production code uses [`SystemTimeSource`] and [`UuidIdSource`].
pub struct ApprovalEngine<C: TimeSource = SystemTimeSource, G: IdSource = UuidIdSource> {
    config: BrokerConfig,
    store: StateContainer,
    index: OriginIndex,
    registry: CallbackRegistry,
    clock: C,
    ids: G,
    display: Arc<dyn RequestDisplay>,
    listener: Arc<dyn StateListener>,
}

impl ApprovalEngine {
    /// Creates an engine with system time and UUID ids.
    pub fn new(
        config: BrokerConfig,
        display: Arc<dyn RequestDisplay>,
        listener: Arc<dyn StateListener>,
    ) -> Self {
        Self::with_sources(config, SystemTimeSource, UuidIdSource, display, listener)
    }
}

impl<C: TimeSource, G: IdSource> ApprovalEngine<C, G> {
    /// Creates an engine with explicit time and id sources.
    pub fn with_sources(
        config: BrokerConfig,
        clock: C,
        ids: G,
        display: Arc<dyn RequestDisplay>,
        listener: Arc<dyn StateListener>,
    ) -> Self {
        Self {
            config,
            store: StateContainer::new(),
            index: OriginIndex::new(),
            registry: CallbackRegistry::new(),
            clock,
            ids,
            display,
            listener,
        }
    }

    // ========================================================================
    // Creation & query
    // ========================================================================

    /// Tracks a new approval request and returns the creator-facing future.
    pub fn add(&mut self, args: AddRequestArgs) -> Result<PendingApproval, ApprovalError> {
        let id = match args.id {
            Some(id) => {
                require_non_empty("id", &id)?;
                id
            }
            None => self.ids.next_id(),
        };
        if self.registry.contains(&id) {
            return Err(ApprovalError::invalid(format!(
                "id '{id}' is already registered"
            )));
        }
        require_non_empty("origin", &args.origin)?;
        require_non_empty("kind", &args.kind)?;

        if !self.config.is_excluded(&args.kind) && self.index.count(&args.origin, &args.kind) > 0 {
            return Err(ApprovalError::AlreadyPending {
                origin: args.origin,
                kind: args.kind,
            });
        }

        let pending = self.registry.register(&id);
        self.index.increment(&args.origin, &args.kind);
        let request = ApprovalRequest {
            id: id.clone(),
            origin: args.origin,
            kind: args.kind,
            created_at: self.clock.now(),
            request_data: args.request_data,
            request_state: args.request_state,
            expects_result: args.expects_result,
        };
        debug!(id = %id, origin = %request.origin, kind = %request.kind, "tracking approval request");
        let (_, diff) = self.store.update(|state| {
            state.pending_approvals.insert(id, request);
            state.pending_approval_count = state.pending_approvals.len();
        });
        self.notify(&diff);
        Ok(pending)
    }

    /// [`add`](Self::add), then pokes the decision-maker surface.
    pub async fn add_and_show(
        &mut self,
        args: AddRequestArgs,
    ) -> Result<PendingApproval, ApprovalError> {
        let pending = self.add(args)?;
        self.poke_display(pending.id()).await;
        Ok(pending)
    }

    /// Snapshot of the pending request with the given id, if any.
    pub fn get(&self, id: &str) -> Option<ApprovalRequest> {
        self.store.read().pending_approvals.get(id).cloned()
    }

    /// Whether any pending request matches the filter.
    pub fn has(&self, filter: &HasFilter) -> bool {
        match filter {
            HasFilter::Id(id) => self.registry.contains(id),
            HasFilter::Origin { origin, kind } => self.index.has(origin, kind.as_deref()),
            HasFilter::Kind(kind) => self
                .store
                .read()
                .pending_approvals
                .values()
                .any(|request| &request.kind == kind),
        }
    }

    /// Number of pending requests matching the filter.
    pub fn count(&self, filter: &CountFilter) -> usize {
        match filter {
            CountFilter::OriginAndKind { origin, kind } => self.index.count(origin, kind),
            CountFilter::Origin(origin) => self.index.count_for_origin(origin),
            CountFilter::Kind(kind) => self
                .store
                .read()
                .pending_approvals
                .values()
                .filter(|request| &request.kind == kind)
                .count(),
        }
    }

    /// The maintained aggregate count.
    pub fn total_count(&self) -> usize {
        self.store.read().pending_approval_count
    }

    /// Replaces the mutable `request_state` of a pending request.
    pub fn update_request_state(
        &mut self,
        id: &str,
        request_state: RequestData,
    ) -> Result<(), ApprovalError> {
        if !self.store.read().pending_approvals.contains_key(id) {
            return Err(ApprovalError::NotFound { id: id.to_string() });
        }
        let (_, diff) = self.store.update(|state| {
            if let Some(request) = state.pending_approvals.get_mut(id) {
                request.request_state = Some(request_state);
            }
        });
        self.notify(&diff);
        Ok(())
    }

    // ========================================================================
    // Completion protocol
    // ========================================================================

    /// Approves a pending request.
    ///
    /// Removal is the serialization point: once this returns `Ok`, no other
    /// settlement of the same id can succeed. The creator-facing future is
    /// settled synchronously within this call; the returned ticket resolves
    /// immediately unless the acceptor asked to wait for a result.
    pub fn accept(
        &mut self,
        id: &str,
        value: Option<Value>,
        options: AcceptOptions,
    ) -> Result<AcceptTicket, ApprovalError> {
        let (request, diff) = self.take_request(id)?;
        debug!(id = %request.id, wait_for_result = options.wait_for_result, "accepting approval request");

        let (outcome, ticket) = if request.expects_result {
            if options.wait_for_result {
                let (callbacks, rx) = ResultCallbacks::wired();
                (
                    ApprovalOutcome::Envelope(ResultEnvelope { value, callbacks }),
                    AcceptTicket::pending(rx),
                )
            } else {
                // Callbacks are still delivered, but nobody listens to them.
                (
                    ApprovalOutcome::Envelope(ResultEnvelope {
                        value,
                        callbacks: ResultCallbacks::inert(),
                    }),
                    AcceptTicket::settled(Ok(AcceptResult { value: None })),
                )
            }
        } else {
            let ticket = if options.wait_for_result {
                AcceptTicket::settled(Err(ApprovalError::NoResultSupport {
                    id: request.id.clone(),
                }))
            } else {
                AcceptTicket::settled(Ok(AcceptResult { value: None }))
            };
            (ApprovalOutcome::Value(value), ticket)
        };

        self.registry.settle(&request.id, Ok(outcome));
        self.notify(&diff);
        Ok(ticket)
    }

    /// Rejects a pending request, failing the creator's future.
    pub fn reject(&mut self, id: &str, rejection: Rejection) -> Result<(), ApprovalError> {
        let (request, diff) = self.take_request(id)?;
        debug!(id = %request.id, reason = %rejection.message, "rejecting approval request");
        self.registry
            .settle(&request.id, Err(ApprovalError::Rejected(rejection)));
        self.notify(&diff);
        Ok(())
    }

    /// Rejects every pending request in one atomic sweep. Open flows are
    /// left untouched. Returns how many requests were cleared.
    pub fn clear(&mut self, rejection: Rejection) -> usize {
        let ids: Vec<String> = self.store.read().pending_approvals.keys().cloned().collect();
        for id in &ids {
            self.registry
                .settle(id, Err(ApprovalError::Rejected(rejection.clone())));
        }
        let (_, diff) = self.store.update(|state| {
            state.pending_approvals.clear();
            state.pending_approval_count = 0;
        });
        self.index.clear();
        debug!(cleared = ids.len(), "cleared pending approval requests");
        self.notify(&diff);
        ids.len()
    }

    // ========================================================================
    // Flow stack
    // ========================================================================

    /// Opens a nested approval flow and pokes the decision-maker surface.
    pub async fn start_flow(&mut self, id: Option<String>) -> Result<String, ApprovalError> {
        let id = match id {
            Some(id) => {
                require_non_empty("id", &id)?;
                id
            }
            None => self.ids.next_id(),
        };
        let flow = ApprovalFlow { id: id.clone() };
        let (_, diff) = self.store.update(|state| {
            state.approval_flows.push(flow);
        });
        self.notify(&diff);
        self.poke_display(&id).await;
        Ok(id)
    }

    /// Closes the innermost flow, which must be the one named.
    pub fn end_flow(&mut self, id: &str) -> Result<(), ApprovalError> {
        match self.store.read().approval_flows.top() {
            None => return Err(ApprovalError::NoApprovalFlows),
            Some(top) if top.id != id => {
                return Err(ApprovalError::InvalidFlowEnd {
                    id: id.to_string(),
                    open: self.store.read().approval_flows.ids(),
                });
            }
            Some(_) => {}
        }
        let (_, diff) = self.store.update(|state| {
            state.approval_flows.pop();
        });
        self.notify(&diff);
        Ok(())
    }

    /// A snapshot of the full aggregate state.
    pub fn state_snapshot(&self) -> ApprovalState {
        self.store.snapshot()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Removes a request from store and index. The serialization point for
    /// settlement: a second removal of the same id fails with `NotFound`.
    fn take_request(&mut self, id: &str) -> Result<(ApprovalRequest, StateDiff), ApprovalError> {
        if !self.store.read().pending_approvals.contains_key(id) {
            return Err(ApprovalError::NotFound { id: id.to_string() });
        }
        let (removed, diff) = self.store.update(|state| {
            let removed = state.pending_approvals.remove(id);
            state.pending_approval_count = state.pending_approvals.len();
            removed
        });
        match removed {
            Some(request) => {
                self.index.decrement(&request.origin, &request.kind);
                Ok((request, diff))
            }
            None => Err(ApprovalError::NotFound { id: id.to_string() }),
        }
    }

    fn notify(&self, diff: &StateDiff) {
        self.listener.on_state_changed(self.store.read(), diff);
    }

    async fn poke_display(&self, id: &str) {
        if let Err(rejection) = self.display.show_approval_request().await {
            warn!(id = %id, reason = %rejection.message, "show approval request hook failed");
        }
    }
}

#[async_trait]
impl<C: TimeSource, G: IdSource> ApprovalApi for ApprovalEngine<C, G> {
    fn add(&mut self, args: AddRequestArgs) -> Result<PendingApproval, ApprovalError> {
        Self::add(self, args)
    }

    async fn add_and_show(
        &mut self,
        args: AddRequestArgs,
    ) -> Result<PendingApproval, ApprovalError> {
        Self::add_and_show(self, args).await
    }

    fn get(&self, id: &str) -> Option<ApprovalRequest> {
        Self::get(self, id)
    }

    fn has(&self, filter: &HasFilter) -> bool {
        Self::has(self, filter)
    }

    fn count(&self, filter: &CountFilter) -> usize {
        Self::count(self, filter)
    }

    fn total_count(&self) -> usize {
        Self::total_count(self)
    }

    fn update_request_state(
        &mut self,
        id: &str,
        state: RequestData,
    ) -> Result<(), ApprovalError> {
        Self::update_request_state(self, id, state)
    }

    fn accept(
        &mut self,
        id: &str,
        value: Option<Value>,
        options: AcceptOptions,
    ) -> Result<AcceptTicket, ApprovalError> {
        Self::accept(self, id, value, options)
    }

    fn reject(&mut self, id: &str, rejection: Rejection) -> Result<(), ApprovalError> {
        Self::reject(self, id, rejection)
    }

    fn clear(&mut self, rejection: Rejection) -> usize {
        Self::clear(self, rejection)
    }

    async fn start_flow(&mut self, id: Option<String>) -> Result<String, ApprovalError> {
        Self::start_flow(self, id).await
    }

    fn end_flow(&mut self, id: &str) -> Result<(), ApprovalError> {
        Self::end_flow(self, id)
    }

    fn state_snapshot(&self) -> ApprovalState {
        Self::state_snapshot(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::outbound::{
        MockTimeSource, NoOpDisplay, NoOpListener, RecordingDisplay, RecordingListener,
        SequentialIdSource,
    };
    use serde_json::json;
    use std::time::Duration;

    type TestEngine = ApprovalEngine<MockTimeSource, SequentialIdSource>;

    fn engine() -> TestEngine {
        engine_with(Arc::new(NoOpDisplay), Arc::new(NoOpListener))
    }

    fn engine_with(
        display: Arc<dyn RequestDisplay>,
        listener: Arc<dyn StateListener>,
    ) -> TestEngine {
        ApprovalEngine::with_sources(
            BrokerConfig::for_testing(),
            MockTimeSource::new(1_000),
            SequentialIdSource::default(),
            display,
            listener,
        )
    }

    fn mapping(key: &str, value: Value) -> RequestData {
        let mut map = RequestData::new();
        map.insert(key.to_string(), value);
        map
    }

    /// Checks the cross-structure invariants that must hold after every
    /// externally observable mutation.
    fn assert_invariants(engine: &TestEngine) {
        let state = engine.store.read();
        assert_eq!(state.pending_approval_count, state.pending_approvals.len());
        assert_eq!(engine.registry.len(), state.pending_approvals.len());
        for (id, request) in &state.pending_approvals {
            assert!(engine.registry.contains(id));
            let expected = state
                .pending_approvals
                .values()
                .filter(|r| r.origin == request.origin && r.kind == request.kind)
                .count();
            assert_eq!(engine.index.count(&request.origin, &request.kind), expected);
        }
        assert_eq!(engine.index.total(), state.pending_approvals.len());
    }

    // ========================================================================
    // Creation & validation
    // ========================================================================

    #[tokio::test]
    async fn test_add_then_accept_resolves_creator() {
        let mut engine = engine();
        let pending = engine
            .add(AddRequestArgs::new("https://x.test", "tx").with_id("req-1"))
            .unwrap();
        assert_eq!(engine.total_count(), 1);
        assert_invariants(&engine);

        let ticket = engine
            .accept("req-1", Some(json!("ok")), AcceptOptions::default())
            .unwrap();
        assert_eq!(engine.total_count(), 0);
        assert!(!engine.has(&HasFilter::Id("req-1".to_string())));
        assert_invariants(&engine);

        match pending.await.unwrap() {
            ApprovalOutcome::Value(value) => assert_eq!(value, Some(json!("ok"))),
            other => panic!("expected raw value, got {other:?}"),
        }
        assert_eq!(ticket.await.unwrap(), AcceptResult { value: None });
    }

    #[test]
    fn test_add_generates_id_and_timestamps() {
        let mut engine = engine();
        let pending = engine.add(AddRequestArgs::new("a", "t")).unwrap();
        assert_eq!(pending.id(), "generated-0");

        let request = engine.get("generated-0").unwrap();
        assert_eq!(request.created_at, 1_000);
        assert_eq!(request.origin, "a");
        assert!(!request.expects_result);
    }

    #[test]
    fn test_add_validation_precedes_duplicate_check() {
        let mut engine = engine();
        let _pending = engine
            .add(AddRequestArgs::new("a", "t").with_id("req-1"))
            .unwrap();

        // Empty origin with a colliding (origin, kind) still reports the
        // validation failure, not AlreadyPending.
        let err = engine.add(AddRequestArgs::new("", "t")).unwrap_err();
        assert!(matches!(err, ApprovalError::InvalidRequest { .. }));

        let err = engine
            .add(AddRequestArgs::new("a", "t").with_id(""))
            .unwrap_err();
        assert!(matches!(err, ApprovalError::InvalidRequest { .. }));

        let err = engine
            .add(AddRequestArgs::new("b", "u").with_id("req-1"))
            .unwrap_err();
        assert!(matches!(err, ApprovalError::InvalidRequest { .. }));
        // Failed adds leave no trace.
        assert_eq!(engine.total_count(), 1);
        assert_invariants(&engine);
    }

    #[test]
    fn test_duplicate_origin_kind_rejected() {
        let mut engine = engine();
        let _first = engine.add(AddRequestArgs::new("a", "t")).unwrap();

        let err = engine.add(AddRequestArgs::new("a", "t")).unwrap_err();
        assert_eq!(
            err,
            ApprovalError::AlreadyPending {
                origin: "a".to_string(),
                kind: "t".to_string()
            }
        );
        // Same origin, different kind is fine.
        let _second = engine.add(AddRequestArgs::new("a", "u")).unwrap();
        assert_eq!(engine.total_count(), 2);
        assert_invariants(&engine);
    }

    #[test]
    fn test_excluded_kind_skips_duplicate_check() {
        let mut engine = engine();
        let _a = engine.add(AddRequestArgs::new("a", "unrestricted")).unwrap();
        let _b = engine.add(AddRequestArgs::new("a", "unrestricted")).unwrap();
        assert_eq!(engine.total_count(), 2);
        assert_invariants(&engine);
    }

    #[tokio::test]
    async fn test_add_and_show_pokes_display() {
        let display = Arc::new(RecordingDisplay::default());
        let mut engine = engine_with(display.clone(), Arc::new(NoOpListener));

        let _pending = engine
            .add_and_show(AddRequestArgs::new("a", "t"))
            .await
            .unwrap();
        assert_eq!(display.show_count(), 1);

        // Plain add never pokes.
        let _plain = engine.add(AddRequestArgs::new("b", "t")).unwrap();
        assert_eq!(display.show_count(), 1);
    }

    #[tokio::test]
    async fn test_show_failure_keeps_request_tracked() {
        let display = Arc::new(RecordingDisplay::failing(Rejection::new("ui is away")));
        let mut engine = engine_with(display, Arc::new(NoOpListener));

        let pending = engine
            .add_and_show(AddRequestArgs::new("a", "t"))
            .await
            .unwrap();
        assert!(engine.has(&HasFilter::Id(pending.id().to_string())));
        assert_invariants(&engine);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[test]
    fn test_has_filters() {
        let mut engine = engine();
        let _p = engine
            .add(AddRequestArgs::new("a", "t").with_id("req-1"))
            .unwrap();

        assert!(engine.has(&HasFilter::Id("req-1".to_string())));
        assert!(!engine.has(&HasFilter::Id("ghost".to_string())));
        assert!(engine.has(&HasFilter::Origin {
            origin: "a".to_string(),
            kind: None
        }));
        assert!(engine.has(&HasFilter::Origin {
            origin: "a".to_string(),
            kind: Some("t".to_string())
        }));
        assert!(!engine.has(&HasFilter::Origin {
            origin: "a".to_string(),
            kind: Some("u".to_string())
        }));
        assert!(engine.has(&HasFilter::Kind("t".to_string())));
        assert!(!engine.has(&HasFilter::Kind("u".to_string())));
    }

    #[test]
    fn test_counts_by_kind_and_origin() {
        let mut engine = engine();
        // Three origins sharing kind "t", plus a second kind for origin "a".
        let _p1 = engine.add(AddRequestArgs::new("a", "t")).unwrap();
        let _p2 = engine.add(AddRequestArgs::new("b", "t")).unwrap();
        let _p3 = engine.add(AddRequestArgs::new("c", "t")).unwrap();
        let _p4 = engine.add(AddRequestArgs::new("a", "u")).unwrap();

        assert_eq!(engine.count(&CountFilter::Kind("t".to_string())), 3);
        assert_eq!(engine.count(&CountFilter::Origin("a".to_string())), 2);
        assert_eq!(
            engine.count(&CountFilter::OriginAndKind {
                origin: "a".to_string(),
                kind: "t".to_string()
            }),
            1
        );
        assert_eq!(engine.total_count(), 4);
        assert_invariants(&engine);
    }

    #[test]
    fn test_update_request_state() {
        let mut engine = engine();
        let _p = engine
            .add(AddRequestArgs::new("a", "t").with_id("req-1"))
            .unwrap();

        engine
            .update_request_state("req-1", mapping("step", json!(2)))
            .unwrap();
        let request = engine.get("req-1").unwrap();
        assert_eq!(request.request_state, Some(mapping("step", json!(2))));
        // Count and index are untouched.
        assert_eq!(engine.total_count(), 1);
        assert_invariants(&engine);

        let err = engine
            .update_request_state("ghost", mapping("step", json!(2)))
            .unwrap_err();
        assert_eq!(
            err,
            ApprovalError::NotFound {
                id: "ghost".to_string()
            }
        );
    }

    // ========================================================================
    // Completion protocol
    // ========================================================================

    #[tokio::test]
    async fn test_accept_with_result_envelope_and_wait() {
        let mut engine = engine();
        let pending = engine
            .add(
                AddRequestArgs::new("a", "t")
                    .with_id("req-1")
                    .expecting_result(),
            )
            .unwrap();

        let mut ticket = engine
            .accept(
                "req-1",
                Some(json!(7)),
                AcceptOptions {
                    wait_for_result: true,
                },
            )
            .unwrap();

        let envelope = match pending.await.unwrap() {
            ApprovalOutcome::Envelope(envelope) => envelope,
            other => panic!("expected envelope, got {other:?}"),
        };
        assert_eq!(envelope.value, Some(json!(7)));

        // The acceptor's ticket stays pending until the creator reports.
        let timed_out = tokio::time::timeout(Duration::from_millis(20), &mut ticket).await;
        assert!(timed_out.is_err());

        assert!(envelope.callbacks.success(Some(json!(99))));
        let result = ticket.await.unwrap();
        assert_eq!(result.value, Some(json!(99)));
    }

    #[tokio::test]
    async fn test_accept_without_wait_delivers_inert_callbacks() {
        let mut engine = engine();
        let pending = engine
            .add(
                AddRequestArgs::new("a", "t")
                    .with_id("req-1")
                    .expecting_result(),
            )
            .unwrap();

        let ticket = engine
            .accept("req-1", Some(json!(7)), AcceptOptions::default())
            .unwrap();
        assert_eq!(ticket.await.unwrap(), AcceptResult { value: None });

        let envelope = match pending.await.unwrap() {
            ApprovalOutcome::Envelope(envelope) => envelope,
            other => panic!("expected envelope, got {other:?}"),
        };
        // Invoking the delivered callbacks is silently ignored.
        assert!(!envelope.callbacks.success(Some(json!(99))));
    }

    #[tokio::test]
    async fn test_accept_wait_without_result_support() {
        let mut engine = engine();
        let pending = engine
            .add(AddRequestArgs::new("a", "t").with_id("req-1"))
            .unwrap();

        let ticket = engine
            .accept(
                "req-1",
                Some(json!(7)),
                AcceptOptions {
                    wait_for_result: true,
                },
            )
            .unwrap();

        // The request is removed and the creator settled regardless.
        assert_eq!(engine.total_count(), 0);
        match pending.await.unwrap() {
            ApprovalOutcome::Value(value) => assert_eq!(value, Some(json!(7))),
            other => panic!("expected raw value, got {other:?}"),
        }
        assert_eq!(
            ticket.await.unwrap_err(),
            ApprovalError::NoResultSupport {
                id: "req-1".to_string()
            }
        );
        assert_invariants(&engine);
    }

    #[tokio::test]
    async fn test_reject_fails_creator() {
        let mut engine = engine();
        let pending = engine
            .add(AddRequestArgs::new("a", "t").with_id("req-1"))
            .unwrap();

        let rejection = Rejection::new("declined").with_data(json!({"code": 4001}));
        engine.reject("req-1", rejection.clone()).unwrap();

        assert_eq!(
            pending.await.unwrap_err(),
            ApprovalError::Rejected(rejection)
        );
        assert_eq!(engine.total_count(), 0);
        assert_invariants(&engine);
    }

    #[test]
    fn test_second_settlement_is_not_found() {
        let mut engine = engine();
        let _pending = engine
            .add(AddRequestArgs::new("a", "t").with_id("req-1"))
            .unwrap();

        let _ticket = engine
            .accept("req-1", None, AcceptOptions::default())
            .unwrap();
        let err = engine
            .accept("req-1", None, AcceptOptions::default())
            .unwrap_err();
        assert_eq!(
            err,
            ApprovalError::NotFound {
                id: "req-1".to_string()
            }
        );
        assert!(engine.reject("req-1", Rejection::new("late")).is_err());
    }

    #[tokio::test]
    async fn test_clear_rejects_everything() {
        let mut engine = engine();
        let a = engine.add(AddRequestArgs::new("a", "t")).unwrap();
        let b = engine.add(AddRequestArgs::new("b", "t")).unwrap();

        let cleared = engine.clear(Rejection::new("shutting down"));
        assert_eq!(cleared, 2);
        assert_eq!(engine.total_count(), 0);
        assert!(engine.index.is_empty());
        assert_invariants(&engine);

        assert!(matches!(a.await, Err(ApprovalError::Rejected(_))));
        assert!(matches!(b.await, Err(ApprovalError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_clear_leaves_flows_open() {
        let mut engine = engine();
        let flow = engine.start_flow(None).await.unwrap();
        let _p = engine.add(AddRequestArgs::new("a", "t")).unwrap();

        engine.clear(Rejection::new("sweep"));
        assert_eq!(engine.state_snapshot().approval_flows.ids(), vec![flow]);
    }

    // ========================================================================
    // Flow stack
    // ========================================================================

    #[tokio::test]
    async fn test_flows_close_in_reverse_order() {
        let mut engine = engine();
        let a = engine.start_flow(None).await.unwrap();
        let b = engine.start_flow(None).await.unwrap();

        let err = engine.end_flow(&a).unwrap_err();
        assert_eq!(
            err,
            ApprovalError::InvalidFlowEnd {
                id: a.clone(),
                open: vec![a.clone(), b.clone()]
            }
        );

        engine.end_flow(&b).unwrap();
        engine.end_flow(&a).unwrap();
        assert_eq!(engine.end_flow(&a).unwrap_err(), ApprovalError::NoApprovalFlows);
    }

    #[tokio::test]
    async fn test_start_flow_pokes_display_and_accepts_pinned_id() {
        let display = Arc::new(RecordingDisplay::default());
        let mut engine = engine_with(display.clone(), Arc::new(NoOpListener));

        let id = engine.start_flow(Some("flow-1".to_string())).await.unwrap();
        assert_eq!(id, "flow-1");
        assert_eq!(display.show_count(), 1);

        let err = engine.start_flow(Some(String::new())).await.unwrap_err();
        assert!(matches!(err, ApprovalError::InvalidRequest { .. }));
    }

    // ========================================================================
    // State-changed notifications
    // ========================================================================

    #[tokio::test]
    async fn test_listener_sees_every_mutation_with_diff() {
        let listener = Arc::new(RecordingListener::default());
        let mut engine = engine_with(Arc::new(NoOpDisplay), listener.clone());

        let _p = engine
            .add(AddRequestArgs::new("a", "t").with_id("req-1"))
            .unwrap();
        let _ticket = engine
            .accept("req-1", None, AcceptOptions::default())
            .unwrap();

        let notifications = listener.notifications.lock().unwrap();
        assert_eq!(notifications.len(), 2);

        let (state, diff) = &notifications[0];
        assert_eq!(state.pending_approval_count, 1);
        assert!(diff
            .ops
            .iter()
            .any(|op| op.path == "/pending_approvals/req-1"));

        let (state, diff) = &notifications[1];
        assert_eq!(state.pending_approval_count, 0);
        assert!(!diff.is_empty());
    }

    #[test]
    fn test_queries_do_not_notify() {
        let listener = Arc::new(RecordingListener::default());
        let engine = engine_with(Arc::new(NoOpDisplay), listener.clone());

        let _ = engine.get("ghost");
        let _ = engine.total_count();
        let _ = engine.state_snapshot();
        assert!(listener.notifications.lock().unwrap().is_empty());
    }
}
