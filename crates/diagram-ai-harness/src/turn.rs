use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt as _;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::content::{ChatMessage, Role, TurnOutcome};
use crate::detector::StreamSession;
use crate::errors::{HarnessError, TurnFailure, turn_failure_from_provider_error};
use crate::harness::HarnessInner;
use crate::model::{ModelRef, ProviderId, TurnOptions};
use crate::provider::{ProviderAdapter, ProviderRequest};
use crate::quota::{QuotaDecision, QuotaGate};
use crate::stream::UiEvent;

/// Handle used to cancel a running turn.
#[derive(Clone)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation. The upstream read stops, no further events are
    /// emitted and buffered state is discarded.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// Builder for one assistant turn: prompt, conversation and options.
pub struct TurnBuilder {
    harness: Arc<HarnessInner>,
    session_id: uuid::Uuid,
    session_name: String,
    model: ModelRef,
    system_prompt: Option<String>,
    messages: Vec<ChatMessage>,
    options: TurnOptions,
    vendor_options: HashMap<ProviderId, serde_json::Value>,
}

impl TurnBuilder {
    pub(crate) fn new(
        harness: Arc<HarnessInner>,
        session_id: uuid::Uuid,
        session_name: String,
        model: ModelRef,
    ) -> Self {
        Self {
            harness,
            session_id,
            session_name,
            model,
            system_prompt: None,
            messages: Vec::new(),
            options: TurnOptions::default(),
            vendor_options: HashMap::new(),
        }
    }

    pub fn system_prompt(mut self, text: impl Into<String>) -> Self {
        self.system_prompt = Some(text.into());
        self
    }

    /// Appends a user message.
    pub fn user_text(mut self, text: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::user(text));
        self
    }

    /// Appends a message of any role (prior history).
    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Replaces the conversation with `messages`.
    pub fn messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    /// Overall turn timeout. Reaching it finalizes the turn with whatever was
    /// buffered, exactly like a clean end of the upstream stream.
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn stream_buffer_capacity(mut self, capacity: usize) -> Self {
        self.options.stream_buffer_capacity = capacity;
        self
    }

    pub(crate) fn set_vendor_options_json(
        mut self,
        provider: ProviderId,
        value: serde_json::Value,
    ) -> Self {
        self.vendor_options.insert(provider, value);
        self
    }

    #[cfg(test)]
    pub(crate) fn vendor_options_value(&self, provider: &ProviderId) -> Option<&serde_json::Value> {
        self.vendor_options.get(provider)
    }

    /// Validates the builder and starts the turn.
    ///
    /// The returned `TurnStream` yields `start` first and always ends with a
    /// single `finish` event unless the turn is cancelled.
    pub async fn start_stream(self) -> Result<TurnStream, HarnessError> {
        let harness = self.harness.clone();
        let session_name = self.session_name.clone();
        let request = self.validate_and_build_request()?;
        let provider = harness.provider(&request.model.provider).ok_or_else(|| {
            HarnessError::ProviderNotFound {
                provider: request.model.provider.clone(),
            }
        })?;

        let (tx, rx) = mpsc::channel(request.options.stream_buffer_capacity);
        let (final_tx, final_rx) = oneshot::channel();
        let (abort_tx, abort_rx) = watch::channel(false);

        let turn_id = request.turn_id;
        let session_id = request.session_id;
        let model = request.model.clone();
        info!(turn_id = %turn_id, session_id = %session_id, session = %session_name, provider = %model.provider, model = %model.model, "turn started");
        tokio::spawn(turn_task(
            provider,
            harness.quota(),
            request,
            tx,
            final_tx,
            abort_rx,
        ));

        Ok(TurnStream {
            turn_id,
            session_id,
            provider: model.provider,
            model: model.model,
            rx,
            final_rx,
            abort_handle: AbortHandle { tx: abort_tx },
            saw_terminal: false,
        })
    }

    /// Runs the turn to completion and returns its outcome.
    pub async fn collect_outcome(self) -> Result<TurnOutcome, HarnessError> {
        self.start_stream().await?.finish().await
    }

    fn validate_and_build_request(self) -> Result<ProviderRequest, HarnessError> {
        if self.model.provider.as_str().trim().is_empty() {
            return Err(HarnessError::Validation(
                "model provider must not be empty".into(),
            ));
        }
        if self.model.model.trim().is_empty() {
            return Err(HarnessError::Validation("model must not be empty".into()));
        }
        if self.options.stream_buffer_capacity == 0 {
            return Err(HarnessError::Validation(
                "stream_buffer_capacity must be greater than 0".into(),
            ));
        }
        let Some(last) = self.messages.last() else {
            return Err(HarnessError::Validation(
                "at least one message is required".into(),
            ));
        };
        if last.role != Role::User {
            return Err(HarnessError::Validation(
                "the last message must come from the user".into(),
            ));
        }
        if self.messages.iter().any(|m| m.content.trim().is_empty()) {
            return Err(HarnessError::Validation(
                "message content must not be empty".into(),
            ));
        }

        Ok(ProviderRequest {
            turn_id: uuid::Uuid::new_v4(),
            session_id: self.session_id,
            model: self.model,
            system_prompt: self.system_prompt.filter(|s| !s.trim().is_empty()),
            messages: self.messages,
            options: self.options,
            vendor_options: self.vendor_options,
        })
    }
}

/// Streaming handle returned by `TurnBuilder::start_stream`.
pub struct TurnStream {
    turn_id: uuid::Uuid,
    session_id: uuid::Uuid,
    provider: ProviderId,
    model: String,
    rx: mpsc::Receiver<UiEvent>,
    final_rx: oneshot::Receiver<Result<TurnOutcome, HarnessError>>,
    abort_handle: AbortHandle,
    saw_terminal: bool,
}

impl TurnStream {
    pub fn turn_id(&self) -> uuid::Uuid {
        self.turn_id
    }

    pub fn session_id(&self) -> uuid::Uuid {
        self.session_id
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// Next UI event, or `None` once the turn task is done.
    pub async fn next_event(&mut self) -> Option<UiEvent> {
        let event = self.rx.recv().await;
        if event.as_ref().is_some_and(UiEvent::is_finish) {
            self.saw_terminal = true;
        }
        event
    }

    /// Drains remaining events and returns the turn result.
    ///
    /// Failures that were rendered as an error span come back as
    /// `HarnessError::TurnFailed`; an aborted turn as `HarnessError::Cancelled`.
    pub async fn finish(mut self) -> Result<TurnOutcome, HarnessError> {
        while !self.saw_terminal {
            match self.rx.recv().await {
                Some(event) if event.is_finish() => self.saw_terminal = true,
                Some(_) => {}
                None => break,
            }
        }

        match self.final_rx.await {
            Ok(result) => result,
            Err(_) => Err(HarnessError::protocol_msg(format!(
                "turn task ended without final result (provider={}, model={})",
                self.provider, self.model
            ))),
        }
    }
}

type FinalSender = oneshot::Sender<Result<TurnOutcome, HarnessError>>;

async fn turn_task(
    provider: Arc<dyn ProviderAdapter>,
    quota: Arc<dyn QuotaGate>,
    request: ProviderRequest,
    tx: mpsc::Sender<UiEvent>,
    final_tx: FinalSender,
    mut abort_rx: watch::Receiver<bool>,
) {
    let turn_id = request.turn_id;
    let session_id = request.session_id;
    let provider_id = request.model.provider.clone();
    let deadline = request.options.timeout.map(|timeout| Instant::now() + timeout);
    let mut session = StreamSession::new();

    if !send_events(&tx, vec![UiEvent::Start]).await {
        let _ = final_tx.send(Err(HarnessError::protocol_msg(
            "turn stream receiver dropped before start",
        )));
        return;
    }

    match quota.check(session_id) {
        QuotaDecision::Allowed => {}
        QuotaDecision::Unknown { reason } => {
            warn!(turn_id = %turn_id, session_id = %session_id, %reason, "quota check inconclusive; allowing turn");
        }
        QuotaDecision::Exceeded { message } => {
            fail_turn(&tx, final_tx, session, TurnFailure::RateLimited { message }).await;
            return;
        }
    }

    let started = tokio::select! {
        biased;
        _ = abort_requested(&mut abort_rx) => {
            cancel_turn(turn_id, final_tx);
            return;
        }
        started = provider.start_stream(request) => started,
    };
    let mut handle = match started {
        Ok(handle) => handle,
        Err(err) => {
            let failure = turn_failure_from_provider_error(&err);
            fail_turn(&tx, final_tx, session, failure).await;
            return;
        }
    };
    quota.increment(session_id);
    debug!(turn_id = %turn_id, provider = %provider_id, request_id = ?handle.metadata.request_id, "provider stream open");

    loop {
        tokio::select! {
            biased;
            _ = abort_requested(&mut abort_rx) => {
                cancel_turn(turn_id, final_tx);
                return;
            }
            _ = deadline_reached(deadline) => {
                warn!(turn_id = %turn_id, provider = %provider_id, "turn timeout reached; finalizing buffered output");
                break;
            }
            next = handle.stream.next() => {
                match next {
                    Some(Ok(delta)) => {
                        if !send_events(&tx, session.push(delta)).await {
                            let _ = final_tx.send(Err(HarnessError::protocol_msg("turn stream receiver dropped during output")));
                            return;
                        }
                    }
                    Some(Err(err)) => {
                        let failure = turn_failure_from_provider_error(&err);
                        fail_turn(&tx, final_tx, session, failure).await;
                        return;
                    }
                    None => break,
                }
            }
        }
    }

    let (events, outcome) = session.finish();
    info!(
        turn_id = %turn_id,
        tool = ?outcome.tool_call.as_ref().map(|call| call.kind()),
        text_len = outcome.text.len(),
        "turn finished"
    );
    let sent = send_events(&tx, events).await;
    let _ = final_tx.send(if sent {
        Ok(outcome)
    } else {
        Err(HarnessError::protocol_msg(
            "turn stream receiver dropped before finish",
        ))
    });
}

async fn fail_turn(
    tx: &mpsc::Sender<UiEvent>,
    final_tx: FinalSender,
    session: StreamSession,
    failure: TurnFailure,
) {
    warn!(error = %failure, rate_limited = failure.is_rate_limited(), "turn failed");
    let _ = send_events(tx, session.fail(&failure)).await;
    let _ = final_tx.send(Err(HarnessError::TurnFailed(failure)));
}

fn cancel_turn(turn_id: uuid::Uuid, final_tx: FinalSender) {
    info!(turn_id = %turn_id, "turn cancelled");
    let _ = final_tx.send(Err(HarnessError::Cancelled));
}

/// Resolves once abort was requested or every abort handle is gone.
async fn abort_requested(abort_rx: &mut watch::Receiver<bool>) {
    let _ = abort_rx.wait_for(|aborted| *aborted).await;
}

async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn send_events(tx: &mpsc::Sender<UiEvent>, events: Vec<UiEvent>) -> bool {
    for event in events {
        if tx.send(event).await.is_err() {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use crate::provider::{DeltaEvent, ProviderResponseMeta, ProviderStreamHandle};
    use crate::quota::InMemoryQuota;
    use crate::stream::FinishReason;
    use crate::tool::{ToolCall, ToolKind};
    use futures::stream;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    type Item = Result<DeltaEvent, ProviderError>;

    enum Behavior {
        ImmediateError(ProviderError),
        Deltas(Vec<Item>),
        DeltasThenPending(Vec<Item>),
        Pending,
    }

    struct FakeProvider {
        calls: Arc<AtomicUsize>,
        last_request: Arc<Mutex<Option<ProviderRequest>>>,
        behavior: Behavior,
    }

    impl FakeProvider {
        fn new(behavior: Behavior) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                last_request: Arc::new(Mutex::new(None)),
                behavior,
            }
        }
    }

    #[async_trait::async_trait]
    impl ProviderAdapter for FakeProvider {
        fn id(&self) -> ProviderId {
            ProviderId::new("fake")
        }

        async fn start_stream(
            &self,
            req: ProviderRequest,
        ) -> Result<ProviderStreamHandle, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().expect("lock") = Some(req);
            let stream: crate::provider::DeltaStream = match &self.behavior {
                Behavior::ImmediateError(err) => return Err(err.clone()),
                Behavior::Deltas(items) => Box::pin(stream::iter(items.clone())),
                Behavior::DeltasThenPending(items) => {
                    Box::pin(stream::iter(items.clone()).chain(stream::pending()))
                }
                Behavior::Pending => Box::pin(stream::pending()),
            };
            Ok(ProviderStreamHandle {
                stream,
                metadata: ProviderResponseMeta::default(),
            })
        }
    }

    fn harness(provider: FakeProvider, quota: Option<Arc<dyn QuotaGate>>) -> crate::Harness {
        let mut builder = crate::Harness::builder().register_provider(Arc::new(provider));
        if let Some(quota) = quota {
            builder = builder.quota_gate(quota);
        }
        builder.build().expect("build harness")
    }

    fn turn(harness: &crate::Harness) -> TurnBuilder {
        harness
            .session(crate::SessionConfig::named("test"))
            .turn(ModelRef::new("fake", "model-a"))
            .user_text("draw a box")
    }

    fn text(delta: &str) -> Item {
        Ok(DeltaEvent::Text(delta.into()))
    }

    async fn drain(stream: &mut TurnStream) -> Vec<UiEvent> {
        let mut events = Vec::new();
        while let Some(event) = stream.next_event().await {
            events.push(event);
        }
        events
    }

    fn error_text(events: &[UiEvent]) -> Option<String> {
        events.iter().rev().find_map(|event| match event {
            UiEvent::TextDelta { delta, .. } => Some(delta.clone()),
            _ => None,
        })
    }

    #[tokio::test]
    async fn validation_rejects_missing_and_blank_messages() {
        let harness = harness(FakeProvider::new(Behavior::Deltas(vec![])), None);
        let session = harness.session(crate::SessionConfig::named("s"));

        let err = session
            .turn(ModelRef::new("fake", "m"))
            .start_stream()
            .await
            .err()
            .expect("missing message should fail");
        assert!(matches!(err, HarnessError::Validation(msg) if msg.contains("at least one message")));

        let err = session
            .turn(ModelRef::new("fake", "m"))
            .user_text("   ")
            .start_stream()
            .await
            .err()
            .expect("blank message should fail");
        assert!(matches!(err, HarnessError::Validation(msg) if msg.contains("must not be empty")));

        let err = session
            .turn(ModelRef::new("fake", "m"))
            .user_text("hi")
            .message(ChatMessage::assistant("hello"))
            .start_stream()
            .await
            .err()
            .expect("assistant-last should fail");
        assert!(matches!(err, HarnessError::Validation(msg) if msg.contains("last message")));
    }

    #[tokio::test]
    async fn provider_not_found_is_start_time_error() {
        let harness = crate::Harness::builder().build().expect("build harness");
        let err = harness
            .session(crate::SessionConfig::named("s"))
            .turn(ModelRef::new("missing", "m"))
            .user_text("hello")
            .start_stream()
            .await
            .err()
            .expect("missing provider");
        assert!(matches!(err, HarnessError::ProviderNotFound { .. }));
    }

    #[tokio::test]
    async fn streams_narration_then_render_call() {
        let provider = FakeProvider::new(Behavior::Deltas(vec![
            Ok(DeltaEvent::Reasoning("plan".into())),
            text("I'll make a box.\n"),
            text("{\"tool\":\"render\",\""),
            text("payload\":\"<node/>\"}"),
        ]));
        let last_request = provider.last_request.clone();
        let harness = harness(provider, None);
        let mut stream = turn(&harness)
            .system_prompt("you draw diagrams")
            .start_stream()
            .await
            .expect("start");

        let events = drain(&mut stream).await;
        let kinds: Vec<&str> = events
            .iter()
            .map(|event| match event {
                UiEvent::Start => "start",
                UiEvent::ReasoningStart { .. } => "reasoning-start",
                UiEvent::ReasoningDelta { .. } => "reasoning-delta",
                UiEvent::ReasoningEnd { .. } => "reasoning-end",
                UiEvent::TextStart { .. } => "text-start",
                UiEvent::TextDelta { .. } => "text-delta",
                UiEvent::TextEnd { .. } => "text-end",
                UiEvent::ToolInputStart { .. } => "tool-input-start",
                UiEvent::ToolInputDelta { .. } => "tool-input-delta",
                UiEvent::ToolInputAvailable { .. } => "tool-input-available",
                UiEvent::Finish { .. } => "finish",
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "start",
                "reasoning-start",
                "reasoning-delta",
                "text-start",
                "text-delta",
                "text-end",
                "tool-input-start",
                "tool-input-delta",
                "tool-input-delta",
                "reasoning-end",
                "tool-input-available",
                "finish",
            ]
        );

        let outcome = stream.finish().await.expect("finish");
        assert_eq!(outcome.text, "I'll make a box.\n");
        assert_eq!(
            outcome.tool_call,
            Some(ToolCall::Render {
                payload: "<node/>".into()
            })
        );

        let request = last_request.lock().expect("lock").clone().expect("request");
        assert_eq!(request.system_prompt.as_deref(), Some("you draw diagrams"));
        assert_eq!(request.messages, vec![ChatMessage::user("draw a box")]);
    }

    #[tokio::test]
    async fn exceeded_quota_renders_quota_error_without_calling_provider() {
        let provider = FakeProvider::new(Behavior::Deltas(vec![text("hi")]));
        let calls = provider.calls.clone();
        let harness = harness(provider, Some(Arc::new(InMemoryQuota::new(0))));
        let mut stream = turn(&harness).start_stream().await.expect("start");

        let events = drain(&mut stream).await;
        assert_eq!(events.len(), 5);
        assert_eq!(events[0], UiEvent::Start);
        assert!(
            error_text(&events)
                .expect("error text")
                .starts_with(crate::stream::QUOTA_MESSAGE_PREFIX)
        );
        assert_eq!(
            events.last(),
            Some(&UiEvent::Finish {
                finish_reason: FinishReason::Error
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(matches!(
            stream.finish().await,
            Err(HarnessError::TurnFailed(TurnFailure::RateLimited { .. }))
        ));
    }

    #[tokio::test]
    async fn quota_is_incremented_once_per_started_turn() {
        let quota = Arc::new(InMemoryQuota::new(1));
        let harness = harness(
            FakeProvider::new(Behavior::Deltas(vec![text("ok")])),
            Some(quota.clone()),
        );
        let session = harness.session(crate::SessionConfig::named("q"));

        let first = session
            .turn(ModelRef::new("fake", "m"))
            .user_text("one")
            .collect_outcome()
            .await
            .expect("first turn");
        assert_eq!(first.text, "ok");
        assert_eq!(quota.used(session.id()), 1);

        let second = session
            .turn(ModelRef::new("fake", "m"))
            .user_text("two")
            .collect_outcome()
            .await;
        assert!(matches!(
            second,
            Err(HarnessError::TurnFailed(TurnFailure::RateLimited { .. }))
        ));
    }

    #[tokio::test]
    async fn inconclusive_quota_allows_the_turn() {
        struct Flaky;
        impl QuotaGate for Flaky {
            fn check(&self, _session_id: uuid::Uuid) -> QuotaDecision {
                QuotaDecision::Unknown {
                    reason: "store unavailable".into(),
                }
            }
            fn increment(&self, _session_id: uuid::Uuid) {}
        }

        let harness = harness(
            FakeProvider::new(Behavior::Deltas(vec![text("fine")])),
            Some(Arc::new(Flaky)),
        );
        let outcome = turn(&harness).collect_outcome().await.expect("allowed");
        assert_eq!(outcome.text, "fine");
    }

    #[tokio::test]
    async fn upstream_429_uses_quota_prefix() {
        let harness = harness(
            FakeProvider::new(Behavior::ImmediateError(ProviderError::http(
                "fake",
                429,
                "too many requests",
            ))),
            None,
        );
        let mut stream = turn(&harness).start_stream().await.expect("start");
        let events = drain(&mut stream).await;
        assert_eq!(
            error_text(&events).as_deref(),
            Some("[quota] rate limit reached: too many requests")
        );
    }

    #[tokio::test]
    async fn other_start_errors_use_error_prefix() {
        let harness = harness(
            FakeProvider::new(Behavior::ImmediateError(ProviderError::http(
                "fake", 401, "bad key",
            ))),
            None,
        );
        let mut stream = turn(&harness).start_stream().await.expect("start");
        let events = drain(&mut stream).await;
        assert!(
            error_text(&events)
                .expect("error text")
                .starts_with(crate::stream::ERROR_MESSAGE_PREFIX)
        );
        assert!(matches!(
            stream.finish().await,
            Err(HarnessError::TurnFailed(TurnFailure::Provider { .. }))
        ));
    }

    #[tokio::test]
    async fn mid_stream_failure_closes_spans_then_reports() {
        let harness = harness(
            FakeProvider::new(Behavior::Deltas(vec![
                text("Working on it"),
                Err(ProviderError::transport("fake", "connection reset")),
                text("never seen"),
            ])),
            None,
        );
        let mut stream = turn(&harness).start_stream().await.expect("start");
        let events = drain(&mut stream).await;

        let UiEvent::TextStart { id: narration_id } = &events[1] else {
            panic!("expected narration span, got {:?}", events[1]);
        };
        assert_eq!(
            events[3],
            UiEvent::TextEnd {
                id: narration_id.clone()
            }
        );
        let UiEvent::TextStart { id: error_id } = &events[4] else {
            panic!("expected error span, got {:?}", events[4]);
        };
        assert_ne!(error_id, narration_id);
        assert!(
            error_text(&events)
                .expect("error text")
                .contains("connection reset")
        );
        assert!(matches!(
            stream.finish().await,
            Err(HarnessError::TurnFailed(TurnFailure::Transport { .. }))
        ));
    }

    #[tokio::test]
    async fn cancellation_stops_events_and_reports_cancelled() {
        let harness = harness(FakeProvider::new(Behavior::Pending), None);
        let mut stream = turn(&harness).start_stream().await.expect("start");

        let abort = stream.abort_handle();
        assert_eq!(stream.next_event().await, Some(UiEvent::Start));
        abort.abort();

        assert_eq!(stream.next_event().await, None);
        assert!(matches!(stream.finish().await, Err(HarnessError::Cancelled)));
    }

    #[tokio::test]
    async fn timeout_finalizes_buffered_tool_call() {
        let harness = harness(
            FakeProvider::new(Behavior::DeltasThenPending(vec![
                text("Here: "),
                text("{\"tool\":\"render\",\"payload\":\"<a/>"),
            ])),
            None,
        );
        let mut stream = turn(&harness)
            .timeout(Duration::from_millis(50))
            .start_stream()
            .await
            .expect("start");

        let events = drain(&mut stream).await;
        assert!(events.iter().any(|event| matches!(
            event,
            UiEvent::ToolInputAvailable {
                tool_name: ToolKind::Render,
                ..
            }
        )));
        assert_eq!(
            events.last(),
            Some(&UiEvent::Finish {
                finish_reason: FinishReason::Stop
            })
        );
        let outcome = stream.finish().await.expect("finish");
        assert_eq!(
            outcome.tool_call,
            Some(ToolCall::Render {
                payload: "<a/>".into()
            })
        );
    }

    #[tokio::test]
    async fn vendor_option_storage_is_preserved() {
        let harness = harness(
            FakeProvider::new(Behavior::ImmediateError(ProviderError::transport(
                "fake",
                "not reached",
            ))),
            None,
        );
        let builder = turn(&harness)
            .set_vendor_options_json(ProviderId::new("fake"), serde_json::json!({"x": 1}));
        assert_eq!(
            builder.vendor_options_value(&ProviderId::new("fake")),
            Some(&serde_json::json!({"x": 1}))
        );
    }
}
