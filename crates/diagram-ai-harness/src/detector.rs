//! Boundary detection between narration and an inline tool call.
//!
//! [`StreamSession`] owns the whole state of one turn's delta stream. Text
//! is streamed to the UI as soon as it can no longer turn out to be the start
//! of a tool call; once the tool marker and a known tool name are seen the
//! session switches to tool mode and relays every further fragment verbatim.

use tracing::{debug, info};

use crate::content::TurnOutcome;
use crate::errors::TurnFailure;
use crate::provider::DeltaEvent;
use crate::recovery;
use crate::stream::{FinishReason, UiEvent, failure_events};
use crate::tool::{TOOL_MARKER, ToolKind};

/// Classification state of the text delta stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionMode {
    Text,
    Tool(ToolKind),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SpanState {
    Idle,
    Open,
    Closed,
}

/// Correlation ids for the spans of one turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpanIds {
    pub text: String,
    pub reasoning: String,
    pub tool_call: String,
}

impl SpanIds {
    pub fn generate() -> Self {
        Self {
            text: uuid::Uuid::new_v4().to_string(),
            reasoning: uuid::Uuid::new_v4().to_string(),
            tool_call: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Mutable state of one assistant turn's delta stream.
#[derive(Debug)]
pub struct StreamSession {
    ids: SpanIds,
    full_text: String,
    narration: String,
    pending: String,
    tool_payload: String,
    mode: SessionMode,
    text_span: SpanState,
    reasoning_span: SpanState,
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamSession {
    pub fn new() -> Self {
        Self::with_ids(SpanIds::generate())
    }

    pub fn with_ids(ids: SpanIds) -> Self {
        Self {
            ids,
            full_text: String::new(),
            narration: String::new(),
            pending: String::new(),
            tool_payload: String::new(),
            mode: SessionMode::Text,
            text_span: SpanState::Idle,
            reasoning_span: SpanState::Idle,
        }
    }

    pub fn ids(&self) -> &SpanIds {
        &self.ids
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn detected_tool_kind(&self) -> Option<ToolKind> {
        match self.mode {
            SessionMode::Tool(kind) => Some(kind),
            SessionMode::Text => None,
        }
    }

    /// Every text delta seen so far, in order.
    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    /// Raw tool payload relayed so far, starting at the marker.
    pub fn tool_payload(&self) -> &str {
        &self.tool_payload
    }

    pub fn push(&mut self, delta: DeltaEvent) -> Vec<UiEvent> {
        match delta {
            DeltaEvent::Text(text) => self.push_text(&text),
            DeltaEvent::Reasoning(text) => self.push_reasoning(&text),
        }
    }

    pub fn push_reasoning(&mut self, delta: &str) -> Vec<UiEvent> {
        let mut events = Vec::new();
        if delta.is_empty() {
            return events;
        }
        if self.reasoning_span == SpanState::Idle {
            events.push(UiEvent::ReasoningStart {
                id: self.ids.reasoning.clone(),
            });
            self.reasoning_span = SpanState::Open;
        }
        events.push(UiEvent::ReasoningDelta {
            id: self.ids.reasoning.clone(),
            delta: delta.to_string(),
        });
        events
    }

    pub fn push_text(&mut self, delta: &str) -> Vec<UiEvent> {
        let mut events = Vec::new();
        if delta.is_empty() {
            return events;
        }
        self.full_text.push_str(delta);

        if let SessionMode::Tool(_) = self.mode {
            self.relay(delta, &mut events);
            return events;
        }

        self.pending.push_str(delta);
        loop {
            let Some(start) = self.pending.find(TOOL_MARKER) else {
                let safe = self.pending.len() - partial_marker_suffix_len(&self.pending);
                let narration: String = self.pending.drain(..safe).collect();
                self.emit_narration(&narration, &mut events);
                return events;
            };
            let narration: String = self.pending.drain(..start).collect();
            self.emit_narration(&narration, &mut events);

            match probe_marker(&self.pending) {
                MarkerProbe::Kind(kind) => {
                    self.enter_tool_mode(kind, &mut events);
                    return events;
                }
                MarkerProbe::Undecided => return events,
                MarkerProbe::NotATool => {
                    // Release the stale marker and rescan what follows it.
                    debug!(
                        tool_call_id = %self.ids.tool_call,
                        "marker names no known tool; kept as narration"
                    );
                    let marker: String = self.pending.drain(..TOOL_MARKER.len()).collect();
                    self.emit_narration(&marker, &mut events);
                }
            }
        }
    }

    /// Closes the turn after a clean end of the upstream stream (or a turn
    /// timeout): flushes buffered narration, resolves the tool call if one was
    /// started and emits `finish(stop)`.
    pub fn finish(mut self) -> (Vec<UiEvent>, TurnOutcome) {
        let mut events = Vec::new();
        self.close_reasoning(&mut events);

        let tool_call = match self.mode {
            SessionMode::Text => {
                let rest = std::mem::take(&mut self.pending);
                self.emit_narration(&rest, &mut events);
                self.close_text(&mut events);
                None
            }
            SessionMode::Tool(kind) => {
                let (call, path) = recovery::resolve(kind, &self.tool_payload);
                debug!(tool_call_id = %self.ids.tool_call, tool = %kind, ?path, "tool call resolved");
                events.push(UiEvent::ToolInputAvailable {
                    tool_call_id: self.ids.tool_call.clone(),
                    tool_name: kind,
                    input: call.clone(),
                });
                Some(call)
            }
        };

        events.push(UiEvent::Finish {
            finish_reason: FinishReason::Stop,
        });
        let outcome = TurnOutcome {
            text: self.narration,
            tool_call,
        };
        (events, outcome)
    }

    /// Closes the turn after a terminal failure. Open spans are ended, buffered
    /// state is dropped, and the error span follows.
    pub fn fail(mut self, failure: &TurnFailure) -> Vec<UiEvent> {
        let mut events = Vec::new();
        self.close_reasoning(&mut events);
        self.close_text(&mut events);
        let error_id = uuid::Uuid::new_v4().to_string();
        events.extend(failure_events(&error_id, failure));
        events
    }

    fn enter_tool_mode(&mut self, kind: ToolKind, events: &mut Vec<UiEvent>) {
        self.close_text(events);
        self.mode = SessionMode::Tool(kind);
        info!(tool_call_id = %self.ids.tool_call, tool = %kind, "tool call detected");
        events.push(UiEvent::ToolInputStart {
            tool_call_id: self.ids.tool_call.clone(),
            tool_name: kind,
        });
        let payload = std::mem::take(&mut self.pending);
        self.relay(&payload, events);
    }

    fn relay(&mut self, fragment: &str, events: &mut Vec<UiEvent>) {
        self.tool_payload.push_str(fragment);
        debug!(tool_call_id = %self.ids.tool_call, len = fragment.len(), "relaying tool input");
        events.push(UiEvent::ToolInputDelta {
            tool_call_id: self.ids.tool_call.clone(),
            input_text_delta: fragment.to_string(),
        });
    }

    fn emit_narration(&mut self, text: &str, events: &mut Vec<UiEvent>) {
        if text.is_empty() {
            return;
        }
        if self.text_span == SpanState::Idle {
            events.push(UiEvent::TextStart {
                id: self.ids.text.clone(),
            });
            self.text_span = SpanState::Open;
        }
        self.narration.push_str(text);
        events.push(UiEvent::TextDelta {
            id: self.ids.text.clone(),
            delta: text.to_string(),
        });
    }

    fn close_text(&mut self, events: &mut Vec<UiEvent>) {
        if self.text_span == SpanState::Open {
            events.push(UiEvent::TextEnd {
                id: self.ids.text.clone(),
            });
            self.text_span = SpanState::Closed;
        }
    }

    fn close_reasoning(&mut self, events: &mut Vec<UiEvent>) {
        if self.reasoning_span == SpanState::Open {
            events.push(UiEvent::ReasoningEnd {
                id: self.ids.reasoning.clone(),
            });
            self.reasoning_span = SpanState::Closed;
        }
    }
}

/// Runs a complete delta sequence through a fresh session, `start` to `finish`.
pub fn transform(deltas: impl IntoIterator<Item = DeltaEvent>) -> (Vec<UiEvent>, TurnOutcome) {
    let mut session = StreamSession::new();
    let mut events = vec![UiEvent::Start];
    for delta in deltas {
        events.extend(session.push(delta));
    }
    let (tail, outcome) = session.finish();
    events.extend(tail);
    (events, outcome)
}

/// What the text after a marker says about the tool call it might start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MarkerProbe {
    Kind(ToolKind),
    /// Not enough text yet.
    Undecided,
    /// The marker is not the start of a known tool call.
    NotATool,
}

/// Recognizes the tool kind in a buffer that starts with the marker.
///
/// Tries the well-formed `"tool": "<name>"` assignment first, then any quoted
/// known tool name after the marker (earliest wins).
pub fn detect_tool_kind(buffer: &str) -> Option<ToolKind> {
    match probe_marker(buffer) {
        MarkerProbe::Kind(kind) => Some(kind),
        MarkerProbe::Undecided | MarkerProbe::NotATool => None,
    }
}

fn probe_marker(buffer: &str) -> MarkerProbe {
    let Some(rest) = buffer.strip_prefix(TOOL_MARKER) else {
        return MarkerProbe::NotATool;
    };
    let head = rest.trim_start();
    if head.is_empty() {
        return MarkerProbe::Undecided;
    }

    if let Some(value) = head.strip_prefix(':').map(str::trim_start) {
        if value.is_empty() {
            return MarkerProbe::Undecided;
        }
        let Some(quoted) = value.strip_prefix('"') else {
            return MarkerProbe::NotATool;
        };
        return match quoted.split_once('"') {
            Some((name, _)) => {
                ToolKind::from_name(name).map_or(MarkerProbe::NotATool, MarkerProbe::Kind)
            }
            None if ToolKind::ALL.iter().any(|kind| kind.as_str().starts_with(quoted)) => {
                MarkerProbe::Undecided
            }
            None => MarkerProbe::NotATool,
        };
    }

    // Loose match, limited to the text before any later marker.
    let (window, superseded) = match rest.find(TOOL_MARKER) {
        Some(next) => (&rest[..next], true),
        None => (rest, false),
    };
    let loose = ToolKind::ALL
        .into_iter()
        .filter_map(|kind| {
            window
                .find(&format!("\"{kind}\""))
                .map(|position| (position, kind))
        })
        .min_by_key(|(position, _)| *position)
        .map(|(_, kind)| kind);
    match loose {
        Some(kind) => MarkerProbe::Kind(kind),
        None if superseded => MarkerProbe::NotATool,
        None => MarkerProbe::Undecided,
    }
}

/// Length of the longest suffix of `text` that is a proper prefix of the marker.
fn partial_marker_suffix_len(text: &str) -> usize {
    (1..TOOL_MARKER.len())
        .rev()
        .find(|&len| text.ends_with(&TOOL_MARKER[..len]))
        .unwrap_or(0)
}
