//! End-of-stream resolution of a buffered tool call payload.
//!
//! The strict path parses the payload as JSON. Models frequently emit markup
//! inside the JSON string without escaping its quotes, so a failed strict
//! parse falls back to a kind-specific forgiving extraction. If that also
//! fails the call resolves to the tool's empty input.

use diagram_core::Operation;
use serde::Deserialize;
use tracing::warn;

use crate::tool::{ToolCall, ToolKind};

#[derive(Deserialize)]
#[serde(tag = "tool", rename_all = "lowercase")]
enum WireToolCall {
    Render { payload: String },
    Edit { operations: Vec<Operation> },
}

impl From<WireToolCall> for ToolCall {
    fn from(value: WireToolCall) -> Self {
        match value {
            WireToolCall::Render { payload } => ToolCall::Render { payload },
            WireToolCall::Edit { operations } => ToolCall::Edit { operations },
        }
    }
}

/// Which path produced a resolved tool call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionPath {
    Strict,
    Recovered,
    Empty,
}

/// Resolves `raw` into a tool call, never failing.
pub fn resolve(kind: ToolKind, raw: &str) -> (ToolCall, ResolutionPath) {
    if let Some(call) = parse_strict(raw) {
        return (call, ResolutionPath::Strict);
    }
    if let Some(call) = recover(kind, raw) {
        warn!(tool = %kind, raw_len = raw.len(), "tool call payload was malformed; recovered input");
        return (call, ResolutionPath::Recovered);
    }
    warn!(tool = %kind, raw_len = raw.len(), "tool call payload unrecoverable; substituting empty input");
    (kind.empty_call(), ResolutionPath::Empty)
}

/// Parses the first complete JSON value in `raw`. Trailing text is ignored.
pub fn parse_strict(raw: &str) -> Option<ToolCall> {
    serde_json::Deserializer::from_str(raw)
        .into_iter::<WireToolCall>()
        .next()?
        .ok()
        .map(ToolCall::from)
}

/// Forgiving extraction for a payload that failed strict parsing.
pub fn recover(kind: ToolKind, raw: &str) -> Option<ToolCall> {
    match kind {
        ToolKind::Render => recover_markup(raw).map(|payload| ToolCall::Render { payload }),
        ToolKind::Edit => recover_operations(raw).map(|operations| ToolCall::Edit { operations }),
    }
}

/// Takes everything between the opening quote of the `payload` field and the
/// last closing quote-then-brace (or last brace), then reverses the minimal
/// escapes.
fn recover_markup(raw: &str) -> Option<String> {
    let start = field_value_start(raw, ToolKind::Render.input_field(), '"')? + 1;
    let body = &raw[start..];
    let content = body[..closing_position(body)].trim_end();
    let content = content.strip_suffix('"').unwrap_or(content);
    let markup = unescape_minimal(content);
    if markup.trim().is_empty() {
        return None;
    }
    Some(markup)
}

/// Parses only the `operations` array, ignoring whatever surrounds it.
fn recover_operations(raw: &str) -> Option<Vec<Operation>> {
    let start = field_value_start(raw, ToolKind::Edit.input_field(), '[')?;
    serde_json::Deserializer::from_str(&raw[start..])
        .into_iter::<Vec<Operation>>()
        .next()?
        .ok()
}

/// Byte index of `opener` that begins the value of `"field":`.
fn field_value_start(raw: &str, field: &str, opener: char) -> Option<usize> {
    let key = format!("\"{field}\"");
    raw.match_indices(&key).find_map(|(idx, _)| {
        let after_key = idx + key.len();
        let rest = raw[after_key..].trim_start();
        let value = rest.strip_prefix(':')?.trim_start();
        value
            .starts_with(opener)
            .then(|| raw.len() - value.len())
    })
}

/// Position of the closing `}` for a recovered string value: the last brace
/// preceded by a quote, else the last brace, else the end of a truncated buffer.
fn closing_position(body: &str) -> usize {
    let mut last_brace = None;
    for (idx, _) in body.rmatch_indices('}') {
        last_brace.get_or_insert(idx);
        if body[..idx].trim_end().ends_with('"') {
            return idx;
        }
    }
    last_brace.unwrap_or(body.len())
}

fn unescape_minimal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
