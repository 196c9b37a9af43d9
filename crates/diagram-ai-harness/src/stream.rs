//! Normalized UI events, one JSON object per line on the wire.

use crate::errors::TurnFailure;
use crate::tool::{ToolCall, ToolKind};

/// Prefix of the error message for rate or quota failures.
pub const QUOTA_MESSAGE_PREFIX: &str = "[quota] ";
/// Prefix of the error message for every other failure.
pub const ERROR_MESSAGE_PREFIX: &str = "[error] ";

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    Stop,
    Error,
}

/// Events consumed by the rendering layer, in emission order.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiEvent {
    /// First event of every turn.
    Start,
    ReasoningStart {
        id: String,
    },
    ReasoningDelta {
        id: String,
        delta: String,
    },
    ReasoningEnd {
        id: String,
    },
    TextStart {
        id: String,
    },
    TextDelta {
        id: String,
        delta: String,
    },
    TextEnd {
        id: String,
    },
    /// Structured payload begins.
    #[serde(rename_all = "camelCase")]
    ToolInputStart {
        tool_call_id: String,
        tool_name: ToolKind,
    },
    /// Raw payload fragment, forwarded before the payload is known to be valid.
    #[serde(rename_all = "camelCase")]
    ToolInputDelta {
        tool_call_id: String,
        input_text_delta: String,
    },
    /// Final resolved tool input.
    #[serde(rename_all = "camelCase")]
    ToolInputAvailable {
        tool_call_id: String,
        tool_name: ToolKind,
        input: ToolCall,
    },
    /// Last event of every turn.
    #[serde(rename_all = "camelCase")]
    Finish {
        finish_reason: FinishReason,
    },
}

impl UiEvent {
    pub fn is_finish(&self) -> bool {
        matches!(self, Self::Finish { .. })
    }

    /// Renders the event as one newline-terminated JSON line.
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// User-facing text for a failure, prefixed by its class.
pub fn failure_message(failure: &TurnFailure) -> String {
    let prefix = if failure.is_rate_limited() {
        QUOTA_MESSAGE_PREFIX
    } else {
        ERROR_MESSAGE_PREFIX
    };
    format!("{prefix}{failure}")
}

/// The terminal error span: `text-start`, `text-delta`, `text-end`, `finish(error)`.
pub fn failure_events(text_id: &str, failure: &TurnFailure) -> Vec<UiEvent> {
    vec![
        UiEvent::TextStart {
            id: text_id.to_string(),
        },
        UiEvent::TextDelta {
            id: text_id.to_string(),
            delta: failure_message(failure),
        },
        UiEvent::TextEnd {
            id: text_id.to_string(),
        },
        UiEvent::Finish {
            finish_reason: FinishReason::Error,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_wire_shapes() {
        let cases = vec![
            (UiEvent::Start, json!({"type": "start"})),
            (
                UiEvent::ReasoningDelta {
                    id: "r".into(),
                    delta: "hmm".into(),
                },
                json!({"type": "reasoning-delta", "id": "r", "delta": "hmm"}),
            ),
            (
                UiEvent::TextEnd { id: "t".into() },
                json!({"type": "text-end", "id": "t"}),
            ),
            (
                UiEvent::ToolInputStart {
                    tool_call_id: "c".into(),
                    tool_name: ToolKind::Render,
                },
                json!({"type": "tool-input-start", "toolCallId": "c", "toolName": "render"}),
            ),
            (
                UiEvent::ToolInputDelta {
                    tool_call_id: "c".into(),
                    input_text_delta: "{\"to".into(),
                },
                json!({"type": "tool-input-delta", "toolCallId": "c", "inputTextDelta": "{\"to"}),
            ),
            (
                UiEvent::ToolInputAvailable {
                    tool_call_id: "c".into(),
                    tool_name: ToolKind::Edit,
                    input: ToolCall::Edit {
                        operations: Vec::new(),
                    },
                },
                json!({"type": "tool-input-available", "toolCallId": "c", "toolName": "edit", "input": {"operations": []}}),
            ),
            (
                UiEvent::Finish {
                    finish_reason: FinishReason::Stop,
                },
                json!({"type": "finish", "finishReason": "stop"}),
            ),
        ];
        for (event, expected) in cases {
            assert_eq!(serde_json::to_value(&event).expect("serialize"), expected);
        }
    }

    #[test]
    fn json_line_is_newline_terminated() {
        let line = UiEvent::Start.to_json_line().expect("line");
        assert_eq!(line, "{\"type\":\"start\"}\n");
    }

    #[test]
    fn failure_messages_are_prefixed_by_class() {
        let quota = TurnFailure::RateLimited {
            message: "daily limit".into(),
        };
        assert_eq!(
            failure_message(&quota),
            "[quota] rate limit reached: daily limit"
        );
        let generic = TurnFailure::Transport {
            provider: "openai".into(),
            message: "reset".into(),
        };
        assert!(failure_message(&generic).starts_with(ERROR_MESSAGE_PREFIX));
    }

    #[test]
    fn failure_events_end_with_error_finish() {
        let events = failure_events(
            "e",
            &TurnFailure::Protocol {
                message: "x".into(),
            },
        );
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], UiEvent::TextStart { .. }));
        assert_eq!(
            events[3],
            UiEvent::Finish {
                finish_reason: FinishReason::Error
            }
        );
    }
}
