use crate::tool::ToolCall;

/// Speaker of a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One prior or current chat message sent to the model.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Final result of a completed assistant turn.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct TurnOutcome {
    /// Narration shown to the user. When a tool call was made this is the
    /// text that preceded it.
    pub text: String,
    /// Resolved tool call, if the model started one.
    pub tool_call: Option<ToolCall>,
}

impl TurnOutcome {
    /// True when a tool call was resolved to something other than the empty fallback.
    pub fn has_effective_tool_call(&self) -> bool {
        self.tool_call.as_ref().is_some_and(|call| !call.is_empty())
    }
}
