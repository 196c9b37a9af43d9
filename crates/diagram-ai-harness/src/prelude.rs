//! Common imports for typical harness usage.
pub use crate::{
    AbortHandle, ChatMessage, FinishReason, Harness, HarnessBuilder, HarnessError, ModelRef,
    ProviderId, Session, SessionConfig, ToolCall, ToolKind, TurnBuilder, TurnOutcome, TurnStream,
    UiEvent, system_prompt,
};
