//! Streaming bridge between an LLM chat-completions stream and a diagram UI.
//!
//! Upstream text deltas are split into narration and an inline tool call
//! (`render` or `edit`), relayed as normalized [`UiEvent`]s while they arrive,
//! and resolved into a [`ToolCall`] when the stream closes. Vendor-specific
//! APIs are namespaced under `vendors::*`.
//!
//! # Streaming a turn (OpenAI)
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use diagram_ai_harness::prelude::*;
//! use diagram_ai_harness::vendors::openai::{
//!     OpenAiProvider, OpenAiRequestOptions, OpenAiTurnBuilderExt,
//! };
//! use diagram_core::Document;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), HarnessError> {
//! let harness = Harness::builder()
//!     .register_provider(Arc::new(OpenAiProvider::from_env()?))
//!     .build()?;
//!
//! let document = Document::new();
//! let mut turn = harness
//!     .session(SessionConfig::named("demo"))
//!     .turn(ModelRef::new("openai", "gpt-4o-mini"))
//!     .system_prompt(system_prompt(&document, None))
//!     .user_text("Draw a box labelled API")
//!     .openai_options(OpenAiRequestOptions::default().temperature(0.2))
//!     .start_stream()
//!     .await?;
//!
//! while let Some(event) = turn.next_event().await {
//!     print!("{}", event.to_json_line().unwrap_or_default());
//! }
//! let outcome = turn.finish().await?;
//! println!("tool call: {:?}", outcome.tool_call);
//! # Ok(())
//! # }
//! ```

/// Chat messages and the final turn outcome.
pub mod content;
/// Narration / tool-call boundary detection and relay.
pub mod detector;
/// Public error types.
pub mod errors;
/// Harness entry point and builder.
pub mod harness;
/// Provider and model identifiers plus per-turn options.
pub mod model;
/// Common imports for typical usage.
pub mod prelude;
/// System prompt for the inline tool-call format.
pub mod prompt;
/// Provider adapter contracts used by vendor integrations.
pub mod provider;
/// Per-session quota seam.
pub mod quota;
/// Strict and forgiving tool payload resolution.
pub mod recovery;
/// Session configuration and session handle.
pub mod session;
/// Normalized UI events.
pub mod stream;
/// Known tools and resolved tool calls.
pub mod tool;
/// Turn builder, streaming handle, and cancellation handle.
pub mod turn;
/// Vendor-specific integrations and extension traits.
pub mod vendors;

pub use content::{ChatMessage, Role, TurnOutcome};
pub use detector::{SessionMode, SpanIds, StreamSession, transform};
pub use errors::{HarnessError, ProviderError, TurnFailure};
pub use harness::{Harness, HarnessBuilder};
pub use model::{ModelRef, ProviderId, TurnOptions};
pub use prompt::system_prompt;
pub use provider::{
    DeltaEvent, DeltaStream, ProviderAdapter, ProviderRequest, ProviderResponseMeta,
    ProviderStreamHandle,
};
pub use quota::{InMemoryQuota, QuotaDecision, QuotaGate, Unlimited};
pub use recovery::ResolutionPath;
pub use session::{Session, SessionConfig};
pub use stream::{FinishReason, UiEvent};
pub use tool::{TOOL_MARKER, ToolApplyError, ToolCall, ToolKind};
pub use turn::{AbortHandle, TurnBuilder, TurnStream};
