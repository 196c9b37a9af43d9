use std::collections::HashMap;
use std::pin::Pin;

use crate::content::ChatMessage;
use crate::errors::ProviderError;
use crate::model::{ModelRef, ProviderId, TurnOptions};

/// One decoded unit of upstream model output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeltaEvent {
    /// Visible answer text, possibly containing an inline tool call.
    Text(String),
    /// Model "thinking" text.
    Reasoning(String),
}

/// Provider-agnostic request passed to a `ProviderAdapter`.
#[derive(Clone, Debug)]
pub struct ProviderRequest {
    pub turn_id: uuid::Uuid,
    pub session_id: uuid::Uuid,
    pub model: ModelRef,
    pub system_prompt: Option<String>,
    /// Conversation so far, oldest first, ending with the current user message.
    pub messages: Vec<ChatMessage>,
    pub options: TurnOptions,
    /// Vendor-specific JSON options keyed by provider id.
    pub vendor_options: HashMap<ProviderId, serde_json::Value>,
}

/// Response metadata known when the upstream stream opens.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderResponseMeta {
    pub request_id: Option<String>,
}

pub type DeltaStream =
    Pin<Box<dyn futures::Stream<Item = Result<DeltaEvent, ProviderError>> + Send + 'static>>;

/// Open upstream stream. A clean end of `stream` ends the turn.
pub struct ProviderStreamHandle {
    pub stream: DeltaStream,
    pub metadata: ProviderResponseMeta,
}

/// Contract implemented by every model vendor integration.
#[async_trait::async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Id this adapter is registered under.
    fn id(&self) -> ProviderId;

    /// Sends the request and returns once the upstream stream is open.
    ///
    /// HTTP-level rejections are returned here as `ProviderError::Http`;
    /// failures after this point arrive as stream items.
    async fn start_stream(
        &self,
        req: ProviderRequest,
    ) -> Result<ProviderStreamHandle, ProviderError>;
}
