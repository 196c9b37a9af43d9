//! OpenAI-compatible chat completions (`/v1/chat/completions`, SSE).
mod adapter;
mod config;
mod options;
pub(crate) mod transport;

pub use adapter::OpenAiProvider;
pub use config::OpenAiClientConfig;
pub use options::OpenAiRequestOptions;

use tracing::warn;

use crate::model::ProviderId;
use crate::turn::TurnBuilder;

/// Adds `.openai_options(..)` to [`TurnBuilder`]. Other providers ignore them.
pub trait OpenAiTurnBuilderExt: Sized {
    fn openai_options(self, options: OpenAiRequestOptions) -> Self;
}

impl OpenAiTurnBuilderExt for TurnBuilder {
    fn openai_options(self, options: OpenAiRequestOptions) -> Self {
        let value = match serde_json::to_value(&options) {
            Ok(value) => value,
            Err(err) => {
                warn!(%err, ?options, "openai options not serializable; ignored");
                return self;
            }
        };
        self.set_vendor_options_json(ProviderId::new(adapter::OPENAI_PROVIDER), value)
    }
}
