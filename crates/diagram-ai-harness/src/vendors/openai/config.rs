use std::time::Duration;

use crate::errors::HarnessError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Endpoint and credentials for an OpenAI-compatible server.
#[derive(Clone, Debug)]
pub struct OpenAiClientConfig {
    pub api_key: String,
    /// Scheme and host, optionally with a path prefix. `/v1/chat/completions`
    /// is appended.
    pub base_url: String,
    /// Bounds connection setup only. Streaming time is bounded per turn.
    pub connect_timeout: Duration,
}

impl OpenAiClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn from_env() -> Result<Self, HarnessError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, HarnessError> {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let api_key = non_blank("OPENAI_API_KEY")
            .ok_or_else(|| HarnessError::Config("OPENAI_API_KEY is not set".into()))?;
        let mut config = Self::new(api_key);
        if let Some(base_url) = non_blank("OPENAI_BASE_URL") {
            config.base_url = base_url;
        }
        Ok(config)
    }

    pub fn base_url(self, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..self
        }
    }

    pub fn connect_timeout(self, connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            ..self
        }
    }

    pub(crate) fn chat_completions_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/v1/chat/completions")
    }
}
