use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::HarnessError;

const DEFAULT_STREAM_BUFFER: usize = 128;

/// Key a provider adapter is registered under, e.g. `openai`.
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ProviderId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for ProviderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A model name qualified by the provider that serves it.
///
/// Parses from and prints as `provider/model`, e.g. `openai/gpt-4o-mini`.
/// Everything after the first slash is the model name, so vendor names
/// containing slashes survive the round trip.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelRef {
    pub provider: ProviderId,
    pub model: String,
}

impl ModelRef {
    pub fn new(provider: impl Into<ProviderId>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

impl FromStr for ModelRef {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((provider, model)) if !provider.is_empty() && !model.is_empty() => {
                Ok(Self::new(provider, model))
            }
            _ => Err(HarnessError::Config(format!(
                "model reference {s:?} is not of the form provider/model"
            ))),
        }
    }
}

/// Knobs applied to a single turn.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TurnOptions {
    /// Upper bound on streaming time. When it passes the upstream stream is
    /// dropped and the turn is finalized from what was received so far.
    pub timeout: Option<Duration>,
    /// Capacity of the channel between the turn task and its consumer.
    pub stream_buffer_capacity: usize,
}

impl Default for TurnOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            stream_buffer_capacity: DEFAULT_STREAM_BUFFER,
        }
    }
}
