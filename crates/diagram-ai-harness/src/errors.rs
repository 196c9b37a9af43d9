use crate::model::ProviderId;

/// Failure reported by a provider adapter, before it is classified for the UI.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The endpoint answered with a non-success HTTP status.
    #[error("{provider} returned HTTP {status}: {message}")]
    Http {
        provider: ProviderId,
        status: u16,
        message: String,
    },
    /// Connecting or reading the stream failed.
    #[error("transport error ({provider}): {message}")]
    Transport {
        provider: ProviderId,
        message: String,
    },
    /// The request could not be built or the response had an unexpected shape.
    #[error("protocol error ({provider}): {message}")]
    Protocol {
        provider: ProviderId,
        message: String,
    },
}

impl ProviderError {
    pub fn http(provider: impl Into<ProviderId>, status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    pub fn transport(provider: impl Into<ProviderId>, message: impl Into<String>) -> Self {
        Self::Transport {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn protocol(provider: impl Into<ProviderId>, message: impl Into<String>) -> Self {
        Self::Protocol {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport { .. } | Self::Protocol { .. } => None,
        }
    }

    /// True for HTTP 429: the upstream rate limit or usage quota was hit.
    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }
}

/// Terminal turn failure, rendered to the UI as a synthetic error text span.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TurnFailure {
    /// Rate limit or usage quota reached, either upstream or at the local quota gate.
    #[error("rate limit reached: {message}")]
    RateLimited { message: String },
    /// Provider returned a terminal failure.
    #[error("provider failure ({provider}): {message}")]
    Provider { provider: String, message: String },
    /// Network/stream transport failed.
    #[error("transport failure ({provider}): {message}")]
    Transport { provider: String, message: String },
    /// The provider request or response violated the expected protocol.
    #[error("protocol failure: {message}")]
    Protocol { message: String },
}

impl TurnFailure {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Error returned by the public turn API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HarnessError {
    /// Bad provider or client configuration (missing API key, duplicate ids).
    #[error("configuration error: {0}")]
    Config(String),
    /// The turn builder was given unusable input.
    #[error("invalid turn: {0}")]
    Validation(String),
    #[error("no provider registered under '{provider}'")]
    ProviderNotFound { provider: ProviderId },
    /// The turn ended with a failure that was already rendered as an error span.
    #[error(transparent)]
    TurnFailed(#[from] TurnFailure),
    /// The turn was aborted; nothing further was emitted.
    #[error("turn cancelled")]
    Cancelled,
    /// The turn task and its handle fell out of step (receiver dropped, no result).
    #[error("turn protocol error: {0}")]
    Protocol(String),
}

impl HarnessError {
    pub(crate) fn protocol_msg(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

/// Classifies a provider error. HTTP 429 becomes [`TurnFailure::RateLimited`]
/// so the UI can render it with the quota prefix.
pub(crate) fn turn_failure_from_provider_error(err: &ProviderError) -> TurnFailure {
    match err {
        ProviderError::Http {
            status: 429,
            message,
            ..
        } => TurnFailure::RateLimited {
            message: message.clone(),
        },
        ProviderError::Http {
            provider,
            status,
            message,
        } => TurnFailure::Provider {
            provider: provider.to_string(),
            message: format!("HTTP {status}: {message}"),
        },
        ProviderError::Transport { provider, message } => TurnFailure::Transport {
            provider: provider.to_string(),
            message: message.clone(),
        },
        ProviderError::Protocol { provider, message } => TurnFailure::Protocol {
            message: format!("provider={provider}: {message}"),
        },
    }
}
