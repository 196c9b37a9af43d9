use std::collections::VecDeque;
use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, StreamExt as _, stream};
use serde::Deserialize as _;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::content::{ChatMessage, Role};
use crate::errors::{HarnessError, ProviderError};
use crate::model::ProviderId;
use crate::provider::{
    DeltaEvent, DeltaStream, ProviderAdapter, ProviderRequest, ProviderResponseMeta,
    ProviderStreamHandle,
};

use super::config::OpenAiClientConfig;
use super::options::OpenAiRequestOptions;
use super::transport::DeltaFrameParser;

pub(crate) const OPENAI_PROVIDER: &str = "openai";

type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static>>;

/// Streams chat completions from an OpenAI-compatible endpoint.
pub struct OpenAiProvider {
    http: reqwest::Client,
    config: OpenAiClientConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiClientConfig) -> Result<Self, HarnessError> {
        if config.api_key.trim().is_empty() {
            return Err(HarnessError::Config("OpenAI api_key is empty".into()));
        }
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|err| HarnessError::Config(format!("cannot build HTTP client: {err}")))?;
        Ok(Self { http, config })
    }

    /// Reads `OPENAI_API_KEY` and the optional `OPENAI_BASE_URL`.
    pub fn from_env() -> Result<Self, HarnessError> {
        OpenAiClientConfig::from_env().and_then(Self::new)
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for OpenAiProvider {
    fn id(&self) -> ProviderId {
        OPENAI_PROVIDER.into()
    }

    async fn start_stream(
        &self,
        req: ProviderRequest,
    ) -> Result<ProviderStreamHandle, ProviderError> {
        let options = request_options(&req)?;
        let body = build_request_body(&req, &options);
        debug!(
            turn_id = %req.turn_id,
            session_id = %req.session_id,
            model = %req.model,
            history = req.messages.len(),
            "opening chat completions stream"
        );

        let response = self
            .http
            .post(self.config.chat_completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| ProviderError::transport(OPENAI_PROVIDER, err.to_string()))?;
        let response = check_status(response).await?;

        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        if let Some(request_id) = &request_id {
            debug!(turn_id = %req.turn_id, request_id, "upstream accepted request");
        }

        Ok(ProviderStreamHandle {
            stream: into_delta_stream(Box::pin(response.bytes_stream())),
            metadata: ProviderResponseMeta { request_id },
        })
    }
}

/// Turns a non-2xx response into [`ProviderError::Http`], preferring the
/// `error.message` field of an OpenAI error body over the raw text.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let raw = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&raw)
        .ok()
        .and_then(|body| body["error"]["message"].as_str().map(str::to_owned))
        .unwrap_or_else(|| match raw.trim() {
            "" => status
                .canonical_reason()
                .unwrap_or("no response body")
                .to_owned(),
            text => text.to_owned(),
        });
    warn!(status = status.as_u16(), %message, "chat completions request rejected");
    Err(ProviderError::http(OPENAI_PROVIDER, status.as_u16(), message))
}

fn request_options(req: &ProviderRequest) -> Result<OpenAiRequestOptions, ProviderError> {
    let Some(raw) = req.vendor_options.get(&ProviderId::new(OPENAI_PROVIDER)) else {
        return Ok(OpenAiRequestOptions::default());
    };
    OpenAiRequestOptions::deserialize(raw).map_err(|err| {
        ProviderError::protocol(OPENAI_PROVIDER, format!("bad openai options: {err}"))
    })
}

fn wire_message(role: Role, content: &str) -> Value {
    json!({ "role": role, "content": content })
}

pub(crate) fn build_request_body(req: &ProviderRequest, options: &OpenAiRequestOptions) -> Value {
    let system = req
        .system_prompt
        .as_deref()
        .map(str::trim)
        .filter(|prompt| !prompt.is_empty())
        .map(|prompt| wire_message(Role::System, prompt));
    let history = req
        .messages
        .iter()
        .map(|ChatMessage { role, content }| wire_message(*role, content));
    let messages: Vec<Value> = system.into_iter().chain(history).collect();

    let mut body = json!({
        "model": req.model.model,
        "messages": messages,
        "stream": true,
    });
    if let Some(temperature) = options.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(max_tokens) = options.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    body
}

/// Pulls byte chunks off the response body and hands out decoded deltas.
struct SseReader {
    body: ByteStream,
    parser: DeltaFrameParser,
    ready: VecDeque<DeltaEvent>,
    drained: bool,
}

impl SseReader {
    fn new(body: ByteStream) -> Self {
        Self {
            body,
            parser: DeltaFrameParser::default(),
            ready: VecDeque::new(),
            drained: false,
        }
    }

    async fn next(&mut self) -> Option<Result<DeltaEvent, ProviderError>> {
        loop {
            if let Some(event) = self.ready.pop_front() {
                return Some(Ok(event));
            }
            if self.drained {
                return None;
            }
            match self.body.next().await {
                Some(Ok(chunk)) => self.ready.extend(self.parser.push_chunk(&chunk)),
                Some(Err(err)) => {
                    self.drained = true;
                    return Some(Err(ProviderError::transport(
                        OPENAI_PROVIDER,
                        format!("stream read failed: {err}"),
                    )));
                }
                None => {
                    self.drained = true;
                    self.ready.extend(self.parser.finish());
                }
            }
        }
    }
}

fn into_delta_stream(body: ByteStream) -> DeltaStream {
    Box::pin(stream::unfold(SseReader::new(body), |mut reader| async move {
        reader.next().await.map(|item| (item, reader))
    }))
}
