//! OpenAI-compatible backend using the `/chat/completions` API.

use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::prompt::{ModelRequest, Role};

use super::sse::SseDataStream;
use super::{check_http_response, ensure_success, ModelBackend, ProviderError, ReplyStream};

const STREAM_TERMINATOR: &str = "[DONE]";

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// Chat completions request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct OpenAiRequest {
    /// Model identifier.
    pub model: String,
    /// System message followed by the conversation.
    pub messages: Vec<OpenAiMessage>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum completion tokens.
    pub max_tokens: u32,
    /// Whether to stream SSE chunks.
    pub stream: bool,
}

/// A message in chat completions format.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct OpenAiMessage {
    /// `system`, `user` or `assistant`.
    pub role: &'static str,
    /// Message text.
    pub content: String,
}

/// One streamed chunk.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiStreamChunk {
    /// Choices carrying deltas.
    #[serde(default)]
    pub choices: Vec<OpenAiStreamChoice>,
}

/// A streamed choice.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiStreamChoice {
    /// Incremental content.
    #[serde(default)]
    pub delta: OpenAiDelta,
}

/// Incremental content of a streamed choice.
#[doc(hidden)]
#[derive(Debug, Default, Deserialize)]
pub struct OpenAiDelta {
    /// Text fragment, absent on role-only and final chunks.
    pub content: Option<String>,
}

/// Non-streaming response body.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiResponse {
    /// Response choices.
    #[serde(default)]
    pub choices: Vec<OpenAiChoice>,
}

/// A non-streaming choice.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiChoice {
    /// Assistant message.
    pub message: OpenAiResponseMessage,
}

/// Assistant message of a non-streaming choice.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiResponseMessage {
    /// Reply text.
    pub content: Option<String>,
}

// ---------------------------------------------------------------------------
// Request / Response builders (pub for integration testing)
// ---------------------------------------------------------------------------

/// Build a chat completions request.
#[doc(hidden)]
pub fn build_request(model: &str, request: &ModelRequest) -> OpenAiRequest {
    let mut messages = Vec::with_capacity(request.messages.len().saturating_add(1));
    messages.push(OpenAiMessage {
        role: "system",
        content: request.system.clone(),
    });
    messages.extend(request.messages.iter().map(|msg| OpenAiMessage {
        role: match msg.role {
            Role::User => "user",
            Role::Model => "assistant",
        },
        content: msg.content.clone(),
    }));

    OpenAiRequest {
        model: model.to_owned(),
        messages,
        temperature: request.temperature,
        max_tokens: request.max_output_tokens,
        stream: request.stream,
    }
}

/// Text fragment carried by one SSE payload.
///
/// Unparsable payloads are logged and skipped.
#[doc(hidden)]
pub fn parse_stream_fragment(payload: &str) -> Option<String> {
    match serde_json::from_str::<OpenAiStreamChunk>(payload) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|text| !text.is_empty()),
        Err(e) => {
            warn!(error = %e, "skipping unparsable stream fragment");
            None
        }
    }
}

/// Reply text of a non-streaming response.
///
/// # Errors
///
/// Returns `ProviderError::Parse` if the body does not deserialize and
/// `ProviderError::EmptyBody` if it carries no text.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<String, ProviderError> {
    let resp: OpenAiResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;
    resp.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.is_empty())
        .ok_or(ProviderError::EmptyBody)
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// Any endpoint speaking the OpenAI chat completions protocol.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAiCompatibleBackend {
    /// Create a backend for `{base_url}/chat/completions`.
    pub fn new(client: reqwest::Client, base_url: String, model: String, api_key: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            model,
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl ModelBackend for OpenAiCompatibleBackend {
    async fn send(&self, request: &ModelRequest) -> Result<ReplyStream, ProviderError> {
        let api_request = build_request(&self.model, request);
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, stream = request.stream, "sending chat completion");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&api_request)
            .send()
            .await?;

        if !request.stream {
            let body = check_http_response(response).await?;
            let text = parse_response(&body)?;
            return Ok(Box::pin(tokio_stream::once(Ok(text))));
        }

        let response = ensure_success(response).await?;
        let fragments = SseDataStream::new(response.bytes_stream())
            .take_while(|payload| !matches!(payload, Ok(p) if p == STREAM_TERMINATOR))
            .filter_map(|payload| match payload {
                Ok(p) => parse_stream_fragment(&p).map(Ok),
                Err(e) => Some(Err(e)),
            });
        Ok(Box::pin(fragments))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
