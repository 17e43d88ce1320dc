//! Gemini backend using `generateContent` / `streamGenerateContent`.

use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::prompt::{ModelRequest, Role};

use super::sse::SseDataStream;
use super::{check_http_response, ensure_success, ModelBackend, ProviderError, ReplyStream};

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// `generateContent` request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    /// System instruction.
    pub system_instruction: GeminiContent,
    /// Conversation turns.
    pub contents: Vec<GeminiContent>,
    /// Sampling parameters.
    pub generation_config: GenerationConfig,
}

/// Sampling parameters.
#[doc(hidden)]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature.
    pub temperature: f32,
    /// Output length limit.
    pub max_output_tokens: u32,
}

/// A content block with optional role.
#[doc(hidden)]
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GeminiContent {
    /// `user` or `model`; omitted for the system instruction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Text parts.
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

/// A text part.
#[doc(hidden)]
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GeminiPart {
    /// Part text; absent for non-text parts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Response body (whole or one streamed chunk).
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct GeminiResponse {
    /// Generated candidates.
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

/// A generated candidate.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct GeminiCandidate {
    /// Candidate content; absent when generation was blocked.
    #[serde(default)]
    pub content: Option<GeminiContent>,
}

impl GeminiResponse {
    fn first_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

// ---------------------------------------------------------------------------
// Request / Response builders (pub for integration testing)
// ---------------------------------------------------------------------------

fn text_content(role: Option<&str>, text: &str) -> GeminiContent {
    GeminiContent {
        role: role.map(str::to_owned),
        parts: vec![GeminiPart {
            text: Some(text.to_owned()),
        }],
    }
}

/// Build a `generateContent` request.
#[doc(hidden)]
pub fn build_request(request: &ModelRequest) -> GeminiRequest {
    let contents = request
        .messages
        .iter()
        .map(|msg| {
            let role = match msg.role {
                Role::User => "user",
                Role::Model => "model",
            };
            text_content(Some(role), &msg.content)
        })
        .collect();

    GeminiRequest {
        system_instruction: text_content(None, &request.system),
        contents,
        generation_config: GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_output_tokens,
        },
    }
}

/// Text fragment carried by one SSE payload.
///
/// Unparsable payloads are logged and skipped.
#[doc(hidden)]
pub fn parse_stream_fragment(payload: &str) -> Option<String> {
    match serde_json::from_str::<GeminiResponse>(payload) {
        Ok(chunk) => chunk.first_text(),
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
    let resp: GeminiResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;
    resp.first_text().ok_or(ProviderError::EmptyBody)
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// Gemini generative language API backend.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiBackend {
    /// Create a backend for `{base_url}/models/{model}`.
    pub fn new(client: reqwest::Client, base_url: String, model: String, api_key: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            model,
            api_key,
        }
    }

    fn endpoint(&self, stream: bool) -> String {
        if stream {
            format!(
                "{}/models/{}:streamGenerateContent?alt=sse",
                self.base_url, self.model
            )
        } else {
            format!("{}/models/{}:generateContent", self.base_url, self.model)
        }
    }
}

#[async_trait::async_trait]
impl ModelBackend for GeminiBackend {
    async fn send(&self, request: &ModelRequest) -> Result<ReplyStream, ProviderError> {
        let api_request = build_request(request);
        debug!(model = %self.model, stream = request.stream, "sending generateContent");

        let response = self
            .client
            .post(self.endpoint(request.stream))
            .header("x-goog-api-key", &self.api_key)
            .json(&api_request)
            .send()
            .await?;

        if !request.stream {
            let body = check_http_response(response).await?;
            let text = parse_response(&body)?;
            return Ok(Box::pin(tokio_stream::once(Ok(text))));
        }

        let response = ensure_success(response).await?;
        let fragments =
            SseDataStream::new(response.bytes_stream()).filter_map(|payload| match payload {
                Ok(p) => parse_stream_fragment(&p).map(Ok),
                Err(e) => Some(Err(e)),
            });
        Ok(Box::pin(fragments))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
