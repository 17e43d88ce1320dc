//! Model backend abstraction.
//!
//! A [`ModelBackend`] turns a [`ModelRequest`] into a stream of text
//! fragments. Returning `Ok` means the endpoint accepted the request and its
//! headers; everything after that arrives through the [`ReplyStream`].
//!
//! Two backends are implemented:
//! - [`openai::OpenAiCompatibleBackend`] — `/chat/completions` endpoints
//! - [`gemini::GeminiBackend`] — Gemini `generateContent` endpoints

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tokio_stream::Stream;

use crate::config::{BackendKind, ModelConfig};
use crate::prompt::ModelRequest;

pub mod gemini;
pub mod openai;
pub mod sse;

/// Incremental text fragments of one reply.
pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by model backends.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP transport failure.
    #[error("backend request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Response did not match the expected schema.
    #[error("backend response parse error: {0}")]
    Parse(String),
    /// Endpoint responded with a non-success status.
    #[error("backend returned status {status}: {message}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Server-provided message, sanitized.
        message: String,
    },
    /// Endpoint returned no usable content.
    #[error("backend returned an empty body")]
    EmptyBody,
    /// Backend cannot be used with the current configuration.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Pluggable remote model endpoint.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Send `request` and return the reply fragments.
    ///
    /// Non-streaming requests yield the whole reply as a single fragment.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the request cannot be sent or the
    /// endpoint rejects it.
    async fn send(&self, request: &ModelRequest) -> Result<ReplyStream, ProviderError>;

    /// Model identifier used in logs.
    fn model_id(&self) -> &str;
}

/// Build the configured backend.
///
/// # Errors
///
/// Returns [`ProviderError::Unavailable`] without a credential and
/// [`ProviderError::Request`] if the HTTP client cannot be built.
pub fn build_backend(
    config: &ModelConfig,
    api_key: Option<String>,
) -> Result<Arc<dyn ModelBackend>, ProviderError> {
    let api_key = api_key
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| ProviderError::Unavailable(format!("{} is not set", config.api_key_env)))?;

    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .build()?;

    let base_url = config.resolved_base_url();
    let model = config.resolved_model();
    Ok(match config.backend {
        BackendKind::OpenAi => Arc::new(openai::OpenAiCompatibleBackend::new(
            client, base_url, model, api_key,
        )),
        BackendKind::Gemini => Arc::new(gemini::GeminiBackend::new(
            client, base_url, model, api_key,
        )),
    })
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// Pass a successful response through, or turn a non-2xx one into an error.
///
/// # Errors
///
/// Returns `ProviderError::HttpStatus` on non-2xx, `ProviderError::Request`
/// if the error body cannot be read.
pub async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await?;
    Err(ProviderError::HttpStatus {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Check HTTP response status and return the body text or a structured error.
///
/// # Errors
///
/// Returns `ProviderError::Request` on transport failure, `ProviderError::HttpStatus` on non-2xx.
pub async fn check_http_response(response: reqwest::Response) -> Result<String, ProviderError> {
    let response = ensure_success(response).await?;
    Ok(response.text().await?)
}

/// Human-readable message from an error body.
///
/// Prefers `error.message`, then `message`; falls back to the sanitized raw body.
pub fn error_message(body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|json| {
        json.pointer("/error/message")
            .or_else(|| json.get("message"))
            .and_then(Value::as_str)
            .map(str::to_owned)
    });
    sanitize_http_error_body(from_json.as_deref().unwrap_or(body))
}

fn sanitize_http_error_body(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut sanitized = collapsed;
    for pattern in [
        r"sk-[A-Za-z0-9_\-]{20,}",
        r"AIza[0-9A-Za-z_\-]{35}",
        r"Bearer [A-Za-z0-9._\-]{16,}",
    ] {
        if let Ok(regex) = Regex::new(pattern) {
            sanitized = regex.replace_all(&sanitized, "[REDACTED]").into_owned();
        }
    }

    const MAX_ERROR_BODY_CHARS: usize = 256;
    if sanitized.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened = sanitized
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        return format!("{shortened}...[truncated]");
    }

    sanitized
}
