//! Gemini backend tests against a mock server.

use kindred::prompt::{ChatMessage, ModelRequest, Role};
use kindred::providers::gemini::{build_request, parse_response, GeminiBackend};
use kindred::providers::{ModelBackend, ProviderError};
use serde_json::json;
use tokio_stream::StreamExt;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(stream: bool) -> ModelRequest {
    ModelRequest {
        system: "Be kind.".to_owned(),
        messages: vec![
            ChatMessage {
                role: Role::Model,
                content: "Welcome back".to_owned(),
            },
            ChatMessage {
                role: Role::User,
                content: "hi".to_owned(),
            },
        ],
        temperature: 0.5,
        max_output_tokens: 256,
        stream,
    }
}

fn backend(server: &MockServer) -> GeminiBackend {
    GeminiBackend::new(
        reqwest::Client::new(),
        server.uri(),
        "gemini-test".to_owned(),
        "g-key".to_owned(),
    )
}

#[test]
fn request_uses_camel_case_wire_format() {
    let value = serde_json::to_value(build_request(&request(true))).expect("serializes");
    assert_eq!(
        value,
        json!({
            "systemInstruction": {"parts": [{"text": "Be kind."}]},
            "contents": [
                {"role": "model", "parts": [{"text": "Welcome back"}]},
                {"role": "user", "parts": [{"text": "hi"}]}
            ],
            "generationConfig": {"temperature": 0.5, "maxOutputTokens": 256}
        })
    );
}

#[test]
fn parse_response_joins_parts() {
    let body = json!({
        "candidates": [{"content": {"role": "model", "parts": [{"text": "Hi "}, {"text": "there"}]}}]
    })
    .to_string();
    assert_eq!(parse_response(&body).expect("text"), "Hi there");
}

#[test]
fn blocked_candidate_is_empty_body() {
    let body = json!({"candidates": [{"finishReason": "SAFETY"}]}).to_string();
    assert!(matches!(parse_response(&body), Err(ProviderError::EmptyBody)));
}

#[tokio::test]
async fn streams_candidate_text() {
    let server = MockServer::start().await;
    let sse = concat!(
        "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"Take \"}]}}]}\r\n\r\n",
        "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"a breath.\"}]}}]}\r\n\r\n",
        "data: {\"candidates\":[{\"finishReason\":\"STOP\"}]}\r\n\r\n",
    );
    Mock::given(method("POST"))
        .and(path("/models/gemini-test:streamGenerateContent"))
        .and(query_param("alt", "sse"))
        .and(header("x-goog-api-key", "g-key"))
        .and(body_partial_json(json!({"generationConfig": {"maxOutputTokens": 256}})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let mut stream = match backend(&server).send(&request(true)).await {
        Ok(stream) => stream,
        Err(e) => panic!("send failed: {e}"),
    };
    let mut text = String::new();
    while let Some(item) = stream.next().await {
        text.push_str(&item.expect("fragment"));
    }
    assert_eq!(text, "Take a breath.");
}

#[tokio::test]
async fn non_streaming_uses_generate_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-test:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "All at once"}]}}]
        })))
        .mount(&server)
        .await;

    let mut stream = match backend(&server).send(&request(false)).await {
        Ok(stream) => stream,
        Err(e) => panic!("send failed: {e}"),
    };
    assert_eq!(
        stream.next().await.map(|r| r.expect("fragment")),
        Some("All at once".to_owned())
    );
}

#[tokio::test]
async fn server_error_is_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream overloaded"))
        .mount(&server)
        .await;

    match backend(&server).send(&request(true)).await {
        Err(ProviderError::HttpStatus { status, message }) => {
            assert_eq!(status, 503);
            assert_eq!(message, "upstream overloaded");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected an error status"),
    }
}
