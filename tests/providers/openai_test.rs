//! OpenAI-compatible backend tests against a mock server.

use kindred::prompt::{ChatMessage, ModelRequest, Role};
use kindred::providers::openai::{build_request, parse_response, OpenAiCompatibleBackend};
use kindred::providers::{ModelBackend, ProviderError};
use serde_json::json;
use tokio_stream::StreamExt;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(stream: bool) -> ModelRequest {
    ModelRequest {
        system: "Be kind.".to_owned(),
        messages: vec![
            ChatMessage {
                role: Role::User,
                content: "hi".to_owned(),
            },
            ChatMessage {
                role: Role::Model,
                content: "hello".to_owned(),
            },
            ChatMessage {
                role: Role::User,
                content: "how are you?".to_owned(),
            },
        ],
        temperature: 0.7,
        max_output_tokens: 1000,
        stream,
    }
}

fn backend(server: &MockServer) -> OpenAiCompatibleBackend {
    OpenAiCompatibleBackend::new(
        reqwest::Client::new(),
        format!("{}/", server.uri()),
        "gpt-test".to_owned(),
        "test-key".to_owned(),
    )
}

#[test]
fn build_request_puts_system_first_and_maps_model_role() {
    let req = build_request("gpt-test", &request(true));
    assert_eq!(req.messages.len(), 4);
    assert_eq!(req.messages[0].role, "system");
    assert_eq!(req.messages[0].content, "Be kind.");
    assert_eq!(req.messages[2].role, "assistant");
    assert_eq!(req.max_tokens, 1000);
    assert!(req.stream);
}

#[test]
fn parse_response_rejects_empty_content() {
    let body = json!({"choices": [{"message": {"content": ""}}]}).to_string();
    assert!(matches!(parse_response(&body), Err(ProviderError::EmptyBody)));
}

#[tokio::test]
async fn streams_fragments_until_done() {
    let server = MockServer::start().await;
    let sse = concat!(
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n",
        "data: this is not json\n\n",
        ": keep-alive\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\" there\"}}]}\n\n",
        "data: [DONE]\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({"model": "gpt-test", "stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let mut stream = match backend(&server).send(&request(true)).await {
        Ok(stream) => stream,
        Err(e) => panic!("send failed: {e}"),
    };
    let mut fragments = Vec::new();
    while let Some(item) = stream.next().await {
        fragments.push(item.expect("fragment"));
    }
    assert_eq!(fragments, vec!["Hello".to_owned(), " there".to_owned()]);
}

#[tokio::test]
async fn non_streaming_reply_is_a_single_fragment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "Whole reply"}}]
        })))
        .mount(&server)
        .await;

    let mut stream = match backend(&server).send(&request(false)).await {
        Ok(stream) => stream,
        Err(e) => panic!("send failed: {e}"),
    };
    assert_eq!(
        stream.next().await.map(|r| r.expect("fragment")),
        Some("Whole reply".to_owned())
    );
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn error_status_carries_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"message": "Rate limit reached", "type": "requests"}
        })))
        .mount(&server)
        .await;

    match backend(&server).send(&request(true)).await {
        Err(ProviderError::HttpStatus { status, message }) => {
            assert_eq!(status, 429);
            assert_eq!(message, "Rate limit reached");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected an error status"),
    }
}
