use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chatrelay::core::RelayError;
use chatrelay::core::relay::{RelayConfig, RetryPolicy, StreamingRelay};
use chatrelay::core::types::GenerationParams;
use chatrelay::providers::error::ProviderError;
use chatrelay::providers::types::ApiKey;
use chatrelay::providers::{CohereProvider, OpenAIProvider};

const COHERE_STREAM: &str = concat!(
    r#"{"is_finished":false,"event_type":"stream-start","generation_id":"gen-1"}"#,
    "\n",
    r#"{"is_finished":false,"event_type":"search-queries-generation","search_queries":[{"text":"weather","generation_id":"gen-1"}]}"#,
    "\n",
    r#"{"is_finished":false,"event_type":"text-generation","text":"Hi"}"#,
    "\n",
    r#"{"is_finished":false,"event_type":"text-generation","text":" there"}"#,
    "\n",
    r#"{"is_finished":true,"event_type":"stream-end","finish_reason":"COMPLETE","response":{}}"#,
    "\n",
);

const OPENAI_STREAM: &str = concat!(
    "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"\"},\"finish_reason\":null}]}\n\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"},\"finish_reason\":null}]}\n\n",
    ": keep-alive\n\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\" there\"},\"finish_reason\":null}]}\n\n",
    "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
    "data: [DONE]\n\n",
);

fn cohere(server: &MockServer) -> CohereProvider {
    CohereProvider::new(ApiKey::new("test-key"))
        .unwrap()
        .with_base_url(server.uri())
}

fn openai(server: &MockServer) -> OpenAIProvider {
    OpenAIProvider::new(ApiKey::new("sk-test"))
        .unwrap()
        .with_base_url(server.uri())
}

#[tokio::test]
async fn test_cohere_streams_text_generation_events() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({
            "model": "command-r-08-2024",
            "temperature": 0.7,
            "prompt_truncation": "AUTO",
            "connectors": [{"id": "web-search"}],
            "stream": true
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(COHERE_STREAM, "application/stream+json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let relay = StreamingRelay::new(Arc::new(cohere(&server)));
    let mut handle = relay.generate("", "Hello");

    assert_eq!(handle.next().await.as_deref(), Some("Hi"));
    assert_eq!(handle.next().await.as_deref(), Some("Hi there"));
    assert_eq!(handle.next().await, None);
    assert_eq!(handle.finish().await.unwrap(), "Hi there");
}

#[tokio::test]
async fn test_cohere_sends_rendered_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(COHERE_STREAM, "application/stream+json"),
        )
        .mount(&server)
        .await;

    let relay = StreamingRelay::new(Arc::new(cohere(&server)));
    relay.generate("Known facts", "What now?").finish().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("START CONTEXT BLOCK\nKnown facts\nEND OF CONTEXT BLOCK"));
    assert!(message.contains("USER PROMPT:\nWhat now?"));
}

#[tokio::test]
async fn test_cohere_unauthorized_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat"))
        .respond_with(
            ResponseTemplate::new(401).set_body_string(r#"{"message":"invalid api token"}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = RelayConfig::default().with_retry(RetryPolicy::new(3, Duration::from_millis(10)));
    let relay = StreamingRelay::with_config(Arc::new(cohere(&server)), config);
    let err = relay.generate("", "Hello").finish().await.unwrap_err();

    match err {
        RelayError::Provider(ProviderError::Authentication { message, hint }) => {
            assert_eq!(message, "invalid api token");
            assert_eq!(
                hint.as_deref(),
                Some("Check your COHERE_API_KEY environment variable")
            );
        }
        other => panic!("expected authentication error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cohere_unavailable_exhausts_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream overloaded"))
        .expect(3)
        .mount(&server)
        .await;

    let config = RelayConfig::default().with_retry(RetryPolicy::new(3, Duration::from_millis(10)));
    let relay = StreamingRelay::with_config(Arc::new(cohere(&server)), config);
    let mut handle = relay.generate("", "Hello");

    assert_eq!(handle.next().await, None);
    let err = handle.finish().await.unwrap_err();
    assert!(matches!(
        err,
        RelayError::RetriesExhausted {
            attempts: 3,
            last_error: ProviderError::Server { status: 503, .. }
        }
    ));
}

#[tokio::test]
async fn test_cohere_error_finish_reason_keeps_partial() {
    let body = concat!(
        r#"{"is_finished":false,"event_type":"text-generation","text":"Half an"}"#,
        "\n",
        r#"{"is_finished":true,"event_type":"stream-end","finish_reason":"ERROR"}"#,
        "\n",
    );
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/stream+json"))
        .mount(&server)
        .await;

    let relay = StreamingRelay::new(Arc::new(cohere(&server)));
    let err = relay.generate("", "Hello").finish().await.unwrap_err();

    assert!(matches!(err, RelayError::MidStream { .. }));
    assert_eq!(err.partial_text(), Some("Half an"));
}

#[tokio::test]
async fn test_openai_streams_sse_deltas() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-4o",
            "stream": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(OPENAI_STREAM, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let config = RelayConfig::default().with_params(GenerationParams::default().with_model("gpt-4o"));
    let relay = StreamingRelay::with_config(Arc::new(openai(&server)), config);
    let mut handle = relay.generate("", "Hello");

    let mut snapshots = Vec::new();
    while let Some(snapshot) = handle.next().await {
        snapshots.push(snapshot);
    }
    assert_eq!(snapshots, vec!["Hi", "Hi there"]);
    assert_eq!(handle.finish().await.unwrap(), "Hi there");
}

#[tokio::test]
async fn test_openai_rate_limit_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_string(r#"{"error":{"message":"Rate limit reached"}}"#),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(OPENAI_STREAM, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let config = RelayConfig::default().with_retry(RetryPolicy::new(2, Duration::from_millis(10)));
    let relay = StreamingRelay::with_config(Arc::new(openai(&server)), config);

    assert_eq!(relay.generate("", "Hello").finish().await.unwrap(), "Hi there");
}
