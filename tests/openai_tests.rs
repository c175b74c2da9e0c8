//! HTTP client tests against a mock OpenAI-compatible server.
//!
//! These tests use wiremock to validate:
//! - Request shape (path, bearer token, model, inputs)
//! - Response parsing and embedding order
//! - Error classification and retry behaviour

use std::time::Duration;

use ragslab::{
    ChatService, EmbeddingService, Error, ErrorKind, Message, OpenAiChat, OpenAiEmbeddings,
    RetryPolicy,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        multiplier: 2.0,
    }
}

fn embeddings(server: &MockServer) -> OpenAiEmbeddings {
    OpenAiEmbeddings::new("sk-test", "text-embedding-3-small")
        .unwrap()
        .with_api_base(&server.uri())
        .with_retry(fast_retry())
}

fn chat(server: &MockServer) -> OpenAiChat {
    OpenAiChat::new("sk-test", "gpt-4o-mini")
        .unwrap()
        .with_api_base(&server.uri())
        .with_retry(fast_retry())
}

fn embedding_item(index: usize, embedding: &[f32]) -> Value {
    json!({"object": "embedding", "index": index, "embedding": embedding})
}

fn chat_response(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============= Embeddings =============

#[tokio::test]
async fn test_embeddings_ordered_by_index() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "text-embedding-3-small",
            "input": ["first", "second"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [embedding_item(1, &[0.0, 1.0]), embedding_item(0, &[1.0, 0.0])]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let vectors = embeddings(&server)
        .embed(&texts(&["first", "second"]))
        .await
        .unwrap();
    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
}

#[tokio::test]
async fn test_embeddings_split_into_batches() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(body_partial_json(json!({"input": ["a", "b"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [embedding_item(0, &[1.0]), embedding_item(1, &[2.0])]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(body_partial_json(json!({"input": ["c"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [embedding_item(0, &[3.0])]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let vectors = embeddings(&server)
        .with_batch_size(2)
        .embed(&texts(&["a", "b", "c"]))
        .await
        .unwrap();
    assert_eq!(vectors, vec![vec![1.0], vec![2.0], vec![3.0]]);
}

#[tokio::test]
async fn test_embed_one() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [embedding_item(0, &[0.5, 0.5])]
        })))
        .mount(&server)
        .await;

    let vector = embeddings(&server).embed_one("query").await.unwrap();
    assert_eq!(vector, vec![0.5, 0.5]);
}

#[tokio::test]
async fn test_embedding_count_mismatch_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [embedding_item(0, &[1.0])]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = embeddings(&server)
        .embed(&texts(&["a", "b"]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedResponse);
}

#[tokio::test]
async fn test_embedding_duplicate_index_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [embedding_item(0, &[1.0]), embedding_item(0, &[2.0])]
        })))
        .mount(&server)
        .await;

    let err = embeddings(&server)
        .embed(&texts(&["a", "b"]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MalformedResponse(_)));
}

// ============= Chat =============

#[tokio::test]
async fn test_chat_returns_first_choice() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "messages": [
                {"role": "system", "content": "Be brief."},
                {"role": "user", "content": "tell me about space x ships."}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("Starship.")))
        .expect(1)
        .mount(&server)
        .await;

    let messages = [
        Message::system("Be brief."),
        Message::user("tell me about space x ships."),
    ];
    let reply = chat(&server).complete(&messages, 0.1).await.unwrap();
    assert_eq!(reply, "Starship.");
}

#[tokio::test]
async fn test_chat_missing_content_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .expect(1)
        .mount(&server)
        .await;

    let err = chat(&server)
        .complete(&[Message::user("hi")], 0.0)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedResponse);
}

#[tokio::test]
async fn test_chat_rejects_bad_temperature_without_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("never")))
        .expect(0)
        .mount(&server)
        .await;

    let client = chat(&server);
    let err = client
        .complete(&[Message::user("hi")], 2.5)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(client.complete(&[], 0.1).await.is_err());
}

// ============= Errors and retries =============

#[tokio::test]
async fn test_rate_limit_retried_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"message": "Rate limit reached", "type": "requests"}
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let reply = chat(&server)
        .complete(&[Message::user("hi")], 0.1)
        .await
        .unwrap();
    assert_eq!(reply, "ok");
}

#[tokio::test]
async fn test_server_errors_exhaust_retries() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let err = embeddings(&server)
        .embed(&texts(&["a"]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_unauthorized_is_config_and_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = chat(&server)
        .complete(&[Message::user("hi")], 0.1)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert!(err.to_string().contains("Incorrect API key provided"));
}

#[tokio::test]
async fn test_bad_request_is_invalid_argument() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "input too long"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = embeddings(&server)
        .embed(&texts(&["a"]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn test_unreachable_server_is_unavailable() {
    // Nothing listens on port 9 (discard) in the test environment.
    let client = OpenAiChat::new("sk-test", "gpt-4o-mini")
        .unwrap()
        .with_api_base("http://127.0.0.1:9")
        .with_retry(RetryPolicy::none());

    let err = client
        .complete(&[Message::user("hi")], 0.1)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
}
