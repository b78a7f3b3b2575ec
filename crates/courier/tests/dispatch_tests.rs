//! Request dispatcher tests against a stubbed upstream.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::Json;
use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use courier::completion::{CompletionClient, CompletionError};
use courier::config::CompletionConfig;
use serde_json::{Value, json};

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn stub_config(addr: SocketAddr) -> CompletionConfig {
    CompletionConfig {
        api_url: format!("http://{addr}/chat/completions"),
        api_key: "test-key".to_string(),
        ..CompletionConfig::default()
    }
}

fn valid_body(content: &str) -> Json<Value> {
    Json(json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    }))
}

#[tokio::test]
async fn over_length_input_never_reaches_the_upstream() {
    let hits = Arc::new(AtomicUsize::new(0));
    let handler_hits = Arc::clone(&hits);

    let app = Router::new().route(
        "/chat/completions",
        post(move || {
            let hits = Arc::clone(&handler_hits);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                valid_body("should never be seen")
            }
        }),
    );
    let addr = serve(app).await;
    let client = CompletionClient::new(stub_config(addr));

    let result = client.dispatch(&"x".repeat(2001)).await;

    assert!(matches!(result, Err(CompletionError::TooLong(2001))));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn success_returns_the_first_choice_content_unmodified() {
    let captured: Arc<Mutex<Option<(Option<String>, Value)>>> = Arc::new(Mutex::new(None));
    let handler_captured = Arc::clone(&captured);

    let app = Router::new().route(
        "/chat/completions",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let captured = Arc::clone(&handler_captured);
            async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|value| value.to_str().ok())
                    .map(|value| value.to_string());
                *captured.lock().unwrap() = Some((auth, body));
                valid_body("stub reply")
            }
        }),
    );
    let addr = serve(app).await;
    let client = CompletionClient::new(stub_config(addr));

    // Boundary length passes the guard.
    let result = client.dispatch(&"x".repeat(2000)).await;
    assert_eq!(result.unwrap(), "stub reply");

    let (auth, body) = captured.lock().unwrap().take().unwrap();
    assert_eq!(auth.as_deref(), Some("Bearer test-key"));
    assert_eq!(body["model"], "deepseek-chat");
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["temperature"], 0.7);
    assert_eq!(body["top_p"], 0.9);
    assert_eq!(body["frequency_penalty"], 0.2);
    assert_eq!(body["presence_penalty"], 0.2);
    assert_eq!(body["max_tokens"], 2000);
}

#[tokio::test]
async fn non_success_status_maps_to_upstream_status() {
    let app = Router::new().route(
        "/chat/completions",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded") }),
    );
    let addr = serve(app).await;
    let client = CompletionClient::new(stub_config(addr));

    let result = client.dispatch("hello").await;

    assert!(matches!(result, Err(CompletionError::UpstreamStatus(500))));
}

#[tokio::test]
async fn empty_choices_is_a_malformed_response() {
    let app = Router::new().route(
        "/chat/completions",
        post(|| async { Json(json!({"choices": []})) }),
    );
    let addr = serve(app).await;
    let client = CompletionClient::new(stub_config(addr));

    let result = client.dispatch("hello").await;

    assert!(matches!(result, Err(CompletionError::MalformedResponse)));
}

#[tokio::test]
async fn missing_choices_field_is_a_malformed_response() {
    let app = Router::new().route(
        "/chat/completions",
        post(|| async { Json(json!({"id": "cmpl-1"})) }),
    );
    let addr = serve(app).await;
    let client = CompletionClient::new(stub_config(addr));

    let result = client.dispatch("hello").await;

    assert!(matches!(result, Err(CompletionError::MalformedResponse)));
}

#[tokio::test]
async fn non_json_body_is_a_malformed_response() {
    let app = Router::new().route("/chat/completions", post(|| async { "not json at all" }));
    let addr = serve(app).await;
    let client = CompletionClient::new(stub_config(addr));

    let result = client.dispatch("hello").await;

    assert!(matches!(result, Err(CompletionError::MalformedResponse)));
}

#[tokio::test]
async fn slow_upstream_times_out_within_the_bound() {
    let app = Router::new().route(
        "/chat/completions",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            valid_body("too late")
        }),
    );
    let addr = serve(app).await;

    let mut config = stub_config(addr);
    config.request_timeout_secs = 1;
    let client = CompletionClient::new(config);

    let started = Instant::now();
    let result = client.dispatch("hello").await;

    assert!(matches!(result, Err(CompletionError::Timeout)));
    // Timeout bound plus a small epsilon, well under the stub's delay.
    assert!(started.elapsed() < Duration::from_secs(3));
}
