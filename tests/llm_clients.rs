//! Wire-level tests for the chat and legacy completion clients.
//!
//! A fake OpenAI-compatible provider is served by axum on a free port. It
//! records every request it receives and answers according to the route.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use ci_triage::config::{ApiStyle, LlmConfig};
use ci_triage::llm::{analyze, create_client, CompletionRequest, LlmError, FALLBACK_FIX};
use ci_triage::models::{ParsedLog, Platform};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

const KEY_VAR: &str = "CI_TRIAGE_TEST_PROVIDER_KEY";

#[derive(Clone, Default)]
struct Recorded {
    requests: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
}

fn record(state: &Recorded, path: &str, headers: &HeaderMap, body: Value) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state
        .requests
        .lock()
        .unwrap()
        .push((path.to_string(), auth, body));
}

async fn chat_completions(
    State(state): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    record(&state, "/v1/chat/completions", &headers, body);
    Json(json!({
        "choices": [{
            "message": {
                "role": "assistant",
                "content": "{\"root_cause\": \"expired token\", \"suggested_fix\": \"rotate NPM_TOKEN\"}"
            }
        }]
    }))
}

async fn completions(
    State(state): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    record(&state, "/v1/completions", &headers, body);
    Json(json!({
        "choices": [{
            "text": "Analysis:\n\"root_cause\": \"disk full\",\n\"suggested_fix\": \"clean the runner cache\""
        }]
    }))
}

async fn rate_limited() -> (StatusCode, &'static str) {
    (StatusCode::TOO_MANY_REQUESTS, "slow down")
}

async fn wrong_shape() -> Json<Value> {
    Json(json!({ "output": "no choices here" }))
}

async fn start_provider(state: Recorded) -> String {
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/completions", post(completions))
        .route("/limited/chat/completions", post(rate_limited))
        .route("/odd/completions", post(wrong_shape))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{}", addr)
}

fn llm_config(api: ApiStyle, base_url: String) -> LlmConfig {
    std::env::set_var(KEY_VAR, "sk-test");
    LlmConfig {
        api,
        base_url,
        model: "test/model".to_string(),
        api_key_env: KEY_VAR.to_string(),
        timeout_secs: 5,
        ..LlmConfig::default()
    }
}

fn parsed() -> ParsedLog {
    ParsedLog {
        platform: Platform::GitHubActions,
        failed_step: "Publish package".to_string(),
        error_context: "npm ERR! 401 Unauthorized".to_string(),
    }
}

#[tokio::test]
async fn test_chat_client_request_and_response() {
    let state = Recorded::default();
    let base = start_provider(state.clone()).await;
    let client = create_client(&llm_config(ApiStyle::Chat, format!("{}/v1/", base))).unwrap();

    let result = analyze(client.as_ref(), &parsed()).await;
    assert_eq!(result.root_cause, "expired token");
    assert_eq!(result.suggested_fix, "rotate NPM_TOKEN");

    let requests = state.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let (path, auth, body) = &requests[0];
    assert_eq!(path, "/v1/chat/completions");
    assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
    assert_eq!(body["model"], "test/model");
    assert_eq!(body["max_tokens"], 500);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["role"], "user");
    assert!(body["messages"][1]["content"]
        .as_str()
        .unwrap()
        .contains("npm ERR! 401 Unauthorized"));
}

#[tokio::test]
async fn test_legacy_client_request_and_response() {
    let state = Recorded::default();
    let base = start_provider(state.clone()).await;
    let client = create_client(&llm_config(ApiStyle::Legacy, format!("{}/v1", base))).unwrap();
    assert_eq!(client.name(), "legacy");

    let result = analyze(client.as_ref(), &parsed()).await;
    assert_eq!(result.root_cause, "disk full");
    assert_eq!(result.suggested_fix, "clean the runner cache");

    let requests = state.requests.lock().unwrap();
    let (path, _, body) = &requests[0];
    assert_eq!(path, "/v1/completions");
    assert!(body.get("messages").is_none());
    let prompt = body["prompt"].as_str().unwrap();
    assert!(prompt.starts_with("You are an expert CI/CD troubleshooter"));
    assert!(prompt.contains("**Failed Step:** Publish package"));
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let base = start_provider(Recorded::default()).await;
    let client = create_client(&llm_config(ApiStyle::Chat, format!("{}/limited", base))).unwrap();

    let request = CompletionRequest::for_log(&parsed());
    match client.complete(&request).await {
        Err(LlmError::Status { status, body }) => {
            assert_eq!(status.as_u16(), 429);
            assert_eq!(body, "slow down");
        }
        other => panic!("expected status error, got {:?}", other),
    }

    let result = analyze(client.as_ref(), &parsed()).await;
    assert!(result.root_cause.contains("429"));
    assert_eq!(result.suggested_fix, FALLBACK_FIX);
}

#[tokio::test]
async fn test_unexpected_shape_is_malformed() {
    let base = start_provider(Recorded::default()).await;
    let client = create_client(&llm_config(ApiStyle::Legacy, format!("{}/odd", base))).unwrap();

    let request = CompletionRequest::for_log(&parsed());
    let err = client.complete(&request).await.unwrap_err();
    assert!(matches!(err, LlmError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_unreachable_provider_degrades() {
    // Bind then drop to get a port with nothing listening.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = create_client(&llm_config(
        ApiStyle::Chat,
        format!("http://127.0.0.1:{}/v1", port),
    ))
    .unwrap();

    let result = analyze(client.as_ref(), &parsed()).await;
    assert!(result
        .root_cause
        .starts_with("Error analyzing log with AI: request failed"));
    assert_eq!(result.suggested_fix, FALLBACK_FIX);
}
