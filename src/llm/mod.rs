//! Language-model client abstraction and implementations.
//!
//! Defines the [`CompletionClient`] trait and two concrete clients, one per
//! generation of the OpenAI-compatible wire protocol:
//! - **[`ChatClient`]**: `POST {base_url}/chat/completions` with a `messages`
//!   array; the answer is read from `choices[0].message.content`.
//! - **[`LegacyClient`]**: `POST {base_url}/completions` with a single
//!   `prompt`; the answer is read from `choices[0].text`.
//!
//! # Client Selection
//!
//! [`create_client`] resolves the configured [`ApiStyle`] once at startup.
//! The returned `Arc<dyn CompletionClient>` is shared read-only by every
//! request; nothing is re-detected per call.
//!
//! ```rust
//! # use ci_triage::config::LlmConfig;
//! # use ci_triage::llm::create_client;
//! let client = create_client(&LlmConfig::default()).unwrap();
//! assert_eq!(client.name(), "chat");
//! ```
//!
//! # Failure Policy
//!
//! [`analyze`] never fails. Any [`LlmError`] (missing key, network error,
//! non-2xx status, unexpected body) is logged and turned into an
//! [`AnalysisResult`] whose `root_cause` names the failure. No retries are
//! attempted.

mod response;

pub use response::{parse_analysis, NO_FIX_SUGGESTED, NO_ROOT_CAUSE};

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ApiStyle, LlmConfig};
use crate::models::{AnalysisResult, ParsedLog};

/// System message sent ahead of every prompt.
pub const SYSTEM_PROMPT: &str =
    "You are an expert CI/CD troubleshooter that responds in JSON format.";

/// Remediation text returned when the provider could not be reached.
pub const FALLBACK_FIX: &str = "Check that the API key environment variable named by \
llm.api_key_env (OPENAI_API_KEY by default) is set correctly and try again. If the problem \
persists, make sure llm.api matches your provider: \"chat\" for /chat/completions or \
\"legacy\" for /completions.";

/// Errors raised by a [`CompletionClient`].
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("{var} environment variable not set")]
    MissingApiKey { var: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// A prompt ready to send: one system message and one user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
}

impl CompletionRequest {
    /// Build the triage prompt for one parsed log.
    pub fn for_log(parsed: &ParsedLog) -> Self {
        let user = format!(
            "You are a senior DevOps engineer who diagnoses CI/CD pipeline failures.\n\
             Read the log excerpt from a failed CI/CD job below, work out why it failed, \
             and propose a concrete fix or the next diagnostic step.\n\
             \n\
             **CI/CD Platform:** {platform}\n\
             **Failed Step:** {step}\n\
             \n\
             **Relevant Log Output:**\n\
             ```\n\
             {context}\n\
             ```\n\
             \n\
             Please:\n\
             1. State the specific error message or failure condition you see.\n\
             2. Explain the most likely root cause.\n\
             3. Suggest a code change, configuration change, command, or diagnostic step \
             that resolves it or narrows it down.\n\
             \n\
             Answer with a JSON object containing exactly these keys:\n\
             - root_cause: a concise explanation of the root cause\n\
             - suggested_fix: a specific, actionable fix",
            platform = parsed.platform,
            step = parsed.failed_step,
            context = parsed.error_context,
        );
        Self {
            system: SYSTEM_PROMPT.to_string(),
            user,
        }
    }
}

/// A text-generation backend.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Short identifier of the wire shape (`"chat"` or `"legacy"`).
    fn name(&self) -> &str;

    /// Send `request` and return the raw completion text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

/// Connection settings shared by both client shapes.
struct Endpoint {
    http: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    api_key: Option<String>,
    api_key_env: String,
}

impl Endpoint {
    fn new(config: &LlmConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            api_key: config.api_key(),
            api_key_env: config.api_key_env.clone(),
        })
    }

    /// POST `body` to `{base_url}/{path}` and return the decoded JSON.
    async fn post(&self, path: &str, body: &Value) -> Result<Value, LlmError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| LlmError::MissingApiKey {
            var: self.api_key_env.clone(),
        })?;

        let response = self
            .http
            .post(format!("{}/{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status,
                body: detail,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))
    }
}

// ============ Chat Client ============

/// Client for the `/chat/completions` API shape.
pub struct ChatClient {
    endpoint: Endpoint,
}

impl ChatClient {
    pub fn new(config: &LlmConfig) -> anyhow::Result<Self> {
        Ok(Self {
            endpoint: Endpoint::new(config)?,
        })
    }
}

#[async_trait]
impl CompletionClient for ChatClient {
    fn name(&self) -> &str {
        "chat"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "model": self.endpoint.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "temperature": self.endpoint.temperature,
            "max_tokens": self.endpoint.max_tokens,
        });

        let json = self.endpoint.post("chat/completions", &body).await?;
        text_at(&json, "/choices/0/message/content")
    }
}

// ============ Legacy Client ============

/// Client for the older `/completions` API shape, which takes one flat prompt.
pub struct LegacyClient {
    endpoint: Endpoint,
}

impl LegacyClient {
    pub fn new(config: &LlmConfig) -> anyhow::Result<Self> {
        Ok(Self {
            endpoint: Endpoint::new(config)?,
        })
    }
}

#[async_trait]
impl CompletionClient for LegacyClient {
    fn name(&self) -> &str {
        "legacy"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "model": self.endpoint.model,
            "prompt": format!("{}\n\n{}", request.system, request.user),
            "temperature": self.endpoint.temperature,
            "max_tokens": self.endpoint.max_tokens,
        });

        let json = self.endpoint.post("completions", &body).await?;
        text_at(&json, "/choices/0/text")
    }
}

fn text_at(json: &Value, pointer: &str) -> Result<String, LlmError> {
    json.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| LlmError::MalformedResponse(format!("missing {}", pointer)))
}

/// Create the [`CompletionClient`] for the configured API style.
///
/// | `llm.api` | Client |
/// |-----------|--------|
/// | `"chat"` | [`ChatClient`] |
/// | `"legacy"` | [`LegacyClient`] |
///
/// A missing API key is not an error here; it surfaces per request as
/// [`LlmError::MissingApiKey`] and degrades that request's analysis.
pub fn create_client(config: &LlmConfig) -> anyhow::Result<Arc<dyn CompletionClient>> {
    if config.api_key().is_none() {
        tracing::warn!(
            var = %config.api_key_env,
            "API key not set; analyses will return fallback text"
        );
    }
    let client: Arc<dyn CompletionClient> = match config.api {
        ApiStyle::Chat => Arc::new(ChatClient::new(config)?),
        ApiStyle::Legacy => Arc::new(LegacyClient::new(config)?),
    };
    tracing::info!(api = client.name(), model = %config.model, "completion client ready");
    Ok(client)
}

/// Ask the model for a root cause and fix. Never fails.
pub async fn analyze(client: &dyn CompletionClient, parsed: &ParsedLog) -> AnalysisResult {
    let request = CompletionRequest::for_log(parsed);
    match client.complete(&request).await {
        Ok(text) => parse_analysis(&text),
        Err(e) => {
            tracing::error!(api = client.name(), error = %e, "completion request failed");
            AnalysisResult {
                root_cause: format!("Error analyzing log with AI: {}", e),
                suggested_fix: FALLBACK_FIX.to_string(),
            }
        }
    }
}
