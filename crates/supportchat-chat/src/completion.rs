//! Completion client for the external LLM provider.
//!
//! `CompletionProvider` is the seam between the pipeline and the model
//! service. `GeminiProvider` talks to the Gemini REST API; `MockCompletion`
//! stands in for it in tests and offline runs. `CompletionClient` applies the
//! soft-failure policy: a provider error becomes apology text, never an `Err`.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use supportchat_core::config::LlmConfig;

use crate::error::ChatError;
use crate::prompt::{AssembledPrompt, ProviderRole};

/// Header carrying the API key, which keeps it out of request URLs.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Text returned to the user when the provider call fails.
pub fn fallback_text(message: &str) -> String {
    format!(
        "I'm sorry, I encountered an error processing your request with Gemini. Error: {}",
        message
    )
}

/// A stateless text-completion backend.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Run one request: history, then `final_prompt` as the new user turn.
    async fn generate(&self, prompt: &AssembledPrompt) -> Result<String, ChatError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// Wraps a provider with the never-fail policy.
#[derive(Clone)]
pub struct CompletionClient {
    provider: Arc<dyn CompletionProvider>,
}

impl CompletionClient {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Generate a reply. Failures are logged and returned as fallback text.
    pub async fn complete(&self, prompt: &AssembledPrompt) -> String {
        match self.provider.generate(prompt).await {
            Ok(text) => text,
            Err(err) => {
                let message = match &err {
                    ChatError::Provider(msg) => msg.clone(),
                    other => other.to_string(),
                };
                error!(
                    provider = self.provider.name(),
                    error = %message,
                    "Completion failed, returning fallback reply"
                );
                fallback_text(&message)
            }
        }
    }
}

impl fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionClient")
            .field("provider", &self.provider.name())
            .finish()
    }
}

// ============================================================================
// Gemini wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl GeminiContent {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![GeminiPart {
                text: Some(text.to_string()),
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

/// A model entry from the provider's catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

// ============================================================================
// Gemini provider
// ============================================================================

/// Google Gemini over its REST API.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl GeminiProvider {
    /// Build a provider from config. The HTTP client enforces `timeout_secs`.
    pub fn new(config: &LlmConfig) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChatError::Provider(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn ensure_key(&self) -> Result<(), ChatError> {
        if self.api_key.trim().is_empty() {
            return Err(ChatError::Provider(
                "GEMINI_API_KEY is not configured".to_string(),
            ));
        }
        Ok(())
    }

    fn build_request(prompt: &AssembledPrompt) -> GeminiRequest {
        let mut contents: Vec<GeminiContent> = prompt
            .history
            .iter()
            .map(|turn| GeminiContent::text(Some(turn.role.as_str()), &turn.content))
            .collect();
        contents.push(GeminiContent::text(
            Some(ProviderRole::User.as_str()),
            &prompt.final_prompt,
        ));

        GeminiRequest {
            contents,
            system_instruction: prompt
                .system_instruction
                .as_deref()
                .map(|text| GeminiContent::text(None, text)),
        }
    }

    fn extract_text(response: GeminiResponse) -> Result<String, ChatError> {
        if let Some(err) = response.error {
            return Err(ChatError::Provider(err.message));
        }

        let text: String = response
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ChatError::Provider(
                "No content in Gemini response".to_string(),
            ));
        }
        Ok(text)
    }

    /// Pull the provider's own message out of an error body when present.
    fn map_api_error(status: reqwest::StatusCode, body: &str) -> ChatError {
        let message = serde_json::from_str::<GeminiResponse>(body)
            .ok()
            .and_then(|r| r.error)
            .map_or_else(|| body.trim().to_string(), |e| e.message);
        ChatError::Provider(format!("Gemini API returned {}: {}", status, message))
    }

    /// List the models available to this API key.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, ChatError> {
        self.ensure_key()?;
        let url = format!("{}/models", self.base_url);

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| ChatError::Provider(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ChatError::Provider(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(Self::map_api_error(status, &body));
        }

        let list: ModelList = serde_json::from_str(&body)
            .map_err(|e| ChatError::Provider(format!("Failed to parse model list: {}", e)))?;
        Ok(list.models)
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    #[instrument(skip(self, prompt), fields(model = %self.model, history = prompt.history.len()))]
    async fn generate(&self, prompt: &AssembledPrompt) -> Result<String, ChatError> {
        self.ensure_key()?;
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = Self::build_request(prompt);

        debug!("Sending generateContent request");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::Provider(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ChatError::Provider(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(Self::map_api_error(status, &body));
        }

        let parsed: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| ChatError::Provider(format!("Failed to parse Gemini response: {}", e)))?;
        Self::extract_text(parsed)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

impl fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

// ============================================================================
// Mock provider
// ============================================================================

#[derive(Debug, Clone)]
enum MockBehavior {
    Reply(String),
    Fail(String),
}

/// In-process provider with a fixed outcome. Records every prompt it sees.
#[derive(Debug)]
pub struct MockCompletion {
    behavior: MockBehavior,
    delay: Option<Duration>,
    calls: Mutex<Vec<AssembledPrompt>>,
}

impl MockCompletion {
    /// Always answer with `text`.
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            behavior: MockBehavior::Reply(text.into()),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always fail with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            behavior: MockBehavior::Fail(message.into()),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Prompts received so far, oldest first.
    pub fn calls(&self) -> Vec<AssembledPrompt> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletion {
    async fn generate(&self, prompt: &AssembledPrompt) -> Result<String, ChatError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(prompt.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.behavior {
            MockBehavior::Reply(text) => Ok(text.clone()),
            MockBehavior::Fail(message) => Err(ChatError::Provider(message.clone())),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
