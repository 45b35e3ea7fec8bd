//! OpenAI-compatible chat completions provider.
//!
//! Most hosted and local model servers (OpenAI, DeepSeek, Groq, Grok,
//! Perplexity, Gemini's compatibility endpoint, Ollama) accept the same
//! `POST {base_url}/chat/completions` request, so one adapter covers them
//! all.  Only the base URL, model and API key differ.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::providers::truncate_chars;
use crate::traits::ProviderAdapter;

/// Maximum number of characters of an error body kept in [`ProviderError::Status`].
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Chat-completions provider over HTTP.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    model: String,
    api_key: Option<String>,
    api_key_required: bool,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a provider that sends requests without authentication.
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("HubCentral/0.1")
            .build()
            .unwrap_or_default();

        Self {
            name: name.into(),
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            api_key_required: false,
            client,
        }
    }

    /// Require a bearer token.  A `None` key makes every call fail with
    /// [`ProviderError::NotConfigured`].
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self.api_key_required = true;
        self
    }

    /// Require a bearer token read from the environment variable `var`.
    pub fn with_api_key_env(self, var: &str) -> Self {
        let key = std::env::var(var).ok();
        self.with_api_key(key)
    }

    /// The model requested on every call.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> ProviderResult<url::Url> {
        let raw = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        url::Url::parse(&raw)
            .map_err(|e| ProviderError::NotConfigured(format!("invalid base URL `{}`: {e}", self.base_url)))
    }
}

/// Build the chat-completions request body.
pub(crate) fn build_request_body(model: &str, prompt: &str, system_context: Option<&str>) -> Value {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system_context.filter(|s| !s.is_empty()) {
        messages.push(json!({ "role": "system", "content": system }));
    }
    messages.push(json!({ "role": "user", "content": prompt }));
    json!({ "model": model, "messages": messages })
}

/// Extract `choices[0].message.content` from a chat-completions response.
pub(crate) fn parse_chat_response(v: &Value) -> ProviderResult<String> {
    let message = &v["choices"][0]["message"];
    if message.is_null() {
        return Err(ProviderError::InvalidResponse(
            "missing `choices[0].message` in response".into(),
        ));
    }
    message["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ProviderError::InvalidResponse("message has no text content".into()))
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(
        &self,
        prompt: &str,
        system_context: Option<&str>,
        timeout: Duration,
    ) -> ProviderResult<String> {
        if self.api_key_required && self.api_key.is_none() {
            return Err(ProviderError::NotConfigured(format!(
                "no API key configured for provider `{}`",
                self.name
            )));
        }
        let url = self.endpoint()?;
        let body = build_request_body(&self.model, prompt, system_context);

        debug!(provider = %self.name, model = %self.model, url = %url, "sending chat completion");

        let mut request = self.client.post(url).json(&body).timeout(timeout);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                }
            } else {
                ProviderError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                code: status.as_u16(),
                body: truncate_chars(&text, MAX_ERROR_BODY_CHARS),
            });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        parse_chat_response(&value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
