//! LLM backend abstraction and implementations.
//!
//! Defines an enum-based dispatch for LLM backends, avoiding the
//! dyn-compatibility issues with async trait methods. Concrete
//! implementations exist for OpenAI-compatible APIs (including Ollama),
//! the Anthropic Messages API, and a deterministic stub for tests. HTTP
//! backends communicate via `reqwest`.
//!
//! The router does not care which model is behind the API -- it sends a
//! prompt with generation options and expects a text response.

use std::collections::BTreeMap;

use crate::config::TierConfig;
use crate::error::LlmError;

/// A system/user prompt pair ready to send to a backend.
#[derive(Debug, Clone)]
pub struct Prompt {
    /// System message establishing the character's reality and the
    /// required output format.
    pub system: String,
    /// User message containing identity, state, location, and memory.
    pub user: String,
}

/// Sampling and bounding options for one generation.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    /// Sampling temperature.
    pub temperature: f64,
    /// Nucleus sampling cutoff, when the backend supports it.
    pub top_p: Option<f64>,
    /// Hard output token bound.
    pub max_tokens: u32,
    /// Generation halts when any of these strings would be produced.
    pub stop: Vec<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: None,
            max_tokens: 512,
            stop: Vec::new(),
        }
    }
}

/// An LLM backend that can complete a prompt.
///
/// Uses enum dispatch instead of trait objects because async methods
/// are not dyn-compatible in Rust.
pub enum LlmBackend {
    /// OpenAI-compatible chat completions API (OpenAI, Ollama, etc.).
    OpenAi(OpenAiBackend),
    /// Anthropic Messages API.
    Anthropic(AnthropicBackend),
    /// Deterministic fixture-table backend for tests.
    Stub(StubBackend),
}

impl LlmBackend {
    /// Send a prompt to the backend and return the response text.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Backend`] if the HTTP call fails or the
    /// response cannot be extracted.
    pub async fn complete(
        &self,
        prompt: &Prompt,
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        match self {
            Self::OpenAi(backend) => backend.complete(prompt, options).await,
            Self::Anthropic(backend) => backend.complete(prompt, options).await,
            Self::Stub(backend) => Ok(backend.complete(prompt, options)),
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
            Self::Stub(_) => "stub",
        }
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible backend
// ---------------------------------------------------------------------------

/// Backend for OpenAI-compatible chat completions APIs.
///
/// Sends requests to `{api_url}/chat/completions`.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    /// Create a new OpenAI-compatible backend.
    pub fn new(config: &TierConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    async fn complete(
        &self,
        prompt: &Prompt,
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.api_url);

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user}
            ],
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
        });
        if let Some(top_p) = options.top_p {
            body["top_p"] = serde_json::json!(top_p);
        }
        if !options.stop.is_empty() {
            body["stop"] = serde_json::json!(options.stop);
        }

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Backend(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(LlmError::Backend(format!(
                "openai-compatible API returned {status}: {error_body}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Backend(format!("response parse failed: {e}")))?;

        extract_openai_content(&json)
    }
}

/// Extract the text content from an OpenAI chat completions response.
fn extract_openai_content(json: &serde_json::Value) -> Result<String, LlmError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            LlmError::Backend("response missing choices[0].message.content".to_owned())
        })
}

// ---------------------------------------------------------------------------
// Anthropic Messages API backend
// ---------------------------------------------------------------------------

/// Backend for the Anthropic Messages API.
///
/// Anthropic differs from OpenAI: `x-api-key` header, system as a
/// top-level field, `stop_sequences` instead of `stop`, and the response
/// text at `content[0].text`.
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl AnthropicBackend {
    /// Create a new Anthropic Messages API backend.
    pub fn new(config: &TierConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    async fn complete(
        &self,
        prompt: &Prompt,
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        let url = format!("{}/messages", self.api_url);

        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": options.max_tokens,
            "temperature": options.temperature,
            "system": prompt.system,
            "messages": [
                {"role": "user", "content": prompt.user}
            ]
        });
        if let Some(top_p) = options.top_p {
            body["top_p"] = serde_json::json!(top_p);
        }
        if !options.stop.is_empty() {
            body["stop_sequences"] = serde_json::json!(options.stop);
        }

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Backend(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(LlmError::Backend(format!(
                "anthropic API returned {status}: {error_body}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Backend(format!("response parse failed: {e}")))?;

        extract_anthropic_content(&json)
    }
}

/// Extract the text content from an Anthropic Messages API response.
fn extract_anthropic_content(json: &serde_json::Value) -> Result<String, LlmError> {
    json.get("content")
        .and_then(|c| c.get(0))
        .and_then(|b| b.get("text"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| LlmError::Backend("response missing content[0].text".to_owned()))
}

// ---------------------------------------------------------------------------
// Deterministic stub backend
// ---------------------------------------------------------------------------

/// A deterministic backend for tests and offline runs.
///
/// Responses come from a fixture table: the first fixture whose key
/// appears as a substring of the user prompt wins; otherwise the default
/// response is returned. Stop strings are honoured the way real APIs do
/// it -- output is cut just before the first stop occurrence.
#[derive(Debug, Clone)]
pub struct StubBackend {
    fixtures: BTreeMap<String, String>,
    default_response: String,
}

impl Default for StubBackend {
    fn default() -> Self {
        Self {
            fixtures: BTreeMap::new(),
            default_response: r#"{"action": "wait"}"#.to_owned(),
        }
    }
}

impl StubBackend {
    /// Create a stub that always waits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fixture: when `key` appears in the user prompt, reply
    /// with `response`.
    #[must_use]
    pub fn with_fixture(mut self, key: impl Into<String>, response: impl Into<String>) -> Self {
        self.fixtures.insert(key.into(), response.into());
        self
    }

    /// Override the fallback response.
    #[must_use]
    pub fn with_default(mut self, response: impl Into<String>) -> Self {
        self.default_response = response.into();
        self
    }

    fn complete(&self, prompt: &Prompt, options: &GenerationOptions) -> String {
        let raw = self
            .fixtures
            .iter()
            .find(|(key, _)| prompt.user.contains(key.as_str()))
            .map_or(self.default_response.as_str(), |(_, response)| response);
        apply_stop_strings(raw, &options.stop)
    }
}

/// Truncate `text` just before the earliest occurrence of any stop string.
fn apply_stop_strings(text: &str, stop: &[String]) -> String {
    let cut = stop
        .iter()
        .filter_map(|s| text.find(s.as_str()))
        .min()
        .unwrap_or(text.len());
    text.get(..cut).unwrap_or(text).to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_openai_content_valid() {
        let json = serde_json::json!({
            "choices": [{
                "message": {"content": "{\"action\": \"wait\"}"}
            }]
        });
        let result = extract_openai_content(&json);
        assert!(result.is_ok());
        assert!(result.unwrap_or_default().contains("wait"));
    }

    #[test]
    fn extract_openai_content_missing_choices() {
        let json = serde_json::json!({"error": "rate_limit"});
        assert!(extract_openai_content(&json).is_err());
    }

    #[test]
    fn extract_anthropic_content_valid() {
        let json = serde_json::json!({
            "content": [{"type": "text", "text": "{\"action\": \"sleep\"}"}]
        });
        let result = extract_anthropic_content(&json);
        assert!(result.is_ok());
        assert!(result.unwrap_or_default().contains("sleep"));
    }

    #[test]
    fn extract_anthropic_content_missing() {
        let json = serde_json::json!({"content": []});
        assert!(extract_anthropic_content(&json).is_err());
    }

    #[test]
    fn stub_matches_fixture_by_prompt_substring() {
        let stub = StubBackend::new()
            .with_fixture("Mara", r#"{"action": "speak", "text": "hello"}"#);
        let prompt = Prompt {
            system: String::new(),
            user: "Your name is Mara.".to_owned(),
        };
        let response = stub.complete(&prompt, &GenerationOptions::default());
        assert!(response.contains("speak"));
    }

    #[test]
    fn stub_falls_back_to_default() {
        let stub = StubBackend::new();
        let prompt = Prompt {
            system: String::new(),
            user: "anyone".to_owned(),
        };
        let response = stub.complete(&prompt, &GenerationOptions::default());
        assert_eq!(response, r#"{"action": "wait"}"#);
    }

    #[test]
    fn stub_honours_stop_strings() {
        let stub = StubBackend::new()
            .with_fixture("Mara", r#"{"action": "speak", "text": "Hello"}"#);
        let prompt = Prompt {
            system: String::new(),
            user: "Mara".to_owned(),
        };
        let options = GenerationOptions {
            stop: vec!["}".to_owned()],
            ..GenerationOptions::default()
        };
        let response = stub.complete(&prompt, &options);
        assert_eq!(response, r#"{"action": "speak", "text": "Hello""#);
    }

    #[test]
    fn earliest_stop_string_wins() {
        let out = apply_stop_strings("abc\n\ndef}", &["}".to_owned(), "\n\n".to_owned()]);
        assert_eq!(out, "abc");
    }
}
