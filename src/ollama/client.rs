//! Blocking client for the Ollama `/api/generate` and `/api/tags` endpoints.

use std::time::Duration;

use thiserror::Error;
use tracing::debug;

/// Errors that can occur when interacting with the Ollama API.
#[derive(Debug, Error)]
pub enum OllamaError {
    /// Network-related errors (connection failures, DNS resolution, etc.)
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// HTTP errors with status code
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// Ollama API-specific errors
    #[error("Ollama API error: {message}")]
    Api { message: String },

    /// Invalid URL configuration error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Address of a local Ollama server.
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Builder for `OllamaClient`.
///
/// Host and model come from `Settings`; the builder itself never reads the
/// environment.
///
/// # Examples
///
/// ```
/// use qafact::ollama::OllamaClientBuilder;
///
/// let client = OllamaClientBuilder::new()
///     .base_url("http://localhost:11434")
///     .build()
///     .expect("Failed to create client");
/// assert_eq!(client.model(), "");
/// ```
#[derive(Debug, Default)]
pub struct OllamaClientBuilder {
    base_url: Option<String>,
    model: Option<String>,
}

impl OllamaClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Server root, e.g. `http://localhost:11434`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Model to generate with; empty means "pick an installed one".
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Validates the base URL and builds the HTTP client.
    pub fn build(self) -> Result<OllamaClient, OllamaError> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string());
        let base_url = base_url.trim_end_matches('/').to_string();
        let model = self.model.unwrap_or_default();

        reqwest::Url::parse(&base_url)
            .map_err(|e| OllamaError::InvalidUrl(format!("{base_url}: {e}")))?;

        // Generation of a full answer on CPU can take well over a minute
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(OllamaError::Network)?;

        Ok(OllamaClient {
            client,
            base_url,
            model,
        })
    }
}

/// Blocking Ollama client, built with `OllamaClientBuilder`.
pub struct OllamaClient {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
}

/// Raw completion against an Ollama server; mocked in generator tests.
pub trait OllamaClientTrait {
    /// Continues `prompt` verbatim (raw mode, no chat template) with at most
    /// `max_tokens` new tokens. Returns only the continuation.
    fn complete(&self, model: &str, prompt: &str, max_tokens: usize) -> Result<String, OllamaError>;
}

impl OllamaClient {
    /// Returns the base URL configured for this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the model name configured for this client.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Lists available models from the Ollama API, sorted by size (largest first).
    pub fn list_models(&self) -> Result<Vec<String>, OllamaError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(OllamaError::Network)?;

        if !response.status().is_success() {
            return Err(OllamaError::Http {
                status: response.status().as_u16(),
            });
        }

        let json: serde_json::Value = response.json().map_err(OllamaError::Network)?;

        let mut models: Vec<(String, u64)> = json
            .get("models")
            .and_then(|m| m.as_array())
            .map(|models| {
                models
                    .iter()
                    .filter_map(|model| {
                        let name = model.get("name").and_then(|n| n.as_str())?;
                        let size = model.get("size").and_then(|s| s.as_u64()).unwrap_or(0);
                        Some((name.to_string(), size))
                    })
                    .collect()
            })
            .unwrap_or_default();

        models.sort_by(|a, b| b.1.cmp(&a.1));

        Ok(models.into_iter().map(|(name, _)| name).collect())
    }
}

impl OllamaClientTrait for OllamaClient {
    fn complete(&self, model: &str, prompt: &str, max_tokens: usize) -> Result<String, OllamaError> {
        let url = format!("{}/api/generate", self.base_url);
        let request_body = completion_request(model, prompt, max_tokens);
        debug!(model, max_tokens, "Requesting raw completion from Ollama");

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .map_err(OllamaError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(OllamaError::Http {
                status: status.as_u16(),
            });
        }

        let json: serde_json::Value = response.json().map_err(OllamaError::Network)?;
        parse_completion(&json)
    }
}

/// Builds the `/api/generate` body: raw mode so the prompt is continued as-is.
fn completion_request(model: &str, prompt: &str, max_tokens: usize) -> serde_json::Value {
    serde_json::json!({
        "model": model,
        "prompt": prompt,
        "raw": true,
        "stream": false,
        "options": {
            "num_predict": max_tokens
        }
    })
}

fn parse_completion(json: &serde_json::Value) -> Result<String, OllamaError> {
    if let Some(message) = json.get("error").and_then(|v| v.as_str()) {
        return Err(OllamaError::Api {
            message: message.to_string(),
        });
    }

    json.get("response")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| OllamaError::Api {
            message: "Missing 'response' field in API response".to_string(),
        })
}
