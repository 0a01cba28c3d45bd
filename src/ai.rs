//! Client for the generative text API.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::AssistantError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Turns a prompt into text. `None` means the call failed; the reason has
/// already been logged.
#[allow(async_fn_in_trait)]
pub trait TextGenerator {
    async fn generate(&self, prompt: &str) -> Option<String>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Error body returned by the API
#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Gemini `generateContent` client.
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: String,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(base_url: &str, model: &str, api_key: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            http,
        })
    }

    /// Build a client from the effective config; fails without an API key.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or(AssistantError::MissingApiKey)?;
        Self::new(&config.api_base, &config.model, api_key)
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    async fn request(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "requesting generation");
        let resp = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .context("Failed to reach the generative API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let message = resp
                .json::<ErrorBody>()
                .await
                .map_or_else(|_| format!("HTTP {status}"), |b| b.error.message);
            anyhow::bail!("API error ({status}): {message}");
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .context("Failed to parse generation response")?;
        extract_text(parsed).ok_or_else(|| AssistantError::GenerationFailed.into())
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Option<String> {
        match self.request(prompt).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "generation failed");
                None
            }
        }
    }
}

/// Join the text parts of the first candidate.
fn extract_text(response: GenerateResponse) -> Option<String> {
    let content = response.candidates.into_iter().next()?.content?;
    let text: String = content
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect::<Vec<_>>()
        .join("");
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let client = GeminiClient::new("http://localhost:3030/v1beta/", "gemini-test", "k").unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:3030/v1beta/models/gemini-test:generateContent"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: "hello" }],
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"feat: add "},{"text":"login"}]}},
                {"content":{"parts":[{"text":"ignored"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(response).as_deref(), Some("feat: add login"));
    }

    #[test]
    fn test_extract_text_empty_response() {
        let response: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(extract_text(response).is_none());

        let response: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert!(extract_text(response).is_none());

        let response: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(extract_text(response).is_none());
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = Config::default();
        let err = GeminiClient::from_config(&config).err().expect("should fail");
        assert!(matches!(
            err.downcast_ref::<AssistantError>(),
            Some(AssistantError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_yields_none() {
        let client = GeminiClient::new("http://127.0.0.1:9", "gemini-test", "k").unwrap();
        assert!(client.generate("prompt").await.is_none());
    }
}
