//! Gemini `generateContent` client over reqwest.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::errors::ProviderError;
use super::{ClientFactory, Credential, FinishReason, GenerationCall, GenerationOutput, ModelClient};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<PartOut<'a>>,
}

#[derive(Serialize)]
struct PartOut<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartIn>,
}

#[derive(Deserialize)]
struct PartIn {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Pull the human-readable message out of an error body, falling back to
/// the raw body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) if !env.error.status.is_empty() => {
            format!("{} ({})", env.error.message, env.error.status)
        }
        Ok(env) => env.error.message,
        Err(_) => body.trim().to_string(),
    }
}

fn parse_response(body: &str) -> Result<GenerationOutput, ProviderError> {
    let resp: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Rejected(format!("malformed response: {e}")))?;

    let Some(candidate) = resp.candidates.into_iter().next() else {
        if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ProviderError::Rejected(format!("prompt blocked: {reason}")));
        }
        return Err(ProviderError::EmptyResponse);
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    let finish_reason = candidate
        .finish_reason
        .as_deref()
        .map(FinishReason::from_wire)
        .unwrap_or(FinishReason::Other);

    Ok(GenerationOutput {
        text,
        finish_reason,
    })
}

fn classify_transport(err: &reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(err.to_string())
    } else if err.is_connect() || err.is_request() {
        ProviderError::Overloaded(err.to_string())
    } else {
        ProviderError::Rejected(err.to_string())
    }
}

// ── Client ──────────────────────────────────────────────────────────

pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(&self, call: &GenerationCall) -> Result<GenerationOutput, ProviderError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![PartOut { text: &call.prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: call.max_output_tokens,
                temperature: self.temperature,
            },
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| classify_transport(&e))?;
        debug!(model = %self.model, status = status.as_u16(), bytes = text.len(), "Gemini response");

        if !status.is_success() {
            return Err(ProviderError::classify_http(
                status.as_u16(),
                &error_message(&text),
                &self.model,
            ));
        }
        parse_response(&text)
    }
}

/// Builds [`GeminiClient`]s that share one connection pool.
pub struct GeminiFactory {
    http: reqwest::Client,
    base_url: String,
    temperature: f32,
}

impl GeminiFactory {
    pub fn new(
        base_url: impl Into<String>,
        temperature: f32,
        call_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(call_timeout)
            .build()
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            temperature,
        })
    }
}

impl ClientFactory for GeminiFactory {
    fn build(
        &self,
        credential: &Credential,
        model: &str,
    ) -> Result<Arc<dyn ModelClient>, ProviderError> {
        if credential.api_key.trim().is_empty() {
            return Err(ProviderError::Configuration(format!(
                "credential {} has an empty API key",
                credential.label
            )));
        }
        Ok(Arc::new(GeminiClient {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            model: model.to_string(),
            api_key: credential.api_key.clone(),
            temperature: self.temperature,
        }))
    }
}
