//! Model access: client seam, credentials, and the fallback pool.

pub mod errors;
pub mod gemini;
pub mod pool;
pub mod unavailable;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub use errors::{PoolError, ProviderError, RetryCategory};
pub use pool::{budget_cap, grow_budget, ProviderPool, RetryConfig};
pub use unavailable::UnavailableModelSet;

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    /// Cut off by the output token ceiling.
    MaxTokens,
    Safety,
    Other,
}

impl FinishReason {
    pub fn from_wire(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "STOP" => Self::Stop,
            "MAX_TOKENS" => Self::MaxTokens,
            "SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST" => Self::Safety,
            _ => Self::Other,
        }
    }
}

/// One outbound model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationCall {
    pub prompt: String,
    pub max_output_tokens: u32,
}

/// What a successful call returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutput {
    pub text: String,
    pub finish_reason: FinishReason,
}

impl GenerationOutput {
    pub fn truncated(&self) -> bool {
        self.finish_reason == FinishReason::MaxTokens
    }
}

/// An API key with a label that is safe to log.
#[derive(Clone)]
pub struct Credential {
    pub label: String,
    pub api_key: String,
}

impl Credential {
    pub fn new(label: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            api_key: api_key.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("label", &self.label)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// A client bound to one (credential, model) pair.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, call: &GenerationCall) -> Result<GenerationOutput, ProviderError>;
}

/// Builds clients on first use of a (credential, model) cell.
pub trait ClientFactory: Send + Sync {
    fn build(
        &self,
        credential: &Credential,
        model: &str,
    ) -> Result<Arc<dyn ModelClient>, ProviderError>;
}

/// Text generation as the orchestrator sees it.
#[async_trait]
pub trait Generate: Send + Sync {
    /// Produce non-empty text for `prompt`, starting from `budget_hint`
    /// output tokens.
    async fn generate(
        &self,
        prompt: &str,
        budget_hint: u32,
        cancel: &CancellationToken,
    ) -> Result<String, PoolError>;
}
