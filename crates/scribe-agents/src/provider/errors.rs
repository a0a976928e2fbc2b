//! Provider error taxonomy with retry classification.
//!
//! Every failure a model call can produce is represented here. The pool
//! asks `retry_category()` instead of string matching.
//!
//! ## Retry categories
//!
//! | Category        | Errors                                      | Pool reaction                         |
//! |-----------------|---------------------------------------------|---------------------------------------|
//! | Backoff         | RateLimited, Overloaded, Timeout, Empty     | sleep, retry same cell                |
//! | RetireModel     | ModelUnavailable                            | blacklist model, next model           |
//! | SkipModel       | Busy                                        | next model                            |
//! | SkipCredential  | Rejected, Configuration                     | next credential, same model           |
//!
//! Key, project, region and permission messages classify as `Rejected`
//! even on a 404, so one bad credential cannot retire a model.
//!
//! An `EmptyResponse` that survives every retry also moves on to the next
//! model: the request shape is treated as incompatible with that model.

use std::fmt;

use thiserror::Error;

/// What the pool does after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryCategory {
    /// Transient; back off and retry the same (model, credential) cell.
    Backoff,
    /// The model is gone for this process; never try it again.
    RetireModel,
    /// The model is saturated right now; other credentials will not help.
    SkipModel,
    /// This credential cannot serve the request; try the next one.
    SkipCredential,
}

impl fmt::Display for RetryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backoff => write!(f, "backoff"),
            Self::RetireModel => write!(f, "retire_model"),
            Self::SkipModel => write!(f, "skip_model"),
            Self::SkipCredential => write!(f, "skip_credential"),
        }
    }
}

/// A classified failure from one provider call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("provider overloaded: {0}")]
    Overloaded(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("model {model} unavailable: {message}")]
    ModelUnavailable { model: String, message: String },

    #[error("service busy: {0}")]
    Busy(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("provider misconfigured: {0}")]
    Configuration(String),
}

impl ProviderError {
    pub fn retry_category(&self) -> RetryCategory {
        match self {
            Self::RateLimited(_) | Self::Overloaded(_) | Self::Timeout(_) | Self::EmptyResponse => {
                RetryCategory::Backoff
            }
            Self::ModelUnavailable { .. } => RetryCategory::RetireModel,
            Self::Busy(_) => RetryCategory::SkipModel,
            Self::Rejected(_) | Self::Configuration(_) => RetryCategory::SkipCredential,
        }
    }

    /// Whether an exhausted pool should report "try again shortly" rather
    /// than a hard failure.
    pub fn is_rate_limit_class(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::Overloaded(_) | Self::Busy(_)
        )
    }

    /// Whether this error, once retries are spent, ends the current model.
    pub fn abandons_model(&self) -> bool {
        matches!(
            self,
            Self::ModelUnavailable { .. } | Self::Busy(_) | Self::EmptyResponse
        )
    }

    /// Classify a non-success HTTP response from its status and error message.
    pub fn classify_http(status: u16, message: &str, model: &str) -> Self {
        let lower = message.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if status == 429
            || has(&[
                "quota",
                "rate limit",
                "rate-limit",
                "ratelimit",
                "too many requests",
                "resource_exhausted",
            ])
        {
            return Self::RateLimited(message.to_string());
        }
        if status == 503 && has(&["high demand"]) {
            return Self::Busy(message.to_string());
        }
        if status == 503 || has(&["overloaded"]) {
            return Self::Overloaded(message.to_string());
        }
        // Key, project, region and permission failures belong to the
        // credential. They must never retire a model.
        if matches!(status, 401 | 403)
            || has(&[
                "api key",
                "api_key",
                "apikey",
                "project",
                "location",
                "permission",
                "billing",
                "suspended",
                "unauthenticated",
                "unauthorized",
                "forbidden",
            ])
        {
            return Self::Rejected(format!("HTTP {status}: {message}"));
        }
        let model_path = format!("models/{}", model.to_lowercase());
        if status == 404
            || lower.contains(&model_path)
            || has(&["is not found for api version", "model not found", "deprecated"])
        {
            return Self::ModelUnavailable {
                model: model.to_string(),
                message: message.to_string(),
            };
        }
        match status {
            408 | 504 => Self::Timeout(message.to_string()),
            500..=599 => Self::Overloaded(message.to_string()),
            _ => Self::Rejected(format!("HTTP {status}: {message}")),
        }
    }
}

/// Failure of a whole pool call, after every usable cell was tried.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("all providers are rate limited: {0}")]
    RateLimited(#[source] ProviderError),

    #[error("no provider could complete the request: {0}")]
    Unavailable(#[source] ProviderError),

    #[error("generation cancelled")]
    Cancelled,
}

impl PoolError {
    /// Wrap the last observed provider error.
    pub fn exhausted(last: ProviderError) -> Self {
        if last.is_rate_limit_class() {
            Self::RateLimited(last)
        } else {
            Self::Unavailable(last)
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}
