//! Provider pool: model fallback chain × credential rotation.
//!
//! A call walks models in fallback order, skipping any in the
//! [`UnavailableModelSet`], and for each model walks every credential. Each
//! (model, credential) cell gets its own retry loop:
//!
//! - truncated output below the budget cap grows the token budget and
//!   re-asks the same cell without spending a retry
//! - `Backoff` errors sleep `base · 2^attempt + jitter` and retry
//! - anything else ends the cell; the error decides whether the next
//!   credential or the next model is tried
//!
//! Every provider call and every sleep races the caller's
//! [`CancellationToken`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::errors::{PoolError, ProviderError, RetryCategory};
use super::unavailable::UnavailableModelSet;
use super::{ClientFactory, Credential, Generate, GenerationCall, ModelClient};

/// Budget cap bounds.
pub const BUDGET_CAP_FLOOR: u32 = 2200;
pub const BUDGET_CAP_CEILING: u32 = 3400;
const CAP_FACTOR: f64 = 1.45;

/// Budget growth per truncated attempt.
const GROWTH_FACTOR: f64 = 1.35;
const MIN_GROWTH: u32 = 120;

/// Largest budget the pool will grow to for a given starting hint.
pub fn budget_cap(hint: u32) -> u32 {
    let scaled = (f64::from(hint) * CAP_FACTOR).round() as u32;
    scaled.clamp(BUDGET_CAP_FLOOR, BUDGET_CAP_CEILING)
}

/// Next budget after a truncated attempt. Never exceeds `cap`.
pub fn grow_budget(budget: u32, cap: u32) -> u32 {
    let scaled = (f64::from(budget) * GROWTH_FACTOR).round() as u32;
    scaled.max(budget.saturating_add(MIN_GROWTH)).min(cap)
}

/// Retry policy for one (model, credential) cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    /// Upper bound of the uniform jitter added to each delay.
    pub jitter_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 800,
            jitter_ms: 400,
            max_delay_ms: 12_000,
        }
    }
}

impl RetryConfig {
    /// Backoff before retry number `attempt + 1`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay_ms
            .saturating_mul(1u64 << attempt.min(20));
        let jitter = if self.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.jitter_ms)
        } else {
            0
        };
        Duration::from_millis(exp.saturating_add(jitter).min(self.max_delay_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CellKey {
    credential: usize,
    model: String,
}

/// A lazily built client for one (model, credential) pair.
#[derive(Clone)]
struct ModelCredentialCell {
    model: String,
    credential: String,
    client: Arc<dyn ModelClient>,
}

enum CellFailure {
    Provider(ProviderError),
    Cancelled,
}

pub struct ProviderPool {
    factory: Arc<dyn ClientFactory>,
    credentials: Vec<Credential>,
    models: Vec<String>,
    retry: RetryConfig,
    unavailable: UnavailableModelSet,
    cells: Mutex<HashMap<CellKey, ModelCredentialCell>>,
    calls: AtomicUsize,
}

impl ProviderPool {
    pub fn new(
        factory: Arc<dyn ClientFactory>,
        credentials: Vec<Credential>,
        models: Vec<String>,
        retry: RetryConfig,
        unavailable: UnavailableModelSet,
    ) -> Self {
        Self {
            factory,
            credentials,
            models,
            retry,
            unavailable,
            cells: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable(&self) -> &UnavailableModelSet {
        &self.unavailable
    }

    /// Provider calls issued so far, budget regrowth and retries included.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn cell(&self, credential: usize, model: &str) -> Result<ModelCredentialCell, ProviderError> {
        let key = CellKey {
            credential,
            model: model.to_string(),
        };
        let mut cells = self.cells.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(cell) = cells.get(&key) {
            return Ok(cell.clone());
        }
        let cred = &self.credentials[credential];
        let cell = ModelCredentialCell {
            model: model.to_string(),
            credential: cred.label.clone(),
            client: self.factory.build(cred, model)?,
        };
        cells.insert(key, cell.clone());
        Ok(cell)
    }

    /// Generate non-empty text for `prompt`, walking the whole fallback chain.
    pub async fn call(
        &self,
        prompt: &str,
        budget_hint: u32,
        cancel: &CancellationToken,
    ) -> Result<String, PoolError> {
        let cap = budget_cap(budget_hint);
        let mut last_error: Option<ProviderError> = None;

        for model in &self.models {
            if self.unavailable.contains(model) {
                debug!(model = %model, "Skipping unavailable model");
                continue;
            }

            for idx in 0..self.credentials.len() {
                let cell = match self.cell(idx, model) {
                    Ok(cell) => cell,
                    Err(e) => {
                        warn!(model = %model, error = %e, "Failed to build client");
                        last_error = Some(e);
                        continue;
                    }
                };

                let err = match self.run_cell(&cell, prompt, budget_hint, cap, cancel).await {
                    Ok(text) => return Ok(text),
                    Err(CellFailure::Cancelled) => return Err(PoolError::Cancelled),
                    Err(CellFailure::Provider(err)) => err,
                };

                let category = err.retry_category();
                warn!(
                    model = %cell.model,
                    credential = %cell.credential,
                    category = %category,
                    error = %err,
                    "Provider cell exhausted"
                );
                if category == RetryCategory::RetireModel && self.unavailable.insert(model) {
                    info!(model = %model, "Model marked unavailable for this process");
                }
                let next_model = err.abandons_model();
                last_error = Some(err);
                if next_model {
                    break;
                }
            }
        }

        Err(PoolError::exhausted(last_error.unwrap_or_else(|| {
            ProviderError::Configuration("no usable model or credential".to_string())
        })))
    }

    async fn run_cell(
        &self,
        cell: &ModelCredentialCell,
        prompt: &str,
        budget_hint: u32,
        cap: u32,
        cancel: &CancellationToken,
    ) -> Result<String, CellFailure> {
        let mut budget = budget_hint;
        let mut attempt: u32 = 0;

        loop {
            let call = GenerationCall {
                prompt: prompt.to_string(),
                max_output_tokens: budget,
            };
            self.calls.fetch_add(1, Ordering::Relaxed);
            debug!(
                model = %cell.model,
                credential = %cell.credential,
                attempt,
                budget,
                "Provider call"
            );

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CellFailure::Cancelled),
                r = cell.client.generate(&call) => r,
            };

            let err = match result {
                Ok(out) if out.truncated() && budget < cap => {
                    let next = grow_budget(budget, cap);
                    info!(
                        model = %cell.model,
                        from = budget,
                        to = next,
                        "Output truncated; growing token budget"
                    );
                    budget = next;
                    continue;
                }
                Ok(out) if !out.text.trim().is_empty() => return Ok(out.text),
                Ok(_) => ProviderError::EmptyResponse,
                Err(e) => e,
            };

            if err.retry_category() != RetryCategory::Backoff || attempt >= self.retry.max_retries {
                return Err(CellFailure::Provider(err));
            }

            let delay = self.retry.delay_for(attempt);
            warn!(
                model = %cell.model,
                credential = %cell.credential,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retriable provider error; backing off"
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(CellFailure::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}

#[async_trait]
impl Generate for ProviderPool {
    async fn generate(
        &self,
        prompt: &str,
        budget_hint: u32,
        cancel: &CancellationToken,
    ) -> Result<String, PoolError> {
        self.call(prompt, budget_hint, cancel).await
    }
}
