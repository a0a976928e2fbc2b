//! Scribe agents: resilient long-form generation
//!
//! - [`provider`]: model fallback chain × credential rotation with retry,
//!   backoff, token-budget growth and a process-wide retired-model set
//! - [`orchestrator`]: draft → refine → recover loop driven by the quality gate
//! - [`config`]: TOML + environment configuration
//! - [`telemetry`]: tracing setup and JSONL generation traces
//! - [`transport`]: console deliverer for the CLI
//!
//! Deterministic checking and packing live in the `composition` crate.

pub mod config;
pub mod orchestrator;
pub mod provider;
pub mod telemetry;
pub mod transport;
