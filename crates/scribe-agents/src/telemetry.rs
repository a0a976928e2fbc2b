//! Logging setup and per-request generation traces.

use std::path::Path;
use std::time::Instant;

use composition::prompts::PROMPT_VERSION;
use composition::ContentKind;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::orchestrator::{Acceptance, PassRecord, RefinementOutcome, Stage};

/// Install the global subscriber. `RUST_LOG` wins over the `info` default.
pub fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// One generated answer, as written to the trace file.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationTrace {
    pub run_id: String,
    pub kind: ContentKind,
    pub prompt_version: &'static str,
    pub passes: Vec<PassRecord>,
    pub chosen_stage: Stage,
    pub acceptance: Acceptance,
    pub final_issues: usize,
    /// Upstream HTTP calls, retries and budget regrowth included.
    pub provider_calls: usize,
    pub chunks: usize,
    pub elapsed_ms: u64,
    pub timestamp: String,
}

/// Collects timing for one request until its trace is finalized.
pub struct TraceCollector {
    run_id: Uuid,
    kind: ContentKind,
    started: Instant,
}

impl TraceCollector {
    pub fn new(kind: ContentKind) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            kind,
            started: Instant::now(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn finalize(
        self,
        outcome: &RefinementOutcome,
        provider_calls: usize,
        chunks: usize,
    ) -> GenerationTrace {
        GenerationTrace {
            run_id: self.run_id.to_string(),
            kind: self.kind,
            prompt_version: PROMPT_VERSION,
            passes: outcome.passes.clone(),
            chosen_stage: outcome.stage,
            acceptance: outcome.acceptance,
            final_issues: outcome.report.issue_count(),
            provider_calls,
            chunks,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Append `trace` to `path` as one JSON line. Failures are logged, not raised.
pub fn append_trace(trace: &GenerationTrace, path: &Path) {
    match serde_json::to_string(trace) {
        Ok(json) => {
            use std::io::Write;
            match std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
            {
                Ok(mut file) => {
                    if let Err(e) = writeln!(file, "{json}") {
                        warn!("Failed to append generation trace: {e}");
                    } else {
                        info!(path = %path.display(), run_id = %trace.run_id, "Appended generation trace");
                    }
                }
                Err(e) => warn!("Failed to open trace file: {e}"),
            }
        }
        Err(e) => warn!("Failed to serialize generation trace: {e}"),
    }
}
