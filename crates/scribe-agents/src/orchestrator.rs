//! Refinement orchestrator: draft, check, refine, recover, pick the best.
//!
//! Implements the generation loop as a typed FSM:
//!
//! ```text
//! FirstDraft ──pass / length tolerance──▶ Done
//!     │
//!     ▼
//!   Refine ──pass──▶ Done
//!     │
//!     ├──recovery enabled──▶ Recover ──pass / improved──▶ Done
//!     │                         │
//!     ▼                         ▼
//! FallbackBest ◀────────────────┘
//! ```
//!
//! Imperfect drafts are data, never errors: the orchestrator always returns
//! the best text it has once a first draft exists. Only a failed first draft
//! or a cancellation is raised.

use std::fmt;
use std::sync::Arc;

use composition::prompts::{initial_prompt, refinement_prompt};
use composition::{evaluate, GateContext, GenerationRequest, KindSpec, QualityIssue, QualityReport};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::provider::{Generate, PoolError};

/// Which pass produced a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    FirstDraft,
    Refined,
    Recovered,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstDraft => write!(f, "first_draft"),
            Self::Refined => write!(f, "refined"),
            Self::Recovered => write!(f, "recovered"),
        }
    }
}

/// Why the returned draft was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Acceptance {
    /// Passed every check.
    Passed,
    /// Only over the length limit, within the kind's tolerance.
    LengthTolerance,
    /// Recovery draft had fewer issues than the refined one.
    Improved,
    /// Nothing passed; fewest issues, longest on ties.
    FewestIssues,
}

#[derive(Debug, Clone)]
pub struct Draft {
    pub stage: Stage,
    pub text: String,
    pub report: QualityReport,
    /// Output-token hint the pass started from.
    pub budget_hint: u32,
}

impl Draft {
    /// Fewer issues wins; equal counts prefer the longer text.
    fn beats(&self, other: &Draft) -> bool {
        let (a, b) = (self.report.issue_count(), other.report.issue_count());
        a < b || (a == b && self.report.chars > other.report.chars)
    }
}

/// Summary of one evaluated pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassRecord {
    pub stage: Stage,
    pub pass: bool,
    pub issues: usize,
    pub chars: usize,
}

#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    pub text: String,
    pub stage: Stage,
    pub acceptance: Acceptance,
    pub report: QualityReport,
    pub passes: Vec<PassRecord>,
    /// Calls made into the generator (one per pass).
    pub generation_calls: usize,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation rate limited: {0}")]
    RateLimited(#[source] PoolError),

    #[error("generation failed: {0}")]
    Failed(#[source] PoolError),

    #[error("generation cancelled")]
    Cancelled,
}

impl GenerationError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }

    /// Short notice suitable for the end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::RateLimited(_) => {
                "The writing service is busy right now. Please try again in a minute."
            }
            Self::Failed(_) => "Sorry, no answer could be generated for that request.",
            Self::Cancelled => "The request took too long and was cancelled.",
        }
    }
}

impl From<PoolError> for GenerationError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Cancelled => Self::Cancelled,
            e @ PoolError::RateLimited(_) => Self::RateLimited(e),
            e @ PoolError::Unavailable(_) => Self::Failed(e),
        }
    }
}

// ── State machine ───────────────────────────────────────────────────

enum State {
    FirstDraft,
    Refine { first: Draft },
    Recover { first: Draft, refined: Draft },
    FallbackBest { first: Draft, rest: Vec<Draft> },
    Done { draft: Draft, acceptance: Acceptance },
}

/// Per-request working set shared by the step functions.
struct Run<'a> {
    spec: &'static KindSpec,
    request: &'a GenerationRequest,
    ctx: GateContext,
    cancel: &'a CancellationToken,
    passes: Vec<PassRecord>,
    calls: usize,
}

pub struct RefinementOrchestrator {
    generator: Arc<dyn Generate>,
}

impl RefinementOrchestrator {
    pub fn new(generator: Arc<dyn Generate>) -> Self {
        Self { generator }
    }

    /// Produce the best document this request can get.
    pub async fn produce(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<RefinementOutcome, GenerationError> {
        let mut run = Run {
            spec: request.kind.spec(),
            request,
            ctx: GateContext::from_request(request),
            cancel,
            passes: Vec::new(),
            calls: 0,
        };
        let mut state = State::FirstDraft;

        loop {
            state = match state {
                State::FirstDraft => self.step_first_draft(&mut run).await?,
                State::Refine { first } => self.step_refine(&mut run, first).await?,
                State::Recover { first, refined } => {
                    self.step_recover(&mut run, first, refined).await?
                }
                State::FallbackBest { first, rest } => step_fallback(first, rest),
                State::Done { draft, acceptance } => {
                    info!(
                        kind = %request.kind,
                        stage = %draft.stage,
                        acceptance = ?acceptance,
                        issues = draft.report.issue_count(),
                        chars = draft.report.chars,
                        "Generation complete"
                    );
                    return Ok(RefinementOutcome {
                        text: draft.text,
                        stage: draft.stage,
                        acceptance,
                        report: draft.report,
                        passes: run.passes,
                        generation_calls: run.calls,
                    });
                }
            };
        }
    }

    async fn draft(
        &self,
        run: &mut Run<'_>,
        stage: Stage,
        prompt: &str,
        hint: u32,
    ) -> Result<Draft, PoolError> {
        run.calls += 1;
        debug!(kind = %run.request.kind, stage = %stage, hint, "Requesting draft");
        let text = self.generator.generate(prompt, hint, run.cancel).await?;
        let report = evaluate(run.request.kind, &text, &run.ctx);
        info!(
            kind = %run.request.kind,
            stage = %stage,
            pass = report.pass,
            issues = report.issue_count(),
            chars = report.chars,
            "Draft evaluated"
        );
        run.passes.push(PassRecord {
            stage,
            pass: report.pass,
            issues: report.issue_count(),
            chars: report.chars,
        });
        Ok(Draft {
            stage,
            text,
            report,
            budget_hint: hint,
        })
    }

    async fn step_first_draft(&self, run: &mut Run<'_>) -> Result<State, GenerationError> {
        let prompt = initial_prompt(run.spec, &run.request.topic, &run.ctx);
        let hint = run.spec.hints.first;
        let first = self.draft(run, Stage::FirstDraft, &prompt, hint).await?;

        if first.report.pass {
            return Ok(State::Done {
                draft: first,
                acceptance: Acceptance::Passed,
            });
        }
        if within_length_tolerance(run.spec, &first.report) {
            debug!(chars = first.report.chars, "Accepting slightly long first draft");
            return Ok(State::Done {
                draft: first,
                acceptance: Acceptance::LengthTolerance,
            });
        }
        Ok(State::Refine { first })
    }

    async fn step_refine(&self, run: &mut Run<'_>, first: Draft) -> Result<State, GenerationError> {
        let prompt = refinement_prompt(
            run.spec,
            &run.request.topic,
            &run.ctx,
            &first.text,
            &first.report.issues,
        );
        let hint = run.spec.hints.refine;
        let refined = match self.draft(run, Stage::Refined, &prompt, hint).await {
            Ok(d) => d,
            Err(PoolError::Cancelled) => return Err(GenerationError::Cancelled),
            Err(e) => {
                warn!(error = %e, "Refinement call failed; keeping first draft");
                return Ok(State::FallbackBest {
                    first,
                    rest: Vec::new(),
                });
            }
        };

        if refined.report.pass {
            return Ok(State::Done {
                draft: refined,
                acceptance: Acceptance::Passed,
            });
        }
        if run.spec.recovery_pass {
            return Ok(State::Recover { first, refined });
        }
        Ok(State::FallbackBest {
            first,
            rest: vec![refined],
        })
    }

    async fn step_recover(
        &self,
        run: &mut Run<'_>,
        first: Draft,
        refined: Draft,
    ) -> Result<State, GenerationError> {
        let issues = merge_issues(&first.report.issues, &refined.report.issues);
        let base = if first.beats(&refined) { &first } else { &refined };
        let prompt = refinement_prompt(run.spec, &run.request.topic, &run.ctx, &base.text, &issues);

        let hint = run.spec.hints.recovery;
        let recovered = match self.draft(run, Stage::Recovered, &prompt, hint).await {
            Ok(d) => d,
            Err(PoolError::Cancelled) => return Err(GenerationError::Cancelled),
            Err(e) => {
                warn!(error = %e, "Recovery call failed; keeping best draft so far");
                return Ok(State::FallbackBest {
                    first,
                    rest: vec![refined],
                });
            }
        };

        if recovered.report.pass {
            return Ok(State::Done {
                draft: recovered,
                acceptance: Acceptance::Passed,
            });
        }
        if recovered.beats(&refined) {
            return Ok(State::Done {
                draft: recovered,
                acceptance: Acceptance::Improved,
            });
        }
        Ok(State::FallbackBest {
            first,
            rest: vec![refined, recovered],
        })
    }
}

fn step_fallback(first: Draft, rest: Vec<Draft>) -> State {
    let best = rest
        .into_iter()
        .fold(first, |best, d| if d.beats(&best) { d } else { best });
    State::Done {
        draft: best,
        acceptance: Acceptance::FewestIssues,
    }
}

/// True when the only issue is overshooting `max_chars` by no more than the
/// kind's tolerance.
fn within_length_tolerance(spec: &KindSpec, report: &QualityReport) -> bool {
    let (Some(tolerance), Some(max)) = (spec.length_tolerance, spec.profile.max_chars) else {
        return false;
    };
    report.only_length_overflow() && report.chars as f64 <= max as f64 * (1.0 + tolerance)
}

/// Union of two issue lists, first occurrence wins.
fn merge_issues(a: &[QualityIssue], b: &[QualityIssue]) -> Vec<QualityIssue> {
    let mut out: Vec<QualityIssue> = Vec::with_capacity(a.len() + b.len());
    for issue in a.iter().chain(b) {
        if !out.iter().any(|o| o.detail == issue.detail) {
            out.push(issue.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use composition::{ContentKind, QualityIssue};

    fn draft(stage: Stage, issues: usize, chars: usize) -> Draft {
        Draft {
            stage,
            text: "x".repeat(chars),
            report: QualityReport {
                pass: issues == 0,
                issues: (0..issues)
                    .map(|i| QualityIssue::new("check", format!("issue {i}")))
                    .collect(),
                chars,
            },
            budget_hint: 1200,
        }
    }

    #[test]
    fn fallback_prefers_fewest_issues_then_length() {
        let State::Done { draft, acceptance } = step_fallback(
            draft(Stage::FirstDraft, 2, 900),
            vec![draft(Stage::Refined, 1, 500), draft(Stage::Recovered, 1, 700)],
        ) else {
            panic!("fallback must finish");
        };
        assert_eq!(draft.stage, Stage::Recovered);
        assert_eq!(acceptance, Acceptance::FewestIssues);
    }

    #[test]
    fn merged_issues_are_deduplicated_in_order() {
        let a = vec![QualityIssue::new("a", "one"), QualityIssue::new("b", "two")];
        let b = vec![QualityIssue::new("b", "two"), QualityIssue::new("c", "three")];
        let merged: Vec<String> = merge_issues(&a, &b).into_iter().map(|i| i.detail).collect();
        assert_eq!(merged, vec!["one", "two", "three"]);
    }

    #[test]
    fn length_tolerance_applies_only_to_pure_overflow() {
        let spec = ContentKind::Explanation.spec();
        let over = QualityReport {
            pass: false,
            issues: vec![QualityIssue::new(composition::gate::LENGTH_MAX, "Too long")],
            chars: 4400,
        };
        assert!(within_length_tolerance(spec, &over));

        let far = QualityReport { chars: 5000, ..over.clone() };
        assert!(!within_length_tolerance(spec, &far));

        let mixed = QualityReport {
            issues: vec![
                QualityIssue::new(composition::gate::LENGTH_MAX, "Too long"),
                QualityIssue::new("headings", "Too few headings"),
            ],
            ..over.clone()
        };
        assert!(!within_length_tolerance(spec, &mixed));

        assert!(!within_length_tolerance(ContentKind::Quiz.spec(), &over));
    }

    #[test]
    fn pool_errors_map_to_generation_errors() {
        use crate::provider::ProviderError;
        let rl: GenerationError =
            PoolError::exhausted(ProviderError::RateLimited("slow".into())).into();
        assert!(rl.is_rate_limited());
        let failed: GenerationError =
            PoolError::exhausted(ProviderError::Rejected("bad".into())).into();
        assert!(matches!(failed, GenerationError::Failed(_)));
        let cancelled: GenerationError = PoolError::Cancelled.into();
        assert!(matches!(cancelled, GenerationError::Cancelled));
    }
}
