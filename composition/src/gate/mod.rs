//! Quality Gate: contract checks for generated drafts
//!
//! [`evaluate`] runs the universal checks (length → headings → bullets) and
//! then the kind's own validator from the registry. Every check is a named
//! predicate that contributes zero or more [`QualityIssue`]s; the report
//! keeps them in insertion order.
//!
//! The gate is a pure function: no IO, no clock, no randomness.

pub mod context;
pub mod explanation;
pub mod quiz;
pub mod red_team;
pub mod roadmap;
pub mod study_plan;

use std::fmt;

use serde::Serialize;

use crate::kinds::{lookup, ContentKind, ContentTypeProfile};
use crate::text::{self, Section};

pub use context::GateContext;

/// Check name used for the maximum-length contract.
pub const LENGTH_MAX: &str = "length_max";

/// One violated contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityIssue {
    /// Stable check identifier (`length_min`, `quiz_answer_key`, ...).
    pub check: &'static str,
    /// Human-readable description, phrased as a correction target.
    pub detail: String,
}

impl QualityIssue {
    pub fn new(check: &'static str, detail: impl Into<String>) -> Self {
        Self {
            check,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.detail)
    }
}

/// Fully evaluated verdict for one draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityReport {
    pub pass: bool,
    pub issues: Vec<QualityIssue>,
    /// Character count of the trimmed draft.
    pub chars: usize,
}

impl QualityReport {
    fn from_issues(issues: Vec<QualityIssue>, chars: usize) -> Self {
        Self {
            pass: issues.is_empty(),
            issues,
            chars,
        }
    }

    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }

    /// True when the single violated contract is the maximum length.
    pub fn only_length_overflow(&self) -> bool {
        matches!(self.issues.as_slice(), [issue] if issue.check == LENGTH_MAX)
    }

    /// Issue descriptions, in order.
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(|i| i.detail.clone()).collect()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pass {
            return write!(f, "PASS ({} chars)", self.chars);
        }
        writeln!(f, "FAIL ({} chars, {} issues)", self.chars, self.issues.len())?;
        for issue in &self.issues {
            writeln!(f, "  - [{}] {}", issue.check, issue.detail)?;
        }
        Ok(())
    }
}

/// Evaluate `doc` against the profile and validator registered for `kind`.
pub fn evaluate(kind: ContentKind, doc: &str, ctx: &GateContext) -> QualityReport {
    let spec = lookup(kind);
    let chars = text::char_len(doc.trim());
    let profile = &spec.profile;

    let mut issues = Vec::new();
    issues.extend(check_min_length(chars, profile));
    issues.extend(check_max_length(chars, profile));
    issues.extend(check_headings(doc, profile));
    issues.extend(check_bullets(doc, profile));
    issues.extend((spec.validator)(doc, ctx));

    QualityReport::from_issues(issues, chars)
}

// ── Universal checks ──────────────────────────────────────────────────────

fn check_min_length(chars: usize, profile: &ContentTypeProfile) -> Option<QualityIssue> {
    (chars < profile.min_chars).then(|| {
        QualityIssue::new(
            "length_min",
            format!("Too short: {} chars (minimum {})", chars, profile.min_chars),
        )
    })
}

fn check_max_length(chars: usize, profile: &ContentTypeProfile) -> Option<QualityIssue> {
    let max = profile.max_chars?;
    (chars > max).then(|| {
        QualityIssue::new(
            LENGTH_MAX,
            format!("Too long: {} chars (maximum {})", chars, max),
        )
    })
}

fn check_headings(doc: &str, profile: &ContentTypeProfile) -> Option<QualityIssue> {
    let found = text::count_headings(doc);
    (found < profile.min_headings).then(|| {
        QualityIssue::new(
            "headings",
            format!(
                "Too few headings: {} (minimum {})",
                found, profile.min_headings
            ),
        )
    })
}

fn check_bullets(doc: &str, profile: &ContentTypeProfile) -> Option<QualityIssue> {
    let found = text::count_bullets(doc);
    (found < profile.min_bullets).then(|| {
        QualityIssue::new(
            "bullets",
            format!(
                "Too few bullet points: {} (minimum {})",
                found, profile.min_bullets
            ),
        )
    })
}

// ── Shared section helpers ────────────────────────────────────────────────

/// Required sections located in a document, with their full bodies.
pub(crate) struct RequiredSections<'a> {
    pub names: &'a [&'static str],
    pub positions: Vec<Option<usize>>,
    /// Body of each required section, spanning any sub-headings up to the
    /// next required section.
    pub bodies: Vec<Option<String>>,
}

impl<'a> RequiredSections<'a> {
    pub fn locate(doc: &str, names: &'a [&'static str]) -> Self {
        let sections = text::split_sections(doc);
        let positions = text::locate_sections(&sections, names);
        let bodies = required_bodies(doc, &sections, &positions);
        Self {
            names,
            positions,
            bodies,
        }
    }

    pub fn body(&self, name: &str) -> Option<&str> {
        let idx = self.names.iter().position(|n| *n == name)?;
        self.bodies[idx].as_deref()
    }

    /// Missing sections and the first ordering violation.
    pub fn order_issues(&self, check: &'static str) -> Vec<QualityIssue> {
        let mut issues = Vec::new();
        let missing: Vec<&str> = self
            .names
            .iter()
            .zip(&self.positions)
            .filter(|(_, pos)| pos.is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            issues.push(QualityIssue::new(
                check,
                format!("Missing required sections: {}", missing.join(", ")),
            ));
        }

        let mut previous: Option<(&str, usize)> = None;
        for (name, pos) in self.names.iter().zip(&self.positions) {
            let Some(pos) = *pos else { continue };
            if let Some((prev_name, prev_pos)) = previous {
                if pos < prev_pos {
                    issues.push(QualityIssue::new(
                        check,
                        format!(
                            "Sections out of order: '{}' must come after '{}'",
                            name, prev_name
                        ),
                    ));
                    break;
                }
            }
            previous = Some((*name, pos));
        }
        issues
    }
}

fn required_bodies(
    doc: &str,
    sections: &[Section],
    positions: &[Option<usize>],
) -> Vec<Option<String>> {
    let lines: Vec<&str> = doc.lines().collect();
    let mut located: Vec<usize> = positions.iter().flatten().copied().collect();
    located.sort_unstable();
    located.dedup();

    positions
        .iter()
        .map(|pos| {
            let start = (*pos)?;
            let end_line = located
                .iter()
                .find(|&&p| p > start)
                .map(|&p| sections[p].line)
                .unwrap_or(lines.len());
            let from = sections[start].line + 1;
            Some(lines[from.min(end_line)..end_line].join("\n").trim().to_string())
        })
        .collect()
}

/// Lowercased alphanumeric words of `text`.
pub(crate) fn lower_words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Whether any of `vocabulary` appears as a whole word in `text`.
pub(crate) fn mentions_any(text: &str, vocabulary: &[&str]) -> bool {
    lower_words(text)
        .iter()
        .any(|w| vocabulary.contains(&w.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_generic_draft_reports_length() {
        let report = evaluate(ContentKind::Generic, "tiny", &GateContext::default());
        assert!(!report.pass);
        assert_eq!(report.issues[0].check, "length_min");
        assert!(report.issues[0].detail.contains("Too short"));
    }

    #[test]
    fn overflow_only_is_detected() {
        let doc = "word ".repeat(800);
        let report = evaluate(ContentKind::Generic, &doc, &GateContext::default());
        assert!(report.only_length_overflow());
        assert_eq!(report.issue_count(), 1);
    }

    #[test]
    fn universal_checks_keep_insertion_order() {
        let report = evaluate(ContentKind::Roadmap, "no structure", &GateContext::default());
        let checks: Vec<&str> = report.issues.iter().map(|i| i.check).collect();
        assert_eq!(&checks[..3], &["length_min", "headings", "bullets"]);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let doc = "# Heading\n- a\n- b\nSome text.";
        let ctx = GateContext::default();
        assert_eq!(
            evaluate(ContentKind::Explanation, doc, &ctx),
            evaluate(ContentKind::Explanation, doc, &ctx)
        );
    }

    #[test]
    fn required_sections_span_subheadings() {
        const NAMES: &[&str] = &["Alpha", "Beta"];
        let doc = "# Alpha\none\n### Detail\ntwo\n# Beta\nthree";
        let located = RequiredSections::locate(doc, NAMES);
        assert_eq!(located.body("Alpha"), Some("one\n### Detail\ntwo"));
        assert_eq!(located.body("Beta"), Some("three"));
        assert!(located.order_issues("order").is_empty());
    }

    #[test]
    fn order_issues_report_missing_and_swapped() {
        const NAMES: &[&str] = &["Alpha", "Beta", "Gamma"];
        let doc = "# Beta\nx\n# Alpha\ny";
        let issues = RequiredSections::locate(doc, NAMES).order_issues("order");
        assert_eq!(issues.len(), 2);
        assert!(issues[0].detail.contains("Gamma"));
        assert!(issues[1].detail.contains("out of order"));
    }
}
