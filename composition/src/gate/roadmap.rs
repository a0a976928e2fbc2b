//! Roadmap week coverage.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use super::{GateContext, QualityIssue};
use crate::text;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)duration\s*(?:\*\*)?\s*[:\-–]?\s*(?:\*\*)?\s*(\d{1,2})\s*weeks?")
        .expect("DURATION_RE regex should compile")
});

/// `### Week 3: ...`, `**Week 4 - ...**`, `Week 5-6: ...`.
static WEEK_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:#{1,6}\s*)?(?:\*\*)?\s*week\s*(\d{1,2})(?:\s*[-–]\s*(\d{1,2}))?\b")
        .expect("WEEK_HEADING_RE regex should compile")
});

/// Label form: `Week 3: ...`, `**Week 1:** ...`, `**Week 2** - ...`, or a bare `Week 7`.
static WEEK_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:\*\*)?\s*week\s*\d{1,2}(?:\s*[-–]\s*\d{1,2})?\s*(?:\*\*)?\s*(?:[:\-–]|$)")
        .expect("WEEK_LABEL_RE regex should compile")
});

/// Week headings spanning more than this are treated as a single week.
const MAX_RANGE: u32 = 12;

/// Roadmap validator registered for [`crate::ContentKind::Roadmap`].
pub fn validate(doc: &str, ctx: &GateContext) -> Vec<QualityIssue> {
    let lines: Vec<&str> = doc.lines().collect();
    let mask = text::fence_mask(&lines);

    let declared = DURATION_RE
        .captures(doc)
        .and_then(|c| c[1].parse::<u32>().ok());
    let weeks: BTreeSet<u32> = lines
        .iter()
        .zip(&mask)
        .filter(|(_, fenced)| !**fenced)
        .filter(|(line, _)| is_week_heading(line))
        .filter_map(|(line, _)| week_span(line))
        .flat_map(|(from, to)| from..=to)
        .collect();
    let target = ctx.expected_weeks.or(declared);

    let mut issues = Vec::new();
    let Some(&max_week) = weeks.last() else {
        issues.push(QualityIssue::new(
            "roadmap_weeks",
            "No 'Week N:' headings found",
        ));
        return issues;
    };

    if let Some(target) = target {
        let covered = (1..=target).filter(|w| weeks.contains(w)).count() as u32;
        if covered < target {
            let missing: Vec<String> = (1..=target)
                .filter(|w| !weeks.contains(w))
                .map(|w| w.to_string())
                .collect();
            issues.push(QualityIssue::new(
                "roadmap_weeks",
                format!(
                    "Week coverage incomplete: {} of {} weeks present (missing weeks {})",
                    covered,
                    target,
                    missing.join(", ")
                ),
            ));
        }
        if max_week < target {
            issues.push(QualityIssue::new(
                "roadmap_weeks",
                format!(
                    "Roadmap stops at Week {} but must reach Week {}",
                    max_week, target
                ),
            ));
        }
    }

    if text::last_content_line(doc).is_some_and(is_week_heading) {
        issues.push(QualityIssue::new(
            "roadmap_truncated",
            "Document ends on a bare week heading with no content (likely truncated)",
        ));
    }

    if let Some(declared) = declared {
        if declared != max_week {
            issues.push(QualityIssue::new(
                "roadmap_duration",
                format!(
                    "Declared duration is {} weeks but week headings run to Week {}",
                    declared, max_week
                ),
            ));
        }
    }

    issues
}

/// Prose that merely starts with "Week N" is not a heading.
fn is_week_heading(line: &str) -> bool {
    week_span(line).is_some() && (text::is_heading(line) || WEEK_LABEL_RE.is_match(line))
}

fn week_span(line: &str) -> Option<(u32, u32)> {
    let caps = WEEK_HEADING_RE.captures(line)?;
    let from: u32 = caps[1].parse().ok()?;
    let to = caps
        .get(2)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|&to| to > from && to - from <= MAX_RANGE)
        .unwrap_or(from);
    Some((from, to))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roadmap(declared: u32, weeks: &[u32]) -> String {
        let mut doc = format!("# Cloud Roadmap\n**Duration:** {declared} Weeks\n\n");
        for w in weeks {
            doc.push_str(&format!("### Week {w}: Topic {w}\n- Read\n- Practice\n\n"));
        }
        doc
    }

    #[test]
    fn complete_roadmap_passes() {
        assert!(validate(&roadmap(4, &[1, 2, 3, 4]), &GateContext::default()).is_empty());
    }

    #[test]
    fn ranges_expand() {
        assert_eq!(week_span("**Week 5-6: Labs**"), Some((5, 6)));
        assert_eq!(week_span("## Week 7"), Some((7, 7)));
        assert_eq!(week_span("- week 1 recap"), None);
    }

    #[test]
    fn declared_duration_is_the_default_target() {
        let issues = validate(&roadmap(6, &[1, 2, 3, 4]), &GateContext::default());
        assert!(issues[0].detail.contains("coverage incomplete"));
        assert!(issues.iter().any(|i| i.check == "roadmap_duration"));
    }

    #[test]
    fn bare_trailing_week_heading_is_truncation() {
        let mut doc = roadmap(3, &[1, 2]);
        doc.push_str("### Week 3: Capstone\n");
        let issues = validate(&doc, &GateContext::default());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].check, "roadmap_truncated");
    }

    #[test]
    fn closing_prose_about_a_week_is_not_truncation() {
        let mut doc = roadmap(4, &[1, 2, 3, 4]);
        doc.push_str("Week 4 wraps up with a capstone, so schedule extra time for it.\n");
        assert!(validate(&doc, &GateContext::default()).is_empty());
    }

    #[test]
    fn week_heading_forms() {
        assert!(is_week_heading("### Week 3: Capstone"));
        assert!(is_week_heading("**Week 5-6: Labs**"));
        assert!(is_week_heading("Week 2: Identity"));
        assert!(is_week_heading("Week 7"));
        assert!(is_week_heading("**Week 1:** Foundations"));
        assert!(!is_week_heading("Week 9 is optional if you finish early."));
    }
}
