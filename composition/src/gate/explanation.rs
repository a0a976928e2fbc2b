//! Explanation structure: five numbered sections with enough depth,
//! practical material, lab-safety framing and topical overlap.

use regex::Regex;
use std::sync::LazyLock;

use super::{lower_words, mentions_any, GateContext, QualityIssue, RequiredSections};
use crate::kinds::EXPLANATION_SECTIONS;
use crate::text;

/// Minimum words for the first four sections; Key Takeaways has none.
const MIN_WORDS: &[usize] = &[50, 70, 60, 40];

const MIN_TOTAL_WORDS: usize = 350;

const SAFETY_VOCABULARY: &[&str] = &[
    "authorized", "authorised", "authorization", "permission", "consent", "ethical",
    "ethically", "legal", "legally", "lab", "labs", "sandbox", "isolated", "scope",
    "responsible", "responsibly",
];

const ACTION_VERBS: &[&str] = &[
    "always", "analyze", "apply", "audit", "avoid", "build", "capture", "check", "compare",
    "configure", "create", "disable", "document", "enable", "ensure", "inspect", "install",
    "limit", "log", "map", "measure", "monitor", "never", "patch", "prefer", "practice",
    "restrict", "review", "rotate", "run", "scan", "set", "start", "test", "try", "update",
    "use", "validate", "verify", "write",
];

static BULLET_LEAD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*+•]|\d{1,3}[.)])\s+(?:\*\*)?([A-Za-z']+)")
        .expect("BULLET_LEAD_RE regex should compile")
});

/// Explanation validator registered for [`crate::ContentKind::Explanation`].
pub fn validate(doc: &str, ctx: &GateContext) -> Vec<QualityIssue> {
    let required = RequiredSections::locate(doc, EXPLANATION_SECTIONS);
    let mut issues = required.order_issues("explanation_sections");

    let numbered = numbered_heading_count(doc);
    if numbered != EXPLANATION_SECTIONS.len() {
        issues.push(QualityIssue::new(
            "explanation_sections",
            format!(
                "Expected exactly {} numbered sections, found {}",
                EXPLANATION_SECTIONS.len(),
                numbered
            ),
        ));
    }

    for ((name, body), min) in EXPLANATION_SECTIONS
        .iter()
        .zip(&required.bodies)
        .zip(MIN_WORDS)
    {
        let Some(body) = body else { continue };
        let words = text::word_count(body);
        if words < *min {
            issues.push(QualityIssue::new(
                "explanation_depth",
                format!(
                    "Section '{}' is too thin: {} words (minimum {})",
                    name, words, min
                ),
            ));
        }
    }

    issues.extend(check_practical(doc, &required, ctx));

    let total = text::word_count(doc);
    if total < MIN_TOTAL_WORDS {
        issues.push(QualityIssue::new(
            "explanation_depth",
            format!(
                "Too few words overall: {} (minimum {})",
                total, MIN_TOTAL_WORDS
            ),
        ));
    }

    if !mentions_any(doc, SAFETY_VOCABULARY) {
        issues.push(QualityIssue::new(
            "explanation_safety",
            "Mention authorized use or lab safety (e.g. practice only in an isolated lab)",
        ));
    }

    if !ctx.topic_keywords.is_empty() {
        let words = lower_words(doc);
        let overlaps = ctx
            .topic_keywords
            .iter()
            .any(|k| words.iter().any(|w| w == k));
        if !overlaps {
            let sample: Vec<&str> = ctx.topic_keywords.iter().take(4).map(String::as_str).collect();
            issues.push(QualityIssue::new(
                "explanation_topic",
                format!(
                    "Answer does not reference the topic (expected terms like: {})",
                    sample.join(", ")
                ),
            ));
        }
    }

    issues
}

fn numbered_heading_count(doc: &str) -> usize {
    let lines: Vec<&str> = doc.lines().collect();
    let mask = text::fence_mask(&lines);
    lines
        .iter()
        .zip(mask)
        .filter(|(line, fenced)| !fenced && text::numbered_heading(line).is_some())
        .count()
}

fn check_practical(
    doc: &str,
    required: &RequiredSections<'_>,
    ctx: &GateContext,
) -> Option<QualityIssue> {
    if ctx.commands_relevant {
        let blocks = text::count_fenced_blocks(doc);
        return (blocks < 2).then(|| {
            QualityIssue::new(
                "explanation_practical",
                format!(
                    "Include at least 2 fenced code blocks with commands or snippets (found {})",
                    blocks
                ),
            )
        });
    }

    let actions: usize = ["Practical Examples", "Common Pitfalls"]
        .iter()
        .filter_map(|name| required.body(name))
        .map(action_bullets)
        .sum();
    (actions < 2).then(|| {
        QualityIssue::new(
            "explanation_practical",
            format!(
                "Add at least 2 action-oriented bullets to Practical Examples or Common Pitfalls (found {})",
                actions
            ),
        )
    })
}

fn action_bullets(body: &str) -> usize {
    body.lines()
        .filter_map(|l| BULLET_LEAD_RE.captures(l))
        .filter(|c| ACTION_VERBS.contains(&c[1].to_lowercase().as_str()))
        .count()
}
