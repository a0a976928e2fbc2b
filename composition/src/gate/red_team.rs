//! Operational brief structure: ten sections in order, each with real
//! content, technique identifiers, and detection guidance for defenders.

use regex::Regex;
use std::sync::LazyLock;

use super::{mentions_any, GateContext, QualityIssue, RequiredSections};
use crate::kinds::RED_TEAM_SECTIONS;
use crate::text;

const MIN_SECTION_WORDS: usize = 12;

/// Technique identifier such as `T1059` or `T1003.001`.
static TECHNIQUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z]\d{4}(?:\.\d+)?\b").expect("TECHNIQUE_RE regex should compile")
});

const DETECTION_VOCABULARY: &[&str] = &[
    "alert", "alerts", "alerting", "audit", "detect", "detection", "detections", "edr",
    "event", "events", "hunt", "hunting", "indicator", "indicators", "ioc", "iocs", "log",
    "logging", "logs", "monitor", "monitoring", "siem", "sigma", "sysmon", "telemetry",
];

/// Brief validator registered for [`crate::ContentKind::RedTeam`].
pub fn validate(doc: &str, _ctx: &GateContext) -> Vec<QualityIssue> {
    let required = RequiredSections::locate(doc, RED_TEAM_SECTIONS);
    let mut issues = required.order_issues("red_team_sections");

    let thin: Vec<&str> = RED_TEAM_SECTIONS
        .iter()
        .zip(&required.bodies)
        .filter_map(|(name, body)| body.as_deref().map(|b| (*name, b)))
        .filter(|(_, body)| {
            text::count_bullets(body) == 0 && text::word_count(body) < MIN_SECTION_WORDS
        })
        .map(|(name, _)| name)
        .collect();
    if !thin.is_empty() {
        issues.push(QualityIssue::new(
            "red_team_depth",
            format!(
                "Sections need a bullet or at least {} words: {}",
                MIN_SECTION_WORDS,
                thin.join(", ")
            ),
        ));
    }

    if !TECHNIQUE_RE.is_match(doc) {
        issues.push(QualityIssue::new(
            "red_team_techniques",
            "Reference at least one technique identifier (e.g. T1059.001)",
        ));
    }

    if let Some(notes) = required.body("Defender Notes") {
        if !mentions_any(notes, DETECTION_VOCABULARY) {
            issues.push(QualityIssue::new(
                "red_team_detection",
                "Defender Notes must name detection or telemetry sources",
            ));
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brief(defender_notes: &str) -> String {
        RED_TEAM_SECTIONS
            .iter()
            .map(|name| {
                let body = if *name == "Defender Notes" {
                    defender_notes.to_string()
                } else {
                    format!("- {} work item mapped to T1059.001", name)
                };
                format!("## {}\n{}\n", name, body)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn complete_brief_passes() {
        let doc = brief("- Alert on Sysmon event 1 for encoded PowerShell");
        assert!(validate(&doc, &GateContext::default()).is_empty());
    }

    #[test]
    fn defender_notes_need_detection_terms() {
        let doc = brief("Be careful out there with everything you do in this phase okay.");
        let issues = validate(&doc, &GateContext::default());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].check, "red_team_detection");
    }

    #[test]
    fn technique_ids_are_required() {
        let doc = brief("- Watch the logs").replace("T1059.001", "the playbook");
        let issues = validate(&doc, &GateContext::default());
        assert_eq!(issues[0].check, "red_team_techniques");
    }

    #[test]
    fn thin_sections_are_listed() {
        let doc = brief("- Hunt with EDR").replace(
            "- Reconnaissance work item mapped to T1059.001",
            "Short.",
        );
        let issues = validate(&doc, &GateContext::default());
        assert!(issues[0].detail.ends_with("Reconnaissance"));
    }
}
