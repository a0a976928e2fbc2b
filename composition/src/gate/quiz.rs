//! Quiz structure: numbered questions, four labeled options each, and an
//! answer key whose entries line up one-to-one with the questions.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use super::{GateContext, QualityIssue};
use crate::text;

static ANSWER_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:#{1,6}\s*)?(?:\*\*)?\s*(?:\d{1,2}[.)]\s*)?answer\s*key\b")
        .expect("ANSWER_KEY_RE regex should compile")
});

/// `1. What ...`, `**2)** Which ...`, `### Q3: ...`, `Question 4 - ...`.
static QUESTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:#{1,6}\s*)?(?:\*\*)?\s*(?:q(?:uestion)?\s*(\d{1,2})\b|(\d{1,2})[.)](?:\*\*)?\s)",
    )
    .expect("QUESTION_RE regex should compile")
});

/// `A) ...`, `- B. ...`, `**C)** ...`, `(D) ...`.
static OPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*]\s+)?(?:\*\*)?\(?([A-Da-d])[.):\]](?:\*\*)?\s+\S")
        .expect("OPTION_RE regex should compile")
});

/// `1. B`, `Q2: C`, `**3.** A`, `- 4) Answer: D`.
static KEY_ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:[-*]\s+)?(?:\*\*)?\s*(?i:q(?:uestion)?\s*)?(\d{1,2})\s*[.):\-]?\s*(?:\*\*)?\s*[:\-–]?\s*(?i:answer\s*[:\-]?\s*)?(?:\*\*)?\(?([A-D])(?:[.):\s*]|$)",
    )
    .expect("KEY_ENTRY_RE regex should compile")
});

/// Quiz validator registered for [`crate::ContentKind::Quiz`].
pub fn validate(doc: &str, ctx: &GateContext) -> Vec<QualityIssue> {
    let lines: Vec<&str> = doc.lines().collect();
    let mask = text::fence_mask(&lines);
    let visible: Vec<&str> = lines
        .iter()
        .zip(&mask)
        .filter(|(_, fenced)| !**fenced)
        .map(|(line, _)| *line)
        .collect();

    let key_at = visible.iter().position(|l| ANSWER_KEY_RE.is_match(l));
    let (body, key) = match key_at {
        Some(idx) => (&visible[..idx], Some(&visible[idx + 1..])),
        None => (&visible[..], None),
    };

    let questions = question_blocks(body);
    let mut issues = Vec::new();

    if key.is_none() {
        issues.push(QualityIssue::new(
            "quiz_answer_key",
            "Missing a clearly delimited 'Answer Key' section",
        ));
    }
    if questions.is_empty() {
        issues.push(QualityIssue::new(
            "quiz_questions",
            "No numbered questions found",
        ));
    }

    let incomplete: Vec<String> = questions
        .iter()
        .enumerate()
        .filter(|(_, q)| q.labels.len() < 4)
        .map(|(i, _)| (i + 1).to_string())
        .collect();
    if !incomplete.is_empty() {
        issues.push(QualityIssue::new(
            "quiz_options",
            format!(
                "Questions missing four labeled options (A-D): {}",
                incomplete.join(", ")
            ),
        ));
    }

    let option_sets = body
        .iter()
        .filter(|l| {
            OPTION_RE
                .captures(l)
                .is_some_and(|c| c[1].eq_ignore_ascii_case("a"))
        })
        .count();
    if option_sets < questions.len() {
        issues.push(QualityIssue::new(
            "quiz_options",
            format!(
                "Found {} option sets for {} questions",
                option_sets,
                questions.len()
            ),
        ));
    }

    let key_entries = key.map(|lines| {
        lines
            .iter()
            .filter(|l| KEY_ENTRY_RE.is_match(l))
            .count()
    });
    if let Some(entries) = key_entries {
        if entries != questions.len() {
            issues.push(QualityIssue::new(
                "quiz_answer_key",
                format!(
                    "Answer key has {} entries but the quiz has {} questions",
                    entries,
                    questions.len()
                ),
            ));
        }
    }

    if let Some(expected) = ctx.expected_questions {
        let expected = expected as usize;
        if questions.len() != expected {
            issues.push(QualityIssue::new(
                "quiz_expected_count",
                format!("Expected {} questions, found {}", expected, questions.len()),
            ));
        }
        if let Some(entries) = key_entries {
            if entries != expected {
                issues.push(QualityIssue::new(
                    "quiz_expected_count",
                    format!(
                        "Expected {} answer key entries, found {}",
                        expected, entries
                    ),
                ));
            }
        }
    }

    issues
}

struct QuestionBlock {
    labels: BTreeSet<char>,
}

fn question_blocks(body: &[&str]) -> Vec<QuestionBlock> {
    let mut blocks: Vec<QuestionBlock> = Vec::new();
    for line in body {
        if OPTION_RE.is_match(line) {
            if let (Some(block), Some(caps)) = (blocks.last_mut(), OPTION_RE.captures(line)) {
                if let Some(label) = caps[1].chars().next() {
                    block.labels.insert(label.to_ascii_uppercase());
                }
            }
        } else if QUESTION_RE.is_match(line) {
            blocks.push(QuestionBlock {
                labels: BTreeSet::new(),
            });
        }
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz(questions: usize, key_entries: usize) -> String {
        let mut doc = String::from("# Networking Quiz\n\n");
        for n in 1..=questions {
            doc.push_str(&format!(
                "{n}. Which statement about topic {n} is correct?\nA) First\nB) Second\nC) Third\nD) Fourth\n\n"
            ));
        }
        doc.push_str("## Answer Key\n");
        for n in 1..=key_entries {
            doc.push_str(&format!("{n}. B\n"));
        }
        doc
    }

    #[test]
    fn well_formed_quiz_has_no_structural_issues() {
        let ctx = GateContext {
            expected_questions: Some(3),
            ..Default::default()
        };
        assert!(validate(&quiz(3, 3), &ctx).is_empty());
    }

    #[test]
    fn short_answer_key_is_flagged() {
        let issues = validate(&quiz(3, 2), &GateContext::default());
        assert_eq!(issues.len(), 1);
        assert!(issues[0].detail.contains("Answer key has 2 entries"));
    }

    #[test]
    fn missing_key_and_options() {
        let doc = "# Quiz\n1. What is TCP?\nA) a\nB) b\n2. What is UDP?\n";
        let issues = validate(doc, &GateContext::default());
        let checks: Vec<&str> = issues.iter().map(|i| i.check).collect();
        assert!(checks.contains(&"quiz_answer_key"));
        assert!(issues
            .iter()
            .any(|i| i.detail.contains("missing four labeled options (A-D): 1, 2")));
        assert!(issues.iter().any(|i| i.detail.contains("1 option sets for 2")));
    }

    #[test]
    fn expected_count_mismatch() {
        let ctx = GateContext {
            expected_questions: Some(4),
            ..Default::default()
        };
        let issues = validate(&quiz(3, 3), &ctx);
        assert_eq!(issues.len(), 2);
        assert!(issues[0].detail.contains("Expected 4 questions, found 3"));
    }

    #[test]
    fn key_entry_formats() {
        for line in ["1. B", "Q2: C", "**3.** A", "- 4) Answer: D", "5 - a"] {
            let matched = KEY_ENTRY_RE.is_match(line);
            assert_eq!(matched, line != "5 - a", "{line}");
        }
        assert!(!KEY_ENTRY_RE.is_match("1. Because the handshake"));
    }
}
