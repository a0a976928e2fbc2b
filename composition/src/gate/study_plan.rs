//! Study plan structure: fixed section order, weekly breakdown table,
//! per-section depth, and references to the requested certification and
//! focus area.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use super::{GateContext, QualityIssue, RequiredSections};
use crate::kinds::STUDY_PLAN_SECTIONS;
use crate::text;

/// Required weekly table columns, in order.
pub const TABLE_COLUMNS: &[&str] = &["Week", "Focus", "Topics", "Labs", "Milestone"];

/// Minimum words per required section, aligned with `STUDY_PLAN_SECTIONS`.
const MIN_WORDS: &[usize] = &[40, 60, 30, 30, 25, 20];

static BR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("BR_RE regex should compile"));

static ROW_WEEK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})(?:\s*[-–]\s*(\d{1,2}))?").expect("ROW_WEEK_RE regex should compile")
});

static SEPARATOR_ROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\|?\s*:?-{3,}:?\s*(?:\|\s*:?-{3,}:?\s*)*\|?\s*$")
        .expect("SEPARATOR_ROW_RE regex should compile")
});

static SENTENCE_END_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[.!?]+(?:\s+|$)").expect("SENTENCE_END_RE regex should compile")
});

/// Study plan validator registered for [`crate::ContentKind::StudyPlan`].
pub fn validate(doc: &str, ctx: &GateContext) -> Vec<QualityIssue> {
    let required = RequiredSections::locate(doc, STUDY_PLAN_SECTIONS);
    let mut issues = required.order_issues("study_plan_sections");

    let table = required.body("Weekly Breakdown").and_then(WeeklyTable::parse);
    match &table {
        None => issues.push(QualityIssue::new(
            "study_plan_table",
            format!(
                "Weekly Breakdown must contain a table with columns: {}",
                TABLE_COLUMNS.join(" | ")
            ),
        )),
        Some(table) => issues.extend(check_table(table, ctx)),
    }

    if let Some(overview) = required.body("Overview") {
        let sentences = sentence_count(overview);
        if !(3..=5).contains(&sentences) {
            issues.push(QualityIssue::new(
                "study_plan_overview",
                format!("Overview should be 3-5 sentences, found {}", sentences),
            ));
        }
    }
    issues.extend(check_itemized(&required, "Final Checklist", 5));
    issues.extend(check_itemized(&required, "Alignment Notes", 3));

    for ((name, body), min) in STUDY_PLAN_SECTIONS
        .iter()
        .zip(&required.bodies)
        .zip(MIN_WORDS)
    {
        let Some(body) = body else { continue };
        let words = text::word_count(body);
        if words < *min {
            issues.push(QualityIssue::new(
                "study_plan_depth",
                format!(
                    "Section '{}' is too thin: {} words (minimum {})",
                    name, words, min
                ),
            ));
        }
    }

    let lowered = doc.to_lowercase();
    if let Some(cert) = &ctx.certification {
        if !lowered.contains(&cert.to_lowercase()) {
            issues.push(QualityIssue::new(
                "study_plan_certification",
                format!("Plan never mentions the target certification '{}'", cert),
            ));
        }
    }
    if let Some(focus) = &ctx.focus_area {
        let terms = focus_terms(focus);
        if !terms.iter().any(|t| lowered.contains(t.as_str())) {
            issues.push(QualityIssue::new(
                "study_plan_focus",
                format!("Plan never references the focus area '{}'", focus),
            ));
        }
        if let Some(table) = &table {
            issues.extend(check_focus_rows(table, focus, &terms));
        }
    }

    if let Some(reason) = truncation(doc) {
        issues.push(QualityIssue::new("study_plan_truncated", reason));
    }

    issues
}

// ── Weekly table ──────────────────────────────────────────────────────────

struct WeeklyTable {
    header: Vec<String>,
    /// Raw table lines, header included.
    lines: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl WeeklyTable {
    fn parse(body: &str) -> Option<Self> {
        let table_lines: Vec<&str> = body
            .lines()
            .skip_while(|l| !is_table_line(l))
            .take_while(|l| is_table_line(l))
            .collect();
        let (header, rest) = table_lines.split_first()?;
        let rows = rest
            .iter()
            .filter(|l| !SEPARATOR_ROW_RE.is_match(l))
            .map(|l| cells(l))
            .collect();
        Some(Self {
            header: cells(header),
            lines: table_lines.iter().map(|l| l.to_string()).collect(),
            rows,
        })
    }

    fn has_columns(&self) -> bool {
        let header: Vec<String> = self.header.iter().map(|c| text::normalize_title(c)).collect();
        TABLE_COLUMNS.iter().all(|col| {
            let col = col.to_lowercase();
            header.iter().any(|h| h.contains(&col))
        })
    }

    fn weeks(&self) -> BTreeSet<u32> {
        let mut weeks = BTreeSet::new();
        for row in &self.rows {
            let Some(caps) = row.first().and_then(|c| ROW_WEEK_RE.captures(c)) else {
                continue;
            };
            let Ok(from) = caps[1].parse::<u32>() else {
                continue;
            };
            let to = caps
                .get(2)
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .filter(|&to| to > from)
                .unwrap_or(from);
            weeks.extend(from..=to);
        }
        weeks
    }
}

fn is_table_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('|') && trimmed.len() > 1
}

fn cells(line: &str) -> Vec<String> {
    line.trim()
        .trim_matches('|')
        .split('|')
        .map(|c| c.trim().to_string())
        .collect()
}

fn check_table(table: &WeeklyTable, ctx: &GateContext) -> Vec<QualityIssue> {
    let mut issues = Vec::new();
    if !table.has_columns() {
        issues.push(QualityIssue::new(
            "study_plan_table",
            format!(
                "Weekly table header must be: {}",
                TABLE_COLUMNS.join(" | ")
            ),
        ));
    }
    if table.lines.iter().any(|l| BR_RE.is_match(l)) {
        issues.push(QualityIssue::new(
            "study_plan_table",
            "Weekly table must not contain <br> line breaks",
        ));
    }
    if let Some(target) = ctx.expected_weeks {
        let weeks = table.weeks();
        let covered = (1..=target).filter(|w| weeks.contains(w)).count() as u32;
        if covered < target {
            issues.push(QualityIssue::new(
                "study_plan_weeks",
                format!("Weekly table covers {} of {} weeks", covered, target),
            ));
        }
    }
    issues
}

fn focus_terms(focus: &str) -> Vec<String> {
    let keywords = text::keywords(focus);
    if keywords.is_empty() {
        vec![focus.trim().to_lowercase()]
    } else {
        keywords
    }
}

/// At least half the rows (minimum 2) must mention the focus area; a one-row
/// table only needs its single row.
fn check_focus_rows(table: &WeeklyTable, focus: &str, terms: &[String]) -> Option<QualityIssue> {
    let rows = table.rows.len();
    if rows == 0 {
        return None;
    }
    let required = rows.div_ceil(2).max(2).min(rows);
    let hits = table
        .rows
        .iter()
        .filter(|row| {
            let joined = row.join(" ").to_lowercase();
            terms.iter().any(|t| joined.contains(t.as_str()))
        })
        .count();
    (hits < required).then(|| {
        QualityIssue::new(
            "study_plan_focus",
            format!(
                "Focus area '{}' appears in {} of {} weekly rows (need at least {})",
                focus, hits, rows, required
            ),
        )
    })
}

// ── Section checks ────────────────────────────────────────────────────────

fn sentence_count(body: &str) -> usize {
    SENTENCE_END_RE
        .split(body.trim())
        .filter(|s| s.chars().any(char::is_alphanumeric))
        .count()
}

fn check_itemized(required: &RequiredSections<'_>, name: &str, min: usize) -> Option<QualityIssue> {
    let body = required.body(name)?;
    let items = text::count_bullets(body);
    (items < min).then(|| {
        QualityIssue::new(
            "study_plan_items",
            format!(
                "Section '{}' needs at least {} itemized lines, found {}",
                name, min, items
            ),
        )
    })
}

fn truncation(doc: &str) -> Option<String> {
    let last = text::last_content_line(doc)?.trim_end();
    if text::is_heading(last) {
        return Some("Plan ends on a heading with no content (likely truncated)".to_string());
    }
    if last.ends_with(':') || last.ends_with(',') {
        return Some("Plan ends mid-section (likely truncated)".to_string());
    }
    None
}
