//! Line-level markdown helpers shared by the quality gate and the packer.
//!
//! Everything here is fence-aware: lines inside fenced code blocks never
//! count as headings, bullets or section boundaries.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// `#`-style heading with at least one visible character.
static HASH_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s{0,3}#{1,6}\s+\S").expect("HASH_HEADING_RE regex should compile")
});

/// A line that is entirely bold, optionally followed by a colon (`**Overview**:`).
static BOLD_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s{0,3}\*\*[^*]+\*\*:?\s*$").expect("BOLD_HEADING_RE regex should compile")
});

/// Bulleted or numbered list item.
static BULLET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*+•]|\d{1,3}[.)])\s+\S").expect("BULLET_RE regex should compile")
});

/// Numbered `#` heading: `## 2. How It Works`, `### 3) Practical Examples:`.
static NUMBERED_HASH_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s{0,3}#{1,6}\s+(?:\*\*)?\s*(\d{1,2})\s*[.):]\s*(.*?)\s*(?:\*\*)?\s*:?\s*$")
        .expect("NUMBERED_HASH_HEADING_RE regex should compile")
});

/// Numbered whole-line bold heading: `**4. Common Pitfalls**`.
static NUMBERED_BOLD_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s{0,3}\*\*\s*(\d{1,2})\s*[.):]\s*([^*]*?)\s*\*\*\s*:?\s*$")
        .expect("NUMBERED_BOLD_HEADING_RE regex should compile")
});

/// Leading heading decoration stripped before comparing titles.
static TITLE_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*#*\s*(?:\*\*)?\s*(?:\d{1,2}\s*[.):]\s*)?")
        .expect("TITLE_PREFIX_RE regex should compile")
});

/// Words too common to signal topical overlap.
const STOP_WORDS: &[&str] = &[
    "about", "after", "also", "another", "because", "been", "before", "being", "between",
    "both", "could", "does", "doing", "down", "each", "explain", "explanation", "from",
    "give", "have", "here", "into", "just", "like", "make", "more", "most", "need", "only",
    "other", "over", "plan", "please", "question", "questions", "quiz", "really", "roadmap",
    "should", "some", "such", "than", "that", "their", "them", "then", "there", "these",
    "they", "this", "those", "through", "under", "very", "want", "week", "weeks", "what",
    "when", "where", "which", "while", "with", "would", "your",
];

/// Character length in Unicode scalar values (the unit transports cap on).
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Number of whitespace-separated tokens containing at least one alphanumeric.
pub fn word_count(s: &str) -> usize {
    s.split_whitespace()
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .count()
}

/// Whether a line opens or closes a fenced code block.
pub fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

/// For each line, whether it belongs to a fenced code block (fence lines included).
pub fn fence_mask(lines: &[&str]) -> Vec<bool> {
    let mut mask = Vec::with_capacity(lines.len());
    let mut inside = false;
    for line in lines {
        if is_fence(line) {
            mask.push(true);
            inside = !inside;
        } else {
            mask.push(inside);
        }
    }
    mask
}

/// Markdown heading: `#` heading or a whole-line bold title.
pub fn is_heading(line: &str) -> bool {
    HASH_HEADING_RE.is_match(line) || BOLD_HEADING_RE.is_match(line)
}

pub fn is_bullet(line: &str) -> bool {
    BULLET_RE.is_match(line)
}

/// Headings outside code fences.
pub fn count_headings(doc: &str) -> usize {
    count_matching(doc, is_heading)
}

/// Bullet and numbered-list lines outside code fences.
pub fn count_bullets(doc: &str) -> usize {
    count_matching(doc, is_bullet)
}

fn count_matching(doc: &str, pred: impl Fn(&str) -> bool) -> usize {
    let lines: Vec<&str> = doc.lines().collect();
    let mask = fence_mask(&lines);
    lines
        .iter()
        .zip(mask)
        .filter(|(line, fenced)| !fenced && pred(line))
        .count()
}

/// Number of complete fenced code blocks.
pub fn count_fenced_blocks(doc: &str) -> usize {
    doc.lines().filter(|l| is_fence(l)).count() / 2
}

/// Parse a numbered heading line into `(number, title)`.
///
/// Only `#` headings and whole-line bold titles qualify, so numbered list
/// items such as `1. Run the scan` are not mistaken for section headings.
pub fn numbered_heading(line: &str) -> Option<(u32, String)> {
    let caps = NUMBERED_HASH_HEADING_RE
        .captures(line)
        .or_else(|| NUMBERED_BOLD_HEADING_RE.captures(line))?;
    let number = caps.get(1)?.as_str().parse().ok()?;
    let title = caps
        .get(2)
        .map(|m| m.as_str().trim_matches(|c: char| c == '*' || c == ':' || c.is_whitespace()))
        .unwrap_or_default()
        .to_string();
    Some((number, title))
}

/// Lowercase, `&` spelled out, punctuation dropped, whitespace collapsed.
pub fn normalize_title(raw: &str) -> String {
    let stripped = TITLE_PREFIX_RE.replace(raw, "");
    let lowered = stripped.to_lowercase().replace('&', " and ");
    lowered
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// A heading and the text beneath it, up to the next heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Normalized heading title.
    pub title: String,
    /// Zero-based line index of the heading.
    pub line: usize,
    /// Body text with the heading line removed.
    pub body: String,
}

/// Split a document into heading-delimited sections (preamble discarded).
pub fn split_sections(doc: &str) -> Vec<Section> {
    let lines: Vec<&str> = doc.lines().collect();
    let mask = fence_mask(&lines);
    let mut sections: Vec<Section> = Vec::new();
    let mut body: Vec<&str> = Vec::new();

    for (idx, (line, fenced)) in lines.iter().zip(mask).enumerate() {
        if !fenced && is_heading(line) {
            if let Some(last) = sections.last_mut() {
                last.body = body.join("\n").trim().to_string();
            }
            body.clear();
            sections.push(Section {
                title: normalize_title(line),
                line: idx,
                body: String::new(),
            });
        } else {
            body.push(line);
        }
    }
    if let Some(last) = sections.last_mut() {
        last.body = body.join("\n").trim().to_string();
    }
    sections
}

/// Index of the first section whose title names `required`, for each required title.
pub fn locate_sections(sections: &[Section], required: &[&str]) -> Vec<Option<usize>> {
    required
        .iter()
        .map(|name| {
            let wanted = normalize_title(name);
            sections.iter().position(|s| s.title.contains(&wanted))
        })
        .collect()
}

/// Significant lowercase tokens (≥ 4 chars, stop-words removed), first-seen order.
pub fn keywords(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() >= 4)
        .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// Last line with visible content.
pub fn last_content_line(doc: &str) -> Option<&str> {
    doc.lines().rev().find(|l| !l.trim().is_empty())
}
