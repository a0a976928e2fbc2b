//! Atomic span protection.
//!
//! Fenced code blocks are swapped for single-token placeholders before any
//! splitting decision and restored verbatim afterwards. A placeholder sits
//! on its own line and contains no whitespace, so no boundary finder can
//! cut through it.

use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::text;

const TOKEN_OPEN: char = '\u{E000}';
const TOKEN_CLOSE: char = '\u{E001}';

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x{E000}(\d+)\x{E001}").expect("TOKEN_RE regex should compile")
});

/// Protected spans of one document, indexed by placeholder number.
#[derive(Debug, Default)]
pub(crate) struct SpanTable {
    spans: Vec<String>,
    /// Char length of each span, cached for sizing.
    lens: Vec<usize>,
}

/// A run of protected text: plain text or one placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Piece<'a> {
    Text(&'a str),
    Token { index: usize, raw: &'a str },
}

impl SpanTable {
    /// Replace every fenced block in `doc` with a placeholder line.
    ///
    /// An unclosed fence runs to the end of the document.
    pub fn protect(doc: &str) -> (String, Self) {
        let mut table = Self::default();
        let mut out: Vec<String> = Vec::new();
        let mut block: Option<Vec<&str>> = None;

        for line in doc.lines() {
            match block.as_mut() {
                Some(lines) => {
                    lines.push(line);
                    if text::is_fence(line) {
                        let finished = lines.join("\n");
                        out.push(table.insert(finished));
                        block = None;
                    }
                }
                None if text::is_fence(line) => block = Some(vec![line]),
                None => out.push(line.to_string()),
            }
        }
        if let Some(lines) = block {
            out.push(table.insert(lines.join("\n")));
        }
        (out.join("\n"), table)
    }

    fn insert(&mut self, span: String) -> String {
        let index = self.spans.len();
        self.lens.push(text::char_len(&span));
        self.spans.push(span);
        format!("{TOKEN_OPEN}{index}{TOKEN_CLOSE}")
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn span_len(&self, index: usize) -> usize {
        self.lens.get(index).copied().unwrap_or(0)
    }

    /// Char length of `text` with every placeholder expanded.
    pub fn measure(&self, text: &str) -> usize {
        let mut total = text::char_len(text);
        for caps in TOKEN_RE.captures_iter(text) {
            if let Some(len) = token_index(&caps).and_then(|i| self.lens.get(i)) {
                total = total - text::char_len(&caps[0]) + len;
            }
        }
        total
    }

    /// Expand every placeholder back to its original block.
    pub fn restore(&self, text: &str) -> String {
        TOKEN_RE
            .replace_all(text, |caps: &Captures<'_>| {
                token_index(caps)
                    .and_then(|i| self.spans.get(i))
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

fn token_index(caps: &Captures<'_>) -> Option<usize> {
    caps.get(1)?.as_str().parse().ok()
}

/// Split protected text into plain runs and placeholders, in order.
pub(crate) fn split_at_tokens(text: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut last = 0;
    for caps in TOKEN_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let Some(index) = token_index(&caps) else { continue };
        if whole.start() > last {
            pieces.push(Piece::Text(&text[last..whole.start()]));
        }
        pieces.push(Piece::Token {
            index,
            raw: whole.as_str(),
        });
        last = whole.end();
    }
    if last < text.len() {
        pieces.push(Piece::Text(&text[last..]));
    }
    pieces
}
