//! Boundary finders and greedy packing.
//!
//! Boundaries are tried coarse to fine from [`BOUNDARIES`]. A segment that
//! is still too large after packing at one level is re-split at the next
//! finer level; `Char` is the last resort and never cuts a placeholder.

use regex::Regex;
use std::sync::LazyLock;

use super::spans::{split_at_tokens, Piece, SpanTable};
use crate::text;

static PARAGRAPH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n").expect("PARAGRAPH_RE regex should compile"));

static SENTENCE_END_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[.!?]["')\]]*\s+"#).expect("SENTENCE_END_RE regex should compile")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Boundary {
    Heading,
    Paragraph,
    Line,
    Sentence,
    Word,
    Char,
}

/// Boundary finders, coarsest first.
pub(crate) const BOUNDARIES: &[Boundary] = &[
    Boundary::Heading,
    Boundary::Paragraph,
    Boundary::Line,
    Boundary::Sentence,
    Boundary::Word,
    Boundary::Char,
];

impl Boundary {
    /// Separator re-inserted between pieces packed at this level.
    pub fn joiner(self) -> &'static str {
        match self {
            Self::Heading | Self::Paragraph => "\n\n",
            Self::Line => "\n",
            Self::Sentence | Self::Word => " ",
            Self::Char => "",
        }
    }

    fn finer(self) -> impl Iterator<Item = Boundary> {
        BOUNDARIES.iter().copied().skip_while(move |b| *b != self).skip(1)
    }

    /// Split `text` at this boundary. `limit` only applies to `Char`.
    pub fn split(self, text: &str, limit: usize, spans: &SpanTable) -> Vec<String> {
        let pieces = match self {
            Self::Heading => split_headings(text),
            Self::Paragraph => PARAGRAPH_RE
                .split(text)
                .map(|p| p.trim().to_string())
                .collect(),
            Self::Line => text.lines().map(|l| l.trim_end().to_string()).collect(),
            Self::Sentence => split_sentences(text),
            Self::Word => text.split_whitespace().map(str::to_string).collect(),
            Self::Char => return char_slices(text, limit, spans),
        };
        pieces
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .collect()
    }
}

fn split_headings(text: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if text::is_heading(line) && !current.is_empty() {
            pieces.push(current.join("\n").trim().to_string());
            current.clear();
        }
        current.push(line);
    }
    if !current.is_empty() {
        pieces.push(current.join("\n").trim().to_string());
    }
    pieces
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut last = 0;
    for m in SENTENCE_END_RE.find_iter(text) {
        pieces.push(text[last..m.end()].trim().to_string());
        last = m.end();
    }
    if last < text.len() {
        pieces.push(text[last..].trim().to_string());
    }
    pieces
}

/// Raw slices of at most `limit` measured chars. A placeholder is atomic:
/// one larger than `limit` becomes a slice of its own.
pub(crate) fn char_slices(text: &str, limit: usize, spans: &SpanTable) -> Vec<String> {
    let limit = limit.max(1);
    let mut out = Vec::new();
    let mut current = String::new();
    let mut size = 0;

    let mut push = |atom: &str, len: usize, current: &mut String, size: &mut usize| {
        if *size + len > limit && !current.is_empty() {
            out.push(std::mem::take(current));
            *size = 0;
        }
        current.push_str(atom);
        *size += len;
    };

    for piece in split_at_tokens(text) {
        match piece {
            Piece::Token { index, raw } => {
                push(raw, spans.span_len(index), &mut current, &mut size);
            }
            Piece::Text(run) => {
                let mut buf = [0u8; 4];
                for ch in run.chars() {
                    push(ch.encode_utf8(&mut buf), 1, &mut current, &mut size);
                }
            }
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Greedily accumulate `pieces` into runs no larger than `target`.
pub(crate) fn pack_pieces(
    pieces: Vec<String>,
    level: Boundary,
    target: usize,
    spans: &SpanTable,
) -> Vec<String> {
    let joiner = level.joiner();
    let joiner_len = text::char_len(joiner);
    let mut out = Vec::new();
    let mut current = String::new();
    let mut size = 0;

    for piece in pieces {
        let piece_len = spans.measure(&piece);
        if piece_len > target {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
                size = 0;
            }
            out.extend(split_oversized(&piece, level, target, spans));
            continue;
        }
        if current.is_empty() {
            current = piece;
            size = piece_len;
        } else if size + joiner_len + piece_len <= target {
            current.push_str(joiner);
            current.push_str(&piece);
            size += joiner_len + piece_len;
        } else {
            out.push(std::mem::replace(&mut current, piece));
            size = piece_len;
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Re-split an oversized segment at the first finer boundary that divides it.
pub(crate) fn split_oversized(
    text: &str,
    level: Boundary,
    target: usize,
    spans: &SpanTable,
) -> Vec<String> {
    for finer in level.finer() {
        let pieces = finer.split(text, target, spans);
        if pieces.len() > 1 {
            return pack_pieces(pieces, finer, target, spans);
        }
    }
    vec![text.to_string()]
}

/// Generic segmentation: coarsest boundary yielding more than one segment,
/// then greedy packing.
pub(crate) fn segment_and_pack(text: &str, target: usize, spans: &SpanTable) -> Vec<String> {
    for level in [Boundary::Heading, Boundary::Paragraph] {
        let segments = level.split(text, target, spans);
        if segments.len() > 1 {
            return pack_pieces(segments, level, target, spans);
        }
    }
    let whole = text.trim();
    if spans.measure(whole) <= target {
        vec![whole.to_string()]
    } else {
        split_oversized(whole, Boundary::Paragraph, target, spans)
    }
}
