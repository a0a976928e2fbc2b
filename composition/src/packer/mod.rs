//! Chunk Packer: transport-sized chunks from one final document
//!
//! Pipeline:
//!
//! | Step | Module        | What happens                                          |
//! |------|---------------|-------------------------------------------------------|
//! | 1    | `spans`       | fenced blocks swapped for placeholders                |
//! | 2    | `sections`    | numbered-section override (one chunk per section)     |
//! | 3    | `boundary`    | coarsest useful boundary, greedy packing, re-splits   |
//! | 4    | `merge`       | hard-limit enforcement, readability merge             |
//! | 5    | here          | placeholders restored, optional `(i/n)` banners       |
//!
//! All sizes are Unicode scalar counts measured with placeholders expanded,
//! so the hard limit holds for the restored text.

mod boundary;
mod merge;
mod sections;
mod spans;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::text;
use spans::SpanTable;

/// Smallest hard limit the packer accepts.
pub const MIN_HARD_LIMIT: usize = 64;

/// Room reserved for a `(i/n)\n` banner when banners are enabled.
pub const BANNER_RESERVE: usize = 12;

/// Required numbered sections for the structural override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionLayout {
    /// Default titles, in section order; used when a heading omits its title.
    pub titles: &'static [&'static str],
}

/// Packing policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackOptions {
    /// Transport ceiling per chunk, in chars.
    pub hard_limit: usize,
    /// Preferred chunk size for greedy packing.
    pub target_size: usize,
    /// Chunks smaller than this are merged into a neighbour when possible.
    pub min_chunk_chars: usize,
    pub min_chunks: usize,
    pub max_chunks: usize,
    /// Prefix each chunk with `(i/n)` when more than one results.
    pub page_banner: bool,
    /// Structural override, set per content kind.
    #[serde(skip)]
    pub sections: Option<SectionLayout>,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            hard_limit: 4000,
            target_size: 3600,
            min_chunk_chars: 600,
            min_chunks: 1,
            max_chunks: 12,
            page_banner: false,
            sections: None,
        }
    }
}

impl PackOptions {
    pub fn with_sections(mut self, layout: SectionLayout) -> Self {
        self.sections = Some(layout);
        self
    }

    pub fn with_banner(mut self, page_banner: bool) -> Self {
        self.page_banner = page_banner;
        self
    }

    pub fn validate(&self) -> Result<(), PackError> {
        if self.hard_limit < MIN_HARD_LIMIT {
            return Err(PackError::LimitTooSmall(self.hard_limit));
        }
        if self.target_size > self.hard_limit {
            return Err(PackError::TargetExceedsLimit {
                target: self.target_size,
                hard: self.hard_limit,
            });
        }
        if self.max_chunks == 0 {
            return Err(PackError::ZeroMaxChunks);
        }
        if self.min_chunks > self.max_chunks {
            return Err(PackError::ChunkRange {
                min: self.min_chunks,
                max: self.max_chunks,
            });
        }
        Ok(())
    }

    /// Ceiling for chunk bodies, after any banner reserve.
    fn body_limit(&self) -> usize {
        if self.page_banner {
            self.hard_limit - BANNER_RESERVE
        } else {
            self.hard_limit
        }
    }
}

/// Invalid packing policy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PackError {
    #[error("hard limit {0} is below the minimum of {MIN_HARD_LIMIT}")]
    LimitTooSmall(usize),

    #[error("target size {target} exceeds hard limit {hard}")]
    TargetExceedsLimit { target: usize, hard: usize },

    #[error("max_chunks must be at least 1")]
    ZeroMaxChunks,

    #[error("min_chunks {min} exceeds max_chunks {max}")]
    ChunkRange { min: usize, max: usize },
}

/// One transport unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
}

impl Chunk {
    /// Length in chars.
    pub fn len(&self) -> usize {
        text::char_len(&self.text)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Split `doc` into ordered chunks of at most `opts.hard_limit` chars.
///
/// An empty document yields no chunks.
pub fn pack(doc: &str, opts: &PackOptions) -> Result<Vec<Chunk>, PackError> {
    opts.validate()?;
    let doc = doc.trim();
    if doc.is_empty() {
        return Ok(Vec::new());
    }

    let limit = opts.body_limit();
    let (protected, spans) = SpanTable::protect(doc);

    let pieces = match opts
        .sections
        .as_ref()
        .and_then(|layout| sections::section_chunks(&protected, layout, limit, &spans))
    {
        Some(pieces) => pieces,
        None => pack_generic(&protected, opts, limit, &spans),
    };

    let texts: Vec<String> = pieces
        .iter()
        .map(|p| spans.restore(p).trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    let total = texts.len();
    let banner = opts.page_banner && total > 1;

    debug!(
        chunks = total,
        spans = spans.len(),
        chars = text::char_len(doc),
        banner,
        "Packed document"
    );

    Ok(texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk {
            index,
            text: if banner {
                format!("({}/{})\n{}", index + 1, total, text)
            } else {
                text
            },
        })
        .collect())
}

fn pack_generic(protected: &str, opts: &PackOptions, limit: usize, spans: &SpanTable) -> Vec<String> {
    let target = opts.target_size.min(limit);
    let mut chunks = boundary::segment_and_pack(protected, target, spans);

    let total = spans.measure(protected);
    if total > limit && chunks.len() < opts.min_chunks {
        let target = total.div_ceil(opts.min_chunks).min(target);
        debug!(target, min_chunks = opts.min_chunks, "Repacking to reach min_chunks");
        chunks = boundary::segment_and_pack(protected, target, spans);
    }

    let chunks = merge::enforce_hard_limit(chunks, limit, spans);
    merge::readability_merge(
        chunks,
        &merge::MergePolicy {
            limit,
            min_chunk_chars: opts.min_chunk_chars,
            min_chunks: opts.min_chunks,
            max_chunks: opts.max_chunks,
        },
        spans,
    )
}
