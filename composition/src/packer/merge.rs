//! Post-packing passes: hard-limit enforcement and readability merging.

use tracing::warn;

use super::boundary::{char_slices, pack_pieces, Boundary};
use super::spans::{split_at_tokens, Piece, SpanTable};

/// Separator inserted between merged chunks.
const MERGE_JOINER: &str = "\n\n";
const MERGE_JOINER_LEN: usize = 2;

/// In-band notice standing in for a fenced block too large to deliver.
pub(crate) fn omitted_notice(span_chars: usize, limit: usize) -> String {
    format!("[code block omitted: {} chars, limit {}]", span_chars, limit)
}

/// Split any chunk over `limit` at placeholder boundaries and rebuild it.
///
/// A single block larger than `limit` is replaced by [`omitted_notice`].
pub(crate) fn enforce_hard_limit(chunks: Vec<String>, limit: usize, spans: &SpanTable) -> Vec<String> {
    let mut out = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        if spans.measure(&chunk) <= limit {
            out.push(chunk);
            continue;
        }

        let mut pieces = Vec::new();
        for piece in split_at_tokens(&chunk) {
            match piece {
                Piece::Token { index, raw } => {
                    let span_chars = spans.span_len(index);
                    if span_chars > limit {
                        warn!(
                            span = index,
                            span_chars,
                            limit,
                            "Fenced block exceeds message limit; substituting notice"
                        );
                        pieces.push(omitted_notice(span_chars, limit));
                    } else {
                        pieces.push(raw.to_string());
                    }
                }
                Piece::Text(run) => {
                    let run = run.trim();
                    if run.is_empty() {
                        continue;
                    }
                    if spans.measure(run) > limit {
                        pieces.extend(char_slices(run, limit, spans));
                    } else {
                        pieces.push(run.to_string());
                    }
                }
            }
        }
        out.extend(pack_pieces(pieces, Boundary::Line, limit, spans));
    }
    out
}

/// Bounds the readability merge must respect.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MergePolicy {
    pub limit: usize,
    pub min_chunk_chars: usize,
    pub min_chunks: usize,
    pub max_chunks: usize,
}

/// Merge undersized chunks, then the cheapest pairs while over `max_chunks`,
/// then a small trailing chunk. Never drops below `min_chunks`.
pub(crate) fn readability_merge(
    mut chunks: Vec<String>,
    policy: &MergePolicy,
    spans: &SpanTable,
) -> Vec<String> {
    let floor = policy.min_chunks.max(1);
    let fits = |a: usize, b: usize| a + MERGE_JOINER_LEN + b <= policy.limit;

    while chunks.len() > floor {
        let sizes = measure_all(&chunks, spans);
        let candidate = (0..chunks.len())
            .filter(|&i| sizes[i] < policy.min_chunk_chars)
            .find_map(|i| {
                let left = i.checked_sub(1).filter(|&j| fits(sizes[i], sizes[j]));
                let right = Some(i + 1).filter(|&j| j < sizes.len() && fits(sizes[i], sizes[j]));
                match (left, right) {
                    (Some(l), Some(r)) if sizes[r] < sizes[l] => Some(i),
                    (Some(l), _) => Some(l),
                    (None, Some(_)) => Some(i),
                    (None, None) => None,
                }
            });
        let Some(at) = candidate else { break };
        merge_at(&mut chunks, at);
    }

    while chunks.len() > policy.max_chunks && chunks.len() > floor {
        let sizes = measure_all(&chunks, spans);
        let cheapest = (0..chunks.len() - 1)
            .filter(|&i| fits(sizes[i], sizes[i + 1]))
            .min_by_key(|&i| sizes[i] + sizes[i + 1]);
        let Some(at) = cheapest else { break };
        merge_at(&mut chunks, at);
    }

    if chunks.len() > floor && chunks.len() >= 2 {
        let n = chunks.len();
        let last = spans.measure(&chunks[n - 1]);
        let prev = spans.measure(&chunks[n - 2]);
        if last < policy.min_chunk_chars && fits(prev, last) {
            merge_at(&mut chunks, n - 2);
        }
    }

    chunks
}

fn measure_all(chunks: &[String], spans: &SpanTable) -> Vec<usize> {
    chunks.iter().map(|c| spans.measure(c)).collect()
}

/// Merge chunk `at + 1` into chunk `at`.
fn merge_at(chunks: &mut Vec<String>, at: usize) {
    let right = chunks.remove(at + 1);
    let left = &mut chunks[at];
    left.push_str(MERGE_JOINER);
    left.push_str(&right);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(limit: usize, min_chunks: usize, max_chunks: usize) -> MergePolicy {
        MergePolicy {
            limit,
            min_chunk_chars: 10,
            min_chunks,
            max_chunks,
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn small_chunk_joins_smaller_neighbour() {
        let chunks = strings(&["aaaaaaaaaaaa", "bb", "cccccccccccccccc"]);
        let merged = readability_merge(chunks, &policy(20, 1, 10), &SpanTable::default());
        assert_eq!(merged, strings(&["aaaaaaaaaaaa\n\nbb", "cccccccccccccccc"]));
    }

    #[test]
    fn merging_respects_min_chunks() {
        let chunks = strings(&["a", "b", "c"]);
        let merged = readability_merge(chunks, &policy(100, 3, 10), &SpanTable::default());
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn cheapest_pair_merged_when_over_max() {
        let chunks = strings(&["aaaaaaaaaaaa", "bbbbbbbbbbbb", "cccccccccccccccccc", "dddddddddddd"]);
        let mut p = policy(30, 1, 3);
        p.min_chunk_chars = 0;
        let merged = readability_merge(chunks, &p, &SpanTable::default());
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0], "aaaaaaaaaaaa\n\nbbbbbbbbbbbb");
    }

    #[test]
    fn oversized_block_becomes_notice() {
        let doc = format!("```\n{}\n```", "x".repeat(300));
        let (protected, spans) = SpanTable::protect(&doc);
        let out = enforce_hard_limit(vec![protected], 100, &spans);
        assert_eq!(out, vec![omitted_notice(308, 100)]);
    }
}
