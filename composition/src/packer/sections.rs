//! Structural override: one chunk per numbered required section.

use tracing::debug;

use super::spans::SpanTable;
use super::SectionLayout;
use crate::text;

/// Chunks for a document whose numbered sections run 1..=N in order.
///
/// Returns `None` when any section is missing or out of sequence, or when a
/// section would not fit in `limit`; the caller then segments generically.
pub(crate) fn section_chunks(
    protected: &str,
    layout: &SectionLayout,
    limit: usize,
    spans: &SpanTable,
) -> Option<Vec<String>> {
    let expected = layout.titles.len();
    if expected == 0 {
        return None;
    }
    let lines: Vec<&str> = protected.lines().collect();

    // First heading numbered 1, then the first 2 after it, and so on.
    // Other numbered headings stay in the body they fall under.
    let mut headings: Vec<(usize, String)> = Vec::with_capacity(expected);
    for (idx, line) in lines.iter().enumerate() {
        if headings.len() == expected {
            break;
        }
        if let Some((number, title)) = text::numbered_heading(line) {
            if number as usize == headings.len() + 1 {
                headings.push((idx, title));
            }
        }
    }
    if headings.len() != expected {
        debug!(
            found = headings.len(),
            expected, "Numbered sections incomplete; using generic segmentation"
        );
        return None;
    }

    let preamble = lines[..headings[0].0].join("\n").trim().to_string();
    let mut chunks = Vec::with_capacity(expected);
    for (i, (start, title)) in headings.iter().enumerate() {
        let end = headings.get(i + 1).map(|h| h.0).unwrap_or(lines.len());
        let body = lines[start + 1..end].join("\n").trim().to_string();
        let title = if title.is_empty() {
            layout.titles[i]
        } else {
            title.as_str()
        };

        let mut chunk = String::new();
        if i == 0 && !preamble.is_empty() {
            chunk.push_str(&preamble);
            chunk.push_str("\n\n");
        }
        chunk.push_str(&format!("**{}. {}**", i + 1, title));
        if !body.is_empty() {
            chunk.push_str("\n\n");
            chunk.push_str(&body);
        }

        let size = spans.measure(&chunk);
        if size > limit {
            debug!(
                section = i + 1,
                size, limit, "Numbered section exceeds limit; using generic segmentation"
            );
            return None;
        }
        chunks.push(chunk);
    }
    Some(chunks)
}
