//! Packer property tests: deterministic pseudo-random documents checked
//! against the packing invariants.
//!
//! Tests verify:
//! - No chunk exceeds the hard limit, with or without banners
//! - Non-whitespace content survives packing in order
//! - Fenced code blocks are never split across chunks
//! - Chunk counts stay within [min_chunks, max_chunks] when feasible
//! - Numbered sections map one-to-one onto chunks
//! - An oversized code block becomes an in-band notice

use composition::kinds::EXPLANATION_SECTIONS;
use composition::{pack, ContentKind, PackOptions, SectionLayout};

const WORDS: &[&str] = &[
    "packet", "resolver", "cache", "handshake", "latency", "socket", "kernel", "buffer",
    "route", "token", "cipher", "session", "frame", "queue", "policy", "audit", "lab",
    "segment", "window", "timeout", "a", "the", "of", "and", "to", "in",
];

/// Small deterministic generator so failures are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn range(&mut self, lo: usize, hi: usize) -> usize {
        lo + (self.next() as usize) % (hi - lo + 1)
    }

    fn word(&mut self) -> &'static str {
        WORDS[self.range(0, WORDS.len() - 1)]
    }
}

fn sentence(rng: &mut Lcg) -> String {
    let n = rng.range(6, 18);
    let words: Vec<&str> = (0..n).map(|_| rng.word()).collect();
    format!("{}.", words.join(" "))
}

fn code_block(rng: &mut Lcg, lines: usize) -> String {
    let body: Vec<String> = (0..lines)
        .map(|i| format!("run --step {} {} {}", i, rng.word(), rng.word()))
        .collect();
    format!("```bash\n{}\n```", body.join("\n"))
}

/// A document of `sections` headed sections mixing prose, bullets and code.
fn document(seed: u64, sections: usize) -> String {
    let mut rng = Lcg(seed);
    let mut out = Vec::new();
    for s in 0..sections {
        out.push(format!("## Section {}", s + 1));
        for _ in 0..rng.range(1, 3) {
            let para: Vec<String> = (0..rng.range(2, 6)).map(|_| sentence(&mut rng)).collect();
            out.push(para.join(" "));
        }
        if rng.range(0, 1) == 1 {
            let bullets: Vec<String> = (0..rng.range(3, 6))
                .map(|_| format!("- {}", sentence(&mut rng)))
                .collect();
            out.push(bullets.join("\n"));
        }
        if rng.range(0, 2) == 2 {
            let lines = rng.range(2, 6);
            out.push(code_block(&mut rng, lines));
        }
    }
    out.join("\n\n")
}

fn non_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn options(hard_limit: usize) -> PackOptions {
    PackOptions {
        hard_limit,
        target_size: hard_limit * 9 / 10,
        min_chunk_chars: hard_limit / 6,
        max_chunks: 64,
        ..Default::default()
    }
}

// ── Property: every chunk fits the hard limit ───────────────────────

#[test]
fn prop_chunks_never_exceed_hard_limit() {
    for seed in 1..=25 {
        let doc = document(seed, 8);
        for hard_limit in [200, 500, 1000, 4000] {
            for banner in [false, true] {
                let opts = options(hard_limit).with_banner(banner);
                let chunks = pack(&doc, &opts).unwrap();
                assert!(!chunks.is_empty());
                for chunk in &chunks {
                    assert!(
                        chunk.len() <= hard_limit,
                        "seed {seed} limit {hard_limit}: chunk {} has {} chars",
                        chunk.index,
                        chunk.len()
                    );
                    assert!(!chunk.text.trim().is_empty());
                }
            }
        }
    }
}

// ── Property: content survives in order ─────────────────────────────

#[test]
fn prop_content_reconstructs_in_order() {
    for seed in 1..=25 {
        let doc = document(seed, 6);
        for hard_limit in [300, 800, 4000] {
            let chunks = pack(&doc, &options(hard_limit)).unwrap();
            let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
            assert_eq!(
                non_whitespace(&joined),
                non_whitespace(&doc),
                "seed {seed} limit {hard_limit}"
            );
            for (i, chunk) in chunks.iter().enumerate() {
                assert_eq!(chunk.index, i);
            }
        }
    }
}

// ── Property: code fences stay balanced per chunk ───────────────────

#[test]
fn prop_code_blocks_are_never_split() {
    for seed in 1..=25 {
        let doc = document(seed, 6);
        let chunks = pack(&doc, &options(400)).unwrap();
        for chunk in &chunks {
            let fences = chunk
                .text
                .lines()
                .filter(|l| l.trim_start().starts_with("```"))
                .count();
            assert_eq!(fences % 2, 0, "seed {seed}: unbalanced fence in {:?}", chunk.text);
        }
    }
}

// ── Property: chunk count bounds ────────────────────────────────────

#[test]
fn prop_chunk_count_within_bounds() {
    for seed in 1..=20 {
        let doc = document(seed, 10);
        let opts = PackOptions {
            hard_limit: 1500,
            target_size: 1400,
            min_chunk_chars: 300,
            min_chunks: 3,
            max_chunks: 40,
            ..Default::default()
        };
        let chunks = pack(&doc, &opts).unwrap();
        assert!(chunks.len() <= 40, "seed {seed}: {} chunks", chunks.len());
        if doc.chars().count() > opts.hard_limit {
            assert!(chunks.len() >= 3, "seed {seed}: {} chunks", chunks.len());
        }
    }
}

#[test]
fn short_document_is_a_single_chunk() {
    let chunks = pack("A short answer.\n\n- one\n- two", &PackOptions::default()).unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, "A short answer.\n\n- one\n- two");
}

// ── Structural override ─────────────────────────────────────────────

fn explanation_doc(titles: &[&str]) -> String {
    let mut rng = Lcg(7);
    titles
        .iter()
        .enumerate()
        .map(|(i, title)| {
            let body: Vec<String> = (0..3).map(|_| sentence(&mut rng)).collect();
            format!("## {}. {}\n{}", i + 1, title, body.join(" "))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[test]
fn numbered_sections_become_one_chunk_each() {
    let doc = explanation_doc(EXPLANATION_SECTIONS);
    let opts = ContentKind::Explanation
        .spec()
        .pack_options(&PackOptions::default());
    let chunks = pack(&doc, &opts).unwrap();

    assert_eq!(chunks.len(), EXPLANATION_SECTIONS.len());
    for (i, (chunk, title)) in chunks.iter().zip(EXPLANATION_SECTIONS).enumerate() {
        assert!(chunk.text.starts_with(&format!("**{}. {}**\n\n", i + 1, title)));
        assert_eq!(chunk.text.matches(title).count(), 1, "heading duplicated");
    }
}

#[test]
fn override_substitutes_missing_titles() {
    let doc = "## 1.\nalpha body\n\n## 2. Custom\nbeta body";
    let opts = PackOptions::default().with_sections(SectionLayout {
        titles: &["First", "Second"],
    });
    let chunks = pack(doc, &opts).unwrap();
    assert_eq!(chunks[0].text, "**1. First**\n\nalpha body");
    assert_eq!(chunks[1].text, "**2. Custom**\n\nbeta body");
}

#[test]
fn incomplete_sections_use_generic_packing() {
    let doc = explanation_doc(&EXPLANATION_SECTIONS[..4]);
    let opts = ContentKind::Explanation
        .spec()
        .pack_options(&PackOptions::default());
    let chunks = pack(&doc, &opts).unwrap();
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].text.starts_with("## 1. Overview"));
}

// ── Oversized atomic span ───────────────────────────────────────────

#[test]
fn oversized_code_block_is_replaced_by_notice() {
    let block = format!("```text\n{}\n```", "x".repeat(4990));
    assert!(block.chars().count() > 5000);
    let doc = format!("Intro before the dump.\n\n{block}\n\nOutro after the dump.");

    let chunks = pack(&doc, &PackOptions::default()).unwrap();
    assert!(chunks.iter().all(|c| c.len() <= 4000));
    assert!(chunks.iter().any(|c| c.text.contains("[code block omitted")));
    assert!(chunks.iter().all(|c| !c.text.contains("xxxxxxxxxx")));
    let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
    assert!(joined.contains("Intro before the dump."));
    assert!(joined.contains("Outro after the dump."));
}
