//! Composition: deterministic building blocks for long-form answers
//!
//! This library provides:
//! - A content-kind registry mapping each kind to its profile, token hints,
//!   prompt rules and validator
//! - The quality gate that turns a draft into a [`QualityReport`]
//! - The chunk packer that splits a final document into transport-sized chunks
//!   without breaking fenced code blocks or required section structure
//! - The [`Deliverer`] seam that sends chunks as one primary reply plus follow-ups
//!
//! Nothing in this crate performs network IO. Everything except
//! [`delivery::deliver`] is a pure function of its inputs.
//!
//! # Usage
//!
//! ```rust
//! use composition::{evaluate, pack, ContentKind, GateContext, GenerationRequest, PackOptions};
//!
//! let request = GenerationRequest::new(ContentKind::Quiz, "5 questions on TCP handshakes");
//! let ctx = GateContext::from_request(&request);
//! let report = evaluate(request.kind, "# Quiz\n1. What is SYN?", &ctx);
//! assert!(!report.pass);
//!
//! let chunks = pack("short answer", &PackOptions::default()).unwrap();
//! assert_eq!(chunks.len(), 1);
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod delivery;
pub mod gate;
pub mod kinds;
pub mod packer;
pub mod prompts;
pub mod request;
pub mod text;

pub use delivery::{deliver, Deliverer};
pub use gate::{evaluate, GateContext, QualityIssue, QualityReport};
pub use kinds::{lookup, ContentKind, ContentTypeProfile, KindSpec, TokenHints};
pub use packer::{pack, Chunk, PackError, PackOptions, SectionLayout};
pub use request::{GenerationRequest, RequestParams};
