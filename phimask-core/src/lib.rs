// phimask-core/src/lib.rs
//! # PhiMask Core Library
//!
//! `phimask-core` locates and redacts protected health information (PHI) in
//! free text. An ordered list of configured detectors proposes candidate
//! spans; the resolver reconciles them, in detector order, into a final
//! include/exclude decision per character; and a renderer emits either a
//! masked copy of the text or an annotated markup document.
//!
//! The library is I/O free apart from configuration loading and the optional
//! audit log. Linguistic tagging (part-of-speech, named entities) is a
//! boundary: callers supply tag streams through [`TokenTagger`] or
//! [`DocumentTags`].
//!
//! ## Modules
//!
//! * `span_store`: Ordered, non-overlapping interval store with merge and coverage queries.
//! * `tokenizer`: The shared tokenization rule and byte/code-point offset mapping.
//! * `tagging`: The tagger boundary and per-document tag streams.
//! * `patterns`: Pattern compilation with a process-wide cache.
//! * `detectors`: Detector kinds and candidate generation.
//! * `config`: YAML filter files and the pattern database.
//! * `document`: Per-document resolution state.
//! * `resolver`: Detector-ordered reconciliation of candidate spans.
//! * `render`: Mask and markup output.
//! * `records`: PHI records, decisions, summaries and PHI-safe logging helpers.
//! * `engine`: `PhiEngine`, the detector set plus options.
//! * `audit`: JSON-lines audit trail.
//! * `batch`: Concurrent redaction of many documents.
//! * `headless`: One-shot convenience wrapper.
//!
//! ## Usage Example
//!
//! ```rust
//! use phimask_core::{DocumentTags, FilterConfig, OutputFormat, PhiEngine};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = FilterConfig::from_yaml_str(r#"
//! filters:
//!   - title: names
//!     type: set
//!     keyword: names.first
//!     exclude: true
//!     category: NAME
//!   - title: mrn
//!     type: regex
//!     keyword: ids.mrn
//!     exclude: true
//!     category: MRN
//!   - title: everything_else
//!     type: match_all
//!     exclude: false
//! patterns:
//!   regex:
//!     ids:
//!       mrn: '\d{5}'
//!   set:
//!     names:
//!       first: [john, smith]
//! "#)?;
//!     let engine = PhiEngine::from_config(&config)?;
//!
//!     let text = "John Smith has MRN 12345 today";
//!     let masked = engine.redact(text, &DocumentTags::untagged(text), OutputFormat::Mask)?;
//!     assert_eq!(masked, "**** ***** has MRN ***** today");
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Document processing returns [`PhimaskError`]; configuration loading uses
//! `anyhow::Result` with context. Configuration errors name the offending
//! detector.
//!
//! ---
//! License: MIT OR APACHE 2.0

pub mod audit;
pub mod batch;
pub mod config;
pub mod detectors;
pub mod document;
pub mod engine;
pub mod errors;
pub mod headless;
pub mod patterns;
pub mod records;
pub mod render;
pub mod resolver;
pub mod span_store;
pub mod tagging;
pub mod tokenizer;

/// Re-exports the custom error type for clear error reporting.
pub use errors::PhimaskError;

/// Re-exports the interval store.
pub use span_store::{Span, SpanStore};

/// Re-exports configuration types.
pub use config::{build_detector, DetectorConfig, EngineOptions, FilterConfig, PatternDatabase, PatternNode};

/// Re-exports detector types.
pub use detectors::{ContextDirection, ContextReference, Detector, DetectorKind, DetectorSet, DEFAULT_CATEGORY};

/// Re-exports the tagging boundary.
pub use tagging::{DocumentTags, PrecomputedTagger, TokenTagger};
pub use tokenizer::{is_punctuation, tokenize, Token, TokenKind};

/// Re-exports resolution and rendering.
pub use document::DocumentContext;
pub use resolver::Resolver;
pub use render::{renderer_for, MarkupRenderer, MaskRenderer, OutputFormat, Renderer};
pub use engine::PhiEngine;

/// Re-exports records, decisions and reporting helpers.
pub use records::{
    phi_context, redact_sensitive, summarize, CategorySummary, Decision, DecisionAction, NonPhiEntry, PhiContext,
    PhiEntry, ResolvedRecord,
};

pub use audit::{AuditLog, AuditRecord};
pub use batch::{redact_batch, DocumentInput, DocumentOutcome};
pub use headless::headless_redact_string;

/// Re-exports pattern compilation for advanced usage.
pub use patterns::compiler::{compile_pattern, get_or_compile_pattern, MAX_PATTERN_LENGTH};
