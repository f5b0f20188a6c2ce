// phimask-core/src/records.rs
//! Provenance records produced while resolving a document.
//!
//! [`PhiEntry`] and [`NonPhiEntry`] are the permanent audit trail of what was
//! redacted and what was confirmed safe. [`Decision`] is the finer-grained log
//! of every candidate the resolver looked at, including rejected ones. Helpers
//! at the bottom keep PHI out of debug logs unless explicitly allowed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use log::debug;
use lazy_static::lazy_static;
use sha2::{Sha256, Digest};
use hex;

use crate::span_store::Span;
use crate::tokenizer::Token;

lazy_static! {
    /// Whether matched text may appear verbatim in debug logs.
    static ref PHI_DEBUG_ALLOWED: bool = {
        std::env::var("PHIMASK_ALLOW_DEBUG_PHI")
            .map(|s| s.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    };
}

/// A span recorded as PHI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhiEntry {
    pub span: Span,
    pub text: String,
    pub category: String,
}

/// A span recorded as confirmed safe, with the detector that claimed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonPhiEntry {
    pub span: Span,
    pub text: String,
    pub detector: String,
}

/// Either kind of resolved record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedRecord {
    Phi(PhiEntry),
    NonPhi(NonPhiEntry),
}

/// What the resolver did with one candidate span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    Excluded,
    Included,
    /// An exclude candidate touched text already confirmed safe.
    RejectedSafe,
    /// An include candidate touched text already marked PHI.
    RejectedPhi,
    /// A contextual detector forced the span to PHI.
    OverrideExcluded,
    /// A contextual detector forced the span to safe.
    OverrideIncluded,
}

impl DecisionAction {
    pub fn is_rejection(self) -> bool {
        matches!(self, DecisionAction::RejectedSafe | DecisionAction::RejectedPhi)
    }
}

/// One entry of a document's decision log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub detector: String,
    pub category: String,
    pub span: Span,
    pub action: DecisionAction,
}

/// Number of PHI entries recorded for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    pub occurrences: usize,
    pub spans: Vec<Span>,
}

/// Per-category totals, sorted by category name.
pub fn summarize(phi: &[PhiEntry]) -> Vec<CategorySummary> {
    let mut by_category: BTreeMap<&str, Vec<Span>> = BTreeMap::new();
    for entry in phi {
        by_category.entry(entry.category.as_str()).or_default().push(entry.span);
    }
    by_category
        .into_iter()
        .map(|(category, spans)| CategorySummary {
            category: category.to_string(),
            occurrences: spans.len(),
            spans,
        })
        .collect()
}

/// A PHI token together with the tokens around it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhiContext {
    pub phi: String,
    pub context: Vec<String>,
}

/// Returns the window of up to `window` tokens on each side of `tokens[index]`.
/// The left bound is clamped at 0, the right bound at the last token; the
/// window excludes the right bound itself.
pub fn phi_context(tokens: &[Token], index: usize, window: usize) -> Option<PhiContext> {
    let phi = tokens.get(index)?;
    let left = index.saturating_sub(window);
    let right = index.saturating_add(window).min(tokens.len() - 1);
    Some(PhiContext {
        phi: phi.text.clone(),
        context: tokens[left..right].iter().map(|t| t.text.clone()).collect(),
    })
}

pub fn redact_sensitive(s: &str) -> String {
    const MAX_LEN: usize = 8;
    let len = s.chars().count();
    if len <= MAX_LEN {
        "[REDACTED]".to_string()
    } else {
        format!("[REDACTED: {} chars]", len)
    }
}

pub(crate) fn get_loggable_content(sensitive_content: &str) -> String {
    if *PHI_DEBUG_ALLOWED {
        sensitive_content.to_string()
    } else {
        redact_sensitive(sensitive_content)
    }
}

pub fn log_decision_debug(module_path: &str, decision: &Decision, text: &str) {
    debug!(
        "{} Detector '{}' [{}] {:?} [{}, {}): '{}'",
        module_path,
        decision.detector,
        decision.category,
        decision.action,
        decision.span.start,
        decision.span.stop,
        get_loggable_content(text)
    );
}

/// SHA-256 hex digest of a matched text, tied to its category.
pub fn text_digest(category: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(category.as_bytes());
    hasher.update(b":");
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn entry(category: &str, start: usize, stop: usize) -> PhiEntry {
        PhiEntry { span: Span { start, stop }, text: String::new(), category: category.to_string() }
    }

    #[test]
    fn test_redact_sensitive_short_string() {
        assert_eq!(redact_sensitive("abc"), "[REDACTED]".to_string());
    }

    #[test]
    fn test_redact_sensitive_long_string() {
        assert_eq!(redact_sensitive("123456789"), "[REDACTED: 9 chars]".to_string());
    }

    #[test]
    fn test_summarize_groups_by_category() {
        let summary = summarize(&[entry("NAME", 0, 4), entry("MRN", 9, 14), entry("NAME", 5, 8)]);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].category, "MRN");
        assert_eq!(summary[1].category, "NAME");
        assert_eq!(summary[1].occurrences, 2);
    }

    #[test]
    fn test_phi_context_window_is_clamped() {
        let tokens = tokenize("a b c d");
        let ctx = phi_context(&tokens, 2, 2).unwrap();
        assert_eq!(ctx.phi, "b");
        assert_eq!(ctx.context, vec!["a", " ", "b", " "]);

        let end = phi_context(&tokens, 6, 10).unwrap();
        assert_eq!(end.phi, "d");
        assert_eq!(end.context.len(), 6);
        assert!(phi_context(&tokens, 7, 1).is_none());
    }

    #[test]
    fn test_phi_context_huge_window() {
        let tokens = tokenize("a b c");
        let ctx = phi_context(&tokens, 2, usize::MAX).unwrap();
        assert_eq!(ctx.context, vec!["a", " ", "b", " "]);
    }

    #[test]
    fn test_text_digest_depends_on_category() {
        assert_ne!(text_digest("NAME", "Ann"), text_digest("CITY", "Ann"));
        assert_eq!(text_digest("NAME", "Ann").len(), 64);
    }

    #[test]
    fn test_resolved_record_serializes_with_kind() {
        let record = ResolvedRecord::Phi(entry("DATE", 1, 3));
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"kind\":\"phi\""));
    }
}
