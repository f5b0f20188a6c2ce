// phimask-core/src/document.rs
//! Per-document resolution state.
//!
//! A [`DocumentContext`] is created once per document before any detector
//! runs, mutated only by the resolver in detector order, and read by the
//! renderers afterwards. Nothing in it is shared between documents.

use std::collections::BTreeMap;

use crate::records::{Decision, NonPhiEntry, PhiEntry, ResolvedRecord};
use crate::span_store::{Span, SpanStore};

#[derive(Debug, Clone)]
pub struct DocumentContext {
    text: String,
    chars: Vec<char>,
    pub(crate) include: SpanStore,
    pub(crate) exclude: SpanStore,
    pub(crate) categories: BTreeMap<String, SpanStore>,
    pub(crate) phi: Vec<PhiEntry>,
    pub(crate) non_phi: Vec<NonPhiEntry>,
    pub(crate) decisions: Vec<Decision>,
}

impl DocumentContext {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let chars = text.chars().collect();
        Self {
            text,
            chars,
            include: SpanStore::new(),
            exclude: SpanStore::new(),
            categories: BTreeMap::new(),
            phi: Vec::new(),
            non_phi: Vec::new(),
            decisions: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Length in code points.
    pub fn char_len(&self) -> usize {
        self.chars.len()
    }

    /// The text covered by `span`, clamped to the document.
    pub fn slice(&self, span: Span) -> String {
        slice_chars(&self.chars, span)
    }

    /// Spans confirmed safe.
    pub fn include(&self) -> &SpanStore {
        &self.include
    }

    /// Spans marked PHI.
    pub fn exclude(&self) -> &SpanStore {
        &self.exclude
    }

    /// PHI spans of one category, if any were recorded.
    pub fn category(&self, name: &str) -> Option<&SpanStore> {
        self.categories.get(name)
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &SpanStore)> {
        self.categories.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn category_mut(&mut self, name: &str) -> &mut SpanStore {
        self.categories.entry(name.to_string()).or_default()
    }

    /// PHI records in recording order.
    pub fn phi(&self) -> &[PhiEntry] {
        &self.phi
    }

    /// Confirmed-safe records in recording order.
    pub fn non_phi(&self) -> &[NonPhiEntry] {
        &self.non_phi
    }

    /// Every decision the resolver made, in order.
    pub fn decisions(&self) -> &[Decision] {
        &self.decisions
    }

    /// Trims PHI records so none of them covers `cut`. A record straddling
    /// `cut` keeps the parts on either side.
    pub(crate) fn carve_phi(&mut self, cut: Span) {
        let chars = &self.chars;
        self.phi = std::mem::take(&mut self.phi)
            .into_iter()
            .flat_map(|entry| {
                remainders(entry.span, cut).into_iter().map(move |span| PhiEntry {
                    span,
                    text: slice_chars(chars, span),
                    category: entry.category.clone(),
                })
            })
            .collect();
    }

    /// Trims confirmed-safe records so none of them covers `cut`.
    pub(crate) fn carve_non_phi(&mut self, cut: Span) {
        let chars = &self.chars;
        self.non_phi = std::mem::take(&mut self.non_phi)
            .into_iter()
            .flat_map(|entry| {
                remainders(entry.span, cut).into_iter().map(move |span| NonPhiEntry {
                    span,
                    text: slice_chars(chars, span),
                    detector: entry.detector.clone(),
                })
            })
            .collect();
    }

    /// PHI records followed by confirmed-safe records.
    pub fn records(&self) -> Vec<ResolvedRecord> {
        self.phi
            .iter()
            .cloned()
            .map(ResolvedRecord::Phi)
            .chain(self.non_phi.iter().cloned().map(ResolvedRecord::NonPhi))
            .collect()
    }
}

fn slice_chars(chars: &[char], span: Span) -> String {
    let stop = span.stop.min(chars.len());
    let start = span.start.min(stop);
    chars[start..stop].iter().collect()
}

/// The parts of `span` left after removing `cut`, in order.
fn remainders(span: Span, cut: Span) -> Vec<Span> {
    if span.stop <= cut.start || span.start >= cut.stop {
        return vec![span];
    }
    let mut parts = Vec::with_capacity(2);
    if span.start < cut.start {
        parts.push(Span { start: span.start, stop: cut.start });
    }
    if span.stop > cut.stop {
        parts.push(Span { start: cut.stop, stop: span.stop });
    }
    parts
}
