// phimask-core/src/resolver.rs
//! Reconciles candidate spans from all detectors into include/exclude decisions.
//!
//! Detectors are applied strictly in declaration order against one document's
//! stores. Ordinary detectors are first-come-first-served: an exclude
//! candidate touching confirmed-safe text is rejected, and an include
//! candidate touching PHI is rejected, so earlier detectors win ties.
//! Contextual detectors are a correction pass: they run after every other
//! detector (in their own declaration order), read the accumulated stores, and
//! always override whatever was decided on their spans. Match-all detectors
//! claim whatever the opposite decision has not already taken.
//!
//! License: MIT OR APACHE 2.0

use log::debug;

use crate::detectors::{CandidateSpan, ContextReference, Detector, DetectorKind, DetectorSet};
use crate::document::DocumentContext;
use crate::errors::PhimaskError;
use crate::records::{log_decision_debug, Decision, DecisionAction, NonPhiEntry, PhiEntry};
use crate::span_store::{Span, SpanStore};
use crate::tagging::DocumentTags;
use crate::tokenizer::is_punctuation;

/// How a detector's candidates interact with earlier decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Policy {
    FirstComeFirstServed,
    Override,
    ClaimRemainder,
}

fn policy(kind: &DetectorKind) -> Policy {
    match kind {
        DetectorKind::Pattern { .. }
        | DetectorKind::LexicalSet { .. }
        | DetectorKind::PartOfSpeech { .. }
        | DetectorKind::NamedEntity { .. } => Policy::FirstComeFirstServed,
        DetectorKind::Contextual { .. } => Policy::Override,
        DetectorKind::MatchAll => Policy::ClaimRemainder,
    }
}

/// Candidate spans of one detector, ready for resolution.
pub type DetectorCandidates<'a> = (&'a Detector, Vec<CandidateSpan<'a>>);

/// Applies a detector set to documents.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'d> {
    detectors: &'d DetectorSet,
    mask_char: char,
}

impl<'d> Resolver<'d> {
    /// `mask_char` is never treated as punctuation when computing the
    /// unresolved-text reference of `all` contextual detectors.
    pub fn new(detectors: &'d DetectorSet, mask_char: char) -> Self {
        Self { detectors, mask_char }
    }

    /// Candidates of every non-contextual detector, in declaration order.
    /// Pure with respect to the document; safe to compute ahead of time.
    /// `tags` must have been computed for `text`.
    pub fn find_candidates(&self, text: &str, tags: &DocumentTags) -> Result<Vec<DetectorCandidates<'d>>, PhimaskError> {
        tags.ensure_source(text)?;
        self.detectors
            .iter()
            .filter(|d| !d.is_contextual())
            .map(|d| Ok((d, d.find_candidates(text, tags)?)))
            .collect()
    }

    /// Runs every detector over `text` and returns the resolved document.
    pub fn resolve(&self, text: &str, tags: &DocumentTags) -> Result<DocumentContext, PhimaskError> {
        let candidates = self.find_candidates(text, tags)?;
        self.resolve_candidates(text, candidates)
    }

    /// Resolves precomputed candidates (as returned by [`Self::find_candidates`]),
    /// then runs the contextual detectors against the accumulated state.
    pub fn resolve_candidates(
        &self,
        text: &str,
        candidates: Vec<DetectorCandidates<'d>>,
    ) -> Result<DocumentContext, PhimaskError> {
        let mut ctx = DocumentContext::new(text);

        for (detector, spans) in &candidates {
            self.apply(&mut ctx, detector, spans)?;
        }

        for detector in self.detectors.iter().filter(|d| d.is_contextual()) {
            let reference = self.reference_for(&ctx, detector)?;
            let spans = detector.find_contextual_candidates(text, &reference)?;
            self.apply(&mut ctx, detector, &spans)?;
        }

        debug!(
            "Resolved document: {} PHI record(s), {} safe record(s), {} decision(s).",
            ctx.phi.len(),
            ctx.non_phi.len(),
            ctx.decisions.len()
        );
        Ok(ctx)
    }

    /// Applies one detector's candidates to the document.
    pub fn apply(
        &self,
        ctx: &mut DocumentContext,
        detector: &Detector,
        candidates: &[CandidateSpan<'_>],
    ) -> Result<(), PhimaskError> {
        for candidate in candidates {
            let span = candidate.span;
            match policy(&detector.kind) {
                Policy::Override => self.override_span(ctx, detector, span)?,
                Policy::FirstComeFirstServed => self.claim_if_free(ctx, detector, span)?,
                Policy::ClaimRemainder => {
                    let taken = if detector.exclude { &ctx.include } else { &ctx.exclude };
                    let gaps: Vec<Span> = taken
                        .complement(ctx.text(), |_| false)
                        .into_iter()
                        .filter_map(|gap| clip(gap, span))
                        .collect();
                    for gap in gaps {
                        self.claim(ctx, detector, gap, false)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn claim_if_free(&self, ctx: &mut DocumentContext, detector: &Detector, span: Span) -> Result<(), PhimaskError> {
        let opposite = if detector.exclude { &ctx.include } else { &ctx.exclude };
        if opposite.overlaps(span.start, span.stop) {
            let action = if detector.exclude { DecisionAction::RejectedSafe } else { DecisionAction::RejectedPhi };
            self.record(ctx, detector, span, action);
            return Ok(());
        }
        self.claim(ctx, detector, span, false)
    }

    fn override_span(&self, ctx: &mut DocumentContext, detector: &Detector, span: Span) -> Result<(), PhimaskError> {
        if detector.exclude {
            ctx.include.subtract(span.start, span.stop);
            ctx.carve_non_phi(span);
        } else {
            ctx.exclude.subtract(span.start, span.stop);
            for store in ctx.categories.values_mut() {
                store.subtract(span.start, span.stop);
            }
            ctx.carve_phi(span);
        }
        self.claim(ctx, detector, span, true)
    }

    /// Records `span` on the detector's side and logs the decision.
    fn claim(&self, ctx: &mut DocumentContext, detector: &Detector, span: Span, forced: bool) -> Result<(), PhimaskError> {
        let text = ctx.slice(span);
        if detector.exclude {
            ctx.exclude.insert_merging(span.start, span.stop)?;
            ctx.category_mut(&detector.category).insert_merging(span.start, span.stop)?;
            ctx.phi.push(PhiEntry { span, text, category: detector.category.clone() });
        } else {
            ctx.include.insert_merging(span.start, span.stop)?;
            ctx.non_phi.push(NonPhiEntry { span, text, detector: detector.title.clone() });
        }
        let action = match (detector.exclude, forced) {
            (true, false) => DecisionAction::Excluded,
            (false, false) => DecisionAction::Included,
            (true, true) => DecisionAction::OverrideExcluded,
            (false, true) => DecisionAction::OverrideIncluded,
        };
        self.record(ctx, detector, span, action);
        Ok(())
    }

    fn record(&self, ctx: &mut DocumentContext, detector: &Detector, span: Span, action: DecisionAction) {
        let decision = Decision {
            detector: detector.title.clone(),
            category: detector.category.clone(),
            span,
            action,
        };
        log_decision_debug(module_path!(), &decision, &ctx.slice(span));
        ctx.decisions.push(decision);
    }

    fn reference_for(&self, ctx: &DocumentContext, detector: &Detector) -> Result<SpanStore, PhimaskError> {
        let DetectorKind::Contextual { reference, .. } = &detector.kind else {
            return Ok(SpanStore::new());
        };
        match reference {
            ContextReference::All => {
                let mut store = SpanStore::new();
                for gap in ctx.include.complement(ctx.text(), |c| is_punctuation(c, self.mask_char)) {
                    store.insert(gap.start, gap.stop, true)?;
                }
                Ok(store)
            }
            ContextReference::Category(name) => {
                if !self.detectors.iter().any(|d| &d.category == name) {
                    return Err(PhimaskError::UnknownCategoryReference {
                        detector: detector.title.clone(),
                        category: name.clone(),
                    });
                }
                Ok(ctx.category(name).cloned().unwrap_or_default())
            }
        }
    }
}

fn clip(span: Span, within: Span) -> Option<Span> {
    let start = span.start.max(within.start);
    let stop = span.stop.min(within.stop);
    (start < stop).then_some(Span { start, stop })
}
