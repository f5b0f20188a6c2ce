// phimask-core/src/engine.rs
//! The redaction engine: a validated detector set plus rendering options.
//!
//! `PhiEngine` is immutable once built and can be shared between threads
//! (see [`crate::batch`]); every call creates its own [`DocumentContext`], so
//! no state leaks from one document into another.
//!
//! License: MIT OR APACHE 2.0

use std::path::Path;

use anyhow::Result;
use log::info;

use crate::config::{EngineOptions, FilterConfig, PatternDatabase};
use crate::detectors::DetectorSet;
use crate::document::DocumentContext;
use crate::errors::PhimaskError;
use crate::render::{renderer_for, OutputFormat};
use crate::resolver::{DetectorCandidates, Resolver};
use crate::tagging::DocumentTags;

#[derive(Debug, Clone)]
pub struct PhiEngine {
    detectors: DetectorSet,
    options: EngineOptions,
}

impl PhiEngine {
    /// Creates an engine with default options.
    pub fn new(detectors: DetectorSet) -> Self {
        Self::with_options(detectors, EngineOptions::default())
    }

    pub fn with_options(detectors: DetectorSet, options: EngineOptions) -> Self {
        info!(
            "PhiEngine initialized with {} detector(s), mask '{}'.",
            detectors.len(),
            options.mask_char
        );
        Self { detectors, options }
    }

    /// Builds an engine from a parsed filter file, resolving keywords against
    /// the file's inline pattern database.
    pub fn from_config(config: &FilterConfig) -> Result<Self, PhimaskError> {
        Ok(Self::with_options(config.build_detector_set()?, config.options.clone()))
    }

    /// Like [`Self::from_config`], with keywords resolved against `db` instead.
    pub fn from_config_with(config: &FilterConfig, db: &PatternDatabase) -> Result<Self, PhimaskError> {
        Ok(Self::with_options(config.build_detector_set_with(db)?, config.options.clone()))
    }

    /// Loads a filter file from disk and builds the engine.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = FilterConfig::load_from_file(path)?;
        Ok(Self::from_config(&config)?)
    }

    pub fn detectors(&self) -> &DetectorSet {
        &self.detectors
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.detectors, self.options.mask_char)
    }

    /// Candidate spans of every non-contextual detector, in declaration order.
    pub fn find_candidates(&self, text: &str, tags: &DocumentTags) -> Result<Vec<DetectorCandidates<'_>>, PhimaskError> {
        self.resolver().find_candidates(text, tags)
    }

    /// Runs every detector over `text` and returns the resolved state.
    pub fn resolve(&self, text: &str, tags: &DocumentTags) -> Result<DocumentContext, PhimaskError> {
        self.resolver().resolve(text, tags)
    }

    /// Resolves `text` and renders it in `format`.
    pub fn redact(&self, text: &str, tags: &DocumentTags, format: OutputFormat) -> Result<String, PhimaskError> {
        let doc = self.resolve(text, tags)?;
        Ok(self.render(&doc, format))
    }

    /// Renders an already resolved document.
    pub fn render(&self, doc: &DocumentContext, format: OutputFormat) -> String {
        renderer_for(format, &self.options).render(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::{Detector, DetectorKind};
    use crate::patterns::compiler::get_or_compile_pattern;

    fn engine() -> PhiEngine {
        let detectors = DetectorSet::new(vec![
            Detector::new(
                "digits",
                true,
                Some("ID".to_string()),
                DetectorKind::Pattern { regex: get_or_compile_pattern("digits", r"\d+").unwrap() },
            ),
            Detector::new("rest", false, None, DetectorKind::MatchAll),
        ])
        .unwrap();
        PhiEngine::new(detectors)
    }

    #[test]
    fn test_redact_mask() {
        let text = "id 123, ok";
        let out = engine().redact(text, &DocumentTags::untagged(text), OutputFormat::Mask).unwrap();
        assert_eq!(out, "id ***, ok");
    }

    #[test]
    fn test_find_candidates_skips_nothing_non_contextual() {
        let text = "a 1 b 22";
        let e = engine();
        let candidates = e.find_candidates(text, &DocumentTags::untagged(text)).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].1.len(), 2);
        assert_eq!(candidates[1].1.len(), 1);
    }

    #[test]
    fn test_each_call_starts_fresh() {
        let e = engine();
        let first = e.resolve("7", &DocumentTags::untagged("7")).unwrap();
        let second = e.resolve("ab", &DocumentTags::untagged("ab")).unwrap();
        assert_eq!(first.phi().len(), 1);
        assert!(second.phi().is_empty());
        assert!(second.exclude().is_empty());
    }
}
