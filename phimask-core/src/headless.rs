// phimask-core/src/headless.rs
//! `headless.rs`
//! Convenience wrapper for one-shot, non-interactive redaction of a string.
//!
//! License: MIT OR APACHE 2.0

use crate::config::EngineOptions;
use crate::detectors::DetectorSet;
use crate::engine::PhiEngine;
use crate::errors::PhimaskError;
use crate::render::OutputFormat;
use crate::tagging::DocumentTags;

/// Fully redacts `content` with `detectors` and renders it in `format`.
///
/// # Arguments
///
/// * `detectors` - The ordered, validated detector set.
/// * `options` - Rendering options (mask glyph, markup root).
/// * `content` - The document text.
/// * `tags` - Precomputed tag streams; `None` tokenizes the text untagged.
/// * `format` - Mask or markup output.
pub fn headless_redact_string(
    detectors: DetectorSet,
    options: EngineOptions,
    content: &str,
    tags: Option<DocumentTags>,
    format: OutputFormat,
) -> Result<String, PhimaskError> {
    let engine = PhiEngine::with_options(detectors, options);
    let tags = tags.unwrap_or_else(|| DocumentTags::untagged(content));
    engine.redact(content, &tags, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::{Detector, DetectorKind};
    use crate::patterns::compiler::get_or_compile_pattern;

    fn email_detectors() -> DetectorSet {
        DetectorSet::new(vec![
            Detector::new(
                "email",
                true,
                Some("EMAIL".to_string()),
                DetectorKind::Pattern {
                    regex: get_or_compile_pattern("email", r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[A-Za-z]{2,}").unwrap(),
                },
            ),
            Detector::new("keep", false, None, DetectorKind::MatchAll),
        ])
        .unwrap()
    }

    #[test]
    fn test_headless_redact_string_mask() {
        let content = "Mail ann@example.org today";
        let options = EngineOptions { mask_char: 'x', ..EngineOptions::default() };
        let out = headless_redact_string(email_detectors(), options, content, None, OutputFormat::Mask).unwrap();
        assert_eq!(out, "Mail xxx@xxxxxxx.xxx today");
    }

    #[test]
    fn test_headless_redact_string_markup() {
        let content = "ann@example.org";
        let out = headless_redact_string(email_detectors(), EngineOptions::default(), content, None, OutputFormat::Markup)
            .unwrap();
        assert!(out.contains("<EMAIL id=\"P0\" start=\"0\" end=\"15\" text=\"ann@example.org\""));
    }
}
