// phimask-core/src/detectors/lexical.rs
//! Token-driven detectors: lexical sets, part-of-speech and named-entity tags.
//!
//! All three walk the shared tokenization left to right and skip tokens with
//! no alphanumeric content. Tag streams come from [`DocumentTags`], aligned
//! one tag per token.

use std::collections::HashSet;

use crate::detectors::Detector;
use crate::errors::PhimaskError;
use crate::span_store::Span;
use crate::tagging::DocumentTags;
use crate::tokenizer::Token;

fn span_of(token: &Token) -> Span {
    Span { start: token.start, stop: token.stop }
}

fn require_pos<'t>(detector: &Detector, tags: &'t DocumentTags) -> Result<&'t [String], PhimaskError> {
    tags.pos().ok_or_else(|| PhimaskError::MissingTags {
        detector: detector.title.clone(),
        stream: "part-of-speech".to_string(),
    })
}

/// Tokens whose normalized or raw form is in `members`. With a non-empty
/// `pos` set, only tokens tagged with one of those tags are considered.
pub fn match_set(
    detector: &Detector,
    members: &HashSet<String>,
    pos: &HashSet<String>,
    tags: &DocumentTags,
) -> Result<Vec<Span>, PhimaskError> {
    let pos_tags = if pos.is_empty() { None } else { Some(require_pos(detector, tags)?) };

    let mut spans = Vec::new();
    for (i, token) in tags.tokens().iter().enumerate() {
        let normalized = token.normalized();
        if normalized.is_empty() {
            continue;
        }
        if let Some(pos_tags) = pos_tags {
            if !pos.contains(&pos_tags[i]) {
                continue;
            }
        }
        if members.contains(&normalized) || members.contains(&token.text) {
            spans.push(span_of(token));
        }
    }
    Ok(spans)
}

/// Tokens whose part-of-speech tag is in `pos`.
pub fn match_pos(detector: &Detector, pos: &HashSet<String>, tags: &DocumentTags) -> Result<Vec<Span>, PhimaskError> {
    let pos_tags = require_pos(detector, tags)?;
    Ok(tags
        .tokens()
        .iter()
        .zip(pos_tags)
        .filter(|(token, tag)| !token.normalized().is_empty() && pos.contains(tag.as_str()))
        .map(|(token, _)| span_of(token))
        .collect())
}

/// Tokens carrying an entity tag in `entities`; an empty set accepts any entity.
pub fn match_entities(
    detector: &Detector,
    entities: &HashSet<String>,
    tags: &DocumentTags,
) -> Result<Vec<Span>, PhimaskError> {
    let ner = tags.ner().ok_or_else(|| PhimaskError::MissingTags {
        detector: detector.title.clone(),
        stream: "named-entity".to_string(),
    })?;

    Ok(tags
        .tokens()
        .iter()
        .zip(ner)
        .filter_map(|(token, tag)| {
            let tag = tag.as_deref()?;
            let wanted = entities.is_empty() || entities.contains(tag);
            (wanted && !token.normalized().is_empty()).then(|| span_of(token))
        })
        .collect())
}
