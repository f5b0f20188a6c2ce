// phimask-core/src/detectors/mod.rs
//! Detectors turn a document into candidate spans.
//!
//! The variant set is closed: adding a kind means extending [`DetectorKind`],
//! and every `match` over it (candidate generation here, resolution in
//! [`crate::resolver`]) stops compiling until the new kind is handled.
//!
//! Candidate generation for every kind except the contextual one is a pure
//! function of the text and its tag streams. Contextual detectors also read
//! spans resolved earlier in the same document, so they go through
//! [`Detector::find_contextual_candidates`].
//!
//! License: MIT OR APACHE 2.0

pub mod lexical;
pub mod pattern;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::PhimaskError;
use crate::span_store::{Span, SpanStore};
use crate::tagging::DocumentTags;

/// Category used when a detector does not declare one.
pub const DEFAULT_CATEGORY: &str = "OTHER";

/// Which side(s) of a contextual match must touch a reference span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextDirection {
    Left,
    Right,
    LeftOrRight,
    LeftAndRight,
}

impl ContextDirection {
    pub fn accepts(self, left: bool, right: bool) -> bool {
        match self {
            ContextDirection::Left => left,
            ContextDirection::Right => right,
            ContextDirection::LeftOrRight => left || right,
            ContextDirection::LeftAndRight => left && right,
        }
    }
}

impl FromStr for ContextDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(ContextDirection::Left),
            "right" => Ok(ContextDirection::Right),
            "left_or_right" => Ok(ContextDirection::LeftOrRight),
            "left_and_right" => Ok(ContextDirection::LeftAndRight),
            other => Err(format!("unknown context direction '{}'", other)),
        }
    }
}

/// The span collection a contextual detector checks its matches against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextReference {
    /// Everything not yet confirmed safe, punctuation excluded.
    All,
    /// The exclude spans recorded so far for one category.
    Category(String),
}

impl From<&str> for ContextReference {
    fn from(s: &str) -> Self {
        if s == "all" {
            ContextReference::All
        } else {
            ContextReference::Category(s.to_string())
        }
    }
}

/// Variant-specific payload of a detector.
#[derive(Debug, Clone)]
pub enum DetectorKind {
    /// Every non-overlapping match of a pattern.
    Pattern { regex: Arc<Regex> },
    /// Tokens that belong to a word set, optionally restricted by POS tag.
    LexicalSet {
        members: HashSet<String>,
        pos: HashSet<String>,
    },
    /// Pattern matches accepted only next to previously resolved spans.
    Contextual {
        regex: Arc<Regex>,
        direction: ContextDirection,
        reference: ContextReference,
    },
    /// Tokens whose POS tag is in the set.
    PartOfSpeech { pos: HashSet<String> },
    /// Tokens carrying an entity tag, optionally restricted to some types.
    NamedEntity { entities: HashSet<String> },
    /// The whole document, once.
    MatchAll,
}

impl DetectorKind {
    /// The configuration tag of this kind.
    pub fn tag(&self) -> &'static str {
        match self {
            DetectorKind::Pattern { .. } => "regex",
            DetectorKind::LexicalSet { .. } => "set",
            DetectorKind::Contextual { .. } => "regex_context",
            DetectorKind::PartOfSpeech { .. } => "pos_matcher",
            DetectorKind::NamedEntity { .. } => "stanford_ner",
            DetectorKind::MatchAll => "match_all",
        }
    }
}

/// A configured detector.
#[derive(Debug, Clone)]
pub struct Detector {
    pub title: String,
    /// True marks PHI to redact, false marks text confirmed safe.
    pub exclude: bool,
    pub category: String,
    pub kind: DetectorKind,
}

/// A span proposed by one detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateSpan<'a> {
    pub span: Span,
    pub detector: &'a Detector,
}

impl PartialEq for Detector {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title
    }
}

impl fmt::Display for Detector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}, {})",
            self.title,
            self.kind.tag(),
            if self.exclude { "exclude" } else { "include" },
            self.category
        )
    }
}

impl Detector {
    pub fn new(title: impl Into<String>, exclude: bool, category: Option<String>, kind: DetectorKind) -> Self {
        Self {
            title: title.into(),
            exclude,
            category: category.unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            kind,
        }
    }

    pub fn is_contextual(&self) -> bool {
        matches!(self.kind, DetectorKind::Contextual { .. })
    }

    /// Candidate spans for every kind that depends only on the document.
    pub fn find_candidates(&self, text: &str, tags: &DocumentTags) -> Result<Vec<CandidateSpan<'_>>, PhimaskError> {
        let spans = match &self.kind {
            DetectorKind::Pattern { regex } => pattern::match_pattern(regex, text),
            DetectorKind::MatchAll => pattern::match_all(text),
            DetectorKind::LexicalSet { members, pos } => lexical::match_set(self, members, pos, tags)?,
            DetectorKind::PartOfSpeech { pos } => lexical::match_pos(self, pos, tags)?,
            DetectorKind::NamedEntity { entities } => lexical::match_entities(self, entities, tags)?,
            DetectorKind::Contextual { .. } => {
                return Err(PhimaskError::Fatal(format!(
                    "contextual detector '{}' needs resolved spans; use find_contextual_candidates",
                    self.title
                )));
            }
        };
        debug!("Detector '{}' produced {} candidate(s).", self.title, spans.len());
        Ok(self.wrap(spans))
    }

    /// Candidate spans of a contextual detector against `reference`.
    pub fn find_contextual_candidates(&self, text: &str, reference: &SpanStore) -> Result<Vec<CandidateSpan<'_>>, PhimaskError> {
        let DetectorKind::Contextual { regex, direction, .. } = &self.kind else {
            return Err(PhimaskError::Fatal(format!(
                "detector '{}' is not contextual",
                self.title
            )));
        };
        let spans = pattern::match_contextual(regex, *direction, text, reference);
        debug!("Contextual detector '{}' accepted {} span(s).", self.title, spans.len());
        Ok(self.wrap(spans))
    }

    fn wrap(&self, spans: Vec<Span>) -> Vec<CandidateSpan<'_>> {
        spans.into_iter().map(|span| CandidateSpan { span, detector: self }).collect()
    }
}

/// An ordered, validated list of detectors.
#[derive(Debug, Clone, Default)]
pub struct DetectorSet {
    detectors: Vec<Detector>,
}

impl DetectorSet {
    /// Validates titles and contextual category references.
    pub fn new(detectors: Vec<Detector>) -> Result<Self, PhimaskError> {
        let mut titles = HashSet::new();
        for d in &detectors {
            if !titles.insert(d.title.as_str()) {
                return Err(PhimaskError::DuplicateDetector(d.title.clone()));
            }
        }

        let categories: HashSet<&str> = detectors.iter().map(|d| d.category.as_str()).collect();
        for d in &detectors {
            if let DetectorKind::Contextual { reference: ContextReference::Category(category), .. } = &d.kind {
                if !categories.contains(category.as_str()) {
                    return Err(PhimaskError::UnknownCategoryReference {
                        detector: d.title.clone(),
                        category: category.clone(),
                    });
                }
            }
        }
        Ok(Self { detectors })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Detector> {
        self.detectors.iter()
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Distinct categories in declaration order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.detectors
            .iter()
            .map(|d| d.category.as_str())
            .filter(|c| seen.insert(*c))
            .collect()
    }
}

impl<'a> IntoIterator for &'a DetectorSet {
    type Item = &'a Detector;
    type IntoIter = std::slice::Iter<'a, Detector>;

    fn into_iter(self) -> Self::IntoIter {
        self.detectors.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::compiler::get_or_compile_pattern;

    fn contextual(title: &str, reference: &str) -> Detector {
        Detector::new(
            title,
            true,
            None,
            DetectorKind::Contextual {
                regex: get_or_compile_pattern(title, r"\w+").unwrap(),
                direction: ContextDirection::Left,
                reference: ContextReference::from(reference),
            },
        )
    }

    #[test]
    fn test_default_category_is_other() {
        let d = Detector::new("all", false, None, DetectorKind::MatchAll);
        assert_eq!(d.category, DEFAULT_CATEGORY);
        assert_eq!(d.kind.tag(), "match_all");
    }

    #[test]
    fn test_direction_truth_table() {
        use ContextDirection::*;
        assert!(Left.accepts(true, false));
        assert!(!Left.accepts(false, true));
        assert!(Right.accepts(false, true));
        assert!(LeftOrRight.accepts(false, true));
        assert!(!LeftAndRight.accepts(true, false));
        assert!(LeftAndRight.accepts(true, true));
        assert_eq!("left_or_right".parse::<ContextDirection>().unwrap(), LeftOrRight);
        assert!("sideways".parse::<ContextDirection>().is_err());
    }

    #[test]
    fn test_set_rejects_undeclared_category_reference() {
        let err = DetectorSet::new(vec![contextual("ctx", "DATE")]).unwrap_err();
        match err {
            PhimaskError::UnknownCategoryReference { detector, category } => {
                assert_eq!(detector, "ctx");
                assert_eq!(category, "DATE");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_set_accepts_all_and_declared_categories() {
        let dates = Detector::new("dates", true, Some("DATE".to_string()), DetectorKind::MatchAll);
        let set = DetectorSet::new(vec![dates, contextual("ctx_date", "DATE"), contextual("ctx_all", "all")]).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.categories(), vec!["DATE", "OTHER"]);
    }

    #[test]
    fn test_set_rejects_duplicate_titles() {
        let a = Detector::new("dup", false, None, DetectorKind::MatchAll);
        let b = Detector::new("dup", true, None, DetectorKind::MatchAll);
        assert!(matches!(DetectorSet::new(vec![a, b]), Err(PhimaskError::DuplicateDetector(t)) if t == "dup"));
    }

    #[test]
    fn test_contextual_detector_refuses_plain_matching() {
        let d = contextual("ctx", "all");
        let tags = DocumentTags::untagged("abc");
        assert!(d.find_candidates("abc", &tags).is_err());
    }
}
