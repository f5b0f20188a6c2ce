//! Configuration management for `phimask-core`.
//!
//! This module defines the serialized form of detector declarations, the
//! pattern database their `keyword` fields point into, and the engine options
//! that shape rendering. It turns those records into validated [`Detector`]
//! values; everything after that point works on typed detectors only.
//!
//! License: MIT OR APACHE 2.0

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use log::{debug, info, warn};

use crate::detectors::{ContextDirection, ContextReference, Detector, DetectorKind, DetectorSet};
use crate::errors::PhimaskError;
use crate::patterns::compiler::get_or_compile_pattern;

/// A single detector declaration as it appears in a filter file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DetectorConfig {
    /// Unique identifier for the detector.
    pub title: String,
    /// One of `regex`, `set`, `regex_context`, `pos_matcher`, `stanford_ner`
    /// (or `ner`), `match_all`.
    #[serde(rename = "type")]
    pub kind: String,
    /// True marks PHI to redact, false marks confirmed-safe text.
    pub exclude: bool,
    /// Category bucket for exclusions; `OTHER` when absent.
    #[serde(default, alias = "phi_type")]
    pub category: Option<String>,
    /// Dot-separated path into the pattern database.
    #[serde(default)]
    pub keyword: Option<String>,
    /// Part-of-speech tags, or entity types for named-entity detectors.
    #[serde(default)]
    pub pos: Option<Vec<String>>,
    /// Context direction for contextual detectors.
    #[serde(default)]
    pub context: Option<String>,
    /// `all` or a category name, for contextual detectors.
    #[serde(default)]
    pub context_filter: Option<String>,
}

/// A node of the pattern database: a pattern, a word list, or a nested group.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PatternNode {
    Pattern(String),
    Members(Vec<String>),
    Group(BTreeMap<String, PatternNode>),
}

/// Named patterns and word sets referenced by detector `keyword`s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PatternDatabase {
    pub regex: BTreeMap<String, PatternNode>,
    pub regex_context: BTreeMap<String, PatternNode>,
    pub set: BTreeMap<String, PatternNode>,
}

impl PatternDatabase {
    /// Resolves a dot-separated keyword inside one tree.
    pub fn lookup<'a>(tree: &'a BTreeMap<String, PatternNode>, keyword: &str) -> Option<&'a PatternNode> {
        let mut parts = keyword.split('.');
        let mut node = tree.get(parts.next()?)?;
        for part in parts {
            match node {
                PatternNode::Group(children) => node = children.get(part)?,
                _ => return None,
            }
        }
        Some(node)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yml::from_str(yaml).context("Failed to parse pattern database")
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading pattern database from: {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pattern database {}", path.display()))?;
        Self::from_yaml_str(&text)
            .with_context(|| format!("Failed to parse pattern database {}", path.display()))
    }
}

/// Options that shape rendering.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Glyph substituted for each redacted character.
    pub mask_char: char,
    /// Root element name of markup output.
    pub markup_root: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            mask_char: '*',
            markup_root: "PhiMask".to_string(),
        }
    }
}

/// Top-level filter file: ordered detectors, options and an inline pattern database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FilterConfig {
    pub filters: Vec<DetectorConfig>,
    #[serde(default)]
    pub options: EngineOptions,
    #[serde(default)]
    pub patterns: PatternDatabase,
}

impl FilterConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: FilterConfig = serde_yml::from_str(yaml).context("Failed to parse filter configuration")?;
        config.warn_on_suspicious_entries();
        debug!("Parsed {} detector declaration(s).", config.filters.len());
        Ok(config)
    }

    /// Loads a filter file from disk.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading filters from: {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read filter file {}", path.display()))?;
        let config = Self::from_yaml_str(&text)
            .with_context(|| format!("Failed to parse filter file {}", path.display()))?;
        info!("Loaded {} filters from file {}.", config.filters.len(), path.display());
        Ok(config)
    }

    /// Builds the detector set against the inline pattern database.
    pub fn build_detector_set(&self) -> Result<DetectorSet, PhimaskError> {
        self.build_detector_set_with(&self.patterns)
    }

    /// Builds the detector set against an external pattern database.
    pub fn build_detector_set_with(&self, db: &PatternDatabase) -> Result<DetectorSet, PhimaskError> {
        let detectors = self
            .filters
            .iter()
            .map(|cfg| build_detector(cfg, db))
            .collect::<Result<Vec<_>, _>>()?;
        DetectorSet::new(detectors)
    }

    fn warn_on_suspicious_entries(&self) {
        let mut seen = HashSet::new();
        for cfg in &self.filters {
            if cfg.title.trim().is_empty() {
                warn!("A detector of type '{}' has an empty title.", cfg.kind);
            } else if !seen.insert(cfg.title.as_str()) {
                warn!("Detector title '{}' appears more than once.", cfg.title);
            }
        }
    }
}

fn missing(cfg: &DetectorConfig, field: &str) -> PhimaskError {
    PhimaskError::MissingField {
        detector: cfg.title.clone(),
        field: field.to_string(),
    }
}

fn invalid(cfg: &DetectorConfig, field: &str, reason: impl Into<String>) -> PhimaskError {
    PhimaskError::InvalidField {
        detector: cfg.title.clone(),
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn keyword_node<'a>(
    cfg: &DetectorConfig,
    tree: &'a BTreeMap<String, PatternNode>,
) -> Result<&'a PatternNode, PhimaskError> {
    let keyword = cfg.keyword.as_deref().ok_or_else(|| missing(cfg, "keyword"))?;
    PatternDatabase::lookup(tree, keyword).ok_or_else(|| PhimaskError::UnknownKeyword {
        detector: cfg.title.clone(),
        keyword: keyword.to_string(),
    })
}

fn pattern_of<'a>(cfg: &DetectorConfig, tree: &'a BTreeMap<String, PatternNode>) -> Result<&'a str, PhimaskError> {
    match keyword_node(cfg, tree)? {
        PatternNode::Pattern(p) => Ok(p.as_str()),
        _ => Err(invalid(cfg, "keyword", "expected a pattern string")),
    }
}

fn tag_set(tags: Option<&Vec<String>>) -> HashSet<String> {
    tags.map(|t| t.iter().cloned().collect()).unwrap_or_default()
}

/// Turns one declaration into a typed detector.
pub fn build_detector(cfg: &DetectorConfig, db: &PatternDatabase) -> Result<Detector, PhimaskError> {
    let kind = match cfg.kind.as_str() {
        "regex" => DetectorKind::Pattern {
            regex: get_or_compile_pattern(&cfg.title, pattern_of(cfg, &db.regex)?)?,
        },
        "set" => {
            let members = match keyword_node(cfg, &db.set)? {
                PatternNode::Members(words) => words.iter().cloned().collect(),
                PatternNode::Pattern(word) => HashSet::from([word.clone()]),
                PatternNode::Group(_) => return Err(invalid(cfg, "keyword", "expected a word list")),
            };
            DetectorKind::LexicalSet { members, pos: tag_set(cfg.pos.as_ref()) }
        }
        "regex_context" => {
            let direction: ContextDirection = cfg
                .context
                .as_deref()
                .ok_or_else(|| missing(cfg, "context"))?
                .parse()
                .map_err(|e: String| invalid(cfg, "context", e))?;
            let reference = ContextReference::from(
                cfg.context_filter.as_deref().ok_or_else(|| missing(cfg, "context_filter"))?,
            );
            DetectorKind::Contextual {
                regex: get_or_compile_pattern(&cfg.title, pattern_of(cfg, &db.regex_context)?)?,
                direction,
                reference,
            }
        }
        "pos_matcher" => {
            let pos = tag_set(cfg.pos.as_ref());
            if pos.is_empty() {
                return Err(missing(cfg, "pos"));
            }
            DetectorKind::PartOfSpeech { pos }
        }
        "stanford_ner" | "ner" => DetectorKind::NamedEntity { entities: tag_set(cfg.pos.as_ref()) },
        "match_all" => DetectorKind::MatchAll,
        other => {
            return Err(PhimaskError::UnsupportedDetectorKind {
                detector: cfg.title.clone(),
                kind: other.to_string(),
            });
        }
    };

    debug!("Built detector '{}' of kind '{}'.", cfg.title, kind.tag());
    Ok(Detector::new(cfg.title.clone(), cfg.exclude, cfg.category.clone(), kind))
}
