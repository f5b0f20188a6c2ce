//! errors.rs - Custom error types for the phimask-core library.
//!
//! This module defines a structured error enum for the library. Configuration
//! errors always carry the title of the detector that caused them so callers
//! can report the offending entry instead of silently skipping it.
//!
//! License: MIT OR APACHE 2.0

use thiserror::Error;

/// This enum represents all possible error types in the `phimask-core` library.
///
/// `OverlapConflict` is the only recoverable variant: it tells the caller that a
/// strict insertion was rejected and the store was left untouched. Everything
/// else aborts processing of the current document.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PhimaskError {
    #[error("Span [{start}, {stop}) overlaps an existing span")]
    OverlapConflict { start: usize, stop: usize },

    #[error("No span starts at index {start}")]
    NotFound { start: usize },

    #[error("Invalid span [{start}, {stop}): start must be lower than stop")]
    InvalidSpan { start: usize, stop: usize },

    #[error("Detector '{detector}': unsupported detector kind '{kind}'")]
    UnsupportedDetectorKind { detector: String, kind: String },

    #[error("Detector '{detector}': context_filter references undeclared category '{category}'")]
    UnknownCategoryReference { detector: String, category: String },

    #[error("Detector '{detector}': keyword '{keyword}' not found in pattern database")]
    UnknownKeyword { detector: String, keyword: String },

    #[error("Detector '{detector}': missing required field '{field}'")]
    MissingField { detector: String, field: String },

    #[error("Detector '{detector}': invalid value for '{field}': {reason}")]
    InvalidField { detector: String, field: String, reason: String },

    #[error("Detector '{0}' is declared more than once")]
    DuplicateDetector(String),

    #[error("Detector '{detector}' requires {stream} tags but none were supplied")]
    MissingTags { detector: String, stream: String },

    #[error("{stream} tag stream has {tags} tags for {tokens} tokens")]
    TagLengthMismatch { stream: String, tokens: usize, tags: usize },

    #[error("Tag streams were computed for a different text ({tagged} code points tagged, document has {text})")]
    TagSourceMismatch { tagged: usize, text: usize },

    #[error("Failed to compile pattern for detector '{0}': {1}")]
    PatternCompilation(String, regex::Error),

    #[error("Detector '{0}': pattern length ({1}) exceeds maximum allowed ({2})")]
    PatternLengthExceeded(String, usize, usize),

    #[error("Failed to serialize audit record: {0}")]
    Serialization(String),

    #[error("An unexpected I/O error occurred: {0}")]
    IoError(#[from] std::io::Error),

    #[error("A critical system error occurred: {0}")]
    AnyhowWrapper(#[from] anyhow::Error),

    #[error("A fatal error occurred: {0}")]
    Fatal(String),
}

impl PhimaskError {
    /// True for the typed "reject this candidate" result of a strict insertion.
    pub fn is_overlap_conflict(&self) -> bool {
        matches!(self, PhimaskError::OverlapConflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_name_the_detector() {
        let err = PhimaskError::UnknownCategoryReference {
            detector: "mrn_context".to_string(),
            category: "MRN".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("mrn_context"));
        assert!(msg.contains("MRN"));
        assert!(!err.is_overlap_conflict());
    }

    #[test]
    fn test_overlap_conflict_is_recoverable() {
        let err = PhimaskError::OverlapConflict { start: 2, stop: 5 };
        assert!(err.is_overlap_conflict());
        assert_eq!(err.to_string(), "Span [2, 5) overlaps an existing span");
    }
}
