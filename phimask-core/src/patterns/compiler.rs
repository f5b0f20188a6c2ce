//! compiler.rs - Compiles and caches detector patterns.
//!
//! Pattern databases are shared by every document a process handles, so
//! compilation is a one-time setup step: each distinct pattern string is
//! compiled once and kept in a global, thread-safe cache. Detectors hold an
//! `Arc` to the compiled form.
//!
//! License: MIT OR APACHE 2.0

use log::debug;
use regex::{Regex, RegexBuilder};
use lazy_static::lazy_static;
use std::sync::{Arc, RwLock};
use std::collections::HashMap;

use crate::errors::PhimaskError;

/// Maximum allowed length for a pattern string. Clinical date and name
/// patterns are long alternations, hence the generous bound.
pub const MAX_PATTERN_LENGTH: usize = 64 * 1024;

/// Upper bound on the compiled program size of a single pattern.
const COMPILED_SIZE_LIMIT: usize = 64 * (1 << 20);

lazy_static! {
    /// Compiled patterns keyed by their source text.
    static ref COMPILED_PATTERN_CACHE: RwLock<HashMap<String, Arc<Regex>>> = RwLock::new(HashMap::new());
}

/// Compiles `pattern` for the detector titled `title`, bypassing the cache.
pub fn compile_pattern(title: &str, pattern: &str) -> Result<Regex, PhimaskError> {
    if pattern.len() > MAX_PATTERN_LENGTH {
        return Err(PhimaskError::PatternLengthExceeded(
            title.to_string(),
            pattern.len(),
            MAX_PATTERN_LENGTH,
        ));
    }

    RegexBuilder::new(pattern)
        .size_limit(COMPILED_SIZE_LIMIT)
        .build()
        .map_err(|e| PhimaskError::PatternCompilation(title.to_string(), e))
}

/// Gets a compiled pattern from the cache or compiles and caches it.
pub fn get_or_compile_pattern(title: &str, pattern: &str) -> Result<Arc<Regex>, PhimaskError> {
    {
        let cache = COMPILED_PATTERN_CACHE.read().unwrap_or_else(|e| e.into_inner());
        if let Some(regex) = cache.get(pattern) {
            debug!("Serving compiled pattern for '{}' from cache.", title);
            return Ok(Arc::clone(regex));
        }
    }

    let compiled = Arc::new(compile_pattern(title, pattern)?);
    log::debug!(
        target: "phimask_core::patterns",
        "Pattern for '{}' compiled successfully.",
        title
    );

    let mut cache = COMPILED_PATTERN_CACHE.write().unwrap_or_else(|e| e.into_inner());
    let entry = cache.entry(pattern.to_string()).or_insert(compiled);
    Ok(Arc::clone(entry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_returns_same_instance() {
        let a = get_or_compile_pattern("zip", r"\b\d{5}\b").unwrap();
        let b = get_or_compile_pattern("zip_again", r"\b\d{5}\b").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_invalid_pattern_names_detector() {
        let err = get_or_compile_pattern("broken", r"(unclosed").unwrap_err();
        match err {
            PhimaskError::PatternCompilation(title, _) => assert_eq!(title, "broken"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_pattern_length_limit() {
        let long = "a".repeat(MAX_PATTERN_LENGTH + 1);
        assert!(matches!(
            compile_pattern("long", &long),
            Err(PhimaskError::PatternLengthExceeded(_, _, MAX_PATTERN_LENGTH))
        ));
    }
}
