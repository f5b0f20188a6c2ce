//! Pattern handling for detectors.
//!
//! This module turns the pattern strings referenced by detector configuration
//! into compiled regular expressions, sharing one compiled instance per
//! distinct pattern across the whole process.

pub mod compiler;
