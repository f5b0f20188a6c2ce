// phimask-core/src/audit.rs
//! Append-only JSON-lines audit trail of resolution decisions.
//!
//! One line is written per decision. Matched text never reaches the log:
//! each record carries a SHA-256 digest of the category and text instead, so
//! two runs can be compared without exposing PHI.
//!
//! License: MIT OR APACHE 2.0

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::Utc;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::DocumentContext;
use crate::errors::PhimaskError;
use crate::records::{text_digest, DecisionAction};

/// A single audit line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// RFC3339 timestamp.
    pub timestamp: String,
    pub run_id: String,
    pub document_id: String,
    pub detector: String,
    pub category: String,
    pub action: DecisionAction,
    pub start: usize,
    pub stop: usize,
    pub text_hash: String,
}

pub struct AuditLog<W: Write> {
    writer: W,
    run_id: String,
    written: usize,
}

impl AuditLog<BufWriter<std::fs::File>> {
    /// Opens (or creates) `path` for appending.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PhimaskError> {
        let file = OpenOptions::new().create(true).append(true).open(path.as_ref())?;
        info!("Audit log opened at {}", path.as_ref().display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> AuditLog<W> {
    /// Wraps `writer` with a fresh run id.
    pub fn new(writer: W) -> Self {
        Self::with_run_id(writer, Uuid::new_v4().to_string())
    }

    pub fn with_run_id(writer: W, run_id: impl Into<String>) -> Self {
        Self { writer, run_id: run_id.into(), written: 0 }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Number of records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn append(&mut self, record: &AuditRecord) -> Result<(), PhimaskError> {
        let line = serde_json::to_string(record).map_err(|e| PhimaskError::Serialization(e.to_string()))?;
        writeln!(self.writer, "{}", line)?;
        self.written += 1;
        Ok(())
    }

    /// Writes one record per decision of `doc` and flushes. Returns the
    /// number of records written.
    pub fn record_document(&mut self, document_id: &str, doc: &DocumentContext) -> Result<usize, PhimaskError> {
        let timestamp = Utc::now().to_rfc3339();
        for decision in doc.decisions() {
            let record = AuditRecord {
                timestamp: timestamp.clone(),
                run_id: self.run_id.clone(),
                document_id: document_id.to_string(),
                detector: decision.detector.clone(),
                category: decision.category.clone(),
                action: decision.action,
                start: decision.span.start,
                stop: decision.span.stop,
                text_hash: text_digest(&decision.category, &doc.slice(decision.span)),
            };
            self.append(&record)?;
        }
        self.writer.flush()?;
        debug!("Audited {} decision(s) for document '{}'.", doc.decisions().len(), document_id);
        Ok(doc.decisions().len())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::{Detector, DetectorKind, DetectorSet};
    use crate::patterns::compiler::get_or_compile_pattern;
    use crate::resolver::Resolver;
    use crate::tagging::DocumentTags;

    fn resolved(text: &str) -> DocumentContext {
        let set = DetectorSet::new(vec![Detector::new(
            "ssn",
            true,
            Some("SSN".to_string()),
            DetectorKind::Pattern { regex: get_or_compile_pattern("ssn", r"\d{3}-\d{2}-\d{4}").unwrap() },
        )])
        .unwrap();
        Resolver::new(&set, '*').resolve(text, &DocumentTags::untagged(text)).unwrap()
    }

    #[test]
    fn test_records_are_json_lines_without_raw_text() {
        let doc = resolved("ssn 123-45-6789 and 987-65-4321");
        let mut log = AuditLog::with_run_id(Vec::new(), "run-1");
        assert_eq!(log.record_document("doc-7", &doc).unwrap(), 2);
        assert_eq!(log.written(), 2);

        let out = String::from_utf8(log.into_inner()).unwrap();
        assert!(!out.contains("123-45-6789"));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: AuditRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.run_id, "run-1");
        assert_eq!(first.document_id, "doc-7");
        assert_eq!(first.action, DecisionAction::Excluded);
        assert_eq!((first.start, first.stop), (4, 15));
        assert_eq!(first.text_hash, text_digest("SSN", "123-45-6789"));
    }

    #[test]
    fn test_new_generates_uuid_run_id() {
        let log = AuditLog::new(Vec::new());
        assert!(Uuid::parse_str(log.run_id()).is_ok());
    }

    #[test]
    fn test_open_appends_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let doc = resolved("000-00-0000");

        AuditLog::open(&path).unwrap().record_document("a", &doc).unwrap();
        AuditLog::open(&path).unwrap().record_document("b", &doc).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
