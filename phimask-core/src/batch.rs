// phimask-core/src/batch.rs
//! Concurrent redaction of independent documents.
//!
//! Each document is resolved on the tokio blocking pool with its own
//! [`crate::document::DocumentContext`]. Outcomes come back in input order,
//! and one document failing never affects the others.
//!
//! License: MIT OR APACHE 2.0

use std::sync::Arc;

use log::{debug, warn};

use crate::engine::PhiEngine;
use crate::errors::PhimaskError;
use crate::render::OutputFormat;
use crate::tagging::DocumentTags;

/// A document queued for redaction. Documents without tags are tokenized
/// untagged.
#[derive(Debug, Clone)]
pub struct DocumentInput {
    pub id: String,
    pub text: String,
    pub tags: Option<DocumentTags>,
}

impl DocumentInput {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), tags: None }
    }

    pub fn with_tags(mut self, tags: DocumentTags) -> Self {
        self.tags = Some(tags);
        self
    }
}

#[derive(Debug)]
pub struct DocumentOutcome {
    pub id: String,
    pub result: Result<String, PhimaskError>,
}

/// Redacts every document in `inputs` concurrently.
pub async fn redact_batch(
    engine: Arc<PhiEngine>,
    inputs: Vec<DocumentInput>,
    format: OutputFormat,
) -> Vec<DocumentOutcome> {
    debug!("Dispatching batch of {} document(s).", inputs.len());

    let handles: Vec<_> = inputs
        .into_iter()
        .map(|input| {
            let engine = Arc::clone(&engine);
            let id = input.id.clone();
            let handle = tokio::task::spawn_blocking(move || {
                let tags = input.tags.unwrap_or_else(|| DocumentTags::untagged(&input.text));
                engine.redact(&input.text, &tags, format)
            });
            (id, handle)
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for (id, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(PhimaskError::Fatal(format!("redaction task for '{}' failed: {}", id, e))),
        };
        if let Err(e) = &result {
            warn!("Document '{}' failed: {}", id, e);
        }
        outcomes.push(DocumentOutcome { id, result });
    }
    outcomes
}
