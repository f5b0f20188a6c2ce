// phimask-core/src/tagging.rs
//! Boundary to external linguistic taggers.
//!
//! Part-of-speech and named-entity tagging are black-box services: a sequence
//! of tokens goes in, one tag per token comes out. The core never computes tags
//! itself. Tags are gathered once per document into [`DocumentTags`] before any
//! detector runs, so detectors consume them as plain data.
//!
//! License: MIT OR APACHE 2.0

use anyhow::Result;
use log::debug;

use crate::errors::PhimaskError;
use crate::tokenizer::{tagger_input, tokenize, Token};

/// A tagging service. Implementations must return exactly one tag per token.
pub trait TokenTagger: Send + Sync {
    /// Tags `tokens` in order.
    fn tag(&self, tokens: &[&str]) -> Result<Vec<String>>;
}

/// Fixed tags for every token, useful when a caller already has tag output
/// from an earlier run.
#[derive(Debug, Clone)]
pub struct PrecomputedTagger {
    tags: Vec<String>,
}

impl PrecomputedTagger {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { tags: tags.into_iter().map(Into::into).collect() }
    }
}

impl TokenTagger for PrecomputedTagger {
    fn tag(&self, _tokens: &[&str]) -> Result<Vec<String>> {
        Ok(self.tags.clone())
    }
}

/// NER tags meaning "no entity".
const UNTAGGED_ENTITY: &[&str] = &["", "O"];

/// Tokens of one document plus the tag streams computed for them.
#[derive(Debug, Clone)]
pub struct DocumentTags {
    tokens: Vec<Token>,
    pos: Option<Vec<String>>,
    ner: Option<Vec<Option<String>>>,
}

impl DocumentTags {
    /// Tokenizes `text` without any tag streams.
    pub fn untagged(text: &str) -> Self {
        Self { tokens: tokenize(text), pos: None, ner: None }
    }

    /// Tokenizes `text` and runs the supplied taggers over the tokens.
    pub fn from_taggers(
        text: &str,
        pos_tagger: Option<&dyn TokenTagger>,
        ner_tagger: Option<&dyn TokenTagger>,
    ) -> Result<Self, PhimaskError> {
        let mut tags = Self::untagged(text);
        let input = tagger_input(&tags.tokens);
        let input: Vec<&str> = input.iter().map(String::as_str).collect();

        if let Some(tagger) = pos_tagger {
            let pos = tagger.tag(&input)?;
            tags = tags.with_pos(pos)?;
        }
        if let Some(tagger) = ner_tagger {
            let ner = tagger.tag(&input)?;
            tags = tags.with_ner(ner)?;
        }
        debug!(
            "Tagged {} tokens (pos: {}, ner: {})",
            tags.tokens.len(),
            tags.pos.is_some(),
            tags.ner.is_some()
        );
        Ok(tags)
    }

    /// Attaches a part-of-speech stream, one tag per token.
    pub fn with_pos(mut self, pos: Vec<String>) -> Result<Self, PhimaskError> {
        check_len("part-of-speech", self.tokens.len(), pos.len())?;
        self.pos = Some(pos);
        Ok(self)
    }

    /// Attaches a named-entity stream, one tag per token. `"O"` and empty
    /// strings are stored as "no entity".
    pub fn with_ner(mut self, ner: Vec<String>) -> Result<Self, PhimaskError> {
        check_len("named-entity", self.tokens.len(), ner.len())?;
        self.ner = Some(
            ner.into_iter()
                .map(|t| if UNTAGGED_ENTITY.contains(&t.as_str()) { None } else { Some(t) })
                .collect(),
        );
        Ok(self)
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn pos(&self) -> Option<&[String]> {
        self.pos.as_deref()
    }

    pub fn ner(&self) -> Option<&[Option<String>]> {
        self.ner.as_deref()
    }

    /// Length in code points of the text these tokens were cut from.
    pub fn char_len(&self) -> usize {
        self.tokens.last().map_or(0, |t| t.stop)
    }

    /// True if the tokens reassemble exactly into `text`.
    pub fn matches_text(&self, text: &str) -> bool {
        let mut rest = text;
        for token in &self.tokens {
            match rest.strip_prefix(token.text.as_str()) {
                Some(tail) => rest = tail,
                None => return false,
            }
        }
        rest.is_empty()
    }

    /// Fails with [`PhimaskError::TagSourceMismatch`] unless these tags were
    /// computed for `text`.
    pub fn ensure_source(&self, text: &str) -> Result<(), PhimaskError> {
        if self.matches_text(text) {
            return Ok(());
        }
        Err(PhimaskError::TagSourceMismatch {
            tagged: self.char_len(),
            text: text.chars().count(),
        })
    }
}

fn check_len(stream: &str, tokens: usize, tags: usize) -> Result<(), PhimaskError> {
    if tokens != tags {
        return Err(PhimaskError::TagLengthMismatch {
            stream: stream.to_string(),
            tokens,
            tags,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UppercaseIsNoun;

    impl TokenTagger for UppercaseIsNoun {
        fn tag(&self, tokens: &[&str]) -> Result<Vec<String>> {
            Ok(tokens
                .iter()
                .map(|t| {
                    let tag = if t.chars().next().is_some_and(char::is_uppercase) { "NNP" } else { "X" };
                    tag.to_string()
                })
                .collect())
        }
    }

    #[test]
    fn test_from_taggers_aligns_streams() {
        let tags = DocumentTags::from_taggers("Ann saw Bob", Some(&UppercaseIsNoun), None).unwrap();
        assert_eq!(tags.tokens().len(), 5);
        assert_eq!(tags.pos().unwrap()[0], "NNP");
        assert_eq!(tags.pos().unwrap()[2], "X");
        assert!(tags.ner().is_none());
    }

    #[test]
    fn test_length_mismatch_is_error() {
        let err = DocumentTags::untagged("a b").with_pos(vec!["DT".to_string()]).unwrap_err();
        assert!(matches!(
            err,
            PhimaskError::TagLengthMismatch { tokens: 3, tags: 1, .. }
        ));
    }

    #[test]
    fn test_tags_know_their_source_text() {
        let tags = DocumentTags::untagged("Bob is fine");
        assert_eq!(tags.char_len(), 11);
        assert!(tags.ensure_source("Bob is fine").is_ok());
        assert!(DocumentTags::untagged("").ensure_source("").is_ok());

        let err = DocumentTags::untagged("Xx Bob xx  yy").ensure_source("Bob is fine").unwrap_err();
        assert!(matches!(err, PhimaskError::TagSourceMismatch { tagged: 13, text: 11 }));

        // Same length, different characters.
        assert!(tags.ensure_source("Bob is good").is_err());
    }

    #[test]
    fn test_outside_entity_tags_become_none() {
        let tagger = PrecomputedTagger::new(["PERSON", "O", "LOCATION"]);
        let tags = DocumentTags::from_taggers("Ann Oslo", None, Some(&tagger)).unwrap();
        let ner = tags.ner().unwrap();
        assert_eq!(ner[0].as_deref(), Some("PERSON"));
        assert_eq!(ner[1], None);
        assert_eq!(ner[2].as_deref(), Some("LOCATION"));
    }
}
