// phimask-core/src/tokenizer.rs
//! The shared tokenization rule and byte/code-point offset mapping.
//!
//! Every detector that works on tokens (lexical sets, part-of-speech,
//! named-entity and the re-tokenization of contextual matches) goes through
//! [`tokenize`], so the offsets it produces are the ones every downstream span
//! is derived from. Text is first split into whitespace and non-whitespace
//! runs; each non-whitespace run is then split again on non-alphanumeric
//! boundaries. Offsets are a running code-point cursor advanced by each
//! token's length, so no character is ever skipped or counted twice.
//!
//! License: MIT OR APACHE 2.0

/// What a token consists of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A maximal run of alphanumeric characters.
    Word,
    /// A maximal run of whitespace from the original text.
    Whitespace,
    /// A maximal run of non-alphanumeric, non-whitespace characters.
    Punctuation,
}

/// A token with its code-point offsets into the source text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub text: String,
    pub start: usize,
    pub stop: usize,
    pub kind: TokenKind,
}

impl Token {
    /// The form handed to external taggers: punctuation is blanked to spaces
    /// of the same length so tag streams stay aligned with token offsets.
    pub fn tagger_form(&self) -> String {
        match self.kind {
            TokenKind::Punctuation => " ".repeat(self.stop - self.start),
            _ => self.text.clone(),
        }
    }

    /// Lowercased token with every non-alphanumeric character removed.
    pub fn normalized(&self) -> String {
        normalize_word(&self.text)
    }

    pub fn is_word(&self) -> bool {
        self.kind == TokenKind::Word
    }
}

/// Characters the mask renderer copies through: anything that is neither
/// alphanumeric nor the mask glyph itself.
pub fn is_punctuation(c: char, mask_char: char) -> bool {
    !c.is_alphanumeric() && c != mask_char
}

pub(crate) fn normalize_word(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn classify(c: char) -> TokenKind {
    if c.is_whitespace() {
        TokenKind::Whitespace
    } else if c.is_alphanumeric() {
        TokenKind::Word
    } else {
        TokenKind::Punctuation
    }
}

/// Splits `text` into contiguous tokens covering every character exactly once.
pub fn tokenize(text: &str) -> Vec<Token> {
    tokenize_at(text, 0)
}

/// Like [`tokenize`], with offsets shifted by `base`.
pub fn tokenize_at(text: &str, base: usize) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut cursor = base;
    let mut current = String::new();
    let mut current_kind: Option<TokenKind> = None;

    for c in text.chars() {
        let kind = classify(c);
        if current_kind.is_some_and(|k| k != kind) {
            let len = current.chars().count();
            tokens.push(Token {
                text: std::mem::take(&mut current),
                start: cursor,
                stop: cursor + len,
                kind: current_kind.unwrap_or(kind),
            });
            cursor += len;
        }
        current.push(c);
        current_kind = Some(kind);
    }

    if let Some(kind) = current_kind {
        let len = current.chars().count();
        tokens.push(Token {
            text: current,
            start: cursor,
            stop: cursor + len,
            kind,
        });
    }
    tokens
}

/// The token strings handed to a tagging collaborator, in order.
pub fn tagger_input(tokens: &[Token]) -> Vec<String> {
    tokens.iter().map(Token::tagger_form).collect()
}

/// Maps byte offsets (as produced by `regex`) to code-point offsets.
#[derive(Debug)]
pub struct OffsetMapper {
    /// Byte offset of each character, plus a trailing entry for the text end.
    char_starts: Vec<usize>,
}

impl OffsetMapper {
    pub fn new(text: &str) -> Self {
        let mut char_starts: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        char_starts.push(text.len());
        Self { char_starts }
    }

    /// Code-point index of the character starting at `byte_index`. Offsets
    /// inside a multi-byte character resolve to the following character.
    pub fn to_char(&self, byte_index: usize) -> usize {
        match self.char_starts.binary_search(&byte_index) {
            Ok(i) => i,
            Err(i) => i.min(self.char_starts.len() - 1),
        }
    }

    /// Number of characters in the mapped text.
    pub fn char_len(&self) -> usize {
        self.char_starts.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_tokenize_splits_on_whitespace_and_punctuation() {
        let tokens = tokenize("Dr. Smith,  MRN:42");
        assert_eq!(
            texts(&tokens),
            vec!["Dr", ".", " ", "Smith", ",", "  ", "MRN", ":", "42"]
        );
    }

    #[test]
    fn test_tokenize_offsets_are_contiguous() {
        let text = "Seen 03/14 by Ana-María.";
        let tokens = tokenize(text);
        let mut expected = 0;
        for t in &tokens {
            assert_eq!(t.start, expected);
            assert_eq!(t.stop - t.start, t.text.chars().count());
            expected = t.stop;
        }
        assert_eq!(expected, text.chars().count());
    }

    #[test]
    fn test_tokenize_counts_code_points() {
        let tokens = tokenize("José Núñez");
        assert_eq!(tokens[2].text, "Núñez");
        assert_eq!((tokens[2].start, tokens[2].stop), (5, 10));
    }

    #[test]
    fn test_tokenize_empty_text() {
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_tokenize_at_shifts_offsets() {
        let tokens = tokenize_at("Bob Lee", 10);
        assert_eq!((tokens[2].start, tokens[2].stop), (14, 17));
    }

    #[test]
    fn test_tagger_form_blanks_punctuation() {
        let tokens = tokenize("a--b");
        assert_eq!(tagger_input(&tokens), vec!["a", "  ", "b"]);
    }

    #[test]
    fn test_normalized() {
        let tokens = tokenize("SMITH");
        assert_eq!(tokens[0].normalized(), "smith");
    }

    #[test]
    fn test_offset_mapper_multibyte() {
        let text = "né 12";
        let mapper = OffsetMapper::new(text);
        let byte_of_digits = text.find("12").unwrap();
        assert_eq!(mapper.to_char(byte_of_digits), 3);
        assert_eq!(mapper.to_char(text.len()), 5);
        assert_eq!(mapper.char_len(), 5);
    }
}
