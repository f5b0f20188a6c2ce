// phimask-core/src/detectors/pattern.rs
//! Pattern-driven detectors: literal patterns, contextual patterns, match-all.

use regex::Regex;

use crate::detectors::ContextDirection;
use crate::span_store::{Span, SpanStore};
use crate::tokenizer::{tokenize_at, OffsetMapper};

/// Code-point spans of every non-overlapping, non-empty match, left to right.
fn match_spans(regex: &Regex, text: &str) -> Vec<(Span, usize, usize)> {
    let mapper = OffsetMapper::new(text);
    regex
        .find_iter(text)
        .filter(|m| !m.is_empty())
        .map(|m| {
            let span = Span {
                start: mapper.to_char(m.start()),
                stop: mapper.to_char(m.end()),
            };
            (span, m.start(), m.end())
        })
        .collect()
}

pub fn match_pattern(regex: &Regex, text: &str) -> Vec<Span> {
    match_spans(regex, text).into_iter().map(|(span, _, _)| span).collect()
}

/// One span over the whole document; nothing for an empty document.
pub fn match_all(text: &str) -> Vec<Span> {
    let len = text.chars().count();
    if len == 0 {
        return Vec::new();
    }
    vec![Span { start: 0, stop: len }]
}

/// Matches whose boundaries touch `reference` as `direction` requires, split
/// into their word tokens.
///
/// A match touches on the left when its start is the stop of a reference span,
/// and on the right when its stop is the start of one.
pub fn match_contextual(
    regex: &Regex,
    direction: ContextDirection,
    text: &str,
    reference: &SpanStore,
) -> Vec<Span> {
    let mut accepted = Vec::new();
    for (span, byte_start, byte_end) in match_spans(regex, text) {
        let left = reference.contains_stop(span.start);
        let right = reference.contains_start(span.stop);
        if !direction.accepts(left, right) {
            continue;
        }
        accepted.extend(
            tokenize_at(&text[byte_start..byte_end], span.start)
                .into_iter()
                .filter(|t| t.is_word())
                .map(|t| Span { start: t.start, stop: t.stop }),
        );
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regex(p: &str) -> Regex {
        Regex::new(p).unwrap()
    }

    #[test]
    fn test_match_pattern_left_to_right() {
        let spans = match_pattern(&regex(r"\d{5}"), "MRN 12345 and 67890");
        assert_eq!(spans, vec![Span { start: 4, stop: 9 }, Span { start: 14, stop: 19 }]);
    }

    #[test]
    fn test_match_pattern_uses_code_points() {
        let spans = match_pattern(&regex(r"\d+"), "Zoë 42");
        assert_eq!(spans, vec![Span { start: 4, stop: 6 }]);
    }

    #[test]
    fn test_match_pattern_skips_empty_matches() {
        assert!(match_pattern(&regex(r"x*"), "abc").is_empty());
    }

    #[test]
    fn test_match_all() {
        assert_eq!(match_all("héllo"), vec![Span { start: 0, stop: 5 }]);
        assert!(match_all("").is_empty());
    }

    #[test]
    fn test_contextual_left_requires_reference_stop() {
        // "Smith" excluded at [4, 9); " Jr" starts at 9.
        let mut reference = SpanStore::new();
        reference.insert(4, 9, true).unwrap();
        let text = "Dr. Smith Jr. came";
        let spans = match_contextual(&regex(r" Jr\."), ContextDirection::Left, text, &reference);
        assert_eq!(spans, vec![Span { start: 10, stop: 12 }]);

        let none = match_contextual(&regex(r"came"), ContextDirection::Left, text, &reference);
        assert!(none.is_empty());
    }

    #[test]
    fn test_contextual_splits_match_into_words() {
        let mut reference = SpanStore::new();
        reference.insert(0, 3, true).unwrap();
        let text = "Ann Lee-Ross";
        let spans = match_contextual(&regex(r" Lee-Ross"), ContextDirection::LeftOrRight, text, &reference);
        assert_eq!(spans, vec![Span { start: 4, stop: 7 }, Span { start: 8, stop: 12 }]);
    }

    #[test]
    fn test_contextual_left_and_right() {
        let mut reference = SpanStore::new();
        reference.insert(0, 2, true).unwrap();
        reference.insert(5, 7, true).unwrap();
        let text = "12 / 34";
        let both = match_contextual(&regex(r" / "), ContextDirection::LeftAndRight, text, &reference);
        assert!(both.is_empty(), "separator has no word tokens");

        let mut reference = SpanStore::new();
        reference.insert(0, 1, true).unwrap();
        reference.insert(5, 6, true).unwrap();
        let text = "a bb c";
        let spans = match_contextual(&regex(r" bb "), ContextDirection::LeftAndRight, text, &reference);
        assert_eq!(spans, vec![Span { start: 2, stop: 4 }]);
        let right_only = match_contextual(&regex(r" bb"), ContextDirection::LeftAndRight, text, &reference);
        assert!(right_only.is_empty());
    }
}
