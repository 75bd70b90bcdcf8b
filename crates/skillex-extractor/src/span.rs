//! Span resolution primitives
//!
//! Case-insensitive literal phrase matching, greedy leftmost-longest
//! overlap filtering and character/byte offset conversion. All offsets
//! returned here are UTF-8 byte offsets on `char` boundaries.

use regex::{Regex, RegexBuilder};

use skillex_core::LabeledSpan;

use crate::EntitySpan;

// ============================================================================
// Extents
// ============================================================================

/// Anything covering a half-open `[start, end)` range of a text
pub trait Extent {
    fn start(&self) -> usize;
    fn end(&self) -> usize;
}

impl Extent for (usize, usize) {
    fn start(&self) -> usize {
        self.0
    }
    fn end(&self) -> usize {
        self.1
    }
}

impl<P> Extent for (usize, usize, P) {
    fn start(&self) -> usize {
        self.0
    }
    fn end(&self) -> usize {
        self.1
    }
}

impl Extent for LabeledSpan {
    fn start(&self) -> usize {
        self.start
    }
    fn end(&self) -> usize {
        self.end
    }
}

impl Extent for EntitySpan {
    fn start(&self) -> usize {
        self.start
    }
    fn end(&self) -> usize {
        self.end
    }
}

// ============================================================================
// Phrase matching
// ============================================================================

/// Compiled case-insensitive literal matcher for one phrase
#[derive(Debug, Clone)]
pub struct PhraseMatcher {
    regex: Regex,
    whole_word: bool,
}

impl PhraseMatcher {
    /// Match the phrase anywhere, including inside longer words.
    /// Returns `None` for an empty phrase.
    pub fn new(phrase: &str) -> Option<Self> {
        Self::build(phrase, false)
    }

    /// Match the phrase only where it is not glued to word characters
    pub fn whole_word(phrase: &str) -> Option<Self> {
        Self::build(phrase, true)
    }

    fn build(phrase: &str, whole_word: bool) -> Option<Self> {
        if phrase.is_empty() {
            return None;
        }
        let regex = RegexBuilder::new(&regex::escape(phrase))
            .case_insensitive(true)
            .build()
            .map_err(|e| tracing::debug!("Cannot compile matcher for {:?}: {}", phrase, e))
            .ok()?;
        Some(Self { regex, whole_word })
    }

    /// All occurrences in `text`, left to right, overlapping ones included
    pub fn find_in(&self, text: &str) -> Vec<(usize, usize)> {
        let mut spans = Vec::new();
        let mut pos = 0;

        while pos <= text.len() {
            let Some(mat) = self.regex.find_at(text, pos) else {
                break;
            };
            if mat.end() > mat.start()
                && (!self.whole_word || is_word_bounded(text, mat.start(), mat.end()))
            {
                spans.push((mat.start(), mat.end()));
            }
            // Restart one char after the match start to catch overlapping hits
            pos = mat.start()
                + text[mat.start()..]
                    .chars()
                    .next()
                    .map_or(1, char::len_utf8);
        }

        spans
    }
}

/// Find every case-insensitive literal occurrence of `phrase` in `text`.
///
/// Overlapping occurrences are all reported in left-to-right order. An
/// empty phrase never matches.
pub fn find_occurrences(text: &str, phrase: &str) -> Vec<(usize, usize)> {
    PhraseMatcher::new(phrase)
        .map(|matcher| matcher.find_in(text))
        .unwrap_or_default()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_word_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    let first = text[start..end].chars().next();
    let last = text[start..end].chars().next_back();

    let left_ok = match (before, first) {
        (Some(b), Some(f)) => !(is_word_char(b) && is_word_char(f)),
        _ => true,
    };
    let right_ok = match (last, after) {
        (Some(l), Some(a)) => !(is_word_char(l) && is_word_char(a)),
        _ => true,
    };
    left_ok && right_ok
}

// ============================================================================
// Overlap resolution
// ============================================================================

/// Reduce candidate spans to a non-overlapping set sorted by start.
///
/// Greedy leftmost-first: the earliest-starting span wins, the longer one
/// wins among equal starts, and anything intersecting an accepted span is
/// dropped. Exact duplicates keep the first in input order. Zero-length
/// spans are discarded.
pub fn resolve_overlaps<T: Extent>(spans: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut candidates: Vec<T> = spans
        .into_iter()
        .filter(|s| s.start() < s.end())
        .collect();

    // Stable: equal extents keep input order
    candidates.sort_by(|a, b| a.start().cmp(&b.start()).then(b.end().cmp(&a.end())));

    let mut accepted: Vec<T> = Vec::with_capacity(candidates.len());
    let mut frontier = 0usize;

    for span in candidates {
        if accepted.is_empty() || span.start() >= frontier {
            frontier = span.end();
            accepted.push(span);
        }
    }

    accepted
}

// ============================================================================
// Offset helpers
// ============================================================================

/// Convert a character-offset span to byte offsets.
///
/// Returns `None` for zero-length or out-of-bounds spans.
pub fn char_span_to_bytes(text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    if start >= end {
        return None;
    }
    let mut boundaries = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()));

    let start_byte = boundaries.nth(start)?;
    let end_byte = boundaries.nth(end - start - 1)?;
    Some((start_byte, end_byte))
}

/// Whether `[start, end)` is a non-empty, in-bounds, char-aligned byte range
pub fn is_valid_span(text: &str, start: usize, end: usize) -> bool {
    start < end
        && end <= text.len()
        && text.is_char_boundary(start)
        && text.is_char_boundary(end)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_find_occurrences_case_insensitive() {
        let text = "Python, python and PYTHON";
        let spans = find_occurrences(text, "python");
        assert_eq!(spans, vec![(0, 6), (8, 14), (19, 25)]);
    }

    #[test]
    fn test_find_occurrences_literal() {
        let text = "C++ and C# and C";
        assert_eq!(find_occurrences(text, "c++"), vec![(0, 3)]);
        assert_eq!(find_occurrences(text, "c#"), vec![(8, 10)]);
        assert!(find_occurrences("node.js", "node+js").is_empty());
        assert!(find_occurrences("nodexjs", "node.js").is_empty());
    }

    #[test]
    fn test_find_occurrences_overlapping() {
        assert_eq!(find_occurrences("aaaa", "aa"), vec![(0, 2), (1, 3), (2, 4)]);
    }

    #[test]
    fn test_find_occurrences_empty_phrase() {
        assert!(find_occurrences("anything", "").is_empty());
        assert!(find_occurrences("", "").is_empty());
    }

    #[test]
    fn test_find_occurrences_multibyte() {
        let text = "• Rust • rust";
        let spans = find_occurrences(text, "RUST");
        assert_eq!(spans.len(), 2);
        for (s, e) in spans {
            assert_eq!(text[s..e].to_lowercase(), "rust");
        }
    }

    #[test]
    fn test_whole_word_matcher() {
        let matcher = PhraseMatcher::whole_word("java").unwrap();
        assert_eq!(matcher.find_in("Java, JavaScript, java"), vec![(0, 4), (18, 22)]);

        let matcher = PhraseMatcher::whole_word("c++").unwrap();
        assert_eq!(matcher.find_in("C++ and abc++"), vec![(0, 3)]);
    }

    #[test]
    fn test_resolve_overlaps_leftmost_first() {
        let spans = vec![(3, 12, "b"), (0, 5, "a"), (13, 20, "c")];
        let resolved = resolve_overlaps(spans);
        assert_eq!(resolved, vec![(0, 5, "a"), (13, 20, "c")]);
    }

    #[test]
    fn test_resolve_overlaps_prefers_longer_on_equal_start() {
        let spans = vec![(0, 4, "short"), (0, 10, "long"), (2, 6, "inner")];
        let resolved = resolve_overlaps(spans);
        assert_eq!(resolved, vec![(0, 10, "long")]);
    }

    #[test]
    fn test_resolve_overlaps_adjacent_spans_kept() {
        let spans = vec![(5, 10, ()), (0, 5, ())];
        assert_eq!(resolve_overlaps(spans), vec![(0, 5, ()), (5, 10, ())]);
    }

    #[test]
    fn test_resolve_overlaps_duplicates_keep_first() {
        let spans = vec![(0, 6, "technical"), (0, 6, "soft")];
        assert_eq!(resolve_overlaps(spans), vec![(0, 6, "technical")]);
    }

    #[test]
    fn test_resolve_overlaps_drops_empty() {
        let spans = vec![(4, 4, ()), (7, 3, ()), (0, 2, ())];
        assert_eq!(resolve_overlaps(spans), vec![(0, 2, ())]);
    }

    #[test]
    fn test_char_span_to_bytes() {
        let text = "• Python";
        assert_eq!(char_span_to_bytes(text, 2, 8), Some((4, 10)));
        assert_eq!(&text[4..10], "Python");
        assert_eq!(char_span_to_bytes(text, 0, 1), Some((0, 3)));
        assert_eq!(char_span_to_bytes(text, 2, 9), None);
        assert_eq!(char_span_to_bytes(text, 3, 3), None);
    }

    #[test]
    fn test_is_valid_span() {
        let text = "• Python";
        assert!(is_valid_span(text, 4, 10));
        assert!(!is_valid_span(text, 1, 10));
        assert!(!is_valid_span(text, 4, 11));
        assert!(!is_valid_span(text, 4, 4));
    }

    fn arb_spans() -> impl Strategy<Value = Vec<(usize, usize, u8)>> {
        prop::collection::vec(
            (0usize..60, 1usize..15, any::<u8>()).prop_map(|(s, len, p)| (s, s + len, p)),
            0..25,
        )
    }

    proptest! {
        #[test]
        fn prop_resolved_spans_never_overlap(spans in arb_spans()) {
            let resolved = resolve_overlaps(spans);
            for pair in resolved.windows(2) {
                prop_assert!(pair[0].1 <= pair[1].0);
            }
        }

        #[test]
        fn prop_resolved_spans_are_sorted_subset(spans in arb_spans()) {
            let resolved = resolve_overlaps(spans.clone());
            for span in &resolved {
                prop_assert!(spans.contains(span));
            }
            for pair in resolved.windows(2) {
                prop_assert!(pair[0].0 < pair[1].0);
            }
        }

        #[test]
        fn prop_resolve_overlaps_idempotent(spans in arb_spans()) {
            let once = resolve_overlaps(spans);
            let twice = resolve_overlaps(once.clone());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_find_occurrences_total(
            prefix in "[a-z ]{0,12}",
            phrase in "[a-zA-Z]{1,8}",
            suffix in "[a-z ]{0,12}",
            upper in any::<bool>(),
        ) {
            let embedded = if upper { phrase.to_uppercase() } else { phrase.to_lowercase() };
            let text = format!("{prefix}{embedded}{suffix}");
            let spans = find_occurrences(&text, &phrase);
            prop_assert!(!spans.is_empty());
            for (s, e) in spans {
                prop_assert_eq!(text[s..e].to_lowercase(), phrase.to_lowercase());
            }
        }
    }
}
