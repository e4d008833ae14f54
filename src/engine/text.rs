//! Keyword matching over a page's text layer
//!
//! Locations and lengths are counted in characters, not bytes, so they
//! can be handed to hosts that index strings by UTF-16/char units.

use crate::search::{SearchOptions, SearchQuery};

/// A match inside one page: `(location, length)` in characters
pub type TextSpan = (usize, usize);

/// Find every occurrence of the query in `text`, in reading order.
pub fn find_matches(text: &str, query: &SearchQuery) -> Vec<TextSpan> {
    let needle: Vec<char> = query.keywords.chars().collect();
    if needle.is_empty() {
        return Vec::new();
    }

    let haystack: Vec<char> = text.chars().collect();
    if needle.len() > haystack.len() {
        return Vec::new();
    }

    let case_sensitive = query.options.contains(SearchOptions::CASE_SENSITIVE);
    let whole_word = query.options.contains(SearchOptions::MATCH_WHOLE_WORD);
    let overlapping = query.options.contains(SearchOptions::CONSECUTIVE);

    let mut matches = Vec::new();
    let mut start = 0;
    while start + needle.len() <= haystack.len() {
        let window = &haystack[start..start + needle.len()];
        let hit = window
            .iter()
            .zip(&needle)
            .all(|(a, b)| chars_equal(*a, *b, case_sensitive))
            && (!whole_word || is_word_bounded(&haystack, start, needle.len()));

        if hit {
            matches.push((start, needle.len()));
            start += if overlapping { 1 } else { needle.len() };
        } else {
            start += 1;
        }
    }
    matches
}

/// Slice `length` characters starting at `location`, clamped to the text.
pub fn slice_chars(text: &str, location: usize, length: usize) -> String {
    text.chars().skip(location).take(length).collect()
}

fn chars_equal(a: char, b: char, case_sensitive: bool) -> bool {
    if case_sensitive {
        a == b
    } else {
        a == b || a.to_lowercase().eq(b.to_lowercase())
    }
}

fn is_word_bounded(haystack: &[char], start: usize, len: usize) -> bool {
    let before = start == 0 || !is_word_char(haystack[start - 1]);
    let end = start + len;
    let after = end >= haystack.len() || !is_word_char(haystack[end]);
    before && after
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
