//! Keyword search sessions
//!
//! A [`SearchSession`] is built per search call and walks the document's
//! pages in order. The per-view [`TextSearcher`] remembers the last query
//! so a result can later be highlighted by `(page, index)`.

use bitflags::bitflags;
use serde::Serialize;

use crate::engine::{EngineDocument, EngineResult};

bitflags! {
    /// Search option bitmask as sent by the host.
    ///
    /// The empty set is a case-insensitive search.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SearchOptions: u32 {
        const CASE_SENSITIVE = 1;
        const MATCH_WHOLE_WORD = 2;
        const CONSECUTIVE = 4;
    }
}

impl SearchOptions {
    pub const CASE_INSENSITIVE: SearchOptions = SearchOptions::empty();

    /// Decode a host bitmask, ignoring unknown bits
    pub fn from_host(bits: u32) -> Self {
        SearchOptions::from_bits_truncate(bits)
    }
}

/// Keyword plus options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub keywords: String,
    pub options: SearchOptions,
}

impl SearchQuery {
    pub fn new(keywords: impl Into<String>, options: SearchOptions) -> Self {
        Self {
            keywords: keywords.into(),
            options,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

/// Addressable search result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRange {
    pub page_index: usize,
    pub location: usize,
    pub length: usize,
    /// Position of this match in its page's result list
    pub text_range_index: usize,
}

impl TextRange {
    /// Widen the range by `before` characters on the left (clamped at the
    /// start of the page) and `after` characters on the right.
    pub fn expanded(&self, before: usize, after: usize) -> TextRange {
        let location = self.location.saturating_sub(before);
        let grown = self.location - location;
        TextRange {
            location,
            length: self.length + grown + after,
            ..*self
        }
    }
}

/// One search call over a document
#[derive(Debug, Clone)]
pub struct SearchSession {
    query: SearchQuery,
}

impl SearchSession {
    pub fn new(query: SearchQuery) -> Self {
        Self { query }
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    /// Run the query over every page, ordered by page then occurrence.
    pub fn run(&self, doc: &dyn EngineDocument) -> EngineResult<Vec<TextRange>> {
        if self.query.is_empty() {
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        for page_index in 0..doc.page_count() {
            let spans = doc.search_page(page_index, &self.query)?;
            results.extend(spans.into_iter().enumerate().map(|(text_range_index, (location, length))| {
                TextRange {
                    page_index,
                    location,
                    length,
                    text_range_index,
                }
            }));
        }

        tracing::debug!(
            keywords = %self.query.keywords,
            options = self.query.options.bits(),
            results = results.len(),
            "search finished"
        );
        Ok(results)
    }

    /// Read result text from the page's current text layer.
    pub fn result_text(
        doc: &dyn EngineDocument,
        page_index: usize,
        location: usize,
        length: usize,
    ) -> EngineResult<String> {
        doc.text_range(page_index, location, length)
    }
}

/// Per-view search state: the active query and the highlight cursor
#[derive(Debug, Default)]
pub struct TextSearcher {
    active: Option<SearchQuery>,
    highlight: Option<TextRange>,
}

impl TextSearcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new search, replacing any previous one.
    pub fn search(&mut self, doc: &dyn EngineDocument, query: SearchQuery) -> EngineResult<Vec<TextRange>> {
        self.highlight = None;
        if query.is_empty() {
            self.active = None;
            return Ok(Vec::new());
        }

        let session = SearchSession::new(query);
        let results = session.run(doc)?;
        self.active = Some(session.query);
        Ok(results)
    }

    /// Move the highlight to the `text_range_index`-th match on a page.
    ///
    /// The match is looked up again against the page's current text
    /// layer. Without an active search, or with an index past the page's
    /// matches, the highlight is simply cleared.
    pub fn select(
        &mut self,
        doc: &dyn EngineDocument,
        page_index: usize,
        text_range_index: usize,
    ) -> EngineResult<Option<TextRange>> {
        let Some(query) = &self.active else {
            self.highlight = None;
            return Ok(None);
        };

        let spans = doc.search_page(page_index, query)?;
        self.highlight = spans.get(text_range_index).map(|&(location, length)| TextRange {
            page_index,
            location,
            length,
            text_range_index,
        });
        Ok(self.highlight)
    }

    /// Cancel the active search. Returns false when there was nothing to clear.
    pub fn clear(&mut self) -> bool {
        let had_state = self.active.is_some() || self.highlight.is_some();
        self.active = None;
        self.highlight = None;
        had_state
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn highlight(&self) -> Option<&TextRange> {
        self.highlight.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::{MemoryDocumentData, MemoryEngine, MemoryPage};
    use crate::engine::Engine;
    use std::path::Path;

    fn open_doc() -> Box<dyn EngineDocument> {
        let engine = MemoryEngine::new();
        engine.library().insert(
            "search.pdf",
            MemoryDocumentData::new()
                .with_page(MemoryPage::a4().with_text("A PDF about pdf tools"))
                .with_page(MemoryPage::a4().with_text("nothing here"))
                .with_page(MemoryPage::a4().with_text("Last PDF page")),
        );
        engine.open(Path::new("search.pdf"), None).unwrap()
    }

    #[test]
    fn test_from_host_truncates_unknown_bits() {
        assert_eq!(SearchOptions::from_host(0), SearchOptions::CASE_INSENSITIVE);
        assert_eq!(
            SearchOptions::from_host(1 | 2 | 64),
            SearchOptions::CASE_SENSITIVE | SearchOptions::MATCH_WHOLE_WORD
        );
    }

    #[test]
    fn test_expanded_clamps_at_zero() {
        let range = TextRange {
            page_index: 0,
            location: 3,
            length: 4,
            text_range_index: 0,
        };
        let wide = range.expanded(5, 2);
        assert_eq!(wide.location, 0);
        assert_eq!(wide.length, 9);

        let narrow = range.expanded(1, 0);
        assert_eq!(narrow.location, 2);
        assert_eq!(narrow.length, 5);
    }

    #[test]
    fn test_session_orders_by_page_then_occurrence() {
        let doc = open_doc();
        let session = SearchSession::new(SearchQuery::new("PDF", SearchOptions::CASE_INSENSITIVE));
        let results = session.run(doc.as_ref()).unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!((results[0].page_index, results[0].text_range_index), (0, 0));
        assert_eq!((results[1].page_index, results[1].text_range_index), (0, 1));
        assert_eq!((results[2].page_index, results[2].text_range_index), (2, 0));
        assert_eq!(results[2].location, 5);
    }

    #[test]
    fn test_empty_query_and_no_matches() {
        let doc = open_doc();
        let empty = SearchSession::new(SearchQuery::new("", SearchOptions::empty()));
        assert!(empty.run(doc.as_ref()).unwrap().is_empty());

        let missing = SearchSession::new(SearchQuery::new("epub", SearchOptions::empty()));
        assert!(missing.run(doc.as_ref()).unwrap().is_empty());
    }

    #[test]
    fn test_result_text_reads_text_layer() {
        let doc = open_doc();
        let text = SearchSession::result_text(doc.as_ref(), 0, 2, 3).unwrap();
        assert_eq!(text, "PDF");
    }

    #[test]
    fn test_searcher_select_and_clear() {
        let doc = open_doc();
        let mut searcher = TextSearcher::new();

        // No active search: nothing to clear, select is harmless
        assert!(!searcher.clear());
        assert_eq!(searcher.select(doc.as_ref(), 0, 0).unwrap(), None);

        let results = searcher
            .search(doc.as_ref(), SearchQuery::new("pdf", SearchOptions::empty()))
            .unwrap();
        assert_eq!(results.len(), 3);

        let selected = searcher.select(doc.as_ref(), 0, 1).unwrap().unwrap();
        assert_eq!(selected, results[1]);
        assert_eq!(searcher.highlight(), Some(&results[1]));

        assert_eq!(searcher.select(doc.as_ref(), 1, 0).unwrap(), None);

        assert!(searcher.clear());
        assert!(!searcher.is_active());
        assert!(!searcher.clear());
    }
}
