//! Search engine
//!
//! Matches compiled queries against verse text and note bodies. Results are
//! produced lazily in ascending address order and carry byte spans only;
//! turning spans into markup belongs to the renderer.

use std::sync::Arc;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::query::{compile, SearchError, SearchLimits, SearchQuery, SearchScope};
use crate::annotations::{AnnotationId, AnnotationSnapshot};
use crate::cancel::CancellationFlag;
use crate::corpus::CorpusIndex;
use crate::reference::{AddressRange, CanonicalAddress};

/// A match inside a text, as UTF-8 byte offsets on char boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct MatchSpan {
    pub offset: usize,
    pub length: usize,
}

impl MatchSpan {
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// All matches within one verse
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    pub address: CanonicalAddress,
    pub spans: Vec<MatchSpan>,
}

/// All matches within one note
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteMatch {
    pub annotation_id: AnnotationId,
    pub range: AddressRange,
    pub spans: Vec<MatchSpan>,
}

fn find_spans(regex: &Regex, text: &str) -> Vec<MatchSpan> {
    regex
        .find_iter(text)
        .filter(|m| !m.as_str().is_empty())
        .map(|m| MatchSpan {
            offset: m.start(),
            length: m.len(),
        })
        .collect()
}

type VerseIter<'c> = Box<dyn Iterator<Item = (CanonicalAddress, &'c str)> + 'c>;

/// Lazy sequence of verse matches.
///
/// Ends when the scope is exhausted, the result cap is reached or the
/// cancellation flag is set.
pub struct SearchIter<'c> {
    verses: VerseIter<'c>,
    regex: Option<Regex>,
    cancel: CancellationFlag,
    remaining: Option<usize>,
}

impl<'c> Iterator for SearchIter<'c> {
    type Item = SearchMatch;

    fn next(&mut self) -> Option<Self::Item> {
        let regex = self.regex.as_ref()?;
        if self.remaining == Some(0) {
            return None;
        }

        loop {
            if self.cancel.is_cancelled() {
                return None;
            }
            let (address, text) = self.verses.next()?;
            let spans = find_spans(regex, text);
            if spans.is_empty() {
                continue;
            }
            if let Some(remaining) = self.remaining.as_mut() {
                *remaining -= 1;
            }
            return Some(SearchMatch { address, spans });
        }
    }
}

/// Stateless search over a corpus; every call starts fresh
#[derive(Debug, Clone)]
pub struct SearchEngine {
    corpus: Arc<CorpusIndex>,
    limits: SearchLimits,
}

impl SearchEngine {
    pub fn new(corpus: Arc<CorpusIndex>, limits: SearchLimits) -> Self {
        Self { corpus, limits }
    }

    pub fn limits(&self) -> &SearchLimits {
        &self.limits
    }

    /// Search verse text within `scope`
    pub fn search(
        &self,
        query: &SearchQuery,
        scope: &SearchScope,
    ) -> Result<SearchIter<'_>, SearchError> {
        self.search_with_cancel(query, scope, CancellationFlag::new())
    }

    /// Like `search`, stopping once `cancel` is set
    pub fn search_with_cancel(
        &self,
        query: &SearchQuery,
        scope: &SearchScope,
        cancel: CancellationFlag,
    ) -> Result<SearchIter<'_>, SearchError> {
        let regex = compile(query, &self.limits)?;
        let verses: VerseIter<'_> = match scope {
            SearchScope::Corpus => Box::new(self.corpus.verses()),
            SearchScope::Book(book) => {
                let range = self.corpus.book_range(*book)?;
                Box::new(self.corpus.verses_in(&range))
            }
            SearchScope::Range(range) => Box::new(self.corpus.verses_in(range)),
        };
        debug!(query = %query.text, mode = ?query.mode, scope = ?scope, "Starting search");

        Ok(SearchIter {
            verses,
            regex,
            cancel,
            remaining: self.limits.max_results,
        })
    }

    /// Search note bodies in an annotation snapshot, in address order
    pub fn search_notes(
        &self,
        query: &SearchQuery,
        snapshot: &AnnotationSnapshot,
    ) -> Result<Vec<NoteMatch>, SearchError> {
        let Some(regex) = compile(query, &self.limits)? else {
            return Ok(Vec::new());
        };
        let mut matches: Vec<NoteMatch> = snapshot
            .iter()
            .filter_map(|annotation| {
                let text = annotation.payload().note_text()?;
                let spans = find_spans(&regex, text);
                (!spans.is_empty()).then(|| NoteMatch {
                    annotation_id: annotation.id(),
                    range: *annotation.range(),
                    spans,
                })
            })
            .collect();
        if let Some(max) = self.limits.max_results {
            matches.truncate(max);
        }
        Ok(matches)
    }
}

/// Text around a span, widened to word boundaries, with ellipses where cut
pub fn excerpt(text: &str, span: MatchSpan, context: usize) -> String {
    let mut start = span.offset.saturating_sub(context).min(text.len());
    while start > 0 && !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (span.end() + context).min(text.len());
    while end < text.len() && !text.is_char_boundary(end) {
        end += 1;
    }

    let start = text[..start]
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let end = text[end..]
        .find(char::is_whitespace)
        .map(|i| end + i)
        .unwrap_or(text.len());

    let prefix = if start > 0 { "..." } else { "" };
    let suffix = if end < text.len() { "..." } else { "" };
    format!("{}{}{}", prefix, text[start..end].trim(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{Layer, LayerId, OverlapPolicy, AnnotationStore};
    use crate::corpus::{test_corpus, BookId};
    use crate::reference::parse_range;

    fn engine() -> SearchEngine {
        SearchEngine::new(Arc::new(test_corpus()), SearchLimits::default())
    }

    fn addresses(iter: SearchIter<'_>) -> Vec<String> {
        iter.map(|m| m.address.to_string()).collect()
    }

    #[test]
    fn test_empty_query_returns_nothing() {
        let engine = engine();
        assert_eq!(
            engine
                .search(&SearchQuery::literal(""), &SearchScope::Corpus)
                .unwrap()
                .count(),
            0
        );
    }

    #[test]
    fn test_results_ascending_and_case_insensitive() {
        let engine = engine();
        let found = addresses(
            engine
                .search(&SearchQuery::literal("LIGHT"), &SearchScope::Corpus)
                .unwrap(),
        );
        assert_eq!(found, vec!["Genesis 1:3", "John 3:19", "John 3:20"]);
    }

    #[test]
    fn test_spans_are_byte_offsets() {
        let engine = engine();
        let corpus = test_corpus();
        let first = engine
            .search(&SearchQuery::literal("light"), &SearchScope::Corpus)
            .unwrap()
            .next()
            .unwrap();
        let text = corpus.text(&first.address).unwrap();
        assert_eq!(first.spans.len(), 2);
        for span in &first.spans {
            assert_eq!(&text[span.offset..span.end()], "light");
        }
    }

    #[test]
    fn test_metacharacters_match_literally() {
        let engine = engine();
        // "(Though" appears literally in John 4:2
        let found = addresses(
            engine
                .search(&SearchQuery::literal("(though"), &SearchScope::Corpus)
                .unwrap(),
        );
        assert_eq!(found, vec!["John 4:2"]);
        assert_eq!(
            engine
                .search(&SearchQuery::literal("a(b*"), &SearchScope::Corpus)
                .unwrap()
                .count(),
            0
        );
    }

    #[test]
    fn test_scope_book_and_range() {
        let engine = engine();
        let corpus = test_corpus();
        let query = SearchQuery::literal("God");

        let in_john = addresses(
            engine
                .search(&query, &SearchScope::Book(BookId::John))
                .unwrap(),
        );
        assert!(in_john.iter().all(|a| a.starts_with("John ")));
        assert!(in_john.contains(&"John 1:1".to_string()));

        let range = parse_range(&corpus, "John 3:17-20").unwrap();
        let in_range = addresses(engine.search(&query, &SearchScope::Range(range)).unwrap());
        assert_eq!(in_range, vec!["John 3:17", "John 3:18"]);

        assert!(matches!(
            engine.search(&query, &SearchScope::Book(BookId::Exodus)),
            Err(SearchError::InvalidScope(_))
        ));
    }

    #[test]
    fn test_result_cap_and_restart() {
        let engine = SearchEngine::new(
            Arc::new(test_corpus()),
            SearchLimits {
                max_results: Some(1),
                ..SearchLimits::default()
            },
        );
        let query = SearchQuery::literal("the");
        assert_eq!(engine.search(&query, &SearchScope::Corpus).unwrap().count(), 1);
        // A second run starts from scratch
        assert_eq!(engine.search(&query, &SearchScope::Corpus).unwrap().count(), 1);
    }

    #[test]
    fn test_cancellation_stops_iteration() {
        let engine = engine();
        let cancel = CancellationFlag::new();
        let mut iter = engine
            .search_with_cancel(&SearchQuery::literal("the"), &SearchScope::Corpus, cancel.clone())
            .unwrap();
        assert!(iter.next().is_some());
        cancel.cancel();
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_search_notes() {
        let engine = engine();
        let corpus = test_corpus();
        let mut store = AnnotationStore::new(Layer::default_layer("Default", "yellow"), OverlapPolicy::Reject);
        store
            .note(parse_range(&corpus, "Romans 5:8").unwrap(), LayerId::DEFAULT, "Grace <b>abounds</b>")
            .unwrap();
        store
            .highlight(parse_range(&corpus, "John 3:16").unwrap(), LayerId::DEFAULT, "grace")
            .unwrap();

        let matches = engine
            .search_notes(&SearchQuery::literal("grace"), &store.snapshot())
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].range.to_string(), "Romans 5:8");
        assert_eq!(matches[0].spans, vec![MatchSpan { offset: 0, length: 5 }]);
    }

    #[test]
    fn test_excerpt() {
        let text = "For God so loved the world, that he gave his only begotten Son";
        let offset = text.find("world").unwrap();
        let span = MatchSpan { offset, length: 5 };
        let short = excerpt(text, span, 6);
        assert!(short.contains("world"));
        assert!(short.starts_with("..."));
        assert!(short.ends_with("..."));
        assert_eq!(excerpt(text, span, 200), text);
    }
}
