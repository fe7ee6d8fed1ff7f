//! Search module
//!
//! Literal (default) or opt-in regex queries over verse text and notes,
//! returning lazily produced, address-ordered byte spans.

mod engine;
mod query;

pub use engine::{excerpt, MatchSpan, NoteMatch, SearchEngine, SearchIter, SearchMatch};

pub use query::{QueryMode, SearchError, SearchLimits, SearchQuery, SearchScope};
