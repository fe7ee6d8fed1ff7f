//! Search queries, scopes and pattern compilation
//!
//! User text never reaches the regex compiler unescaped unless regex mode is
//! explicitly enabled, and every compiled program is size-bounded. The
//! `regex` crate matches in linear time, so no query can backtrack
//! catastrophically.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

use crate::corpus::BookId;
use crate::reference::{AddressRange, ParseError};

/// Search errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("Search text is too long ({len} characters, limit {max})")]
    QueryTooLong { len: usize, max: usize },

    #[error("Regular expression search is disabled")]
    RegexDisabled,

    #[error("Invalid search pattern: {0}")]
    InvalidPattern(String),

    #[error("Search pattern is too complex (compiled size limit {limit} bytes)")]
    PatternTooLarge { limit: usize },

    #[error("Invalid search scope: {0}")]
    InvalidScope(#[from] ParseError),
}

/// How query text is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Match the text exactly; metacharacters have no meaning
    #[default]
    Literal,
    /// Treat the text as a regular expression
    Regex,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchQuery {
    pub text: String,
    pub mode: QueryMode,
    /// Matching is case-insensitive unless set
    pub case_sensitive: bool,
}

impl SearchQuery {
    pub fn literal(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }

    pub fn regex(pattern: &str) -> Self {
        Self {
            text: pattern.to_string(),
            mode: QueryMode::Regex,
            ..Self::default()
        }
    }

    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }
}

/// Which verses a search visits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchScope {
    #[default]
    Corpus,
    Book(BookId),
    Range(AddressRange),
}

/// Bounds applied to every query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchLimits {
    /// Longest accepted query, in characters
    pub max_query_len: usize,
    pub allow_regex: bool,
    /// Compiled program size limit passed to the regex builder, in bytes
    pub max_pattern_size: usize,
    /// Stop after this many matching verses
    pub max_results: Option<usize>,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_query_len: 256,
            allow_regex: false,
            max_pattern_size: 1 << 20,
            max_results: None,
        }
    }
}

/// Compile a query into a matcher.
///
/// Returns `Ok(None)` for a blank query, which matches nothing.
pub(crate) fn compile(query: &SearchQuery, limits: &SearchLimits) -> Result<Option<Regex>, SearchError> {
    let text: String = query.text.nfc().collect();
    let len = text.chars().count();
    if len > limits.max_query_len {
        return Err(SearchError::QueryTooLong {
            len,
            max: limits.max_query_len,
        });
    }
    if text.trim().is_empty() {
        return Ok(None);
    }

    let pattern = match query.mode {
        QueryMode::Literal => regex::escape(&text),
        QueryMode::Regex if limits.allow_regex => text,
        QueryMode::Regex => return Err(SearchError::RegexDisabled),
    };

    RegexBuilder::new(&pattern)
        .case_insensitive(!query.case_sensitive)
        .size_limit(limits.max_pattern_size)
        .dfa_size_limit(limits.max_pattern_size)
        .build()
        .map(Some)
        .map_err(|e| match e {
            regex::Error::CompiledTooBig(_) => SearchError::PatternTooLarge {
                limit: limits.max_pattern_size,
            },
            other => SearchError::InvalidPattern(other.to_string()),
        })
}
