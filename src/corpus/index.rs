//! Immutable verse lookup table for one translation

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::alias::{AliasKind, AliasTable, BookResolution};
use super::book::BookId;
use crate::reference::{AddressRange, CanonicalAddress, ParseError};

/// Errors raised while building a corpus index
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Invalid verse number {book} {chapter}:{verse} (chapters and verses start at 1)")]
    InvalidAddress {
        book: BookId,
        chapter: u32,
        verse: u32,
    },

    #[error("Duplicate verse {0}")]
    DuplicateVerse(CanonicalAddress),

    #[error("Corpus contains no verses")]
    Empty,

    #[error("Failed to read corpus: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse corpus JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One verse as supplied by the data-loading collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub book: BookId,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
    /// Translation-specific names for the book
    #[serde(rename = "bookAliases", default, skip_serializing_if = "BTreeSet::is_empty")]
    pub book_aliases: BTreeSet<String>,
}

impl CorpusEntry {
    pub fn new(book: BookId, chapter: u32, verse: u32, text: &str) -> Self {
        Self {
            book,
            chapter,
            verse,
            text: text.to_string(),
            book_aliases: BTreeSet::new(),
        }
    }
}

/// On-disk corpus layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusFile {
    pub translation: String,
    pub verses: Vec<CorpusEntry>,
}

/// Read-only lookup: canonical address to verse text, chapter bounds and
/// book aliases
#[derive(Debug, Clone)]
pub struct CorpusIndex {
    translation: String,
    verses: BTreeMap<CanonicalAddress, String>,
    /// Highest verse per chapter, indexed by `chapter - 1`; 0 for gaps
    chapters: BTreeMap<BookId, Vec<u32>>,
    aliases: AliasTable,
}

impl CorpusIndex {
    /// Build an index from loose entries
    pub fn from_entries<I>(translation: &str, entries: I) -> Result<Self, CorpusError>
    where
        I: IntoIterator<Item = CorpusEntry>,
    {
        let mut verses = BTreeMap::new();
        let mut chapters: BTreeMap<BookId, Vec<u32>> = BTreeMap::new();
        let mut aliases = AliasTable::new();

        for entry in entries {
            if entry.chapter == 0 || entry.verse == 0 {
                return Err(CorpusError::InvalidAddress {
                    book: entry.book,
                    chapter: entry.chapter,
                    verse: entry.verse,
                });
            }

            let address = CanonicalAddress::new(entry.book, entry.chapter, entry.verse);
            if verses.contains_key(&address) {
                return Err(CorpusError::DuplicateVerse(address));
            }

            let bounds = chapters.entry(entry.book).or_default();
            let index = (entry.chapter - 1) as usize;
            if bounds.len() <= index {
                bounds.resize(index + 1, 0);
            }
            bounds[index] = bounds[index].max(entry.verse);

            for alias in &entry.book_aliases {
                aliases.insert(alias, entry.book, AliasKind::Abbreviation);
            }
            verses.insert(address, entry.text);
        }

        if verses.is_empty() {
            return Err(CorpusError::Empty);
        }

        for book in chapters.keys() {
            aliases.register_builtin(*book);
        }

        tracing::debug!(
            translation = %translation,
            verses = verses.len(),
            books = chapters.len(),
            "Corpus index built"
        );

        Ok(Self {
            translation: translation.to_string(),
            verses,
            chapters,
            aliases,
        })
    }

    /// Load a corpus from its JSON file layout
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CorpusError> {
        let file: CorpusFile = serde_json::from_reader(reader)?;
        Self::from_entries(&file.translation, file.verses)
    }

    pub fn from_json_str(json: &str) -> Result<Self, CorpusError> {
        let file: CorpusFile = serde_json::from_str(json)?;
        Self::from_entries(&file.translation, file.verses)
    }

    /// Name of the translation this index was built from
    pub fn translation(&self) -> &str {
        &self.translation
    }

    /// Total number of verses with text
    pub fn len(&self) -> usize {
        self.verses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verses.is_empty()
    }

    /// Books present in this translation, in canonical order
    pub fn books(&self) -> impl Iterator<Item = BookId> + '_ {
        self.chapters.keys().copied()
    }

    pub fn contains_book(&self, book: BookId) -> bool {
        self.chapters.contains_key(&book)
    }

    /// Number of chapters in a book, 0 when the book is absent
    pub fn chapter_count(&self, book: BookId) -> u32 {
        self.chapters.get(&book).map(|c| c.len() as u32).unwrap_or(0)
    }

    /// Highest verse number in a chapter, 0 when the chapter is absent
    pub fn verse_count(&self, book: BookId, chapter: u32) -> u32 {
        if chapter == 0 {
            return 0;
        }
        self.chapters
            .get(&book)
            .and_then(|c| c.get((chapter - 1) as usize))
            .copied()
            .unwrap_or(0)
    }

    /// Validate a triple against the corpus bounds
    pub fn address(
        &self,
        book: BookId,
        chapter: u32,
        verse: u32,
    ) -> Result<CanonicalAddress, ParseError> {
        let last_verse = self.verse_count(book, chapter);
        if last_verse == 0 {
            return Err(ParseError::OutOfRange {
                book,
                chapter,
                verse: None,
            });
        }
        if verse == 0 || verse > last_verse {
            return Err(ParseError::OutOfRange {
                book,
                chapter,
                verse: Some(verse),
            });
        }
        Ok(CanonicalAddress::new(book, chapter, verse))
    }

    /// Range covering a whole chapter
    pub fn chapter_range(&self, book: BookId, chapter: u32) -> Result<AddressRange, ParseError> {
        let start = self.address(book, chapter, 1)?;
        let end = self.address(book, chapter, self.verse_count(book, chapter))?;
        AddressRange::between(start, end)
    }

    /// Range covering every populated chapter of a book
    pub fn book_range(&self, book: BookId) -> Result<AddressRange, ParseError> {
        let bounds = self.chapters.get(&book).ok_or(ParseError::OutOfRange {
            book,
            chapter: 1,
            verse: None,
        })?;
        let first = bounds.iter().position(|v| *v > 0);
        let last = bounds.iter().rposition(|v| *v > 0);
        match (first, last) {
            (Some(first), Some(last)) => {
                let start = self.address(book, first as u32 + 1, 1)?;
                let end = self.address(book, last as u32 + 1, bounds[last])?;
                AddressRange::between(start, end)
            }
            _ => Err(ParseError::OutOfRange {
                book,
                chapter: 1,
                verse: None,
            }),
        }
    }

    /// Verse text, `None` when the translation omits the verse
    pub fn text(&self, address: &CanonicalAddress) -> Option<&str> {
        self.verses.get(address).map(String::as_str)
    }

    /// Verses with text inside a range, ascending
    pub fn verses_in(
        &self,
        range: &AddressRange,
    ) -> impl Iterator<Item = (CanonicalAddress, &str)> + '_ {
        self.verses
            .range(range.start()..=range.end())
            .map(|(address, text)| (*address, text.as_str()))
    }

    /// Every verse, ascending
    pub fn verses(&self) -> impl Iterator<Item = (CanonicalAddress, &str)> + '_ {
        self.verses
            .iter()
            .map(|(address, text)| (*address, text.as_str()))
    }

    /// Resolve a typed book name against this translation's aliases
    pub fn resolve_book(&self, name: &str) -> BookResolution {
        self.aliases.resolve(name)
    }

    /// Canonical display names for books matching a typed prefix.
    ///
    /// Only canonical names are returned, never the typed fragment.
    pub fn suggest_books(&self, prefix: &str, limit: usize) -> Vec<&'static str> {
        self.aliases
            .suggest(prefix, limit)
            .into_iter()
            .map(BookId::display_name)
            .collect()
    }
}
