//! Reference parser
//!
//! Turns free-form passage references into validated address ranges.
//!
//! Grammar (simplified):
//! ```text
//! input     = segment (";" segment)*
//! segment   = [book] [locator]
//! locator   = item ("," item)*
//! item      = point [dash point]
//! point     = number [sep number]
//! sep       = ":" | "."
//! dash      = "-" | "–" | "—"
//! ```
//!
//! A segment without a book continues the previous segment's book. Inside a
//! locator, a bare number means a verse when the previous item named a verse
//! and a chapter otherwise; in single-chapter books it is always a verse.

use thiserror::Error;

use super::types::{AddressRange, CanonicalAddress};
use crate::corpus::{BookId, BookResolution, CorpusIndex};

/// Reference parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Empty reference")]
    EmptyInput,

    #[error("Unknown book \"{input}\"")]
    UnknownBook {
        /// The book name as typed
        input: String,
        /// Books the typed name could mean, when it was ambiguous
        candidates: Vec<BookId>,
    },

    #[error("{}", describe_out_of_range(.book, .chapter, .verse))]
    OutOfRange {
        book: BookId,
        chapter: u32,
        /// `None` when the chapter itself does not exist
        verse: Option<u32>,
    },

    #[error("Malformed reference \"{input}\": {reason}")]
    MalformedRange { input: String, reason: String },
}

fn describe_out_of_range(book: &BookId, chapter: &u32, verse: &Option<u32>) -> String {
    match verse {
        Some(verse) => format!("{} {} has no verse {}", book, chapter, verse),
        None => format!("{} has no chapter {}", book, chapter),
    }
}

/// Parse a reference string into one or more ranges, in input order.
///
/// Parsing is atomic: if any sub-reference is invalid the whole input fails
/// and no ranges are returned.
pub fn parse(corpus: &CorpusIndex, input: &str) -> Result<Vec<AddressRange>, ParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseError::EmptyInput);
    }

    let mut ranges = Vec::new();
    let mut current_book: Option<BookId> = None;

    for segment in input.split(';') {
        let segment = segment.trim();
        if segment.is_empty() {
            return Err(malformed(input, "empty reference between ';'"));
        }

        let (book_name, locator) = split_book(segment);
        let book = match book_name {
            Some(name) => resolve_book(corpus, name)?,
            None => current_book.ok_or_else(|| malformed(segment, "missing book name"))?,
        };
        current_book = Some(book);

        let locator = locator.trim();
        if locator.is_empty() {
            ranges.push(corpus.book_range(book)?);
            continue;
        }
        LocatorParser::new(corpus, book).parse(locator, &mut ranges)?;
    }

    Ok(ranges)
}

/// Parse a reference that must describe exactly one range
pub fn parse_range(corpus: &CorpusIndex, input: &str) -> Result<AddressRange, ParseError> {
    let mut ranges = parse(corpus, input)?;
    if ranges.len() != 1 {
        return Err(malformed(input.trim(), "expected a single passage"));
    }
    Ok(ranges.remove(0))
}

/// Parse a reference that must describe exactly one verse
pub fn normalize(corpus: &CorpusIndex, input: &str) -> Result<CanonicalAddress, ParseError> {
    let range = parse_range(corpus, input)?;
    if !range.is_single() {
        return Err(malformed(input.trim(), "expected a single verse"));
    }
    Ok(range.start())
}

/// Parse, returning `None` on any error
pub fn try_parse(corpus: &CorpusIndex, input: &str) -> Option<Vec<AddressRange>> {
    parse(corpus, input).ok()
}

fn malformed(input: &str, reason: &str) -> ParseError {
    ParseError::MalformedRange {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

fn resolve_book(corpus: &CorpusIndex, name: &str) -> Result<BookId, ParseError> {
    match corpus.resolve_book(name) {
        BookResolution::Found(book) => Ok(book),
        BookResolution::Ambiguous(candidates) => Err(ParseError::UnknownBook {
            input: name.to_string(),
            candidates,
        }),
        BookResolution::Unknown => Err(ParseError::UnknownBook {
            input: name.to_string(),
            candidates: Vec::new(),
        }),
    }
}

/// Split a segment into its book name (if it starts with one) and locator.
///
/// A book name starts with a letter, or with an ordinal digit followed by a
/// letter ("1 John", "2Kgs"), and runs up to the first digit after that.
fn split_book(segment: &str) -> (Option<&str>, &str) {
    let mut chars = segment.char_indices().peekable();
    let starts_book = match chars.peek() {
        Some((_, c)) if c.is_alphabetic() => true,
        Some((_, c)) if c.is_ascii_digit() => segment[1..]
            .trim_start()
            .chars()
            .next()
            .is_some_and(char::is_alphabetic),
        _ => false,
    };
    if !starts_book {
        return (None, segment);
    }

    // Skip the leading ordinal digit, if any
    let body_start = if segment.starts_with(|c: char| c.is_ascii_digit()) {
        1
    } else {
        0
    };
    let split_at = segment[body_start..]
        .find(|c: char| c.is_ascii_digit())
        .map(|i| i + body_start)
        .unwrap_or(segment.len());

    let book = segment[..split_at].trim();
    (Some(book), &segment[split_at..])
}

/// One side of a locator item before interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Point {
    /// A lone number; chapter or verse depending on context
    Bare(u32),
    /// `chapter:verse`
    Verse(u32, u32),
}

/// Whether a bare number continues a chapter list or a verse list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Chapter,
    Verse(u32),
}

/// Parses the comma-separated locator of one segment
struct LocatorParser<'c> {
    corpus: &'c CorpusIndex,
    book: BookId,
    single_chapter: bool,
    mode: Mode,
}

impl<'c> LocatorParser<'c> {
    fn new(corpus: &'c CorpusIndex, book: BookId) -> Self {
        let single_chapter = book.is_single_chapter();
        Self {
            corpus,
            book,
            single_chapter,
            mode: if single_chapter {
                Mode::Verse(1)
            } else {
                Mode::Chapter
            },
        }
    }

    fn parse(&mut self, locator: &str, out: &mut Vec<AddressRange>) -> Result<(), ParseError> {
        for item in locator.split(',') {
            let item = item.trim();
            if item.is_empty() {
                return Err(malformed(locator, "empty item in list"));
            }
            let (start, end) = ItemScanner::new(item).scan()?;
            out.push(self.interpret(item, start, end)?);
        }
        Ok(())
    }

    fn interpret(
        &mut self,
        item: &str,
        start: Point,
        end: Option<Point>,
    ) -> Result<AddressRange, ParseError> {
        let first = match (start, self.mode) {
            (Point::Verse(chapter, verse), _) => {
                self.mode = Mode::Verse(chapter);
                self.corpus.address(self.book, chapter, verse)?
            }
            (Point::Bare(verse), Mode::Verse(chapter)) => {
                self.corpus.address(self.book, chapter, verse)?
            }
            (Point::Bare(chapter), Mode::Chapter) => {
                return self.chapter_item(item, chapter, end);
            }
        };

        let last = match end {
            None => first,
            Some(Point::Verse(chapter, verse)) => {
                self.mode = Mode::Verse(chapter);
                self.corpus.address(self.book, chapter, verse)?
            }
            Some(Point::Bare(verse)) => {
                self.corpus.address(self.book, first.chapter(), verse)?
            }
        };

        self.range(item, first, last)
    }

    /// An item that starts with a bare chapter number
    fn chapter_item(
        &mut self,
        item: &str,
        chapter: u32,
        end: Option<Point>,
    ) -> Result<AddressRange, ParseError> {
        debug_assert!(!self.single_chapter);
        match end {
            None => self.corpus.chapter_range(self.book, chapter),
            Some(Point::Bare(last_chapter)) => {
                let first = self.corpus.chapter_range(self.book, chapter)?.start();
                let last = self.corpus.chapter_range(self.book, last_chapter)?.end();
                self.range(item, first, last)
            }
            Some(Point::Verse(last_chapter, verse)) => {
                let first = self.corpus.chapter_range(self.book, chapter)?.start();
                let last = self.corpus.address(self.book, last_chapter, verse)?;
                self.mode = Mode::Verse(last_chapter);
                self.range(item, first, last)
            }
        }
    }

    fn range(
        &self,
        item: &str,
        first: CanonicalAddress,
        last: CanonicalAddress,
    ) -> Result<AddressRange, ParseError> {
        if last < first {
            return Err(malformed(item, "the range ends before it starts"));
        }
        AddressRange::between(first, last)
    }
}

/// Character-level scanner for one locator item
struct ItemScanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> ItemScanner<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn skip_any(&mut self, accepted: &[char]) -> bool {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if accepted.contains(&ch) => {
                self.advance();
                true
            }
            _ => false,
        }
    }

    fn at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.pos >= self.input.len()
    }

    fn error(&self, reason: &str) -> ParseError {
        malformed(self.input, reason)
    }

    fn parse_number(&mut self, missing: &str) -> Result<u32, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.pos == start {
            return Err(self.error(missing));
        }
        self.input[start..self.pos]
            .parse()
            .map_err(|_| self.error("number is too large"))
    }

    fn parse_point(&mut self, missing: &str) -> Result<Point, ParseError> {
        let first = self.parse_number(missing)?;
        if self.skip_any(&[':', '.']) {
            let verse = self.parse_number("missing verse after the chapter separator")?;
            Ok(Point::Verse(first, verse))
        } else {
            Ok(Point::Bare(first))
        }
    }

    fn scan(mut self) -> Result<(Point, Option<Point>), ParseError> {
        let start = self.parse_point("expected a chapter or verse number")?;
        let end = if self.skip_any(&['-', '\u{2013}', '\u{2014}']) {
            Some(self.parse_point("missing the end of the range")?)
        } else {
            None
        };

        if !self.at_end() {
            let unexpected = self.peek().unwrap_or('\0');
            return Err(self.error(&format!("unexpected '{}'", unexpected)));
        }
        Ok((start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::test_corpus;

    fn display(ranges: &[AddressRange]) -> Vec<String> {
        ranges.iter().map(|r| r.to_string()).collect()
    }

    fn parsed(input: &str) -> Vec<String> {
        display(&parse(&test_corpus(), input).unwrap())
    }

    #[test]
    fn test_parse_single_verse() {
        assert_eq!(parsed("John 3:16"), vec!["John 3:16"]);
    }

    #[test]
    fn test_parse_range() {
        let corpus = test_corpus();
        let ranges = parse(&corpus, "john 3:16-18").unwrap();
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].start(), corpus.address(BookId::John, 3, 16).unwrap());
        assert_eq!(ranges[0].end(), corpus.address(BookId::John, 3, 18).unwrap());
    }

    #[test]
    fn test_parse_verse_list() {
        assert_eq!(
            parsed("John 3:16,18,20"),
            vec!["John 3:16", "John 3:18", "John 3:20"]
        );
        assert_eq!(
            parsed("John 3:16-17, 19, 4:2"),
            vec!["John 3:16-17", "John 3:19", "John 4:2"]
        );
    }

    #[test]
    fn test_parse_chapter_only() {
        assert_eq!(parsed("Psalm 23"), vec!["Psalms 23:1-6"]);
        assert_eq!(parsed("John 3-4"), vec!["John 3:1-4:2"]);
        assert_eq!(parsed("John 3-4:1"), vec!["John 3:1-4:1"]);
    }

    #[test]
    fn test_parse_cross_chapter_range() {
        assert_eq!(parsed("John 3:19-4:1"), vec!["John 3:19-4:1"]);
        assert_eq!(parsed("John 3:19 \u{2013} 4:1"), vec!["John 3:19-4:1"]);
    }

    #[test]
    fn test_parse_case_variants_are_identical() {
        let corpus = test_corpus();
        let expected = parse(&corpus, "John 3:16").unwrap();
        for variant in ["john 3:16", "JOHN 3:16", "jOhN 3:16", "Jn 3.16", "JHN 3:16"] {
            assert_eq!(parse(&corpus, variant).unwrap(), expected, "{}", variant);
        }
    }

    #[test]
    fn test_parse_numbered_and_partial_books() {
        assert_eq!(parsed("1 John 1:9"), vec!["1 John 1:9"]);
        assert_eq!(parsed("1jn 1:9"), vec!["1 John 1:9"]);
        assert_eq!(parsed("I John 1:9"), vec!["1 John 1:9"]);
        assert_eq!(parsed("Genes 1:1"), vec!["Genesis 1:1"]);
        assert_eq!(parsed("Heb. 11:1"), vec!["Hebrews 11:1"]);
    }

    #[test]
    fn test_parse_single_chapter_book() {
        assert_eq!(parsed("Jude 3"), vec!["Jude 1:3"]);
        assert_eq!(parsed("Jude 1-2"), vec!["Jude 1:1-2"]);
        assert_eq!(parsed("Jude 1:3"), vec!["Jude 1:3"]);
        assert_eq!(parsed("Jude"), vec!["Jude 1:1-3"]);
    }

    #[test]
    fn test_partial_corpus_book_keeps_chapter_numbers() {
        // Only chapter 1 of Genesis and 1 John is loaded; a bare number is
        // still a chapter for books with more than one chapter in the canon
        assert_eq!(parsed("Genesis 1"), vec!["Genesis 1:1-3"]);
        assert_eq!(parsed("1 John 1"), vec!["1 John 1:1-9"]);
        assert!(matches!(
            parse(&test_corpus(), "1 John 9"),
            Err(ParseError::OutOfRange { chapter: 9, verse: None, .. })
        ));
    }

    #[test]
    fn test_parse_book_only() {
        assert_eq!(parsed("Genesis"), vec!["Genesis 1:1-3"]);
    }

    #[test]
    fn test_parse_multiple_segments() {
        assert_eq!(
            parsed("John 3:16; Rom 5:8; 1 John 1:9"),
            vec!["John 3:16", "Romans 5:8", "1 John 1:9"]
        );
        // A segment without a book continues the previous book
        assert_eq!(parsed("John 3:16; 4:1"), vec!["John 3:16", "John 4:1"]);
    }

    #[test]
    fn test_error_empty() {
        let corpus = test_corpus();
        assert_eq!(parse(&corpus, ""), Err(ParseError::EmptyInput));
        assert_eq!(parse(&corpus, "   "), Err(ParseError::EmptyInput));
    }

    #[test]
    fn test_error_unknown_book() {
        let corpus = test_corpus();
        assert!(matches!(
            parse(&corpus, "Hezekiah 1:1"),
            Err(ParseError::UnknownBook { ref candidates, .. }) if candidates.is_empty()
        ));
        // Exodus exists in the canon but not in this corpus
        assert!(matches!(
            parse(&corpus, "Exodus 3:14"),
            Err(ParseError::UnknownBook { .. })
        ));
    }

    #[test]
    fn test_error_ambiguous_book_lists_candidates() {
        let corpus = test_corpus();
        match parse(&corpus, "J 3:16") {
            Err(ParseError::UnknownBook { input, candidates }) => {
                assert_eq!(input, "J");
                assert!(candidates.contains(&BookId::John));
                assert!(candidates.contains(&BookId::Jude));
            }
            other => panic!("expected UnknownBook, got {:?}", other),
        }
    }

    #[test]
    fn test_error_out_of_range() {
        let corpus = test_corpus();
        assert_eq!(
            parse(&corpus, "John 3:99"),
            Err(ParseError::OutOfRange {
                book: BookId::John,
                chapter: 3,
                verse: Some(99)
            })
        );
        assert_eq!(
            parse(&corpus, "John 30"),
            Err(ParseError::OutOfRange {
                book: BookId::John,
                chapter: 30,
                verse: None
            })
        );
        assert!(matches!(
            parse(&corpus, "John 3:0"),
            Err(ParseError::OutOfRange { verse: Some(0), .. })
        ));
    }

    #[test]
    fn test_error_malformed() {
        let corpus = test_corpus();
        for input in [
            "John 3:18-16",
            "John 3:",
            "John 3:16-",
            "John 3:16x",
            "John 3:16,,18",
            "3:16",
            "John 3:16;",
            "John 99999999999:1",
        ] {
            assert!(
                matches!(parse(&corpus, input), Err(ParseError::MalformedRange { .. })),
                "{} should be malformed, got {:?}",
                input,
                parse(&corpus, input)
            );
        }
    }

    #[test]
    fn test_parse_is_atomic() {
        let corpus = test_corpus();
        // Two good sub-references and one bad one fail together
        assert!(matches!(
            parse(&corpus, "John 3:16,18,99"),
            Err(ParseError::OutOfRange { .. })
        ));
        assert!(try_parse(&corpus, "John 3:16; Nowhere 1:1").is_none());
    }

    #[test]
    fn test_display_round_trip() {
        let corpus = test_corpus();
        for (address, _) in corpus.verses() {
            assert_eq!(normalize(&corpus, &address.to_string()).unwrap(), address);
        }
        for input in ["John 3:16-18", "John 3:19-4:1", "Psalm 23", "Jude 2-3"] {
            let range = parse_range(&corpus, input).unwrap();
            assert_eq!(parse_range(&corpus, &range.to_string()).unwrap(), range);
        }
    }

    #[test]
    fn test_normalize_requires_single_verse() {
        let corpus = test_corpus();
        assert!(normalize(&corpus, "John 3:16-17").is_err());
        assert!(parse_range(&corpus, "John 3:16,18").is_err());
    }

    #[test]
    fn test_error_messages() {
        let corpus = test_corpus();
        let err = parse(&corpus, "John 3:99").unwrap_err();
        assert_eq!(err.to_string(), "John 3 has no verse 99");
        let err = parse(&corpus, "John 30").unwrap_err();
        assert_eq!(err.to_string(), "John has no chapter 30");
    }
}
