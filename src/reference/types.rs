//! Canonical address types
//!
//! A `CanonicalAddress` is a `(book, chapter, verse)` triple that has been
//! checked against the bounds of a `CorpusIndex`. An `AddressRange` is an
//! inclusive span of addresses inside one book. Both are plain values; they
//! are never mutated after construction.

use std::fmt;

use serde::{Serialize, Serializer};

use super::parser::ParseError;
use crate::corpus::BookId;

/// A validated verse address. Ordered book, then chapter, then verse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CanonicalAddress {
    book: BookId,
    chapter: u32,
    verse: u32,
}

impl CanonicalAddress {
    /// Only the corpus index and the parser build addresses, after checking
    /// them against the corpus bounds.
    pub(crate) fn new(book: BookId, chapter: u32, verse: u32) -> Self {
        debug_assert!(chapter > 0 && verse > 0);
        Self {
            book,
            chapter,
            verse,
        }
    }

    pub fn book(&self) -> BookId {
        self.book
    }

    pub fn chapter(&self) -> u32 {
        self.chapter
    }

    pub fn verse(&self) -> u32 {
        self.verse
    }
}

impl fmt::Display for CanonicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.book, self.chapter, self.verse)
    }
}

/// Inclusive range of addresses within a single book, `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AddressRange {
    start: CanonicalAddress,
    end: CanonicalAddress,
}

impl AddressRange {
    /// Build a range from two validated addresses.
    ///
    /// Fails when the addresses are in different books or out of order.
    pub fn between(start: CanonicalAddress, end: CanonicalAddress) -> Result<Self, ParseError> {
        if start.book != end.book {
            return Err(ParseError::MalformedRange {
                input: format!("{}-{}", start, end),
                reason: "a range cannot cross books".to_string(),
            });
        }
        if end < start {
            return Err(ParseError::MalformedRange {
                input: format!("{}-{}", start, end),
                reason: "the range ends before it starts".to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// The degenerate range covering one verse
    pub fn single(address: CanonicalAddress) -> Self {
        Self {
            start: address,
            end: address,
        }
    }

    pub fn start(&self) -> CanonicalAddress {
        self.start
    }

    pub fn end(&self) -> CanonicalAddress {
        self.end
    }

    pub fn book(&self) -> BookId {
        self.start.book
    }

    /// Whether the range covers exactly one verse
    pub fn is_single(&self) -> bool {
        self.start == self.end
    }

    /// Whether `address` falls inside this range
    pub fn contains(&self, address: &CanonicalAddress) -> bool {
        *address >= self.start && *address <= self.end
    }

    /// Whether two ranges share at least one verse.
    ///
    /// `max(start1, start2) <= min(end1, end2)` within the same book.
    pub fn overlaps(&self, other: &AddressRange) -> bool {
        self.book() == other.book() && self.start.max(other.start) <= self.end.min(other.end)
    }

    /// Smallest range covering both, if they overlap
    pub fn union(&self, other: &AddressRange) -> Option<AddressRange> {
        if !self.overlaps(other) {
            return None;
        }
        Some(AddressRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        })
    }
}

impl From<CanonicalAddress> for AddressRange {
    fn from(address: CanonicalAddress) -> Self {
        AddressRange::single(address)
    }
}

/// Shortest canonical form: `John 3:16`, `John 3:16-18`, `John 3:16-4:2`
impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            return write!(f, "{}", self.start);
        }
        if self.start.chapter == self.end.chapter {
            write!(f, "{}-{}", self.start, self.end.verse)
        } else {
            write!(f, "{}-{}:{}", self.start, self.end.chapter, self.end.verse)
        }
    }
}

impl Serialize for AddressRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(book: BookId, chapter: u32, verse: u32) -> CanonicalAddress {
        CanonicalAddress::new(book, chapter, verse)
    }

    #[test]
    fn test_address_ordering() {
        let a = addr(BookId::Genesis, 50, 26);
        let b = addr(BookId::Exodus, 1, 1);
        let c = addr(BookId::Exodus, 1, 2);
        let d = addr(BookId::Exodus, 2, 1);
        assert!(a < b);
        assert!(b < c);
        assert!(c < d);
    }

    #[test]
    fn test_display() {
        let start = addr(BookId::John, 3, 16);
        assert_eq!(start.to_string(), "John 3:16");
        assert_eq!(AddressRange::single(start).to_string(), "John 3:16");

        let same_chapter = AddressRange::between(start, addr(BookId::John, 3, 18)).unwrap();
        assert_eq!(same_chapter.to_string(), "John 3:16-18");

        let cross = AddressRange::between(start, addr(BookId::John, 4, 2)).unwrap();
        assert_eq!(cross.to_string(), "John 3:16-4:2");

        let numbered = AddressRange::single(addr(BookId::FirstJohn, 1, 9));
        assert_eq!(numbered.to_string(), "1 John 1:9");
    }

    #[test]
    fn test_between_rejects_cross_book_and_reversed() {
        let john = addr(BookId::John, 3, 16);
        let acts = addr(BookId::Acts, 1, 1);
        assert!(matches!(
            AddressRange::between(john, acts),
            Err(ParseError::MalformedRange { .. })
        ));
        assert!(matches!(
            AddressRange::between(addr(BookId::John, 3, 18), john),
            Err(ParseError::MalformedRange { .. })
        ));
    }

    #[test]
    fn test_overlap_is_reflexive_and_symmetric() {
        let a = AddressRange::between(addr(BookId::John, 3, 16), addr(BookId::John, 3, 18)).unwrap();
        let b = AddressRange::between(addr(BookId::John, 3, 18), addr(BookId::John, 4, 1)).unwrap();
        let c = AddressRange::single(addr(BookId::John, 3, 19));
        let other_book = AddressRange::single(addr(BookId::Acts, 3, 17));

        for r in [a, b, c, other_book] {
            assert!(r.overlaps(&r));
        }
        assert!(a.overlaps(&b) && b.overlaps(&a));
        assert!(!a.overlaps(&c) && !c.overlaps(&a));
        assert!(b.overlaps(&c) && c.overlaps(&b));
        assert!(!a.overlaps(&other_book) && !other_book.overlaps(&a));
    }

    #[test]
    fn test_union() {
        let a = AddressRange::between(addr(BookId::John, 3, 16), addr(BookId::John, 3, 18)).unwrap();
        let b = AddressRange::between(addr(BookId::John, 3, 17), addr(BookId::John, 3, 20)).unwrap();
        let merged = a.union(&b).unwrap();
        assert_eq!(merged.start(), addr(BookId::John, 3, 16));
        assert_eq!(merged.end(), addr(BookId::John, 3, 20));

        let far = AddressRange::single(addr(BookId::John, 5, 1));
        assert!(a.union(&far).is_none());
    }

    #[test]
    fn test_contains() {
        let range = AddressRange::between(addr(BookId::John, 3, 16), addr(BookId::John, 4, 2)).unwrap();
        assert!(range.contains(&addr(BookId::John, 3, 36)));
        assert!(range.contains(&addr(BookId::John, 4, 2)));
        assert!(!range.contains(&addr(BookId::John, 4, 3)));
    }
}
