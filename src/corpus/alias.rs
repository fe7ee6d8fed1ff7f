//! Case-insensitive book alias table
//!
//! Every alias is reduced to a normalized key before it is stored or looked
//! up, so `"1 John"`, `"I Jn."` and `"first john"` all share the key `1jn`
//! or `1john`. Lookups try an exact key first and fall back to a partial
//! (prefix) match.

use std::collections::BTreeMap;

use unicode_normalization::UnicodeNormalization;

use super::book::BookId;

/// How an alias was registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AliasKind {
    /// The canonical display name of the book
    FullName,
    /// A built-in, code or translation-supplied abbreviation
    Abbreviation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AliasTarget {
    book: BookId,
    kind: AliasKind,
}

/// Outcome of resolving a typed book name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookResolution {
    /// Exactly one book matched
    Found(BookId),
    /// Several books share the typed prefix
    Ambiguous(Vec<BookId>),
    /// Nothing matched
    Unknown,
}

/// Alias index for the books present in a corpus
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    keys: BTreeMap<String, Vec<AliasTarget>>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the display name, code and built-in abbreviations of a book
    pub fn register_builtin(&mut self, book: BookId) {
        self.insert(book.display_name(), book, AliasKind::FullName);
        self.insert(book.code(), book, AliasKind::Abbreviation);
        for abbreviation in book.abbreviations() {
            self.insert(abbreviation, book, AliasKind::Abbreviation);
        }
    }

    /// Register an additional alias. Blank aliases are ignored.
    pub fn insert(&mut self, alias: &str, book: BookId, kind: AliasKind) {
        let key = alias_key(alias);
        if key.is_empty() {
            return;
        }
        let targets = self.keys.entry(key).or_default();
        if let Some(existing) = targets.iter_mut().find(|t| t.book == book) {
            existing.kind = existing.kind.min(kind);
        } else {
            targets.push(AliasTarget { book, kind });
        }
    }

    /// Number of distinct alias keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Resolve a typed book name.
    ///
    /// An exact alias wins; when one key names several books the full-name
    /// registration is preferred, then canonical order. Otherwise every alias
    /// starting with the typed text is a candidate; a single candidate book
    /// wins, and among several the one whose full name starts with the typed
    /// text wins if it is unique.
    pub fn resolve(&self, name: &str) -> BookResolution {
        let key = alias_key(name);
        if key.is_empty() {
            return BookResolution::Unknown;
        }

        if let Some(targets) = self.keys.get(&key) {
            if let Some(best) = best_target(targets) {
                return BookResolution::Found(best.book);
            }
        }

        let candidates = self.prefix_books(&key);
        match candidates.len() {
            0 => BookResolution::Unknown,
            1 => BookResolution::Found(candidates[0]),
            _ => {
                let by_name: Vec<BookId> = candidates
                    .iter()
                    .copied()
                    .filter(|book| alias_key(book.display_name()).starts_with(&key))
                    .collect();
                if by_name.len() == 1 {
                    BookResolution::Found(by_name[0])
                } else {
                    BookResolution::Ambiguous(candidates)
                }
            }
        }
    }

    /// Books whose aliases start with the typed prefix.
    ///
    /// A book matching the prefix exactly comes first; the rest follow in
    /// canonical order.
    pub fn suggest(&self, prefix: &str, limit: usize) -> Vec<BookId> {
        let key = alias_key(prefix);
        if key.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut books = Vec::new();
        if let Some(best) = self.keys.get(&key).and_then(|t| best_target(t)) {
            books.push(best.book);
        }
        for book in self.prefix_books(&key) {
            if !books.contains(&book) {
                books.push(book);
            }
        }
        books.truncate(limit);
        books
    }

    /// Distinct books with an alias starting with `key`, in canonical order
    fn prefix_books(&self, key: &str) -> Vec<BookId> {
        let mut books: Vec<BookId> = self
            .keys
            .range(key.to_string()..)
            .take_while(|(k, _)| k.starts_with(key))
            .flat_map(|(_, targets)| targets.iter().map(|t| t.book))
            .collect();
        books.sort();
        books.dedup();
        books
    }
}

fn best_target(targets: &[AliasTarget]) -> Option<&AliasTarget> {
    targets.iter().min_by_key(|t| (t.kind, t.book))
}

/// Normalize an alias into its lookup key.
///
/// NFC, lowercase, a leading ordinal word ("first", "ii", "3rd") becomes its
/// digit, and everything that is not a letter or digit is dropped.
pub fn alias_key(alias: &str) -> String {
    let lowered: String = alias.nfc().collect::<String>().to_lowercase();
    let trimmed = lowered.trim_start_matches(|c: char| !c.is_alphanumeric());

    let mut words = trimmed.splitn(2, char::is_whitespace);
    let first = words.next().unwrap_or_default();
    let rest = words.next().map(str::trim).unwrap_or_default();

    let ordinal = match first {
        "i" | "1st" | "first" => Some('1'),
        "ii" | "2nd" | "second" => Some('2'),
        "iii" | "3rd" | "third" => Some('3'),
        _ => None,
    };

    let mut key = String::with_capacity(trimmed.len());
    let body = match ordinal {
        Some(digit) if !rest.is_empty() => {
            key.push(digit);
            rest
        }
        _ => trimmed,
    };
    key.extend(body.chars().filter(|c| c.is_alphanumeric()));
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> AliasTable {
        let mut table = AliasTable::new();
        for book in BookId::ALL {
            table.register_builtin(book);
        }
        table
    }

    #[test]
    fn test_alias_key_normalization() {
        assert_eq!(alias_key("1 John"), "1john");
        assert_eq!(alias_key("I John"), "1john");
        assert_eq!(alias_key("First  John"), "1john");
        assert_eq!(alias_key("iii Jn."), "3jn");
        assert_eq!(alias_key("Song of Solomon"), "songofsolomon");
        assert_eq!(alias_key("@Acts"), "acts");
        assert_eq!(alias_key("Isaiah"), "isaiah");
        assert_eq!(alias_key("   "), "");
    }

    #[test]
    fn test_resolve_exact_any_case() {
        let table = table();
        for name in ["john", "JOHN", "John", "jn", "JHN"] {
            assert_eq!(table.resolve(name), BookResolution::Found(BookId::John));
        }
        assert_eq!(table.resolve("1 jn"), BookResolution::Found(BookId::FirstJohn));
        assert_eq!(table.resolve("Ps"), BookResolution::Found(BookId::Psalms));
    }

    #[test]
    fn test_resolve_partial_unique() {
        let table = table();
        assert_eq!(table.resolve("Genes"), BookResolution::Found(BookId::Genesis));
        assert_eq!(table.resolve("philip"), BookResolution::Found(BookId::Philippians));
        assert_eq!(table.resolve("revel"), BookResolution::Found(BookId::Revelation));
    }

    #[test]
    fn test_resolve_ambiguous_partial() {
        let table = table();
        match table.resolve("ju") {
            BookResolution::Ambiguous(books) => {
                assert!(books.contains(&BookId::Judges));
                assert!(books.contains(&BookId::Jude));
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_exact_full_name_beats_abbreviation() {
        let mut table = table();
        // A translation that (oddly) uses "job" as an abbreviation for Jonah
        table.insert("job", BookId::Jonah, AliasKind::Abbreviation);
        assert_eq!(table.resolve("Job"), BookResolution::Found(BookId::Job));
    }

    #[test]
    fn test_unknown() {
        let table = table();
        assert_eq!(table.resolve("Hezekiah"), BookResolution::Unknown);
        assert_eq!(table.resolve(""), BookResolution::Unknown);
    }

    #[test]
    fn test_suggest_returns_books_in_order() {
        let table = table();
        let books = table.suggest("@Jo", 10);
        assert_eq!(
            books,
            vec![
                BookId::Joshua,
                BookId::Job,
                BookId::Joel,
                BookId::Jonah,
                BookId::John
            ]
        );
        assert_eq!(table.suggest("acts", 5), vec![BookId::Acts]);
        assert!(table.suggest("", 5).is_empty());
        assert_eq!(table.suggest("jo", 2).len(), 2);
    }
}
