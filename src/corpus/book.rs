//! Canon book enumeration
//!
//! `BookId` is a closed enumeration of the 66-book Protestant canon in
//! canonical order. Each book carries its display name, a USFM-style code
//! and a list of common abbreviations used to seed the alias table.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A book of the canon, ordered canonically (Genesis first, Revelation last)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum BookId {
    Genesis,
    Exodus,
    Leviticus,
    Numbers,
    Deuteronomy,
    Joshua,
    Judges,
    Ruth,
    FirstSamuel,
    SecondSamuel,
    FirstKings,
    SecondKings,
    FirstChronicles,
    SecondChronicles,
    Ezra,
    Nehemiah,
    Esther,
    Job,
    Psalms,
    Proverbs,
    Ecclesiastes,
    SongOfSolomon,
    Isaiah,
    Jeremiah,
    Lamentations,
    Ezekiel,
    Daniel,
    Hosea,
    Joel,
    Amos,
    Obadiah,
    Jonah,
    Micah,
    Nahum,
    Habakkuk,
    Zephaniah,
    Haggai,
    Zechariah,
    Malachi,
    Matthew,
    Mark,
    Luke,
    John,
    Acts,
    Romans,
    FirstCorinthians,
    SecondCorinthians,
    Galatians,
    Ephesians,
    Philippians,
    Colossians,
    FirstThessalonians,
    SecondThessalonians,
    FirstTimothy,
    SecondTimothy,
    Titus,
    Philemon,
    Hebrews,
    James,
    FirstPeter,
    SecondPeter,
    FirstJohn,
    SecondJohn,
    ThirdJohn,
    Jude,
    Revelation,
}

/// Static metadata for one book
struct BookInfo {
    code: &'static str,
    name: &'static str,
    abbreviations: &'static [&'static str],
}

const fn info(
    code: &'static str,
    name: &'static str,
    abbreviations: &'static [&'static str],
) -> BookInfo {
    BookInfo {
        code,
        name,
        abbreviations,
    }
}

// Indexed by `BookId as usize`.
static BOOKS: [BookInfo; 66] = [
    info("GEN", "Genesis", &["gen", "ge", "gn"]),
    info("EXO", "Exodus", &["exod", "exo", "ex"]),
    info("LEV", "Leviticus", &["lev", "le", "lv"]),
    info("NUM", "Numbers", &["num", "nu", "nm", "nb"]),
    info("DEU", "Deuteronomy", &["deut", "deu", "de", "dt"]),
    info("JOS", "Joshua", &["josh", "jos", "jsh"]),
    info("JDG", "Judges", &["judg", "jdg", "jg", "jdgs"]),
    info("RUT", "Ruth", &["rth", "ru", "rut"]),
    info("1SA", "1 Samuel", &["1 sam", "1 sa", "1 sm", "1 s"]),
    info("2SA", "2 Samuel", &["2 sam", "2 sa", "2 sm", "2 s"]),
    info("1KI", "1 Kings", &["1 kgs", "1 ki", "1 kin", "1 kg"]),
    info("2KI", "2 Kings", &["2 kgs", "2 ki", "2 kin", "2 kg"]),
    info("1CH", "1 Chronicles", &["1 chr", "1 ch", "1 chron"]),
    info("2CH", "2 Chronicles", &["2 chr", "2 ch", "2 chron"]),
    info("EZR", "Ezra", &["ezr", "ez"]),
    info("NEH", "Nehemiah", &["neh", "ne"]),
    info("EST", "Esther", &["esth", "est", "es"]),
    info("JOB", "Job", &["jb"]),
    info("PSA", "Psalms", &["psalm", "ps", "psa", "pss", "psm"]),
    info("PRO", "Proverbs", &["prov", "pro", "prv", "pr"]),
    info("ECC", "Ecclesiastes", &["eccles", "eccl", "ecc", "ec", "qoh"]),
    info(
        "SNG",
        "Song of Solomon",
        &["song", "sos", "sng", "song of songs", "canticles"],
    ),
    info("ISA", "Isaiah", &["isa", "is"]),
    info("JER", "Jeremiah", &["jer", "je", "jr"]),
    info("LAM", "Lamentations", &["lam", "la"]),
    info("EZK", "Ezekiel", &["ezek", "eze", "ezk"]),
    info("DAN", "Daniel", &["dan", "da", "dn"]),
    info("HOS", "Hosea", &["hos", "ho"]),
    info("JOL", "Joel", &["jl", "jol"]),
    info("AMO", "Amos", &["am", "amo"]),
    info("OBA", "Obadiah", &["obad", "oba", "ob"]),
    info("JON", "Jonah", &["jnh", "jon"]),
    info("MIC", "Micah", &["mic", "mc"]),
    info("NAM", "Nahum", &["nah", "na", "nam"]),
    info("HAB", "Habakkuk", &["hab", "hb"]),
    info("ZEP", "Zephaniah", &["zeph", "zep", "zp"]),
    info("HAG", "Haggai", &["hag", "hg"]),
    info("ZEC", "Zechariah", &["zech", "zec", "zc"]),
    info("MAL", "Malachi", &["mal", "ml"]),
    info("MAT", "Matthew", &["matt", "mat", "mt"]),
    info("MRK", "Mark", &["mrk", "mar", "mk", "mr"]),
    info("LUK", "Luke", &["luk", "lk"]),
    info("JHN", "John", &["jhn", "joh", "jn"]),
    info("ACT", "Acts", &["act", "ac"]),
    info("ROM", "Romans", &["rom", "ro", "rm"]),
    info("1CO", "1 Corinthians", &["1 cor", "1 co"]),
    info("2CO", "2 Corinthians", &["2 cor", "2 co"]),
    info("GAL", "Galatians", &["gal", "ga"]),
    info("EPH", "Ephesians", &["eph", "ephes"]),
    info("PHP", "Philippians", &["phil", "php", "pp"]),
    info("COL", "Colossians", &["col"]),
    info("1TH", "1 Thessalonians", &["1 thess", "1 thes", "1 th"]),
    info("2TH", "2 Thessalonians", &["2 thess", "2 thes", "2 th"]),
    info("1TI", "1 Timothy", &["1 tim", "1 ti"]),
    info("2TI", "2 Timothy", &["2 tim", "2 ti"]),
    info("TIT", "Titus", &["tit", "ti"]),
    info("PHM", "Philemon", &["philem", "phm", "pm"]),
    info("HEB", "Hebrews", &["heb"]),
    info("JAS", "James", &["jas", "jm"]),
    info("1PE", "1 Peter", &["1 pet", "1 pe", "1 pt"]),
    info("2PE", "2 Peter", &["2 pet", "2 pe", "2 pt"]),
    info("1JN", "1 John", &["1 jn", "1 jhn", "1 joh"]),
    info("2JN", "2 John", &["2 jn", "2 jhn", "2 joh"]),
    info("3JN", "3 John", &["3 jn", "3 jhn", "3 joh"]),
    info("JUD", "Jude", &["jud", "jd"]),
    info("REV", "Revelation", &["rev", "re", "rv", "revelations"]),
];

impl BookId {
    /// Every book in canonical order
    pub const ALL: [BookId; 66] = [
        BookId::Genesis,
        BookId::Exodus,
        BookId::Leviticus,
        BookId::Numbers,
        BookId::Deuteronomy,
        BookId::Joshua,
        BookId::Judges,
        BookId::Ruth,
        BookId::FirstSamuel,
        BookId::SecondSamuel,
        BookId::FirstKings,
        BookId::SecondKings,
        BookId::FirstChronicles,
        BookId::SecondChronicles,
        BookId::Ezra,
        BookId::Nehemiah,
        BookId::Esther,
        BookId::Job,
        BookId::Psalms,
        BookId::Proverbs,
        BookId::Ecclesiastes,
        BookId::SongOfSolomon,
        BookId::Isaiah,
        BookId::Jeremiah,
        BookId::Lamentations,
        BookId::Ezekiel,
        BookId::Daniel,
        BookId::Hosea,
        BookId::Joel,
        BookId::Amos,
        BookId::Obadiah,
        BookId::Jonah,
        BookId::Micah,
        BookId::Nahum,
        BookId::Habakkuk,
        BookId::Zephaniah,
        BookId::Haggai,
        BookId::Zechariah,
        BookId::Malachi,
        BookId::Matthew,
        BookId::Mark,
        BookId::Luke,
        BookId::John,
        BookId::Acts,
        BookId::Romans,
        BookId::FirstCorinthians,
        BookId::SecondCorinthians,
        BookId::Galatians,
        BookId::Ephesians,
        BookId::Philippians,
        BookId::Colossians,
        BookId::FirstThessalonians,
        BookId::SecondThessalonians,
        BookId::FirstTimothy,
        BookId::SecondTimothy,
        BookId::Titus,
        BookId::Philemon,
        BookId::Hebrews,
        BookId::James,
        BookId::FirstPeter,
        BookId::SecondPeter,
        BookId::FirstJohn,
        BookId::SecondJohn,
        BookId::ThirdJohn,
        BookId::Jude,
        BookId::Revelation,
    ];

    fn info(self) -> &'static BookInfo {
        &BOOKS[self as usize]
    }

    /// Position in the canon (0 = Genesis)
    pub fn order(self) -> usize {
        self as usize
    }

    /// Canonical display name ("1 John", "Song of Solomon")
    pub fn display_name(self) -> &'static str {
        self.info().name
    }

    /// Three-character book code ("JHN", "1JN")
    pub fn code(self) -> &'static str {
        self.info().code
    }

    /// Built-in abbreviations, not including the display name
    pub fn abbreviations(self) -> &'static [&'static str] {
        self.info().abbreviations
    }

    /// Books with one chapter in the canon, where a bare number is a verse
    pub fn is_single_chapter(self) -> bool {
        matches!(
            self,
            BookId::Obadiah | BookId::Philemon | BookId::SecondJohn | BookId::ThirdJohn | BookId::Jude
        )
    }

    /// Look up a book by its code, case-insensitively
    pub fn from_code(code: &str) -> Option<BookId> {
        let code = code.trim();
        BookId::ALL
            .iter()
            .copied()
            .find(|book| book.code().eq_ignore_ascii_case(code))
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl Serialize for BookId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for BookId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        BookId::from_code(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown book code: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_in_canonical_order() {
        for (index, book) in BookId::ALL.iter().enumerate() {
            assert_eq!(book.order(), index);
        }
        assert_eq!(BookId::ALL[0], BookId::Genesis);
        assert_eq!(BookId::ALL[65], BookId::Revelation);
    }

    #[test]
    fn test_codes_are_unique() {
        let mut codes: Vec<&str> = BookId::ALL.iter().map(|b| b.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 66);
    }

    #[test]
    fn test_single_chapter_books() {
        let single: Vec<BookId> = BookId::ALL
            .iter()
            .copied()
            .filter(|b| b.is_single_chapter())
            .collect();
        assert_eq!(
            single,
            vec![
                BookId::Obadiah,
                BookId::Philemon,
                BookId::SecondJohn,
                BookId::ThirdJohn,
                BookId::Jude
            ]
        );
    }

    #[test]
    fn test_from_code_is_case_insensitive() {
        assert_eq!(BookId::from_code("jhn"), Some(BookId::John));
        assert_eq!(BookId::from_code("1JN"), Some(BookId::FirstJohn));
        assert_eq!(BookId::from_code("XYZ"), None);
    }

    #[test]
    fn test_serde_uses_code() {
        let json = serde_json::to_string(&BookId::SongOfSolomon).unwrap();
        assert_eq!(json, "\"SNG\"");
        let parsed: BookId = serde_json::from_str("\"heb\"").unwrap();
        assert_eq!(parsed, BookId::Hebrews);
        assert!(serde_json::from_str::<BookId>("\"NOPE\"").is_err());
    }
}
