//! Reference module
//!
//! Parsing, validation and comparison of passage references.
//!
//! # Example reference
//!
//! ```text
//! 1 John 1:9-2:2, 5; 3:1
//! │      │ │ │    │  └──── new segment, book carried over
//! │      │ │ │    └─────── verse list item (previous item named a verse)
//! │      │ │ └──────────── range end, chapter:verse
//! │      │ └────────────── verse
//! │      └──────────────── chapter
//! └─────────────────────── book alias, resolved case-insensitively
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use verse_engine::reference::{parse, normalize};
//!
//! let ranges = parse(&corpus, "john 3:16-18; Rom 5:8")?;
//! let address = normalize(&corpus, "Jn 3.16")?;
//! assert_eq!(address.to_string(), "John 3:16");
//! ```

mod comparator;
mod parser;
mod types;

pub use types::{AddressRange, CanonicalAddress};

pub use parser::{normalize, parse, parse_range, try_parse, ParseError};

pub use comparator::{coalesce, compare_ranges, is_before, is_in_range};
