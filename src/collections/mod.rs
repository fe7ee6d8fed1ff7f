//! Collection module
//!
//! Verse cards grouped into collections, with a versioned export format and
//! a merge-on-import that reports per-card results instead of failing the
//! whole document.

mod error;
mod import;
mod manager;
mod serialized;
mod types;

pub use types::{
    CardDraft, CardId, CardPatch, Collection, CollectionId, CollectionPatch, VerseCard,
};

pub use serialized::{SerializedCard, SerializedCollection, SCHEMA_VERSION};

pub use import::{BulkImportReport, CardOutcome, CardReport, ImportReport};

pub use error::{CollectionError, ImportError};

pub use manager::CollectionManager;
