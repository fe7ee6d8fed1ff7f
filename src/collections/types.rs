//! Collection and verse card types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reference::AddressRange;

/// Collection identifier. Imported files may carry their own id strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(String);

impl CollectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CollectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for CollectionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Verse card identifier, unique within its collection
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CardId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for CardId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A titled note referencing one or more ranges, possibly non-contiguous
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerseCard {
    id: CardId,
    pub title: String,
    pub description: String,
    references: Vec<AddressRange>,
}

impl VerseCard {
    /// Callers guarantee `references` is not empty
    pub(crate) fn new(
        id: CardId,
        title: String,
        description: String,
        references: Vec<AddressRange>,
    ) -> Self {
        debug_assert!(!references.is_empty());
        Self {
            id,
            title,
            description,
            references,
        }
    }

    pub fn id(&self) -> &CardId {
        &self.id
    }

    pub fn references(&self) -> &[AddressRange] {
        &self.references
    }

    pub(crate) fn set_references(&mut self, references: Vec<AddressRange>) {
        debug_assert!(!references.is_empty());
        self.references = references;
    }

    /// Reference display strings, in order
    pub fn reference_strings(&self) -> Vec<String> {
        self.references.iter().map(|r| r.to_string()).collect()
    }
}

/// A user-curated group of verse cards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    id: CollectionId,
    pub title: String,
    pub description: String,
    pub(crate) cards: Vec<VerseCard>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Collection {
    pub(crate) fn new(id: CollectionId, title: String, description: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            title,
            description,
            cards: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &CollectionId {
        &self.id
    }

    pub fn cards(&self) -> &[VerseCard] {
        &self.cards
    }

    pub fn card(&self, id: &CardId) -> Option<&VerseCard> {
        self.cards.iter().find(|c| &c.id == id)
    }

    pub(crate) fn card_mut(&mut self, id: &CardId) -> Option<&mut VerseCard> {
        self.cards.iter_mut().find(|c| &c.id == id)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Put back persisted timestamps; absent ones are left as they are
    pub(crate) fn restore_timestamps(
        &mut self,
        created_at: Option<DateTime<Utc>>,
        updated_at: Option<DateTime<Utc>>,
    ) {
        if let Some(created_at) = created_at {
            self.created_at = created_at;
        }
        if let Some(updated_at) = updated_at {
            self.updated_at = updated_at;
        }
    }

    /// Whether two collections hold the same user-visible content, ignoring
    /// ids and timestamps
    pub fn same_content(&self, other: &Collection) -> bool {
        self.title == other.title
            && self.description == other.description
            && self.cards.len() == other.cards.len()
            && self.cards.iter().zip(&other.cards).all(|(a, b)| {
                a.title == b.title && a.description == b.description && a.references == b.references
            })
    }
}

/// Partial collection update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Input for a new card. `references` is parsed as one reference string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardDraft {
    pub title: Option<String>,
    pub description: String,
    pub references: String,
}

/// Partial card update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub references: Option<String>,
}
