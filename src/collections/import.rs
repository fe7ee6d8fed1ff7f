//! Collection import and merge
//!
//! Import is partial-success per card: every card is validated on its own
//! and either fully applied or rejected with reasons. Merging never replaces
//! a populated field with an omitted or empty one.

use serde::Serialize;

use super::error::ImportError;
use super::serialized::{SerializedCard, SerializedCollection};
use super::types::{CardId, Collection, CollectionId, VerseCard};
use crate::cancel::CancellationFlag;
use crate::corpus::CorpusIndex;
use crate::reference::{parse, AddressRange};

/// What happened to one incoming card
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum CardOutcome {
    Added { id: CardId },
    Updated { id: CardId },
    Unchanged { id: CardId },
    Rejected { reasons: Vec<String> },
}

impl CardOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, CardOutcome::Rejected { .. })
    }
}

/// Per-card line of an import report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardReport {
    /// Position of the card in the imported document
    pub index: usize,
    pub title: Option<String>,
    #[serde(flatten)]
    pub outcome: CardOutcome,
}

/// Result of importing one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub collection_id: CollectionId,
    /// The collection did not exist before
    pub created: bool,
    /// Title or description of an existing collection changed
    pub collection_updated: bool,
    pub cards: Vec<CardReport>,
}

impl ImportReport {
    fn count(&self, pred: impl Fn(&CardOutcome) -> bool) -> usize {
        self.cards.iter().filter(|c| pred(&c.outcome)).count()
    }

    pub fn added(&self) -> usize {
        self.count(|o| matches!(o, CardOutcome::Added { .. }))
    }

    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, CardOutcome::Updated { .. }))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, CardOutcome::Unchanged { .. }))
    }

    pub fn rejected(&self) -> usize {
        self.count(CardOutcome::is_rejected)
    }

    pub fn accepted(&self) -> usize {
        self.cards.len() - self.rejected()
    }

    /// Whether the import changed anything
    pub fn changed(&self) -> bool {
        self.created || self.collection_updated || self.added() > 0 || self.updated() > 0
    }
}

/// Result of importing several collections
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkImportReport {
    pub reports: Vec<ImportReport>,
    /// Documents that failed validation, by position
    pub failures: Vec<(usize, ImportError)>,
    /// Import stopped early; collections after the last report were skipped
    pub cancelled: bool,
}

/// Treat blank strings as omitted
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Parse every reference string; all must succeed
fn parse_references(
    corpus: &CorpusIndex,
    references: &[String],
) -> Result<Vec<AddressRange>, Vec<String>> {
    let mut ranges = Vec::new();
    let mut reasons = Vec::new();
    for reference in references {
        match parse(corpus, reference) {
            Ok(parsed) => ranges.extend(parsed),
            Err(e) => reasons.push(format!("\"{}\": {}", reference, e)),
        }
    }
    if reasons.is_empty() {
        Ok(ranges)
    } else {
        Err(reasons)
    }
}

/// Build the collection that importing `incoming` over `existing` produces.
///
/// Works on a copy so a cancelled import leaves `existing` untouched.
pub(crate) fn merge_collection(
    corpus: &CorpusIndex,
    existing: Option<&Collection>,
    incoming: &SerializedCollection,
    cancel: &CancellationFlag,
) -> Result<(Collection, ImportReport), ImportError> {
    let title = non_empty(&incoming.title);
    let description = non_empty(&incoming.description);

    let (mut target, created, collection_updated) = match existing {
        Some(existing) => {
            let mut target = existing.clone();
            let mut updated = false;
            if let Some(title) = title.filter(|t| *t != target.title) {
                target.title = title.to_string();
                updated = true;
            }
            if let Some(description) = description.filter(|d| *d != target.description) {
                target.description = description.to_string();
                updated = true;
            }
            (target, false, updated)
        }
        None => {
            let id = non_empty(&incoming.id)
                .map(CollectionId::from)
                .unwrap_or_default();
            let collection = Collection::new(
                id,
                title.unwrap_or("Untitled collection").to_string(),
                description.unwrap_or_default().to_string(),
            );
            (collection, true, false)
        }
    };

    let mut cards = Vec::with_capacity(incoming.cards.len());
    for (index, card) in incoming.cards.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(ImportError::Cancelled);
        }
        cards.push(CardReport {
            index,
            title: card.title.clone(),
            outcome: merge_card(corpus, &mut target, card),
        });
    }

    let report = ImportReport {
        collection_id: target.id().clone(),
        created,
        collection_updated,
        cards,
    };
    if report.changed() {
        target.touch();
    }
    Ok((target, report))
}

/// Apply one incoming card to `target`
fn merge_card(corpus: &CorpusIndex, target: &mut Collection, card: &SerializedCard) -> CardOutcome {
    let references = match parse_references(corpus, &card.references) {
        Ok(references) => references,
        Err(reasons) => return CardOutcome::Rejected { reasons },
    };
    let title = non_empty(&card.title);
    let description = non_empty(&card.description);

    let incoming_id = non_empty(&card.id).map(CardId::from);

    // Same id: update in place without blanking populated fields
    if let Some(id) = &incoming_id {
        if let Some(existing) = target.card_mut(id) {
            let mut changed = false;
            if let Some(title) = title.filter(|t| *t != existing.title) {
                existing.title = title.to_string();
                changed = true;
            }
            if let Some(description) = description.filter(|d| *d != existing.description) {
                existing.description = description.to_string();
                changed = true;
            }
            if !references.is_empty() && existing.references() != references.as_slice() {
                existing.set_references(references);
                changed = true;
            }
            let id = id.clone();
            return if changed {
                CardOutcome::Updated { id }
            } else {
                CardOutcome::Unchanged { id }
            };
        }
    }

    let Some(first) = references.first() else {
        return CardOutcome::Rejected {
            reasons: vec!["a new card needs at least one reference".to_string()],
        };
    };
    let title = title
        .map(str::to_string)
        .unwrap_or_else(|| first.to_string());

    // Without an id, same content means the card was imported before
    if incoming_id.is_none() {
        if let Some(existing) = target
            .cards
            .iter_mut()
            .find(|c| c.title == title && c.references() == references.as_slice())
        {
            let id = existing.id().clone();
            return match description {
                Some(description) if existing.description.is_empty() => {
                    existing.description = description.to_string();
                    CardOutcome::Updated { id }
                }
                _ => CardOutcome::Unchanged { id },
            };
        }
    }

    let id = incoming_id.unwrap_or_default();
    target.cards.push(VerseCard::new(
        id.clone(),
        title,
        description.unwrap_or_default().to_string(),
        references,
    ));
    CardOutcome::Added { id }
}
