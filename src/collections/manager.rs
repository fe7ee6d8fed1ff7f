//! Collection manager
//!
//! Owns all collections for a session. Every method is one atomic unit:
//! either the whole edit commits or nothing changes.

use tracing::{debug, info, warn};

use super::error::{CollectionError, ImportError};
use super::import::{merge_collection, BulkImportReport, CardOutcome, ImportReport};
use super::serialized::SerializedCollection;
use super::types::{
    CardDraft, CardId, CardPatch, Collection, CollectionId, CollectionPatch, VerseCard,
};
use crate::annotations::{EntityKind, NotFoundError};
use crate::cancel::CancellationFlag;
use crate::corpus::CorpusIndex;
use crate::reference::{parse, AddressRange};

fn collection_not_found(id: &CollectionId) -> NotFoundError {
    NotFoundError {
        entity: EntityKind::Collection,
        id: id.to_string(),
    }
}

fn card_not_found(id: &CardId) -> NotFoundError {
    NotFoundError {
        entity: EntityKind::Card,
        id: id.to_string(),
    }
}

/// Parse a card's reference string into at least one range
fn parse_card_references(
    corpus: &CorpusIndex,
    references: &str,
) -> Result<Vec<AddressRange>, CollectionError> {
    if references.trim().is_empty() {
        return Err(CollectionError::NoReferences);
    }
    Ok(parse(corpus, references)?)
}

fn required_title(title: &str) -> Result<String, CollectionError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(CollectionError::EmptyTitle);
    }
    Ok(title.to_string())
}

#[derive(Debug, Clone, Default)]
pub struct CollectionManager {
    collections: Vec<Collection>,
    generation: u64,
}

impl CollectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted collections.
    ///
    /// Unlike a user import, any card that no longer validates fails the
    /// restore so stored data is never dropped silently.
    pub fn restore(
        corpus: &CorpusIndex,
        stored: Vec<SerializedCollection>,
    ) -> Result<Self, CollectionError> {
        let mut manager = Self::new();
        let cancel = CancellationFlag::new();
        for document in stored {
            let title = document.title.clone().unwrap_or_default();
            let invalid = |reason: String| CollectionError::InvalidRecord {
                title: title.clone(),
                reason,
            };
            document.validate().map_err(|e| invalid(e.to_string()))?;
            let (mut collection, report) = merge_collection(corpus, None, &document, &cancel)
                .map_err(|e| invalid(e.to_string()))?;
            for card in &report.cards {
                if let CardOutcome::Rejected { reasons } = &card.outcome {
                    return Err(invalid(format!("card {}: {}", card.index, reasons.join("; "))));
                }
            }
            collection.restore_timestamps(document.created_at, document.updated_at);
            manager.collections.push(collection);
        }
        Ok(manager)
    }

    /// Number of committed mutations since construction
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn get(&self, id: &CollectionId) -> Option<&Collection> {
        self.collections.iter().find(|c| c.id() == id)
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    fn position(&self, id: &CollectionId) -> Result<usize, CollectionError> {
        self.collections
            .iter()
            .position(|c| c.id() == id)
            .ok_or_else(|| collection_not_found(id).into())
    }

    fn commit(&mut self) {
        self.generation += 1;
    }

    pub fn create_collection(
        &mut self,
        title: &str,
        description: &str,
    ) -> Result<CollectionId, CollectionError> {
        let collection = Collection::new(
            CollectionId::new(),
            required_title(title)?,
            description.trim().to_string(),
        );
        let id = collection.id().clone();
        self.collections.push(collection);
        self.commit();
        debug!(collection_id = %id, "Created collection");
        Ok(id)
    }

    pub fn update_collection(
        &mut self,
        id: &CollectionId,
        patch: CollectionPatch,
    ) -> Result<(), CollectionError> {
        let index = self.position(id)?;
        let title = patch.title.as_deref().map(required_title).transpose()?;
        let collection = &mut self.collections[index];
        if let Some(title) = title {
            collection.title = title;
        }
        if let Some(description) = patch.description {
            collection.description = description.trim().to_string();
        }
        collection.touch();
        self.commit();
        Ok(())
    }

    pub fn delete_collection(&mut self, id: &CollectionId) -> Result<Collection, CollectionError> {
        let index = self.position(id)?;
        let removed = self.collections.remove(index);
        self.commit();
        info!(collection_id = %id, cards = removed.cards().len(), "Deleted collection");
        Ok(removed)
    }

    /// Append a card; its title defaults to the first reference
    pub fn add_card(
        &mut self,
        corpus: &CorpusIndex,
        collection: &CollectionId,
        draft: CardDraft,
    ) -> Result<CardId, CollectionError> {
        let index = self.position(collection)?;
        let references = parse_card_references(corpus, &draft.references)?;
        let title = draft
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| references[0].to_string());

        let id = CardId::new();
        let target = &mut self.collections[index];
        target.cards.push(VerseCard::new(
            id.clone(),
            title,
            draft.description.trim().to_string(),
            references,
        ));
        target.touch();
        self.commit();
        debug!(collection_id = %collection, card_id = %id, "Added card");
        Ok(id)
    }

    pub fn update_card(
        &mut self,
        corpus: &CorpusIndex,
        collection: &CollectionId,
        card: &CardId,
        patch: CardPatch,
    ) -> Result<(), CollectionError> {
        let index = self.position(collection)?;
        let references = patch
            .references
            .as_deref()
            .map(|r| parse_card_references(corpus, r))
            .transpose()?;
        let title = patch.title.as_deref().map(required_title).transpose()?;

        let target = &mut self.collections[index];
        let existing = target.card_mut(card).ok_or_else(|| card_not_found(card))?;
        if let Some(title) = title {
            existing.title = title;
        }
        if let Some(description) = patch.description {
            existing.description = description.trim().to_string();
        }
        if let Some(references) = references {
            existing.set_references(references);
        }
        target.touch();
        self.commit();
        Ok(())
    }

    pub fn remove_card(
        &mut self,
        collection: &CollectionId,
        card: &CardId,
    ) -> Result<VerseCard, CollectionError> {
        let index = self.position(collection)?;
        let target = &mut self.collections[index];
        let position = target
            .cards
            .iter()
            .position(|c| c.id() == card)
            .ok_or_else(|| card_not_found(card))?;
        let removed = target.cards.remove(position);
        target.touch();
        self.commit();
        Ok(removed)
    }

    /// Move a card to `to`, clamped to the end of the list
    pub fn move_card(
        &mut self,
        collection: &CollectionId,
        card: &CardId,
        to: usize,
    ) -> Result<(), CollectionError> {
        let index = self.position(collection)?;
        let target = &mut self.collections[index];
        let from = target
            .cards
            .iter()
            .position(|c| c.id() == card)
            .ok_or_else(|| card_not_found(card))?;
        let moved = target.cards.remove(from);
        let to = to.min(target.cards.len());
        target.cards.insert(to, moved);
        target.touch();
        self.commit();
        Ok(())
    }

    pub fn export_collection(
        &self,
        id: &CollectionId,
    ) -> Result<SerializedCollection, CollectionError> {
        self.get(id)
            .map(SerializedCollection::from)
            .ok_or_else(|| collection_not_found(id).into())
    }

    /// Every collection in export form
    pub fn export_all(&self) -> Vec<SerializedCollection> {
        self.collections.iter().map(SerializedCollection::from).collect()
    }

    /// Merge one exported collection into the manager.
    ///
    /// A collection is matched by id, or by title when the document has no
    /// id. Per-card problems are reported, not raised; the collection is
    /// committed once, after every card has been processed.
    pub fn import_collection(
        &mut self,
        corpus: &CorpusIndex,
        data: &SerializedCollection,
        cancel: &CancellationFlag,
    ) -> Result<ImportReport, ImportError> {
        data.validate()?;

        let existing = self.find_import_target(data);
        let (collection, report) = merge_collection(
            corpus,
            existing.map(|i| &self.collections[i]),
            data,
            cancel,
        )?;

        if report.changed() {
            match existing {
                Some(index) => self.collections[index] = collection,
                None => self.collections.push(collection),
            }
            self.commit();
        }

        if report.rejected() > 0 {
            warn!(
                collection_id = %report.collection_id,
                rejected = report.rejected(),
                "Some cards were rejected during import"
            );
        }
        info!(
            collection_id = %report.collection_id,
            added = report.added(),
            updated = report.updated(),
            unchanged = report.unchanged(),
            rejected = report.rejected(),
            "Imported collection"
        );
        Ok(report)
    }

    /// Parse a JSON document and import it
    pub fn import_json(
        &mut self,
        corpus: &CorpusIndex,
        json: &str,
        cancel: &CancellationFlag,
    ) -> Result<ImportReport, ImportError> {
        let data = SerializedCollection::from_json(json)?;
        self.import_collection(corpus, &data, cancel)
    }

    /// Import several collections, committing each as it completes.
    ///
    /// Invalid documents are reported and skipped. Cancellation stops before
    /// the next collection; the one in progress is not committed.
    pub fn import_many(
        &mut self,
        corpus: &CorpusIndex,
        documents: &[SerializedCollection],
        cancel: &CancellationFlag,
    ) -> BulkImportReport {
        let mut bulk = BulkImportReport::default();
        for (index, document) in documents.iter().enumerate() {
            if cancel.is_cancelled() {
                bulk.cancelled = true;
                break;
            }
            match self.import_collection(corpus, document, cancel) {
                Ok(report) => bulk.reports.push(report),
                Err(ImportError::Cancelled) => {
                    bulk.cancelled = true;
                    break;
                }
                Err(e) => {
                    warn!(index, error = %e, "Skipped invalid collection");
                    bulk.failures.push((index, e));
                }
            }
        }
        bulk
    }

    fn find_import_target(&self, data: &SerializedCollection) -> Option<usize> {
        let id = data.id.as_deref().map(str::trim).filter(|id| !id.is_empty());
        match id {
            Some(id) => self.collections.iter().position(|c| c.id().as_str() == id),
            None => {
                let title = data.title.as_deref().map(str::trim)?;
                self.collections.iter().position(|c| c.title == title)
            }
        }
    }
}
