//! Annotation store
//!
//! Owns every annotation and layer. Mutations arrive as `AnnotationCommand`
//! values; each is applied to a private copy of the index which replaces the
//! live one only when the whole command succeeds. Readers hold an
//! `AnnotationSnapshot` (a shared pointer to one index generation) and never
//! observe a half-applied command.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Deref;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::commands::{AnnotationCommand, CommandOutcome, LayerPatch};
use super::error::{ConflictError, NotFoundError, StoreError};
use super::policy::{merge_payloads, LayerDeletionPolicy, OverlapPolicy, LAYER_DELETION_POLICY};
use super::types::{
    Annotation, AnnotationId, AnnotationKind, AnnotationPayload, Layer, LayerId, StoredAnnotation,
};
use crate::corpus::{BookId, CorpusIndex};
use crate::reference::{parse_range, AddressRange, CanonicalAddress};

/// Where a placed annotation ended up
#[derive(Debug, Clone, PartialEq, Eq)]
enum Placement {
    Inserted(AnnotationId),
    Merged {
        id: AnnotationId,
        replaced: Vec<AnnotationId>,
    },
}

/// One generation of the annotation data
#[derive(Debug, Clone, Default)]
pub struct AnnotationIndex {
    annotations: BTreeMap<AnnotationId, Annotation>,
    /// Per-book start index for overlap lookups
    by_book: BTreeMap<BookId, BTreeSet<(CanonicalAddress, AnnotationId)>>,
    layers: BTreeMap<LayerId, Layer>,
}

impl AnnotationIndex {
    fn with_default_layer(default_layer: Layer) -> Self {
        let mut index = Self::default();
        index.layers.insert(LayerId::DEFAULT, Layer {
            id: LayerId::DEFAULT,
            ..default_layer
        });
        index
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.get(&id)
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(&id)
    }

    /// Layers in stacking order
    pub fn layers(&self) -> Vec<&Layer> {
        let mut layers: Vec<&Layer> = self.layers.values().collect();
        layers.sort_by_key(|l| (l.order, l.id));
        layers
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// All annotations in address order
    pub fn iter(&self) -> impl Iterator<Item = &Annotation> + '_ {
        self.by_book
            .values()
            .flat_map(|starts| starts.iter())
            .filter_map(move |(_, id)| self.annotations.get(id))
    }

    /// Annotations overlapping `range`, ordered by layer order then address
    pub fn annotations_overlapping(&self, range: &AddressRange) -> Vec<&Annotation> {
        let mut found: Vec<&Annotation> = self.overlapping_iter(*range).collect();
        self.sort_for_display(&mut found);
        found
    }

    /// Like `annotations_overlapping`, restricted to visible layers
    pub fn visible_overlapping(&self, range: &AddressRange) -> Vec<&Annotation> {
        let mut found: Vec<&Annotation> = self
            .overlapping_iter(*range)
            .filter(|a| self.layers.get(&a.layer_id()).is_some_and(|l| l.visible))
            .collect();
        self.sort_for_display(&mut found);
        found
    }

    /// Annotations on one layer in address order
    pub fn annotations_in_layer(&self, layer: LayerId) -> Vec<&Annotation> {
        self.iter().filter(|a| a.layer_id() == layer).collect()
    }

    pub fn count_in_layer(&self, layer: LayerId) -> usize {
        self.annotations
            .values()
            .filter(|a| a.layer_id() == layer)
            .count()
    }

    /// Serializable copy of every layer and annotation
    pub fn to_stored(&self) -> (Vec<Layer>, Vec<StoredAnnotation>) {
        let layers = self.layers().into_iter().cloned().collect();
        let annotations = self.iter().map(StoredAnnotation::from).collect();
        (layers, annotations)
    }

    fn overlapping_iter(&self, range: AddressRange) -> impl Iterator<Item = &Annotation> + '_ {
        self.by_book
            .get(&range.book())
            .into_iter()
            .flat_map(|starts| starts.iter())
            .take_while(move |(start, _)| *start <= range.end())
            .filter_map(move |(_, id)| self.annotations.get(id))
            .filter(move |a| a.range().overlaps(&range))
    }

    fn sort_for_display(&self, annotations: &mut [&Annotation]) {
        annotations.sort_by_key(|a| {
            let order = self
                .layers
                .get(&a.layer_id())
                .map(|l| l.order)
                .unwrap_or(i32::MAX);
            (
                order,
                a.range().start(),
                a.range().end(),
                a.layer_id(),
                a.created_at(),
                a.id(),
            )
        });
    }

    fn insert(&mut self, annotation: Annotation) {
        let range = *annotation.range();
        let id = annotation.id();
        self.by_book
            .entry(range.book())
            .or_default()
            .insert((range.start(), id));
        self.annotations.insert(id, annotation);
    }

    fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        let annotation = self.annotations.remove(&id)?;
        let range = annotation.range();
        if let Some(starts) = self.by_book.get_mut(&range.book()) {
            starts.remove(&(range.start(), id));
            if starts.is_empty() {
                self.by_book.remove(&range.book());
            }
        }
        Some(annotation)
    }

    fn require_layer(&self, layer: LayerId) -> Result<(), NotFoundError> {
        if self.layers.contains_key(&layer) {
            Ok(())
        } else {
            Err(NotFoundError::layer(layer))
        }
    }

    /// Same-kind annotations on `layer` overlapping `range`
    fn conflicts(
        &self,
        range: &AddressRange,
        layer: LayerId,
        kind: AnnotationKind,
        exclude: AnnotationId,
    ) -> Vec<AnnotationId> {
        self.overlapping_iter(*range)
            .filter(|a| a.id() != exclude && a.layer_id() == layer && a.kind() == kind)
            .map(Annotation::id)
            .collect()
    }

    /// Insert `candidate`, applying the overlap policy
    fn place(
        &mut self,
        candidate: Annotation,
        policy: OverlapPolicy,
    ) -> Result<Placement, ConflictError> {
        let layer = candidate.layer_id();
        let kind = candidate.kind();
        let conflicting = self.conflicts(candidate.range(), layer, kind, candidate.id());
        if conflicting.is_empty() {
            let id = candidate.id();
            self.insert(candidate);
            return Ok(Placement::Inserted(id));
        }

        if policy == OverlapPolicy::Reject {
            return Err(ConflictError {
                layer,
                kind,
                range: *candidate.range(),
                conflicting,
            });
        }

        // Absorb until the union no longer overlaps anything new
        let mut range = *candidate.range();
        let mut absorbed: Vec<Annotation> = Vec::new();
        let mut pending = conflicting;
        while !pending.is_empty() {
            for id in pending {
                if let Some(existing) = self.remove(id) {
                    range = range.union(existing.range()).unwrap_or(range);
                    absorbed.push(existing);
                }
            }
            pending = self.conflicts(&range, layer, kind, candidate.id());
        }

        let payload = merge_payloads(&candidate, &absorbed);
        let merged = Annotation::new(range, layer, payload);
        let id = merged.id();
        self.insert(merged);

        let mut replaced: Vec<AnnotationId> = absorbed.iter().map(Annotation::id).collect();
        replaced.sort();
        Ok(Placement::Merged { id, replaced })
    }

    fn apply(
        &mut self,
        command: AnnotationCommand,
        policy: OverlapPolicy,
    ) -> Result<CommandOutcome, StoreError> {
        match command {
            AnnotationCommand::Create {
                range,
                layer,
                payload,
            } => {
                self.require_layer(layer)?;
                let outcome = match self.place(Annotation::new(range, layer, payload), policy)? {
                    Placement::Inserted(id) => CommandOutcome::Created(id),
                    Placement::Merged { id, replaced } => CommandOutcome::Merged { id, replaced },
                };
                Ok(outcome)
            }

            AnnotationCommand::UpdatePayload { id, payload } => {
                let annotation = self
                    .annotations
                    .get_mut(&id)
                    .ok_or_else(|| NotFoundError::annotation(id))?;
                if annotation.kind() != payload.kind() {
                    return Err(StoreError::KindMismatch {
                        from: annotation.kind(),
                        to: payload.kind(),
                    });
                }
                annotation.set_payload(payload);
                Ok(CommandOutcome::Updated(id))
            }

            AnnotationCommand::MoveToLayer { id, layer } => {
                self.require_layer(layer)?;
                let mut annotation = self.remove(id).ok_or_else(|| NotFoundError::annotation(id))?;
                if annotation.layer_id() == layer {
                    self.insert(annotation);
                    return Ok(CommandOutcome::Updated(id));
                }
                annotation.set_layer(layer);
                match self.place(annotation, policy)? {
                    Placement::Inserted(id) => Ok(CommandOutcome::Updated(id)),
                    Placement::Merged {
                        id: merged,
                        mut replaced,
                    } => {
                        replaced.push(id);
                        Ok(CommandOutcome::Merged {
                            id: merged,
                            replaced,
                        })
                    }
                }
            }

            AnnotationCommand::Move { id, range } => {
                let old = self.remove(id).ok_or_else(|| NotFoundError::annotation(id))?;
                let recreated = Annotation::new(range, old.layer_id(), old.payload().clone());
                let (new, replaced) = match self.place(recreated, policy)? {
                    Placement::Inserted(new) => (new, Vec::new()),
                    Placement::Merged { id, replaced } => (id, replaced),
                };
                Ok(CommandOutcome::Moved {
                    old: id,
                    new,
                    replaced,
                })
            }

            AnnotationCommand::Delete { id } => {
                self.remove(id).ok_or_else(|| NotFoundError::annotation(id))?;
                Ok(CommandOutcome::Deleted(id))
            }

            AnnotationCommand::CreateLayer { name, color, order } => self
                .create_layer(&name, &color, order)
                .map(CommandOutcome::LayerCreated),

            AnnotationCommand::UpdateLayer { id, patch } => {
                let layer = self
                    .layers
                    .get_mut(&id)
                    .ok_or_else(|| NotFoundError::layer(id))?;
                apply_layer_patch(layer, patch)?;
                Ok(CommandOutcome::LayerUpdated(id))
            }

            AnnotationCommand::DeleteLayer { id } => {
                self.delete_layer(id, LAYER_DELETION_POLICY, policy)
            }
        }
    }

    fn create_layer(&mut self, name: &str, color: &str, order: i32) -> Result<LayerId, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyLayerName);
        }
        let layer = Layer::new(name, color, order);
        let id = layer.id;
        self.layers.insert(id, layer);
        Ok(id)
    }

    pub(crate) fn delete_layer(
        &mut self,
        id: LayerId,
        deletion: LayerDeletionPolicy,
        overlap: OverlapPolicy,
    ) -> Result<CommandOutcome, StoreError> {
        if id.is_default() {
            return Err(StoreError::DefaultLayerProtected);
        }
        self.require_layer(id)?;

        let owned: Vec<AnnotationId> = self
            .annotations_in_layer(id)
            .into_iter()
            .map(Annotation::id)
            .collect();
        self.layers.remove(&id);

        let mut reassigned = 0;
        let mut removed = 0;
        for annotation_id in owned {
            let Some(mut annotation) = self.remove(annotation_id) else {
                continue;
            };
            match deletion {
                LayerDeletionPolicy::Cascade => removed += 1,
                LayerDeletionPolicy::ReassignToDefault => {
                    annotation.set_layer(LayerId::DEFAULT);
                    self.place(annotation, overlap)?;
                    reassigned += 1;
                }
            }
        }

        Ok(CommandOutcome::LayerDeleted {
            id,
            reassigned,
            removed,
        })
    }
}

fn apply_layer_patch(layer: &mut Layer, patch: LayerPatch) -> Result<(), StoreError> {
    if let Some(name) = patch.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyLayerName);
        }
        layer.name = name.to_string();
    }
    if let Some(color) = patch.color {
        layer.color = color;
    }
    if let Some(visible) = patch.visible {
        layer.visible = visible;
    }
    if let Some(order) = patch.order {
        layer.order = order;
    }
    Ok(())
}

/// Read-only view of one committed generation
#[derive(Debug, Clone)]
pub struct AnnotationSnapshot(Arc<AnnotationIndex>);

impl Deref for AnnotationSnapshot {
    type Target = AnnotationIndex;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Owner of all annotation state
#[derive(Debug)]
pub struct AnnotationStore {
    index: Arc<AnnotationIndex>,
    overlap_policy: OverlapPolicy,
    generation: u64,
}

impl AnnotationStore {
    /// Create an empty store holding only the default layer
    pub fn new(default_layer: Layer, overlap_policy: OverlapPolicy) -> Self {
        Self {
            index: Arc::new(AnnotationIndex::with_default_layer(default_layer)),
            overlap_policy,
            generation: 0,
        }
    }

    /// Rebuild a store from persisted records.
    ///
    /// Every stored range is re-parsed against `corpus`; any invalid record
    /// fails the whole restore.
    pub fn restore(
        corpus: &CorpusIndex,
        default_layer: Layer,
        overlap_policy: OverlapPolicy,
        layers: Vec<Layer>,
        annotations: Vec<StoredAnnotation>,
    ) -> Result<Self, StoreError> {
        let mut index = AnnotationIndex::with_default_layer(default_layer);
        for layer in layers {
            index.layers.insert(layer.id, layer);
        }

        for stored in annotations {
            let range = parse_range(corpus, &stored.range).map_err(|e| StoreError::InvalidRecord {
                id: stored.id.to_string(),
                reason: e.to_string(),
            })?;
            if !index.layers.contains_key(&stored.layer_id) {
                return Err(StoreError::InvalidRecord {
                    id: stored.id.to_string(),
                    reason: format!("layer {} does not exist", stored.layer_id),
                });
            }
            index.insert(Annotation::restored(
                stored.id,
                range,
                stored.layer_id,
                stored.created_at,
                stored.updated_at,
                stored.payload,
            ));
        }

        info!(
            annotations = index.len(),
            layers = index.layers.len(),
            "Restored annotation store"
        );
        Ok(Self {
            index: Arc::new(index),
            overlap_policy,
            generation: 0,
        })
    }

    /// Apply one command atomically
    pub fn apply(&mut self, command: AnnotationCommand) -> Result<CommandOutcome, StoreError> {
        let name = command.name();
        let compound = command.is_compound();
        let policy = self.overlap_policy;
        let outcome = self.commit(name, compound, |index| index.apply(command, policy))?;
        match &outcome {
            CommandOutcome::LayerDeleted {
                id,
                reassigned,
                removed,
            } => info!(layer_id = %id, reassigned, removed, "Deleted layer"),
            other => debug!(command = name, outcome = ?other, "Applied annotation command"),
        }
        Ok(outcome)
    }

    /// Run one edit against the index and count it on success.
    ///
    /// Compound edits run on a private copy that replaces the index only on
    /// success. Single-step edits validate before mutating, so they write
    /// through `Arc::make_mut`, which copies only while a snapshot is alive.
    fn commit<T>(
        &mut self,
        name: &'static str,
        compound: bool,
        edit: impl FnOnce(&mut AnnotationIndex) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let result = if compound {
            let mut working = (*self.index).clone();
            let result = edit(&mut working);
            if result.is_ok() {
                self.index = Arc::new(working);
            }
            result
        } else {
            edit(Arc::make_mut(&mut self.index))
        };
        match &result {
            Ok(_) => self.generation += 1,
            Err(e) => warn!(command = name, error = %e, "Rejected annotation command"),
        }
        result
    }

    /// Consistent read view that later writes do not affect
    pub fn snapshot(&self) -> AnnotationSnapshot {
        AnnotationSnapshot(Arc::clone(&self.index))
    }

    /// Number of committed mutations since construction
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn overlap_policy(&self) -> OverlapPolicy {
        self.overlap_policy
    }

    pub fn set_overlap_policy(&mut self, policy: OverlapPolicy) {
        self.overlap_policy = policy;
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.index.get(id)
    }

    pub fn annotations_overlapping(&self, range: &AddressRange) -> Vec<&Annotation> {
        self.index.annotations_overlapping(range)
    }

    pub fn layers(&self) -> Vec<&Layer> {
        self.index.layers()
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.index.layer(id)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn to_stored(&self) -> (Vec<Layer>, Vec<StoredAnnotation>) {
        self.index.to_stored()
    }

    /// Create a highlight on a layer
    pub fn highlight(
        &mut self,
        range: AddressRange,
        layer: LayerId,
        color: &str,
    ) -> Result<CommandOutcome, StoreError> {
        self.apply(AnnotationCommand::create(
            range,
            layer,
            AnnotationPayload::highlight(color),
        ))
    }

    /// Create a note on a layer
    pub fn note(
        &mut self,
        range: AddressRange,
        layer: LayerId,
        text: &str,
    ) -> Result<CommandOutcome, StoreError> {
        self.apply(AnnotationCommand::create(
            range,
            layer,
            AnnotationPayload::note(text),
        ))
    }

    /// Create a bookmark on a layer
    pub fn bookmark(
        &mut self,
        range: AddressRange,
        layer: LayerId,
    ) -> Result<CommandOutcome, StoreError> {
        self.apply(AnnotationCommand::create(
            range,
            layer,
            AnnotationPayload::Bookmark,
        ))
    }

    /// Create a layer and return its id
    pub fn create_layer(&mut self, name: &str, color: &str, order: i32) -> Result<LayerId, StoreError> {
        let id = self.commit("create_layer", false, |index| index.create_layer(name, color, order))?;
        debug!(layer_id = %id, "Created layer");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::test_corpus;

    fn store() -> AnnotationStore {
        AnnotationStore::new(Layer::default_layer("Default", "yellow"), OverlapPolicy::Reject)
    }

    fn range(input: &str) -> AddressRange {
        parse_range(&test_corpus(), input).unwrap()
    }

    fn created(outcome: CommandOutcome) -> AnnotationId {
        outcome.annotation_id().unwrap()
    }

    #[test]
    fn test_overlapping_ordered_by_layer_order() {
        let mut store = store();
        let l2 = store.create_layer("Study", "blue", 2).unwrap();
        let l1 = store.create_layer("Devotional", "green", 1).unwrap();

        let note = created(store.note(range("John 3:16-17"), l2, "God's love").unwrap());
        let highlight = created(store.highlight(range("John 3:16"), l1, "green").unwrap());

        let found: Vec<AnnotationId> = store
            .annotations_overlapping(&range("John 3:16"))
            .iter()
            .map(|a| a.id())
            .collect();
        assert_eq!(found, vec![highlight, note]);

        assert_eq!(store.annotations_overlapping(&range("John 3:17")).len(), 1);
        assert!(store.annotations_overlapping(&range("John 3:19")).is_empty());
        assert!(store.annotations_overlapping(&range("Romans 5:8")).is_empty());
    }

    #[test]
    fn test_different_layers_and_kinds_may_overlap() {
        let mut store = store();
        let layer = store.create_layer("Study", "blue", 1).unwrap();
        store.highlight(range("John 3:16"), LayerId::DEFAULT, "yellow").unwrap();
        store.highlight(range("John 3:16"), layer, "blue").unwrap();
        store.note(range("John 3:16"), layer, "note").unwrap();
        store.bookmark(range("John 3:16"), layer).unwrap();
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_reject_policy_surfaces_conflict() {
        let mut store = store();
        let first = created(store.highlight(range("John 3:16-18"), LayerId::DEFAULT, "yellow").unwrap());
        let generation = store.generation();

        match store.highlight(range("John 3:18-20"), LayerId::DEFAULT, "green") {
            Err(StoreError::Conflict(conflict)) => {
                assert_eq!(conflict.conflicting, vec![first]);
                assert_eq!(conflict.kind, AnnotationKind::Highlight);
            }
            other => panic!("expected conflict, got {:?}", other),
        }
        assert_eq!(store.len(), 1);
        assert_eq!(store.generation(), generation);
    }

    #[test]
    fn test_merge_policy_unions_to_fixpoint() {
        let mut store = store();
        store.set_overlap_policy(OverlapPolicy::Merge);
        let a = created(store.note(range("John 3:16"), LayerId::DEFAULT, "a").unwrap());
        let b = created(store.note(range("John 3:18-19"), LayerId::DEFAULT, "b").unwrap());

        let outcome = store.note(range("John 3:16-18"), LayerId::DEFAULT, "c").unwrap();
        let CommandOutcome::Merged { id, replaced } = outcome else {
            panic!("expected merge, got {:?}", outcome);
        };
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(replaced, expected);

        let merged = store.get(id).unwrap();
        assert_eq!(merged.range().to_string(), "John 3:16-19");
        assert_eq!(merged.payload().note_text(), Some("a\n\nc\n\nb"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_update_payload_keeps_id_and_range() {
        let mut store = store();
        let id = created(store.highlight(range("John 3:16"), LayerId::DEFAULT, "yellow").unwrap());
        let before = store.get(id).unwrap().clone();

        store
            .apply(AnnotationCommand::UpdatePayload {
                id,
                payload: AnnotationPayload::highlight("green"),
            })
            .unwrap();
        let after = store.get(id).unwrap();
        assert_eq!(after.id(), before.id());
        assert_eq!(after.range(), before.range());
        assert_eq!(after.payload(), &AnnotationPayload::highlight("green"));

        assert_eq!(
            store.apply(AnnotationCommand::UpdatePayload {
                id,
                payload: AnnotationPayload::note("x"),
            }),
            Err(StoreError::KindMismatch {
                from: AnnotationKind::Highlight,
                to: AnnotationKind::Note
            })
        );
    }

    #[test]
    fn test_move_is_delete_and_recreate() {
        let mut store = store();
        let id = created(store.bookmark(range("John 3:16"), LayerId::DEFAULT).unwrap());
        let outcome = store
            .apply(AnnotationCommand::Move {
                id,
                range: range("Romans 5:8"),
            })
            .unwrap();
        let CommandOutcome::Moved { old, new, replaced } = outcome else {
            panic!("expected move, got {:?}", outcome);
        };
        assert_eq!(old, id);
        assert_ne!(new, id);
        assert!(replaced.is_empty());
        assert!(store.get(id).is_none());
        assert_eq!(store.get(new).unwrap().range().to_string(), "Romans 5:8");
    }

    #[test]
    fn test_not_found() {
        let mut store = store();
        let missing = AnnotationId::new();
        assert!(matches!(
            store.apply(AnnotationCommand::Delete { id: missing }),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.highlight(range("John 3:16"), LayerId::new(), "yellow"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_layer_reassigns_to_default() {
        let mut store = store();
        let layer = store.create_layer("Study", "blue", 1).unwrap();
        store.highlight(range("John 3:16"), layer, "blue").unwrap();
        store.note(range("Romans 5:8"), layer, "grace").unwrap();
        assert_eq!(store.len(), 2);

        let outcome = store.apply(AnnotationCommand::DeleteLayer { id: layer }).unwrap();
        assert_eq!(
            outcome,
            CommandOutcome::LayerDeleted {
                id: layer,
                reassigned: 2,
                removed: 0
            }
        );
        assert_eq!(store.len(), 2);
        assert!(store.layer(layer).is_none());
        assert!(store
            .snapshot()
            .iter()
            .all(|a| a.layer_id() == LayerId::DEFAULT));
    }

    #[test]
    fn test_delete_layer_reassign_conflict_aborts() {
        let mut store = store();
        let layer = store.create_layer("Study", "blue", 1).unwrap();
        store.highlight(range("John 3:16"), LayerId::DEFAULT, "yellow").unwrap();
        store.highlight(range("John 3:16-17"), layer, "blue").unwrap();

        assert!(matches!(
            store.apply(AnnotationCommand::DeleteLayer { id: layer }),
            Err(StoreError::Conflict(_))
        ));
        assert!(store.layer(layer).is_some());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_delete_layer_cascade() {
        let mut index = AnnotationIndex::with_default_layer(Layer::default_layer("Default", "yellow"));
        let layer = Layer::new("Scratch", "red", 1);
        let layer_id = layer.id;
        index.layers.insert(layer_id, layer);
        index
            .apply(
                AnnotationCommand::create(range("John 3:16"), layer_id, AnnotationPayload::Bookmark),
                OverlapPolicy::Reject,
            )
            .unwrap();

        let outcome = index
            .delete_layer(layer_id, LayerDeletionPolicy::Cascade, OverlapPolicy::Reject)
            .unwrap();
        assert_eq!(
            outcome,
            CommandOutcome::LayerDeleted {
                id: layer_id,
                reassigned: 0,
                removed: 1
            }
        );
        assert!(index.is_empty());
    }

    #[test]
    fn test_default_layer_protected() {
        let mut store = store();
        assert_eq!(
            store.apply(AnnotationCommand::DeleteLayer { id: LayerId::DEFAULT }),
            Err(StoreError::DefaultLayerProtected)
        );
    }

    #[test]
    fn test_update_layer_and_visibility_filter() {
        let mut store = store();
        let layer = store.create_layer("Study", "blue", 1).unwrap();
        store.highlight(range("John 3:16"), layer, "blue").unwrap();
        store
            .apply(AnnotationCommand::UpdateLayer {
                id: layer,
                patch: LayerPatch {
                    visible: Some(false),
                    ..LayerPatch::default()
                },
            })
            .unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.annotations_overlapping(&range("John 3:16")).len(), 1);
        assert!(snapshot.visible_overlapping(&range("John 3:16")).is_empty());
        assert_eq!(store.layer(layer).unwrap().name, "Study");

        assert_eq!(
            store.apply(AnnotationCommand::UpdateLayer {
                id: layer,
                patch: LayerPatch {
                    name: Some("  ".to_string()),
                    ..LayerPatch::default()
                },
            }),
            Err(StoreError::EmptyLayerName)
        );
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_writes() {
        let mut store = store();
        store.bookmark(range("John 3:16"), LayerId::DEFAULT).unwrap();
        let snapshot = store.snapshot();
        store.bookmark(range("Romans 5:8"), LayerId::DEFAULT).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_single_step_edit_writes_in_place_without_snapshot() {
        let mut store = store();
        store.bookmark(range("John 3:16"), LayerId::DEFAULT).unwrap();
        let before = Arc::as_ptr(&store.index);
        store.bookmark(range("Romans 5:8"), LayerId::DEFAULT).unwrap();
        assert_eq!(Arc::as_ptr(&store.index), before);

        // A live snapshot forces a copy instead
        let snapshot = store.snapshot();
        store.bookmark(range("Jude 1:3"), LayerId::DEFAULT).unwrap();
        assert_ne!(Arc::as_ptr(&store.index), Arc::as_ptr(&snapshot.0));
        assert_eq!(snapshot.len(), 2);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_failed_move_leaves_annotation_in_place() {
        let mut store = store();
        let moving = created(store.highlight(range("John 3:16"), LayerId::DEFAULT, "yellow").unwrap());
        store.highlight(range("Romans 5:8"), LayerId::DEFAULT, "green").unwrap();
        let generation = store.generation();

        assert!(matches!(
            store.apply(AnnotationCommand::Move {
                id: moving,
                range: range("Romans 5:8"),
            }),
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(store.get(moving).unwrap().range().to_string(), "John 3:16");
        assert_eq!(store.len(), 2);
        assert_eq!(store.generation(), generation);
    }

    #[test]
    fn test_create_layer_rejects_blank_name() {
        let mut store = store();
        assert_eq!(store.create_layer("  ", "blue", 1), Err(StoreError::EmptyLayerName));
        assert_eq!(store.layers().len(), 1);
        assert_eq!(store.generation(), 0);
    }

    #[test]
    fn test_restore_round_trip() {
        let corpus = test_corpus();
        let mut store = store();
        let layer = store.create_layer("Study", "blue", 1).unwrap();
        let id = created(store.note(range("John 3:16-4:1"), layer, "text").unwrap());

        let (layers, annotations) = store.to_stored();
        let restored = AnnotationStore::restore(
            &corpus,
            Layer::default_layer("Default", "yellow"),
            OverlapPolicy::Reject,
            layers,
            annotations,
        )
        .unwrap();
        assert_eq!(restored.get(id), store.get(id));
        assert_eq!(restored.layers().len(), 2);
    }

    #[test]
    fn test_restore_rejects_invalid_range() {
        let corpus = test_corpus();
        let now = chrono::Utc::now();
        let bad = StoredAnnotation {
            id: AnnotationId::new(),
            range: "John 3:99".to_string(),
            layer_id: LayerId::DEFAULT,
            created_at: now,
            updated_at: now,
            payload: AnnotationPayload::Bookmark,
        };
        assert!(matches!(
            AnnotationStore::restore(
                &corpus,
                Layer::default_layer("Default", "yellow"),
                OverlapPolicy::Reject,
                Vec::new(),
                vec![bad],
            ),
            Err(StoreError::InvalidRecord { .. })
        ));
    }
}
