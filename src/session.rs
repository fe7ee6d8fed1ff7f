//! Session context
//!
//! A `Session` owns everything one open vault needs: the corpus, its
//! configuration, the annotation store, the collections and the optional
//! save queue. Independent sessions share nothing.

use std::sync::Arc;

use tracing::{debug, info};

use crate::annotations::{
    AnnotationCommand, AnnotationPayload, AnnotationSnapshot, AnnotationStore, CommandOutcome,
    LayerId, OverlapPolicy,
};
use crate::cancel::CancellationFlag;
use crate::collections::{
    BulkImportReport, CollectionError, CollectionManager, ImportReport, SerializedCollection,
};
use crate::config::SessionConfig;
use crate::corpus::CorpusIndex;
use crate::error::{EngineError, Result};
use crate::persist::{PersistedState, SaveQueue, StorageBackend};
use crate::reference::{parse, parse_range, AddressRange};
use crate::search::{NoteMatch, SearchEngine, SearchIter, SearchQuery, SearchScope};

pub struct Session {
    corpus: Arc<CorpusIndex>,
    config: SessionConfig,
    annotations: AnnotationStore,
    collections: CollectionManager,
    search: SearchEngine,
    saver: Option<SaveQueue>,
    /// Bumped once per committed mutation of either store
    revision: u64,
}

impl Session {
    /// Fresh session with only the default layer
    pub fn new(corpus: Arc<CorpusIndex>, config: SessionConfig) -> Result<Self> {
        check_translation(&corpus, &config.translation)?;
        let annotations = AnnotationStore::new(config.default_layer(), config.overlap_policy);
        Ok(Self::assemble(
            corpus,
            config,
            annotations,
            CollectionManager::new(),
            0,
        ))
    }

    /// Session rebuilt from saved state; every stored range is re-validated
    pub fn restore(
        corpus: Arc<CorpusIndex>,
        config: SessionConfig,
        state: PersistedState,
    ) -> Result<Self> {
        check_translation(&corpus, &config.translation)?;
        state.check_version()?;
        if state.translation != corpus.translation() {
            return Err(EngineError::TranslationMismatch {
                expected: corpus.translation().to_string(),
                found: state.translation,
            });
        }

        let annotations = AnnotationStore::restore(
            &corpus,
            config.default_layer(),
            config.overlap_policy,
            state.layers,
            state.annotations,
        )?;
        let collections = CollectionManager::restore(&corpus, state.collections)?;
        info!(
            revision = state.revision,
            annotations = annotations.len(),
            collections = collections.len(),
            "Restored session"
        );
        Ok(Self::assemble(
            corpus,
            config,
            annotations,
            collections,
            state.revision,
        ))
    }

    /// Load state from `backend` (if any was saved) and save every later
    /// change back to it
    pub async fn open(
        corpus: Arc<CorpusIndex>,
        config: SessionConfig,
        backend: Arc<dyn StorageBackend>,
    ) -> Result<Self> {
        let session = match backend.load().await? {
            Some(state) => Self::restore(corpus, config, state)?,
            None => Self::new(corpus, config)?,
        };
        let queue = SaveQueue::spawn(backend, session.config.persistence.queue_config());
        Ok(session.with_save_queue(queue))
    }

    fn assemble(
        corpus: Arc<CorpusIndex>,
        config: SessionConfig,
        annotations: AnnotationStore,
        collections: CollectionManager,
        revision: u64,
    ) -> Self {
        let search = SearchEngine::new(Arc::clone(&corpus), config.search);
        Self {
            corpus,
            config,
            annotations,
            collections,
            search,
            saver: None,
            revision,
        }
    }

    pub fn with_save_queue(mut self, queue: SaveQueue) -> Self {
        self.saver = Some(queue);
        self
    }

    pub fn corpus(&self) -> &CorpusIndex {
        &self.corpus
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn annotations(&self) -> &AnnotationStore {
        &self.annotations
    }

    pub fn collections(&self) -> &CollectionManager {
        &self.collections
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    // ========================================================================
    // References
    // ========================================================================

    pub fn parse(&self, input: &str) -> Result<Vec<AddressRange>> {
        Ok(parse(&self.corpus, input)?)
    }

    /// Book names for autocomplete, capped by the configured limit
    pub fn suggest_books(&self, prefix: &str) -> Vec<&'static str> {
        self.corpus.suggest_books(prefix, self.config.suggestion_limit)
    }

    // ========================================================================
    // Annotations
    // ========================================================================

    pub fn apply(&mut self, command: AnnotationCommand) -> Result<CommandOutcome> {
        let outcome = self.annotations.apply(command)?;
        self.committed();
        Ok(outcome)
    }

    fn annotate(
        &mut self,
        reference: &str,
        layer: LayerId,
        payload: AnnotationPayload,
    ) -> Result<CommandOutcome> {
        let range = parse_range(&self.corpus, reference)?;
        self.apply(AnnotationCommand::create(range, layer, payload))
    }

    pub fn highlight(&mut self, reference: &str, layer: LayerId, color: &str) -> Result<CommandOutcome> {
        self.annotate(reference, layer, AnnotationPayload::highlight(color))
    }

    pub fn note(&mut self, reference: &str, layer: LayerId, text: &str) -> Result<CommandOutcome> {
        self.annotate(reference, layer, AnnotationPayload::note(text))
    }

    pub fn bookmark(&mut self, reference: &str, layer: LayerId) -> Result<CommandOutcome> {
        self.annotate(reference, layer, AnnotationPayload::Bookmark)
    }

    pub fn snapshot(&self) -> AnnotationSnapshot {
        self.annotations.snapshot()
    }

    pub fn set_overlap_policy(&mut self, policy: OverlapPolicy) {
        self.config.overlap_policy = policy;
        self.annotations.set_overlap_policy(policy);
    }

    // ========================================================================
    // Collections
    // ========================================================================

    /// Run a collection edit as one unit.
    ///
    /// The closure works on a copy; if it fails, every step it took is
    /// discarded. A save is queued only when something committed.
    pub fn edit_collections<T, F>(&mut self, edit: F) -> Result<T>
    where
        F: FnOnce(&mut CollectionManager, &CorpusIndex) -> std::result::Result<T, CollectionError>,
    {
        let mut working = self.collections.clone();
        let value = edit(&mut working, &self.corpus)?;
        if working.generation() != self.collections.generation() {
            self.collections = working;
            self.committed();
        }
        Ok(value)
    }

    pub fn import_collection_json(
        &mut self,
        json: &str,
        cancel: &CancellationFlag,
    ) -> Result<ImportReport> {
        let report = self.collections.import_json(&self.corpus, json, cancel)?;
        if report.changed() {
            self.committed();
        }
        Ok(report)
    }

    pub fn import_collections(
        &mut self,
        documents: &[SerializedCollection],
        cancel: &CancellationFlag,
    ) -> BulkImportReport {
        let before = self.collections.generation();
        let report = self.collections.import_many(&self.corpus, documents, cancel);
        if self.collections.generation() != before {
            self.committed();
        }
        report
    }

    // ========================================================================
    // Search
    // ========================================================================

    pub fn search(&self, query: &SearchQuery, scope: &SearchScope) -> Result<SearchIter<'_>> {
        Ok(self.search.search(query, scope)?)
    }

    pub fn search_with_cancel(
        &self,
        query: &SearchQuery,
        scope: &SearchScope,
        cancel: CancellationFlag,
    ) -> Result<SearchIter<'_>> {
        Ok(self.search.search_with_cancel(query, scope, cancel)?)
    }

    pub fn search_notes(&self, query: &SearchQuery) -> Result<Vec<NoteMatch>> {
        Ok(self.search.search_notes(query, &self.annotations.snapshot())?)
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Current state in persisted form
    pub fn state(&self) -> PersistedState {
        let (layers, annotations) = self.annotations.to_stored();
        PersistedState {
            layers,
            annotations,
            collections: self.collections.export_all(),
            ..PersistedState::new(self.corpus.translation(), self.revision)
        }
    }

    fn committed(&mut self) {
        self.revision += 1;
        if let Some(saver) = &self.saver {
            saver.request(self.state());
        }
        debug!(revision = self.revision, "Session changed");
    }

    /// Wait until every committed change is saved
    pub async fn flush(&self) -> Result<()> {
        if let Some(saver) = &self.saver {
            saver.flush().await?;
        }
        Ok(())
    }

    /// Save anything pending and stop the save worker
    pub async fn close(self) -> Result<()> {
        if let Some(saver) = self.saver {
            saver.shutdown().await?;
        }
        Ok(())
    }
}

fn check_translation(corpus: &CorpusIndex, expected: &str) -> Result<()> {
    if corpus.translation().eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(EngineError::TranslationMismatch {
            expected: expected.to_string(),
            found: corpus.translation().to_string(),
        })
    }
}
