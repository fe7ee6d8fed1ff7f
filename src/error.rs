//! Error types for the engine

use thiserror::Error;

use crate::annotations::{EntityKind, StoreError};
use crate::collections::{CollectionError, ImportError};
use crate::corpus::CorpusError;
use crate::persist::PersistError;
use crate::reference::ParseError;
use crate::render::RenderError;
use crate::search::SearchError;

/// Engine-wide result type
pub type Result<T> = std::result::Result<T, EngineError>;

/// Engine error type
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Collection(#[from] CollectionError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("Corpus translation is {found}, expected {expected}")]
    TranslationMismatch { expected: String, found: String },
}

impl EngineError {
    /// A sentence for the person at the keyboard, saying what to do next
    pub fn user_message(&self) -> String {
        match self {
            EngineError::Parse(e) | EngineError::Collection(CollectionError::Reference(e)) => {
                parse_message(e)
            }
            EngineError::Store(StoreError::Conflict(conflict)) => format!(
                "There is already a {} on this layer overlapping {}. Remove it, choose another layer, or switch the overlap policy to merge.",
                conflict.kind, conflict.range
            ),
            EngineError::Store(StoreError::NotFound(e))
            | EngineError::Collection(CollectionError::NotFound(e)) => match e.entity {
                EntityKind::Layer => "That layer no longer exists. Refresh the layer list and try again.".to_string(),
                EntityKind::Annotation => "That annotation no longer exists. It may have been deleted or merged.".to_string(),
                EntityKind::Collection => "That collection no longer exists. Refresh the collection list and try again.".to_string(),
                EntityKind::Card => "That card no longer exists in this collection.".to_string(),
            },
            EngineError::Store(StoreError::DefaultLayerProtected) => {
                "The default layer cannot be deleted. Hide it instead.".to_string()
            }
            EngineError::Store(e @ StoreError::KindMismatch { .. }) => e.to_string(),
            EngineError::Store(StoreError::EmptyLayerName) => {
                "Give the layer a name.".to_string()
            }
            EngineError::Store(StoreError::InvalidRecord { .. })
            | EngineError::Collection(CollectionError::InvalidRecord { .. }) => format!(
                "Saved data could not be loaded ({}). Fix or remove the state file and restart.",
                self
            ),
            EngineError::Collection(CollectionError::EmptyTitle) => {
                "Give the collection a title.".to_string()
            }
            EngineError::Collection(CollectionError::NoReferences) => {
                "Add at least one verse reference to the card, for example \"John 3:16\".".to_string()
            }
            EngineError::Import(ImportError::SchemaInvalid(reason)) => format!(
                "This file is not a verse collection export ({}). Nothing was imported.",
                reason
            ),
            EngineError::Import(ImportError::Cancelled) => {
                "Import cancelled. Nothing was changed.".to_string()
            }
            EngineError::Search(SearchError::QueryTooLong { max, .. }) => {
                format!("Shorten the search to at most {} characters.", max)
            }
            EngineError::Search(SearchError::RegexDisabled) => {
                "Pattern search is turned off. Search for plain text or enable regex search in the settings.".to_string()
            }
            EngineError::Search(SearchError::InvalidPattern(reason)) => {
                format!("The search pattern is not valid: {}", reason)
            }
            EngineError::Search(SearchError::PatternTooLarge { .. }) => {
                "The search pattern is too complex. Simplify it and try again.".to_string()
            }
            EngineError::Search(SearchError::InvalidScope(e)) => {
                format!("The search scope is not valid. {}", parse_message(e))
            }
            EngineError::Render(e) => format!("Could not display the result: {}", e),
            EngineError::Persist(e) => format!(
                "Your changes could not be saved ({}). They are kept in memory; try again later.",
                e
            ),
            EngineError::Corpus(e) => format!("The Bible text could not be loaded: {}", e),
            EngineError::TranslationMismatch { expected, found } => format!(
                "The loaded text is {} but the settings ask for {}. Change the translation setting or load the {} text.",
                found, expected, expected
            ),
        }
    }
}

fn parse_message(error: &ParseError) -> String {
    match error {
        ParseError::EmptyInput => "Type a reference such as \"John 3:16\".".to_string(),
        ParseError::UnknownBook { input, candidates } if !candidates.is_empty() => {
            let names: Vec<String> = candidates.iter().map(|b| b.to_string()).collect();
            format!(
                "\"{}\" could mean more than one book. Did you mean {}?",
                input,
                names.join(", ")
            )
        }
        ParseError::UnknownBook { input, .. } => {
            format!("No book named \"{}\". Check the spelling.", input)
        }
        ParseError::OutOfRange { .. } => format!("{}.", error),
        ParseError::MalformedRange { input, reason } => format!(
            "Could not read \"{}\" ({}). Use a form like \"John 3:16-18\".",
            input, reason
        ),
    }
}
