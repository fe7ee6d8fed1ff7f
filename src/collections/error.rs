use thiserror::Error;

use crate::annotations::NotFoundError;
use crate::reference::ParseError;

/// Errors from collection and card editing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error("Collection title cannot be empty")]
    EmptyTitle,

    #[error("A verse card needs at least one reference")]
    NoReferences,

    #[error(transparent)]
    Reference(#[from] ParseError),

    #[error("Stored collection \"{title}\" could not be restored: {reason}")]
    InvalidRecord { title: String, reason: String },
}

/// Errors that abort a whole collection import
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("Invalid collection data: {0}")]
    SchemaInvalid(String),

    #[error("Import cancelled; nothing was changed")]
    Cancelled,
}
