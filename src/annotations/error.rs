use std::fmt;

use thiserror::Error;

use super::types::{AnnotationId, AnnotationKind, LayerId};
use crate::reference::AddressRange;

/// What kind of record a lookup failed to find
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Annotation,
    Layer,
    Collection,
    Card,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Annotation => "annotation",
            EntityKind::Layer => "layer",
            EntityKind::Collection => "collection",
            EntityKind::Card => "card",
        })
    }
}

/// A mutation named an id that does not exist
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No {entity} with id {id}")]
pub struct NotFoundError {
    pub entity: EntityKind,
    pub id: String,
}

impl NotFoundError {
    pub fn annotation(id: AnnotationId) -> Self {
        Self {
            entity: EntityKind::Annotation,
            id: id.to_string(),
        }
    }

    pub fn layer(id: LayerId) -> Self {
        Self {
            entity: EntityKind::Layer,
            id: id.to_string(),
        }
    }
}

/// A write would overlap same-kind annotations on the same layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("The {kind} on {range} overlaps {} existing {kind}(s) on the same layer", .conflicting.len())]
pub struct ConflictError {
    pub layer: LayerId,
    pub kind: AnnotationKind,
    pub range: AddressRange,
    pub conflicting: Vec<AnnotationId>,
}

/// Annotation store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error("The default layer cannot be deleted")]
    DefaultLayerProtected,

    #[error("A {from} cannot be changed into a {to}; delete it and create a new annotation")]
    KindMismatch {
        from: AnnotationKind,
        to: AnnotationKind,
    },

    #[error("Layer name cannot be empty")]
    EmptyLayerName,

    #[error("Stored annotation {id} is invalid: {reason}")]
    InvalidRecord { id: String, reason: String },
}
