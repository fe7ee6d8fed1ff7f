//! Annotation layer module
//!
//! Highlights, notes and bookmarks anchored to address ranges, grouped into
//! ordered layers that may stack over the same verses.

mod commands;
mod error;
mod policy;
mod store;
mod types;

pub use types::{
    Annotation, AnnotationId, AnnotationKind, AnnotationPayload, Layer, LayerId, NoteFormat,
    StoredAnnotation,
};

pub use commands::{AnnotationCommand, CommandOutcome, LayerPatch};

pub use error::{ConflictError, EntityKind, NotFoundError, StoreError};

pub use policy::{LayerDeletionPolicy, OverlapPolicy, LAYER_DELETION_POLICY, NOTE_MERGE_SEPARATOR};

pub use store::{AnnotationIndex, AnnotationSnapshot, AnnotationStore};
