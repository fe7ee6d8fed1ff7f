//! Annotation command objects
//!
//! Every user action is a request value processed atomically by the store,
//! producing a `CommandOutcome` or an error with no state change.

use super::types::{AnnotationId, AnnotationPayload, LayerId};
use crate::reference::AddressRange;

/// A mutation request against the annotation store
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationCommand {
    /// Create an annotation on a layer
    Create {
        range: AddressRange,
        layer: LayerId,
        payload: AnnotationPayload,
    },
    /// Replace the payload; the kind must stay the same
    UpdatePayload {
        id: AnnotationId,
        payload: AnnotationPayload,
    },
    /// Move an annotation onto another layer
    MoveToLayer { id: AnnotationId, layer: LayerId },
    /// Re-anchor an annotation; the old record is deleted and a new one created
    Move { id: AnnotationId, range: AddressRange },
    Delete { id: AnnotationId },
    CreateLayer {
        name: String,
        color: String,
        order: i32,
    },
    UpdateLayer { id: LayerId, patch: LayerPatch },
    DeleteLayer { id: LayerId },
}

impl AnnotationCommand {
    /// Short name used in log records
    pub fn name(&self) -> &'static str {
        match self {
            AnnotationCommand::Create { .. } => "create",
            AnnotationCommand::UpdatePayload { .. } => "update_payload",
            AnnotationCommand::MoveToLayer { .. } => "move_to_layer",
            AnnotationCommand::Move { .. } => "move",
            AnnotationCommand::Delete { .. } => "delete",
            AnnotationCommand::CreateLayer { .. } => "create_layer",
            AnnotationCommand::UpdateLayer { .. } => "update_layer",
            AnnotationCommand::DeleteLayer { .. } => "delete_layer",
        }
    }

    /// Commands that take the index through intermediate states and must
    /// run against a copy to stay atomic
    pub fn is_compound(&self) -> bool {
        matches!(
            self,
            AnnotationCommand::MoveToLayer { .. }
                | AnnotationCommand::Move { .. }
                | AnnotationCommand::DeleteLayer { .. }
        )
    }

    pub fn create(range: AddressRange, layer: LayerId, payload: AnnotationPayload) -> Self {
        AnnotationCommand::Create {
            range,
            layer,
            payload,
        }
    }
}

/// Partial layer update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub visible: Option<bool>,
    pub order: Option<i32>,
}

/// Result of a successfully applied command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Created(AnnotationId),
    /// The new annotation absorbed overlapping ones under the merge policy
    Merged {
        id: AnnotationId,
        replaced: Vec<AnnotationId>,
    },
    Updated(AnnotationId),
    /// `new` is the recreated annotation; `replaced` lists merged neighbours
    Moved {
        old: AnnotationId,
        new: AnnotationId,
        replaced: Vec<AnnotationId>,
    },
    Deleted(AnnotationId),
    LayerCreated(LayerId),
    LayerUpdated(LayerId),
    LayerDeleted {
        id: LayerId,
        /// Annotations moved to the default layer
        reassigned: usize,
        /// Annotations removed along with the layer
        removed: usize,
    },
}

impl CommandOutcome {
    /// The annotation the caller should treat as current, if any
    pub fn annotation_id(&self) -> Option<AnnotationId> {
        match self {
            CommandOutcome::Created(id)
            | CommandOutcome::Updated(id)
            | CommandOutcome::Merged { id, .. }
            | CommandOutcome::Moved { new: id, .. } => Some(*id),
            _ => None,
        }
    }
}
