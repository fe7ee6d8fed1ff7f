//! Overlap and layer-deletion policies

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::types::{Annotation, AnnotationPayload};

/// What happens when an annotation would overlap another annotation of the
/// same kind on the same layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Refuse the write with a `ConflictError`
    #[default]
    Reject,
    /// Replace the overlapping annotations with one spanning their union
    Merge,
}

impl fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OverlapPolicy::Reject => "reject",
            OverlapPolicy::Merge => "merge",
        })
    }
}

impl FromStr for OverlapPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(OverlapPolicy::Reject),
            "merge" => Ok(OverlapPolicy::Merge),
            other => Err(format!("unknown overlap policy '{}'", other)),
        }
    }
}

/// What happens to a deleted layer's annotations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerDeletionPolicy {
    /// Move them to the default layer
    ReassignToDefault,
    /// Delete them with the layer
    Cascade,
}

/// The layer deletion policy applied by `AnnotationStore`
pub const LAYER_DELETION_POLICY: LayerDeletionPolicy = LayerDeletionPolicy::ReassignToDefault;

/// Separator placed between note bodies when notes are merged
pub const NOTE_MERGE_SEPARATOR: &str = "\n\n";

/// Combine the payloads of annotations being merged into one.
///
/// `incoming` is the payload of the write that triggered the merge. Notes
/// are concatenated in address order; the incoming highlight color wins.
pub(crate) fn merge_payloads(
    incoming: &Annotation,
    existing: &[Annotation],
) -> AnnotationPayload {
    match incoming.payload() {
        AnnotationPayload::Note { format, .. } => {
            let mut parts: Vec<&Annotation> = existing.iter().chain([incoming]).collect();
            parts.sort_by(|a, b| {
                a.range()
                    .start()
                    .cmp(&b.range().start())
                    .then(a.range().end().cmp(&b.range().end()))
                    .then(a.created_at().cmp(&b.created_at()))
            });
            let text = parts
                .iter()
                .filter_map(|a| a.payload().note_text())
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(NOTE_MERGE_SEPARATOR);
            AnnotationPayload::Note {
                text,
                format: *format,
            }
        }
        other => other.clone(),
    }
}
