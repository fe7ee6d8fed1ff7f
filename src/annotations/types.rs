//! Annotation and layer types
//!
//! Annotations are anchored to an `AddressRange` and belong to exactly one
//! layer. The range never changes after creation; moving an annotation is
//! modeled as delete + recreate by the store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reference::AddressRange;

/// Unique annotation identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(Uuid);

impl AnnotationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AnnotationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AnnotationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Unique layer identifier. The nil UUID is reserved for the default layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(Uuid);

impl LayerId {
    /// The layer orphaned annotations are reassigned to
    pub const DEFAULT: LayerId = LayerId(Uuid::nil());

    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn is_default(&self) -> bool {
        *self == Self::DEFAULT
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for LayerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Kinds of annotations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Highlight,
    Note,
    Bookmark,
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AnnotationKind::Highlight => "highlight",
            AnnotationKind::Note => "note",
            AnnotationKind::Bookmark => "bookmark",
        })
    }
}

/// Markup flavour of a note body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteFormat {
    Plain,
    #[default]
    Markdown,
}

/// Kind-specific content of an annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnnotationPayload {
    /// Text highlight with a color token
    Highlight { color: String },
    /// Note with rich text
    Note {
        text: String,
        #[serde(default)]
        format: NoteFormat,
    },
    /// Position marker
    Bookmark,
}

impl AnnotationPayload {
    pub fn highlight(color: &str) -> Self {
        AnnotationPayload::Highlight {
            color: color.to_string(),
        }
    }

    pub fn note(text: &str) -> Self {
        AnnotationPayload::Note {
            text: text.to_string(),
            format: NoteFormat::default(),
        }
    }

    pub fn kind(&self) -> AnnotationKind {
        match self {
            AnnotationPayload::Highlight { .. } => AnnotationKind::Highlight,
            AnnotationPayload::Note { .. } => AnnotationKind::Note,
            AnnotationPayload::Bookmark => AnnotationKind::Bookmark,
        }
    }

    /// Note text, if this is a note
    pub fn note_text(&self) -> Option<&str> {
        match self {
            AnnotationPayload::Note { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// An annotation record owned by the store
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    id: AnnotationId,
    range: AddressRange,
    layer_id: LayerId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    payload: AnnotationPayload,
}

impl Annotation {
    pub(crate) fn new(range: AddressRange, layer_id: LayerId, payload: AnnotationPayload) -> Self {
        let now = Utc::now();
        Self {
            id: AnnotationId::new(),
            range,
            layer_id,
            created_at: now,
            updated_at: now,
            payload,
        }
    }

    /// Rebuild a stored record with its original id and timestamps
    pub(crate) fn restored(
        id: AnnotationId,
        range: AddressRange,
        layer_id: LayerId,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        payload: AnnotationPayload,
    ) -> Self {
        Self {
            id,
            range,
            layer_id,
            created_at,
            updated_at,
            payload,
        }
    }

    pub fn id(&self) -> AnnotationId {
        self.id
    }

    pub fn range(&self) -> &AddressRange {
        &self.range
    }

    pub fn layer_id(&self) -> LayerId {
        self.layer_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn payload(&self) -> &AnnotationPayload {
        &self.payload
    }

    pub fn kind(&self) -> AnnotationKind {
        self.payload.kind()
    }

    pub(crate) fn set_payload(&mut self, payload: AnnotationPayload) {
        self.payload = payload;
        self.updated_at = Utc::now();
    }

    pub(crate) fn set_layer(&mut self, layer_id: LayerId) {
        self.layer_id = layer_id;
        self.updated_at = Utc::now();
    }
}

/// A named, ordered, toggleable group of annotations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    /// Color token used when rendering the layer
    pub color: String,
    pub visible: bool,
    /// Lower orders stack first
    pub order: i32,
}

impl Layer {
    pub fn new(name: &str, color: &str, order: i32) -> Self {
        Self {
            id: LayerId::new(),
            name: name.to_string(),
            color: color.to_string(),
            visible: true,
            order,
        }
    }

    /// The protected default layer
    pub fn default_layer(name: &str, color: &str) -> Self {
        Self {
            id: LayerId::DEFAULT,
            ..Self::new(name, color, 0)
        }
    }
}

/// Serialized form of an annotation.
///
/// The range is kept as its display string and re-validated through the
/// parser on restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAnnotation {
    pub id: AnnotationId,
    pub range: String,
    pub layer_id: LayerId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub payload: AnnotationPayload,
}

impl From<&Annotation> for StoredAnnotation {
    fn from(annotation: &Annotation) -> Self {
        Self {
            id: annotation.id,
            range: annotation.range.to_string(),
            layer_id: annotation.layer_id,
            created_at: annotation.created_at,
            updated_at: annotation.updated_at,
            payload: annotation.payload.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::test_corpus;
    use crate::reference::parse_range;

    #[test]
    fn test_payload_serde() {
        let highlight = AnnotationPayload::highlight("yellow");
        let json = serde_json::to_string(&highlight).unwrap();
        assert_eq!(json, r#"{"type":"highlight","color":"yellow"}"#);

        let note: AnnotationPayload =
            serde_json::from_str(r#"{"type":"note","text":"grace"}"#).unwrap();
        assert_eq!(note, AnnotationPayload::note("grace"));
        assert_eq!(note.kind(), AnnotationKind::Note);

        let bookmark: AnnotationPayload = serde_json::from_str(r#"{"type":"bookmark"}"#).unwrap();
        assert_eq!(bookmark, AnnotationPayload::Bookmark);
    }

    #[test]
    fn test_default_layer_id() {
        assert!(LayerId::DEFAULT.is_default());
        assert!(!LayerId::new().is_default());
        let layer = Layer::default_layer("Default", "yellow");
        assert_eq!(layer.id, LayerId::DEFAULT);
        assert!(layer.visible);
    }

    #[test]
    fn test_stored_annotation_uses_display_range() {
        let corpus = test_corpus();
        let range = parse_range(&corpus, "john 3:16-18").unwrap();
        let annotation = Annotation::new(range, LayerId::DEFAULT, AnnotationPayload::Bookmark);
        let stored = StoredAnnotation::from(&annotation);
        assert_eq!(stored.range, "John 3:16-18");
        assert_eq!(stored.id, annotation.id());

        let json = serde_json::to_value(&stored).unwrap();
        assert!(json.get("layerId").is_some());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_ids_parse_round_trip() {
        let id = AnnotationId::new();
        assert_eq!(id.to_string().parse::<AnnotationId>().unwrap(), id);
        assert!("not-a-uuid".parse::<LayerId>().is_err());
    }
}
