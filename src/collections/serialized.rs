//! Portable collection format
//!
//! ```json
//! {
//!   "schemaVersion": 1,
//!   "id": "3f0c...",
//!   "title": "Faith",
//!   "description": "Verses on faith",
//!   "cards": [
//!     { "id": "9a1e...", "title": "Hebrews", "description": "", "references": ["Hebrews 11:1"] }
//!   ]
//! }
//! ```
//!
//! References are human-readable strings and are re-parsed on import.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ImportError;
use super::types::{Collection, VerseCard};

/// Version written by this build
pub const SCHEMA_VERSION: u32 = 1;

/// Self-describing exported collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedCollection {
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Kept so a reload does not reset the collection's history
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cards: Vec<SerializedCard>,
}

/// One exported verse card. Omitted fields never overwrite existing data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedCard {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub references: Vec<String>,
}

impl SerializedCollection {
    /// Parse and migrate an exported collection
    pub fn from_json(json: &str) -> Result<Self, ImportError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| ImportError::SchemaInvalid(e.to_string()))?;
        Self::from_value(value)
    }

    /// Validate the version tag, migrate, then check the structure
    pub fn from_value(value: Value) -> Result<Self, ImportError> {
        if !value.is_object() {
            return Err(ImportError::SchemaInvalid(
                "expected a JSON object".to_string(),
            ));
        }
        let version = value
            .get("schemaVersion")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                ImportError::SchemaInvalid("missing or invalid schemaVersion".to_string())
            })?;

        let migrated = migrate(value, version)?;
        let collection: SerializedCollection = serde_json::from_value(migrated)
            .map_err(|e| ImportError::SchemaInvalid(e.to_string()))?;
        collection.validate()?;
        Ok(collection)
    }

    /// Structural checks serde cannot express
    pub fn validate(&self) -> Result<(), ImportError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ImportError::SchemaInvalid(format!(
                "unsupported schemaVersion {}",
                self.schema_version
            )));
        }
        let has_id = self.id.as_deref().is_some_and(|id| !id.trim().is_empty());
        let has_title = self.title.as_deref().is_some_and(|t| !t.trim().is_empty());
        if !has_id && !has_title {
            return Err(ImportError::SchemaInvalid(
                "a collection needs an id or a title".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Bring an older document up to `SCHEMA_VERSION`
fn migrate(value: Value, version: u64) -> Result<Value, ImportError> {
    match version {
        1 => Ok(value),
        other => Err(ImportError::SchemaInvalid(format!(
            "unsupported schemaVersion {}",
            other
        ))),
    }
}

impl From<&VerseCard> for SerializedCard {
    fn from(card: &VerseCard) -> Self {
        Self {
            id: Some(card.id().to_string()),
            title: Some(card.title.clone()),
            description: Some(card.description.clone()),
            references: card.reference_strings(),
        }
    }
}

impl From<&Collection> for SerializedCollection {
    fn from(collection: &Collection) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            id: Some(collection.id().to_string()),
            title: Some(collection.title.clone()),
            description: Some(collection.description.clone()),
            created_at: Some(collection.created_at()),
            updated_at: Some(collection.updated_at()),
            cards: collection.cards().iter().map(SerializedCard::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_minimal() {
        let collection = SerializedCollection::from_json(
            r#"{"schemaVersion":1,"title":"Faith","cards":[{"title":"Faith","references":["Heb 11:1"]}]}"#,
        )
        .unwrap();
        assert_eq!(collection.title.as_deref(), Some("Faith"));
        assert_eq!(collection.cards[0].references, vec!["Heb 11:1"]);
        assert!(collection.cards[0].description.is_none());
    }

    #[test]
    fn test_schema_invalid() {
        for json in [
            "not json",
            "[1, 2]",
            r#"{"title":"No version"}"#,
            r#"{"schemaVersion":"one","title":"x"}"#,
            r#"{"schemaVersion":2,"title":"From the future"}"#,
            r#"{"schemaVersion":1,"title":"x","cards":{"title":"not a list"}}"#,
            r#"{"schemaVersion":1,"title":"x","cards":[{"references":"Heb 11:1"}]}"#,
            r#"{"schemaVersion":1,"description":"no id or title"}"#,
        ] {
            assert!(
                matches!(
                    SerializedCollection::from_json(json),
                    Err(ImportError::SchemaInvalid(_))
                ),
                "{} should be rejected",
                json
            );
        }
    }

    #[test]
    fn test_camel_case_output() {
        let collection = SerializedCollection {
            schema_version: SCHEMA_VERSION,
            id: None,
            title: Some("Faith".to_string()),
            description: None,
            created_at: None,
            updated_at: None,
            cards: Vec::new(),
        };
        let json = serde_json::to_value(&collection).unwrap();
        assert_eq!(json["schemaVersion"], 1);
        assert!(json.get("id").is_none());
        assert!(json.get("createdAt").is_none());
    }
}
