//! Core data models for the toolshare category engine.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

use crate::defaults::PATH_SEPARATOR;
use crate::uuid_utils::new_v7;

// =============================================================================
// CATEGORY TYPES
// =============================================================================

/// A node of the mutable category hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    /// Unique, URL-safe identifier derived from the name.
    pub slug: String,
    /// Parent category (None = root).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Explicit ordering among siblings; unordered siblings sort by name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i32>,
    pub is_active: bool,
    #[serde(default = "empty_object")]
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn empty_object() -> JsonValue {
    JsonValue::Object(Map::new())
}

impl Category {
    /// Create an active category with a fresh id and a slug derived from the name.
    pub fn new(name: impl Into<String>, parent_id: Option<Uuid>) -> Self {
        let name = name.into();
        let now = Utc::now();
        Self {
            id: new_v7(),
            slug: slugify(&name),
            name,
            parent_id,
            icon: None,
            color: None,
            sort_order: None,
            is_active: true,
            metadata: empty_object(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set an explicit sort order.
    pub fn with_sort_order(mut self, order: i32) -> Self {
        self.sort_order = Some(order);
        self
    }

    /// Mark the category inactive.
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// Request for creating a category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    /// Explicit slug; derived from the name when absent.
    pub slug: Option<String>,
    pub parent_id: Option<Uuid>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub sort_order: Option<i32>,
    pub metadata: Option<JsonValue>,
}

/// Request for updating a category in place. Parent changes go through reparenting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub sort_order: Option<i32>,
    pub metadata: Option<JsonValue>,
}

/// Derive a URL-safe slug: lowercase alphanumerics joined by single hyphens.
///
/// ```
/// use toolshare_core::slugify;
///
/// assert_eq!(slugify("Power Tools & Drills"), "power-tools-drills");
/// assert_eq!(slugify("  Hand--Saws "), "hand-saws");
/// ```
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

// =============================================================================
// ITEM TYPES
// =============================================================================

/// A listed tool or piece of equipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    /// Attribute values keyed by attribute definition name.
    #[serde(default)]
    pub attributes: Map<String, JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Outcome of validating an attribute map.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// Field name -> message, ordered by field name.
    pub errors: BTreeMap<String, String>,
}

impl ValidationResult {
    /// Build a result from collected field errors.
    pub fn from_errors(errors: BTreeMap<String, String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    /// A result with no errors.
    pub fn valid() -> Self {
        Self::from_errors(BTreeMap::new())
    }
}

// =============================================================================
// SUGGESTION TYPES
// =============================================================================

/// Reference to a suggestible category: an internal category or an imported
/// external taxonomy entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CategoryRef {
    Category(Uuid),
    External(i64),
}

impl std::fmt::Display for CategoryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Category(id) => write!(f, "{}", id),
            Self::External(id) => write!(f, "ext:{}", id),
        }
    }
}

/// A category offered to the scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateCategory {
    pub id: CategoryRef,
    /// Full display path, e.g. `"Tools > Power Tools > Drills"`.
    pub path: String,
    /// 1 = root.
    pub level: usize,
}

/// What is known about an item when suggesting a category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemContext {
    pub name: String,
    pub description: Option<String>,
    pub attributes: Option<Map<String, JsonValue>>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub existing_category_id: Option<CategoryRef>,
}

impl ItemContext {
    /// Context with only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Attach the item's current category.
    pub fn with_existing(mut self, existing: CategoryRef) -> Self {
        self.existing_category_id = Some(existing);
        self
    }
}

impl From<&Item> for ItemContext {
    fn from(item: &Item) -> Self {
        Self {
            name: item.name.clone(),
            description: item.description.clone(),
            attributes: Some(item.attributes.clone()),
            tags: item.tags.clone(),
            existing_category_id: Some(CategoryRef::Category(item.category_id)),
        }
    }
}

/// A scored candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySuggestion {
    pub category_id: CategoryRef,
    pub path: String,
    /// Soft-capped heuristic score, not a probability.
    pub confidence: f64,
    /// One entry per contributing signal, in evaluation order.
    pub reasons: Vec<String>,
    pub level: usize,
}

// =============================================================================
// EXTERNAL TAXONOMY TYPES
// =============================================================================

/// One row of an imported external taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyRecord {
    pub external_id: i64,
    /// Ancestor names joined by `" > "`.
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_external_id: Option<i64>,
    /// Number of path segments (1 = root).
    pub level: i32,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl TaxonomyRecord {
    /// Path segments split on `" > "`, trimmed. A bare `>` belongs to the name.
    pub fn segments(&self) -> Vec<&str> {
        self.path.split(PATH_SEPARATOR).map(str::trim).collect()
    }

    /// Last path segment.
    pub fn leaf_name(&self) -> &str {
        self.path
            .rsplit(PATH_SEPARATOR)
            .next()
            .map(str::trim)
            .unwrap_or(self.path.as_str())
    }
}

/// A soft failure collected during import or format pre-flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImportError {
    /// A source line could not be parsed (1-based line number).
    Line { line: usize, message: String },
    /// An insert batch failed (0-based batch index).
    Batch {
        batch_index: usize,
        rows: usize,
        message: String,
    },
    /// The source or the store failed before any insert ran.
    Source { message: String },
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Line { line, message } => write!(f, "line {}: {}", line, message),
            Self::Batch {
                batch_index,
                rows,
                message,
            } => write!(f, "batch {} ({} rows): {}", batch_index, rows, message),
            Self::Source { message } => write!(f, "source: {}", message),
        }
    }
}

/// Outcome of a taxonomy import.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImportResult {
    /// True when no errors were collected.
    pub success: bool,
    /// Rows written by batches that succeeded.
    pub imported_count: usize,
    pub errors: Vec<ImportError>,
    /// Structural notes that are not errors (e.g. records demoted to roots).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ImportResult {
    /// A failed import that wrote nothing.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            imported_count: 0,
            errors: vec![ImportError::Source {
                message: message.into(),
            }],
            warnings: Vec::new(),
        }
    }
}

/// Outcome of a format pre-flight.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FormatReport {
    pub is_valid: bool,
    /// Non-blank lines examined.
    pub lines_checked: usize,
    /// Lines that parsed into records.
    pub record_count: usize,
    pub errors: Vec<ImportError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_slugify_collapses_punctuation() {
        assert_eq!(slugify("Garden Tools > Hand Tools"), "garden-tools-hand-tools");
        assert_eq!(slugify("18V Drill/Driver"), "18v-drill-driver");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn test_category_new_is_active_with_slug() {
        let cat = Category::new("Power Tools", None);
        assert!(cat.is_active);
        assert_eq!(cat.slug, "power-tools");
        assert!(cat.parent_id.is_none());
        assert_eq!(cat.metadata, json!({}));
    }

    #[test]
    fn test_category_metadata_defaults_when_missing() {
        let id = Uuid::new_v4();
        let raw = json!({
            "id": id,
            "name": "Drills",
            "slug": "drills",
            "is_active": true,
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        });
        let cat: Category = serde_json::from_value(raw).unwrap();
        assert_eq!(cat.id, id);
        assert_eq!(cat.metadata, json!({}));
        assert!(cat.sort_order.is_none());
    }

    #[test]
    fn test_validation_result_from_errors() {
        let mut errors = BTreeMap::new();
        assert!(ValidationResult::from_errors(errors.clone()).is_valid);
        errors.insert("voltage".to_string(), "must be a number".to_string());
        let result = ValidationResult::from_errors(errors);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_category_ref_serialization() {
        let value = serde_json::to_value(CategoryRef::External(42)).unwrap();
        assert_eq!(value, json!({"kind": "external", "id": 42}));
        let back: CategoryRef = serde_json::from_value(value).unwrap();
        assert_eq!(back, CategoryRef::External(42));
    }

    #[test]
    fn test_item_context_from_item_carries_existing_category() {
        let category_id = Uuid::new_v4();
        let item = Item {
            id: Uuid::new_v4(),
            category_id,
            name: "Cordless Drill".to_string(),
            attributes: Map::new(),
            description: Some("18V with two batteries".to_string()),
            tags: vec!["drill".to_string()],
            location: None,
        };
        let ctx = ItemContext::from(&item);
        assert_eq!(
            ctx.existing_category_id,
            Some(CategoryRef::Category(category_id))
        );
        assert_eq!(ctx.tags, vec!["drill".to_string()]);
    }

    #[test]
    fn test_taxonomy_record_segments_and_leaf() {
        let record = TaxonomyRecord {
            external_id: 3,
            path: "Tools > Power Tools > Drills".to_string(),
            parent_external_id: Some(2),
            level: 3,
            is_active: true,
            updated_at: Utc::now(),
        };
        assert_eq!(record.segments(), vec!["Tools", "Power Tools", "Drills"]);
        assert_eq!(record.leaf_name(), "Drills");
    }

    #[test]
    fn test_taxonomy_record_bare_angle_bracket_stays_in_name() {
        let record = TaxonomyRecord {
            external_id: 2,
            path: "Cables > USB-C>HDMI Adapters".to_string(),
            parent_external_id: Some(1),
            level: 2,
            is_active: true,
            updated_at: Utc::now(),
        };
        assert_eq!(record.segments(), vec!["Cables", "USB-C>HDMI Adapters"]);
        assert_eq!(record.leaf_name(), "USB-C>HDMI Adapters");
    }

    #[test]
    fn test_import_error_display() {
        let line = ImportError::Line {
            line: 7,
            message: "expected 2 columns, found 1".to_string(),
        };
        assert_eq!(line.to_string(), "line 7: expected 2 columns, found 1");

        let batch = ImportError::Batch {
            batch_index: 2,
            rows: 1000,
            message: "payload too large".to_string(),
        };
        assert_eq!(batch.to_string(), "batch 2 (1000 rows): payload too large");
    }

    #[test]
    fn test_import_result_failed() {
        let result = ImportResult::failed("connection refused");
        assert!(!result.success);
        assert_eq!(result.imported_count, 0);
        assert_eq!(result.errors.len(), 1);
    }
}
