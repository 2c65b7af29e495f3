//! Attribute schema types.
//!
//! Categories declare the attributes their items carry through
//! [`CategoryAttribute`] bindings to reusable [`AttributeDefinition`]s.
//! Item values arrive as loose JSON and are lifted into [`AttributeValue`]
//! before validation dispatches on the declared [`AttributeDataType`].

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// =============================================================================
// DATA TYPES
// =============================================================================

/// Declared data type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeDataType {
    Text,
    Number,
    Boolean,
    Date,
    SingleSelect,
    MultiSelect,
    Email,
    Url,
}

impl AttributeDataType {
    /// Whether values are drawn from a declared option set.
    pub fn uses_options(&self) -> bool {
        matches!(self, Self::SingleSelect | Self::MultiSelect)
    }
}

impl std::fmt::Display for AttributeDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
            Self::Date => write!(f, "date"),
            Self::SingleSelect => write!(f, "single_select"),
            Self::MultiSelect => write!(f, "multi_select"),
            Self::Email => write!(f, "email"),
            Self::Url => write!(f, "url"),
        }
    }
}

impl std::str::FromStr for AttributeDataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "string" => Ok(Self::Text),
            "number" | "numeric" => Ok(Self::Number),
            "boolean" | "bool" => Ok(Self::Boolean),
            "date" => Ok(Self::Date),
            "single_select" | "singleselect" | "select" => Ok(Self::SingleSelect),
            "multi_select" | "multiselect" => Ok(Self::MultiSelect),
            "email" => Ok(Self::Email),
            "url" => Ok(Self::Url),
            _ => Err(format!("Invalid attribute data type: {}", s)),
        }
    }
}

// =============================================================================
// SCHEMA
// =============================================================================

/// Type-specific validation rules. Rules that do not apply to the declared
/// data type are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Regular expression a text value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Allowed values for select types.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// A reusable, named schema for one item property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub id: Uuid,
    /// Canonical key used in item attribute maps.
    pub name: String,
    pub label: String,
    pub data_type: AttributeDataType,
    #[serde(default)]
    pub rules: ValidationRules,
    #[serde(default)]
    pub has_options: bool,
}

impl AttributeDefinition {
    /// Definition with no rules.
    pub fn new(name: impl Into<String>, data_type: AttributeDataType) -> Self {
        let name = name.into();
        Self {
            id: Uuid::new_v4(),
            label: name.clone(),
            name,
            data_type,
            rules: ValidationRules::default(),
            has_options: false,
        }
    }

    /// Replace the validation rules.
    pub fn with_rules(mut self, rules: ValidationRules) -> Self {
        self.has_options = !rules.options.is_empty();
        self.rules = rules;
        self
    }

    /// Set the allowed option set.
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules.options = options.into_iter().map(Into::into).collect();
        self.has_options = !self.rules.options.is_empty();
        self
    }
}

/// Per-category binding of an attribute definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAttribute {
    pub category_id: Uuid,
    pub definition: AttributeDefinition,
    pub is_required: bool,
    pub display_order: i32,
}

impl CategoryAttribute {
    /// Bind a definition to a category.
    pub fn new(category_id: Uuid, definition: AttributeDefinition, is_required: bool) -> Self {
        Self {
            category_id,
            definition,
            is_required,
            display_order: 0,
        }
    }

    /// Attribute key in item maps.
    pub fn name(&self) -> &str {
        &self.definition.name
    }
}

// =============================================================================
// VALUES
// =============================================================================

/// Loosely typed attribute value lifted out of JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Null,
    Text(String),
    Number(f64),
    Boolean(bool),
    Date(NaiveDate),
    List(Vec<AttributeValue>),
    /// Nested objects are never valid attribute values but are kept for reporting.
    Object,
}

impl AttributeValue {
    /// True for values treated as "absent" by requiredness checks:
    /// null, blank strings, and empty lists.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::List(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Coerce to a finite number. Numeric strings are accepted.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Coerce to a boolean. Only `true`/`false` (bool or exact string) qualify.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            Self::Text(s) if s == "true" => Some(true),
            Self::Text(s) if s == "false" => Some(false),
            _ => None,
        }
    }

    /// Coerce to a calendar date: `YYYY-MM-DD` or an RFC 3339 timestamp.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            Self::Text(s) => {
                let s = s.trim();
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
            }
            _ => None,
        }
    }

    /// String view of scalar values (used for text, option, email, url checks).
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Number(n) => Some(format_number(*n)),
            Self::Boolean(b) => Some(b.to_string()),
            Self::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            _ => None,
        }
    }

    /// Elements of a list value.
    pub fn as_list(&self) -> Option<&[AttributeValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&JsonValue> for AttributeValue {
    fn from(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Boolean(*b),
            JsonValue::Number(n) => n.as_f64().map(Self::Number).unwrap_or(Self::Null),
            JsonValue::String(s) => Self::Text(s.clone()),
            JsonValue::Array(items) => Self::List(items.iter().map(Self::from).collect()),
            JsonValue::Object(_) => Self::Object,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_type_round_trip_names() {
        for ty in [
            AttributeDataType::Text,
            AttributeDataType::Number,
            AttributeDataType::Boolean,
            AttributeDataType::Date,
            AttributeDataType::SingleSelect,
            AttributeDataType::MultiSelect,
            AttributeDataType::Email,
            AttributeDataType::Url,
        ] {
            let parsed: AttributeDataType = ty.to_string().parse().unwrap();
            assert_eq!(parsed, ty);
        }
        assert!("color".parse::<AttributeDataType>().is_err());
    }

    #[test]
    fn test_data_type_serde_snake_case() {
        assert_eq!(
            serde_json::to_value(AttributeDataType::MultiSelect).unwrap(),
            json!("multi_select")
        );
    }

    #[test]
    fn test_uses_options() {
        assert!(AttributeDataType::SingleSelect.uses_options());
        assert!(AttributeDataType::MultiSelect.uses_options());
        assert!(!AttributeDataType::Text.uses_options());
    }

    #[test]
    fn test_value_from_json() {
        assert_eq!(AttributeValue::from(&json!(null)), AttributeValue::Null);
        assert_eq!(AttributeValue::from(&json!(18)), AttributeValue::Number(18.0));
        assert_eq!(
            AttributeValue::from(&json!(["a", 1])),
            AttributeValue::List(vec![
                AttributeValue::Text("a".to_string()),
                AttributeValue::Number(1.0)
            ])
        );
        assert_eq!(AttributeValue::from(&json!({"k": 1})), AttributeValue::Object);
    }

    #[test]
    fn test_number_coercion() {
        assert_eq!(AttributeValue::Text("18".into()).as_number(), Some(18.0));
        assert_eq!(AttributeValue::Text(" 2.5 ".into()).as_number(), Some(2.5));
        assert_eq!(AttributeValue::Text("abc".into()).as_number(), None);
        assert_eq!(AttributeValue::Text("NaN".into()).as_number(), None);
        assert_eq!(AttributeValue::Boolean(true).as_number(), None);
    }

    #[test]
    fn test_bool_coercion_is_strict() {
        assert_eq!(AttributeValue::Boolean(false).as_bool(), Some(false));
        assert_eq!(AttributeValue::Text("true".into()).as_bool(), Some(true));
        assert_eq!(AttributeValue::Text("yes".into()).as_bool(), None);
        assert_eq!(AttributeValue::Text("TRUE".into()).as_bool(), None);
        assert_eq!(AttributeValue::Number(1.0).as_bool(), None);
    }

    #[test]
    fn test_date_coercion() {
        let expected = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        assert_eq!(
            AttributeValue::Text("2026-03-14".into()).as_date(),
            Some(expected)
        );
        assert_eq!(
            AttributeValue::Text("2026-03-14T09:30:00Z".into()).as_date(),
            Some(expected)
        );
        assert_eq!(AttributeValue::Text("2026-02-30".into()).as_date(), None);
        assert_eq!(AttributeValue::Text("last week".into()).as_date(), None);
    }

    #[test]
    fn test_is_empty() {
        assert!(AttributeValue::Null.is_empty());
        assert!(AttributeValue::Text("   ".into()).is_empty());
        assert!(AttributeValue::List(vec![]).is_empty());
        assert!(!AttributeValue::Boolean(false).is_empty());
        assert!(!AttributeValue::Number(0.0).is_empty());
    }

    #[test]
    fn test_as_text_formats_integers_without_fraction() {
        assert_eq!(AttributeValue::Number(18.0).as_text(), Some("18".to_string()));
        assert_eq!(AttributeValue::Number(2.5).as_text(), Some("2.5".to_string()));
    }

    #[test]
    fn test_definition_with_options_sets_flag() {
        let def = AttributeDefinition::new("power_source", AttributeDataType::SingleSelect)
            .with_options(["battery", "corded"]);
        assert!(def.has_options);
        assert_eq!(def.rules.options.len(), 2);
    }
}
