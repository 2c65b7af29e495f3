//! Attribute validation against a category's declared schema.
//!
//! Every declared attribute is checked and every failure is collected; the
//! result maps field name to message. Keys absent from the schema are
//! ignored.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value as JsonValue};
use tracing::debug;
use uuid::Uuid;

use toolshare_core::{
    AttributeDataType, AttributeValue, CategoryAttribute, CategoryStore, Error, Item, Result,
    StructuralError, ValidationResult, ValidationRules,
};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?)*\.[A-Za-z]{2,}$")
        .expect("email regex is valid")
});

/// Upper bound on distinct cached patterns; the cache is cleared when full.
const PATTERN_CACHE_LIMIT: usize = 256;

/// Compiled schema patterns keyed by source. `None` records a pattern that
/// failed to compile.
static PATTERN_CACHE: Lazy<Mutex<HashMap<String, Option<Regex>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn compiled_pattern(pattern: &str) -> Option<Regex> {
    let mut cache = PATTERN_CACHE.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(hit) = cache.get(pattern) {
        return hit.clone();
    }
    if cache.len() >= PATTERN_CACHE_LIMIT {
        cache.clear();
    }
    let compiled = Regex::new(pattern).ok();
    cache.insert(pattern.to_string(), compiled.clone());
    compiled
}

/// Validate an attribute map against a schema.
pub fn validate_attributes(
    schema: &[CategoryAttribute],
    attributes: &Map<String, JsonValue>,
) -> ValidationResult {
    let mut errors = BTreeMap::new();
    for binding in schema {
        let def = &binding.definition;
        let value = attributes
            .get(&def.name)
            .map(AttributeValue::from)
            .unwrap_or(AttributeValue::Null);

        if value.is_empty() {
            if binding.is_required {
                errors.insert(def.name.clone(), format!("{} is required", def.label));
            }
            continue;
        }

        if let Err(message) = check_value(def.data_type, &def.rules, &value) {
            errors.insert(def.name.clone(), format!("{} {}", def.label, message));
        }
    }
    ValidationResult::from_errors(errors)
}

/// Type dispatch. The error string completes a sentence starting with the label.
fn check_value(
    data_type: AttributeDataType,
    rules: &ValidationRules,
    value: &AttributeValue,
) -> std::result::Result<(), String> {
    match data_type {
        AttributeDataType::Text => check_text(rules, value),
        AttributeDataType::Number => check_number(rules, value),
        AttributeDataType::Boolean => value
            .as_bool()
            .map(|_| ())
            .ok_or_else(|| "must be true or false".to_string()),
        AttributeDataType::Date => value
            .as_date()
            .map(|_| ())
            .ok_or_else(|| "must be a valid date (YYYY-MM-DD)".to_string()),
        AttributeDataType::Email => match value.as_text() {
            Some(s) if EMAIL_RE.is_match(s.trim()) => Ok(()),
            _ => Err("must be a valid email address".to_string()),
        },
        AttributeDataType::Url => match value.as_text() {
            Some(s) if is_absolute_url(s.trim()) => Ok(()),
            _ => Err("must be a valid URL".to_string()),
        },
        AttributeDataType::SingleSelect => {
            let Some(choice) = value.as_text() else {
                return Err("must be one of the listed options".to_string());
            };
            if rules.options.is_empty() || rules.options.contains(&choice) {
                Ok(())
            } else {
                Err(format!(
                    "must be one of: {} (got '{}')",
                    rules.options.join(", "),
                    choice
                ))
            }
        }
        AttributeDataType::MultiSelect => {
            let Some(items) = value.as_list() else {
                return Err("must be a list of options".to_string());
            };
            let invalid: Vec<String> = items
                .iter()
                .filter_map(|item| match item.as_text() {
                    Some(s) if rules.options.is_empty() || rules.options.contains(&s) => None,
                    Some(s) => Some(s),
                    None => Some(describe(item)),
                })
                .collect();
            if invalid.is_empty() {
                Ok(())
            } else {
                Err(format!("contains invalid options: {}", invalid.join(", ")))
            }
        }
    }
}

fn check_text(rules: &ValidationRules, value: &AttributeValue) -> std::result::Result<(), String> {
    let text = match value {
        AttributeValue::Text(s) => s.clone(),
        other => other.as_text().ok_or_else(|| "must be text".to_string())?,
    };
    let len = text.chars().count();
    if let Some(min) = rules.min_length {
        if len < min {
            return Err(format!("must be at least {} characters", min));
        }
    }
    if let Some(max) = rules.max_length {
        if len > max {
            return Err(format!("must be at most {} characters", max));
        }
    }
    if let Some(pattern) = &rules.pattern {
        let re = compiled_pattern(pattern)
            .ok_or_else(|| "has an invalid validation pattern".to_string())?;
        if !re.is_match(&text) {
            return Err("does not match the required format".to_string());
        }
    }
    Ok(())
}

fn check_number(rules: &ValidationRules, value: &AttributeValue) -> std::result::Result<(), String> {
    let n = value
        .as_number()
        .ok_or_else(|| "must be a number".to_string())?;
    if let Some(min) = rules.min {
        if n < min {
            return Err(format!("must be at least {}", min));
        }
    }
    if let Some(max) = rules.max {
        if n > max {
            return Err(format!("must be at most {}", max));
        }
    }
    Ok(())
}

fn is_absolute_url(s: &str) -> bool {
    reqwest::Url::parse(s)
        .map(|u| u.has_host() && !u.cannot_be_a_base())
        .unwrap_or(false)
}

fn describe(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Null => "null".to_string(),
        AttributeValue::List(_) => "[list]".to_string(),
        AttributeValue::Object => "{object}".to_string(),
        other => other.as_text().unwrap_or_default(),
    }
}

/// Store-backed validator.
#[derive(Clone)]
pub struct AttributeValidator {
    store: Arc<dyn CategoryStore>,
}

impl AttributeValidator {
    pub fn new(store: Arc<dyn CategoryStore>) -> Self {
        Self { store }
    }

    /// Validate an attribute map against the schema bound to `category_id`.
    pub async fn validate(
        &self,
        category_id: Uuid,
        attributes: &Map<String, JsonValue>,
    ) -> Result<ValidationResult> {
        let schema = self.store.category_attributes(category_id).await?;
        let result = validate_attributes(&schema, attributes);
        debug!(
            subsystem = "taxonomy",
            component = "attributes",
            op = "validate",
            category_id = %category_id,
            declared = schema.len(),
            error_count = result.errors.len(),
            "Attribute validation"
        );
        Ok(result)
    }

    /// Validate an item: its category must exist and be active.
    pub async fn validate_item(&self, item: &Item) -> Result<ValidationResult> {
        match self.store.get(item.category_id).await? {
            None => {
                return Err(Error::Structural(StructuralError::CategoryNotFound(
                    item.category_id,
                )))
            }
            Some(c) if !c.is_active => {
                return Err(Error::Structural(StructuralError::CategoryInactive(c.id)))
            }
            Some(_) => {}
        }
        self.validate(item.category_id, &item.attributes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolshare_core::AttributeDefinition;

    fn bind(def: AttributeDefinition, required: bool) -> CategoryAttribute {
        CategoryAttribute::new(Uuid::nil(), def, required)
    }

    fn attrs(value: JsonValue) -> Map<String, JsonValue> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_number_coercion() {
        let schema = vec![bind(
            AttributeDefinition::new("voltage", AttributeDataType::Number),
            false,
        )];
        let bad = validate_attributes(&schema, &attrs(json!({"voltage": "abc"})));
        assert!(!bad.is_valid);
        assert!(bad.errors.contains_key("voltage"));

        let good = validate_attributes(&schema, &attrs(json!({"voltage": "18"})));
        assert!(good.is_valid, "{:?}", good.errors);
        assert!(validate_attributes(&schema, &attrs(json!({"voltage": 18.5}))).is_valid);
    }

    #[test]
    fn test_number_bounds() {
        let rules = ValidationRules {
            min: Some(1.0),
            max: Some(60.0),
            ..Default::default()
        };
        let schema = vec![bind(
            AttributeDefinition::new("voltage", AttributeDataType::Number).with_rules(rules),
            false,
        )];
        assert!(!validate_attributes(&schema, &attrs(json!({"voltage": 0}))).is_valid);
        assert!(!validate_attributes(&schema, &attrs(json!({"voltage": 120}))).is_valid);
        assert!(validate_attributes(&schema, &attrs(json!({"voltage": 60}))).is_valid);
    }

    #[test]
    fn test_required_missing_and_blank() {
        let schema = vec![bind(
            AttributeDefinition::new("brand", AttributeDataType::Text),
            true,
        )];
        let missing = validate_attributes(&schema, &Map::new());
        assert_eq!(missing.errors["brand"], "brand is required");
        let blank = validate_attributes(&schema, &attrs(json!({"brand": "   "})));
        assert!(!blank.is_valid);
        let null = validate_attributes(&schema, &attrs(json!({"brand": null})));
        assert!(!null.is_valid);
    }

    #[test]
    fn test_optional_absent_is_fine() {
        let schema = vec![bind(
            AttributeDefinition::new("brand", AttributeDataType::Text),
            false,
        )];
        assert!(validate_attributes(&schema, &Map::new()).is_valid);
    }

    #[test]
    fn test_text_length_and_pattern() {
        let rules = ValidationRules {
            min_length: Some(2),
            max_length: Some(5),
            pattern: Some(r"^[A-Z]+$".to_string()),
            ..Default::default()
        };
        let schema = vec![bind(
            AttributeDefinition::new("code", AttributeDataType::Text).with_rules(rules),
            false,
        )];
        assert!(validate_attributes(&schema, &attrs(json!({"code": "ABC"}))).is_valid);
        assert!(!validate_attributes(&schema, &attrs(json!({"code": "A"}))).is_valid);
        assert!(!validate_attributes(&schema, &attrs(json!({"code": "ABCDEF"}))).is_valid);
        assert!(!validate_attributes(&schema, &attrs(json!({"code": "abc"}))).is_valid);
    }

    #[test]
    fn test_length_counts_characters() {
        let rules = ValidationRules {
            max_length: Some(3),
            ..Default::default()
        };
        let schema = vec![bind(
            AttributeDefinition::new("mark", AttributeDataType::Text).with_rules(rules),
            false,
        )];
        assert!(validate_attributes(&schema, &attrs(json!({"mark": "äöü"}))).is_valid);
    }

    #[test]
    fn test_invalid_pattern_is_field_error() {
        let rules = ValidationRules {
            pattern: Some("([unclosed".to_string()),
            ..Default::default()
        };
        let schema = vec![bind(
            AttributeDefinition::new("code", AttributeDataType::Text).with_rules(rules),
            false,
        )];
        let result = validate_attributes(&schema, &attrs(json!({"code": "x"})));
        assert!(result.errors["code"].contains("invalid validation pattern"));
    }

    #[test]
    fn test_pattern_is_compiled_once() {
        let pattern = r"^TS-[0-9]{4}$";
        let first = compiled_pattern(pattern).unwrap();
        let second = compiled_pattern(pattern).unwrap();
        assert_eq!(first.as_str(), second.as_str());
        assert!(PATTERN_CACHE.lock().unwrap().contains_key(pattern));
        assert!(compiled_pattern("([unclosed").is_none());
        assert!(compiled_pattern("([unclosed").is_none());
    }

    #[test]
    fn test_shared_pattern_across_fields() {
        let rules = ValidationRules {
            pattern: Some(r"^[0-9]{3}-[0-9]{3}$".to_string()),
            ..Default::default()
        };
        let schema = vec![
            bind(
                AttributeDefinition::new("serial", AttributeDataType::Text)
                    .with_rules(rules.clone()),
                false,
            ),
            bind(
                AttributeDefinition::new("batch", AttributeDataType::Text).with_rules(rules),
                false,
            ),
        ];
        for _ in 0..3 {
            let result = validate_attributes(
                &schema,
                &attrs(json!({"serial": "123-456", "batch": "12-3456"})),
            );
            assert!(!result.errors.contains_key("serial"));
            assert_eq!(
                result.errors["batch"],
                "batch does not match the required format"
            );
        }
    }

    #[test]
    fn test_boolean_strictness() {
        let schema = vec![bind(
            AttributeDefinition::new("cordless", AttributeDataType::Boolean),
            false,
        )];
        for ok in [json!(true), json!(false), json!("true"), json!("false")] {
            let map = attrs(json!({ "cordless": ok }));
            assert!(validate_attributes(&schema, &map).is_valid);
        }
        for bad in [json!("yes"), json!(1), json!("TRUE")] {
            let map = attrs(json!({ "cordless": bad }));
            assert!(!validate_attributes(&schema, &map).is_valid);
        }
    }

    #[test]
    fn test_date_formats() {
        let schema = vec![bind(
            AttributeDefinition::new("purchased", AttributeDataType::Date),
            false,
        )];
        assert!(validate_attributes(&schema, &attrs(json!({"purchased": "2024-03-01"}))).is_valid);
        assert!(validate_attributes(
            &schema,
            &attrs(json!({"purchased": "2024-03-01T10:00:00Z"}))
        )
        .is_valid);
        assert!(!validate_attributes(&schema, &attrs(json!({"purchased": "2024-13-01"}))).is_valid);
        assert!(!validate_attributes(&schema, &attrs(json!({"purchased": "soon"}))).is_valid);
    }

    #[test]
    fn test_email_and_url() {
        let schema = vec![
            bind(
                AttributeDefinition::new("contact", AttributeDataType::Email),
                false,
            ),
            bind(
                AttributeDefinition::new("manual", AttributeDataType::Url),
                false,
            ),
        ];
        let ok = attrs(json!({"contact": "sam@example.org", "manual": "https://example.org/m.pdf"}));
        assert!(validate_attributes(&schema, &ok).is_valid);

        let bad = attrs(json!({"contact": "sam@", "manual": "example.org/m.pdf"}));
        let result = validate_attributes(&schema, &bad);
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn test_single_select() {
        let schema = vec![bind(
            AttributeDefinition::new("condition", AttributeDataType::SingleSelect)
                .with_options(["new", "good", "worn"]),
            false,
        )];
        assert!(validate_attributes(&schema, &attrs(json!({"condition": "good"}))).is_valid);
        assert!(!validate_attributes(&schema, &attrs(json!({"condition": "broken"}))).is_valid);
    }

    #[test]
    fn test_multi_select_reports_invalid_elements() {
        let schema = vec![bind(
            AttributeDefinition::new("power", AttributeDataType::MultiSelect)
                .with_options(["battery", "corded", "petrol"]),
            false,
        )];
        let result = validate_attributes(
            &schema,
            &attrs(json!({"power": ["battery", "solar", "steam"]})),
        );
        let message = &result.errors["power"];
        assert!(message.contains("solar"));
        assert!(message.contains("steam"));
        assert!(!message.contains("battery"));

        let not_list = validate_attributes(&schema, &attrs(json!({"power": "battery"})));
        assert!(!not_list.is_valid);
    }

    #[test]
    fn test_collects_all_errors_and_ignores_unknown_keys() {
        let schema = vec![
            bind(
                AttributeDefinition::new("voltage", AttributeDataType::Number),
                true,
            ),
            bind(
                AttributeDefinition::new("cordless", AttributeDataType::Boolean),
                true,
            ),
        ];
        let result = validate_attributes(
            &schema,
            &attrs(json!({"voltage": "high", "colour": "red"})),
        );
        assert_eq!(result.errors.len(), 2);
        assert!(!result.errors.contains_key("colour"));
    }

    #[test]
    fn test_validation_is_idempotent() {
        let schema = vec![bind(
            AttributeDefinition::new("voltage", AttributeDataType::Number),
            true,
        )];
        let map = attrs(json!({"voltage": "x"}));
        assert_eq!(
            validate_attributes(&schema, &map),
            validate_attributes(&schema, &map)
        );
    }
}
