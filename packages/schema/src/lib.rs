#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Loader for the versioned `schema.json` document.
//!
//! The schema is the single source of truth for the dataset's column
//! order, enum value sets, and per-event-type field rules. The canonical
//! document is embedded at compile time via [`include_str!`]; a path can
//! be supplied at runtime to validate against an edited copy.
//!
//! A [`Schema`] is loaded once at process start and passed explicitly to
//! every validator. There is no global instance.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;

/// The canonical schema document, compiled into the binary.
const BUILTIN_SCHEMA_JSON: &str = include_str!("../schema.json");

/// Errors that can occur while loading the schema document.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Schema file could not be read.
    #[error("failed to read schema document: {0}")]
    Io(#[from] std::io::Error),

    /// Schema document is not valid JSON or is missing required keys.
    #[error("malformed schema document: {0}")]
    Json(#[from] serde_json::Error),

    /// The `event_type` column definition (with its enum) is mandatory.
    #[error("schema does not define an `event_type` column with an enum")]
    MissingEventTypeEnum,

    /// A declared column pattern failed to compile.
    #[error("invalid pattern for column `{column}`: {source}")]
    Pattern {
        /// Column whose pattern is broken.
        column: String,
        /// Underlying regex compile error.
        source: regex::Error,
    },
}

/// One column definition from the schema's ordered `columns` array.
#[derive(Debug, Deserialize)]
pub struct ColumnDef {
    /// Column name as it appears in the CSV header.
    pub name: String,
    /// Whether the column must be non-empty on every row.
    #[serde(default)]
    pub required: bool,
    /// Closed value set for the column, if any. May include `""` to
    /// document that the column is omittable; accessors filter it out.
    #[serde(default, rename = "enum")]
    pub values: Option<Vec<String>>,
    /// Regex the column's non-empty values must match, if any.
    #[serde(default)]
    pub pattern: Option<String>,
}

/// Required/forbidden/allowed field lists for one event type.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTypeRules {
    /// Fields that must be non-empty for this event type.
    #[serde(default)]
    pub required_fields: Vec<String>,
    /// Fields that must be empty for this event type.
    #[serde(default)]
    pub forbidden_fields: Vec<String>,
    /// Fields that may be filled but are not required.
    #[serde(default)]
    pub allowed_fields: Vec<String>,
}

/// The `validationRules` block: cross-cutting field groupings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRules {
    /// Columns whose non-empty values must parse as URLs.
    pub url_fields: Vec<String>,
    /// The mutable service attribute columns checked by the update-event
    /// and `service_ended` rules.
    pub service_attribute_fields: Vec<String>,
}

/// Raw deserialized shape of `schema.json`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaDoc {
    version: String,
    columns: Vec<ColumnDef>,
    event_type_requirements: BTreeMap<String, EventTypeRules>,
    validation_rules: ValidationRules,
}

/// A loaded, validated schema document with compiled column patterns.
#[derive(Debug)]
pub struct Schema {
    doc: SchemaDoc,
    patterns: BTreeMap<String, Regex>,
}

impl Schema {
    /// Returns the canonical schema compiled into the binary.
    ///
    /// # Panics
    ///
    /// Panics if the embedded document is malformed. This is effectively
    /// a compile-time guarantee; the schema tests parse the same bytes.
    #[must_use]
    pub fn builtin() -> Self {
        Self::parse(BUILTIN_SCHEMA_JSON)
            .unwrap_or_else(|e| panic!("embedded schema.json is invalid: {e}"))
    }

    /// Loads and validates a schema document from disk.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the file is missing, malformed, missing
    /// the `event_type` enum, or declares an invalid pattern.
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Parses and validates a schema document from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the document is malformed, missing the
    /// `event_type` enum, or declares an invalid pattern.
    pub fn parse(raw: &str) -> Result<Self, SchemaError> {
        let doc: SchemaDoc = serde_json::from_str(raw)?;

        // The event_type enum drives the rule tables; a schema without it
        // cannot validate anything.
        let has_event_types = doc
            .columns
            .iter()
            .any(|col| col.name == "event_type" && col.values.is_some());
        if !has_event_types {
            return Err(SchemaError::MissingEventTypeEnum);
        }

        let mut patterns = BTreeMap::new();
        for col in &doc.columns {
            if let Some(pattern) = &col.pattern {
                let regex = Regex::new(pattern).map_err(|source| SchemaError::Pattern {
                    column: col.name.clone(),
                    source,
                })?;
                patterns.insert(col.name.clone(), regex);
            }
        }

        Ok(Self { doc, patterns })
    }

    /// Schema document version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.doc.version
    }

    /// All column definitions, in CSV order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDef] {
        &self.doc.columns
    }

    /// Ordered column names; the CSV header must equal this exactly.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.doc.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Columns that must be non-empty on every row.
    #[must_use]
    pub fn required_columns(&self) -> Vec<&str> {
        self.doc
            .columns
            .iter()
            .filter(|c| c.required)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// The valid event type strings, from the `event_type` column enum.
    #[must_use]
    pub fn event_types(&self) -> Vec<&str> {
        self.enum_values("event_type")
    }

    /// Enum values for a column, with the empty string filtered out.
    /// Empty for columns without an enum.
    #[must_use]
    pub fn enum_values(&self, column: &str) -> Vec<&str> {
        self.doc
            .columns
            .iter()
            .find(|c| c.name == column)
            .and_then(|c| c.values.as_ref())
            .map_or_else(Vec::new, |values| {
                values
                    .iter()
                    .map(String::as_str)
                    .filter(|v| !v.is_empty())
                    .collect()
            })
    }

    /// Column names that carry an enum value set.
    #[must_use]
    pub fn enum_columns(&self) -> Vec<&str> {
        self.doc
            .columns
            .iter()
            .filter(|c| c.name != "event_type" && c.values.is_some())
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Fields that must be non-empty for the given event type.
    #[must_use]
    pub fn required_fields(&self, event_type: &str) -> &[String] {
        self.doc
            .event_type_requirements
            .get(event_type)
            .map_or(&[][..], |r| r.required_fields.as_slice())
    }

    /// Fields that must be empty for the given event type.
    #[must_use]
    pub fn forbidden_fields(&self, event_type: &str) -> &[String] {
        self.doc
            .event_type_requirements
            .get(event_type)
            .map_or(&[][..], |r| r.forbidden_fields.as_slice())
    }

    /// Fields the given event type may fill but does not require.
    #[must_use]
    pub fn allowed_fields(&self, event_type: &str) -> &[String] {
        self.doc
            .event_type_requirements
            .get(event_type)
            .map_or(&[][..], |r| r.allowed_fields.as_slice())
    }

    /// Compiled pattern for a column, if the schema declares one.
    #[must_use]
    pub fn pattern(&self, column: &str) -> Option<&Regex> {
        self.patterns.get(column)
    }

    /// Columns whose non-empty values must parse as URLs.
    #[must_use]
    pub fn url_fields(&self) -> &[String] {
        &self.doc.validation_rules.url_fields
    }

    /// The mutable service attribute columns.
    #[must_use]
    pub fn service_attribute_fields(&self) -> &[String] {
        &self.doc.validation_rules.service_attribute_fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Column and event-type counts the rest of the toolchain assumes.
    const EXPECTED_COLUMN_COUNT: usize = 18;
    const EXPECTED_EVENT_TYPE_COUNT: usize = 12;

    #[test]
    fn builtin_schema_loads() {
        let schema = Schema::builtin();
        assert_eq!(schema.version(), "1.3.0");
        assert_eq!(schema.column_names().len(), EXPECTED_COLUMN_COUNT);
        assert_eq!(schema.event_types().len(), EXPECTED_EVENT_TYPE_COUNT);
    }

    #[test]
    fn column_order_starts_with_identity_fields() {
        let schema = Schema::builtin();
        let names = schema.column_names();
        assert_eq!(
            &names[..5],
            &["event_date", "event_type", "company", "city", "geometry_file"]
        );
        assert_eq!(names.last(), Some(&"notes"));
    }

    #[test]
    fn only_date_and_type_are_always_required() {
        let schema = Schema::builtin();
        assert_eq!(schema.required_columns(), ["event_date", "event_type"]);
    }

    #[test]
    fn enum_values_filter_the_empty_string() {
        let schema = Schema::builtin();
        assert_eq!(schema.enum_values("fares"), ["Yes", "No"]);
        assert!(schema.enum_values("company").is_empty());
    }

    #[test]
    fn enum_columns_exclude_event_type() {
        let schema = Schema::builtin();
        assert_eq!(
            schema.enum_columns(),
            ["fares", "direct_booking", "service_model", "supervision", "access"]
        );
    }

    #[test]
    fn platform_is_optional_for_service_created() {
        let schema = Schema::builtin();
        let required = schema.required_fields("service_created");
        assert!(!required.iter().any(|f| f == "platform"));
        assert!(required.iter().any(|f| f == "vehicles"));
        assert!(schema
            .allowed_fields("service_created")
            .iter()
            .any(|f| f == "platform"));
    }

    #[test]
    fn service_ended_forbids_attribute_fields() {
        let schema = Schema::builtin();
        let forbidden = schema.forbidden_fields("service_ended");
        for field in schema.service_attribute_fields() {
            assert!(forbidden.contains(field), "missing {field}");
        }
    }

    #[test]
    fn unknown_event_type_has_empty_rules() {
        let schema = Schema::builtin();
        assert!(schema.required_fields("service_paused").is_empty());
        assert!(schema.forbidden_fields("service_paused").is_empty());
    }

    #[test]
    fn date_pattern_is_syntactic_only() {
        let schema = Schema::builtin();
        let pattern = schema.pattern("event_date").unwrap();
        assert!(pattern.is_match("2024-01-15"));
        // No calendar validity: month 13 still matches the shape.
        assert!(pattern.is_match("2024-13-45"));
        assert!(!pattern.is_match("15-01-2024"));
    }

    #[test]
    fn rejects_schema_without_event_type_enum() {
        let raw = r#"{
            "version": "0.0.1",
            "columns": [{ "name": "event_date", "required": true }],
            "eventTypeRequirements": {},
            "validationRules": { "urlFields": [], "serviceAttributeFields": [] }
        }"#;
        assert!(matches!(
            Schema::parse(raw),
            Err(SchemaError::MissingEventTypeEnum)
        ));
    }

    #[test]
    fn rejects_invalid_column_pattern() {
        let raw = r#"{
            "version": "0.0.1",
            "columns": [
                { "name": "event_type", "enum": ["service_created"] },
                { "name": "geometry_file", "pattern": "([unclosed" }
            ],
            "eventTypeRequirements": {},
            "validationRules": { "urlFields": [], "serviceAttributeFields": [] }
        }"#;
        assert!(matches!(
            Schema::parse(raw),
            Err(SchemaError::Pattern { column, .. }) if column == "geometry_file"
        ));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            Schema::parse("{ not json"),
            Err(SchemaError::Json(_))
        ));
    }

    #[test]
    fn load_fails_for_missing_file() {
        let err = Schema::load(Path::new("/no/such/schema.json")).unwrap_err();
        assert!(matches!(err, SchemaError::Io(_)));
    }
}
