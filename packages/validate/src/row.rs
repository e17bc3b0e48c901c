//! Row-level validation: the per-event rule engine.
//!
//! Every check runs independently over one CSV record; nothing
//! short-circuits, so a single bad row reports all of its problems at
//! once. The rule tables (required/forbidden fields per event type, enum
//! value sets, column patterns) come from the loaded [`Schema`].

use av_map_events::{EventRecord, is_inline_coordinates};
use av_map_schema::Schema;

use crate::Issue;

/// Validates one CSV record against the schema, returning every finding.
#[must_use]
pub fn validate(record: &EventRecord, schema: &Schema) -> Vec<Issue> {
    let mut issues = Vec::new();
    let row = record.row_num;

    // Always-required columns (event_date, event_type).
    for column in schema.required_columns() {
        if !record.has(column) {
            issues.push(Issue::error(format!("Row {row}: Missing {column}")));
        }
    }

    // Date shape. Syntactic only: no calendar validity check.
    let date = record.get("event_date");
    if !date.is_empty()
        && let Some(pattern) = schema.pattern("event_date")
        && !pattern.is_match(date)
    {
        issues.push(Issue::error(format!(
            "Row {row}: Invalid event_date format. Expected YYYY-MM-DD, got: {date}"
        )));
    }

    // Event-type membership. Unknown types are a hard error, and the
    // per-type field rules below only apply to known types.
    let event_type = record.get("event_type");
    let known_type = !event_type.is_empty() && schema.event_types().contains(&event_type);
    if !event_type.is_empty() && !known_type {
        issues.push(Issue::error(format!(
            "Row {row}: Invalid event_type '{event_type}'. Valid types: [{}]",
            schema.event_types().join(", ")
        )));
    }

    if known_type {
        issues.extend(check_event_type_rules(record, schema, event_type));
    }

    // Geometry filename convention, unless the value is an inline
    // longitude,latitude pair. Suffix and pattern checks fire
    // independently.
    let geometry_file = record.get("geometry_file");
    if !geometry_file.is_empty() && !is_inline_coordinates(geometry_file) {
        if !geometry_file.ends_with(".geojson") {
            issues.push(Issue::error(format!(
                "Row {row}: Geometry file should end with .geojson or be inline coordinates (lng,lat): {geometry_file}"
            )));
        }
        if let Some(pattern) = schema.pattern("geometry_file")
            && !pattern.is_match(geometry_file)
        {
            issues.push(Issue::error(format!(
                "Row {row}: Geometry file doesn't follow naming convention: {geometry_file}"
            )));
        }
    }

    // Enum columns.
    for column in schema.enum_columns() {
        let value = record.get(column);
        if !value.is_empty() {
            let valid = schema.enum_values(column);
            if !valid.contains(&value) {
                issues.push(Issue::error(format!(
                    "Row {row}: {column} must be one of [{}], got: {value}",
                    valid.join(", ")
                )));
            }
        }
    }

    // URL shape: scheme and host both required.
    for column in schema.url_fields() {
        let value = record.get(column);
        if !value.is_empty() && !is_valid_url(value) {
            issues.push(Issue::error(format!(
                "Row {row}: Invalid URL format: {value}"
            )));
        }
    }

    // Recommended but not required; a documented warning, never an error.
    if !record.has("source_url") {
        issues.push(Issue::warning(format!(
            "Row {row}: Missing source_url (recommended for verification)"
        )));
    }

    issues
}

/// Applies the per-event-type required/forbidden field rules plus the
/// update-event composition rules.
fn check_event_type_rules(record: &EventRecord, schema: &Schema, event_type: &str) -> Vec<Issue> {
    let mut issues = Vec::new();
    let row = record.row_num;
    let is_update = event_type.ends_with("_updated") || event_type.ends_with("_changed");

    for field in schema.required_fields(event_type) {
        if record.has(field) {
            continue;
        }
        // Update events get the disambiguation wording for company: in
        // multi-operator cities the company is what identifies the
        // service being updated.
        if is_update && field == "company" {
            issues.push(Issue::error(format!(
                "Row {row}: Update event must have company field to identify the service"
            )));
        } else {
            issues.push(Issue::error(format!(
                "Row {row}: {event_type} event missing required field: {field}"
            )));
        }
    }

    let filled_attributes: Vec<&str> = schema
        .service_attribute_fields()
        .iter()
        .map(String::as_str)
        .filter(|field| record.has(field))
        .collect();

    if !schema.forbidden_fields(event_type).is_empty() && !filled_attributes.is_empty() {
        let forbidden_filled: Vec<&str> = filled_attributes
            .iter()
            .copied()
            .filter(|f| schema.forbidden_fields(event_type).iter().any(|x| x == f))
            .collect();
        if !forbidden_filled.is_empty() {
            issues.push(Issue::error(format!(
                "Row {row}: {event_type} event should not have service attribute fields filled: [{}]",
                forbidden_filled.join(", ")
            )));
        }
    }

    // Non-geometry update events must change something. More than one
    // filled attribute is tolerated as a complex update.
    if is_update && event_type != "geometry_updated" && filled_attributes.is_empty() {
        issues.push(Issue::error(format!(
            "Row {row}: {event_type} event should have at least one service attribute field filled"
        )));
    }

    if is_update && !record.has("company") && !schema.required_fields(event_type).iter().any(|f| f == "company") {
        issues.push(Issue::error(format!(
            "Row {row}: Update event must have company field to identify the service"
        )));
    }

    issues
}

/// A URL is valid when it parses with both a scheme and a host.
fn is_valid_url(value: &str) -> bool {
    url::Url::parse(value).is_ok_and(|u| !u.scheme().is_empty() && u.has_host())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> EventRecord {
        let headers: Vec<String> = pairs.iter().map(|(k, _)| (*k).to_string()).collect();
        let values: Vec<String> = pairs.iter().map(|(_, v)| (*v).to_string()).collect();
        EventRecord::new(2, &headers, &values)
    }

    fn errors(record: &EventRecord) -> Vec<String> {
        let schema = Schema::builtin();
        validate(record, &schema)
            .into_iter()
            .filter(|i| i.severity == crate::Severity::Error)
            .map(|i| i.message)
            .collect()
    }

    #[test]
    fn full_service_created_row_passes() {
        let row = record(&[
            ("event_date", "2024-01-15"),
            ("event_type", "service_created"),
            ("company", "Waymo"),
            ("city", "Phoenix"),
            ("vehicles", "Jaguar I-PACE"),
            ("fares", "Yes"),
            ("direct_booking", "Yes"),
            ("service_model", "Robotaxi"),
            ("supervision", "Autonomous"),
            ("access", "Public"),
        ]);
        assert_eq!(errors(&row), Vec::<String>::new());
    }

    #[test]
    fn platform_is_not_required_for_service_created() {
        let row = record(&[
            ("event_date", "2024-01-15"),
            ("event_type", "service_created"),
            ("company", "Waymo"),
            ("city", "Phoenix"),
            ("vehicles", "Jaguar I-PACE"),
            ("fares", "Yes"),
            ("direct_booking", "Yes"),
            ("service_model", "Robotaxi"),
            ("supervision", "Autonomous"),
            ("access", "Public"),
        ]);
        assert!(!errors(&row).iter().any(|e| e.contains("platform")));
    }

    #[test]
    fn service_created_reports_each_missing_field() {
        let row = record(&[
            ("event_date", "2024-01-15"),
            ("event_type", "service_created"),
            ("company", "Waymo"),
            ("city", "Phoenix"),
        ]);
        let errs = errors(&row);
        for field in [
            "vehicles",
            "fares",
            "direct_booking",
            "service_model",
            "supervision",
            "access",
        ] {
            assert!(
                errs.iter()
                    .any(|e| e.ends_with(&format!("missing required field: {field}"))),
                "no error for {field}: {errs:?}"
            );
        }
    }

    #[test]
    fn update_with_single_attribute_and_company_passes() {
        let row = record(&[
            ("event_date", "2024-03-01"),
            ("event_type", "fares_policy_changed"),
            ("company", "Waymo"),
            ("fares", "No"),
        ]);
        assert_eq!(errors(&row), Vec::<String>::new());
    }

    #[test]
    fn update_without_company_fails_with_disambiguation_message() {
        let row = record(&[
            ("event_date", "2024-03-01"),
            ("event_type", "fares_policy_changed"),
            ("fares", "No"),
        ]);
        let errs = errors(&row);
        assert_eq!(errs.len(), 1, "{errs:?}");
        assert_eq!(
            errs[0],
            "Row 2: Update event must have company field to identify the service"
        );
    }

    #[test]
    fn update_with_no_attribute_filled_fails() {
        let row = record(&[
            ("event_date", "2024-03-01"),
            ("event_type", "supervision_updated"),
            ("company", "Waymo"),
        ]);
        let errs = errors(&row);
        assert!(
            errs.iter()
                .any(|e| e.contains("at least one service attribute field filled")),
            "{errs:?}"
        );
    }

    #[test]
    fn complex_updates_are_tolerated() {
        let row = record(&[
            ("event_date", "2024-03-01"),
            ("event_type", "supervision_updated"),
            ("company", "Waymo"),
            ("supervision", "Autonomous"),
            ("access", "Public"),
        ]);
        assert_eq!(errors(&row), Vec::<String>::new());
    }

    #[test]
    fn geometry_updated_requires_geometry_file_and_forbids_attributes() {
        let row = record(&[
            ("event_date", "2024-03-01"),
            ("event_type", "geometry_updated"),
            ("company", "Waymo"),
            ("supervision", "Autonomous"),
        ]);
        let errs = errors(&row);
        assert!(
            errs.iter()
                .any(|e| e.contains("missing required field: geometry_file")),
            "{errs:?}"
        );
        assert!(
            errs.iter()
                .any(|e| e.contains("should not have service attribute fields filled")),
            "{errs:?}"
        );
    }

    #[test]
    fn service_ended_forbids_attribute_fields() {
        let row = record(&[
            ("event_date", "2024-06-01"),
            ("event_type", "service_ended"),
            ("company", "Waymo"),
            ("city", "Phoenix"),
            ("vehicles", "Jaguar I-PACE"),
            ("fares", "Yes"),
        ]);
        let errs = errors(&row);
        assert!(
            errs.iter().any(|e| e.contains(
                "service_ended event should not have service attribute fields filled: [vehicles, fares]"
            )),
            "{errs:?}"
        );
    }

    #[test]
    fn missing_date_and_type_are_both_reported() {
        let row = record(&[("company", "Waymo")]);
        let errs = errors(&row);
        assert!(errs.contains(&"Row 2: Missing event_date".to_string()));
        assert!(errs.contains(&"Row 2: Missing event_type".to_string()));
    }

    #[test]
    fn bad_date_shape_is_rejected() {
        let row = record(&[
            ("event_date", "01/15/2024"),
            ("event_type", "service_ended"),
            ("company", "Waymo"),
            ("city", "Phoenix"),
        ]);
        assert!(
            errors(&row)
                .iter()
                .any(|e| e.contains("Invalid event_date format"))
        );
    }

    #[test]
    fn unknown_event_type_is_a_hard_error() {
        let row = record(&[("event_date", "2024-01-15"), ("event_type", "service_paused")]);
        assert!(
            errors(&row)
                .iter()
                .any(|e| e.contains("Invalid event_type 'service_paused'"))
        );
    }

    #[test]
    fn inline_coordinates_skip_filename_checks() {
        let row = record(&[
            ("event_date", "2024-01-15"),
            ("event_type", "geometry_updated"),
            ("company", "Waymo"),
            ("geometry_file", "-112.074,33.448"),
        ]);
        assert_eq!(errors(&row), Vec::<String>::new());
    }

    #[test]
    fn bad_geometry_filename_fails_both_checks_independently() {
        let row = record(&[
            ("event_date", "2024-01-15"),
            ("event_type", "geometry_updated"),
            ("company", "Waymo"),
            ("geometry_file", "Phoenix_Boundary.json"),
        ]);
        let errs = errors(&row);
        assert!(errs.iter().any(|e| e.contains("should end with .geojson")));
        assert!(
            errs.iter()
                .any(|e| e.contains("doesn't follow naming convention"))
        );
    }

    #[test]
    fn well_named_missing_file_passes_naming_check() {
        // Reference existence is the reference checker's job, not the
        // row validator's.
        let row = record(&[
            ("event_date", "2024-01-15"),
            ("event_type", "geometry_updated"),
            ("company", "Waymo"),
            ("geometry_file", "waymo-phoenix-jan-15-2024-boundary.geojson"),
        ]);
        assert_eq!(errors(&row), Vec::<String>::new());
    }

    #[test]
    fn invalid_enum_value_is_rejected() {
        let row = record(&[
            ("event_date", "2024-01-15"),
            ("event_type", "fares_policy_changed"),
            ("company", "Waymo"),
            ("fares", "Maybe"),
        ]);
        assert!(
            errors(&row)
                .iter()
                .any(|e| e.contains("fares must be one of [Yes, No], got: Maybe"))
        );
    }

    #[test]
    fn url_without_scheme_or_host_is_rejected() {
        for bad in ["not-a-url", "example.com/page", "mailto:data@example.com"] {
            let row = record(&[
                ("event_date", "2024-01-15"),
                ("event_type", "service_ended"),
                ("company", "Waymo"),
                ("city", "Phoenix"),
                ("source_url", bad),
            ]);
            assert!(
                errors(&row)
                    .iter()
                    .any(|e| e.contains(&format!("Invalid URL format: {bad}"))),
                "{bad} was accepted"
            );
        }
    }

    #[test]
    fn missing_source_url_is_only_a_warning() {
        let schema = Schema::builtin();
        let row = record(&[
            ("event_date", "2024-06-01"),
            ("event_type", "service_ended"),
            ("company", "Waymo"),
            ("city", "Phoenix"),
        ]);
        let issues = validate(&row, &schema);
        assert!(issues.iter().all(|i| i.severity == crate::Severity::Warning));
        assert_eq!(issues.len(), 1);
    }
}
