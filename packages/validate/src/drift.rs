//! Schema/CSV drift detection.
//!
//! The CSV header row must equal the schema's declared column list
//! exactly, order included. Drift either way (a column added to the CSV
//! without a schema bump, or removed from the schema but still in the
//! CSV) is surfaced with the missing/extra sets.

use std::collections::BTreeSet;

use av_map_schema::Schema;

/// Outcome of comparing the CSV header against the schema column list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftReport {
    /// `true` when the header equals the schema column list exactly.
    pub matches: bool,
    /// The schema's ordered column list.
    pub expected: Vec<String>,
    /// The header actually found in the CSV.
    pub found: Vec<String>,
    /// Columns the schema declares but the CSV lacks.
    pub missing: Vec<String>,
    /// Columns the CSV carries but the schema does not declare.
    pub extra: Vec<String>,
}

/// Compares a CSV header row against the schema's column list.
#[must_use]
pub fn check_headers(headers: &[String], schema: &Schema) -> DriftReport {
    let expected: Vec<String> = schema
        .column_names()
        .iter()
        .map(ToString::to_string)
        .collect();
    let found = headers.to_vec();

    let expected_set: BTreeSet<&String> = expected.iter().collect();
    let found_set: BTreeSet<&String> = found.iter().collect();

    let missing = expected_set
        .difference(&found_set)
        .map(|s| (*s).clone())
        .collect();
    let extra = found_set
        .difference(&expected_set)
        .map(|s| (*s).clone())
        .collect();

    DriftReport {
        matches: expected == found,
        expected,
        found,
        missing,
        extra,
    }
}
