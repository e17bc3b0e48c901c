#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Validation rules for the AV service map dataset.
//!
//! Every check is advisory-accumulating: validators return issue lists
//! instead of failing fast, and the caller decides pass/fail from the
//! aggregate error count. Running the same input twice produces an
//! identical report; no validation state persists between runs.

pub mod consistency;
pub mod drift;
pub mod geometry;
pub mod row;

use std::fmt;
use std::path::Path;

use av_map_events::{EventsError, EventsFile};
use av_map_schema::Schema;

/// Errors that prevent validation from running at all.
///
/// Findings *within* readable input are [`Issue`]s, never errors.
#[derive(Debug, thiserror::Error)]
pub enum ValidateError {
    /// The events CSV is missing or unreadable.
    #[error("failed to read events CSV: {0}")]
    Events(#[from] EventsError),
}

/// How a finding affects the validation outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Counts toward the failure exit status.
    Error,
    /// Reported but never fails the run.
    Warning,
}

/// One validation finding with a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Whether the finding fails the run.
    pub severity: Severity,
    /// Human-readable description, including row/file context.
    pub message: String,
}

impl Issue {
    /// Creates an error-severity issue.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    /// Creates a warning-severity issue.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Error => write!(f, "error: {}", self.message),
            Severity::Warning => write!(f, "warning: {}", self.message),
        }
    }
}

/// Accumulated findings from a validation run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Report {
    /// All findings, in the order the validators produced them.
    pub issues: Vec<Issue>,
}

impl Report {
    /// Number of error-severity findings.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    /// Number of warning-severity findings.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// `true` when no errors were found (warnings do not fail a run).
    #[must_use]
    pub fn passed(&self) -> bool {
        self.error_count() == 0
    }
}

/// Runs every validator over the events CSV and geometries directory,
/// aggregating all findings into one [`Report`].
///
/// The header check, per-row checks, GeoJSON structural checks, geometry
/// reference checks, and aggregate consistency checks run independently;
/// none short-circuits the others.
///
/// # Errors
///
/// Returns [`ValidateError`] only if the CSV itself cannot be read.
pub fn run(
    csv_path: &Path,
    geometries_dir: &Path,
    schema: &Schema,
) -> Result<Report, ValidateError> {
    let events = EventsFile::read(csv_path)?;
    Ok(run_on(&events, geometries_dir, schema))
}

/// Same as [`run`] but over an already-loaded [`EventsFile`].
#[must_use]
pub fn run_on(events: &EventsFile, geometries_dir: &Path, schema: &Schema) -> Report {
    let mut report = Report::default();

    // Header mismatch is a hard error, but row checks still run so a
    // single pass surfaces as much as possible.
    let headers = drift::check_headers(&events.headers, schema);
    if !headers.matches {
        report.issues.push(Issue::error(format!(
            "CSV headers incorrect. Expected: [{}], Got: [{}]",
            headers.expected.join(", "),
            headers.found.join(", ")
        )));
    }

    for record in &events.records {
        report.issues.extend(row::validate(record, schema));
    }

    report.issues.extend(geometry::validate_dir(geometries_dir));
    report
        .issues
        .extend(geometry::check_references(&events.records, geometries_dir));

    let consistency = consistency::check(&events.records);
    log::debug!(
        "consistency: {} distinct service aggregates",
        consistency.aggregates.len()
    );
    report.issues.extend(consistency.issues);

    log::info!(
        "validation produced {} errors, {} warnings over {} rows",
        report.error_count(),
        report.warning_count(),
        events.records.len()
    );

    report
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    fn write_geojson(dir: &Path, name: &str, contents: &str) {
        let mut file = std::fs::File::create(dir.join(name)).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    const VALID_FEATURE: &str = r#"{
        "type": "Feature",
        "geometry": { "type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]] },
        "properties": {}
    }"#;

    fn full_header() -> String {
        Schema::builtin().column_names().join(",")
    }

    #[test]
    fn clean_dataset_passes() {
        let dir = tempfile::tempdir().unwrap();
        write_geojson(
            dir.path(),
            "waymo-phoenix-jan-15-2024-boundary.geojson",
            VALID_FEATURE,
        );

        let csv = format!(
            "{}\n2024-01-15,service_created,Waymo,Phoenix,waymo-phoenix-jan-15-2024-boundary.geojson,Jaguar I-PACE,Waymo One,Yes,Yes,Robotaxi,Autonomous,Public,,,,,https://example.com/launch,Initial launch\n",
            full_header()
        );
        let events = EventsFile::from_reader(csv.as_bytes()).unwrap();

        let schema = Schema::builtin();
        let report = run_on(&events, dir.path(), &schema);

        assert!(report.passed(), "unexpected issues: {:?}", report.issues);
        assert_eq!(report.warning_count(), 0);
    }

    #[test]
    fn header_mismatch_is_a_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        let csv = "event_date,event_type,company\n2024-01-15,service_ended,Waymo\n";
        let events = EventsFile::from_reader(csv.as_bytes()).unwrap();

        let schema = Schema::builtin();
        let report = run_on(&events, dir.path(), &schema);

        assert!(!report.passed());
        assert!(
            report
                .issues
                .iter()
                .any(|i| i.message.starts_with("CSV headers incorrect"))
        );
    }

    #[test]
    fn repeated_runs_are_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        write_geojson(dir.path(), "broken.geojson", "{ not json");
        write_geojson(dir.path(), "ok.geojson", VALID_FEATURE);

        let csv = format!(
            "{}\n2024-01-15,service_created,Waymo,Phoenix,,Jaguar I-PACE,,Yes,Yes,Robotaxi,Autonomous,Public,,,,,,notes\n,unknown_event,,,missing.geojson,,,,,,,,,,,,,\n",
            full_header()
        );
        let events = EventsFile::from_reader(csv.as_bytes()).unwrap();
        let schema = Schema::builtin();

        let first = run_on(&events, dir.path(), &schema);
        let second = run_on(&events, dir.path(), &schema);

        assert_eq!(first, second);
        assert!(!first.passed());
    }

    #[test]
    fn warnings_do_not_fail_the_run() {
        let dir = tempfile::tempdir().unwrap();
        // service_ended with no source_url: valid, but warned about.
        let csv = format!(
            "{}\n2024-06-01,service_ended,Waymo,Phoenix,,,,,,,,,,,,,,wind-down\n",
            full_header()
        );
        let events = EventsFile::from_reader(csv.as_bytes()).unwrap();

        let schema = Schema::builtin();
        let report = run_on(&events, dir.path(), &schema);

        assert!(report.passed());
        assert_eq!(report.warning_count(), 1);
        assert!(report.issues[0].message.contains("Missing source_url"));
    }
}
