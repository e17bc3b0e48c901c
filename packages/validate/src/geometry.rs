//! GeoJSON structural validation and geometry reference checking.
//!
//! Boundary files are checked as plain JSON documents rather than parsed
//! into geometry types: the dataset only promises structural shape
//! (FeatureCollection/Feature, `geometry` + `properties` per feature, a
//! permitted geometry type), not coordinate validity.

use std::path::Path;

use av_map_events::{EventRecord, is_inline_coordinates};
use serde_json::Value;

use crate::Issue;

/// Geometry types a boundary feature may carry.
const ALLOWED_GEOMETRY_TYPES: &[&str] = &["Polygon", "MultiPolygon", "Point", "LineString"];

/// Validates every `*.geojson` file in the geometries directory.
///
/// A malformed file is a per-file error, never fatal to the batch. Files
/// are visited in name order so repeated runs report identically.
#[must_use]
pub fn validate_dir(dir: &Path) -> Vec<Issue> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return vec![Issue::error(format!(
            "Geometries directory not found: {}",
            dir.display()
        ))];
    };

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".geojson"))
        .collect();
    names.sort();

    let mut issues = Vec::new();
    for name in names {
        issues.extend(validate_file(dir, &name));
    }
    issues
}

/// Validates one GeoJSON file; all feature-level findings are reported.
fn validate_file(dir: &Path, name: &str) -> Vec<Issue> {
    let raw = match std::fs::read_to_string(dir.join(name)) {
        Ok(raw) => raw,
        Err(e) => return vec![Issue::error(format!("{name}: Error reading file - {e}"))],
    };

    let doc: Value = match serde_json::from_str(&raw) {
        Ok(doc) => doc,
        Err(e) => return vec![Issue::error(format!("{name}: Invalid JSON - {e}"))],
    };

    // Normalize to a feature list: a bare Feature validates as a
    // collection of one.
    let features: Vec<&Value> = match doc.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => match doc.get("features") {
            None => return vec![Issue::error(format!("{name}: Missing 'features' array"))],
            Some(Value::Array(features)) => features.iter().collect(),
            Some(_) => return vec![Issue::error(format!("{name}: 'features' must be an array"))],
        },
        Some("Feature") => vec![&doc],
        other => {
            return vec![Issue::error(format!(
                "{name}: Must be a FeatureCollection or Feature, got: {}",
                other.unwrap_or("missing")
            ))];
        }
    };

    let mut issues = Vec::new();
    for (i, feature) in features.iter().enumerate() {
        if feature.get("type").and_then(Value::as_str) != Some("Feature") {
            issues.push(Issue::error(format!(
                "{name}: Feature {i} must have type 'Feature'"
            )));
        }
        if feature.get("geometry").is_none() {
            issues.push(Issue::error(format!("{name}: Feature {i} missing geometry")));
        }
        if feature.get("properties").is_none() {
            issues.push(Issue::error(format!(
                "{name}: Feature {i} missing properties"
            )));
        }

        let geometry_type = feature
            .get("geometry")
            .and_then(|g| g.get("type"))
            .and_then(Value::as_str);
        if !geometry_type.is_some_and(|t| ALLOWED_GEOMETRY_TYPES.contains(&t)) {
            issues.push(Issue::error(format!(
                "{name}: Feature {i} has invalid geometry type: {}",
                geometry_type.unwrap_or("missing")
            )));
        }
    }

    issues
}

/// Verifies that every geometry file named by a CSV row exists on disk.
///
/// Inline coordinate values are not file references and are skipped.
#[must_use]
pub fn check_references(records: &[EventRecord], dir: &Path) -> Vec<Issue> {
    let mut issues = Vec::new();

    for record in records {
        let geometry_file = record.get("geometry_file");
        if geometry_file.is_empty() || is_inline_coordinates(geometry_file) {
            continue;
        }
        if !dir.join(geometry_file).exists() {
            issues.push(Issue::error(format!(
                "Row {}: Referenced geometry file does not exist: {geometry_file}",
                record.row_num
            )));
        }
    }

    issues
}
