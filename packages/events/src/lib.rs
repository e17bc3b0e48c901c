#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Event record model for the AV service map dataset.
//!
//! The dataset is event-sourced: one CSV row per dated fact about a
//! service (its creation, an attribute change, its end). This crate owns
//! the [`EventType`] enumeration, the [`EventRecord`] row model, and CSV
//! reading. Validation rules live in `av_map_validate`; the database
//! mapping lives in `av_map_import`.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use strum_macros::{Display, EnumIter, EnumString};

/// Matches an inline `longitude,latitude` coordinate pair, the accepted
/// alternative to a boundary file in the `geometry_file` column.
static INLINE_COORDINATES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+\.?\d*,-?\d+\.?\d*$").expect("valid regex"));

/// Errors that can occur while reading the events CSV.
#[derive(Debug, thiserror::Error)]
pub enum EventsError {
    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed.
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),
}

/// The fixed enumeration of event types.
///
/// Lifecycle events describe the birth, trial, announcement, or end of a
/// service; update events describe a single attribute transition. The
/// string forms (`service_created`, `fares_policy_changed`, ...) are the
/// values stored in the CSV and declared in `schema.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum EventType {
    ServiceCreated,
    ServiceTesting,
    ServiceAnnounced,
    ServiceEnded,
    GeometryUpdated,
    VehicleTypesUpdated,
    SupervisionUpdated,
    FaresPolicyChanged,
    AccessPolicyChanged,
    ServiceModelUpdated,
    PlatformUpdated,
    FleetPartnerChanged,
}

impl EventType {
    /// Returns `true` for update events (`*_updated` / `*_changed`).
    #[must_use]
    pub const fn is_update(self) -> bool {
        !matches!(
            self,
            Self::ServiceCreated | Self::ServiceTesting | Self::ServiceAnnounced | Self::ServiceEnded
        )
    }

    /// Returns the CSV column an update event changes, or `None` for
    /// lifecycle events.
    #[must_use]
    pub const fn updated_column(self) -> Option<&'static str> {
        match self {
            Self::GeometryUpdated => Some("geometry_file"),
            Self::VehicleTypesUpdated => Some("vehicles"),
            Self::SupervisionUpdated => Some("supervision"),
            Self::FaresPolicyChanged => Some("fares"),
            Self::AccessPolicyChanged => Some("access"),
            Self::ServiceModelUpdated => Some("service_model"),
            Self::PlatformUpdated => Some("platform"),
            Self::FleetPartnerChanged => Some("fleet_partner"),
            _ => None,
        }
    }
}

/// One event: a single CSV data row, keyed by column name.
///
/// Values are stored raw; [`EventRecord::get`] trims surrounding
/// whitespace so that a cell containing only spaces counts as empty.
#[derive(Debug, Clone)]
pub struct EventRecord {
    /// 1-based CSV row number (the header is row 1, data starts at 2).
    pub row_num: usize,
    fields: BTreeMap<String, String>,
}

impl EventRecord {
    /// Builds a record from parallel header and value slices.
    #[must_use]
    pub fn new(row_num: usize, headers: &[String], values: &[String]) -> Self {
        let fields = headers
            .iter()
            .cloned()
            .zip(values.iter().cloned())
            .collect();
        Self { row_num, fields }
    }

    /// Returns the trimmed value of a column, or `""` if the column is
    /// absent from the row.
    #[must_use]
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map_or("", |v| v.trim())
    }

    /// Returns `true` if the column holds a non-empty value.
    #[must_use]
    pub fn has(&self, column: &str) -> bool {
        !self.get(column).is_empty()
    }

    /// Parses the row's `event_type` column, if it names a known type.
    #[must_use]
    pub fn event_type(&self) -> Option<EventType> {
        self.get("event_type").parse().ok()
    }
}

/// The events CSV: its header row plus all data rows.
#[derive(Debug, Clone)]
pub struct EventsFile {
    /// Column names in file order.
    pub headers: Vec<String>,
    /// Data rows, with 1-based row numbers starting at 2.
    pub records: Vec<EventRecord>,
}

impl EventsFile {
    /// Reads the events CSV from disk.
    ///
    /// # Errors
    ///
    /// Returns [`EventsError`] if the file cannot be opened or a row
    /// fails to parse as CSV.
    pub fn read(path: &Path) -> Result<Self, EventsError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Reads the events CSV from any reader (used by tests with in-memory
    /// fixtures).
    ///
    /// # Errors
    ///
    /// Returns [`EventsError`] if a row fails to parse as CSV.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, EventsError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(ToString::to_string)
            .collect();

        let mut records = Vec::new();
        for (i, result) in csv_reader.records().enumerate() {
            let record = result?;
            let values: Vec<String> = record.iter().map(ToString::to_string).collect();
            // Header is row 1, so the first data row is row 2.
            records.push(EventRecord::new(i + 2, &headers, &values));
        }

        Ok(Self { headers, records })
    }
}

/// Returns `true` if a `geometry_file` value is an inline
/// `longitude,latitude` coordinate pair rather than a filename.
#[must_use]
pub fn is_inline_coordinates(value: &str) -> bool {
    INLINE_COORDINATES_RE.is_match(value)
}

/// Builds the aggregate identifier for a service: lowercased
/// `company-city` with spaces replaced by hyphens.
///
/// Every event for the same company/city pair shares this identifier.
#[must_use]
pub fn aggregate_id(company: &str, city: &str) -> String {
    format!(
        "{}-{}",
        company.trim().to_lowercase().replace(' ', "-"),
        city.trim().to_lowercase().replace(' ', "-")
    )
}
