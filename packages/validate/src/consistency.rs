//! Aggregate-level consistency checks across all rows.

use std::collections::BTreeSet;

use av_map_events::{EventRecord, aggregate_id};

use crate::Issue;

/// Result of the consistency pass: the distinct service aggregates seen,
/// plus any findings.
#[derive(Debug, Default)]
pub struct ConsistencyOutcome {
    /// Every `company-city` aggregate identifier encountered. Built for
    /// cross-reference use by future checks.
    pub aggregates: BTreeSet<String>,
    /// Findings from the consistency rules.
    pub issues: Vec<Issue>,
}

/// Accumulates the aggregate-id set and enforces that `service_created`
/// rows carry the fields a complete birth record needs.
#[must_use]
pub fn check(records: &[EventRecord]) -> ConsistencyOutcome {
    let mut outcome = ConsistencyOutcome::default();

    for record in records {
        if record.has("company") && record.has("city") {
            outcome
                .aggregates
                .insert(aggregate_id(record.get("company"), record.get("city")));
        }

        if record.get("event_type") == "service_created" {
            for field in ["company", "city", "notes"] {
                if !record.has(field) {
                    outcome.issues.push(Issue::error(format!(
                        "Row {}: service_created event missing {field}",
                        record.row_num
                    )));
                }
            }
        }
    }

    outcome
}
