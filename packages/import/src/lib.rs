#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Supabase import for the events dataset.
//!
//! Reads `events.csv`, converts every row to its database event shape,
//! and syncs the target table over the PostgREST API: clear, insert in
//! batches of 50, then verify the row count. Conversion is
//! all-or-nothing: a single bad row aborts the import before anything is
//! written, since batch insertion assumes a fully-validated event list.

pub mod config;
pub mod convert;
pub mod supabase;

use std::path::Path;

use av_map_events::{EventsError, EventsFile};

pub use config::ImportConfig;
use convert::ConvertError;
use supabase::SupabaseClient;

/// Events per PostgREST insert request.
pub const BATCH_SIZE: usize = 50;

/// Errors that abort an import.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// A required environment variable is unset.
    #[error("missing required environment variable: {0}")]
    MissingEnv(&'static str),

    /// The API key cannot be used as an HTTP header value.
    #[error("Supabase API key is not a valid header value")]
    InvalidApiKey,

    /// The events CSV is missing or unreadable.
    #[error("failed to read events CSV: {0}")]
    Events(#[from] EventsError),

    /// A CSV row could not be converted to a database event.
    #[error(transparent)]
    Convert(#[from] ConvertError),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The count response carried no usable `Content-Range` total.
    #[error("could not determine row count from the count response")]
    CountUnavailable,

    /// Post-import verification found a different number of rows than
    /// were converted from the CSV.
    #[error("count mismatch after import: CSV has {expected} events, database has {actual}")]
    CountMismatch {
        /// Events converted from the CSV.
        expected: u64,
        /// Rows the database reported after import.
        actual: u64,
    },
}

/// What a completed import did.
#[derive(Debug, Clone)]
pub struct ImportSummary {
    /// Table the events were written to.
    pub table: &'static str,
    /// Number of events imported.
    pub imported: u64,
}

/// Runs the full import: read, convert, clear, batch-insert, verify.
///
/// No retry or backoff: a failed batch aborts the import with the
/// propagated HTTP error.
///
/// # Errors
///
/// Returns [`ImportError`] if the CSV cannot be read, any row fails
/// conversion, any request fails, or the post-import count does not
/// match.
pub async fn run(config: &ImportConfig, csv_path: &Path) -> Result<ImportSummary, ImportError> {
    log::info!("Reading {}...", csv_path.display());
    let events_file = EventsFile::read(csv_path)?;
    log::info!("Found {} events in CSV", events_file.records.len());

    let mut events = Vec::with_capacity(events_file.records.len());
    for record in &events_file.records {
        events.push(convert::to_db_event(record)?);
    }
    log::info!("Converted {} events", events.len());

    let client = SupabaseClient::new(&config.base_url, &config.api_key)?;
    let table = config.events_table();

    log::info!("Clearing {table} table...");
    client.clear_table(table).await?;

    let mut imported: u64 = 0;
    for batch in events.chunks(BATCH_SIZE) {
        client.insert_batch(table, batch).await?;
        imported += batch.len() as u64;
        log::info!("Progress: {imported}/{} events", events.len());
    }

    log::info!("Verifying import...");
    let actual = client.count_rows(table).await?;
    let expected = events.len() as u64;
    if actual != expected {
        return Err(ImportError::CountMismatch { expected, actual });
    }

    log::info!("Imported {imported} events to {table}");
    Ok(ImportSummary { table, imported })
}
