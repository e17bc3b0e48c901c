//! Minimal PostgREST client for the events table.
//!
//! Three operations: clear the table, insert a batch, count rows.
//! Requests are sequential and blocking from the caller's perspective;
//! any non-2xx response surfaces as an error and aborts the import.

use reqwest::header::{AUTHORIZATION, CONTENT_RANGE, HeaderMap, HeaderValue};

use crate::ImportError;
use crate::convert::DbEvent;

/// UUID no row can carry; PostgREST refuses an unfiltered DELETE, so the
/// clear uses `id=neq.<this>` to match everything.
const NIL_UUID: &str = "00000000-0000-0000-0000-000000000000";

/// Authenticated client for one Supabase project.
#[derive(Debug)]
pub struct SupabaseClient {
    client: reqwest::Client,
    rest_url: String,
}

impl SupabaseClient {
    /// Builds a client with the `apikey` and bearer headers applied to
    /// every request.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError`] if the key is not a valid header value or
    /// the HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, ImportError> {
        let mut headers = HeaderMap::new();
        let mut key_value =
            HeaderValue::from_str(api_key).map_err(|_| ImportError::InvalidApiKey)?;
        key_value.set_sensitive(true);
        headers.insert("apikey", key_value);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| ImportError::InvalidApiKey)?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .user_agent("av-map-import/1.0")
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{table}", self.rest_url)
    }

    /// Deletes every row in the table.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Http`] on request failure or a non-2xx
    /// response.
    pub async fn clear_table(&self, table: &str) -> Result<(), ImportError> {
        self.client
            .delete(self.table_url(table))
            .query(&[("id", format!("neq.{NIL_UUID}"))])
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Inserts a batch of events.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Http`] on request failure or a non-2xx
    /// response.
    pub async fn insert_batch(&self, table: &str, batch: &[DbEvent]) -> Result<(), ImportError> {
        self.client
            .post(self.table_url(table))
            .header("Prefer", "return=minimal")
            .json(batch)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Returns the exact number of rows in the table, from the
    /// `Content-Range` total of a count-only request.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Http`] on request failure, or
    /// [`ImportError::CountUnavailable`] if the response carries no
    /// usable total.
    pub async fn count_rows(&self, table: &str) -> Result<u64, ImportError> {
        let response = self
            .client
            .get(self.table_url(table))
            .query(&[("select", "id")])
            .header("Prefer", "count=exact")
            .header("Range", "0-0")
            .send()
            .await?
            .error_for_status()?;

        // Content-Range is "<from>-<to>/<total>" or "*/<total>".
        response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(|range| range.rsplit('/').next())
            .and_then(|total| total.parse::<u64>().ok())
            .ok_or(ImportError::CountUnavailable)
    }
}
