//! Import environment configuration.
//!
//! The import path is driven entirely by environment variables:
//! `SUPABASE_URL` plus `SUPABASE_SERVICE_KEY` (or `SUPABASE_ANON_KEY`)
//! for the endpoint, `STAGING=true` to target the staging table, and
//! `GITHUB_ACTIONS` to detect CI. Outside CI a `.env` file is loaded
//! first so local runs don't need exported variables.

use crate::ImportError;

/// Resolved import configuration.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Supabase project base URL.
    pub base_url: String,
    /// Service or anonymous API key.
    pub api_key: String,
    /// `true` when targeting the staging table.
    pub staging: bool,
    /// `true` when running under CI (suppresses `.env` loading and the
    /// interactive production confirmation).
    pub ci: bool,
}

impl ImportConfig {
    /// Reads the configuration from the process environment, loading a
    /// `.env` file first when not in CI.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::MissingEnv`] if the endpoint URL or both
    /// key variables are unset.
    pub fn from_env() -> Result<Self, ImportError> {
        let ci = std::env::var_os("GITHUB_ACTIONS").is_some();
        if !ci {
            // Absence of a .env file is fine; exported vars still apply.
            drop(dotenvy::dotenv());
        }

        let base_url = std::env::var("SUPABASE_URL")
            .map_err(|_| ImportError::MissingEnv("SUPABASE_URL"))?;
        let api_key = std::env::var("SUPABASE_SERVICE_KEY")
            .or_else(|_| std::env::var("SUPABASE_ANON_KEY"))
            .map_err(|_| ImportError::MissingEnv("SUPABASE_SERVICE_KEY or SUPABASE_ANON_KEY"))?;
        let staging = std::env::var("STAGING").is_ok_and(|v| v == "true");

        Ok(Self {
            base_url,
            api_key,
            staging,
            ci,
        })
    }

    /// Human-readable target environment name.
    #[must_use]
    pub const fn environment(&self) -> &'static str {
        if self.staging { "staging" } else { "production" }
    }

    /// The events table the import writes to.
    #[must_use]
    pub const fn events_table(&self) -> &'static str {
        if self.staging {
            "av_events_staging"
        } else {
            "av_events"
        }
    }
}
