//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if required vars are missing or
//! malformed. The database URL is wrapped in `SecretString` so it never
//! ends up in logs.

pub mod secrets;

use crate::error::{Error, Result};
use crate::model::HistoryIdPolicy;
use crate::timestamp::{DEFAULT_TIMESTAMP_PATTERN, TimestampFormat, parse_offset};
use crate::validator::ValidationMode;
use secrecy::SecretString;
use std::path::PathBuf;

#[derive(Debug)]
pub struct Config {
    pub database_url: SecretString,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
    pub timestamp_format: TimestampFormat,
    pub validation_mode: ValidationMode,
    pub history_id_policy: HistoryIdPolicy,
    /// Seed file for a static project registry. When unset, the `projects`
    /// table is the registry.
    pub projects_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let pattern = optional_var("NOTIFY_TIMESTAMP_FORMAT")
            .unwrap_or_else(|| DEFAULT_TIMESTAMP_PATTERN.to_string());
        let offset = parse_offset(
            &optional_var("NOTIFY_TIMESTAMP_OFFSET").unwrap_or_else(|| "+00:00".to_string()),
        )?;

        Ok(Self {
            database_url: SecretString::from(required_var("DATABASE_URL")?),
            otel_endpoint: optional_var("OTEL_ENDPOINT"),
            log_level: optional_var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            timestamp_format: TimestampFormat::new(pattern, offset)?,
            validation_mode: optional_var("NOTIFY_VALIDATION_MODE")
                .map(|s| s.parse::<ValidationMode>())
                .transpose()?
                .unwrap_or_default(),
            history_id_policy: optional_var("NOTIFY_HISTORY_ID_POLICY")
                .map(|s| s.parse::<HistoryIdPolicy>())
                .transpose()?
                .unwrap_or_default(),
            projects_file: optional_var("NOTIFY_PROJECTS_FILE").map(PathBuf::from),
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}

/// Unset and empty are treated the same.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
