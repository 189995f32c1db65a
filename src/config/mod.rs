//! Configuration loading for the hubsync worker.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `HUBSYNC_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application configuration derived from `HUBSYNC_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub profile: String,
    pub log_level: String,
    pub log_format: String,
    /// OAuth client identity pair used for the refresh-token exchange.
    pub hubspot_client_id: String,
    pub hubspot_client_secret: String,
    pub hubspot_api_base: String,
    pub hubspot_token_base: String,
    /// Whether watermark/credential writes reach the account store. Off by
    /// default: updates are in-memory for the duration of one run.
    pub persistence_enabled: bool,
    pub retry: RetryConfig,
    pub sync: SyncConfig,
}

/// Retry policy for single remote reads.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Number of retries after the first attempt (so `limit + 1` attempts).
    pub limit: u32,
    /// Base backoff in milliseconds; delay before retry n is `base * 2^n`.
    pub backoff_base_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            limit: default_retry_limit(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

/// Pagination and batching knobs for the sync engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Page size for company/contact searches (API maximum is 100).
    pub page_limit: u32,
    /// Page size for meeting searches.
    pub meetings_page_limit: u32,
    /// Offset depth at which the paginator re-anchors the window.
    pub max_offset_depth: u64,
    /// Accumulated actions above this count trigger a batch flush.
    pub batch_flush_threshold: usize,
    /// Created-vs-updated equality tolerance for meetings, in milliseconds.
    pub created_tolerance_ms: i64,
    /// Backfill horizon for meetings with no watermark, in days.
    pub meetings_backfill_days: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_limit: default_page_limit(),
            meetings_page_limit: default_meetings_page_limit(),
            max_offset_depth: default_max_offset_depth(),
            batch_flush_threshold: default_batch_flush_threshold(),
            created_tolerance_ms: default_created_tolerance_ms(),
            meetings_backfill_days: default_meetings_backfill_days(),
        }
    }
}

impl AppConfig {
    /// Validate cross-field constraints not expressible through defaults.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hubspot_client_id.is_empty() {
            return Err(ConfigError::MissingClientId);
        }
        if self.hubspot_client_secret.is_empty() {
            return Err(ConfigError::MissingClientSecret);
        }
        if self.sync.page_limit == 0 || self.sync.page_limit > 100 {
            return Err(ConfigError::InvalidPageLimit {
                value: self.sync.page_limit,
            });
        }
        if self.sync.meetings_page_limit == 0 || self.sync.meetings_page_limit > 100 {
            return Err(ConfigError::InvalidPageLimit {
                value: self.sync.meetings_page_limit,
            });
        }
        if self.sync.batch_flush_threshold == 0 {
            return Err(ConfigError::InvalidFlushThreshold);
        }
        Ok(())
    }

    /// JSON rendering with the OAuth secret masked, for startup logging.
    pub fn redacted_json(&self) -> Result<String, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "hubspot_client_secret".to_string(),
                serde_json::Value::String("[REDACTED]".to_string()),
            );
        }
        serde_json::to_string(&value)
    }
}

/// Loads configuration from layered env files and process environment.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads configuration with process environment taking precedence over
    /// `.env` layers.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix("HUBSYNC_") {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = layered
            .remove("PROFILE")
            .filter(|v| !v.is_empty())
            .unwrap_or(profile_hint);
        let log_level = layered
            .remove("LOG_LEVEL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_level);
        let log_format = layered
            .remove("LOG_FORMAT")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_log_format);
        let hubspot_client_id = layered.remove("HUBSPOT_CLIENT_ID").unwrap_or_default();
        let hubspot_client_secret = layered.remove("HUBSPOT_CLIENT_SECRET").unwrap_or_default();
        let hubspot_api_base = layered
            .remove("HUBSPOT_API_BASE")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_hubspot_api_base);
        let hubspot_token_base = layered
            .remove("HUBSPOT_TOKEN_BASE")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(default_hubspot_token_base);
        let persistence_enabled = layered
            .remove("PERSISTENCE_ENABLED")
            .and_then(|v| v.parse().ok())
            .unwrap_or(false);

        let retry = RetryConfig {
            limit: layered
                .remove("RETRY_LIMIT")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_retry_limit),
            backoff_base_ms: layered
                .remove("RETRY_BACKOFF_BASE_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_backoff_base_ms),
        };

        let sync = SyncConfig {
            page_limit: layered
                .remove("SYNC_PAGE_LIMIT")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_page_limit),
            meetings_page_limit: layered
                .remove("SYNC_MEETINGS_PAGE_LIMIT")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_meetings_page_limit),
            max_offset_depth: layered
                .remove("SYNC_MAX_OFFSET_DEPTH")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_max_offset_depth),
            batch_flush_threshold: layered
                .remove("SYNC_BATCH_FLUSH_THRESHOLD")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_batch_flush_threshold),
            created_tolerance_ms: layered
                .remove("SYNC_CREATED_TOLERANCE_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_created_tolerance_ms),
            meetings_backfill_days: layered
                .remove("SYNC_MEETINGS_BACKFILL_DAYS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_meetings_backfill_days),
        };

        let config = AppConfig {
            profile,
            log_level,
            log_format,
            hubspot_client_id,
            hubspot_client_secret,
            hubspot_api_base,
            hubspot_token_base,
            persistence_enabled,
            retry,
            sync,
        };

        config.validate()?;
        Ok(config)
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var("HUBSYNC_PROFILE")
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix("HUBSYNC_") {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_hubspot_api_base() -> String {
    "https://api.hubapi.com".to_string()
}

fn default_hubspot_token_base() -> String {
    "https://api.hubapi.com".to_string()
}

fn default_retry_limit() -> u32 {
    4
}

fn default_backoff_base_ms() -> u64 {
    5000
}

fn default_page_limit() -> u32 {
    100
}

fn default_meetings_page_limit() -> u32 {
    50
}

fn default_max_offset_depth() -> u64 {
    9900
}

fn default_batch_flush_threshold() -> usize {
    2000
}

fn default_created_tolerance_ms() -> i64 {
    1000
}

fn default_meetings_backfill_days() -> i64 {
    // Four years, matching the initial backfill horizon for meetings.
    365 * 4
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("HubSpot client ID is missing; set HUBSYNC_HUBSPOT_CLIENT_ID")]
    MissingClientId,
    #[error("HubSpot client secret is missing; set HUBSYNC_HUBSPOT_CLIENT_SECRET")]
    MissingClientSecret,
    #[error("page limit must be between 1 and 100, got {value}")]
    InvalidPageLimit { value: u32 },
    #[error("batch flush threshold must be greater than zero")]
    InvalidFlushThreshold,
}
