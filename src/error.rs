//! # Error Handling
//!
//! Unified error taxonomy for the sync engine. Every remote failure is
//! classified so the orchestrator can decide whether a pass degrades,
//! retries, or aborts.

use thiserror::Error;

/// Errors raised by sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Credential exchange failed. Logged by the retry layer; the stale
    /// token is retried anyway.
    #[error("token refresh failed: {0}")]
    Auth(String),

    /// A single remote fetch failed. Retried up to the configured limit.
    #[error("transient remote failure: {0}")]
    Transient(String),

    /// The retry budget is spent. Aborts the current entity pass only.
    #[error("retry budget exhausted after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    /// An association or batch-read lookup failed. The enricher degrades to
    /// a null map instead of propagating this.
    #[error("enrichment lookup failed: {0}")]
    Enrichment(String),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl SyncError {
    pub fn auth<S: Into<String>>(message: S) -> Self {
        Self::Auth(message.into())
    }

    pub fn transient<S: Into<String>>(message: S) -> Self {
        Self::Transient(message.into())
    }

    pub fn enrichment<S: Into<String>>(message: S) -> Self {
        Self::Enrichment(message.into())
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transient(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_carries_attempt_count() {
        let err = SyncError::Exhausted {
            attempts: 5,
            last_error: "HTTP 500".to_string(),
        };
        assert!(matches!(err, SyncError::Exhausted { .. }));
        assert!(err.to_string().contains("5 attempts"));
    }

    #[test]
    fn constructors_map_to_expected_variants() {
        assert!(matches!(SyncError::auth("x"), SyncError::Auth(_)));
        assert!(matches!(SyncError::transient("x"), SyncError::Transient(_)));
        assert!(matches!(
            SyncError::enrichment("x"),
            SyncError::Enrichment(_)
        ));
    }
}
