//! Account model
//!
//! One `Account` per connected HubSpot portal. Holds the cached OAuth
//! credentials and the per-entity-type watermarks the paginator anchors on.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Last successfully synced instant per entity type. `None` means the
/// entity type has never completed a pass (full backfill).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LastPulledDates {
    pub companies: Option<DateTime<Utc>>,
    pub contacts: Option<DateTime<Utc>>,
    pub meetings: Option<DateTime<Utc>>,
}

/// A connected HubSpot account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub hub_id: String,
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry of the cached access token. `None` until the first refresh.
    pub token_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_pulled_dates: LastPulledDates,
}

impl Account {
    pub fn new<S: Into<String>>(hub_id: S, access_token: S, refresh_token: S) -> Self {
        Self {
            hub_id: hub_id.into(),
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            token_expires_at: None,
            last_pulled_dates: LastPulledDates::default(),
        }
    }

    /// Whether the cached access token has outlived its expiry. An account
    /// that has never been refreshed is not considered expired.
    pub fn token_expired(&self, now: DateTime<Utc>) -> bool {
        self.token_expires_at.is_some_and(|expiry| now > expiry)
    }

    /// Install a freshly exchanged access token. The refresh credential is
    /// never rotated here.
    pub fn apply_token(&mut self, access_token: String, expires_in_secs: i64, now: DateTime<Utc>) {
        self.access_token = access_token;
        self.token_expires_at = Some(now + Duration::seconds(expires_in_secs));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrefreshed_account_is_not_expired() {
        let account = Account::new("hub-1", "tok", "refresh");
        assert!(!account.token_expired(Utc::now()));
    }

    #[test]
    fn apply_token_sets_expiry_from_now() {
        let mut account = Account::new("hub-1", "old", "refresh");
        let now = Utc::now();
        account.apply_token("new".to_string(), 1800, now);

        assert_eq!(account.access_token, "new");
        assert_eq!(account.refresh_token, "refresh");
        assert!(!account.token_expired(now + Duration::seconds(1799)));
        assert!(account.token_expired(now + Duration::seconds(1801)));
    }
}
