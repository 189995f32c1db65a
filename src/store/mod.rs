//! Account store boundary.
//!
//! Owns account records and their watermarks. The engine treats writes as
//! best-effort: whether `save_account` does anything durable is the store's
//! business, and the orchestrator only calls it when persistence is enabled
//! in configuration.

use async_trait::async_trait;
use tracing::debug;

use crate::error::SyncError;
use crate::models::Account;

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// All accounts to process this run. Failure here is fatal to the run.
    async fn load_accounts(&self) -> Result<Vec<Account>, SyncError>;

    /// Persist updated watermarks and cached credentials for one account.
    async fn save_account(&self, account: &Account) -> Result<(), SyncError>;
}

/// Store backed by a fixed in-memory account list. Saves are accepted and
/// dropped; watermark updates live only for the duration of one run.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: Vec<Account>,
}

impl InMemoryAccountStore {
    pub fn new(accounts: Vec<Account>) -> Self {
        Self { accounts }
    }

    /// Seed a single account from `HUBSYNC_ACCOUNT_*` environment
    /// variables. Local-profile stand-in for a real account store.
    pub fn from_env() -> Self {
        let account = match (
            std::env::var("HUBSYNC_ACCOUNT_HUB_ID"),
            std::env::var("HUBSYNC_ACCOUNT_REFRESH_TOKEN"),
        ) {
            (Ok(hub_id), Ok(refresh_token)) => {
                let access_token = std::env::var("HUBSYNC_ACCOUNT_ACCESS_TOKEN").unwrap_or_default();
                Some(Account::new(hub_id, access_token, refresh_token))
            }
            _ => None,
        };
        Self {
            accounts: account.into_iter().collect(),
        }
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn load_accounts(&self) -> Result<Vec<Account>, SyncError> {
        Ok(self.accounts.clone())
    }

    async fn save_account(&self, account: &Account) -> Result<(), SyncError> {
        debug!(hub_id = %account.hub_id, "In-memory store accepted account save");
        Ok(())
    }
}
