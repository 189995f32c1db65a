//! Sync orchestrator.
//!
//! Drives, per account, a sequential pass over each entity type:
//! `RefreshToken -> SyncContacts -> SyncCompanies -> SyncMeetings ->
//! DrainQueue`. Every stage failure is caught and logged with the stage
//! name and account id, and the machine proceeds to the next stage, so
//! partial success is preserved per account and per entity type.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::error::SyncError;
use crate::hubspot::HubSpotClient;
use crate::hubspot::types::{SearchRequest, SearchResponse};
use crate::models::{Account, Action, ActionName, RawRecord, filter_null_values};
use crate::sink::ActionSink;
use crate::store::AccountStore;
use crate::sync::queue::ActionQueue;
use crate::sync::window::{EntityKind, SyncWindow};
use crate::sync::{enrich, retry};

pub struct SyncEngine {
    config: Arc<AppConfig>,
    client: HubSpotClient,
    sink: Arc<dyn ActionSink>,
}

impl SyncEngine {
    pub fn new(config: Arc<AppConfig>, client: HubSpotClient, sink: Arc<dyn ActionSink>) -> Self {
        Self {
            config,
            client,
            sink,
        }
    }

    /// Process every account sequentially. Only an unreadable account store
    /// fails the run as a whole.
    pub async fn run(&self, store: &dyn AccountStore) -> Result<(), SyncError> {
        info!("Starting HubSpot sync run");
        let mut accounts = store.load_accounts().await?;
        info!(accounts = accounts.len(), "Loaded accounts");

        for account in &mut accounts {
            self.process_account(account, store).await;
        }

        info!("Sync run complete");
        Ok(())
    }

    async fn process_account(&self, account: &mut Account, store: &dyn AccountStore) {
        info!(hub_id = %account.hub_id, "Start processing account");

        // Proactive refresh; on failure the cached token is used as-is and
        // the retry layer refreshes reactively.
        match self.client.refresh_access_token(&account.refresh_token).await {
            Ok(token) => {
                account.apply_token(token.access_token, token.expires_in, Utc::now());
                counter!("token_refresh_success_total").increment(1);
            }
            Err(err) => {
                counter!("token_refresh_failure_total").increment(1);
                warn!(
                    hub_id = %account.hub_id,
                    operation = "refresh_access_token",
                    error = %err,
                    "Proactive token refresh failed"
                );
            }
        }

        let mut queue = ActionQueue::new(
            Arc::clone(&self.sink),
            self.config.sync.batch_flush_threshold,
        );

        if let Err(err) = self.sync_contacts(account, &mut queue).await {
            counter!("sync_pass_failures_total", "entity" => "contacts").increment(1);
            error!(
                hub_id = %account.hub_id,
                operation = "sync_contacts",
                error = %err,
                "Contact pass failed"
            );
        }

        if let Err(err) = self.sync_companies(account, &mut queue).await {
            counter!("sync_pass_failures_total", "entity" => "companies").increment(1);
            error!(
                hub_id = %account.hub_id,
                operation = "sync_companies",
                error = %err,
                "Company pass failed"
            );
        }

        if let Err(err) = self.sync_meetings(account, &mut queue).await {
            counter!("sync_pass_failures_total", "entity" => "meetings").increment(1);
            error!(
                hub_id = %account.hub_id,
                operation = "sync_meetings",
                error = %err,
                "Meeting pass failed"
            );
        }

        if let Err(err) = queue.drain().await {
            error!(
                hub_id = %account.hub_id,
                operation = "drain_queue",
                error = %err,
                "Queue drain failed"
            );
        }

        if self.config.persistence_enabled
            && let Err(err) = store.save_account(account).await
        {
            warn!(
                hub_id = %account.hub_id,
                error = %err,
                "Failed to persist account state"
            );
        }

        info!(hub_id = %account.hub_id, "Finished processing account");
    }

    /// Fetch one search page through the bounded-retry wrapper.
    async fn fetch_page(
        &self,
        account: &mut Account,
        kind: EntityKind,
        request: &SearchRequest,
    ) -> Result<SearchResponse, SyncError> {
        let client = self.client.clone();
        retry::call_with_refresh(&self.client, account, self.config.retry, move |token| {
            let client = client.clone();
            let request = request.clone();
            async move { client.search(&token, kind.object_type(), &request).await }
        })
        .await
    }

    async fn sync_contacts(
        &self,
        account: &mut Account,
        queue: &mut ActionQueue,
    ) -> Result<(), SyncError> {
        let pass_started = Utc::now();
        let watermark = account.last_pulled_dates.contacts;
        let mut window = SyncWindow::new(watermark, pass_started);
        let mut emitted: u64 = 0;

        loop {
            let request = window.search_request(EntityKind::Contacts, &self.config.sync);
            let response = self.fetch_page(account, EntityKind::Contacts, &request).await?;
            let next_after = response.next_after();
            let records = response.results;
            debug!(hub_id = %account.hub_id, count = records.len(), "Fetched contact batch");

            let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
            let companies = enrich::fetch_associations(
                &self.client,
                &account.access_token,
                "contacts",
                "companies",
                &ids,
            )
            .await;

            for record in &records {
                // Contacts without an email cannot be identified downstream.
                let Some(email) = record.prop_str("email") else {
                    continue;
                };

                let is_created = watermark.is_none_or(|w| record.created_at > w);
                let (name, instant) = if is_created {
                    (ActionName::ContactCreated, record.created_at)
                } else {
                    (ActionName::ContactUpdated, record.updated_at)
                };

                let contact_name = format!(
                    "{} {}",
                    record.prop_str("firstname").unwrap_or(""),
                    record.prop_str("lastname").unwrap_or("")
                )
                .trim()
                .to_string();

                let user_properties = json!({
                    "company_id": companies.get(&record.id).cloned().flatten(),
                    "contact_name": contact_name,
                    "contact_title": record.prop_str("jobtitle"),
                    "contact_source": record.prop_str("hs_analytics_source"),
                    "contact_status": record.prop_str("hs_lead_status"),
                    "contact_score": record.prop_i64_or_zero("hubspotscore"),
                });
                let user_properties =
                    filter_null_values(user_properties.as_object().cloned().unwrap_or_default());

                queue.push(
                    Action::new(name, instant)
                        .with_identity(email)
                        .with_payload("userProperties", Value::Object(user_properties)),
                );
                emitted += 1;
            }

            if window
                .advance(&records, next_after, self.config.sync.max_offset_depth)
                .is_done()
            {
                break;
            }
        }

        counter!("sync_actions_emitted_total", "entity" => "contacts").increment(emitted);
        account.last_pulled_dates.contacts = Some(pass_started);
        info!(hub_id = %account.hub_id, emitted, "Contact pass complete");
        Ok(())
    }

    async fn sync_companies(
        &self,
        account: &mut Account,
        queue: &mut ActionQueue,
    ) -> Result<(), SyncError> {
        let pass_started = Utc::now();
        let watermark = account.last_pulled_dates.companies;
        let mut window = SyncWindow::new(watermark, pass_started);
        let mut emitted: u64 = 0;

        loop {
            let request = window.search_request(EntityKind::Companies, &self.config.sync);
            let response = self
                .fetch_page(account, EntityKind::Companies, &request)
                .await?;
            let next_after = response.next_after();
            let records = response.results;
            debug!(hub_id = %account.hub_id, count = records.len(), "Fetched company batch");

            for record in &records {
                let is_created = watermark.is_none_or(|w| record.created_at > w);
                let (name, instant) = if is_created {
                    (ActionName::CompanyCreated, record.created_at)
                } else {
                    (ActionName::CompanyUpdated, record.updated_at)
                };

                // Company action dates carry a 2-second negative skew on the
                // ingest side.
                let action_date = instant - Duration::milliseconds(2000);

                queue.push(Action::new(name, action_date).with_payload(
                    "companyProperties",
                    json!({
                        "company_id": record.id,
                        "company_domain": record.prop_str("domain"),
                        "company_industry": record.prop_str("industry"),
                    }),
                ));
                emitted += 1;
            }

            if window
                .advance(&records, next_after, self.config.sync.max_offset_depth)
                .is_done()
            {
                break;
            }
        }

        counter!("sync_actions_emitted_total", "entity" => "companies").increment(emitted);
        account.last_pulled_dates.companies = Some(pass_started);
        info!(hub_id = %account.hub_id, emitted, "Company pass complete");
        Ok(())
    }

    async fn sync_meetings(
        &self,
        account: &mut Account,
        queue: &mut ActionQueue,
    ) -> Result<(), SyncError> {
        let pass_started = Utc::now();
        let watermark = account.last_pulled_dates.meetings;
        // Meetings backfill from a fixed horizon instead of an open window.
        let lower_bound = watermark
            .unwrap_or_else(|| pass_started - Duration::days(self.config.sync.meetings_backfill_days));
        let mut window = SyncWindow::new(Some(lower_bound), pass_started);
        let mut emitted: u64 = 0;

        loop {
            let request = window.search_request(EntityKind::Meetings, &self.config.sync);
            let response = self
                .fetch_page(account, EntityKind::Meetings, &request)
                .await?;
            let next_after = response.next_after();
            let records = response.results;
            debug!(hub_id = %account.hub_id, count = records.len(), "Fetched meeting batch");

            let meeting_ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
            let contacts = enrich::fetch_associations(
                &self.client,
                &account.access_token,
                "meetings",
                "contacts",
                &meeting_ids,
            )
            .await;

            let contact_ids: Vec<String> = contacts.values().flatten().cloned().collect();
            let emails =
                enrich::fetch_contact_emails(&self.client, &account.access_token, &contact_ids)
                    .await;

            for record in &records {
                let email = contacts
                    .get(&record.id)
                    .and_then(|c| c.as_ref())
                    .and_then(|contact_id| emails.get(contact_id))
                    .cloned();

                let age = record.updated_at - record.created_at;
                let is_created =
                    age.num_milliseconds().abs() <= self.config.sync.created_tolerance_ms;
                let (name, instant) = if is_created {
                    (ActionName::MeetingCreated, record.created_at)
                } else {
                    (ActionName::MeetingUpdated, record.updated_at)
                };

                queue.push(self.meeting_action(name, instant, record, email));
                emitted += 1;
            }

            if window
                .advance(&records, next_after, self.config.sync.max_offset_depth)
                .is_done()
            {
                break;
            }
        }

        counter!("sync_actions_emitted_total", "entity" => "meetings").increment(emitted);
        account.last_pulled_dates.meetings = Some(pass_started);
        info!(hub_id = %account.hub_id, emitted, "Meeting pass complete");
        Ok(())
    }

    fn meeting_action(
        &self,
        name: ActionName,
        instant: DateTime<Utc>,
        record: &RawRecord,
        email: Option<String>,
    ) -> Action {
        Action::new(name, instant)
            .with_payload("meeting_id", json!(record.id))
            .with_payload(
                "meeting_title",
                json!(record.prop_str("hs_meeting_title").unwrap_or("Unknown Title")),
            )
            .with_payload(
                "meeting_start_time",
                json!(record.prop_str("hs_meeting_start_time")),
            )
            .with_payload(
                "meeting_end_time",
                json!(record.prop_str("hs_meeting_end_time")),
            )
            .with_payload(
                "meeting_outcome",
                json!(record.prop_str("hs_meeting_outcome").unwrap_or("No Outcome")),
            )
            .with_payload("associated_contact_email", json!(email))
    }
}
