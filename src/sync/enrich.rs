//! Cross-entity association enrichment.
//!
//! Batch lookups resolving a page of primary entities to at most one
//! related entity id each, plus a second hop resolving contact ids to
//! email addresses. Both lookups degrade instead of failing the pass: the
//! association map falls back to all-`None` and the email map to empty, so
//! primary entities are still emitted without enrichment.

use std::collections::HashMap;

use metrics::counter;
use tracing::{debug, warn};

use crate::error::SyncError;
use crate::hubspot::HubSpotClient;

/// Resolve associations for every id in `ids`. The returned map always has
/// exactly one entry per input id; unresolved entries are `None`.
pub async fn fetch_associations(
    client: &HubSpotClient,
    access_token: &str,
    from_type: &str,
    to_type: &str,
    ids: &[String],
) -> HashMap<String, Option<String>> {
    let mut map: HashMap<String, Option<String>> =
        ids.iter().map(|id| (id.clone(), None)).collect();
    if ids.is_empty() {
        return map;
    }

    match client
        .read_associations(access_token, from_type, to_type, ids)
        .await
    {
        Ok(response) => {
            for row in &response.results {
                if let (Some(from), Some(first)) = (&row.from, row.to.first())
                    && let Some(entry) = map.get_mut(&from.id)
                {
                    *entry = Some(first.id.clone());
                }
            }
            debug!(
                from_type,
                to_type,
                requested = ids.len(),
                resolved = map.values().filter(|v| v.is_some()).count(),
                "Resolved association batch"
            );
        }
        Err(err) => {
            let err = SyncError::enrichment(err.to_string());
            counter!("enrichment_failures_total").increment(1);
            warn!(
                from_type,
                to_type,
                error = %err,
                "Association batch read failed, emitting without enrichment"
            );
        }
    }

    map
}

/// Resolve email addresses for a set of contact ids. Input ids are
/// deduplicated before the batch read. Ids with no resolvable email are
/// absent from the result; callers look them up with a null default.
pub async fn fetch_contact_emails(
    client: &HubSpotClient,
    access_token: &str,
    ids: &[String],
) -> HashMap<String, String> {
    let mut unique: Vec<String> = ids.to_vec();
    unique.sort();
    unique.dedup();
    if unique.is_empty() {
        return HashMap::new();
    }

    match client
        .batch_read(access_token, "contacts", &["email"], &unique)
        .await
    {
        Ok(response) => response
            .results
            .into_iter()
            .filter_map(|record| {
                let email = record.prop_str("email").map(str::to_string)?;
                Some((record.id, email))
            })
            .collect(),
        Err(err) => {
            let err = SyncError::enrichment(err.to_string());
            counter!("enrichment_failures_total").increment(1);
            warn!(error = %err, "Contact email batch read failed");
            HashMap::new()
        }
    }
}
