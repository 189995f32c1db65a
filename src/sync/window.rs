//! Windowed pagination over modification time.
//!
//! A pass scans `[lower_bound, upper_bound]` sorted ascending by the
//! entity's last-modified property, 100 records per page (50 for
//! meetings), advancing an offset cursor. The remote API rejects offsets
//! past a hard depth cap, so when the next cursor would reach it the
//! window re-anchors: the lower bound jumps to the last record's modified
//! instant and the cursor resets. Up to one page of boundary records may
//! be reprocessed; the sink tolerates duplicate "Updated" actions.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::config::SyncConfig;
use crate::hubspot::types::{Filter, FilterGroup, SearchRequest, Sort};
use crate::models::RawRecord;

/// Entity types the engine syncs. They differ only in endpoint path,
/// filter property, wire timestamp format, and requested attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Companies,
    Contacts,
    Meetings,
}

impl EntityKind {
    pub fn object_type(&self) -> &'static str {
        match self {
            Self::Companies => "companies",
            Self::Contacts => "contacts",
            Self::Meetings => "meetings",
        }
    }

    /// Last-modified property used for both filtering and sorting.
    pub fn modified_property(&self) -> &'static str {
        match self {
            Self::Contacts => "lastmodifieddate",
            Self::Companies | Self::Meetings => "hs_lastmodifieddate",
        }
    }

    pub fn properties(&self) -> &'static [&'static str] {
        match self {
            Self::Companies => &[
                "name",
                "domain",
                "country",
                "industry",
                "description",
                "annualrevenue",
                "numberofemployees",
                "hs_lead_status",
            ],
            Self::Contacts => &[
                "firstname",
                "lastname",
                "jobtitle",
                "email",
                "hubspotscore",
                "hs_lead_status",
                "hs_analytics_source",
                "hs_latest_source",
            ],
            Self::Meetings => &[
                "hs_meeting_title",
                "hs_meeting_start_time",
                "hs_meeting_end_time",
                "hs_meeting_outcome",
                "hs_createdate",
                "hs_lastmodifieddate",
            ],
        }
    }

    pub fn page_limit(&self, sync: &SyncConfig) -> u32 {
        let limit = match self {
            Self::Meetings => sync.meetings_page_limit,
            _ => sync.page_limit,
        };
        // API maximum is 100 regardless of configuration.
        limit.min(100)
    }

    /// Filter value encoding. Meetings take RFC 3339, the rest take epoch
    /// milliseconds.
    pub fn filter_value(&self, instant: DateTime<Utc>) -> String {
        match self {
            Self::Meetings => instant.to_rfc3339_opts(SecondsFormat::Millis, true),
            _ => instant.timestamp_millis().to_string(),
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.object_type())
    }
}

/// In-flight pagination state for one entity-type pass.
#[derive(Debug, Clone)]
pub struct SyncWindow {
    /// `None` means full backfill: the search goes out unfiltered.
    pub lower_bound: Option<DateTime<Utc>>,
    pub upper_bound: DateTime<Utc>,
    pub after: Option<u64>,
    /// Set once the window has re-anchored past the offset depth cap.
    pub bucketed: bool,
}

/// What the paginator should do after consuming a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// No further cursor; the pass is complete.
    Done,
    /// Cursor advanced within the current window.
    Continue,
    /// Window re-anchored to escape the offset depth cap.
    Bucketed,
}

impl PageOutcome {
    pub fn is_done(self) -> bool {
        matches!(self, Self::Done)
    }
}

impl SyncWindow {
    pub fn new(lower_bound: Option<DateTime<Utc>>, upper_bound: DateTime<Utc>) -> Self {
        Self {
            lower_bound,
            upper_bound,
            after: None,
            bucketed: false,
        }
    }

    /// Build the search request for the current scan position.
    pub fn search_request(&self, kind: EntityKind, sync: &SyncConfig) -> SearchRequest {
        let property = kind.modified_property();
        let filter_groups = match self.lower_bound {
            Some(lower) => vec![FilterGroup {
                filters: vec![
                    Filter::gte(property, kind.filter_value(lower)),
                    Filter::lte(property, kind.filter_value(self.upper_bound)),
                ],
            }],
            None => Vec::new(),
        };

        SearchRequest {
            filter_groups,
            sorts: vec![Sort::ascending(property)],
            properties: kind.properties().iter().map(|p| p.to_string()).collect(),
            limit: kind.page_limit(sync),
            after: self.after,
        }
    }

    /// Advance past a fetched page given the response's next cursor.
    pub fn advance(
        &mut self,
        page: &[RawRecord],
        next_after: Option<u64>,
        max_offset_depth: u64,
    ) -> PageOutcome {
        match next_after {
            None => PageOutcome::Done,
            Some(next) if next >= max_offset_depth => {
                if let Some(last) = page.last() {
                    self.lower_bound = Some(last.updated_at);
                }
                self.after = None;
                self.bucketed = true;
                PageOutcome::Bucketed
            }
            Some(next) => {
                self.after = Some(next);
                PageOutcome::Continue
            }
        }
    }
}
