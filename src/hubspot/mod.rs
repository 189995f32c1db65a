//! HubSpot v3 API client
//!
//! Thin typed wrapper over the search, OAuth token, association batch-read,
//! and object batch-read endpoints. Retry and windowing policy live in
//! [`crate::sync`]; this layer only speaks the wire protocol.

pub mod client;
pub mod types;

pub use client::HubSpotClient;
pub use types::{
    AssociationBatchResponse, AssociationResult, Filter, FilterGroup, ObjectRef, Paging,
    PagingNext, SearchRequest, SearchResponse, Sort, TokenResponse,
};
