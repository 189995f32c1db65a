//! # HubSync Library
//!
//! This library provides the core functionality for the HubSync worker:
//! incremental synchronization of HubSpot CRM entities (companies,
//! contacts, meetings) into a downstream analytics sink as timestamped
//! action events.

pub mod config;
pub mod error;
pub mod hubspot;
pub mod logging;
pub mod models;
pub mod sink;
pub mod store;
pub mod sync;
