//! Incremental sync engine.
//!
//! The orchestrator in [`engine`] drives, per account, a sequential pass
//! over each entity type. Each pass walks a growing modification-time
//! window ([`window`]), fetches pages through the bounded-retry wrapper
//! ([`retry`]), resolves cross-entity associations ([`enrich`]), and hands
//! the resulting actions to the batching queue ([`queue`]).

pub mod engine;
pub mod enrich;
pub mod queue;
pub mod retry;
pub mod window;

pub use engine::SyncEngine;
pub use queue::ActionQueue;
pub use window::{EntityKind, PageOutcome, SyncWindow};
