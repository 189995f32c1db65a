//! Analytics sink boundary.
//!
//! The engine hands over batches of actions and consumes no feedback beyond
//! an error for logging. Durability is the sink's own concern.

use async_trait::async_trait;
use tracing::info;

use crate::error::SyncError;
use crate::models::Action;

/// Downstream consumer of action batches.
#[async_trait]
pub trait ActionSink: Send + Sync {
    async fn submit(&self, actions: Vec<Action>) -> Result<(), SyncError>;
}

/// Default sink: logs batch sizes and drops the payload. Stands in for the
/// analytics ingest endpoint in local profiles.
#[derive(Debug, Default)]
pub struct LoggingSink;

#[async_trait]
impl ActionSink for LoggingSink {
    async fn submit(&self, actions: Vec<Action>) -> Result<(), SyncError> {
        info!(count = actions.len(), "Dispatching action batch to sink");
        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    //! In-memory sink used across the engine's tests.

    use std::sync::Mutex;

    use super::*;

    /// Records every submitted batch for assertions.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        batches: Mutex<Vec<Vec<Action>>>,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn batches(&self) -> Vec<Vec<Action>> {
            self.batches.lock().unwrap().clone()
        }

        pub fn total_actions(&self) -> usize {
            self.batches.lock().unwrap().iter().map(Vec::len).sum()
        }
    }

    #[async_trait]
    impl ActionSink for RecordingSink {
        async fn submit(&self, actions: Vec<Action>) -> Result<(), SyncError> {
            self.batches.lock().unwrap().push(actions);
            Ok(())
        }
    }
}
