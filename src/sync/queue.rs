//! Action batching queue.
//!
//! Producers append actions synchronously as pages are processed. When the
//! accumulator grows past the flush threshold it is snapshotted, cleared,
//! and dispatched to the sink as one fire-and-forget task. `drain` is the
//! completion gate: it awaits all outstanding dispatches and then flushes
//! whatever remains, so no action below the threshold is ever lost.

use std::sync::Arc;

use metrics::counter;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::error::SyncError;
use crate::models::Action;
use crate::sink::ActionSink;

pub struct ActionQueue {
    sink: Arc<dyn ActionSink>,
    buffer: Vec<Action>,
    flush_threshold: usize,
    in_flight: JoinSet<()>,
}

impl ActionQueue {
    pub fn new(sink: Arc<dyn ActionSink>, flush_threshold: usize) -> Self {
        Self {
            sink,
            buffer: Vec::new(),
            flush_threshold,
            in_flight: JoinSet::new(),
        }
    }

    /// Append one action; dispatches a batch when the accumulator exceeds
    /// the threshold. Never blocks on sink I/O.
    pub fn push(&mut self, action: Action) {
        self.buffer.push(action);

        if self.buffer.len() > self.flush_threshold {
            let batch = std::mem::take(&mut self.buffer);
            let sink = Arc::clone(&self.sink);
            info!(count = batch.len(), "Flushing action batch");
            counter!("action_batches_flushed_total").increment(1);

            self.in_flight.spawn(async move {
                if let Err(err) = sink.submit(batch).await {
                    error!(error = %err, "Sink rejected action batch");
                }
            });
        }
    }

    /// Actions accumulated but not yet dispatched.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Await outstanding dispatches, then flush the tail batch.
    pub async fn drain(&mut self) -> Result<(), SyncError> {
        while let Some(joined) = self.in_flight.join_next().await {
            if let Err(err) = joined {
                error!(error = %err, "Batch dispatch task failed");
            }
        }

        if !self.buffer.is_empty() {
            let batch = std::mem::take(&mut self.buffer);
            info!(count = batch.len(), "Flushing tail action batch");
            counter!("action_batches_flushed_total").increment(1);
            self.sink.submit(batch).await?;
        }

        Ok(())
    }
}
