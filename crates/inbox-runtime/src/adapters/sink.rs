//! Message sink that logs every admitted message.

use async_trait::async_trait;
use gi_03_group_processor::{Delivery, MessageSink, SinkError};
use shared_types::GroupPlaintext;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Logs deliveries at `info`. Idempotent: it keeps no per-job state.
#[derive(Debug, Default)]
pub struct LoggingSink {
    delivered: AtomicU64,
    batches: AtomicU64,
}

impl LoggingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages delivered so far.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Batches delivered so far.
    pub fn batches(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl MessageSink for LoggingSink {
    async fn deliver_batch(&self, deliveries: Vec<Delivery>) -> Result<(), SinkError> {
        for delivery in &deliveries {
            let body = if delivery.discard_visible_content {
                None
            } else {
                GroupPlaintext::decode(&delivery.plaintext)
                    .ok()
                    .map(|frame| String::from_utf8_lossy(&frame.body).into_owned())
            };
            info!(
                group = %delivery.group_id,
                job_id = delivery.job_id.0,
                sender = ?delivery.envelope.sender,
                server_timestamp = delivery.server_timestamp,
                hidden = delivery.discard_visible_content,
                body = body.as_deref().unwrap_or(""),
                "[inbox] Message delivered"
            );
        }
        self.delivered
            .fetch_add(deliveries.len() as u64, Ordering::Relaxed);
        self.batches.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
