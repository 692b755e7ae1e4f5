// src/publish/mod.rs
//! Batch publication over the configured queue transport.
//!
//! Every record becomes its own JSON message, sent in batch order. There is no
//! retry and no local buffer: a transport failure is returned to the caller,
//! and whatever was not sent is lost.

pub mod amqp;
pub mod sqs;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::QueueSettings;
use crate::error::PublishError;
use crate::record::SentimentRecord;

pub use amqp::BrokerPublisher;
pub use sqs::ManagedQueuePublisher;

#[async_trait]
pub trait QueuePublisher: Send + Sync {
    /// Emit `batch` in order, one message per record.
    async fn publish(&self, batch: &[SentimentRecord]) -> Result<(), PublishError>;

    /// Short transport name for logs and errors.
    fn transport(&self) -> &'static str;
}

/// Build the publisher selected by `QUEUE_TYPE`. Safe to share across poller tasks.
pub async fn build_publisher(settings: QueueSettings) -> Arc<dyn QueuePublisher> {
    match settings {
        QueueSettings::Broker(b) => Arc::new(BrokerPublisher::new(b)),
        QueueSettings::Managed(m) => Arc::new(ManagedQueuePublisher::from_env(m).await),
    }
}

pub(crate) fn encode(record: &SentimentRecord) -> Result<Vec<u8>, PublishError> {
    Ok(record.to_json()?)
}

// --- Test helper ---
/// Keeps every published batch in memory. Can be switched to fail.
#[derive(Default)]
pub struct RecordingPublisher {
    batches: Mutex<Vec<Vec<SentimentRecord>>>,
    fail_with: Mutex<Option<String>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent publish fails with a connect error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        let p = Self::default();
        p.set_failure(Some(message.into()));
        p
    }

    pub fn set_failure(&self, message: Option<String>) {
        *self.fail_with.lock().unwrap_or_else(|e| e.into_inner()) = message;
    }

    pub fn batches(&self) -> Vec<Vec<SentimentRecord>> {
        self.batches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn publish_count(&self) -> usize {
        self.batches.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl QueuePublisher for RecordingPublisher {
    async fn publish(&self, batch: &[SentimentRecord]) -> Result<(), PublishError> {
        let failure = self
            .fail_with
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(message) = failure {
            return Err(PublishError::Connect {
                transport: self.transport(),
                message,
            });
        }
        self.batches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(batch.to_vec());
        Ok(())
    }

    fn transport(&self) -> &'static str {
        "recording"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Source, Symbol};

    fn rec(sym: &str) -> SentimentRecord {
        SentimentRecord::builder(&Symbol::parse(sym).unwrap(), Source::Finviz).build()
    }

    #[tokio::test]
    async fn recording_publisher_keeps_batches_in_order() {
        let p = RecordingPublisher::new();
        p.publish(&[rec("AAPL"), rec("MSFT")]).await.unwrap();
        p.publish(&[rec("TSLA")]).await.unwrap();
        let batches = p.batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0][1].symbol().as_str(), "MSFT");
    }

    #[tokio::test]
    async fn failing_recorder_reports_connect_error() {
        let p = RecordingPublisher::failing("broker down");
        let err = p.publish(&[rec("AAPL")]).await.unwrap_err();
        assert!(matches!(err, PublishError::Connect { .. }));
        assert_eq!(p.publish_count(), 0);
    }

    #[test]
    fn encoded_record_is_the_wire_envelope() {
        let bytes = encode(&rec("AAPL")).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["symbol"], "AAPL");
        assert_eq!(v["source"], "Finviz");
        assert_eq!(v["data"]["platform"], "finviz");
    }
}
