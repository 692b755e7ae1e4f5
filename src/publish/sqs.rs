// src/publish/sqs.rs
//! Managed-queue transport (Amazon SQS).

use async_trait::async_trait;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_sqs::config::retry::RetryConfig;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::Client;

use super::{encode, QueuePublisher};
use crate::config::ManagedQueueSettings;
use crate::error::PublishError;
use crate::record::SentimentRecord;

const TRANSPORT: &str = "sqs";

/// One `SendMessage` per record, sequential so the queue sees batch order.
#[derive(Clone)]
pub struct ManagedQueuePublisher {
    client: Client,
    queue_url: String,
}

impl ManagedQueuePublisher {
    /// Region and credentials from the standard AWS provider chain.
    pub async fn from_env(settings: ManagedQueueSettings) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::with_client(Client::from_conf(client_config(&shared)), settings)
    }

    pub fn with_client(client: Client, settings: ManagedQueueSettings) -> Self {
        Self {
            client,
            queue_url: settings.queue_url,
        }
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

/// SDK-level retries are off: a failed send surfaces on the first error, as it
/// does on the broker transport.
fn client_config(shared: &SdkConfig) -> aws_sdk_sqs::Config {
    aws_sdk_sqs::config::Builder::from(shared)
        .retry_config(RetryConfig::disabled())
        .build()
}

#[async_trait]
impl QueuePublisher for ManagedQueuePublisher {
    async fn publish(&self, batch: &[SentimentRecord]) -> Result<(), PublishError> {
        for (sent, record) in batch.iter().enumerate() {
            let body = String::from_utf8(encode(record)?).map_err(|e| PublishError::Send {
                transport: TRANSPORT,
                sent,
                message: e.to_string(),
            })?;
            self.client
                .send_message()
                .queue_url(&self.queue_url)
                .message_body(body)
                .send()
                .await
                .map_err(|e| PublishError::Send {
                    transport: TRANSPORT,
                    sent,
                    message: DisplayErrorContext(&e).to_string(),
                })?;
        }
        tracing::debug!(transport = TRANSPORT, count = batch.len(), "batch sent");
        Ok(())
    }

    fn transport(&self) -> &'static str {
        TRANSPORT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_sqs::config::{Credentials, Region};

    use crate::record::{Source, Symbol};

    fn offline_client() -> Client {
        let conf = aws_sdk_sqs::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("test", "test", None, None, "test"))
            .endpoint_url("http://127.0.0.1:1")
            .retry_config(RetryConfig::disabled())
            .build();
        Client::from_conf(conf)
    }

    #[tokio::test]
    async fn unreachable_queue_reports_send_error_at_first_record() {
        let p = ManagedQueuePublisher::with_client(
            offline_client(),
            ManagedQueueSettings {
                queue_url: "http://127.0.0.1:1/000000000000/stock-data".into(),
            },
        );
        let sym = Symbol::parse("AAPL").unwrap();
        let batch = vec![
            SentimentRecord::builder(&sym, Source::Finviz).build(),
            SentimentRecord::builder(&sym, Source::Finviz).build(),
        ];
        let err = p.publish(&batch).await.unwrap_err();
        assert!(
            matches!(err, PublishError::Send { transport: "sqs", sent: 0, .. }),
            "{err}"
        );
    }

    #[test]
    fn production_client_makes_a_single_attempt() {
        let shared = SdkConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("eu-west-1"))
            .build();
        let conf = client_config(&shared);
        assert_eq!(conf.retry_config().map(|r| r.max_attempts()), Some(1));
        assert_eq!(conf.region(), Some(&Region::new("eu-west-1")));
    }

    #[tokio::test]
    async fn empty_batch_sends_nothing() {
        let p = ManagedQueuePublisher::with_client(
            offline_client(),
            ManagedQueueSettings {
                queue_url: "http://127.0.0.1:1/q".into(),
            },
        );
        p.publish(&[]).await.unwrap();
    }
}
