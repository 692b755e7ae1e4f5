// src/publish/amqp.rs
//! Topic-exchange broker transport (RabbitMQ over AMQP 0-9-1).

use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions, ExchangeDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use tokio::sync::Mutex;

use super::{encode, QueuePublisher};
use crate::config::BrokerSettings;
use crate::error::PublishError;
use crate::record::SentimentRecord;

const TRANSPORT: &str = "rabbitmq";
const PERSISTENT: u8 = 2;

struct Session {
    // the channel dies with its connection
    _conn: Connection,
    channel: Channel,
}

/// Lazily connects on first publish and reconnects after any failure.
/// Publishes are serialized, so one batch is never interleaved with another.
pub struct BrokerPublisher {
    settings: BrokerSettings,
    session: Mutex<Option<Session>>,
}

impl BrokerPublisher {
    pub fn new(settings: BrokerSettings) -> Self {
        Self {
            settings,
            session: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &BrokerSettings {
        &self.settings
    }

    async fn connect(&self) -> Result<Session, lapin::Error> {
        let conn = Connection::connect(&self.settings.uri(), ConnectionProperties::default()).await?;
        let channel = conn.create_channel().await?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await?;
        channel
            .exchange_declare(
                &self.settings.exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;
        tracing::info!(
            transport = TRANSPORT,
            host = %self.settings.host,
            port = self.settings.port,
            vhost = %self.settings.vhost,
            exchange = %self.settings.exchange,
            "broker connected"
        );
        Ok(Session {
            _conn: conn,
            channel,
        })
    }

    async fn send_one(&self, channel: &Channel, payload: &[u8]) -> Result<(), String> {
        let props = BasicProperties::default()
            .with_delivery_mode(PERSISTENT)
            .with_content_type("application/json".into());
        let confirm = channel
            .basic_publish(
                &self.settings.exchange,
                &self.settings.routing_key,
                BasicPublishOptions::default(),
                payload,
                props,
            )
            .await
            .map_err(|e| e.to_string())?
            .await
            .map_err(|e| e.to_string())?;
        if confirm.is_nack() {
            return Err("broker nacked message".to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl QueuePublisher for BrokerPublisher {
    async fn publish(&self, batch: &[SentimentRecord]) -> Result<(), PublishError> {
        let payloads = batch.iter().map(encode).collect::<Result<Vec<_>, _>>()?;

        let mut guard = self.session.lock().await;
        if guard
            .as_ref()
            .map_or(true, |s| !s.channel.status().connected())
        {
            let session = self.connect().await.map_err(|e| PublishError::Connect {
                transport: TRANSPORT,
                message: e.to_string(),
            })?;
            *guard = Some(session);
        }
        let Some(session) = guard.as_ref() else {
            return Err(PublishError::Connect {
                transport: TRANSPORT,
                message: "no session".into(),
            });
        };

        for (sent, payload) in payloads.iter().enumerate() {
            if let Err(e) = self.send_one(&session.channel, payload).await {
                // drop the session; the next batch reconnects
                *guard = None;
                return Err(PublishError::Send {
                    transport: TRANSPORT,
                    sent,
                    message: e,
                });
            }
        }
        tracing::debug!(transport = TRANSPORT, count = payloads.len(), "batch confirmed");
        Ok(())
    }

    fn transport(&self) -> &'static str {
        TRANSPORT
    }
}
