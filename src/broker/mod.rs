//! Broker adapter (C6): one consumed queue, a direct task exchange for
//! stage fan-out, and a topic notification exchange for user-visible events.

pub mod message;

use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions,
    ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, Consumer, ExchangeKind};
use thiserror::Error;

pub use message::{AfterEnvelope, BeforeEnvelope, NotificationPayload, RoutingKey};

use crate::config::BrokerConfig;

pub const TASK_EXCHANGE: &str = "insight";
pub const NOTIFICATION_EXCHANGE: &str = "user";

const ROUTING_KEYS: &[RoutingKey] = &[
    RoutingKey::IngestInode,
    RoutingKey::EmbedInode,
    RoutingKey::IndexInode,
    RoutingKey::MoveInode,
    RoutingKey::ShareInode,
    RoutingKey::DeleteInode,
];

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error(transparent)]
    Lapin(#[from] lapin::Error),
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

/// A single delivery pulled off the consumed queue, with the fields the
/// dispatcher needs to decode and acknowledge it.
pub struct Delivery {
    pub routing_key: String,
    pub payload: Vec<u8>,
    inner: lapin::message::Delivery,
}

pub struct BrokerClient {
    #[allow(dead_code)]
    connection: Connection,
    channel: Channel,
    queue: String,
}

impl BrokerClient {
    pub async fn connect(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let scheme = if config.ssl { "amqps" } else { "amqp" };
        let uri = format!(
            "{scheme}://{}:{}@{}/%2f",
            config.user, config.password, config.host
        );

        let connection =
            Connection::connect(&uri, ConnectionProperties::default().with_tokio()).await?;
        let channel = connection.create_channel().await?;

        // prefetch = 1: this channel both consumes and publishes follow-up
        // events, and a slow handler must not starve those publishes behind
        // a backlog of prefetched, still-unacked deliveries (SPEC_FULL 5).
        channel
            .basic_qos(1, lapin::options::BasicQosOptions::default())
            .await?;

        let client = Self {
            connection,
            channel,
            queue: config.queue.clone(),
        };
        client.declare_topology().await?;
        Ok(client)
    }

    async fn declare_topology(&self) -> Result<(), BrokerError> {
        self.channel
            .exchange_declare(
                TASK_EXCHANGE,
                ExchangeKind::Direct,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        self.channel
            .exchange_declare(
                NOTIFICATION_EXCHANGE,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        self.channel
            .queue_declare(
                &self.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        for key in ROUTING_KEYS {
            self.channel
                .queue_bind(
                    &self.queue,
                    TASK_EXCHANGE,
                    key.as_str(),
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await?;
        }

        Ok(())
    }

    pub async fn consume(&self) -> Result<Consumer, BrokerError> {
        let consumer = self
            .channel
            .basic_consume(
                &self.queue,
                "insight-worker",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;
        Ok(consumer)
    }

    pub async fn publish_task(&self, key: RoutingKey, body: &[u8]) -> Result<(), BrokerError> {
        self.channel
            .basic_publish(
                TASK_EXCHANGE,
                key.as_str(),
                BasicPublishOptions::default(),
                body,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await?
            .await?;
        Ok(())
    }

    pub async fn publish_notification(
        &self,
        routing_key: &str,
        notification: &NotificationPayload,
    ) -> Result<(), BrokerError> {
        let body = serde_json::to_vec(notification)?;
        self.channel
            .basic_publish(
                NOTIFICATION_EXCHANGE,
                routing_key,
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await?
            .await?;
        Ok(())
    }

    pub async fn ack(&self, delivery: &Delivery) -> Result<(), BrokerError> {
        delivery
            .inner
            .ack(BasicAckOptions::default())
            .await
            .map_err(BrokerError::from)
    }

    /// Reject without requeue (taxonomy: every unhandled handler error is a
    /// permanent reject; the broker redelivers only on worker restart via
    /// at-least-once queue semantics, not via this nack).
    pub async fn reject(&self, delivery: &Delivery) -> Result<(), BrokerError> {
        delivery
            .inner
            .nack(BasicNackOptions {
                requeue: false,
                ..Default::default()
            })
            .await
            .map_err(BrokerError::from)
    }
}

/// Adapt a raw consumer stream item into our `Delivery` type.
pub async fn next_delivery(consumer: &mut Consumer) -> Option<Result<Delivery, BrokerError>> {
    let item = consumer.next().await?;
    Some(item.map_err(BrokerError::from).map(|inner| Delivery {
        routing_key: inner.routing_key.to_string(),
        payload: inner.data.clone(),
        inner,
    }))
}
