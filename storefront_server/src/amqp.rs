//! AMQP transport for the order engine's message bus.
//!
//! Topics map to queues on the broker's default exchange, one queue per topic, declared on first use. The bus
//! holds a single lazily-established connection: the first publish after a broker outage re-dials, and any
//! channel error tears the cached connection down so the next call starts fresh. Subscriptions get their own
//! consumer stream and surface broker failures to the listener loops, which own the retry policy.
use std::sync::Arc;

use futures_util::StreamExt;
use lapin::{
    options::{BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, QueueDeclareOptions},
    types::FieldTable,
    BasicProperties,
    Channel,
    Connection,
    ConnectionProperties,
};
use log::*;
use sf_common::Secret;
use storefront_engine::bus::{MessageBus, Subscription, TransportError};
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AmqpBus {
    url: Secret<String>,
    // The connection is kept alongside the channel; dropping it closes every channel it spawned.
    link: Arc<Mutex<Option<(Connection, Channel)>>>,
}

impl AmqpBus {
    pub fn new(url: Secret<String>) -> Self {
        Self { url, link: Arc::new(Mutex::new(None)) }
    }

    async fn channel(&self) -> Result<Channel, TransportError> {
        let mut link = self.link.lock().await;
        if let Some((_, channel)) = link.as_ref() {
            if channel.status().connected() {
                return Ok(channel.clone());
            }
            debug!("📬️ Cached AMQP channel is no longer connected. Re-dialling the message broker.");
            *link = None;
        }
        let connection = Connection::connect(self.url.reveal(), ConnectionProperties::default())
            .await
            .map_err(|e| TransportError::ConnectionError(e.to_string()))?;
        let channel =
            connection.create_channel().await.map_err(|e| TransportError::ConnectionError(e.to_string()))?;
        info!("📬️ Connected to the message broker");
        *link = Some((connection, channel.clone()));
        Ok(channel)
    }

    /// Drops the cached connection so the next call re-dials.
    async fn reset(&self) {
        let mut link = self.link.lock().await;
        *link = None;
    }

    async fn declare_queue(&self, channel: &Channel, topic: &str) -> Result<(), lapin::Error> {
        channel.queue_declare(topic, QueueDeclareOptions::default(), FieldTable::default()).await?;
        Ok(())
    }
}

impl MessageBus for AmqpBus {
    type Subscription = AmqpSubscription;

    async fn publish(&self, topic: &str, payload: String) -> Result<(), TransportError> {
        let channel = self.channel().await?;
        let result: Result<(), lapin::Error> = async {
            self.declare_queue(&channel, topic).await?;
            channel
                .basic_publish("", topic, BasicPublishOptions::default(), payload.as_bytes(), BasicProperties::default())
                .await?
                .await?;
            Ok(())
        }
        .await;
        if let Err(e) = result {
            self.reset().await;
            return Err(TransportError::PublishError { topic: topic.to_string(), reason: e.to_string() });
        }
        trace!("📬️ Published {} byte(s) to '{topic}'", payload.len());
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Self::Subscription, TransportError> {
        let channel = self.channel().await?;
        let result: Result<lapin::Consumer, lapin::Error> = async {
            self.declare_queue(&channel, topic).await?;
            channel.basic_consume(topic, "", BasicConsumeOptions::default(), FieldTable::default()).await
        }
        .await;
        match result {
            Ok(consumer) => {
                debug!("📬️ Consuming from '{topic}'");
                Ok(AmqpSubscription { topic: topic.to_string(), consumer })
            },
            Err(e) => {
                self.reset().await;
                Err(TransportError::SubscribeError { topic: topic.to_string(), reason: e.to_string() })
            },
        }
    }
}

pub struct AmqpSubscription {
    topic: String,
    consumer: lapin::Consumer,
}

impl Subscription for AmqpSubscription {
    async fn next_message(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            match self.consumer.next().await {
                Some(Ok(delivery)) => {
                    if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                        warn!("📬️ Could not ack a delivery on '{}': {e}", self.topic);
                    }
                    match String::from_utf8(delivery.data) {
                        Ok(payload) => return Ok(Some(payload)),
                        Err(e) => {
                            warn!("📬️ Dropping non-UTF8 delivery on '{}': {e}", self.topic);
                        },
                    }
                },
                Some(Err(e)) => return Err(TransportError::SubscriptionError(e.to_string())),
                None => return Ok(None),
            }
        }
    }
}
