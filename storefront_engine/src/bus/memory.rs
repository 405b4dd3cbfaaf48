//! A simple in-process message bus.
//!
//! Topics are created lazily and backed by tokio broadcast channels, so every subscriber to a topic sees every
//! message published after it subscribed. Publishing to a topic nobody is listening on is not an error; the
//! message is simply dropped, which mirrors how a real broker treats a queue with no consumers bound yet.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use log::*;
use tokio::sync::broadcast;

use crate::bus::{MessageBus, Subscription, TransportError};

const TOPIC_BUFFER_SIZE: usize = 128;

#[derive(Clone, Default)]
pub struct MemoryBus {
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<String>>>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of live subscribers on a topic. Lets tests wait for a listener to attach before publishing.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        let topics = self.topics.lock().unwrap_or_else(|e| e.into_inner());
        topics.get(topic).map(|s| s.receiver_count()).unwrap_or(0)
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<String> {
        let mut topics = self.topics.lock().unwrap_or_else(|e| e.into_inner());
        topics.entry(topic.to_string()).or_insert_with(|| broadcast::channel(TOPIC_BUFFER_SIZE).0).clone()
    }
}

impl MessageBus for MemoryBus {
    type Subscription = MemorySubscription;

    async fn publish(&self, topic: &str, payload: String) -> Result<(), TransportError> {
        match self.sender(topic).send(payload) {
            Ok(n) => trace!("📬️ Published to '{topic}' ({n} subscribers)"),
            Err(_) => trace!("📬️ No subscribers on '{topic}'; message dropped"),
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Self::Subscription, TransportError> {
        let receiver = self.sender(topic).subscribe();
        debug!("📬️ New subscription on '{topic}'");
        Ok(MemorySubscription { receiver })
    }
}

pub struct MemorySubscription {
    receiver: broadcast::Receiver<String>,
}

impl Subscription for MemorySubscription {
    async fn next_message(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            match self.receiver.recv().await {
                Ok(msg) => return Ok(Some(msg)),
                Err(broadcast::error::RecvError::Closed) => return Ok(None),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("📬️ Subscription lagging; {n} messages skipped");
                },
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn fan_out_to_multiple_subscribers() {
        let bus = MemoryBus::new();
        let mut sub_a = bus.subscribe("orders").await.unwrap();
        let mut sub_b = bus.subscribe("orders").await.unwrap();
        bus.publish("orders", "hello".to_string()).await.unwrap();
        assert_eq!(sub_a.next_message().await.unwrap(), Some("hello".to_string()));
        assert_eq!(sub_b.next_message().await.unwrap(), Some("hello".to_string()));
    }

    #[tokio::test]
    async fn topics_are_isolated() {
        let bus = MemoryBus::new();
        let mut sub = bus.subscribe("a").await.unwrap();
        bus.publish("b", "for b".to_string()).await.unwrap();
        bus.publish("a", "for a".to_string()).await.unwrap();
        assert_eq!(sub.next_message().await.unwrap(), Some("for a".to_string()));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_ok() {
        let bus = MemoryBus::new();
        bus.publish("nobody-home", "dropped".to_string()).await.unwrap();
    }
}
