use std::future::Future;

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Could not connect to the message broker. {0}")]
    ConnectionError(String),
    #[error("Could not publish to topic '{topic}'. {reason}")]
    PublishError { topic: String, reason: String },
    #[error("Could not subscribe to topic '{topic}'. {reason}")]
    SubscribeError { topic: String, reason: String },
    #[error("The subscription was interrupted. {0}")]
    SubscriptionError(String),
}

/// A publish/subscribe transport, addressed by topic string.
///
/// Publishing is fire-and-forget from the engine's point of view: a [`TransportError`] is reported to the
/// caller, who decides whether it is fatal (it never is for settlement-side publishes, which are logged and
/// dropped). Delivery is at-least-once; consumers must be idempotent.
/// The futures are explicitly `Send` so that listeners built over a generic bus can be moved onto the tokio
/// runtime with `tokio::spawn`.
pub trait MessageBus: Clone + Send + Sync + 'static {
    type Subscription: Subscription;

    fn publish(&self, topic: &str, payload: String) -> impl Future<Output = Result<(), TransportError>> + Send;

    fn subscribe(&self, topic: &str) -> impl Future<Output = Result<Self::Subscription, TransportError>> + Send;
}

/// A live subscription to a single topic.
pub trait Subscription: Send {
    /// Waits for the next message on this subscription. `Ok(None)` means the subscription closed normally and
    /// the caller should resubscribe (or shut down).
    fn next_message(&mut self) -> impl Future<Output = Result<Option<String>, TransportError>> + Send;
}
