//! The message-bus seam between the engine and the outside world.
//!
//! The engine never talks to a broker directly; it publishes and subscribes through the [`MessageBus`] trait.
//! The server supplies an AMQP-backed implementation, and [`MemoryBus`] provides an in-process transport for
//! tests and local development.
mod memory;
pub mod messages;
mod transport;

pub use memory::{MemoryBus, MemorySubscription};
pub use transport::{MessageBus, Subscription, TransportError};
