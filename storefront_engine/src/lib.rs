//! Storefront Order Engine
//!
//! The order engine carries the order lifecycle for the Storefront e-commerce backend: converting carts into
//! pending orders at checkout, listening for payment-provider events, and settling orders (stock, cart,
//! notifications, real-time broadcasts) as their status changes.
//!
//! The library is divided into four main sections:
//! 1. Database management and control ([`mod@traits`] and [`mod@sqlite`]). SQLite is the supported backend. You
//!    should never need to access the database directly; use the [`OrderFlowApi`] instead. The exception is the
//!    data types used in the database, which are defined in [`mod@db_types`] and are public.
//! 2. The pure order state machine ([`mod@lifecycle`]). It maps (current status, payment event) pairs to a new
//!    status and an ordered list of settlement side effects, with no I/O of its own. Every status change in the
//!    system goes through this table.
//! 3. The message bus ([`mod@bus`]). The engine only knows the [`bus::MessageBus`] trait; concrete transports
//!    (AMQP in the server, [`bus::MemoryBus`] in tests) are supplied by the caller.
//! 4. The flow API and listeners. [`OrderFlowApi`] is the single entry
//!    point for checkout, cancellation and payment events; the listeners are long-lived subscriber loops that
//!    drive it from the broker.
pub mod bus;
pub mod db_types;
pub mod lifecycle;
mod listener;
mod order_flow;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use listener::{decode_payment_status, OrderValidationListener, PaymentStatusListener};
pub use order_flow::OrderFlowApi;
pub use traits::{CommerceDatabase, OrderFlowError, OrderManagement, StoreError};
