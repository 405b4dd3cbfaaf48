//! Behaviour contracts for storage backends.
//!
//! * [`OrderManagement`] provides read-only queries over orders and their line items.
//! * [`CommerceDatabase`] defines the mutations the order flow needs: the atomic checkout insert, the
//!   conditional status update that makes transitions idempotent, stock adjustment and cart clearing.
//!
//! Backends implement these traits (see [`SqliteDatabase`](crate::SqliteDatabase)); everything above the traits
//! is backend-agnostic.
mod commerce_database;
mod order_management;

pub use commerce_database::{CommerceDatabase, OrderFlowError};
pub use order_management::{OrderManagement, StoreError};
