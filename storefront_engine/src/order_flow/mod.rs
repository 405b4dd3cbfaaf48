//! The order flow: checkout, cancellation, payment events and settlement.
mod api;
pub(crate) mod settlement;

pub use api::OrderFlowApi;
