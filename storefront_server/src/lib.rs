//! # Storefront server
//! This module hosts the HTTP and broker-facing side of the Storefront order subsystem. It is responsible for:
//! * Serving the checkout, cancellation and order-status endpoints.
//! * Bridging the order engine onto an AMQP broker via [`amqp::AmqpBus`].
//! * Running the payment-status and order-validation listeners as background workers.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/v1/cart/checkout`: Converts the caller's cart into a pending order.
//! * `/api/v1/orders/{id}`: Fetches one of the caller's orders.
//! * `/api/v1/orders/{id}/cancel`: Cancels one of the caller's pending orders.
//!
//! Caller identity comes from the `SF-User-Id`, `SF-App-Id` and `SF-Developer-Id` headers, which the identity
//! proxy in front of this service is trusted to set.

pub mod amqp;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod routes;
pub mod server;
pub mod workers;

#[cfg(test)]
mod endpoint_tests;
