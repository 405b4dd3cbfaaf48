use thiserror::Error;

use crate::db_types::{LineItem, Order, OrderId, OrderItem, RequestContext};

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Product {0} does not exist")]
    ProductNotFound(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}

/// Read-only queries over orders. The mutation side lives in
/// [`CommerceDatabase`](crate::traits::CommerceDatabase).
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Fetches an order by id, regardless of owner. Used by the event-driven paths, where the order id comes
    /// from a broker message rather than a user request.
    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, StoreError>;

    /// Fetches an order by id, scoped to the requesting user and app. Used by the synchronous API paths so a
    /// user can never act on another tenant's order.
    async fn fetch_order_for_user(&self, id: &OrderId, ctx: &RequestContext) -> Result<Option<Order>, StoreError>;

    async fn fetch_order_items(&self, id: &OrderId) -> Result<Vec<OrderItem>, StoreError>;

    /// Order lines joined with their product names, as reported on the real-time broadcast channel.
    async fn fetch_line_items(&self, id: &OrderId) -> Result<Vec<LineItem>, StoreError>;
}
