use thiserror::Error;

use crate::{
    bus::TransportError,
    db_types::{CartLine, Order, OrderId, OrderStatusType, Product, RequestContext},
    lifecycle::StockDirection,
    traits::{OrderManagement, StoreError},
};

/// Errors surfaced by the order flow. The variants map onto the public error taxonomy: `EmptyCart` is a
/// validation failure, `PendingOrderExists` a business-rule conflict, `NotCancellable` an illegal state-machine
/// operation, and the rest are what they say they are.
#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Cart is empty or does not exist")]
    EmptyCart,
    #[error("An order for this user is already in the {status} state. Order id: {order_id}")]
    PendingOrderExists { order_id: OrderId, status: OrderStatusType },
    #[error("Order {order_id} can only be cancelled in the pending state, but it is {current}")]
    NotCancellable { order_id: OrderId, current: OrderStatusType },
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Unknown payment status: {0}")]
    UnknownPaymentStatus(String),
    #[error(transparent)]
    StoreError(#[from] StoreError),
    #[error(transparent)]
    TransportError(#[from] TransportError),
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        OrderFlowError::StoreError(StoreError::from(e))
    }
}

/// This trait defines the highest level of behaviour for backends supporting the order engine:
/// * the atomic cart-to-order conversion at checkout,
/// * the conditional status update every lifecycle transition goes through,
/// * stock settlement and cart clearing.
#[allow(async_fn_in_trait)]
pub trait CommerceDatabase: Clone + OrderManagement {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Converts a cart into a pending order in a single transaction.
    ///
    /// Fails with [`OrderFlowError::PendingOrderExists`] if the user already has an order in `pending` or
    /// `processing` state, without mutating anything. Otherwise inserts the order (status `pending`,
    /// total = Σ quantity × live price) and one order item per cart line, snapshotting the current product
    /// price into each item. The cart itself is left untouched; it is only cleared once payment settles.
    async fn create_order_from_cart(&self, ctx: &RequestContext, lines: &[CartLine])
        -> Result<Order, OrderFlowError>;

    /// Atomically moves an order to `new_status`, but only if its current status is in `allowed_from`.
    ///
    /// Returns the updated order, or `None` when the predicate did not match — either a duplicate delivery
    /// (the order is already in `new_status`) or a concurrent writer got there first. Callers must skip all
    /// settlement side effects on `None`; this single conditional update is what makes the whole pipeline
    /// idempotent under at-least-once delivery.
    async fn update_order_status_if(
        &self,
        id: &OrderId,
        new_status: OrderStatusType,
        allowed_from: &[OrderStatusType],
    ) -> Result<Option<Order>, OrderFlowError>;

    /// Adjusts product stock by each of the order's item quantities, in one transaction. `Down` on settlement,
    /// `Up` on refund. `available` is recomputed as `stock_quantity > 0` for every touched product. Returns the
    /// updated products.
    async fn adjust_stock_for_order(
        &self,
        order: &Order,
        direction: StockDirection,
    ) -> Result<Vec<Product>, OrderFlowError>;

    /// The user's cart contents joined with live product data. An absent cart reads as an empty line list.
    async fn fetch_cart_lines(&self, user_id: &str, app_id: &str) -> Result<Vec<CartLine>, OrderFlowError>;

    /// Deletes all cart items for the user. Returns the number of items removed; an absent or already empty
    /// cart is a no-op, not an error.
    async fn clear_cart(&self, user_id: &str) -> Result<u64, OrderFlowError>;
}
