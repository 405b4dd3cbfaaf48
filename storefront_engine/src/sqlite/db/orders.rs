use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{CartLine, LineItem, NewOrder, Order, OrderId, OrderItem, OrderStatusType, RequestContext},
    traits::StoreError,
};

/// Returns the order with the given id, if it exists.
pub async fn fetch_order(id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

/// Returns the order with the given id, but only if it belongs to the requesting user and app.
pub async fn fetch_order_for_user(
    id: &OrderId,
    ctx: &RequestContext,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1 AND user_id = $2 AND app_id = $3")
        .bind(id.as_str())
        .bind(&ctx.user_id)
        .bind(&ctx.app_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Returns the user's order in `pending` or `processing` state, if any. At most one such order can exist per
/// user; checkout refuses to create a second one.
pub async fn fetch_active_order_for_user(
    user_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 AND status IN ('pending', 'processing') LIMIT 1")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Inserts a new order in `pending` status. This is not atomic on its own; checkout embeds it in a transaction
/// together with the pending-order check and the item inserts, passing `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, StoreError> {
    let id = OrderId::random();
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (id, user_id, developer_id, app_id, total_amount, status)
            VALUES ($1, $2, $3, $4, $5, 'pending')
            RETURNING *;
        "#,
    )
    .bind(id.as_str())
    .bind(order.user_id)
    .bind(order.developer_id)
    .bind(order.app_id)
    .bind(order.total_amount.value())
    .fetch_one(conn)
    .await?;
    debug!("📝️ Order [{}] inserted for user {}", order.id, order.user_id);
    Ok(order)
}

/// Inserts one order item for the given cart line, snapshotting the line's live price.
pub async fn insert_order_item(
    order_id: &OrderId,
    line: &CartLine,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, StoreError> {
    let item = sqlx::query_as(
        r#"
            INSERT INTO order_items (order_id, product_id, quantity, price_at_purchase)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .bind(&line.product_id)
    .bind(line.quantity)
    .bind(line.price.value())
    .fetch_one(conn)
    .await?;
    Ok(item)
}

pub async fn fetch_order_items(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Order lines joined with their product names, for the real-time broadcast payload.
pub async fn fetch_line_items(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<LineItem>, sqlx::Error> {
    let items = sqlx::query_as(
        r#"
            SELECT products.name AS name, order_items.quantity AS quantity
            FROM order_items JOIN products ON order_items.product_id = products.id
            WHERE order_items.order_id = $1
            ORDER BY order_items.id
        "#,
    )
    .bind(order_id.as_str())
    .fetch_all(conn)
    .await?;
    Ok(items)
}

/// Conditionally moves the order to `new_status` in a single atomic UPDATE. The row is only touched when its
/// current status is in `allowed_from`, so concurrent listeners and duplicate deliveries race safely: exactly
/// one caller observes `Some(order)` for a given status change, and everyone else gets `None`.
pub(crate) async fn update_order_status_if(
    id: &OrderId,
    new_status: OrderStatusType,
    allowed_from: &[OrderStatusType],
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StoreError> {
    if allowed_from.is_empty() {
        return Ok(None);
    }
    let mut builder = QueryBuilder::new("UPDATE orders SET status = ");
    builder.push_bind(new_status.to_string());
    builder.push(", updated_at = CURRENT_TIMESTAMP WHERE id = ");
    builder.push_bind(id.as_str());
    builder.push(" AND status IN (");
    let mut statuses = builder.separated(", ");
    for status in allowed_from {
        statuses.push_bind(status.to_string());
    }
    builder.push(") RETURNING *");
    trace!("📝️ Executing query: {}", builder.sql());
    // fetch_all rather than fetch_optional: the statement must run to completion, or SQLite keeps the
    // UPDATE's write lock open on this pooled connection and the settlement that follows gets SQLITE_BUSY.
    let order = builder.build_query_as::<Order>().fetch_all(conn).await?.into_iter().next();
    Ok(order)
}
