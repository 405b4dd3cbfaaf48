use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Cart, CartLine, RequestContext},
    traits::StoreError,
};

/// Finds the user's cart for the given app, creating an empty one if none exists yet. The developer who
/// created the cart is recorded for tracking.
pub async fn fetch_or_create_cart(ctx: &RequestContext, conn: &mut SqliteConnection) -> Result<Cart, StoreError> {
    let existing: Option<Cart> = sqlx::query_as("SELECT * FROM carts WHERE user_id = $1 AND app_id = $2")
        .bind(&ctx.user_id)
        .bind(&ctx.app_id)
        .fetch_optional(&mut *conn)
        .await?;
    if let Some(cart) = existing {
        return Ok(cart);
    }
    let cart = sqlx::query_as(
        "INSERT INTO carts (user_id, app_id, developer_id) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(&ctx.user_id)
    .bind(&ctx.app_id)
    .bind(&ctx.developer_id)
    .fetch_one(conn)
    .await?;
    Ok(cart)
}

/// Adds a product to the cart, or replaces the quantity if the product is already in it.
pub async fn upsert_cart_item(
    cart_id: i64,
    product_id: &str,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
            INSERT INTO cart_items (cart_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = excluded.quantity
        "#,
    )
    .bind(cart_id)
    .bind(product_id)
    .bind(quantity)
    .execute(conn)
    .await?;
    Ok(())
}

/// The user's cart contents joined with live product price and name. An absent cart reads as an empty list.
pub async fn fetch_cart_lines(
    user_id: &str,
    app_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<CartLine>, sqlx::Error> {
    let lines = sqlx::query_as(
        r#"
            SELECT
                cart_items.product_id AS product_id,
                products.name AS name,
                cart_items.quantity AS quantity,
                products.price AS price
            FROM cart_items
            JOIN carts ON cart_items.cart_id = carts.id
            JOIN products ON cart_items.product_id = products.id
            WHERE carts.user_id = $1 AND carts.app_id = $2
            ORDER BY cart_items.id
        "#,
    )
    .bind(user_id)
    .bind(app_id)
    .fetch_all(conn)
    .await?;
    Ok(lines)
}

/// Deletes every cart item belonging to the user, across apps. Returns the number of items removed; a missing
/// or empty cart is a no-op.
pub async fn clear_cart(user_id: &str, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id IN (SELECT id FROM carts WHERE user_id = $1)")
        .bind(user_id)
        .execute(conn)
        .await?;
    debug!("📝️ Cleared {} cart item(s) for user {user_id}", result.rows_affected());
    Ok(result.rows_affected())
}
