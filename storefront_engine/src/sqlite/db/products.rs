use log::debug;
use sf_common::Money;
use sqlx::SqliteConnection;

use crate::{db_types::Product, traits::StoreError};

pub async fn fetch_product(id: &str, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(product)
}

/// Inserts a catalog product. `available` is derived from the initial stock count.
pub async fn insert_product(
    id: &str,
    name: &str,
    price: Money,
    stock_quantity: i64,
    app_id: &str,
    developer_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Product, StoreError> {
    let product = sqlx::query_as(
        r#"
            INSERT INTO products (id, name, price, stock_quantity, available, app_id, developer_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(price.value())
    .bind(stock_quantity)
    .bind(stock_quantity > 0)
    .bind(app_id)
    .bind(developer_id)
    .fetch_one(conn)
    .await?;
    Ok(product)
}

/// Atomically applies `delta` to a product's stock count, recomputing `available` in the same statement.
/// The column references on the right-hand side read the pre-update values, so the whole read-modify-write is
/// one statement and concurrent adjustments cannot lose updates.
pub(crate) async fn adjust_stock(
    product_id: &str,
    delta: i64,
    conn: &mut SqliteConnection,
) -> Result<Product, StoreError> {
    let product: Option<Product> = sqlx::query_as(
        r#"
            UPDATE products
            SET stock_quantity = stock_quantity + $1,
                available = stock_quantity + $1 > 0,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
            RETURNING *;
        "#,
    )
    .bind(delta)
    .bind(product_id)
    .fetch_optional(conn)
    .await?;
    let product = product.ok_or_else(|| StoreError::ProductNotFound(product_id.to_string()))?;
    debug!("📝️ Product [{}] stock adjusted by {delta} to {}", product.id, product.stock_quantity);
    Ok(product)
}
