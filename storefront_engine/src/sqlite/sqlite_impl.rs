//! `SqliteDatabase` is the concrete storage backend for the order engine.
//!
//! It wraps a connection pool and implements the traits in the [`traits`](crate::traits) module, opening a
//! transaction wherever a contract requires multiple statements to land atomically (checkout, stock
//! settlement). Single-statement operations go straight through a pooled connection.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::db::{carts, new_pool, orders, products};
use crate::{
    db_types::{CartLine, LineItem, NewOrder, Order, OrderId, OrderItem, OrderStatusType, Product, RequestContext},
    lifecycle::StockDirection,
    traits::{CommerceDatabase, OrderFlowError, OrderManagement, StoreError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object with a connection pool attached to the given database URL.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&mut self) -> Result<(), sqlx::Error> {
        self.pool.close().await;
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_for_user(&self, id: &OrderId, ctx: &RequestContext) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_for_user(id, ctx, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, id: &OrderId) -> Result<Vec<OrderItem>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_order_items(id, &mut conn).await?;
        Ok(items)
    }

    async fn fetch_line_items(&self, id: &OrderId) -> Result<Vec<LineItem>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_line_items(id, &mut conn).await?;
        Ok(items)
    }
}

impl CommerceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_order_from_cart(
        &self,
        ctx: &RequestContext,
        lines: &[CartLine],
    ) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        if let Some(active) = orders::fetch_active_order_for_user(&ctx.user_id, &mut tx).await? {
            return Err(OrderFlowError::PendingOrderExists { order_id: active.id, status: active.status });
        }
        let total = lines.iter().map(|line| line.price * line.quantity).sum();
        let order = orders::insert_order(NewOrder::new(ctx, total), &mut tx).await?;
        for line in lines {
            orders::insert_order_item(&order.id, line, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("📝️ Order [{}] created with {} item(s), total {total}", order.id, lines.len());
        Ok(order)
    }

    async fn update_order_status_if(
        &self,
        id: &OrderId,
        new_status: OrderStatusType,
        allowed_from: &[OrderStatusType],
    ) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::update_order_status_if(id, new_status, allowed_from, &mut conn).await?;
        Ok(order)
    }

    async fn adjust_stock_for_order(
        &self,
        order: &Order,
        direction: StockDirection,
    ) -> Result<Vec<Product>, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let items = orders::fetch_order_items(&order.id, &mut tx).await?;
        let mut updated = Vec::with_capacity(items.len());
        for item in &items {
            let delta = match direction {
                StockDirection::Down => -item.quantity,
                StockDirection::Up => item.quantity,
            };
            let product = products::adjust_stock(&item.product_id, delta, &mut tx).await?;
            updated.push(product);
        }
        tx.commit().await?;
        trace!("📝️ Stock adjusted for {} product(s) on order [{}]", updated.len(), order.id);
        Ok(updated)
    }

    async fn fetch_cart_lines(&self, user_id: &str, app_id: &str) -> Result<Vec<CartLine>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let lines = carts::fetch_cart_lines(user_id, app_id, &mut conn).await.map_err(StoreError::from)?;
        Ok(lines)
    }

    async fn clear_cart(&self, user_id: &str) -> Result<u64, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let removed = carts::clear_cart(user_id, &mut conn).await.map_err(StoreError::from)?;
        Ok(removed)
    }
}
