#![allow(dead_code)]
pub mod prepare_env;

use std::time::Duration;

use log::*;
use serde_json::Value;
use sf_common::Money;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use storefront_engine::{
    bus::{MemoryBus, MemorySubscription, Subscription},
    db_types::RequestContext,
    sqlite::db::{carts, products},
    CommerceDatabase,
    OrderFlowApi,
    SqliteDatabase,
};

use crate::support::prepare_env::{prepare_test_env, random_db_path};

pub const WIDGET_PRICE: Money = Money::from_cents(250);
pub const GIZMO_PRICE: Money = Money::from_cents(1000);
pub const WIDGET_STOCK: i64 = 10;
pub const GIZMO_STOCK: i64 = 3;

pub async fn setup() -> (OrderFlowApi<SqliteDatabase, MemoryBus>, MemoryBus) {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    seed_catalog(&db).await;
    let bus = MemoryBus::new();
    (OrderFlowApi::new(db, bus.clone()), bus)
}

pub async fn tear_down(api: OrderFlowApi<SqliteDatabase, MemoryBus>) {
    let url = api.db().url().to_string();
    let mut db = api.db().clone();
    drop(api);
    if let Err(e) = db.close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    Sqlite::drop_database(&url).await.expect("Error dropping database");
}

pub fn alice() -> RequestContext {
    RequestContext::new("alice", "app-1", "dev-1")
}

async fn seed_catalog(db: &SqliteDatabase) {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    products::insert_product("widget", "Widget", WIDGET_PRICE, WIDGET_STOCK, "app-1", "dev-1", &mut conn)
        .await
        .expect("Error inserting widget");
    products::insert_product("gizmo", "Gizmo", GIZMO_PRICE, GIZMO_STOCK, "app-1", "dev-1", &mut conn)
        .await
        .expect("Error inserting gizmo");
}

pub async fn fill_cart(db: &SqliteDatabase, ctx: &RequestContext, items: &[(&str, i64)]) {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    let cart = carts::fetch_or_create_cart(ctx, &mut conn).await.expect("Error creating cart");
    for (product_id, quantity) in items {
        carts::upsert_cart_item(cart.id, product_id, *quantity, &mut conn).await.expect("Error filling cart");
    }
}

pub async fn stock_level(db: &SqliteDatabase, product_id: &str) -> i64 {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    let product =
        products::fetch_product(product_id, &mut conn).await.expect("Error fetching product").expect("No such product");
    product.stock_quantity
}

/// Waits up to a second for the next message on the subscription and parses it as JSON.
pub async fn next_json(sub: &mut MemorySubscription) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(1), sub.next_message())
        .await
        .expect("Timed out waiting for a message")
        .expect("Subscription failed")
        .expect("Subscription closed");
    serde_json::from_str(&msg).expect("Message was not valid JSON")
}

/// Asserts that nothing arrives on the subscription for a little while.
pub async fn assert_silent(sub: &mut MemorySubscription) {
    let result = tokio::time::timeout(Duration::from_millis(100), sub.next_message()).await;
    assert!(result.is_err(), "Expected no message, but got {result:?}");
}
