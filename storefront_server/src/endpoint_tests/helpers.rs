use actix_web::{
    body::MessageBody,
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    App,
};
use sf_common::Money;
use storefront_engine::{
    bus::MemoryBus,
    db_types::RequestContext,
    sqlite::db,
    OrderFlowApi,
    SqliteDatabase,
};

use crate::routes::{health, CancelOrderRoute, CheckoutRoute, OrderByIdRoute};

pub async fn test_api() -> OrderFlowApi<SqliteDatabase, MemoryBus> {
    let _ = env_logger::try_init();
    let url = format!("sqlite://{}/storefront_server_test_{}.db", std::env::temp_dir().display(), rand::random::<u64>());
    db::create_database(&url).await.expect("Error creating database");
    let store = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
    db::run_migrations(store.pool()).await.expect("Error running DB migrations");
    seed_catalog(&store).await;
    OrderFlowApi::new(store, MemoryBus::new())
}

pub fn alice() -> RequestContext {
    RequestContext::new("alice", "app-1", "dev-1")
}

async fn seed_catalog(store: &SqliteDatabase) {
    let mut conn = store.pool().acquire().await.expect("Error acquiring connection");
    db::products::insert_product("widget", "Widget", Money::from_cents(250), 10, "app-1", "dev-1", &mut conn)
        .await
        .expect("Error inserting widget");
    db::products::insert_product("gizmo", "Gizmo", Money::from_cents(1000), 3, "app-1", "dev-1", &mut conn)
        .await
        .expect("Error inserting gizmo");
}

pub async fn fill_cart(store: &SqliteDatabase, ctx: &RequestContext, items: &[(&str, i64)]) {
    let mut conn = store.pool().acquire().await.expect("Error acquiring connection");
    let cart = db::carts::fetch_or_create_cart(ctx, &mut conn).await.expect("Error creating cart");
    for (product_id, quantity) in items {
        db::carts::upsert_cart_item(cart.id, product_id, *quantity, &mut conn).await.expect("Error filling cart");
    }
}

/// Sends a request through a freshly built app wired to the given api and returns (status, JSON-ish body).
pub async fn call(
    api: &OrderFlowApi<SqliteDatabase, MemoryBus>,
    req: TestRequest,
) -> (StatusCode, serde_json::Value) {
    let app = App::new()
        .app_data(web::Data::new(api.clone()))
        .service(health)
        .service(
            web::scope("/api/v1")
                .service(CheckoutRoute::<SqliteDatabase, MemoryBus>::new())
                .service(OrderByIdRoute::<SqliteDatabase, MemoryBus>::new())
                .service(CancelOrderRoute::<SqliteDatabase, MemoryBus>::new()),
        );
    let service = test::init_service(app).await;
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let bytes = res.into_body().try_into_bytes().expect("Could not read response body");
    let body = serde_json::from_slice(&bytes).unwrap_or_else(|_| {
        serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
    });
    (status, body)
}

pub fn with_identity(req: TestRequest) -> TestRequest {
    req.insert_header(("SF-User-Id", "alice"))
        .insert_header(("SF-App-Id", "app-1"))
        .insert_header(("SF-Developer-Id", "dev-1"))
}
