use actix_web::{http::StatusCode, test::TestRequest};

use super::helpers::{alice, call, fill_cart, test_api, with_identity};

#[actix_web::test]
async fn health_check() {
    let api = test_api().await;
    let (status, body) = call(&api, TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn checkout_requires_identity_headers() {
    let api = test_api().await;
    let (status, body) = call(&api, TestRequest::post().uri("/api/v1/cart/checkout")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("SF-User-Id"));
}

#[actix_web::test]
async fn checkout_returns_the_created_order() {
    let api = test_api().await;
    fill_cart(api.db(), &alice(), &[("widget", 2), ("gizmo", 1)]).await;
    let (status, body) = call(&api, with_identity(TestRequest::post().uri("/api/v1/cart/checkout"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["user_id"], "alice");
    assert_eq!(body["total_amount"], 1500);
}

#[actix_web::test]
async fn checkout_with_an_empty_cart_is_unprocessable() {
    let api = test_api().await;
    let (status, body) = call(&api, with_identity(TestRequest::post().uri("/api/v1/cart/checkout"))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("Cart is empty"));
}

#[actix_web::test]
async fn a_second_checkout_requires_payment_first() {
    let api = test_api().await;
    fill_cart(api.db(), &alice(), &[("widget", 1)]).await;
    let (status, first) = call(&api, with_identity(TestRequest::post().uri("/api/v1/cart/checkout"))).await;
    assert_eq!(status, StatusCode::CREATED);

    fill_cart(api.db(), &alice(), &[("gizmo", 1)]).await;
    let (status, body) = call(&api, with_identity(TestRequest::post().uri("/api/v1/cart/checkout"))).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["details"]["order_id"], first["id"]);
    assert_eq!(body["details"]["status"], "pending");
    assert!(body["details"]["next_steps"].as_str().unwrap().contains("cancel"));
}

#[actix_web::test]
async fn orders_can_be_fetched_by_their_owner() {
    let api = test_api().await;
    fill_cart(api.db(), &alice(), &[("widget", 1)]).await;
    let (_, order) = call(&api, with_identity(TestRequest::post().uri("/api/v1/cart/checkout"))).await;
    let id = order["id"].as_str().unwrap();

    let (status, body) = call(&api, with_identity(TestRequest::get().uri(&format!("/api/v1/orders/{id}")))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], order["id"]);

    // Someone else's identity reads as not-found, not forbidden.
    let foreign = TestRequest::get()
        .uri(&format!("/api/v1/orders/{id}"))
        .insert_header(("SF-User-Id", "mallory"))
        .insert_header(("SF-App-Id", "app-1"))
        .insert_header(("SF-Developer-Id", "dev-1"));
    let (status, _) = call(&api, foreign).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn pending_orders_cancel_cleanly() {
    let api = test_api().await;
    fill_cart(api.db(), &alice(), &[("widget", 1)]).await;
    let (_, order) = call(&api, with_identity(TestRequest::post().uri("/api/v1/cart/checkout"))).await;
    let id = order["id"].as_str().unwrap();

    let (status, body) =
        call(&api, with_identity(TestRequest::post().uri(&format!("/api/v1/orders/{id}/cancel")))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    // Cancelling again is an illegal state transition with a refund hint.
    let (status, body) =
        call(&api, with_identity(TestRequest::post().uri(&format!("/api/v1/orders/{id}/cancel")))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["status"], "cancelled");
    assert!(body["details"]["next_steps"].as_str().unwrap().contains("refund"));
}

#[actix_web::test]
async fn processing_orders_cannot_be_cancelled() {
    let api = test_api().await;
    fill_cart(api.db(), &alice(), &[("gizmo", 1)]).await;
    let (_, order) = call(&api, with_identity(TestRequest::post().uri("/api/v1/cart/checkout"))).await;
    let id = order["id"].as_str().unwrap();
    api.apply_payment_event(&id.into(), "created").await.unwrap();

    let (status, body) =
        call(&api, with_identity(TestRequest::post().uri(&format!("/api/v1/orders/{id}/cancel")))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["status"], "processing");
}
