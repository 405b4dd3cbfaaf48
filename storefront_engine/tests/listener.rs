//! Listener resilience tests: malformed and stale broker messages must never take a listener down or poison
//! later messages.
mod support;

use std::time::Duration;

use storefront_engine::{
    bus::{messages, MemoryBus, MessageBus},
    db_types::{OrderId, OrderStatusType},
    OrderManagement,
    OrderValidationListener,
    PaymentStatusListener,
    SqliteDatabase,
};
use tokio::sync::watch;

use crate::support::{alice, assert_silent, fill_cart, next_json, setup, tear_down};

async fn wait_for_subscriber(bus: &MemoryBus, topic: &str) {
    for _ in 0..100 {
        if bus.subscriber_count(topic) > 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("No subscriber appeared on '{topic}'");
}

async fn wait_for_status(db: &SqliteDatabase, id: &OrderId, status: OrderStatusType) {
    for _ in 0..100 {
        let order = db.fetch_order(id).await.expect("Error fetching order").expect("Order vanished");
        if order.status == status {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("Order [{id}] never reached {status}");
}

#[tokio::test]
async fn bad_messages_do_not_poison_the_payment_listener() {
    let (api, bus) = setup().await;
    let ctx = alice();
    fill_cart(api.db(), &ctx, &[("widget", 1)]).await;
    let order = api.checkout(&ctx).await.unwrap();
    let db = api.db().clone();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let listener = PaymentStatusListener::new(api.clone(), bus.clone(), shutdown_rx);
    let handle = tokio::spawn(listener.run());
    wait_for_subscriber(&bus, messages::PAYMENT_STATUS_TOPIC).await;

    // A parade of junk: not JSON, missing fields, an unknown order, an unknown status.
    bus.publish(messages::PAYMENT_STATUS_TOPIC, "not json at all".into()).await.unwrap();
    bus.publish(messages::PAYMENT_STATUS_TOPIC, r#"{"order_id":"orphan"}"#.into()).await.unwrap();
    bus.publish(messages::PAYMENT_STATUS_TOPIC, r#"{"order_id":"does-not-exist","status":"succeeded"}"#.into())
        .await
        .unwrap();
    bus.publish(
        messages::PAYMENT_STATUS_TOPIC,
        format!(r#"{{"order_id":"{}","status":"paid_in_full"}}"#, order.id),
    )
    .await
    .unwrap();

    // The listener is still alive and processes the next well-formed message.
    bus.publish(messages::PAYMENT_STATUS_TOPIC, format!(r#"{{"order_id":"{}","status":"created"}}"#, order.id))
        .await
        .unwrap();
    wait_for_status(&db, &order.id, OrderStatusType::Processing).await;

    shutdown_tx.send(true).expect("Listener dropped its shutdown receiver");
    tokio::time::timeout(Duration::from_secs(1), handle).await.expect("Listener did not shut down").unwrap();
    tear_down(api).await;
}

#[tokio::test]
async fn payment_listener_applies_events_in_arrival_order() {
    let (api, bus) = setup().await;
    let ctx = alice();
    fill_cart(api.db(), &ctx, &[("widget", 2)]).await;
    let order = api.checkout(&ctx).await.unwrap();
    let db = api.db().clone();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(PaymentStatusListener::new(api.clone(), bus.clone(), shutdown_rx).run());
    wait_for_subscriber(&bus, messages::PAYMENT_STATUS_TOPIC).await;

    for status in ["created", "succeeded", "succeeded"] {
        bus.publish(messages::PAYMENT_STATUS_TOPIC, format!(r#"{{"order_id":"{}","status":"{status}"}}"#, order.id))
            .await
            .unwrap();
    }
    wait_for_status(&db, &order.id, OrderStatusType::Successful).await;
    // The duplicate settled nothing extra.
    assert_eq!(support::stock_level(&db, "widget").await, support::WIDGET_STOCK - 2);

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(1), handle).await.expect("Listener did not shut down").unwrap();
    tear_down(api).await;
}

#[tokio::test]
async fn validation_listener_flags_unknown_and_foreign_orders() {
    let (api, bus) = setup().await;
    let ctx = alice();
    fill_cart(api.db(), &ctx, &[("gizmo", 1)]).await;
    let order = api.checkout(&ctx).await.unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(OrderValidationListener::new(api.db().clone(), bus.clone(), shutdown_rx).run());
    let mut invalid_sub = bus.subscribe(messages::INVALID_ORDER_TOPIC).await.unwrap();
    wait_for_subscriber(&bus, messages::VALIDATE_ORDER_TOPIC).await;

    // Garbage is dropped without a reply.
    bus.publish(messages::VALIDATE_ORDER_TOPIC, "garbage".into()).await.unwrap();

    // An unknown order draws an invalid-order notice.
    let ghost = OrderId::random();
    let request = format!(
        r#"{{"order_id":"{ghost}","user_id":"alice","app_id":"app-1","developer_id":"dev-1"}}"#
    );
    bus.publish(messages::VALIDATE_ORDER_TOPIC, request).await.unwrap();
    let notice = next_json(&mut invalid_sub).await;
    assert_eq!(notice["order_id"], ghost.as_str());
    assert!(notice["error"].as_str().unwrap().contains("does not exist"));

    // An order claimed by the wrong user is invalid too.
    let request = format!(
        r#"{{"order_id":"{}","user_id":"mallory","app_id":"app-1","developer_id":"dev-1"}}"#,
        order.id
    );
    bus.publish(messages::VALIDATE_ORDER_TOPIC, request).await.unwrap();
    let notice = next_json(&mut invalid_sub).await;
    assert_eq!(notice["order_id"], order.id.as_str());

    // The real owner validates cleanly: the order is handed to the payment service again instead.
    let mut created_sub = bus.subscribe(messages::PAYMENT_ORDER_CREATED_TOPIC).await.unwrap();
    let request = format!(
        r#"{{"order_id":"{}","user_id":"alice","app_id":"app-1","developer_id":"dev-1"}}"#,
        order.id
    );
    bus.publish(messages::VALIDATE_ORDER_TOPIC, request).await.unwrap();
    let renotice = next_json(&mut created_sub).await;
    assert_eq!(renotice["order_id"], order.id.as_str());
    assert_silent(&mut invalid_sub).await;

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(1), handle).await.expect("Listener did not shut down").unwrap();
    tear_down(api).await;
}
