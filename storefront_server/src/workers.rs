use std::time::Duration;

use log::*;
use storefront_engine::{
    bus::MessageBus,
    OrderFlowApi,
    OrderValidationListener,
    PaymentStatusListener,
    SqliteDatabase,
};
use tokio::{sync::watch, task::JoinHandle};

/// Starts the payment status listener. The returned handle completes once the shutdown signal fires.
pub fn start_payment_status_listener<M: MessageBus>(
    db: SqliteDatabase,
    bus: M,
    shutdown: watch::Receiver<bool>,
    reconnect_delay: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("🔄️ Payment status worker started");
        let api = OrderFlowApi::new(db, bus.clone());
        PaymentStatusListener::new(api, bus, shutdown).with_reconnect_delay(reconnect_delay).run().await;
        info!("🔄️ Payment status worker stopped");
    })
}

/// Starts the order validation listener. The returned handle completes once the shutdown signal fires.
pub fn start_order_validation_listener<M: MessageBus>(
    db: SqliteDatabase,
    bus: M,
    shutdown: watch::Receiver<bool>,
    reconnect_delay: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("🔎️ Order validation worker started");
        OrderValidationListener::new(db, bus, shutdown).with_reconnect_delay(reconnect_delay).run().await;
        info!("🔎️ Order validation worker stopped");
    })
}
