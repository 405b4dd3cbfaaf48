//! Settlement side effects.
//!
//! Once a status change has been committed, the transition's side effects run here, in table order. Each
//! executor is fault-isolated: a failing effect is logged and the rest still run, so a flaky broker cannot
//! block a stock adjustment and vice versa. None of the executors are retried — the status change that
//! triggered them has already happened exactly once, and re-running the whole batch would double-apply the
//! stock movement.

use log::*;

use crate::{
    bus::{
        messages,
        messages::{OrderStatusBroadcast, PaymentOrderNotice, UserOrderNotification},
        MessageBus,
    },
    db_types::{Order, OrderStatusType},
    lifecycle::{SideEffect, StockDirection},
    traits::CommerceDatabase,
};

pub async fn run<B, M>(db: &B, bus: &M, order: &Order, effects: &[SideEffect])
where
    B: CommerceDatabase,
    M: MessageBus,
{
    for effect in effects {
        match effect {
            SideEffect::AdjustStock(direction) => adjust_stock(db, order, *direction).await,
            SideEffect::ClearCart => clear_cart(db, order).await,
            SideEffect::NotifyUserService => notify_user_service(bus, order).await,
            SideEffect::Broadcast => broadcast_order_status(db, bus, order).await,
            SideEffect::NotifyPaymentService => notify_payment_service(db, bus, order).await,
        }
    }
}

/// Moves stock for every item on the order. `Down` reserves units on settlement, `Up` returns them on refund.
/// The order's status must match the direction; a mismatch means the caller is replaying a stale transition
/// and the adjustment is skipped.
async fn adjust_stock<B: CommerceDatabase>(db: &B, order: &Order, direction: StockDirection) {
    let expected = match direction {
        StockDirection::Down => OrderStatusType::Successful,
        StockDirection::Up => OrderStatusType::Refunded,
    };
    if order.status != expected {
        warn!(
            "📦️ Refusing to adjust stock {direction} for order [{}]: it is {}, not {expected}",
            order.id, order.status
        );
        return;
    }
    match db.adjust_stock_for_order(order, direction).await {
        Ok(products) => {
            for p in &products {
                debug!(
                    "📦️ Stock for product [{}] ({}) is now {} (available: {})",
                    p.id, p.name, p.stock_quantity, p.available
                );
            }
            info!("📦️ Adjusted stock {direction} for {} product(s) on order [{}]", products.len(), order.id);
        },
        Err(e) => error!("📦️ Could not adjust stock for order [{}]: {e}", order.id),
    }
}

/// Empties the user's cart. Only runs on successful settlement, so an abandoned or failed payment leaves the
/// cart intact for another attempt.
async fn clear_cart<B: CommerceDatabase>(db: &B, order: &Order) {
    match db.clear_cart(&order.user_id).await {
        Ok(0) => debug!("🛒️ Cart for user {} was already empty", order.user_id),
        Ok(n) => info!("🛒️ Cleared {n} item(s) from the cart of user {}", order.user_id),
        Err(e) => error!("🛒️ Could not clear the cart for user {}: {e}", order.user_id),
    }
}

/// Tells the user-facing service that the order changed state, so it can fan the update out to its own
/// clients.
async fn notify_user_service<M: MessageBus>(bus: &M, order: &Order) {
    let notification = UserOrderNotification::from_order(order);
    let payload = match serde_json::to_string(&notification) {
        Ok(p) => p,
        Err(e) => {
            error!("🔔️ Could not serialize the user notification for order [{}]: {e}", order.id);
            return;
        },
    };
    match bus.publish(messages::USER_NOTIFICATION_TOPIC, payload).await {
        Ok(()) => debug!("🔔️ User service notified about order [{}] ({})", order.id, order.status),
        Err(e) => error!("🔔️ Could not notify the user service about order [{}]: {e}", order.id),
    }
}

/// Publishes the order snapshot (status, total and line items) on the order's dedicated real-time channel.
async fn broadcast_order_status<B, M>(db: &B, bus: &M, order: &Order)
where
    B: CommerceDatabase,
    M: MessageBus,
{
    let items = match db.fetch_line_items(&order.id).await {
        Ok(items) => items,
        Err(e) => {
            error!("📡️ Could not load line items for the order [{}] broadcast: {e}", order.id);
            return;
        },
    };
    let snapshot = OrderStatusBroadcast::new(order, items);
    let payload = match serde_json::to_string(&snapshot) {
        Ok(p) => p,
        Err(e) => {
            error!("📡️ Could not serialize the status broadcast for order [{}]: {e}", order.id);
            return;
        },
    };
    let channel = messages::order_status_channel(&order.id, &order.user_id);
    match bus.publish(&channel, payload).await {
        Ok(()) => debug!("📡️ Broadcast {} for order [{}] on {channel}", order.status, order.id),
        Err(e) => error!("📡️ Could not broadcast the status of order [{}]: {e}", order.id),
    }
}

/// Hands the order to the payment service. New orders go out on `payment_order_created`; cancelled orders on
/// `payment_order_cancelled` so the provider can void the payment intent. The current status is also mirrored
/// onto the order's real-time channel so pollers and subscribers see the same state.
pub async fn notify_payment_service<B, M>(db: &B, bus: &M, order: &Order)
where
    B: CommerceDatabase,
    M: MessageBus,
{
    let notice = PaymentOrderNotice::from_order(order);
    let topic = notice.topic();
    match serde_json::to_string(&notice) {
        Ok(payload) => match bus.publish(topic, payload).await {
            Ok(()) => debug!("💳️ Payment service notified on {topic} about order [{}]", order.id),
            Err(e) => error!("💳️ Could not notify the payment service about order [{}]: {e}", order.id),
        },
        Err(e) => error!("💳️ Could not serialize the payment notice for order [{}]: {e}", order.id),
    }
    broadcast_order_status(db, bus, order).await;
}
