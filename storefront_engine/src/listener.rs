//! Broker-driven workers.
//!
//! [`PaymentStatusListener`] consumes payment-provider events from the `payment_status` topic and drives them
//! through the [`OrderFlowApi`]. [`OrderValidationListener`] answers the payment service's `validate_order`
//! requests. Both run as long-lived tasks, resubscribe with an exponential-free fixed delay when the broker
//! connection drops, and never let a bad message take them down: decode and handler failures are logged and
//! the next message is awaited.
use std::time::Duration;

use log::*;
use tokio::sync::watch;

use crate::{
    bus::{
        messages,
        messages::{InvalidOrderNotice, OrderValidationRequest, PaymentStatusUpdate},
        MessageBus,
        Subscription,
    },
    db_types::RequestContext,
    order_flow::{settlement, OrderFlowApi},
    traits::{CommerceDatabase, OrderFlowError},
};

const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

//-------------------------------------- PaymentStatusListener -----------------------------------------------------

/// Consumes `payment_status` events and applies them to orders.
///
/// Messages on a topic are handled one at a time, so two events for the same order delivered back to back are
/// applied in sequence. A second listener process is still safe: the conditional status update in the store
/// means only one of any pair of racing writers performs the transition and its side effects.
pub struct PaymentStatusListener<B, M> {
    api: OrderFlowApi<B, M>,
    bus: M,
    shutdown: watch::Receiver<bool>,
    reconnect_delay: Duration,
}

impl<B, M> PaymentStatusListener<B, M>
where
    B: CommerceDatabase,
    M: MessageBus,
{
    pub fn new(api: OrderFlowApi<B, M>, bus: M, shutdown: watch::Receiver<bool>) -> Self {
        Self { api, bus, shutdown, reconnect_delay: DEFAULT_RECONNECT_DELAY }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub async fn run(mut self) {
        info!("📡️ Payment status listener starting on '{}'", messages::PAYMENT_STATUS_TOPIC);
        loop {
            let mut sub = match self.bus.subscribe(messages::PAYMENT_STATUS_TOPIC).await {
                Ok(sub) => sub,
                Err(e) => {
                    warn!("📡️ Could not subscribe to '{}': {e}. Retrying shortly.", messages::PAYMENT_STATUS_TOPIC);
                    if wait_or_shutdown(&mut self.shutdown, self.reconnect_delay).await {
                        break;
                    }
                    continue;
                },
            };
            loop {
                tokio::select! {
                    biased;
                    _ = self.shutdown.changed() => {
                        info!("📡️ Payment status listener shutting down");
                        return;
                    },
                    msg = sub.next_message() => match msg {
                        Ok(Some(payload)) => handle_payment_status(&self.api, &payload).await,
                        Ok(None) => {
                            warn!("📡️ '{}' subscription closed. Resubscribing.", messages::PAYMENT_STATUS_TOPIC);
                            break;
                        },
                        Err(e) => {
                            warn!("📡️ '{}' subscription failed: {e}. Resubscribing.", messages::PAYMENT_STATUS_TOPIC);
                            break;
                        },
                    },
                }
            }
            if wait_or_shutdown(&mut self.shutdown, self.reconnect_delay).await {
                break;
            }
        }
        info!("📡️ Payment status listener shutting down");
    }
}

/// Decodes and applies one `payment_status` message. All failure modes are terminal for the message only.
async fn handle_payment_status<B, M>(api: &OrderFlowApi<B, M>, payload: &str)
where
    B: CommerceDatabase,
    M: MessageBus,
{
    let update = match decode_payment_status(payload) {
        Ok(update) => update,
        Err(e) => {
            warn!("📡️ Dropping undecodable payment status message: {e}. Payload: {payload}");
            return;
        },
    };
    debug!("📡️ Payment status '{}' received for order [{}]", update.status, update.order_id);
    match api.apply_payment_event(&update.order_id, &update.status).await {
        Ok(Some(order)) => {
            trace!("📡️ Order [{}] is now {}", order.id, order.status);
        },
        Ok(None) => {
            trace!("📡️ Payment status '{}' for order [{}] was a duplicate", update.status, update.order_id);
        },
        Err(e @ OrderFlowError::OrderNotFound(_)) | Err(e @ OrderFlowError::UnknownPaymentStatus(_)) => {
            warn!("📡️ Dropping payment status message: {e}");
        },
        Err(e) => {
            error!("📡️ Could not apply payment status '{}' to order [{}]: {e}", update.status, update.order_id);
        },
    }
}

pub fn decode_payment_status(payload: &str) -> Result<PaymentStatusUpdate, serde_json::Error> {
    serde_json::from_str(payload)
}

//-------------------------------------- OrderValidationListener ---------------------------------------------------

/// Answers `validate_order` requests from the payment service.
///
/// A request names an order together with the user, app and developer it is supposed to belong to. If the
/// order does not exist, or exists under a different owner, an [`InvalidOrderNotice`] is published on
/// `invalid_order` so the payment service can abort the payment intent. Valid orders produce no reply.
pub struct OrderValidationListener<B, M> {
    db: B,
    bus: M,
    shutdown: watch::Receiver<bool>,
    reconnect_delay: Duration,
}

impl<B, M> OrderValidationListener<B, M>
where
    B: CommerceDatabase,
    M: MessageBus,
{
    pub fn new(db: B, bus: M, shutdown: watch::Receiver<bool>) -> Self {
        Self { db, bus, shutdown, reconnect_delay: DEFAULT_RECONNECT_DELAY }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub async fn run(mut self) {
        info!("📡️ Order validation listener starting on '{}'", messages::VALIDATE_ORDER_TOPIC);
        loop {
            let mut sub = match self.bus.subscribe(messages::VALIDATE_ORDER_TOPIC).await {
                Ok(sub) => sub,
                Err(e) => {
                    warn!("📡️ Could not subscribe to '{}': {e}. Retrying shortly.", messages::VALIDATE_ORDER_TOPIC);
                    if wait_or_shutdown(&mut self.shutdown, self.reconnect_delay).await {
                        break;
                    }
                    continue;
                },
            };
            loop {
                tokio::select! {
                    biased;
                    _ = self.shutdown.changed() => {
                        info!("📡️ Order validation listener shutting down");
                        return;
                    },
                    msg = sub.next_message() => match msg {
                        Ok(Some(payload)) => handle_validation_request(&self.db, &self.bus, &payload).await,
                        Ok(None) => {
                            warn!("📡️ '{}' subscription closed. Resubscribing.", messages::VALIDATE_ORDER_TOPIC);
                            break;
                        },
                        Err(e) => {
                            warn!("📡️ '{}' subscription failed: {e}. Resubscribing.", messages::VALIDATE_ORDER_TOPIC);
                            break;
                        },
                    },
                }
            }
            if wait_or_shutdown(&mut self.shutdown, self.reconnect_delay).await {
                break;
            }
        }
        info!("📡️ Order validation listener shutting down");
    }
}

async fn handle_validation_request<B, M>(db: &B, bus: &M, payload: &str)
where
    B: CommerceDatabase,
    M: MessageBus,
{
    let request: OrderValidationRequest = match serde_json::from_str(payload) {
        Ok(request) => request,
        Err(e) => {
            warn!("📡️ Dropping undecodable validation request: {e}. Payload: {payload}");
            return;
        },
    };
    let ctx = RequestContext::new(&request.user_id, &request.app_id, &request.developer_id);
    let notice = match db.fetch_order_for_user(&request.order_id, &ctx).await {
        Ok(Some(order)) => {
            debug!("📡️ Order [{}] validated for user {}", order.id, order.user_id);
            // The payment service lost track of the order; hand it over again.
            settlement::notify_payment_service(db, bus, &order).await;
            return;
        },
        Ok(None) => InvalidOrderNotice {
            error: format!("Order {} does not exist for this user", request.order_id),
            order_id: Some(request.order_id.clone()),
        },
        Err(e) => {
            error!("📡️ Could not validate order [{}]: {e}", request.order_id);
            return;
        },
    };
    info!("📡️ Order [{}] failed validation: {}", request.order_id, notice.error);
    let payload = match serde_json::to_string(&notice) {
        Ok(p) => p,
        Err(e) => {
            error!("📡️ Could not serialize the invalid-order notice for [{}]: {e}", request.order_id);
            return;
        },
    };
    if let Err(e) = bus.publish(messages::INVALID_ORDER_TOPIC, payload).await {
        error!("📡️ Could not publish the invalid-order notice for [{}]: {e}", request.order_id);
    }
}

/// Sleeps for `delay`, returning `true` if shutdown was signalled in the meantime.
async fn wait_or_shutdown(shutdown: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    tokio::select! {
        _ = shutdown.changed() => true,
        _ = tokio::time::sleep(delay) => false,
    }
}
