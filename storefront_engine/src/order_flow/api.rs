use std::fmt::Debug;

use log::*;

use crate::{
    bus::MessageBus,
    db_types::{Order, OrderId, OrderStatusType, RequestContext},
    lifecycle,
    lifecycle::TransitionError,
    order_flow::settlement,
    traits::{CommerceDatabase, OrderFlowError},
};

/// `OrderFlowApi` is the primary API for the order lifecycle. The synchronous paths (checkout, cancel) are
/// called from the HTTP layer; `apply_payment_event` is driven by the payment status listener.
///
/// Every status change funnels through the [`lifecycle`] table plus the store's conditional update, so the
/// legality rules and the idempotency guarantee hold no matter which path a change arrives on.
pub struct OrderFlowApi<B, M> {
    db: B,
    bus: M,
}

impl<B, M> Debug for OrderFlowApi<B, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B, M> OrderFlowApi<B, M> {
    pub fn new(db: B, bus: M) -> Self {
        Self { db, bus }
    }
}

impl<B, M> OrderFlowApi<B, M>
where
    B: CommerceDatabase,
    M: MessageBus,
{
    /// Converts the user's cart into a pending order.
    ///
    /// Preconditions: the cart must be non-empty, and the user must not already have an order in `pending` or
    /// `processing` state. Violations fail with [`OrderFlowError::EmptyCart`] and
    /// [`OrderFlowError::PendingOrderExists`] respectively, without mutating anything.
    ///
    /// On success the order and its items are committed in a single transaction, and the payment service is
    /// notified that the order awaits payment. The notification is best-effort: a publish failure is logged
    /// but does not fail the checkout, since the order is already durable and the payment service can re-poll
    /// via `validate_order`. The cart is left as-is; it is only cleared once payment settles.
    pub async fn checkout(&self, ctx: &RequestContext) -> Result<Order, OrderFlowError> {
        let lines = self.db.fetch_cart_lines(&ctx.user_id, &ctx.app_id).await?;
        if lines.is_empty() {
            return Err(OrderFlowError::EmptyCart);
        }
        let order = self.db.create_order_from_cart(ctx, &lines).await?;
        info!("🛒️ Order [{}] created for user {} with total {}", order.id, order.user_id, order.total_amount);
        self.notify_payment_service(&order).await;
        Ok(order)
    }

    /// Cancels a pending order on the user's request.
    ///
    /// Cancellation is only legal while the order is `pending`; anything further along fails with
    /// [`OrderFlowError::NotCancellable`] carrying the current status. The status flip is a conditional
    /// update, so a payment event racing with the cancellation cannot produce a double transition: whichever
    /// writer lands first wins, and the loser observes the new state.
    pub async fn cancel_order(&self, ctx: &RequestContext, order_id: &OrderId) -> Result<Order, OrderFlowError> {
        let order = self
            .db
            .fetch_order_for_user(order_id, ctx)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        let transition = lifecycle::cancel(order.status).map_err(|e| match e {
            TransitionError::NotCancellable { current } | TransitionError::NoOp(current) => {
                OrderFlowError::NotCancellable { order_id: order_id.clone(), current }
            },
        })?;
        let updated = self
            .db
            .update_order_status_if(order_id, transition.new_status, &[OrderStatusType::Pending])
            .await?;
        match updated {
            Some(order) => {
                info!("🛒️ Order [{}] cancelled by user {}", order.id, order.user_id);
                settlement::run(&self.db, &self.bus, &order, &transition.effects).await;
                Ok(order)
            },
            None => {
                // Lost a race with a payment event; report whatever state the order is in now.
                let current = self.db.fetch_order(order_id).await?.map(|o| o.status).unwrap_or(order.status);
                Err(OrderFlowError::NotCancellable { order_id: order_id.clone(), current })
            },
        }
    }

    /// Applies a payment-provider event to an order.
    ///
    /// Returns the updated order, or `Ok(None)` when the event was a duplicate delivery (the order is already
    /// in the target status) — in that case no settlement side effect runs, which is what keeps stock
    /// adjustment, notifications and broadcasts at exactly one occurrence per status change.
    ///
    /// Unknown status strings and unknown order ids are errors; callers on the listener path log and drop
    /// them.
    pub async fn apply_payment_event(
        &self,
        order_id: &OrderId,
        status: &str,
    ) -> Result<Option<Order>, OrderFlowError> {
        let event = status
            .parse::<lifecycle::PaymentEvent>()
            .map_err(|_| OrderFlowError::UnknownPaymentStatus(status.to_string()))?;
        let order =
            self.db.fetch_order(order_id).await?.ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        let transition = match lifecycle::apply(order.status, event) {
            Ok(t) => t,
            Err(TransitionError::NoOp(status)) => {
                debug!("🔄️ Order [{order_id}] is already {status}; duplicate '{event}' event dropped");
                return Ok(None);
            },
            Err(e @ TransitionError::NotCancellable { .. }) => {
                // `apply` never yields this variant; log it rather than crash the listener if that changes.
                error!("🔄️ Unexpected transition error for order [{order_id}]: {e}");
                return Ok(None);
            },
        };
        let allowed = lifecycle::accepted_from(transition.new_status);
        match self.db.update_order_status_if(order_id, transition.new_status, &allowed).await? {
            Some(order) => {
                info!("🔄️ Order [{}] moved to {} on '{event}' event", order.id, order.status);
                settlement::run(&self.db, &self.bus, &order, &transition.effects).await;
                Ok(Some(order))
            },
            None => {
                debug!("🔄️ Order [{order_id}] was already {}; '{event}' event dropped", transition.new_status);
                Ok(None)
            },
        }
    }

    /// Fetches an order on behalf of a user, for the synchronous polling endpoint.
    pub async fn order_for_user(&self, ctx: &RequestContext, order_id: &OrderId) -> Result<Order, OrderFlowError> {
        self.db
            .fetch_order_for_user(order_id, ctx)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))
    }

    /// Publishes the order to the payment service (`payment_order_created`, or `payment_order_cancelled` for a
    /// cancelled order) and mirrors the status onto the real-time channel. Best-effort on both counts.
    pub async fn notify_payment_service(&self, order: &Order) {
        settlement::notify_payment_service(&self.db, &self.bus, order).await;
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

impl<B: Clone, M: Clone> Clone for OrderFlowApi<B, M> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), bus: self.bus.clone() }
    }
}
