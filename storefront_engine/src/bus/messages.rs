//! Topic names and wire payloads exchanged with the payment service, the user service and real-time clients.
//!
//! All payloads are JSON. The inbound `payment_status` payload is intentionally minimal; everything else the
//! engine needs it looks up from its own store, so a malformed or stale message can never inject data.
use serde::{Deserialize, Serialize};
use sf_common::Money;

use crate::db_types::{LineItem, Order, OrderId, OrderStatusType};

/// Inbound: payment-provider status events.
pub const PAYMENT_STATUS_TOPIC: &str = "payment_status";
/// Outbound: a new order is awaiting payment.
pub const PAYMENT_ORDER_CREATED_TOPIC: &str = "payment_order_created";
/// Outbound: a pending order was cancelled before payment.
pub const PAYMENT_ORDER_CANCELLED_TOPIC: &str = "payment_order_cancelled";
/// Outbound: order status notifications for the user service.
pub const USER_NOTIFICATION_TOPIC: &str = "user_order_notification";
/// Inbound: the payment service asking us to confirm an order exists and belongs to the given tenant/user.
pub const VALIDATE_ORDER_TOPIC: &str = "validate_order";
/// Outbound: replies to `validate_order` requests that failed validation.
pub const INVALID_ORDER_TOPIC: &str = "invalid_order";

/// The real-time channel key for one order's status updates.
pub fn order_status_channel(order_id: &OrderId, user_id: &str) -> String {
    format!("order_status_id:{order_id}_user:{user_id}")
}

//-------------------------------------- PaymentStatusUpdate --------------------------------------------------------
/// `{"order_id": ..., "status": ...}` as delivered on [`PAYMENT_STATUS_TOPIC`]. The status is kept as a raw
/// string here; mapping it onto a [`PaymentEvent`](crate::lifecycle::PaymentEvent) happens in the flow API so
/// that unknown statuses can be logged with their original spelling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusUpdate {
    pub order_id: OrderId,
    pub status: String,
}

//-------------------------------------- PaymentOrderNotice --------------------------------------------------------
/// Published to the payment service when an order is created or cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOrderNotice {
    pub order_id: OrderId,
    pub user_id: String,
    pub app_id: String,
    pub total: Money,
    pub status: OrderStatusType,
    pub developer_id: String,
}

impl PaymentOrderNotice {
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id.clone(),
            user_id: order.user_id.clone(),
            app_id: order.app_id.clone(),
            total: order.total_amount,
            status: order.status,
            developer_id: order.developer_id.clone(),
        }
    }

    /// The topic this notice belongs on, based on the order status it carries.
    pub fn topic(&self) -> &'static str {
        if self.status == OrderStatusType::Cancelled {
            PAYMENT_ORDER_CANCELLED_TOPIC
        } else {
            PAYMENT_ORDER_CREATED_TOPIC
        }
    }
}

//-------------------------------------- UserOrderNotification -----------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserOrderNotification {
    pub order_id: OrderId,
    pub user_id: String,
    pub status: OrderStatusType,
    pub total_amount: Money,
}

impl UserOrderNotification {
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id.clone(),
            user_id: order.user_id.clone(),
            status: order.status,
            total_amount: order.total_amount,
        }
    }
}

//-------------------------------------- OrderStatusBroadcast ------------------------------------------------------
/// Pushed to the per-order real-time channel so connected clients see status changes live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusBroadcast {
    pub order_id: OrderId,
    pub status: OrderStatusType,
    pub total: Money,
    pub items: Vec<LineItem>,
}

impl OrderStatusBroadcast {
    pub fn new(order: &Order, items: Vec<LineItem>) -> Self {
        Self { order_id: order.id.clone(), status: order.status, total: order.total_amount, items }
    }
}

//-------------------------------------- OrderValidationRequest ----------------------------------------------------
/// The payment service's request to confirm that an order exists and belongs to the stated tenant and user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderValidationRequest {
    pub order_id: OrderId,
    pub user_id: String,
    pub app_id: String,
    pub developer_id: String,
}

//--------------------------------------  InvalidOrderNotice  ------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidOrderNotice {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
}
