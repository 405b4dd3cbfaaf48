use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sf_common::Money;
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------        OrderId        ------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OrderId {
    /// Generates a fresh random order id.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   OrderStatusType     ------------------------------------------------------
/// The six states an order can be in. The enum itself carries no transition logic; the
/// [`lifecycle`](crate::lifecycle) module is the single source of truth for which transitions are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// The order has been created at checkout and the payment service has not yet acknowledged it.
    Pending,
    /// The payment service has acknowledged the order and payment is underway.
    Processing,
    /// Payment completed; the order has been (or is being) settled.
    Successful,
    /// Payment failed.
    Failed,
    /// The order was cancelled by the user while still pending.
    Cancelled,
    /// A successful order was refunded and its stock restored.
    Refunded,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "pending"),
            OrderStatusType::Processing => write!(f, "processing"),
            OrderStatusType::Successful => write!(f, "successful"),
            OrderStatusType::Failed => write!(f, "failed"),
            OrderStatusType::Cancelled => write!(f, "cancelled"),
            OrderStatusType::Refunded => write!(f, "refunded"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "successful" => Ok(Self::Successful),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

impl OrderStatusType {
    pub const ALL: [OrderStatusType; 6] = [
        OrderStatusType::Pending,
        OrderStatusType::Processing,
        OrderStatusType::Successful,
        OrderStatusType::Failed,
        OrderStatusType::Cancelled,
        OrderStatusType::Refunded,
    ];
}

//--------------------------------------    RequestContext     ------------------------------------------------------
/// The tenant/user triple that scopes every synchronous request. Authentication against the identity service
/// happens upstream; by the time a request reaches the engine these ids are taken at face value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub user_id: String,
    pub app_id: String,
    pub developer_id: String,
}

impl RequestContext {
    pub fn new<S1, S2, S3>(user_id: S1, app_id: S2, developer_id: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self { user_id: user_id.into(), app_id: app_id.into(), developer_id: developer_id.into() }
    }
}

//--------------------------------------        Order        --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: String,
    pub developer_id: String,
    pub app_id: String,
    pub total_amount: Money,
    pub status: OrderStatusType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      NewOrder       --------------------------------------------------------
/// An order as it is handed to the store for insertion. Orders are always inserted in `pending` status; every
/// other status is reached through an explicit lifecycle transition.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: String,
    pub developer_id: String,
    pub app_id: String,
    pub total_amount: Money,
}

impl NewOrder {
    pub fn new(ctx: &RequestContext, total_amount: Money) -> Self {
        Self {
            user_id: ctx.user_id.clone(),
            developer_id: ctx.developer_id.clone(),
            app_id: ctx.app_id.clone(),
            total_amount,
        }
    }
}

//--------------------------------------      OrderItem      --------------------------------------------------------
/// A single line of an order. `price_at_purchase` is a snapshot of the product price taken at checkout time and
/// never changes afterwards, no matter what happens to the live catalog price.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: String,
    pub quantity: i64,
    pub price_at_purchase: Money,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------      LineItem       --------------------------------------------------------
/// An order line joined with its product name, as reported on the real-time order status channel.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: i64,
}

//--------------------------------------      Product        --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: Money,
    pub stock_quantity: i64,
    pub available: bool,
    pub app_id: String,
    pub developer_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------        Cart         --------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct Cart {
    pub id: i64,
    pub user_id: String,
    pub app_id: String,
    pub developer_id: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------      CartLine       --------------------------------------------------------
/// A cart item joined with the live product record, as read at checkout time. The price here is the live catalog
/// price, which checkout snapshots into [`OrderItem::price_at_purchase`].
#[derive(Debug, Clone, FromRow)]
pub struct CartLine {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub price: Money,
}
