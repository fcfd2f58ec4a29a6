use dd_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderItem, PaymentRoute};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGatewayOrder {
    pub amount: Money,
    pub currency: String,
    pub receipt: String,
}

/// A payment intent as the gateway reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: Money,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: String,
}

/// The gateway's authoritative record of a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    pub order_id: Option<String>,
    pub amount: Money,
    pub currency: String,
    pub status: String,
}

/// Everything written by a successful order placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub route: PaymentRoute,
}
