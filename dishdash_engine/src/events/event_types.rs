use serde::{Deserialize, Serialize};

use crate::db_types::{AvailabilityStatus, Order, OrderStatusType};

//--------------------------------------   Fabric events       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Inserted,
    Updated,
    Deleted,
}

/// A row-level change notification. Events identify the changed row and the parties it concerns; they are not a
/// substitute for reading the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "table", rename_all = "snake_case")]
pub enum ChangeEvent {
    Order { kind: ChangeKind, order_id: i64, customer_id: i64, restaurant_id: i64 },
    Availability {
        kind: ChangeKind,
        request_id: i64,
        customer_id: i64,
        restaurant_id: i64,
        status: Option<AvailabilityStatus>,
    },
}

impl ChangeEvent {
    pub fn order(kind: ChangeKind, order: &Order) -> Self {
        Self::Order { kind, order_id: order.id, customer_id: order.customer_id, restaurant_id: order.restaurant_id }
    }

    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeEvent::Order { kind, .. } | ChangeEvent::Availability { kind, .. } => *kind,
        }
    }
}

//--------------------------------------   Hook events         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPlacedEvent {
    pub order: Order,
    pub gateway_payment_id: String,
}

impl OrderPlacedEvent {
    pub fn new(order: Order, gateway_payment_id: String) -> Self {
        Self { order, gateway_payment_id }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub order: Order,
    pub old_status: OrderStatusType,
}

impl OrderStatusChangedEvent {
    pub fn new(order: Order, old_status: OrderStatusType) -> Self {
        Self { order, old_status }
    }

    pub fn new_status(&self) -> OrderStatusType {
        self.order.status
    }
}
