use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::db_types::{DisplayStatus, FeeSplit, Order, OrderItem, OrderStatusType};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderQueryFilter {
    pub customer_id: Option<i64>,
    pub restaurant_ids: Option<Vec<i64>>,
    pub statuses: Option<Vec<OrderStatusType>>,
    pub limit: Option<u32>,
}

impl OrderQueryFilter {
    pub fn with_customer_id(mut self, customer_id: i64) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn with_restaurant_ids(mut self, ids: Vec<i64>) -> Self {
        self.restaurant_ids = Some(ids);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.statuses.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// True if the filter has no WHERE conditions. `limit` does not count.
    pub fn is_empty(&self) -> bool {
        self.customer_id.is_none() &&
            self.restaurant_ids.is_none() &&
            self.statuses.as_ref().map_or(true, |s| s.is_empty())
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "All orders");
        }
        if let Some(id) = self.customer_id {
            write!(f, "customer_id: {id}. ")?;
        }
        if let Some(ids) = &self.restaurant_ids {
            write!(f, "restaurant_ids: {ids:?}. ")?;
        }
        if let Some(statuses) = &self.statuses {
            let s = statuses.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(",");
            write!(f, "statuses: {s}. ")?;
        }
        Ok(())
    }
}

/// Where the order should go. Both fields are required and may not be blank.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryDetails {
    pub address: String,
    pub phone: String,
}

impl DeliveryDetails {
    pub fn new<S: Into<String>>(address: S, phone: S) -> Self {
        Self { address: address.into(), phone: phone.into() }
    }

    pub fn is_complete(&self) -> bool {
        !self.address.trim().is_empty() && !self.phone.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderStatusView {
    pub order_id: i64,
    pub status: OrderStatusType,
    pub display_status: DisplayStatus,
    pub label: String,
}

impl OrderStatusView {
    pub fn new(order_id: i64, status: OrderStatusType) -> Self {
        let display_status = status.display_status();
        Self { order_id, status, display_status, label: display_status.label().to_string() }
    }
}

/// The result of a completed checkout, as returned to the customer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutReceipt {
    pub success: bool,
    pub splits: FeeSplit,
    pub order: Order,
    pub items: Vec<OrderItem>,
}
