use thiserror::Error;

use crate::{
    db_types::{NewOrder, NewPaymentRoute, Order, OrderItem, OrderStatusType, PaymentRoute},
    order_objects::OrderQueryFilter,
    traits::PlacedOrder,
};

#[derive(Debug, Clone, Error)]
pub enum OrderManagementError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Availability request {0} has already been used for an order")]
    AvailabilityAlreadyUsed(i64),
    #[error("Payment {0} has already been used for an order")]
    PaymentAlreadyUsed(String),
}

impl From<sqlx::Error> for OrderManagementError {
    fn from(e: sqlx::Error) -> Self {
        OrderManagementError::DatabaseError(e.to_string())
    }
}

/// The order ledger. Orders are appended together with their items and payment route, and afterwards only their
/// status (and estimate) ever changes.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Writes the order, its items and its payment route in one transaction.
    async fn insert_order(&self, order: NewOrder, route: NewPaymentRoute) -> Result<PlacedOrder, OrderManagementError>;

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, OrderManagementError>;

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderManagementError>;

    async fn fetch_payment_route(&self, order_id: i64) -> Result<Option<PaymentRoute>, OrderManagementError>;

    /// Orders matching the filter, newest first.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderManagementError>;

    /// Overwrites the order status. No transition rules are applied at this level.
    async fn update_order_status(&self, order_id: i64, status: OrderStatusType) -> Result<Order, OrderManagementError>;
}
