use dd_common::Money;
use thiserror::Error;

use crate::{
    db_types::OrderStatusType,
    session::SessionError,
    traits::{
        AvailabilityError,
        CatalogError,
        OrderManagementError,
        PaymentProviderError,
        PaymentRecordError,
    },
    AuthApiError,
};

/// Message used wherever a missing row and a row the caller does not own must be indistinguishable.
pub const ACCESS_DENIED: &str = "The resource does not exist or you do not have access to it";

#[derive(Debug, Clone, Error)]
pub enum CartApiError {
    #[error("{}", ACCESS_DENIED)]
    AccessDenied,
    #[error("Menu item {0} does not exist")]
    ItemNotFound(i64),
    #[error("{0}")]
    Session(#[from] SessionError),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[derive(Debug, Clone, Error)]
pub enum AvailabilityApiError {
    #[error("{}", ACCESS_DENIED)]
    AccessDenied,
    #[error("Select a restaurant and add at least one item to your cart first")]
    EmptyCart,
    #[error("Availability request {0} has already been answered")]
    RequestAlreadyResolved(i64),
    #[error("{0}")]
    Session(#[from] SessionError),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("{}", ACCESS_DENIED)]
    AccessDenied,
    #[error("A delivery address and phone number are required")]
    MissingDeliveryDetails,
    #[error("Cannot place order: {0}")]
    CannotPlaceOrder(String),
    #[error("The amount paid ({paid}) does not match the order total ({expected})")]
    PaymentAmountMismatch { expected: Money, paid: Money },
    #[error("The order is already {0}")]
    StatusUnchanged(OrderStatusType),
    #[error("An order cannot move from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatusType, to: OrderStatusType },
    #[error("{0}")]
    Session(#[from] SessionError),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[derive(Debug, Clone, Error)]
pub enum PaymentApiError {
    #[error("{}", ACCESS_DENIED)]
    AccessDenied,
    #[error("Payment amount must be positive, not {0}")]
    InvalidAmount(Money),
    #[error("The order total ({amount}) is less than the platform fee ({fee})")]
    BelowPlatformFee { amount: Money, fee: Money },
    #[error("Payment verification failed, please contact support")]
    VerificationFailed,
    #[error("Payment intent {0} has already been used. Start a new checkout")]
    IntentAlreadyUsed(String),
    #[error("The amount paid ({paid}) does not match the amount requested ({expected})")]
    AmountMismatch { expected: Money, paid: Money },
    #[error("Payment {0} has not completed")]
    PaymentNotCompleted(String),
    #[error("{0}")]
    Gateway(#[from] PaymentProviderError),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Payment(#[from] PaymentApiError),
    #[error(transparent)]
    Order(#[from] OrderFlowError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

//--------------------------------------   Conversions         ---------------------------------------------------------

impl From<CatalogError> for CartApiError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::DatabaseError(s) => Self::DatabaseError(s),
        }
    }
}

impl From<AvailabilityError> for CartApiError {
    fn from(e: AvailabilityError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

impl From<CatalogError> for AvailabilityApiError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::DatabaseError(s) => Self::DatabaseError(s),
        }
    }
}

impl From<AvailabilityError> for AvailabilityApiError {
    fn from(e: AvailabilityError) -> Self {
        match e {
            AvailabilityError::DatabaseError(s) => Self::DatabaseError(s),
            AvailabilityError::RequestNotFound(_) => Self::AccessDenied,
            AvailabilityError::RequestAlreadyResolved(id) => Self::RequestAlreadyResolved(id),
            AvailabilityError::EmptyRequest => Self::EmptyCart,
            AvailabilityError::InvalidResponseStatus(s) => Self::DatabaseError(format!("invalid response status {s}")),
        }
    }
}

impl From<CatalogError> for OrderFlowError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::DatabaseError(s) => Self::DatabaseError(s),
        }
    }
}

impl From<AvailabilityError> for OrderFlowError {
    fn from(e: AvailabilityError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

impl From<AuthApiError> for OrderFlowError {
    fn from(e: AuthApiError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

impl From<OrderManagementError> for OrderFlowError {
    fn from(e: OrderManagementError) -> Self {
        match e {
            OrderManagementError::DatabaseError(s) => Self::DatabaseError(s),
            OrderManagementError::OrderNotFound(_) => Self::AccessDenied,
            OrderManagementError::AvailabilityAlreadyUsed(id) => {
                Self::CannotPlaceOrder(format!("availability confirmation {id} has already been used for an order"))
            },
            OrderManagementError::PaymentAlreadyUsed(id) => {
                Self::CannotPlaceOrder(format!("payment {id} has already been used for an order"))
            },
        }
    }
}

impl From<PaymentRecordError> for PaymentApiError {
    fn from(e: PaymentRecordError) -> Self {
        match e {
            PaymentRecordError::DatabaseError(s) => Self::DatabaseError(s),
            PaymentRecordError::IntentNotFound(_) => Self::VerificationFailed,
            PaymentRecordError::IntentAlreadyExists(id) => Self::DatabaseError(format!("duplicate intent {id}")),
            PaymentRecordError::IntentStatusConflict { intent_id, .. } => Self::IntentAlreadyUsed(intent_id),
        }
    }
}
