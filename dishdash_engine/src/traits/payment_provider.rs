use thiserror::Error;

use crate::traits::{GatewayOrder, GatewayPayment, NewGatewayOrder};

#[derive(Debug, Clone, Error)]
pub enum PaymentProviderError {
    #[error("The payment gateway could not be reached: {0}")]
    Unavailable(String),
    #[error("The payment gateway rejected the request: {0}")]
    Rejected(String),
    #[error("The payment gateway has no record of {0}")]
    NotFound(String),
}

/// The external payment gateway. Only two calls are needed: creating an intent, and fetching the authoritative
/// record of a payment.
#[allow(async_fn_in_trait)]
pub trait PaymentProvider {
    async fn create_order(&self, order: NewGatewayOrder) -> Result<GatewayOrder, PaymentProviderError>;

    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment, PaymentProviderError>;
}
