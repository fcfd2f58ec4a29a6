//! Adapts the Razorpay REST client to the engine's [`PaymentProvider`] contract.
use dishdash_engine::traits::{GatewayOrder, GatewayPayment, NewGatewayOrder, PaymentProvider, PaymentProviderError};
use log::*;
use razorpay_tools::{NewRazorpayOrder, RazorpayApi, RazorpayApiError, RazorpayConfig};

use crate::errors::ServerError;

#[derive(Clone)]
pub struct RazorpayProvider {
    api: RazorpayApi,
}

impl std::fmt::Debug for RazorpayProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RazorpayProvider({})", self.api.key_id())
    }
}

impl RazorpayProvider {
    pub fn new(config: RazorpayConfig) -> Result<Self, ServerError> {
        let api = RazorpayApi::new(config).map_err(|e| ServerError::InitializeError(e.to_string()))?;
        Ok(Self { api })
    }

    /// The public key id, which the client needs to open the gateway's checkout.
    pub fn key_id(&self) -> &str {
        self.api.key_id()
    }
}

fn provider_error(e: RazorpayApiError, subject: &str) -> PaymentProviderError {
    match e {
        e if e.is_transport_error() => PaymentProviderError::Unavailable(e.to_string()),
        RazorpayApiError::QueryError { status: 404, .. } => PaymentProviderError::NotFound(subject.to_string()),
        e => PaymentProviderError::Rejected(e.to_string()),
    }
}

impl PaymentProvider for RazorpayProvider {
    async fn create_order(&self, order: NewGatewayOrder) -> Result<GatewayOrder, PaymentProviderError> {
        let request = NewRazorpayOrder::new(order.amount, &order.currency, &order.receipt);
        let created = self.api.create_order(&request).await.map_err(|e| {
            warn!("💳️ Could not create Razorpay order for receipt {}. {e}", order.receipt);
            provider_error(e, &order.receipt)
        })?;
        Ok(GatewayOrder {
            id: created.id,
            amount: created.amount,
            currency: created.currency,
            receipt: created.receipt,
            status: created.status,
        })
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment, PaymentProviderError> {
        let payment = self.api.fetch_payment(payment_id).await.map_err(|e| provider_error(e, payment_id))?;
        Ok(GatewayPayment {
            id: payment.id,
            order_id: payment.order_id,
            amount: payment.amount,
            currency: payment.currency,
            status: payment.status,
        })
    }
}
