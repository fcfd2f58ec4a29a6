//! # Checkout
//!
//! The server-owned saga that turns a confirmed cart into a paid order. The client never calls "place order"
//! directly: it can only submit the gateway's payment confirmation, and the server verifies it and places the order in
//! the same request.
use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{CurrentUser, PaymentIntent},
    dd_api::{
        errors::{CheckoutError, OrderFlowError},
        order_flow_api::OrderFlowApi,
        order_objects::{CheckoutReceipt, DeliveryDetails},
        payment_api::PaymentApi,
    },
    session::SharedSession,
    traits::{AuthManagement, AvailabilityManagement, CatalogManagement, OrderManagement, PaymentManagement, PaymentProvider},
};

/// What the client submits once the gateway's checkout has completed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentConfirmation {
    pub payment_id: String,
    pub intent_id: String,
    pub signature: String,
}

pub struct CheckoutApi<B, G> {
    payments: PaymentApi<B, G>,
    orders: OrderFlowApi<B>,
    currency: String,
}

impl<B, G> Debug for CheckoutApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi({})", self.currency)
    }
}

impl<B, G> CheckoutApi<B, G> {
    pub fn new(payments: PaymentApi<B, G>, orders: OrderFlowApi<B>, currency: &str) -> Self {
        Self { payments, orders, currency: currency.to_string() }
    }

    pub fn payments(&self) -> &PaymentApi<B, G> {
        &self.payments
    }

    pub fn orders(&self) -> &OrderFlowApi<B> {
        &self.orders
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }
}

impl<B, G> CheckoutApi<B, G>
where
    B: OrderManagement + AvailabilityManagement + CatalogManagement + AuthManagement + PaymentManagement,
    G: PaymentProvider,
{
    /// Creates a payment intent for the session's cart total. The cart must already be confirmed by the restaurant.
    pub async fn start_checkout(
        &self,
        user: &CurrentUser,
        session: &SharedSession,
    ) -> Result<PaymentIntent, CheckoutError> {
        let session = session.lock().await;
        if session.is_placing_order() {
            return Err(crate::session::SessionError::CheckoutInProgress.into());
        }
        self.orders.check_cart_confirmed(user, &session).await?;
        let total = session.cart().total();
        let intent = self.payments.create_intent(user, total, &self.currency, None).await?;
        Ok(intent)
    }

    /// Verifies the payment and places the order.
    ///
    /// Order preconditions are checked before the payment is verified, so a cart that cannot be ordered never
    /// consumes a payment intent. This includes the intent's amount: an intent created for an earlier version of the
    /// cart is refused and left untouched. While verification runs the session's checkout flag is raised: cart edits and a
    /// second checkout for the same session are refused.
    pub async fn complete_checkout(
        &self,
        user: &CurrentUser,
        session: &SharedSession,
        confirmation: PaymentConfirmation,
        details: DeliveryDetails,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        {
            let mut s = session.lock().await;
            let order = self.orders.prepare_order(user, &s, &details).await?;
            if let Some(intent) = self.payments.intent_for(user, &confirmation.intent_id).await? {
                if intent.amount != order.total {
                    warn!(
                        "🔄️ Intent {} is for {} but customer #{}'s cart now comes to {}. Refusing to verify it",
                        intent.intent_id, intent.amount, user.id, order.total
                    );
                    let reason = format!(
                        "payment intent {} was created for {}, but the cart now comes to {}. Start a new checkout",
                        intent.intent_id, intent.amount, order.total
                    );
                    return Err(OrderFlowError::CannotPlaceOrder(reason).into());
                }
            }
            s.begin_checkout()?;
        }
        let verified = self
            .payments
            .verify(user, &confirmation.payment_id, &confirmation.intent_id, &confirmation.signature)
            .await;
        let mut s = session.lock().await;
        s.end_checkout();
        let verified = verified?;
        match self.orders.place_order(user, &mut s, details, verified).await {
            Ok(placed) => Ok(CheckoutReceipt {
                success: true,
                splits: placed.route.split(),
                order: placed.order,
                items: placed.items,
            }),
            Err(e) => {
                error!(
                    "🔄️ Payment {} for customer #{} was verified but the order could not be placed: {e}. The payment \
                     needs to be refunded manually",
                    confirmation.payment_id, user.id
                );
                Err(e.into())
            },
        }
    }
}
