//! # Payment confirmation
//!
//! Payment happens in two steps. First the server creates a payment intent with the gateway and records it. The
//! customer then pays in the gateway's own checkout, which hands back a payment id and a signature. [`PaymentApi::verify`]
//! checks the signature locally, then asks the gateway for the authoritative payment record and checks it against the
//! intent. Only then is a [`VerifiedPayment`] produced, and an order can only be placed with one.
//!
//! Every failure after the signature check starts, including a failed fetch from the gateway, marks the intent
//! `failed`. A failed intent can never be verified again and the customer has to start a new checkout.
use std::fmt::Debug;

use chrono::Utc;
use dd_common::{Money, Secret};
use log::*;
use serde::Serialize;

use crate::{
    db_types::{CurrentUser, FeeSplit, NewPaymentIntent, PaymentIntent, PaymentIntentStatus},
    dd_api::errors::PaymentApiError,
    helpers::{verify_payment_signature, FeeSchedule},
    traits::{NewGatewayOrder, PaymentManagement, PaymentProvider, PaymentProviderError},
};

/// Payment states the gateway reports for money that has been taken from the customer.
const COMPLETED_PAYMENT_STATES: [&str; 2] = ["captured", "authorized"];

/// Proof that a payment was verified. Only [`PaymentApi::verify`] can create one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedPayment {
    intent_id: String,
    payment_id: String,
    customer_id: i64,
    amount: Money,
    currency: String,
    status: String,
    split: FeeSplit,
}

impl VerifiedPayment {
    pub fn intent_id(&self) -> &str {
        &self.intent_id
    }

    pub fn payment_id(&self) -> &str {
        &self.payment_id
    }

    pub fn customer_id(&self) -> i64 {
        self.customer_id
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn split(&self) -> FeeSplit {
        self.split
    }
}

pub struct PaymentApi<B, G> {
    db: B,
    gateway: G,
    key_secret: Secret<String>,
    fees: FeeSchedule,
}

impl<B, G> Debug for PaymentApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentApi({:?})", self.fees)
    }
}

impl<B, G> PaymentApi<B, G> {
    pub fn new(db: B, gateway: G, key_secret: Secret<String>, fees: FeeSchedule) -> Self {
        Self { db, gateway, key_secret, fees }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }
}

impl<B, G> PaymentApi<B, G>
where
    B: PaymentManagement,
    G: PaymentProvider,
{
    /// Creates an intent with the gateway for `amount` and records it against the customer. The amount must cover the
    /// platform fee, so the vendor's share of a verified payment is never negative.
    pub async fn create_intent(
        &self,
        user: &CurrentUser,
        amount: Money,
        currency: &str,
        receipt: Option<String>,
    ) -> Result<PaymentIntent, PaymentApiError> {
        if !user.is_customer() {
            return Err(PaymentApiError::AccessDenied);
        }
        if !amount.is_positive() {
            return Err(PaymentApiError::InvalidAmount(amount));
        }
        if amount < self.fees.admin_fee {
            return Err(PaymentApiError::BelowPlatformFee { amount, fee: self.fees.admin_fee });
        }
        let receipt = receipt.unwrap_or_else(|| format!("dd_{}_{}", user.id, Utc::now().timestamp_millis()));
        let request = NewGatewayOrder { amount, currency: currency.to_string(), receipt: receipt.clone() };
        let gateway_order = self.gateway.create_order(request).await?;
        if gateway_order.amount != amount {
            error!(
                "💳️ Gateway created intent {} for {} but {amount} was requested",
                gateway_order.id, gateway_order.amount
            );
            return Err(PaymentApiError::AmountMismatch { expected: amount, paid: gateway_order.amount });
        }
        let intent = NewPaymentIntent {
            intent_id: gateway_order.id,
            customer_id: user.id,
            amount,
            currency: gateway_order.currency,
            receipt,
        };
        let intent = self.db.insert_payment_intent(intent).await?;
        info!("💳️ Payment intent {} created for customer #{} ({amount})", intent.intent_id, user.id);
        Ok(intent)
    }

    /// The intent, if it exists and was issued to `user`.
    pub async fn intent_for(&self, user: &CurrentUser, intent_id: &str) -> Result<Option<PaymentIntent>, PaymentApiError> {
        let intent = self.db.fetch_payment_intent(intent_id).await?;
        Ok(intent.filter(|i| i.customer_id == user.id))
    }

    /// Verifies a completed payment against an intent this server issued to `user`.
    pub async fn verify(
        &self,
        user: &CurrentUser,
        payment_id: &str,
        intent_id: &str,
        signature: &str,
    ) -> Result<VerifiedPayment, PaymentApiError> {
        let intent = match self.db.fetch_payment_intent(intent_id).await? {
            Some(intent) if intent.customer_id == user.id => intent,
            Some(_) => {
                warn!("💳️ Customer #{} tried to verify intent {intent_id}, which is not theirs", user.id);
                return Err(PaymentApiError::VerificationFailed);
            },
            None => {
                warn!("💳️ Customer #{} tried to verify unknown intent {intent_id}", user.id);
                return Err(PaymentApiError::VerificationFailed);
            },
        };
        if intent.status != PaymentIntentStatus::Created {
            warn!("💳️ Intent {intent_id} is already {}. Refusing to verify it again", intent.status);
            return Err(PaymentApiError::IntentAlreadyUsed(intent_id.to_string()));
        }
        if let Err(e) = verify_payment_signature(self.key_secret.reveal(), intent_id, payment_id, signature) {
            warn!("💳️ Signature check failed for payment {payment_id} on intent {intent_id}: {e}");
            return Err(self.fail_intent(intent_id, PaymentApiError::VerificationFailed).await);
        }
        let payment = match self.gateway.fetch_payment(payment_id).await {
            Ok(p) => p,
            Err(PaymentProviderError::Unavailable(e)) => {
                error!("💳️ Could not fetch payment {payment_id} from the gateway: {e}");
                let err = PaymentProviderError::Unavailable(e).into();
                return Err(self.fail_intent(intent_id, err).await);
            },
            Err(e) => {
                warn!("💳️ Gateway refused to confirm payment {payment_id}: {e}");
                return Err(self.fail_intent(intent_id, PaymentApiError::VerificationFailed).await);
            },
        };
        if payment.order_id.as_deref() != Some(intent_id) {
            warn!("💳️ Payment {payment_id} belongs to intent {:?}, not {intent_id}", payment.order_id);
            return Err(self.fail_intent(intent_id, PaymentApiError::VerificationFailed).await);
        }
        if payment.amount != intent.amount {
            warn!("💳️ Payment {payment_id} is for {}, but intent {intent_id} is for {}", payment.amount, intent.amount);
            let err = PaymentApiError::AmountMismatch { expected: intent.amount, paid: payment.amount };
            return Err(self.fail_intent(intent_id, err).await);
        }
        if !COMPLETED_PAYMENT_STATES.contains(&payment.status.as_str()) {
            warn!("💳️ Payment {payment_id} is {}", payment.status);
            let err = PaymentApiError::PaymentNotCompleted(payment_id.to_string());
            return Err(self.fail_intent(intent_id, err).await);
        }
        self.db
            .transition_payment_intent(intent_id, PaymentIntentStatus::Created, PaymentIntentStatus::Verified)
            .await?;
        let split = self.fees.split(payment.amount);
        info!("💳️ Payment {payment_id} verified for intent {intent_id}. Split: {split:?}");
        Ok(VerifiedPayment {
            intent_id: intent_id.to_string(),
            payment_id: payment.id,
            customer_id: user.id,
            amount: payment.amount,
            currency: payment.currency,
            status: payment.status,
            split,
        })
    }

    async fn fail_intent(&self, intent_id: &str, err: PaymentApiError) -> PaymentApiError {
        match self
            .db
            .transition_payment_intent(intent_id, PaymentIntentStatus::Created, PaymentIntentStatus::Failed)
            .await
        {
            Ok(_) => debug!("💳️ Intent {intent_id} marked as failed"),
            Err(e) => error!("💳️ Could not mark intent {intent_id} as failed: {e}"),
        }
        err
    }
}
