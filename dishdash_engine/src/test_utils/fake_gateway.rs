use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use dd_common::Money;

use crate::{
    helpers::sign_payment,
    traits::{GatewayOrder, GatewayPayment, NewGatewayOrder, PaymentProvider, PaymentProviderError},
};

#[derive(Default)]
struct GatewayState {
    orders: HashMap<String, GatewayOrder>,
    payments: HashMap<String, GatewayPayment>,
    unavailable: bool,
    counter: u64,
}

/// An in-memory payment gateway. Customers "pay" with [`FakeGateway::pay`], which returns the payment id and the
/// signature the real checkout widget would hand back.
#[derive(Clone)]
pub struct FakeGateway {
    key_secret: String,
    state: Arc<Mutex<GatewayState>>,
}

impl FakeGateway {
    pub fn new(key_secret: &str) -> Self {
        Self { key_secret: key_secret.to_string(), state: Arc::new(Mutex::new(GatewayState::default())) }
    }

    /// Pays the full amount of the intent.
    pub fn pay(&self, intent_id: &str) -> (String, String) {
        let amount = self.state.lock().unwrap().orders.get(intent_id).expect("Unknown intent").amount;
        self.pay_with(intent_id, amount, "captured")
    }

    /// Records a payment against the intent with an arbitrary amount and status.
    pub fn pay_with(&self, intent_id: &str, amount: Money, status: &str) -> (String, String) {
        let mut state = self.state.lock().unwrap();
        state.counter += 1;
        let payment_id = format!("pay_test{:06}", state.counter);
        let currency = state.orders.get(intent_id).map(|o| o.currency.clone()).unwrap_or_else(|| "INR".into());
        let payment = GatewayPayment {
            id: payment_id.clone(),
            order_id: Some(intent_id.to_string()),
            amount,
            currency,
            status: status.to_string(),
        };
        state.payments.insert(payment_id.clone(), payment);
        let signature = sign_payment(&self.key_secret, intent_id, &payment_id).expect("Could not sign payment");
        (payment_id, signature)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().unavailable = unavailable;
    }
}

impl PaymentProvider for FakeGateway {
    async fn create_order(&self, order: NewGatewayOrder) -> Result<GatewayOrder, PaymentProviderError> {
        let mut state = self.state.lock().unwrap();
        if state.unavailable {
            return Err(PaymentProviderError::Unavailable("gateway is down".into()));
        }
        state.counter += 1;
        let gateway_order = GatewayOrder {
            id: format!("order_test{:06}", state.counter),
            amount: order.amount,
            currency: order.currency,
            receipt: Some(order.receipt),
            status: "created".into(),
        };
        state.orders.insert(gateway_order.id.clone(), gateway_order.clone());
        Ok(gateway_order)
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment, PaymentProviderError> {
        let state = self.state.lock().unwrap();
        if state.unavailable {
            return Err(PaymentProviderError::Unavailable("gateway is down".into()));
        }
        state.payments.get(payment_id).cloned().ok_or_else(|| PaymentProviderError::NotFound(payment_id.to_string()))
    }
}
