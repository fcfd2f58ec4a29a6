use dd_common::Money;
use serde::{Deserialize, Serialize};

/// Body of `POST /orders`. Amounts are in currency minor units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewRazorpayOrder {
    pub amount: Money,
    pub currency: String,
    pub receipt: String,
    /// Capture payments automatically once they are authorized.
    pub payment_capture: bool,
}

impl NewRazorpayOrder {
    pub fn new(amount: Money, currency: &str, receipt: &str) -> Self {
        Self { amount, currency: currency.to_string(), receipt: receipt.to_string(), payment_capture: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RazorpayOrder {
    pub id: String,
    pub amount: Money,
    #[serde(default)]
    pub amount_paid: Money,
    #[serde(default)]
    pub amount_due: Money,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: String,
    #[serde(default)]
    pub attempts: u32,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RazorpayPayment {
    pub id: String,
    pub amount: Money,
    pub currency: String,
    /// `created`, `authorized`, `captured`, `refunded` or `failed`
    pub status: String,
    pub order_id: Option<String>,
    pub method: Option<String>,
    #[serde(default)]
    pub captured: bool,
    pub fee: Option<Money>,
    pub tax: Option<Money>,
    pub error_code: Option<String>,
    pub error_description: Option<String>,
    pub created_at: i64,
}
