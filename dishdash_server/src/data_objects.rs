use std::fmt::Display;

use dd_common::Money;
use dishdash_engine::{
    cart::{Cart, CartLine},
    db_types::{AvailabilityRequestWithItems, AvailabilityResponse, FeeSplit, Order, OrderItem, Profile, Role},
    order_objects::{CheckoutReceipt, DeliveryDetails},
    PaymentConfirmation,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

//----------------------------------------------   Identity  ----------------------------------------------------
#[derive(Clone, Serialize, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl std::fmt::Debug for SignUpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SignUpRequest({}, {})", self.email, self.role)
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for SignInRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SignInRequest({})", self.email)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub profile: Profile,
}

//----------------------------------------------   Cart  ----------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddItemRequest {
    pub menu_item_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartView {
    pub restaurant_id: Option<i64>,
    pub items: Vec<CartLine>,
    pub item_count: i64,
    pub total: Money,
    pub availability_request_id: Option<i64>,
    pub placing_order: bool,
}

impl CartView {
    pub fn new(cart: &Cart, availability_request_id: Option<i64>, placing_order: bool) -> Self {
        Self {
            restaurant_id: cart.restaurant_id(),
            items: cart.lines().to_vec(),
            item_count: cart.item_count(),
            total: cart.total(),
            availability_request_id,
            placing_order,
        }
    }
}

//----------------------------------------------   Availability  ----------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AvailabilityRequestBody {
    #[serde(default)]
    pub query_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondRequest {
    pub is_available: bool,
    #[serde(default)]
    pub estimated_time: Option<String>,
}

/// An availability request as the customer sees it, with the vendor's answer once there is one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityView {
    pub request: AvailabilityRequestWithItems,
    pub response: Option<AvailabilityResponse>,
}

impl From<AvailabilityRequestWithItems> for AvailabilityView {
    fn from(request: AvailabilityRequestWithItems) -> Self {
        let response = request.request.response();
        Self { request, response }
    }
}

//----------------------------------------------   Checkout  ----------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResponse {
    pub intent_id: String,
    pub amount: Money,
    pub currency: String,
    pub key_id: String,
}

/// The fields the gateway's checkout hands back, plus where to deliver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutVerifyRequest {
    pub razorpay_payment_id: String,
    pub razorpay_order_id: String,
    pub razorpay_signature: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
}

impl CheckoutVerifyRequest {
    pub fn into_parts(self) -> (PaymentConfirmation, DeliveryDetails) {
        let confirmation = PaymentConfirmation {
            payment_id: self.razorpay_payment_id,
            intent_id: self.razorpay_order_id,
            signature: self.razorpay_signature,
        };
        (confirmation, DeliveryDetails::new(self.address, self.phone))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SplitView {
    pub vendor_amount: Money,
    pub admin_fee: Money,
    pub razorpay_fee: Money,
}

impl From<FeeSplit> for SplitView {
    fn from(split: FeeSplit) -> Self {
        Self { vendor_amount: split.vendor_amount, admin_fee: split.admin_fee, razorpay_fee: split.gateway_fee }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub splits: SplitView,
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl From<CheckoutReceipt> for CheckoutResponse {
    fn from(receipt: CheckoutReceipt) -> Self {
        Self { success: receipt.success, splits: receipt.splits.into(), order: receipt.order, items: receipt.items }
    }
}

//----------------------------------------------   Orders  ----------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}
