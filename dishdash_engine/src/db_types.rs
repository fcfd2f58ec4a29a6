//! Data types that are stored in, or read from, the DishDash store.
//!
//! Status enums are stored as lowercase text. Parsing an unknown stored value is always an error; nothing is ever
//! coerced into a default status.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use dd_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid {kind}: {value}")]
pub struct ConversionError {
    kind: &'static str,
    value: String,
}

impl ConversionError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

//--------------------------------------        Role           ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Vendor,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Customer => "customer",
            Role::Vendor => "vendor",
            Role::Admin => "admin",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "vendor" => Ok(Role::Vendor),
            "admin" => Ok(Role::Admin),
            _ => Err(ConversionError::new("role", s)),
        }
    }
}

//--------------------------------------      CurrentUser      ---------------------------------------------------------
/// The authenticated caller of an engine operation. Ownership and role checks are made against this value, which the
/// host derives from a validated session token, never from request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: i64,
    pub role: Role,
}

impl CurrentUser {
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }

    pub fn customer(id: i64) -> Self {
        Self::new(id, Role::Customer)
    }

    pub fn vendor(id: i64) -> Self {
        Self::new(id, Role::Vendor)
    }

    pub fn is_customer(&self) -> bool {
        self.role == Role::Customer
    }

    pub fn is_vendor(&self) -> bool {
        self.role == Role::Vendor
    }
}

//--------------------------------------       Profile         ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub full_name: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn as_user(&self) -> CurrentUser {
        CurrentUser::new(self.id, self.role)
    }
}

#[derive(Debug, Clone)]
pub struct NewProfile {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub full_name: String,
    pub phone: Option<String>,
}

//--------------------------------------   Restaurant / Menu   ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct Restaurant {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct MenuItem {
    pub id: i64,
    pub restaurant_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------  AvailabilityStatus   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityStatus {
    /// Waiting on the vendor.
    Pending,
    /// The vendor confirmed the items and gave a preparation estimate.
    Responded,
    /// The vendor declined.
    Rejected,
    /// Nobody answered before the request timed out.
    Expired,
}

impl AvailabilityStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AvailabilityStatus::Pending)
    }
}

impl Display for AvailabilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AvailabilityStatus::Pending => "pending",
            AvailabilityStatus::Responded => "responded",
            AvailabilityStatus::Rejected => "rejected",
            AvailabilityStatus::Expired => "expired",
        };
        write!(f, "{s}")
    }
}

impl FromStr for AvailabilityStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "responded" => Ok(Self::Responded),
            "rejected" => Ok(Self::Rejected),
            "expired" => Ok(Self::Expired),
            _ => Err(ConversionError::new("availability status", s)),
        }
    }
}

//--------------------------------------  AvailabilityRequest  ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailabilityRequest {
    pub id: i64,
    pub customer_id: i64,
    pub restaurant_id: i64,
    pub query_text: String,
    pub status: AvailabilityStatus,
    pub estimated_time: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AvailabilityRequest {
    /// The customer-facing view of this request. `None` while the vendor has not answered yet.
    pub fn response(&self) -> Option<AvailabilityResponse> {
        match self.status {
            AvailabilityStatus::Pending => None,
            AvailabilityStatus::Responded => {
                Some(AvailabilityResponse { is_available: true, estimated_time: self.estimated_time.clone() })
            },
            AvailabilityStatus::Rejected | AvailabilityStatus::Expired => {
                Some(AvailabilityResponse { is_available: false, estimated_time: None })
            },
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailabilityRequestItem {
    pub id: i64,
    pub request_id: i64,
    pub menu_item_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAvailabilityItem {
    pub menu_item_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone)]
pub struct NewAvailabilityRequest {
    pub customer_id: i64,
    pub restaurant_id: i64,
    pub query_text: String,
    pub items: Vec<NewAvailabilityItem>,
}

/// A request together with its item snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailabilityRequestWithItems {
    #[serde(flatten)]
    pub request: AvailabilityRequest,
    pub items: Vec<AvailabilityRequestItem>,
}

impl AvailabilityRequestWithItems {
    /// Canonical `item_id:qty` list, sorted by item id. Compared against [`crate::cart::Cart::fingerprint`].
    pub fn fingerprint(&self) -> Vec<(i64, i64)> {
        let mut fp = self.items.iter().map(|i| (i.menu_item_id, i.quantity)).collect::<Vec<_>>();
        fp.sort_unstable();
        fp
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub is_available: bool,
    pub estimated_time: Option<String>,
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
/// The canonical order status as it is stored. Customers see [`DisplayStatus`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    New,
    Confirmed,
    Cooking,
    Ready,
    Dispatched,
    Delivered,
    Cancelled,
}

impl OrderStatusType {
    /// Position along the fulfilment track. `Cancelled` is off-track and has no rank.
    pub fn rank(&self) -> Option<u8> {
        match self {
            OrderStatusType::New => Some(0),
            OrderStatusType::Confirmed => Some(1),
            OrderStatusType::Cooking => Some(2),
            OrderStatusType::Ready => Some(3),
            OrderStatusType::Dispatched => Some(4),
            OrderStatusType::Delivered => Some(5),
            OrderStatusType::Cancelled => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Delivered | OrderStatusType::Cancelled)
    }

    pub fn display_status(&self) -> DisplayStatus {
        match self {
            OrderStatusType::New => DisplayStatus::Pending,
            OrderStatusType::Confirmed => DisplayStatus::Confirmed,
            OrderStatusType::Cooking => DisplayStatus::Preparing,
            OrderStatusType::Ready => DisplayStatus::Ready,
            OrderStatusType::Dispatched => DisplayStatus::OutForDelivery,
            OrderStatusType::Delivered => DisplayStatus::Delivered,
            OrderStatusType::Cancelled => DisplayStatus::Cancelled,
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatusType::New => "new",
            OrderStatusType::Confirmed => "confirmed",
            OrderStatusType::Cooking => "cooking",
            OrderStatusType::Ready => "ready",
            OrderStatusType::Dispatched => "dispatched",
            OrderStatusType::Delivered => "delivered",
            OrderStatusType::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "confirmed" => Ok(Self::Confirmed),
            "cooking" => Ok(Self::Cooking),
            "ready" => Ok(Self::Ready),
            "dispatched" => Ok(Self::Dispatched),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ConversionError::new("order status", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl DisplayStatus {
    pub fn label(&self) -> &'static str {
        match self {
            DisplayStatus::Pending => "Order placed",
            DisplayStatus::Confirmed => "Confirmed",
            DisplayStatus::Preparing => "Being prepared",
            DisplayStatus::Ready => "Ready for pickup",
            DisplayStatus::OutForDelivery => "Out for delivery",
            DisplayStatus::Delivered => "Delivered",
            DisplayStatus::Cancelled => "Cancelled",
        }
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct Order {
    pub id: i64,
    pub customer_id: i64,
    pub restaurant_id: i64,
    pub customer_name: String,
    pub restaurant_name: String,
    pub total: Money,
    pub status: OrderStatusType,
    pub estimated_time: Option<String>,
    pub address: String,
    pub phone: String,
    pub availability_request_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub menu_item_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub menu_item_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub quantity: i64,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: i64,
    pub restaurant_id: i64,
    pub customer_name: String,
    pub restaurant_name: String,
    pub total: Money,
    pub estimated_time: Option<String>,
    pub address: String,
    pub phone: String,
    pub availability_request_id: i64,
    pub items: Vec<NewOrderItem>,
}

//--------------------------------------       Payments        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentIntentStatus {
    Created,
    Verified,
    Failed,
}

impl Display for PaymentIntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentIntentStatus::Created => "created",
            PaymentIntentStatus::Verified => "verified",
            PaymentIntentStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A payment intent (a gateway "order") that this server created on behalf of a customer.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentIntent {
    pub intent_id: String,
    pub customer_id: i64,
    pub amount: Money,
    pub currency: String,
    pub receipt: String,
    pub status: PaymentIntentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPaymentIntent {
    pub intent_id: String,
    pub customer_id: i64,
    pub amount: Money,
    pub currency: String,
    pub receipt: String,
}

/// How a captured payment is divided between the vendor, the platform and the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    pub total: Money,
    pub vendor_amount: Money,
    pub admin_fee: Money,
    pub gateway_fee: Money,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentRoute {
    pub id: i64,
    pub order_id: i64,
    pub intent_id: String,
    pub total_amount: Money,
    pub vendor_amount: Money,
    pub admin_fee: Money,
    pub gateway_fee: Money,
    pub gateway_payment_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRoute {
    pub fn split(&self) -> FeeSplit {
        FeeSplit {
            total: self.total_amount,
            vendor_amount: self.vendor_amount,
            admin_fee: self.admin_fee,
            gateway_fee: self.gateway_fee,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewPaymentRoute {
    pub intent_id: String,
    pub gateway_payment_id: String,
    pub split: FeeSplit,
    pub status: String,
}
