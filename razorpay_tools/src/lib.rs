//! Razorpay REST client.
//!
//! Only the two calls a marketplace checkout needs are covered: creating an order (the payment intent the customer's
//! checkout widget is opened against) and fetching the authoritative record of a payment.
mod api;
mod config;
mod data_objects;
mod error;

pub use api::RazorpayApi;
pub use config::RazorpayConfig;
pub use data_objects::{NewRazorpayOrder, RazorpayOrder, RazorpayPayment};
pub use error::RazorpayApiError;
