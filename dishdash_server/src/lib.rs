//! # DishDash server
//! This crate puts the DishDash engine behind an HTTP API. It is responsible for:
//! * Signing users up and in, and issuing the access tokens every other call needs.
//! * Holding each customer's cart session and serializing access to it.
//! * Forwarding availability requests to vendors and their answers back to customers, live.
//! * Running the checkout: creating Razorpay payment intents and placing orders once a payment is verified.
//! * Letting vendors move orders along the fulfilment track while customers watch.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! See [routes](routes/index.html). Everything under `/api` requires a bearer token.
pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
