//! # DishDash engine public API
//!
//! The `dd_api` module exposes the programmatic API for the marketplace order lifecycle. Each API is created by
//! supplying a backend that implements the storage traits it needs, so clients can pick and choose.
//!
//! * [`cart_api`] applies cart edits to a customer's session.
//! * [`availability_api`] runs the request/respond negotiation between customer and restaurant.
//! * [`payment_api`] creates payment intents with the gateway and verifies completed payments.
//! * [`order_flow_api`] is the order ledger: placement, vendor status updates and order lists.
//! * [`checkout_api`] ties payment verification and order placement together.
//! * [`auth_api`] registers users and checks credentials.
//! * [`live_views`] turns fabric subscriptions into refetch-on-change query results.
//!
//! ```rust,ignore
//! use dishdash_engine::{NotificationFabric, OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/dishdash.db", 5).await?;
//! let api = OrderFlowApi::new(db, NotificationFabric::default(), EventProducers::default());
//! let orders = api.orders_for_customer(&user).await?;
//! ```
pub mod auth_api;
pub mod availability_api;
pub mod cart_api;
pub mod checkout_api;
pub mod errors;
pub mod live_views;
pub mod order_flow_api;
pub mod order_objects;
pub mod payment_api;
