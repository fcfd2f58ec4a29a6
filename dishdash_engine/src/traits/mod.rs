//! # Storage and gateway contracts
//!
//! The engine APIs are generic over these traits. The SQLite backend ([`crate::SqliteDatabase`]) implements every
//! storage trait; the HTTP server supplies the [`PaymentProvider`].
//!
//! * [`CatalogManagement`]: read-only access to restaurants and menu items.
//! * [`AvailabilityManagement`]: availability requests and their item snapshots.
//! * [`OrderManagement`]: the order ledger, including the payment route written with each order.
//! * [`PaymentManagement`]: the payment intents this server has created.
//! * [`AuthManagement`]: user profiles.
//! * [`PaymentProvider`]: the external payment gateway.
mod auth_management;
mod availability_management;
mod catalog_management;
mod data_objects;
mod order_management;
mod payment_management;
mod payment_provider;

pub use auth_management::{AuthApiError, AuthManagement};
pub use availability_management::{AvailabilityError, AvailabilityManagement};
pub use catalog_management::{CatalogError, CatalogManagement};
pub use data_objects::{GatewayOrder, GatewayPayment, NewGatewayOrder, PlacedOrder};
pub use order_management::{OrderManagement, OrderManagementError};
pub use payment_management::{PaymentManagement, PaymentRecordError};
pub use payment_provider::{PaymentProvider, PaymentProviderError};

/// The full set of storage behaviour a backend must offer to run the marketplace.
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase:
    Clone + CatalogManagement + AvailabilityManagement + OrderManagement + PaymentManagement + AuthManagement
{
    /// The URL of the database
    fn url(&self) -> &str;

    /// Closes all connections to the database
    async fn close(&mut self);
}
