//! DishDash Engine
//!
//! The DishDash engine holds the order lifecycle of a restaurant marketplace: customers fill a single-restaurant cart,
//! ask the restaurant to confirm it can make the order, pay through an external gateway and then follow the order as
//! the vendor prepares and dispatches it. The library is transport-agnostic; `dishdash_server` puts it behind HTTP.
//!
//! The library is divided into these sections:
//! 1. Storage contracts ([`mod@traits`]) and the SQLite backend ([`SqliteDatabase`]). The data types stored in the
//!    database live in [`mod@db_types`] and are public.
//! 2. Customer session state: the [`mod@cart`] and the per-customer [`mod@session`].
//! 3. The public API: [`CartApi`], [`AvailabilityApi`], [`PaymentApi`], [`OrderFlowApi`], [`CheckoutApi`] and
//!    [`AuthApi`].
//! 4. The [`NotificationFabric`], which tells subscribers that something changed so they can refetch, and the
//!    [`mod@events`] hooks that let the host react to placed orders and status changes.
#[cfg(feature = "sqlite")]
mod sqlite;

pub mod cart;
pub mod db_types;
mod dd_api;
pub mod events;
pub mod helpers;
pub mod session;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use dd_api::{
    auth_api::{AuthApi, NewAccount},
    availability_api::AvailabilityApi,
    cart_api::CartApi,
    checkout_api::{CheckoutApi, PaymentConfirmation},
    errors::{
        AvailabilityApiError,
        CartApiError,
        CheckoutError,
        OrderFlowError,
        PaymentApiError,
        ACCESS_DENIED,
    },
    live_views,
    order_flow_api::{validate_transition, OrderFlowApi},
    order_objects,
    payment_api::{PaymentApi, VerifiedPayment},
};
pub use events::NotificationFabric;
pub use session::{CustomerSession, SessionRegistry, SharedSession};
#[cfg(feature = "sqlite")]
pub use sqlite::{db as sqlite_db, SqliteDatabase};
pub use traits::{
    AuthApiError,
    AuthManagement,
    AvailabilityError,
    AvailabilityManagement,
    CatalogError,
    CatalogManagement,
    MarketplaceDatabase,
    OrderManagement,
    OrderManagementError,
    PaymentManagement,
    PaymentProvider,
    PaymentProviderError,
    PaymentRecordError,
};
