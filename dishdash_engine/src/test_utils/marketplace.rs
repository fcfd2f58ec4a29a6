use dd_common::Secret;
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::{
    db_types::{AvailabilityRequestWithItems, CurrentUser, Order},
    events::{EventHandlers, EventHooks},
    helpers::FeeSchedule,
    order_objects::DeliveryDetails,
    test_utils::{prepare_test_env, random_db_path, seed_marketplace, FakeGateway, SeededMarketplace},
    AvailabilityApi,
    CartApi,
    CheckoutApi,
    CheckoutError,
    MarketplaceDatabase,
    NotificationFabric,
    OrderFlowApi,
    PaymentApi,
    PaymentConfirmation,
    SessionRegistry,
    SharedSession,
    SqliteDatabase,
};

pub const TEST_KEY_SECRET: &str = "dishdash_test_key_secret";
pub const TEST_CURRENCY: &str = "INR";

/// A complete engine wired to a fresh, seeded database and an in-memory gateway.
pub struct TestMarketplace {
    pub db: SqliteDatabase,
    pub seeded: SeededMarketplace,
    pub fabric: NotificationFabric,
    pub gateway: FakeGateway,
    pub sessions: SessionRegistry,
    pub carts: CartApi<SqliteDatabase>,
    pub availability: AvailabilityApi<SqliteDatabase>,
    pub checkout: CheckoutApi<SqliteDatabase, FakeGateway>,
}

impl std::fmt::Debug for TestMarketplace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TestMarketplace({})", self.db.url())
    }
}

impl TestMarketplace {
    pub async fn new() -> Self {
        Self::with_hooks(EventHooks::default()).await
    }

    /// Builds the marketplace with the given hooks running on their own handler tasks.
    pub async fn with_hooks(hooks: EventHooks) -> Self {
        let url = random_db_path();
        let db = prepare_test_env(&url).await;
        let seeded = seed_marketplace(&db).await;
        let fabric = NotificationFabric::default();
        let gateway = FakeGateway::new(TEST_KEY_SECRET);
        let handlers = EventHandlers::new(16, hooks);
        let producers = handlers.producers();
        handlers.start_handlers();
        let payments =
            PaymentApi::new(db.clone(), gateway.clone(), Secret::new(TEST_KEY_SECRET.to_string()), FeeSchedule::default());
        let orders = OrderFlowApi::new(db.clone(), fabric.clone(), producers);
        Self {
            carts: CartApi::new(db.clone(), fabric.clone()),
            availability: AvailabilityApi::new(db.clone(), fabric.clone()),
            checkout: CheckoutApi::new(payments, orders, TEST_CURRENCY),
            sessions: SessionRegistry::new(),
            db,
            seeded,
            fabric,
            gateway,
        }
    }

    pub fn orders(&self) -> &OrderFlowApi<SqliteDatabase> {
        self.checkout.orders()
    }

    pub fn customer(&self) -> CurrentUser {
        self.seeded.customer.as_user()
    }

    pub fn vendor(&self) -> CurrentUser {
        self.seeded.vendor.as_user()
    }

    pub async fn session(&self, user: &CurrentUser) -> SharedSession {
        self.sessions.session(user.id).await
    }

    pub async fn add_to_cart(&self, user: &CurrentUser, item_id: i64, times: usize) {
        let session = self.session(user).await;
        let mut s = session.lock().await;
        for _ in 0..times {
            self.carts.add_item(user, &mut s, item_id).await.expect("Could not add item to cart");
        }
    }

    pub async fn request_availability(&self, user: &CurrentUser) -> AvailabilityRequestWithItems {
        let session = self.session(user).await;
        let mut s = session.lock().await;
        self.availability.send_request(user, &mut s, "Can you make this?").await.expect("Could not send request")
    }

    /// Runs a checkout that pays the full amount, returning the placed order.
    pub async fn pay_and_place(&self, user: &CurrentUser) -> Result<Order, CheckoutError> {
        let session = self.session(user).await;
        let intent = self.checkout.start_checkout(user, &session).await?;
        let (payment_id, signature) = self.gateway.pay(&intent.intent_id);
        let confirmation = PaymentConfirmation { payment_id, intent_id: intent.intent_id, signature };
        let details = DeliveryDetails::new("221B Residency Road", "+91 98765 43210");
        let receipt = self.checkout.complete_checkout(user, &session, confirmation, details).await?;
        Ok(receipt.order)
    }

    pub async fn tear_down(mut self) {
        let url = self.db.url().to_string();
        self.db.close().await;
        if let Err(e) = Sqlite::drop_database(&url).await {
            warn!("🚀️ Could not remove test database {url}: {e}");
        }
    }
}
