//! `SqliteDatabase` is the concrete DishDash storage backend.
//!
//! It implements every storage trait in [`crate::traits`]. Multi-row writes run inside a single transaction; dropping
//! an uncommitted transaction rolls it back.
use std::fmt::Debug;

use chrono::Duration;
use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{availability, catalog, db_url, new_pool, orders, payments, profiles};
use crate::{
    db_types::{
        AvailabilityRequest,
        AvailabilityRequestWithItems,
        AvailabilityStatus,
        MenuItem,
        NewAvailabilityRequest,
        NewOrder,
        NewPaymentIntent,
        NewPaymentRoute,
        NewProfile,
        Order,
        OrderItem,
        OrderStatusType,
        PaymentIntent,
        PaymentIntentStatus,
        PaymentRoute,
        Profile,
        Restaurant,
    },
    order_objects::OrderQueryFilter,
    traits::{
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
        PaymentRecordError,
        PlacedOrder,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the `DD_DATABASE_URL` environment variable (or the default).
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        trace!("🗃️ Created new SQLite pool for {url}");
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date.
    pub async fn run_migrations(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn close(&mut self) {
        self.pool.close().await;
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn fetch_restaurant(&self, restaurant_id: i64) -> Result<Option<Restaurant>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_restaurant(restaurant_id, &mut conn).await?)
    }

    async fn restaurants_for_owner(&self, owner_id: i64) -> Result<Vec<Restaurant>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::restaurants_for_owner(owner_id, &mut conn).await?)
    }

    async fn fetch_menu_item(&self, item_id: i64) -> Result<Option<MenuItem>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_menu_item(item_id, &mut conn).await?)
    }

    async fn fetch_menu_items(&self, item_ids: &[i64]) -> Result<Vec<MenuItem>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_menu_items(item_ids, &mut conn).await?)
    }
}

impl AvailabilityManagement for SqliteDatabase {
    async fn insert_availability_request(
        &self,
        request: NewAvailabilityRequest,
    ) -> Result<AvailabilityRequestWithItems, AvailabilityError> {
        let mut tx = self.pool.begin().await?;
        let result = availability::insert_request(request, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ Availability request #{} for restaurant #{} committed",
            result.request.id, result.request.restaurant_id
        );
        Ok(result)
    }

    async fn fetch_availability_request(
        &self,
        request_id: i64,
    ) -> Result<Option<AvailabilityRequestWithItems>, AvailabilityError> {
        let mut conn = self.pool.acquire().await?;
        Ok(availability::fetch_request_with_items(request_id, &mut conn).await?)
    }

    async fn resolve_availability_request(
        &self,
        request_id: i64,
        status: AvailabilityStatus,
        estimated_time: Option<String>,
    ) -> Result<AvailabilityRequest, AvailabilityError> {
        let mut conn = self.pool.acquire().await?;
        availability::resolve_request(request_id, status, estimated_time, &mut conn).await
    }

    async fn delete_pending_request(
        &self,
        request_id: i64,
        customer_id: i64,
    ) -> Result<Option<AvailabilityRequest>, AvailabilityError> {
        let mut tx = self.pool.begin().await?;
        let deleted = availability::delete_pending(request_id, customer_id, &mut tx).await?;
        tx.commit().await?;
        Ok(deleted)
    }

    async fn pending_requests_for_restaurants(
        &self,
        restaurant_ids: &[i64],
    ) -> Result<Vec<AvailabilityRequestWithItems>, AvailabilityError> {
        let mut conn = self.pool.acquire().await?;
        Ok(availability::pending_for_restaurants(restaurant_ids, &mut conn).await?)
    }

    async fn expire_pending_requests(&self, timeout: Duration) -> Result<Vec<AvailabilityRequest>, AvailabilityError> {
        let mut conn = self.pool.acquire().await?;
        Ok(availability::expire_pending(timeout, &mut conn).await?)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder, route: NewPaymentRoute) -> Result<PlacedOrder, OrderManagementError> {
        let mut tx = self.pool.begin().await?;
        let placed = orders::insert_order(order, route, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order #{} committed with {} items", placed.order.id, placed.items.len());
        Ok(placed)
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order(order_id, &mut conn).await?)
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_items(order_id, &mut conn).await?)
    }

    async fn fetch_payment_route(&self, order_id: i64) -> Result<Option<PaymentRoute>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_payment_route(order_id, &mut conn).await?)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::search_orders(query, &mut conn).await?)
    }

    async fn update_order_status(&self, order_id: i64, status: OrderStatusType) -> Result<Order, OrderManagementError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_order_status(order_id, status, &mut conn)
            .await?
            .ok_or(OrderManagementError::OrderNotFound(order_id))
    }
}

impl PaymentManagement for SqliteDatabase {
    async fn insert_payment_intent(&self, intent: NewPaymentIntent) -> Result<PaymentIntent, PaymentRecordError> {
        let mut conn = self.pool.acquire().await?;
        payments::insert_intent(intent, &mut conn).await
    }

    async fn fetch_payment_intent(&self, intent_id: &str) -> Result<Option<PaymentIntent>, PaymentRecordError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_intent(intent_id, &mut conn).await?)
    }

    async fn transition_payment_intent(
        &self,
        intent_id: &str,
        from: PaymentIntentStatus,
        to: PaymentIntentStatus,
    ) -> Result<PaymentIntent, PaymentRecordError> {
        let mut conn = self.pool.acquire().await?;
        payments::transition_intent(intent_id, from, to, &mut conn).await
    }
}

impl AuthManagement for SqliteDatabase {
    async fn insert_profile(&self, profile: NewProfile) -> Result<Profile, AuthApiError> {
        let mut conn = self.pool.acquire().await?;
        profiles::insert_profile(profile, &mut conn).await
    }

    async fn fetch_profile(&self, user_id: i64) -> Result<Option<Profile>, AuthApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(profiles::fetch_profile(user_id, &mut conn).await?)
    }

    async fn fetch_profile_by_email(&self, email: &str) -> Result<Option<Profile>, AuthApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(profiles::fetch_profile_by_email(email, &mut conn).await?)
    }
}
