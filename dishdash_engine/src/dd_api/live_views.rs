//! # Live views
//!
//! A [`LiveView`] pairs a fabric [`Subscription`] with a query. Every change event triggers a complete refetch that
//! replaces the previous result; events are never applied as deltas. Duplicate or out-of-order events are therefore
//! harmless, and any events that queue up while a refetch is running are discarded because the refetch already
//! covers them.
//!
//! The subscription is taken out *before* the initial fetch so that no change can slip between the two.
use log::*;

use crate::{
    db_types::{AvailabilityRequestWithItems, Order},
    events::{NotificationFabric, Scope, Subscription},
    order_objects::OrderQueryFilter,
    traits::{AvailabilityError, AvailabilityManagement, OrderManagement, OrderManagementError},
};

/// A refetchable query backing a [`LiveView`].
#[allow(async_fn_in_trait)]
pub trait LiveQuery {
    type Item;
    type Error;

    async fn fetch(&self) -> Result<Self::Item, Self::Error>;
}

pub struct LiveView<Q: LiveQuery> {
    query: Q,
    subscription: Subscription,
    current: Q::Item,
}

impl<Q: LiveQuery> LiveView<Q> {
    pub async fn start(query: Q, fabric: &NotificationFabric, scope: Scope) -> Result<Self, Q::Error> {
        let subscription = fabric.subscribe(scope);
        let current = query.fetch().await?;
        Ok(Self { query, subscription, current })
    }

    pub fn current(&self) -> &Q::Item {
        &self.current
    }

    pub fn into_current(self) -> Q::Item {
        self.current
    }

    /// Replaces the current result with a fresh read.
    pub async fn refetch(&mut self) -> Result<&Q::Item, Q::Error> {
        self.current = self.query.fetch().await?;
        Ok(&self.current)
    }

    /// Waits for the next change event, then refetches. Returns `None` when the fabric shuts down.
    pub async fn next_change(&mut self) -> Option<Result<&Q::Item, Q::Error>> {
        let event = self.subscription.recv().await?;
        let coalesced = self.subscription.drain_pending();
        trace!("📬️ Live view refetching after {event:?} ({coalesced} more coalesced)");
        Some(self.refetch().await)
    }
}

/// Orders matching a filter, newest first.
pub struct OrderListQuery<B> {
    db: B,
    filter: OrderQueryFilter,
}

impl<B> OrderListQuery<B> {
    pub fn new(db: B, filter: OrderQueryFilter) -> Self {
        Self { db, filter }
    }
}

impl<B: OrderManagement> LiveQuery for OrderListQuery<B> {
    type Error = OrderManagementError;
    type Item = Vec<Order>;

    async fn fetch(&self) -> Result<Vec<Order>, OrderManagementError> {
        self.db.search_orders(self.filter.clone()).await
    }
}

/// A single availability request. `None` once the request has been withdrawn.
pub struct AvailabilityRequestQuery<B> {
    db: B,
    request_id: i64,
}

impl<B> AvailabilityRequestQuery<B> {
    pub fn new(db: B, request_id: i64) -> Self {
        Self { db, request_id }
    }
}

impl<B: AvailabilityManagement> LiveQuery for AvailabilityRequestQuery<B> {
    type Error = AvailabilityError;
    type Item = Option<AvailabilityRequestWithItems>;

    async fn fetch(&self) -> Result<Self::Item, AvailabilityError> {
        self.db.fetch_availability_request(self.request_id).await
    }
}

/// The actionable (pending, non-empty) requests for a vendor's restaurants.
pub struct VendorQueueQuery<B> {
    db: B,
    restaurant_ids: Vec<i64>,
}

impl<B> VendorQueueQuery<B> {
    pub fn new(db: B, restaurant_ids: Vec<i64>) -> Self {
        Self { db, restaurant_ids }
    }
}

impl<B: AvailabilityManagement> LiveQuery for VendorQueueQuery<B> {
    type Error = AvailabilityError;
    type Item = Vec<AvailabilityRequestWithItems>;

    async fn fetch(&self) -> Result<Self::Item, AvailabilityError> {
        self.db.pending_requests_for_restaurants(&self.restaurant_ids).await
    }
}

pub type OrderListWatcher<B> = LiveView<OrderListQuery<B>>;
pub type AvailabilityWatcher<B> = LiveView<AvailabilityRequestQuery<B>>;
pub type VendorQueueWatcher<B> = LiveView<VendorQueueQuery<B>>;
