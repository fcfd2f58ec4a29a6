//! # Availability negotiation
//!
//! Before a customer can pay, the restaurant must confirm it can make what is in the cart. The customer sends a
//! request carrying a snapshot of the cart; the vendor answers once, either with a preparation estimate or with a
//! refusal. Requests nobody answers are expired by a periodic sweep.
//!
//! Both sides learn about changes through the [`NotificationFabric`] and refetch from the store.
use std::{collections::BTreeSet, fmt::Debug};

use chrono::Duration;
use log::*;

use crate::{
    db_types::{
        AvailabilityRequest,
        AvailabilityRequestWithItems,
        AvailabilityStatus,
        CurrentUser,
        NewAvailabilityRequest,
    },
    dd_api::{
        errors::AvailabilityApiError,
        live_views::{AvailabilityRequestQuery, AvailabilityWatcher, LiveView, VendorQueueQuery, VendorQueueWatcher},
    },
    events::{ChangeEvent, ChangeKind, NotificationFabric, Scope},
    session::{CustomerSession, SessionError},
    traits::{AvailabilityManagement, CatalogManagement},
};

pub struct AvailabilityApi<B> {
    db: B,
    fabric: NotificationFabric,
}

impl<B> Debug for AvailabilityApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AvailabilityApi")
    }
}

impl<B> AvailabilityApi<B> {
    pub fn new(db: B, fabric: NotificationFabric) -> Self {
        Self { db, fabric }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn fabric(&self) -> &NotificationFabric {
        &self.fabric
    }

    fn publish(&self, kind: ChangeKind, request: &AvailabilityRequest) {
        self.fabric.publish(ChangeEvent::Availability {
            kind,
            request_id: request.id,
            customer_id: request.customer_id,
            restaurant_id: request.restaurant_id,
            status: Some(request.status),
        });
    }
}

impl<B> AvailabilityApi<B>
where B: AvailabilityManagement + CatalogManagement
{
    /// Sends the session's cart to its restaurant for confirmation.
    ///
    /// The request and its item snapshot are written atomically. Any earlier request from this session that is still
    /// pending is withdrawn.
    pub async fn send_request(
        &self,
        user: &CurrentUser,
        session: &mut CustomerSession,
        query_text: &str,
    ) -> Result<AvailabilityRequestWithItems, AvailabilityApiError> {
        if !user.is_customer() || session.customer_id() != user.id {
            return Err(AvailabilityApiError::AccessDenied);
        }
        if session.is_placing_order() {
            return Err(SessionError::CheckoutInProgress.into());
        }
        let restaurant_id = session.cart().restaurant_id().ok_or(AvailabilityApiError::EmptyCart)?;
        if session.cart().is_empty() {
            return Err(AvailabilityApiError::EmptyCart);
        }
        let request = NewAvailabilityRequest {
            customer_id: user.id,
            restaurant_id,
            query_text: query_text.trim().to_string(),
            items: session.cart().snapshot(),
        };
        let created = self.db.insert_availability_request(request).await?;
        info!(
            "🔄️ Customer #{} asked restaurant #{restaurant_id} to confirm {} items (request #{})",
            user.id,
            created.items.len(),
            created.request.id
        );
        self.publish(ChangeKind::Inserted, &created.request);
        if let Some(previous) = session.set_availability_request(created.request.id) {
            if let Some(old) = self.db.delete_pending_request(previous, user.id).await? {
                debug!("🔄️ Request #{previous} superseded by #{}", created.request.id);
                self.publish(ChangeKind::Deleted, &old);
            }
        }
        Ok(created)
    }

    /// The vendor's single answer to a request.
    ///
    /// `is_available = true` moves the request to `responded` with the estimate; `false` moves it to `rejected` and
    /// discards any estimate. Only the owner of the addressed restaurant may answer, and only while the request is
    /// pending.
    pub async fn respond(
        &self,
        vendor: &CurrentUser,
        request_id: i64,
        estimated_time: Option<String>,
        is_available: bool,
    ) -> Result<AvailabilityRequest, AvailabilityApiError> {
        if !vendor.is_vendor() {
            return Err(AvailabilityApiError::AccessDenied);
        }
        let request = self.db.fetch_availability_request(request_id).await?.ok_or(AvailabilityApiError::AccessDenied)?;
        let restaurant = self
            .db
            .fetch_restaurant(request.request.restaurant_id)
            .await?
            .ok_or(AvailabilityApiError::AccessDenied)?;
        if restaurant.owner_id != vendor.id {
            warn!("🔄️ Vendor #{} tried to answer request #{request_id} for restaurant #{}", vendor.id, restaurant.id);
            return Err(AvailabilityApiError::AccessDenied);
        }
        let (status, estimate) = if is_available {
            (AvailabilityStatus::Responded, estimated_time.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
        } else {
            (AvailabilityStatus::Rejected, None)
        };
        let updated = self.db.resolve_availability_request(request_id, status, estimate).await?;
        info!("🔄️ Restaurant #{} answered request #{request_id}: {status}", restaurant.id);
        self.publish(ChangeKind::Updated, &updated);
        Ok(updated)
    }

    /// The session's latest request, re-read from the store.
    pub async fn current_request(
        &self,
        user: &CurrentUser,
        session: &CustomerSession,
    ) -> Result<Option<AvailabilityRequestWithItems>, AvailabilityApiError> {
        if session.customer_id() != user.id {
            return Err(AvailabilityApiError::AccessDenied);
        }
        let Some(id) = session.availability_request_id() else {
            return Ok(None);
        };
        let request = self.db.fetch_availability_request(id).await?;
        Ok(request.filter(|r| r.request.customer_id == user.id))
    }

    /// Withdraws a pending request. Returns false if there was nothing to withdraw.
    pub async fn withdraw_request(&self, user: &CurrentUser, request_id: i64) -> Result<bool, AvailabilityApiError> {
        match self.db.delete_pending_request(request_id, user.id).await? {
            Some(req) => {
                self.publish(ChangeKind::Deleted, &req);
                Ok(true)
            },
            None => Ok(false),
        }
    }

    pub async fn vendor_restaurant_ids(&self, vendor: &CurrentUser) -> Result<Vec<i64>, AvailabilityApiError> {
        if !vendor.is_vendor() {
            return Err(AvailabilityApiError::AccessDenied);
        }
        let restaurants = self.db.restaurants_for_owner(vendor.id).await?;
        Ok(restaurants.into_iter().map(|r| r.id).collect())
    }

    /// Pending requests with at least one item, for all of the vendor's restaurants, oldest first.
    pub async fn vendor_queue(
        &self,
        vendor: &CurrentUser,
    ) -> Result<Vec<AvailabilityRequestWithItems>, AvailabilityApiError> {
        let ids = self.vendor_restaurant_ids(vendor).await?;
        Ok(self.db.pending_requests_for_restaurants(&ids).await?)
    }

    /// Expires requests that have been pending for longer than `timeout`, notifying both sides of each.
    pub async fn expire_stale_requests(
        &self,
        timeout: Duration,
    ) -> Result<Vec<AvailabilityRequest>, AvailabilityApiError> {
        let expired = self.db.expire_pending_requests(timeout).await?;
        for request in &expired {
            info!("🔄️ Availability request #{} expired without an answer", request.id);
            self.publish(ChangeKind::Updated, request);
        }
        Ok(expired)
    }
}

impl<B> AvailabilityApi<B>
where B: AvailabilityManagement + CatalogManagement + Clone
{
    /// A live view of one of the customer's requests.
    pub async fn watch_request(
        &self,
        user: &CurrentUser,
        request_id: i64,
    ) -> Result<AvailabilityWatcher<B>, AvailabilityApiError> {
        let query = AvailabilityRequestQuery::new(self.db.clone(), request_id);
        let view = LiveView::start(query, &self.fabric, Scope::AvailabilityRequest(request_id)).await?;
        match view.current() {
            Some(r) if r.request.customer_id == user.id => Ok(view),
            _ => Err(AvailabilityApiError::AccessDenied),
        }
    }

    /// A live view of the vendor's actionable queue.
    pub async fn watch_vendor_queue(&self, vendor: &CurrentUser) -> Result<VendorQueueWatcher<B>, AvailabilityApiError> {
        let ids = self.vendor_restaurant_ids(vendor).await?;
        let scope = Scope::AvailabilityForRestaurants(ids.iter().copied().collect::<BTreeSet<_>>());
        let query = VendorQueueQuery::new(self.db.clone(), ids);
        Ok(LiveView::start(query, &self.fabric, scope).await?)
    }
}
