use std::{collections::BTreeSet, fmt::Debug};

use log::*;

use crate::{
    db_types::{
        AvailabilityRequestWithItems,
        AvailabilityStatus,
        CurrentUser,
        NewOrder,
        NewOrderItem,
        NewPaymentRoute,
        Order,
        OrderStatusType,
        Role,
    },
    dd_api::{
        errors::OrderFlowError,
        live_views::{LiveView, OrderListQuery, OrderListWatcher},
        order_objects::{DeliveryDetails, OrderQueryFilter},
        payment_api::VerifiedPayment,
    },
    events::{
        ChangeEvent,
        ChangeKind,
        EventProducers,
        NotificationFabric,
        OrderPlacedEvent,
        OrderStatusChangedEvent,
        Scope,
    },
    session::CustomerSession,
    traits::{AuthManagement, AvailabilityManagement, CatalogManagement, OrderManagement, PlacedOrder},
};

/// Checks a vendor-requested status change against the fulfilment policy.
///
/// Orders only move forward along `new → confirmed → cooking → ready → dispatched → delivered`, although steps may be
/// skipped. `cancelled` can only be reached from `new` or `confirmed`. `delivered` and `cancelled` are final.
pub fn validate_transition(from: OrderStatusType, to: OrderStatusType) -> Result<(), OrderFlowError> {
    if from == to {
        return Err(OrderFlowError::StatusUnchanged(from));
    }
    let allowed = match (from.rank(), to.rank()) {
        _ if from.is_terminal() => false,
        (Some(_), None) => matches!(from, OrderStatusType::New | OrderStatusType::Confirmed),
        (Some(a), Some(b)) => b > a,
        (None, _) => false,
    };
    if allowed {
        Ok(())
    } else {
        Err(OrderFlowError::InvalidStatusTransition { from, to })
    }
}

/// `OrderFlowApi` owns the order ledger: it places orders once payment is verified, lets vendors advance them, and
/// serves order lists to both sides.
pub struct OrderFlowApi<B> {
    db: B,
    fabric: NotificationFabric,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, fabric: NotificationFabric, producers: EventProducers) -> Self {
        Self { db, fabric, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }

    pub fn fabric(&self) -> &NotificationFabric {
        &self.fabric
    }

    async fn call_order_placed_hook(&self, placed: &PlacedOrder) {
        for emitter in &self.producers.order_placed_producer {
            debug!("🔄️📦️ Notifying order placed hook subscribers");
            let event = OrderPlacedEvent::new(placed.order.clone(), placed.route.gateway_payment_id.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_status_changed_hook(&self, order: &Order, old_status: OrderStatusType) {
        for emitter in &self.producers.status_changed_producer {
            debug!("🔄️📦️ Notifying status changed hook subscribers");
            emitter.publish_event(OrderStatusChangedEvent::new(order.clone(), old_status)).await;
        }
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement + AvailabilityManagement + CatalogManagement + AuthManagement
{
    /// Checks that the session's cart may be turned into an order and builds the order that would be written.
    ///
    /// Everything is re-read from the store: the availability request must be `responded`, belong to this customer
    /// and restaurant, and its item snapshot must match the cart exactly. The total is computed from the cart lines.
    /// Nothing is written.
    pub async fn prepare_order(
        &self,
        user: &CurrentUser,
        session: &CustomerSession,
        details: &DeliveryDetails,
    ) -> Result<NewOrder, OrderFlowError> {
        if !user.is_customer() || session.customer_id() != user.id {
            return Err(OrderFlowError::AccessDenied);
        }
        if !details.is_complete() {
            return Err(OrderFlowError::MissingDeliveryDetails);
        }
        let request = self.check_cart_confirmed(user, session).await?.request;
        let cart = session.cart();
        let restaurant = self
            .db
            .fetch_restaurant(request.restaurant_id)
            .await?
            .ok_or_else(|| cannot_place("the restaurant no longer exists"))?;
        let customer = self.db.fetch_profile(user.id).await?.ok_or(OrderFlowError::AccessDenied)?;
        let items = cart
            .lines()
            .iter()
            .map(|l| NewOrderItem {
                menu_item_id: l.item_id,
                name: l.menu_item.name.clone(),
                description: l.menu_item.description.clone(),
                price: l.unit_price,
                quantity: l.quantity,
            })
            .collect();
        Ok(NewOrder {
            customer_id: user.id,
            restaurant_id: restaurant.id,
            customer_name: customer.full_name,
            restaurant_name: restaurant.name,
            total: cart.total(),
            estimated_time: request.estimated_time,
            address: details.address.trim().to_string(),
            phone: details.phone.trim().to_string(),
            availability_request_id: request.id,
            items,
        })
    }

    /// Checks that the cart has been confirmed by the restaurant, without requiring delivery details. Returns the
    /// confirming request.
    pub async fn check_cart_confirmed(
        &self,
        user: &CurrentUser,
        session: &CustomerSession,
    ) -> Result<AvailabilityRequestWithItems, OrderFlowError> {
        if !user.is_customer() || session.customer_id() != user.id {
            return Err(OrderFlowError::AccessDenied);
        }
        let cart = session.cart();
        let restaurant_id = cart.restaurant_id().ok_or_else(|| cannot_place("no restaurant selected"))?;
        if cart.is_empty() {
            return Err(cannot_place("the cart is empty"));
        }
        let request_id = session.availability_request_id().ok_or_else(|| cannot_place("availability not confirmed"))?;
        let request = self
            .db
            .fetch_availability_request(request_id)
            .await?
            .ok_or_else(|| cannot_place("availability not confirmed"))?;
        if request.request.customer_id != user.id || request.request.restaurant_id != restaurant_id {
            return Err(cannot_place("availability was confirmed for a different cart"));
        }
        match request.request.status {
            AvailabilityStatus::Responded => {},
            AvailabilityStatus::Pending => return Err(cannot_place("the restaurant has not answered yet")),
            AvailabilityStatus::Rejected => return Err(cannot_place("the restaurant cannot fulfil this order")),
            AvailabilityStatus::Expired => return Err(cannot_place("the availability request expired")),
        }
        if request.fingerprint() != cart.fingerprint() {
            return Err(cannot_place("the cart has changed since availability was confirmed"));
        }
        Ok(request)
    }

    /// Writes the order for the session's cart, paid for by `payment`.
    ///
    /// The order, its items and the payment route are written in one transaction. On success the session's cart and
    /// availability state are cleared and the order is announced on the fabric.
    pub async fn place_order(
        &self,
        user: &CurrentUser,
        session: &mut CustomerSession,
        details: DeliveryDetails,
        payment: VerifiedPayment,
    ) -> Result<PlacedOrder, OrderFlowError> {
        let order = self.prepare_order(user, session, &details).await?;
        if payment.customer_id() != user.id {
            return Err(OrderFlowError::AccessDenied);
        }
        if payment.amount() != order.total {
            error!(
                "🔄️📦️ Payment {} of {} does not cover cart total {} for customer #{}",
                payment.payment_id(),
                payment.amount(),
                order.total,
                user.id
            );
            return Err(OrderFlowError::PaymentAmountMismatch { expected: order.total, paid: payment.amount() });
        }
        let route = NewPaymentRoute {
            intent_id: payment.intent_id().to_string(),
            gateway_payment_id: payment.payment_id().to_string(),
            split: payment.split(),
            status: payment.status().to_string(),
        };
        let placed = self.db.insert_order(order, route).await?;
        session.order_placed();
        info!(
            "🔄️📦️ Order #{} placed by customer #{} with restaurant #{} for {}",
            placed.order.id, user.id, placed.order.restaurant_id, placed.order.total
        );
        self.fabric.publish(ChangeEvent::order(ChangeKind::Inserted, &placed.order));
        self.call_order_placed_hook(&placed).await;
        Ok(placed)
    }

    /// Moves an order to `new_status`. Only the owner of the order's restaurant may do this.
    pub async fn update_status(
        &self,
        vendor: &CurrentUser,
        order_id: i64,
        new_status: OrderStatusType,
    ) -> Result<Order, OrderFlowError> {
        if !vendor.is_vendor() {
            return Err(OrderFlowError::AccessDenied);
        }
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::AccessDenied)?;
        let restaurant = self.db.fetch_restaurant(order.restaurant_id).await?.ok_or(OrderFlowError::AccessDenied)?;
        if restaurant.owner_id != vendor.id {
            warn!("🔄️📦️ Vendor #{} tried to update order #{order_id} of restaurant #{}", vendor.id, restaurant.id);
            return Err(OrderFlowError::AccessDenied);
        }
        validate_transition(order.status, new_status)?;
        let updated = self.db.update_order_status(order_id, new_status).await?;
        info!("🔄️📦️ Order #{order_id}: {} → {}", order.status, updated.status);
        self.fabric.publish(ChangeEvent::order(ChangeKind::Updated, &updated));
        self.call_status_changed_hook(&updated, order.status).await;
        Ok(updated)
    }

    /// Fetches an order the caller is allowed to see: their own as a customer, their restaurants' as a vendor, any as
    /// an admin.
    pub async fn fetch_order_for(&self, user: &CurrentUser, order_id: i64) -> Result<Order, OrderFlowError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::AccessDenied)?;
        let visible = match user.role {
            Role::Admin => true,
            Role::Customer => order.customer_id == user.id,
            Role::Vendor => {
                let restaurant = self.db.fetch_restaurant(order.restaurant_id).await?;
                restaurant.is_some_and(|r| r.owner_id == user.id)
            },
        };
        if visible {
            Ok(order)
        } else {
            Err(OrderFlowError::AccessDenied)
        }
    }

    pub async fn get_status(&self, user: &CurrentUser, order_id: i64) -> Result<OrderStatusType, OrderFlowError> {
        self.fetch_order_for(user, order_id).await.map(|o| o.status)
    }

    pub async fn orders_for_customer(&self, user: &CurrentUser) -> Result<Vec<Order>, OrderFlowError> {
        if !user.is_customer() {
            return Err(OrderFlowError::AccessDenied);
        }
        let query = OrderQueryFilter::default().with_customer_id(user.id);
        Ok(self.db.search_orders(query).await?)
    }

    pub async fn vendor_restaurant_ids(&self, vendor: &CurrentUser) -> Result<Vec<i64>, OrderFlowError> {
        if !vendor.is_vendor() {
            return Err(OrderFlowError::AccessDenied);
        }
        let restaurants = self.db.restaurants_for_owner(vendor.id).await?;
        Ok(restaurants.into_iter().map(|r| r.id).collect())
    }

    pub async fn orders_for_vendor(&self, vendor: &CurrentUser) -> Result<Vec<Order>, OrderFlowError> {
        let ids = self.vendor_restaurant_ids(vendor).await?;
        let query = OrderQueryFilter::default().with_restaurant_ids(ids);
        Ok(self.db.search_orders(query).await?)
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement + AvailabilityManagement + CatalogManagement + AuthManagement + Clone
{
    pub async fn watch_customer_orders(&self, user: &CurrentUser) -> Result<OrderListWatcher<B>, OrderFlowError> {
        if !user.is_customer() {
            return Err(OrderFlowError::AccessDenied);
        }
        let query = OrderListQuery::new(self.db.clone(), OrderQueryFilter::default().with_customer_id(user.id));
        Ok(LiveView::start(query, &self.fabric, Scope::OrdersForCustomer(user.id)).await?)
    }

    pub async fn watch_vendor_orders(&self, vendor: &CurrentUser) -> Result<OrderListWatcher<B>, OrderFlowError> {
        let ids = self.vendor_restaurant_ids(vendor).await?;
        let scope = Scope::OrdersForRestaurants(ids.iter().copied().collect::<BTreeSet<_>>());
        let query = OrderListQuery::new(self.db.clone(), OrderQueryFilter::default().with_restaurant_ids(ids));
        Ok(LiveView::start(query, &self.fabric, scope).await?)
    }
}

fn cannot_place(reason: &str) -> OrderFlowError {
    OrderFlowError::CannotPlaceOrder(reason.to_string())
}
