//! Per-customer session state.
//!
//! Each customer has one [`CustomerSession`] holding their cart, the id of their latest availability request and a
//! flag that is raised while a checkout is in flight. Sessions live in a [`SessionRegistry`] behind a
//! `tokio::sync::Mutex`, so every cart operation for one customer is serialized.
use std::{collections::HashMap, sync::Arc};

use log::*;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use crate::{
    cart::{Cart, CartChange, CartError, CartLine},
    db_types::MenuItem,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("A checkout is already in progress for this cart")]
    CheckoutInProgress,
    #[error("Menu item {0} is not currently available")]
    ItemUnavailable(i64),
    #[error("{0}")]
    Cart(#[from] CartError),
}

#[derive(Debug, Clone)]
pub struct CustomerSession {
    customer_id: i64,
    cart: Cart,
    availability_request_id: Option<i64>,
    placing_order: bool,
}

impl CustomerSession {
    pub fn new(customer_id: i64) -> Self {
        Self { customer_id, cart: Cart::new(), availability_request_id: None, placing_order: false }
    }

    pub fn customer_id(&self) -> i64 {
        self.customer_id
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn availability_request_id(&self) -> Option<i64> {
        self.availability_request_id
    }

    pub fn is_placing_order(&self) -> bool {
        self.placing_order
    }

    fn guard(&self) -> Result<(), SessionError> {
        if self.placing_order {
            return Err(SessionError::CheckoutInProgress);
        }
        Ok(())
    }

    pub fn add_item(&mut self, item: MenuItem) -> Result<CartChange, SessionError> {
        self.guard()?;
        if !item.is_available {
            return Err(SessionError::ItemUnavailable(item.id));
        }
        let restaurant_id = item.restaurant_id;
        let change = self.cart.add_item(item, restaurant_id)?;
        if let CartChange::SwitchedRestaurant { previous } = change {
            info!("🛒️ Customer #{} switched restaurant from {previous} to {restaurant_id}", self.customer_id);
        }
        Ok(change)
    }

    pub fn remove_item(&mut self, item_id: i64) -> Result<CartLine, SessionError> {
        self.guard()?;
        Ok(self.cart.remove_item(item_id)?)
    }

    pub fn set_quantity(&mut self, item_id: i64, quantity: i64) -> Result<(), SessionError> {
        self.guard()?;
        Ok(self.cart.set_quantity(item_id, quantity)?)
    }

    /// Empties the cart and forgets the current availability request, which is returned so the caller can withdraw
    /// it from the store if it is still pending.
    pub fn clear_cart(&mut self) -> Result<Option<i64>, SessionError> {
        self.guard()?;
        self.cart.clear();
        Ok(self.availability_request_id.take())
    }

    /// Forgets the current availability request if the cart no longer holds what it was sent for: the cart is empty or
    /// was just replaced by a switch of restaurant. Returns the forgotten id.
    pub fn detach_stale_request(&mut self, change: Option<CartChange>) -> Option<i64> {
        let switched = matches!(change, Some(CartChange::SwitchedRestaurant { .. }));
        if switched || self.cart.is_empty() {
            self.availability_request_id.take()
        } else {
            None
        }
    }

    /// Records a newly sent availability request, returning the one it supersedes.
    pub fn set_availability_request(&mut self, request_id: i64) -> Option<i64> {
        self.availability_request_id.replace(request_id)
    }

    /// Raises the checkout flag. Fails if it is already raised.
    pub fn begin_checkout(&mut self) -> Result<(), SessionError> {
        self.guard()?;
        self.placing_order = true;
        Ok(())
    }

    pub fn end_checkout(&mut self) {
        self.placing_order = false;
    }

    /// Resets the cart and availability state once an order has been written.
    pub fn order_placed(&mut self) {
        self.cart.clear();
        self.availability_request_id = None;
    }
}

pub type SharedSession = Arc<Mutex<CustomerSession>>;

/// All live customer sessions, keyed by customer id.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<i64, SharedSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session for `customer_id`, creating an empty one if needed.
    pub async fn session(&self, customer_id: i64) -> SharedSession {
        if let Some(s) = self.sessions.read().await.get(&customer_id) {
            return Arc::clone(s);
        }
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(customer_id).or_insert_with(|| {
            trace!("🛒️ New session for customer #{customer_id}");
            Arc::new(Mutex::new(CustomerSession::new(customer_id)))
        });
        Arc::clone(session)
    }

    /// Drops the session for `customer_id`, e.g. on sign-out.
    pub async fn remove(&self, customer_id: i64) -> Option<SharedSession> {
        self.sessions.write().await.remove(&customer_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
