//! # Cart store
//!
//! An in-memory, single-owner collection of line items. A cart is bound to at most one restaurant at a time. Adding
//! an item from a different restaurant throws away everything in the cart and starts again with the new item.
//!
//! The cart is never persisted. The only durable copy of its contents is the item snapshot written when an
//! availability request is sent.
use log::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{MenuItem, Money, NewAvailabilityItem};

/// The most units of one menu item a single cart line may hold.
pub const MAX_LINE_QUANTITY: i64 = 99;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Item {0} is not in the cart")]
    ItemNotInCart(i64),
    #[error("Item {item_id} belongs to restaurant {actual}, not {expected}")]
    RestaurantMismatch { item_id: i64, expected: i64, actual: i64 },
    #[error("At most {MAX_LINE_QUANTITY} of item {item_id} can be ordered at once, not {quantity}")]
    QuantityTooLarge { item_id: i64, quantity: i64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartLine {
    pub item_id: i64,
    pub menu_item: MenuItem,
    pub quantity: i64,
    pub unit_price: Money,
}

impl CartLine {
    pub fn subtotal(&self) -> Money {
        self.unit_price * self.quantity
    }
}

/// What an [`Cart::add_item`] call did to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartChange {
    /// A new line was appended.
    Added,
    /// The item was already present and its quantity went up by one.
    Incremented { quantity: i64 },
    /// The cart held items from `previous`. They were discarded and the cart is now bound to the new restaurant.
    SwitchedRestaurant { previous: i64 },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cart {
    restaurant_id: Option<i64>,
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restaurant_id(&self) -> Option<i64> {
        self.restaurant_id
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Σ unit_price × quantity over all lines.
    pub fn total(&self) -> Money {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// Adds one unit of `item` to the cart.
    ///
    /// `restaurant_id` must be the restaurant the item belongs to. If the cart is currently bound to another
    /// restaurant, its lines are discarded first and [`CartChange::SwitchedRestaurant`] is returned.
    pub fn add_item(&mut self, item: MenuItem, restaurant_id: i64) -> Result<CartChange, CartError> {
        if item.restaurant_id != restaurant_id {
            return Err(CartError::RestaurantMismatch {
                item_id: item.id,
                expected: restaurant_id,
                actual: item.restaurant_id,
            });
        }
        let mut change = CartChange::Added;
        if self.restaurant_id == Some(restaurant_id) {
            if let Some(line) = self.lines.iter().find(|l| l.item_id == item.id) {
                check_quantity(item.id, line.quantity + 1)?;
            }
        }
        if let Some(previous) = self.restaurant_id.filter(|&r| r != restaurant_id) {
            debug!("🛒️ Switching cart from restaurant {previous} to {restaurant_id}. {} lines dropped", self.lines.len());
            self.lines.clear();
            change = CartChange::SwitchedRestaurant { previous };
        }
        self.restaurant_id = Some(restaurant_id);
        if let Some(line) = self.lines.iter_mut().find(|l| l.item_id == item.id) {
            line.quantity += 1;
            return Ok(CartChange::Incremented { quantity: line.quantity });
        }
        let line = CartLine { item_id: item.id, unit_price: item.price, menu_item: item, quantity: 1 };
        self.lines.push(line);
        Ok(change)
    }

    /// Removes the line for `item_id`, returning it. Removing the last line unbinds the restaurant.
    pub fn remove_item(&mut self, item_id: i64) -> Result<CartLine, CartError> {
        let pos = self.lines.iter().position(|l| l.item_id == item_id).ok_or(CartError::ItemNotInCart(item_id))?;
        let line = self.lines.remove(pos);
        if self.lines.is_empty() {
            self.restaurant_id = None;
        }
        Ok(line)
    }

    /// Sets the quantity of an existing line. A quantity of zero or less removes the line.
    pub fn set_quantity(&mut self, item_id: i64, quantity: i64) -> Result<(), CartError> {
        if quantity <= 0 {
            return self.remove_item(item_id).map(|_| ());
        }
        check_quantity(item_id, quantity)?;
        let line = self.lines.iter_mut().find(|l| l.item_id == item_id).ok_or(CartError::ItemNotInCart(item_id))?;
        line.quantity = quantity;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.restaurant_id = None;
    }

    /// Canonical `(item_id, quantity)` list, sorted by item id.
    pub fn fingerprint(&self) -> Vec<(i64, i64)> {
        let mut fp = self.lines.iter().map(|l| (l.item_id, l.quantity)).collect::<Vec<_>>();
        fp.sort_unstable();
        fp
    }

    pub fn snapshot(&self) -> Vec<NewAvailabilityItem> {
        self.lines.iter().map(|l| NewAvailabilityItem { menu_item_id: l.item_id, quantity: l.quantity }).collect()
    }
}

fn check_quantity(item_id: i64, quantity: i64) -> Result<(), CartError> {
    if quantity > MAX_LINE_QUANTITY {
        return Err(CartError::QuantityTooLarge { item_id, quantity });
    }
    Ok(())
}
