use std::fmt::Debug;

use log::*;

use crate::{
    cart::CartChange,
    db_types::{CurrentUser, MenuItem},
    dd_api::errors::CartApiError,
    events::{ChangeEvent, ChangeKind, NotificationFabric},
    session::CustomerSession,
    traits::{AvailabilityManagement, CatalogManagement},
};

/// `CartApi` applies customer cart edits to a [`CustomerSession`], resolving menu items from the catalog so the
/// price in the cart is always the stored price.
pub struct CartApi<B> {
    db: B,
    fabric: NotificationFabric,
}

impl<B> Debug for CartApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CartApi")
    }
}

impl<B> CartApi<B> {
    pub fn new(db: B, fabric: NotificationFabric) -> Self {
        Self { db, fabric }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

fn check_owner(user: &CurrentUser, session: &CustomerSession) -> Result<(), CartApiError> {
    if user.is_customer() && session.customer_id() == user.id {
        Ok(())
    } else {
        Err(CartApiError::AccessDenied)
    }
}

impl<B> CartApi<B>
where B: CatalogManagement + AvailabilityManagement
{
    /// Adds one unit of the menu item to the cart. If the item comes from a different restaurant than the rest of the
    /// cart, the cart is replaced and its pending availability request is withdrawn.
    pub async fn add_item(
        &self,
        user: &CurrentUser,
        session: &mut CustomerSession,
        item_id: i64,
    ) -> Result<(CartChange, MenuItem), CartApiError> {
        check_owner(user, session)?;
        let item = self.db.fetch_menu_item(item_id).await?.ok_or(CartApiError::ItemNotFound(item_id))?;
        let change = session.add_item(item.clone())?;
        trace!("🛒️ Customer #{} added item #{item_id}: {change:?}", user.id);
        if let Some(request_id) = session.detach_stale_request(Some(change)) {
            self.withdraw(user, request_id).await?;
        }
        Ok((change, item))
    }

    pub async fn remove_item(
        &self,
        user: &CurrentUser,
        session: &mut CustomerSession,
        item_id: i64,
    ) -> Result<(), CartApiError> {
        check_owner(user, session)?;
        session.remove_item(item_id)?;
        if let Some(request_id) = session.detach_stale_request(None) {
            self.withdraw(user, request_id).await?;
        }
        Ok(())
    }

    pub async fn set_quantity(
        &self,
        user: &CurrentUser,
        session: &mut CustomerSession,
        item_id: i64,
        quantity: i64,
    ) -> Result<(), CartApiError> {
        check_owner(user, session)?;
        session.set_quantity(item_id, quantity)?;
        if let Some(request_id) = session.detach_stale_request(None) {
            self.withdraw(user, request_id).await?;
        }
        Ok(())
    }

    /// Empties the cart. A still-pending availability request for the old cart is withdrawn.
    pub async fn clear_cart(&self, user: &CurrentUser, session: &mut CustomerSession) -> Result<(), CartApiError> {
        check_owner(user, session)?;
        if let Some(request_id) = session.clear_cart()? {
            self.withdraw(user, request_id).await?;
        }
        Ok(())
    }

    /// Deletes the request if it is still pending and tells both sides it is gone. Answered requests are left alone.
    async fn withdraw(&self, user: &CurrentUser, request_id: i64) -> Result<(), CartApiError> {
        if let Some(req) = self.db.delete_pending_request(request_id, user.id).await? {
            debug!("🛒️ Availability request #{request_id} withdrawn with the cart");
            self.fabric.publish(ChangeEvent::Availability {
                kind: ChangeKind::Deleted,
                request_id,
                customer_id: req.customer_id,
                restaurant_id: req.restaurant_id,
                status: None,
            });
        }
        Ok(())
    }
}
