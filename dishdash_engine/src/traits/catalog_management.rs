use thiserror::Error;

use crate::db_types::{MenuItem, Restaurant};

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        CatalogError::DatabaseError(e.to_string())
    }
}

/// Read access to restaurants and their menus. Menu maintenance happens elsewhere.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    async fn fetch_restaurant(&self, restaurant_id: i64) -> Result<Option<Restaurant>, CatalogError>;

    /// All restaurants owned by the vendor with the given profile id.
    async fn restaurants_for_owner(&self, owner_id: i64) -> Result<Vec<Restaurant>, CatalogError>;

    async fn fetch_menu_item(&self, item_id: i64) -> Result<Option<MenuItem>, CatalogError>;

    async fn fetch_menu_items(&self, item_ids: &[i64]) -> Result<Vec<MenuItem>, CatalogError>;
}
