//! Restaurant and menu reads. The insert functions exist for seeding; the marketplace never edits menus.
use dd_common::Money;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::db_types::{MenuItem, Restaurant};

pub async fn fetch_restaurant(id: i64, conn: &mut SqliteConnection) -> Result<Option<Restaurant>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM restaurants WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn restaurants_for_owner(owner_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Restaurant>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM restaurants WHERE owner_id = $1 ORDER BY id").bind(owner_id).fetch_all(conn).await
}

pub async fn fetch_menu_item(id: i64, conn: &mut SqliteConnection) -> Result<Option<MenuItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM menu_items WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_menu_items(ids: &[i64], conn: &mut SqliteConnection) -> Result<Vec<MenuItem>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM menu_items WHERE id IN (");
    let mut list = builder.separated(", ");
    for id in ids {
        list.push_bind(*id);
    }
    list.push_unseparated(") ORDER BY id");
    builder.build_query_as().fetch_all(conn).await
}

pub async fn insert_restaurant(
    owner_id: i64,
    name: &str,
    address: &str,
    conn: &mut SqliteConnection,
) -> Result<Restaurant, sqlx::Error> {
    sqlx::query_as("INSERT INTO restaurants (owner_id, name, address) VALUES ($1, $2, $3) RETURNING *")
        .bind(owner_id)
        .bind(name)
        .bind(address)
        .fetch_one(conn)
        .await
}

pub async fn insert_menu_item(
    restaurant_id: i64,
    name: &str,
    description: Option<&str>,
    price: Money,
    is_available: bool,
    conn: &mut SqliteConnection,
) -> Result<MenuItem, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO menu_items (restaurant_id, name, description, price, is_available)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(restaurant_id)
    .bind(name)
    .bind(description)
    .bind(price)
    .bind(is_available)
    .fetch_one(conn)
    .await
}
