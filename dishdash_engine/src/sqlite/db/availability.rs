//! Availability request storage.
//!
//! Generally clients should never call these methods directly, and prefer to use the [`AvailabilityManagement`] trait
//! methods that are implemented on the [`SqliteDatabase`] struct instead.
//!
//! [`AvailabilityManagement`]: crate::traits::AvailabilityManagement
//! [`SqliteDatabase`]: crate::SqliteDatabase
use std::collections::HashMap;

use chrono::Duration;
use log::*;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{
        AvailabilityRequest,
        AvailabilityRequestItem,
        AvailabilityRequestWithItems,
        AvailabilityStatus,
        NewAvailabilityRequest,
    },
    traits::AvailabilityError,
};

/// Inserts the request and its items. This is not atomic; run it inside a transaction.
pub async fn insert_request(
    request: NewAvailabilityRequest,
    conn: &mut SqliteConnection,
) -> Result<AvailabilityRequestWithItems, AvailabilityError> {
    if request.items.is_empty() {
        return Err(AvailabilityError::EmptyRequest);
    }
    let row: AvailabilityRequest = sqlx::query_as(
        r#"
            INSERT INTO availability_requests (customer_id, restaurant_id, query_text)
            VALUES ($1, $2, $3)
            RETURNING *;
        "#,
    )
    .bind(request.customer_id)
    .bind(request.restaurant_id)
    .bind(&request.query_text)
    .fetch_one(&mut *conn)
    .await?;
    let mut items = Vec::with_capacity(request.items.len());
    for item in request.items {
        let item: AvailabilityRequestItem = sqlx::query_as(
            r#"
                INSERT INTO availability_request_items (request_id, menu_item_id, quantity)
                VALUES ($1, $2, $3)
                RETURNING *;
            "#,
        )
        .bind(row.id)
        .bind(item.menu_item_id)
        .bind(item.quantity)
        .fetch_one(&mut *conn)
        .await?;
        items.push(item);
    }
    trace!("🗃️ Availability request #{} stored with {} items", row.id, items.len());
    Ok(AvailabilityRequestWithItems { request: row, items })
}

pub async fn fetch_request(
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<AvailabilityRequest>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM availability_requests WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_items(
    request_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<AvailabilityRequestItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM availability_request_items WHERE request_id = $1 ORDER BY id")
        .bind(request_id)
        .fetch_all(conn)
        .await
}

pub async fn fetch_request_with_items(
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<AvailabilityRequestWithItems>, sqlx::Error> {
    let Some(request) = fetch_request(id, &mut *conn).await? else {
        return Ok(None);
    };
    let items = fetch_items(id, conn).await?;
    Ok(Some(AvailabilityRequestWithItems { request, items }))
}

/// Conditionally resolves a pending request. Distinguishes between a missing request and one that was already
/// resolved.
pub async fn resolve_request(
    id: i64,
    status: AvailabilityStatus,
    estimated_time: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<AvailabilityRequest, AvailabilityError> {
    if !matches!(status, AvailabilityStatus::Responded | AvailabilityStatus::Rejected) {
        return Err(AvailabilityError::InvalidResponseStatus(status));
    }
    let updated: Option<AvailabilityRequest> = sqlx::query_as(
        r#"
            UPDATE availability_requests
            SET status = $1, estimated_time = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND status = 'pending'
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(estimated_time)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(request) => Ok(request),
        None => match fetch_request(id, conn).await? {
            Some(_) => Err(AvailabilityError::RequestAlreadyResolved(id)),
            None => Err(AvailabilityError::RequestNotFound(id)),
        },
    }
}

/// Deletes a request (and its items) if it is still pending and belongs to `customer_id`. Run inside a transaction.
pub async fn delete_pending(
    id: i64,
    customer_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<AvailabilityRequest>, sqlx::Error> {
    sqlx::query(
        r#"
            DELETE FROM availability_request_items
            WHERE request_id = $1 AND EXISTS (
                SELECT 1 FROM availability_requests WHERE id = $1 AND customer_id = $2 AND status = 'pending'
            );
        "#,
    )
    .bind(id)
    .bind(customer_id)
    .execute(&mut *conn)
    .await?;
    sqlx::query_as(
        "DELETE FROM availability_requests WHERE id = $1 AND customer_id = $2 AND status = 'pending' RETURNING *",
    )
    .bind(id)
    .bind(customer_id)
    .fetch_optional(conn)
    .await
}

/// Pending requests that have at least one item, oldest first, for any of `restaurant_ids`.
pub async fn pending_for_restaurants(
    restaurant_ids: &[i64],
    conn: &mut SqliteConnection,
) -> Result<Vec<AvailabilityRequestWithItems>, sqlx::Error> {
    if restaurant_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::<Sqlite>::new(
        r#"
        SELECT * FROM availability_requests r
        WHERE r.status = 'pending'
        AND EXISTS (SELECT 1 FROM availability_request_items i WHERE i.request_id = r.id)
        AND r.restaurant_id IN ("#,
    );
    let mut list = builder.separated(", ");
    for id in restaurant_ids {
        list.push_bind(*id);
    }
    list.push_unseparated(") ORDER BY r.created_at ASC, r.id ASC");
    let requests: Vec<AvailabilityRequest> = builder.build_query_as().fetch_all(&mut *conn).await?;
    if requests.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM availability_request_items WHERE request_id IN (");
    let mut list = builder.separated(", ");
    for r in &requests {
        list.push_bind(r.id);
    }
    list.push_unseparated(") ORDER BY id");
    let items: Vec<AvailabilityRequestItem> = builder.build_query_as().fetch_all(conn).await?;
    let mut grouped: HashMap<i64, Vec<AvailabilityRequestItem>> = HashMap::new();
    for item in items {
        grouped.entry(item.request_id).or_default().push(item);
    }
    let result = requests
        .into_iter()
        .map(|request| {
            let items = grouped.remove(&request.id).unwrap_or_default();
            AvailabilityRequestWithItems { request, items }
        })
        .collect();
    Ok(result)
}

/// Expires every request that has been pending for longer than `timeout`.
pub async fn expire_pending(
    timeout: Duration,
    conn: &mut SqliteConnection,
) -> Result<Vec<AvailabilityRequest>, sqlx::Error> {
    let modifier = format!("-{} seconds", timeout.num_seconds().max(0));
    let expired: Vec<AvailabilityRequest> = sqlx::query_as(
        r#"
            UPDATE availability_requests
            SET status = 'expired', updated_at = CURRENT_TIMESTAMP
            WHERE status = 'pending' AND created_at < datetime('now', $1)
            RETURNING *;
        "#,
    )
    .bind(modifier)
    .fetch_all(conn)
    .await?;
    if !expired.is_empty() {
        debug!("🗃️ {} availability requests expired", expired.len());
    }
    Ok(expired)
}
