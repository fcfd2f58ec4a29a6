use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::is_unique_violation_on;
use crate::{
    db_types::{NewOrder, NewOrderItem, NewPaymentRoute, Order, OrderItem, OrderStatusType, PaymentRoute},
    order_objects::OrderQueryFilter,
    traits::{OrderManagementError, PlacedOrder},
};

fn map_insert_error(e: sqlx::Error, order: &NewOrder, route: &NewPaymentRoute) -> OrderManagementError {
    if is_unique_violation_on(&e, "availability_request_id") {
        OrderManagementError::AvailabilityAlreadyUsed(order.availability_request_id)
    } else if is_unique_violation_on(&e, "gateway_payment_id") {
        OrderManagementError::PaymentAlreadyUsed(route.gateway_payment_id.clone())
    } else {
        e.into()
    }
}

/// Inserts the order, its items and the payment route. This is not atomic: you must run it inside a transaction and
/// pass `&mut *tx` as the connection argument.
pub async fn insert_order(
    order: NewOrder,
    route: NewPaymentRoute,
    conn: &mut SqliteConnection,
) -> Result<PlacedOrder, OrderManagementError> {
    let row: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                customer_id,
                restaurant_id,
                customer_name,
                restaurant_name,
                total,
                estimated_time,
                address,
                phone,
                availability_request_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(order.customer_id)
    .bind(order.restaurant_id)
    .bind(&order.customer_name)
    .bind(&order.restaurant_name)
    .bind(order.total)
    .bind(&order.estimated_time)
    .bind(&order.address)
    .bind(&order.phone)
    .bind(order.availability_request_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_insert_error(e, &order, &route))?;
    debug!("🗃️ Order #{} inserted for customer #{}", row.id, row.customer_id);

    let mut items = Vec::with_capacity(order.items.len());
    for item in &order.items {
        items.push(insert_order_item(row.id, item, &mut *conn).await?);
    }

    let split = route.split;
    let route_row: PaymentRoute = sqlx::query_as(
        r#"
            INSERT INTO payment_routes (
                order_id,
                intent_id,
                total_amount,
                vendor_amount,
                admin_fee,
                gateway_fee,
                gateway_payment_id,
                status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(row.id)
    .bind(&route.intent_id)
    .bind(split.total)
    .bind(split.vendor_amount)
    .bind(split.admin_fee)
    .bind(split.gateway_fee)
    .bind(&route.gateway_payment_id)
    .bind(&route.status)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_insert_error(e, &order, &route))?;
    trace!("🗃️ Payment route #{} stored for order #{}", route_row.id, row.id);
    Ok(PlacedOrder { order: row, items, route: route_row })
}

async fn insert_order_item(
    order_id: i64,
    item: &NewOrderItem,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO order_items (order_id, menu_item_id, name, description, price, quantity)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(item.menu_item_id)
    .bind(&item.name)
    .bind(&item.description)
    .bind(item.price)
    .bind(item.quantity)
    .fetch_one(conn)
    .await
}

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_order_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id").bind(order_id).fetch_all(conn).await
}

pub async fn fetch_payment_route(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentRoute>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payment_routes WHERE order_id = $1").bind(order_id).fetch_optional(conn).await
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in descending order (newest first)
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    if matches!(&query.restaurant_ids, Some(ids) if ids.is_empty()) {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(customer_id) = query.customer_id {
        where_clause.push("customer_id = ");
        where_clause.push_bind_unseparated(customer_id);
    }
    if let Some(ids) = query.restaurant_ids {
        where_clause.push("restaurant_id IN (");
        for (i, id) in ids.into_iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(id);
        }
        where_clause.push_unseparated(")");
    }
    if let Some(statuses) = query.statuses.filter(|s| !s.is_empty()) {
        where_clause.push("status IN (");
        for (i, status) in statuses.into_iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status.to_string());
        }
        where_clause.push_unseparated(")");
    }
    builder.push(" ORDER BY created_at DESC, id DESC");
    if let Some(limit) = query.limit {
        builder.push(" LIMIT ");
        builder.push_bind(i64::from(limit));
    }
    trace!("🗃️ Executing query: {}", builder.sql());
    builder.build_query_as().fetch_all(conn).await
}

/// Overwrites the status. Last write wins.
pub async fn update_order_status(
    id: i64,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
        .bind(status)
        .bind(id)
        .fetch_optional(conn)
        .await
}
