use chrono::Duration;
use thiserror::Error;

use crate::db_types::{AvailabilityRequest, AvailabilityRequestWithItems, AvailabilityStatus, NewAvailabilityRequest};

#[derive(Debug, Clone, Error)]
pub enum AvailabilityError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Availability request {0} does not exist")]
    RequestNotFound(i64),
    #[error("Availability request {0} has already been resolved")]
    RequestAlreadyResolved(i64),
    #[error("An availability request must contain at least one item")]
    EmptyRequest,
    #[error("{0} is not a valid response status")]
    InvalidResponseStatus(AvailabilityStatus),
}

impl From<sqlx::Error> for AvailabilityError {
    fn from(e: sqlx::Error) -> Self {
        AvailabilityError::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait AvailabilityManagement {
    /// Writes the request and one item row per snapshot line in a single transaction. The request starts `pending`.
    async fn insert_availability_request(
        &self,
        request: NewAvailabilityRequest,
    ) -> Result<AvailabilityRequestWithItems, AvailabilityError>;

    async fn fetch_availability_request(
        &self,
        request_id: i64,
    ) -> Result<Option<AvailabilityRequestWithItems>, AvailabilityError>;

    /// Moves a `pending` request to `status` (`responded` or `rejected`). The write only happens if the request is
    /// still pending, so a request can be resolved at most once.
    async fn resolve_availability_request(
        &self,
        request_id: i64,
        status: AvailabilityStatus,
        estimated_time: Option<String>,
    ) -> Result<AvailabilityRequest, AvailabilityError>;

    /// Deletes the request if it belongs to `customer_id` and is still pending. Returns the deleted request.
    async fn delete_pending_request(
        &self,
        request_id: i64,
        customer_id: i64,
    ) -> Result<Option<AvailabilityRequest>, AvailabilityError>;

    /// Pending requests, with their items, for any of the given restaurants. Requests without items are omitted.
    async fn pending_requests_for_restaurants(
        &self,
        restaurant_ids: &[i64],
    ) -> Result<Vec<AvailabilityRequestWithItems>, AvailabilityError>;

    /// Marks every request that has been pending for longer than `timeout` as `expired`, returning them.
    async fn expire_pending_requests(&self, timeout: Duration) -> Result<Vec<AvailabilityRequest>, AvailabilityError>;
}
