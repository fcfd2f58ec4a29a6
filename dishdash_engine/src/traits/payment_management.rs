use thiserror::Error;

use crate::db_types::{NewPaymentIntent, PaymentIntent, PaymentIntentStatus};

#[derive(Debug, Clone, Error)]
pub enum PaymentRecordError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Payment intent {0} does not exist")]
    IntentNotFound(String),
    #[error("Payment intent {0} already exists")]
    IntentAlreadyExists(String),
    #[error("Payment intent {intent_id} is {actual}, expected {expected}")]
    IntentStatusConflict { intent_id: String, expected: PaymentIntentStatus, actual: PaymentIntentStatus },
}

impl From<sqlx::Error> for PaymentRecordError {
    fn from(e: sqlx::Error) -> Self {
        PaymentRecordError::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait PaymentManagement {
    async fn insert_payment_intent(&self, intent: NewPaymentIntent) -> Result<PaymentIntent, PaymentRecordError>;

    async fn fetch_payment_intent(&self, intent_id: &str) -> Result<Option<PaymentIntent>, PaymentRecordError>;

    /// Moves the intent from `from` to `to`. Fails with `IntentStatusConflict` if it is not currently `from`.
    async fn transition_payment_intent(
        &self,
        intent_id: &str,
        from: PaymentIntentStatus,
        to: PaymentIntentStatus,
    ) -> Result<PaymentIntent, PaymentRecordError>;
}
