use log::trace;
use sqlx::SqliteConnection;

use super::is_unique_violation_on;
use crate::{
    db_types::{NewPaymentIntent, PaymentIntent, PaymentIntentStatus},
    traits::PaymentRecordError,
};

pub async fn insert_intent(
    intent: NewPaymentIntent,
    conn: &mut SqliteConnection,
) -> Result<PaymentIntent, PaymentRecordError> {
    let result = sqlx::query_as(
        r#"
            INSERT INTO payment_intents (intent_id, customer_id, amount, currency, receipt)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(&intent.intent_id)
    .bind(intent.customer_id)
    .bind(intent.amount)
    .bind(&intent.currency)
    .bind(&intent.receipt)
    .fetch_one(conn)
    .await;
    match result {
        Ok(row) => {
            trace!("🗃️ Payment intent {} recorded", intent.intent_id);
            Ok(row)
        },
        Err(e) if is_unique_violation_on(&e, "intent_id") => {
            Err(PaymentRecordError::IntentAlreadyExists(intent.intent_id))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_intent(intent_id: &str, conn: &mut SqliteConnection) -> Result<Option<PaymentIntent>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payment_intents WHERE intent_id = $1").bind(intent_id).fetch_optional(conn).await
}

/// Compare-and-set on the intent status.
pub async fn transition_intent(
    intent_id: &str,
    from: PaymentIntentStatus,
    to: PaymentIntentStatus,
    conn: &mut SqliteConnection,
) -> Result<PaymentIntent, PaymentRecordError> {
    let updated: Option<PaymentIntent> = sqlx::query_as(
        r#"
            UPDATE payment_intents SET status = $1, updated_at = CURRENT_TIMESTAMP
            WHERE intent_id = $2 AND status = $3
            RETURNING *;
        "#,
    )
    .bind(to)
    .bind(intent_id)
    .bind(from)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(intent) = updated {
        return Ok(intent);
    }
    match fetch_intent(intent_id, conn).await? {
        Some(intent) => Err(PaymentRecordError::IntentStatusConflict {
            intent_id: intent_id.to_string(),
            expected: from,
            actual: intent.status,
        }),
        None => Err(PaymentRecordError::IntentNotFound(intent_id.to_string())),
    }
}
