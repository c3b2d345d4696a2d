//! Payment intent mirror repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use bookstore_core::{PaymentId, UserId};

use super::{PaymentStore, RepositoryError};
use crate::models::{PaymentIntent, PaymentRecord};

#[derive(FromRow)]
struct PaymentRow {
    id: i32,
    user_id: i32,
    provider_id: String,
    amount: i64,
    currency: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PaymentRow> for PaymentRecord {
    fn from(row: PaymentRow) -> Self {
        Self {
            id: PaymentId::new(row.id),
            user_id: UserId::new(row.user_id),
            provider_id: row.provider_id,
            amount: row.amount,
            currency: row.currency,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// `PostgreSQL` implementation of [`PaymentStore`].
#[derive(Clone)]
pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    /// Create a new payment repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentStore for PgPaymentRepository {
    async fn record(
        &self,
        user_id: UserId,
        intent: &PaymentIntent,
    ) -> Result<PaymentRecord, RepositoryError> {
        let row = sqlx::query_as::<_, PaymentRow>(
            r"
            INSERT INTO payment_intents (user_id, provider_id, amount, currency, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, provider_id, amount, currency, status, created_at, updated_at
            ",
        )
        .bind(user_id.as_i32())
        .bind(&intent.id)
        .bind(intent.amount)
        .bind(&intent.currency)
        .bind(&intent.status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "payment intent already recorded"))?;

        Ok(row.into())
    }

    async fn find_for_user(
        &self,
        user_id: UserId,
        provider_id: &str,
    ) -> Result<Option<PaymentRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, PaymentRow>(
            r"
            SELECT id, user_id, provider_id, amount, currency, status, created_at, updated_at
            FROM payment_intents
            WHERE provider_id = $1 AND user_id = $2
            ",
        )
        .bind(provider_id)
        .bind(user_id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PaymentRecord::from))
    }

    async fn sync(
        &self,
        user_id: UserId,
        intent: &PaymentIntent,
    ) -> Result<PaymentRecord, RepositoryError> {
        let row = sqlx::query_as::<_, PaymentRow>(
            r"
            UPDATE payment_intents
            SET amount = $1, currency = $2, status = $3, updated_at = NOW()
            WHERE provider_id = $4 AND user_id = $5
            RETURNING id, user_id, provider_id, amount, currency, status, created_at, updated_at
            ",
        )
        .bind(intent.amount)
        .bind(&intent.currency)
        .bind(&intent.status)
        .bind(&intent.id)
        .bind(user_id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        row.map(PaymentRecord::from).ok_or(RepositoryError::NotFound)
    }
}
