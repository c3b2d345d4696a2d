//! Newsletter subscriber repository.

use async_trait::async_trait;
use sqlx::PgPool;

use bookstore_core::Email;

use super::{NewsletterStore, RepositoryError};

/// `PostgreSQL` implementation of [`NewsletterStore`].
#[derive(Clone)]
pub struct PgNewsletterRepository {
    pool: PgPool,
}

impl PgNewsletterRepository {
    /// Create a new newsletter repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NewsletterStore for PgNewsletterRepository {
    async fn subscribe(&self, email: &Email, locale: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO newsletter_subscribers (email, locale)
            VALUES ($1, $2)
            ON CONFLICT (email) DO NOTHING
            ",
        )
        .bind(email.as_str())
        .bind(locale)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
