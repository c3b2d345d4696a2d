//! Database access for the storefront.
//!
//! # Tables
//!
//! - `users` - Registered users with their argon2 password hash and role
//! - `carts` - One cart per user, created in the same transaction
//! - `payment_intents` - Local mirror of provider payment intents
//! - `newsletter_subscribers` - Newsletter signups
//!
//! Handlers talk to the database through the [`UserStore`], [`PaymentStore`]
//! and [`NewsletterStore`] traits; the `Pg*Repository` types are the
//! `PostgreSQL` implementations.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p bookstore-cli -- migrate
//! ```

pub mod newsletter;
pub mod payments;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use bookstore_core::{Email, UserId};

use crate::models::{Cart, NewUser, PaymentIntent, PaymentRecord, User};

pub use newsletter::PgNewsletterRepository;
pub use payments::PgPaymentRepository;
pub use users::PgUserRepository;

/// Migrations embedded from `crates/storefront/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Errors returned by repositories.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
    pub(crate) fn from_insert(err: sqlx::Error, conflict: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(conflict.to_owned());
        }
        Self::Database(err)
    }
}

/// Users and their carts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user and an empty cart for it, atomically.
    ///
    /// Returns `RepositoryError::Conflict` if the email is taken.
    async fn create_with_cart(&self, user: &NewUser) -> Result<User, RepositoryError>;

    /// Get a user by ID.
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Get a user together with their password hash.
    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Change a user's display name.
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    async fn update_name(&self, id: UserId, name: &str) -> Result<User, RepositoryError>;

    /// Get the cart owned by a user.
    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError>;

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Mirrored payment intents.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Record a freshly created intent for a user.
    async fn record(
        &self,
        user_id: UserId,
        intent: &PaymentIntent,
    ) -> Result<PaymentRecord, RepositoryError>;

    /// Find the mirror of a provider intent, only if it belongs to `user_id`.
    async fn find_for_user(
        &self,
        user_id: UserId,
        provider_id: &str,
    ) -> Result<Option<PaymentRecord>, RepositoryError>;

    /// Overwrite amount, currency and status from the provider's latest view.
    ///
    /// Returns `RepositoryError::NotFound` if no mirror exists for the user.
    async fn sync(
        &self,
        user_id: UserId,
        intent: &PaymentIntent,
    ) -> Result<PaymentRecord, RepositoryError>;
}

/// Newsletter subscriptions.
#[async_trait]
pub trait NewsletterStore: Send + Sync {
    /// Subscribe an address.
    ///
    /// Returns `true` when the address is new, `false` when it was already
    /// subscribed.
    async fn subscribe(&self, email: &Email, locale: &str) -> Result<bool, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
