//! CLI subcommands.

pub mod migrate;
pub mod user;

use secrecy::SecretString;
use thiserror::Error;

/// Errors from CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Input rejected by validation.
    #[error("{0}")]
    Invalid(String),

    /// A user with this email already exists.
    #[error("User already exists with email: {0}")]
    UserExists(String),

    /// Storing the user failed.
    #[error("Repository error: {0}")]
    Repository(#[from] bookstore_storefront::db::RepositoryError),
}

/// Database URL, `BOOKSTORE_DATABASE_URL` first, then `DATABASE_URL`.
pub(crate) fn database_url() -> Result<SecretString, CliError> {
    std::env::var("BOOKSTORE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CliError::MissingEnvVar("BOOKSTORE_DATABASE_URL"))
}
