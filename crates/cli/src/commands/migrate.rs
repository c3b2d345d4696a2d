//! Database migration command.
//!
//! Applies the storefront migrations embedded in `bookstore-storefront`
//! (`crates/storefront/migrations/`). Already-applied migrations are skipped.
//!
//! # Environment Variables
//!
//! - `BOOKSTORE_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

use bookstore_storefront::db::{MIGRATOR, create_pool};

use super::{CliError, database_url};

/// Run all pending migrations.
pub async fn run() -> Result<(), CliError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = create_pool(&database_url).await?;

    tracing::info!("Running migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
