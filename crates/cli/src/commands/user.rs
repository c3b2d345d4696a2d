//! User management commands.
//!
//! The only way to create an `admin`: the HTTP API registers customers only.
//!
//! # Environment Variables
//!
//! - `BOOKSTORE_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `BOOKSTORE_USER_PASSWORD` - Password for `user create`

use bookstore_core::{Email, Password, Role, UserId};
use bookstore_storefront::db::{PgUserRepository, RepositoryError, UserStore, create_pool};
use bookstore_storefront::models::NewUser;
use bookstore_storefront::services::auth::{hash_password, validate_name};

use super::{CliError, database_url};

/// Create a user with a cart.
///
/// # Returns
///
/// The ID of the created user.
pub async fn create(
    email: &str,
    name: &str,
    role: &str,
    password: &str,
) -> Result<UserId, CliError> {
    let new_user = build_user(email, name, role, password)?;

    let pool = create_pool(&database_url()?).await?;
    let users = PgUserRepository::new(pool);

    tracing::info!("Creating user: {} ({})", new_user.email, new_user.role);

    let user = users
        .create_with_cart(&new_user)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => CliError::UserExists(new_user.email.to_string()),
            other => CliError::Repository(other),
        })?;

    Ok(user.id)
}

/// Validate input and hash the password.
fn build_user(email: &str, name: &str, role: &str, password: &str) -> Result<NewUser, CliError> {
    let role: Role = role
        .parse()
        .map_err(|e| CliError::Invalid(format!("{e}. Valid roles: customer, admin")))?;
    let email = Email::parse_normalized(email).map_err(|e| CliError::Invalid(e.to_string()))?;
    let name = validate_name(name).map_err(|e| CliError::Invalid(e.to_string()))?;
    let password = Password::validate(password).map_err(|e| CliError::Invalid(e.to_string()))?;
    let password_hash =
        hash_password(password.expose()).map_err(|e| CliError::Invalid(e.to_string()))?;

    Ok(NewUser {
        name,
        email,
        password_hash,
        role,
    })
}
