//! Authentication service.
//!
//! Password registration and login against a [`UserStore`], plus the
//! signed access tokens handed out on login (see [`token`]).

mod error;
pub mod token;

pub use error::{AuthError, TokenError};
pub use token::{Claims, IssuedToken, TokenService};

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::instrument;

use bookstore_core::{Email, Password, Role, UserId};

use crate::db::{RepositoryError, UserStore};
use crate::models::{NewUser, User};

/// Maximum display name length, in characters.
pub const MAX_NAME_LENGTH: usize = 100;

/// Hash verified when the login email matches no account, so unknown and
/// known emails cost the same argon2 work.
static DUMMY_PASSWORD_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("Dummy-password-for-timing-1").ok());

/// Authentication service.
///
/// Borrows the user store for the duration of one request.
pub struct AuthService<'a> {
    users: &'a dyn UserStore,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a dyn UserStore) -> Self {
        Self { users }
    }

    /// Register a new customer and create their cart.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidName` if the name is blank or too long.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, name, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let name = validate_name(name)?;
        let email = Email::parse_normalized(email)?;
        let password = Password::validate(password)?;

        let password_hash = hash_password(password.expose())?;

        let new_user = NewUser {
            name,
            email,
            password_hash,
            role: Role::Customer,
        };

        self.users
            .create_with_cart(&new_user)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Login with email and password.
    ///
    /// Unknown emails and wrong passwords are indistinguishable to the caller.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let Ok(email) = Email::parse_normalized(email) else {
            return Err(reject_unknown_user(password));
        };

        let Some((user, password_hash)) = self.users.get_password_hash(&email).await? else {
            return Err(reject_unknown_user(password));
        };

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Change the user's display name.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidName` if the name is blank or too long.
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    #[instrument(skip(self, name))]
    pub async fn rename(&self, user_id: UserId, name: &str) -> Result<User, AuthError> {
        let name = validate_name(name)?;

        self.users
            .update_name(user_id, &name)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }
}

/// Trim a display name and check its length.
///
/// # Errors
///
/// Returns `AuthError::InvalidName` if the trimmed name is empty or longer
/// than [`MAX_NAME_LENGTH`] characters.
pub fn validate_name(name: &str) -> Result<String, AuthError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(AuthError::InvalidName("Name is required".to_owned()));
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AuthError::InvalidName(format!(
            "Name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }

    Ok(name.to_owned())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Spend the same argon2 work as a real verification, then fail.
fn reject_unknown_user(password: &str) -> AuthError {
    if let Some(hash) = DUMMY_PASSWORD_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
    AuthError::InvalidCredentials
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("Correct1horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Correct1horse", &hash).is_ok());
        assert!(matches!(
            verify_password("Wrong1horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hash_is_salted() {
        let a = hash_password("Correct1horse").unwrap();
        let b = hash_password("Correct1horse").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_unknown_user_pays_for_verification() {
        let dummy = DUMMY_PASSWORD_HASH.as_deref().unwrap();
        assert!(dummy.starts_with("$argon2id$"));
        assert!(PasswordHash::new(dummy).is_ok());

        assert!(matches!(
            reject_unknown_user("Dummy-password-for-timing-1"),
            AuthError::InvalidCredentials
        ));
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Ada Lovelace ").unwrap(), "Ada Lovelace");
        assert!(matches!(
            validate_name("   "),
            Err(AuthError::InvalidName(_))
        ));
        assert!(validate_name(&"é".repeat(MAX_NAME_LENGTH)).is_ok());
        assert!(matches!(
            validate_name(&"a".repeat(MAX_NAME_LENGTH + 1)),
            Err(AuthError::InvalidName(_))
        ));
    }
}
