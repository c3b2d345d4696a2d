//! Authentication error types.

use thiserror::Error;

use bookstore_core::{EmailError, PasswordError};

use crate::db::RepositoryError;

/// Errors that can occur during registration, login and profile updates.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Password does not satisfy the policy.
    #[error("password validation failed: {0}")]
    WeakPassword(#[from] PasswordError),

    /// Display name is blank or too long.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

/// Errors produced while issuing or checking access tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Signature, format or claims are wrong.
    #[error("invalid token")]
    Invalid,

    /// The token's `exp` is in the past.
    #[error("token expired")]
    Expired,

    /// The token was revoked by a logout.
    #[error("token revoked")]
    Revoked,

    /// Signing failed.
    #[error("token encoding failed: {0}")]
    Encoding(#[source] jsonwebtoken::errors::Error),
}
