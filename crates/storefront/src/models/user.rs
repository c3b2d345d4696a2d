//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bookstore_core::{CartId, Email, Role, UserId};

/// A registered bookstore user.
///
/// The password hash is deliberately not part of this type so that a
/// `User` can always be serialized into a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Email address (lowercase).
    pub email: Email,
    /// Role of the user.
    pub role: Role,
    /// The user's cart, created together with the user.
    pub cart_id: Option<CartId>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Data needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    /// Argon2id PHC string.
    pub password_hash: String,
    pub role: Role,
}

/// A shopping cart. Each user owns exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}
