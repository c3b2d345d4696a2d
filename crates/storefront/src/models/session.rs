//! Identity carried by an access token.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use bookstore_core::{Email, Role, UserId};

/// The authenticated caller of a request.
///
/// Built from verified token claims; handlers never see the raw token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address at the time the token was issued.
    pub email: Email,
    /// User's role at the time the token was issued.
    pub role: Role,
    /// Token identifier, used for revocation on logout.
    pub token_id: Uuid,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

/// Cookie carrying the access token for browser clients.
pub const TOKEN_COOKIE_NAME: &str = "bookstore_token";
