//! Signed access tokens.
//!
//! Tokens are HS256 JWTs carrying the user's id, email and role. Logout
//! revokes a token by its `jti`; revocations live in an in-process cache
//! and each entry is dropped at that token's own `exp`. The cache has no
//! size bound, so a revocation is never evicted early.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use moka::Expiry;
use moka::future::Cache;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bookstore_core::{Email, Role, UserId};

use super::TokenError;
use crate::config::AuthConfig;
use crate::models::{CurrentUser, User};

/// JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User id, as a string per JWT convention.
    pub sub: String,
    pub email: String,
    pub role: Role,
    /// Issued at (seconds since epoch).
    pub iat: i64,
    /// Expiry (seconds since epoch).
    pub exp: i64,
    /// Unique token id.
    pub jti: Uuid,
}

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Keeps a revoked `jti` until the token's expiry.
struct UntilTokenExpiry;

impl Expiry<Uuid, DateTime<Utc>> for UntilTokenExpiry {
    fn expire_after_create(
        &self,
        _jti: &Uuid,
        expires_at: &DateTime<Utc>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(
            expires_at
                .signed_duration_since(Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO),
        )
    }
}

/// Issues, verifies and revokes access tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    /// Revoked token ids, valued by the token's expiry.
    revoked: Cache<Uuid, DateTime<Utc>>,
}

impl TokenService {
    /// Create a token service from auth configuration.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();

        let revoked = Cache::builder().expire_after(UntilTokenExpiry).build();

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: config.token_ttl,
            revoked,
        }
    }

    /// Token lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for a user.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if signing fails.
    pub fn issue(&self, user: &User) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(self.ttl).map_err(|_| TokenError::Invalid)?;
        let expires_at = now + ttl;

        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.as_str().to_owned(),
            role: user.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
        };

        let token = self.sign(&claims)?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Check a token's signature, expiry and revocation status.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired` for expired tokens, `TokenError::Revoked`
    /// for logged-out tokens and `TokenError::Invalid` for anything else.
    pub fn verify(&self, token: &str) -> Result<CurrentUser, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;
        let claims = data.claims;

        if self.revoked.contains_key(&claims.jti) {
            return Err(TokenError::Revoked);
        }

        let id = claims
            .sub
            .parse::<i32>()
            .map(UserId::new)
            .map_err(|_| TokenError::Invalid)?;
        let email = Email::parse(&claims.email).map_err(|_| TokenError::Invalid)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or(TokenError::Invalid)?;

        Ok(CurrentUser {
            id,
            email,
            role: claims.role,
            token_id: claims.jti,
            expires_at,
        })
    }

    /// Reject the caller's token from now on.
    pub async fn revoke(&self, user: &CurrentUser) {
        self.revoked.insert(user.token_id, user.expires_at).await;
        tracing::debug!(user_id = %user.id, "Token revoked");
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(TokenError::Encoding)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bookstore_core::CartId;
    use secrecy::SecretString;

    use super::*;

    fn service() -> TokenService {
        TokenService::new(&AuthConfig {
            secret: SecretString::from("k3Yq9vTz2LmN8pRw4XcB7dHf1JsG6aUe"),
            token_ttl: Duration::from_secs(3600),
        })
    }

    fn user() -> User {
        User {
            id: UserId::new(7),
            name: "Ada".to_owned(),
            email: Email::parse("ada@example.com").unwrap(),
            role: Role::Customer,
            cart_id: Some(CartId::new(3)),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_then_verify() {
        let tokens = service();
        let issued = tokens.issue(&user()).unwrap();

        let current = tokens.verify(&issued.token).unwrap();
        assert_eq!(current.id, UserId::new(7));
        assert_eq!(current.email.as_str(), "ada@example.com");
        assert_eq!(current.role, Role::Customer);
        assert_eq!(current.expires_at.timestamp(), issued.expires_at.timestamp());
    }

    #[test]
    fn test_rejects_tampered_token() {
        let tokens = service();
        let first = tokens.issue(&user()).unwrap().token;
        let second = tokens.issue(&user()).unwrap().token;

        // Payload of one token with the signature of another.
        let (signed, _) = first.rsplit_once('.').unwrap();
        let (_, signature) = second.rsplit_once('.').unwrap();
        let tampered = format!("{signed}.{signature}");

        assert!(matches!(tokens.verify(&tampered), Err(TokenError::Invalid)));
        assert!(matches!(tokens.verify("not.a.jwt"), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_rejects_token_from_other_secret() {
        let other = TokenService::new(&AuthConfig {
            secret: SecretString::from("Zp4Wq8Rt2Yu6Io0Pa3Sd5Fg7Hj9Kl1Xc"),
            token_ttl: Duration::from_secs(3600),
        });
        let issued = other.issue(&user()).unwrap();

        assert!(matches!(
            service().verify(&issued.token),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_rejects_expired_token() {
        let tokens = service();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "7".to_owned(),
            email: "ada@example.com".to_owned(),
            role: Role::Customer,
            iat: now - 7200,
            exp: now - 3600,
            jti: Uuid::new_v4(),
        };
        let token = tokens.sign(&claims).unwrap();

        assert!(matches!(tokens.verify(&token), Err(TokenError::Expired)));
    }

    #[tokio::test]
    async fn test_revoked_token_is_rejected() {
        let tokens = service();
        let issued = tokens.issue(&user()).unwrap();
        let current = tokens.verify(&issued.token).unwrap();

        tokens.revoke(&current).await;

        assert!(matches!(
            tokens.verify(&issued.token),
            Err(TokenError::Revoked)
        ));

        // A new login is unaffected.
        let fresh = tokens.issue(&user()).unwrap();
        assert!(tokens.verify(&fresh.token).is_ok());
    }

    #[tokio::test]
    async fn test_early_revocation_survives_many_later_ones() {
        let tokens = service();
        let first = tokens.issue(&user()).unwrap();
        tokens.revoke(&tokens.verify(&first.token).unwrap()).await;

        for _ in 0..110_000 {
            let later = CurrentUser {
                id: UserId::new(7),
                email: Email::parse("ada@example.com").unwrap(),
                role: Role::Customer,
                token_id: Uuid::new_v4(),
                expires_at: first.expires_at,
            };
            tokens.revoke(&later).await;
        }
        tokens.revoked.run_pending_tasks().await;

        assert!(matches!(
            tokens.verify(&first.token),
            Err(TokenError::Revoked)
        ));
    }

    #[tokio::test]
    async fn test_revocation_expires_with_token() {
        let tokens = service();
        let mut current = tokens.verify(&tokens.issue(&user()).unwrap().token).unwrap();
        current.expires_at = Utc::now() - chrono::Duration::seconds(1);

        tokens.revoke(&current).await;
        tokens.revoked.run_pending_tasks().await;

        assert!(!tokens.revoked.contains_key(&current.token_id));
    }
}
