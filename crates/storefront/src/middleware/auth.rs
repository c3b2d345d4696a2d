//! Authentication extractor and token cookie helpers.
//!
//! API clients send `Authorization: Bearer <token>`; browsers get the same
//! token in an `HttpOnly` cookie at login. The header wins when both are
//! present.

use std::time::Duration;

use axum::{
    extract::FromRequestParts,
    http::{
        HeaderMap, HeaderValue,
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
};

use crate::error::{AppError, set_sentry_user};
use crate::models::CurrentUser;
use crate::models::session::TOKEN_COOKIE_NAME;
use crate::state::AppState;

/// Extractor that requires a valid access token.
///
/// Rejects with 401 when the token is missing, malformed, expired or
/// revoked.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_owned()))?;

        let user = state.tokens().verify(token)?;

        set_sentry_user(&user.id, Some(user.email.as_str()));
        tracing::Span::current().record("user_id", user.id.as_i32());

        Ok(Self(user))
    }
}

/// Find the access token in the `Authorization` header or the token cookie.
fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        return bearer_token(value);
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|cookies| cookie_value(cookies, TOKEN_COOKIE_NAME))
}

/// Token part of a `Bearer` authorization value. The scheme is case-insensitive.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Value of a named cookie in a `Cookie` header.
fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value carrying a freshly issued token.
///
/// Returns `None` if the token contains bytes not allowed in a header.
#[must_use]
pub fn token_cookie(token: &str, max_age: Duration, secure: bool) -> Option<HeaderValue> {
    let mut cookie = format!(
        "{TOKEN_COOKIE_NAME}={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        max_age.as_secs()
    );
    if secure {
        cookie.push_str("; Secure");
    }

    HeaderValue::from_str(&cookie).ok()
}

/// `Set-Cookie` value that removes the token cookie.
#[must_use]
pub fn clear_token_cookie(secure: bool) -> HeaderValue {
    if secure {
        HeaderValue::from_static(
            "bookstore_token=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0; Secure",
        )
    } else {
        HeaderValue::from_static("bookstore_token=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0")
    }
}
