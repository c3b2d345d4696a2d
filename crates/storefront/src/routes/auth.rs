//! Registration, login and logout handlers.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::JsonBody;
use crate::error::{AppError, Result, clear_sentry_user};
use crate::middleware::{RequireAuth, clear_token_cookie, token_cookie};
use crate::models::User;
use crate::services::auth::AuthService;
use crate::services::email::OutgoingEmail;
use crate::state::AppState;

/// Registration request body.
///
/// Missing fields deserialize as empty strings so validation can report
/// which one is wrong.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Login request body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `{"user": ...}` response body.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}

/// Successful login response body.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Create an account and its cart.
///
/// The welcome email is best effort: delivery failures are logged and the
/// account is still created.
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let user = AuthService::new(state.users())
        .register(&body.name, &body.email, &body.password)
        .await?;

    tracing::info!(user_id = %user.id, "User registered");

    send_welcome_email(&state, &user).await;

    Ok((StatusCode::CREATED, Json(UserResponse { user })))
}

async fn send_welcome_email(state: &AppState, user: &User) {
    let email = match OutgoingEmail::welcome(user, &state.config().base_url) {
        Ok(email) => email,
        Err(e) => {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to render welcome email");
            return;
        }
    };

    if let Err(e) = state.mailer().send(&email).await {
        tracing::warn!(user_id = %user.id, error = %e, "Failed to send welcome email");
    }
}

/// Verify credentials and issue an access token.
///
/// The token is returned in the body for API clients and set as an
/// `HttpOnly` cookie for browsers.
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse> {
    let user = AuthService::new(state.users())
        .login(&body.email, &body.password)
        .await?;

    let issued = state.tokens().issue(&user)?;
    let cookie = token_cookie(
        &issued.token,
        state.tokens().ttl(),
        state.config().is_secure(),
    )
    .ok_or_else(|| AppError::Internal("token is not a valid cookie value".to_owned()))?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok((
        [(SET_COOKIE, cookie)],
        Json(LoginResponse {
            user,
            token: issued.token,
            expires_at: issued.expires_at,
        }),
    ))
}

/// Revoke the caller's token and clear the cookie.
#[instrument(skip(state, current), fields(user_id = %current.id))]
pub async fn logout(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> impl IntoResponse {
    state.tokens().revoke(&current).await;
    clear_sentry_user();

    tracing::info!("User logged out");

    (
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, clear_token_cookie(state.config().is_secure()))],
    )
}

/// The authenticated user's profile.
#[instrument(skip(state, current), fields(user_id = %current.id))]
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<UserResponse>> {
    let user = AuthService::new(state.users()).get_user(current.id).await?;
    Ok(Json(UserResponse { user }))
}
