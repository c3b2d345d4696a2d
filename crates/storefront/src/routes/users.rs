//! Profile handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use super::JsonBody;
use super::auth::UserResponse;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Profile update body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateProfileRequest {
    pub name: String,
}

/// Change the caller's display name.
#[instrument(skip(state, current, body), fields(user_id = %current.id))]
pub async fn update_me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    JsonBody(body): JsonBody<UpdateProfileRequest>,
) -> Result<Json<UserResponse>> {
    let user = AuthService::new(state.users())
        .rename(current.id, &body.name)
        .await?;

    Ok(Json(UserResponse { user }))
}
