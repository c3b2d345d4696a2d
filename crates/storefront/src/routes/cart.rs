//! Cart handlers.
//!
//! Every user gets a cart at registration; line items are not modelled yet.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::Cart;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub cart: Cart,
}

/// The caller's cart.
#[instrument(skip(state, current), fields(user_id = %current.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<CartResponse>> {
    let cart = state
        .users()
        .get_cart(current.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Cart not found".to_owned()))?;

    Ok(Json(CartResponse { cart }))
}
