//! Newsletter subscription handler.
//!
//! Subscribing twice is not an error: the second request gets 200 instead
//! of 201 so the endpoint does not reveal more than the caller already knows.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bookstore_core::Email;

use super::JsonBody;
use crate::error::{AppError, Result};
use crate::i18n::Locale;
use crate::state::AppState;

/// Newsletter subscription body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubscribeRequest {
    pub email: String,
    /// Preferred language for mailings; unknown codes fall back to English.
    pub locale: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub subscribed: bool,
    pub email: Email,
}

/// Subscribe an address to the newsletter.
#[instrument(skip(state, body))]
pub async fn subscribe(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<SubscribeRequest>,
) -> Result<(StatusCode, Json<SubscribeResponse>)> {
    let email = Email::parse_normalized(&body.email)
        .map_err(|_| AppError::BadRequest("Invalid email address".to_owned()))?;

    let locale = body
        .locale
        .as_deref()
        .and_then(|code| code.parse::<Locale>().ok())
        .unwrap_or_default();

    let created = state.newsletter().subscribe(&email, locale.code()).await?;

    let status = if created {
        tracing::info!(email = %email, locale = %locale, "Newsletter subscription created");
        StatusCode::CREATED
    } else {
        tracing::debug!(email = %email, "Already subscribed");
        StatusCode::OK
    };

    Ok((
        status,
        Json(SubscribeResponse {
            subscribed: true,
            email,
        }),
    ))
}
