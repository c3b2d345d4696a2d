//! Stripe payment intent handlers.
//!
//! Amounts arrive in major units (`19.99`) and are converted exactly to
//! minor units before reaching Stripe. The authenticated user's id is
//! always written into the intent metadata.

use std::collections::BTreeMap;

use axum::{Json, extract::State, http::StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bookstore_core::CurrencyCode;

use super::JsonBody;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::PaymentIntent;
use crate::services::payments::{IntentUpdate, PaymentError, PaymentService};
use crate::state::AppState;

/// Body of `POST /api/payments/stripe`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreatePaymentRequest {
    /// Amount in major units.
    pub amount: Option<Decimal>,
    /// ISO currency code, `usd` when omitted.
    pub currency: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

/// Body of `PUT /api/payments/stripe`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdatePaymentRequest {
    pub payment_intent_id: String,
    /// New amount in major units. Without it the intent is only refreshed.
    pub amount: Option<Decimal>,
    /// Defaults to the intent's current currency. Requires `amount`.
    pub currency: Option<String>,
    /// Requires `amount`.
    pub metadata: BTreeMap<String, String>,
}

/// What the browser needs to confirm a payment.
#[derive(Debug, Serialize)]
pub struct PaymentIntentResponse {
    pub id: String,
    pub client_secret: Option<String>,
    /// Amount in minor units.
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

impl From<PaymentIntent> for PaymentIntentResponse {
    fn from(intent: PaymentIntent) -> Self {
        Self {
            id: intent.id,
            client_secret: intent.client_secret,
            amount: intent.amount,
            currency: intent.currency,
            status: intent.status,
        }
    }
}

/// Create a payment intent for the caller.
#[instrument(skip(state, current, body), fields(user_id = %current.id))]
pub async fn create_intent(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    JsonBody(body): JsonBody<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<PaymentIntentResponse>)> {
    let amount = body
        .amount
        .ok_or_else(|| AppError::BadRequest("Amount is required".to_owned()))?;
    let currency = parse_currency(body.currency.as_deref())?.unwrap_or_default();

    let intent = PaymentService::new(state.payment_provider(), state.payments())
        .create(current.id, amount, currency, body.metadata)
        .await?;

    add_breadcrumb(
        "payments",
        "Created payment intent",
        Some(&[("intent_id", intent.id.as_str())]),
    );

    Ok((StatusCode::CREATED, Json(intent.into())))
}

/// Update the amount of, or refresh, one of the caller's payment intents.
#[instrument(skip(state, current, body), fields(user_id = %current.id, intent_id = %body.payment_intent_id))]
pub async fn update_intent(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    JsonBody(body): JsonBody<UpdatePaymentRequest>,
) -> Result<Json<PaymentIntentResponse>> {
    let intent_id = body.payment_intent_id.trim();
    if intent_id.is_empty() {
        return Err(AppError::BadRequest(
            "payment_intent_id is required".to_owned(),
        ));
    }

    let update = IntentUpdate {
        amount: body.amount,
        currency: parse_currency(body.currency.as_deref())?,
        metadata: body.metadata,
    };

    let intent = PaymentService::new(state.payment_provider(), state.payments())
        .update(current.id, intent_id, update)
        .await?;

    Ok(Json(intent.into()))
}

fn parse_currency(raw: Option<&str>) -> Result<Option<CurrencyCode>> {
    raw.map(|code| code.parse::<CurrencyCode>().map_err(PaymentError::from))
        .transpose()
        .map_err(AppError::from)
}
