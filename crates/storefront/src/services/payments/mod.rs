//! Payment intents.
//!
//! The payment provider owns every intent; this module validates amounts,
//! talks to the provider through [`PaymentProvider`] and keeps the local
//! mirror in [`PaymentStore`] in step with what the provider reports.

pub mod stripe;

pub use stripe::StripeClient;

use std::collections::BTreeMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

use bookstore_core::{CurrencyCode, Money, MoneyError, UserId};

use crate::db::{PaymentStore, RepositoryError};
use crate::models::PaymentIntent;

/// Metadata key carrying the id of the user who owns an intent.
pub const USER_ID_METADATA_KEY: &str = "user_id";

/// Errors returned by a [`PaymentProvider`].
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Intent id contains characters that cannot appear in a provider id.
    #[error("Invalid payment intent id: {0}")]
    InvalidIntentId(String),
}

/// Errors from payment operations.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Amount or currency failed validation.
    #[error("invalid amount: {0}")]
    InvalidAmount(#[from] MoneyError),

    /// Currency or metadata sent without an amount.
    #[error("currency and metadata changes require an amount")]
    AmountRequired,

    /// No intent with this id belongs to the caller.
    #[error("payment intent not found")]
    IntentNotFound,

    /// The provider rejected the request or could not be reached.
    #[error("payment provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Mirror could not be read or written.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Parameters for creating or updating an intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentParams {
    /// Amount in minor units.
    pub amount: i64,
    pub currency: CurrencyCode,
    pub metadata: BTreeMap<String, String>,
}

/// A payment provider's intent API.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a new intent.
    async fn create_intent(&self, params: &IntentParams) -> Result<PaymentIntent, ProviderError>;

    /// Change amount, currency and metadata of an existing intent.
    async fn update_intent(
        &self,
        id: &str,
        params: &IntentParams,
    ) -> Result<PaymentIntent, ProviderError>;

    /// Fetch the provider's current view of an intent.
    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntent, ProviderError>;
}

/// Requested change to an existing intent.
#[derive(Debug, Clone, Default)]
pub struct IntentUpdate {
    pub amount: Option<Decimal>,
    pub currency: Option<CurrencyCode>,
    pub metadata: BTreeMap<String, String>,
}

/// Payment operations for one request.
pub struct PaymentService<'a> {
    provider: &'a dyn PaymentProvider,
    store: &'a dyn PaymentStore,
}

impl<'a> PaymentService<'a> {
    /// Create a payment service.
    #[must_use]
    pub const fn new(provider: &'a dyn PaymentProvider, store: &'a dyn PaymentStore) -> Self {
        Self { provider, store }
    }

    /// Create an intent for `user_id` and mirror it.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidAmount` if the amount is not positive or
    /// has more decimal places than the currency allows.
    #[instrument(skip(self, metadata), fields(amount = %amount, currency = %currency))]
    pub async fn create(
        &self,
        user_id: UserId,
        amount: Decimal,
        currency: CurrencyCode,
        metadata: BTreeMap<String, String>,
    ) -> Result<PaymentIntent, PaymentError> {
        let params = intent_params(user_id, amount, currency, metadata)?;

        let intent = self.provider.create_intent(&params).await?;
        self.store.record(user_id, &intent).await?;

        tracing::info!(intent_id = %intent.id, amount = intent.amount, "Payment intent created");
        Ok(intent)
    }

    /// Update or refresh an intent owned by `user_id`.
    ///
    /// With an amount the provider intent is updated; without one its
    /// current state is fetched. Either way the mirror is synced.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::AmountRequired` if a currency or metadata is
    /// given without an amount.
    /// Returns `PaymentError::IntentNotFound` if the caller has no intent
    /// with this id.
    #[instrument(skip(self, update))]
    pub async fn update(
        &self,
        user_id: UserId,
        intent_id: &str,
        update: IntentUpdate,
    ) -> Result<PaymentIntent, PaymentError> {
        if update.amount.is_none() && (update.currency.is_some() || !update.metadata.is_empty()) {
            return Err(PaymentError::AmountRequired);
        }

        let record = self
            .store
            .find_for_user(user_id, intent_id)
            .await?
            .ok_or(PaymentError::IntentNotFound)?;

        let intent = if let Some(amount) = update.amount {
            let currency = match update.currency {
                Some(currency) => currency,
                None => record.currency.parse()?,
            };
            let params = intent_params(user_id, amount, currency, update.metadata)?;
            self.provider.update_intent(&record.provider_id, &params).await?
        } else {
            self.provider.retrieve_intent(&record.provider_id).await?
        };

        self.store.sync(user_id, &intent).await.map_err(|e| match e {
            RepositoryError::NotFound => PaymentError::IntentNotFound,
            other => PaymentError::Repository(other),
        })?;

        tracing::info!(intent_id = %intent.id, status = %intent.status, "Payment intent synced");
        Ok(intent)
    }
}

/// Validate the amount and stamp the owner into the metadata.
fn intent_params(
    user_id: UserId,
    amount: Decimal,
    currency: CurrencyCode,
    mut metadata: BTreeMap<String, String>,
) -> Result<IntentParams, MoneyError> {
    let amount = Money::new(amount, currency)?.to_minor_units()?;
    metadata.insert(USER_ID_METADATA_KEY.to_owned(), user_id.to_string());

    Ok(IntentParams {
        amount,
        currency,
        metadata,
    })
}
