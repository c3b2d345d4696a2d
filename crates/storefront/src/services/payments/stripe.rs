//! Stripe payment intents over the REST API.
//!
//! Only the three intent calls the storefront needs. Requests are
//! form-encoded as Stripe expects; nested fields use bracket notation
//! (`metadata[order]=A-1`).

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;

use super::{IntentParams, PaymentProvider, ProviderError};
use crate::config::StripeConfig;
use crate::models::PaymentIntent;

/// Stripe API version pinned for every request.
const API_VERSION: &str = "2024-06-20";

/// Stripe API client for payment intents.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    base_url: String,
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        let mut auth_value = HeaderValue::from_str(&auth_value)
            .map_err(|e| ProviderError::Parse(format!("Invalid API key format: {e}")))?;
        auth_value.set_sensitive(true);
        headers.insert("Authorization", auth_value);

        headers.insert("Stripe-Version", HeaderValue::from_static(API_VERSION));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base.trim_end_matches('/').to_owned(),
        })
    }

    fn intent_url(&self, id: Option<&str>) -> Result<String, ProviderError> {
        match id {
            None => Ok(format!("{}/v1/payment_intents", self.base_url)),
            Some(id) if is_valid_intent_id(id) => {
                Ok(format!("{}/v1/payment_intents/{id}", self.base_url))
            }
            Some(id) => Err(ProviderError::InvalidIntentId(id.to_owned())),
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<PaymentIntent, ProviderError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let intent: StripePaymentIntent = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(intent.into())
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_intent(&self, params: &IntentParams) -> Result<PaymentIntent, ProviderError> {
        let mut form = form_params(params);
        form.push((
            "automatic_payment_methods[enabled]".to_owned(),
            "true".to_owned(),
        ));

        let url = self.intent_url(None)?;
        self.send(self.client.post(url).form(&form)).await
    }

    async fn update_intent(
        &self,
        id: &str,
        params: &IntentParams,
    ) -> Result<PaymentIntent, ProviderError> {
        let url = self.intent_url(Some(id))?;
        self.send(self.client.post(url).form(&form_params(params)))
            .await
    }

    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntent, ProviderError> {
        let url = self.intent_url(Some(id))?;
        self.send(self.client.get(url)).await
    }
}

/// Flatten intent parameters into Stripe's form encoding.
fn form_params(params: &IntentParams) -> Vec<(String, String)> {
    let mut form = vec![
        ("amount".to_owned(), params.amount.to_string()),
        ("currency".to_owned(), params.currency.as_str().to_owned()),
    ];

    form.extend(
        params
            .metadata
            .iter()
            .map(|(key, value)| (format!("metadata[{key}]"), value.clone())),
    );

    form
}

/// Stripe ids are `pi_` followed by alphanumerics; anything else would
/// change the request path.
fn is_valid_intent_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Pull `error.message` out of a Stripe error body, or fall back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<StripeErrorBody>(body)
        .ok()
        .and_then(|b| b.error.message)
        .unwrap_or_else(|| body.to_owned())
}

#[derive(Debug, Deserialize)]
struct StripePaymentIntent {
    id: String,
    amount: i64,
    currency: String,
    status: String,
    client_secret: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

impl From<StripePaymentIntent> for PaymentIntent {
    fn from(intent: StripePaymentIntent) -> Self {
        Self {
            id: intent.id,
            amount: intent.amount,
            currency: intent.currency,
            status: intent.status,
            client_secret: intent.client_secret,
            metadata: intent.metadata,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bookstore_core::CurrencyCode;
    use secrecy::SecretString;

    use super::*;

    fn client() -> StripeClient {
        StripeClient::new(&StripeConfig {
            secret_key: SecretString::from("sk_test_4eC39HqLyjWDarjtT1zdp7dc"),
            api_base: "https://stripe.test/".to_owned(),
        })
        .unwrap()
    }

    #[test]
    fn test_form_params() {
        let params = IntentParams {
            amount: 1999,
            currency: CurrencyCode::Usd,
            metadata: BTreeMap::from([
                ("order".to_owned(), "A-1".to_owned()),
                ("user_id".to_owned(), "42".to_owned()),
            ]),
        };

        assert_eq!(
            form_params(&params),
            vec![
                ("amount".to_owned(), "1999".to_owned()),
                ("currency".to_owned(), "usd".to_owned()),
                ("metadata[order]".to_owned(), "A-1".to_owned()),
                ("metadata[user_id]".to_owned(), "42".to_owned()),
            ]
        );
    }

    #[test]
    fn test_intent_url() {
        let client = client();
        assert_eq!(
            client.intent_url(None).unwrap(),
            "https://stripe.test/v1/payment_intents"
        );
        assert_eq!(
            client.intent_url(Some("pi_3Abc123")).unwrap(),
            "https://stripe.test/v1/payment_intents/pi_3Abc123"
        );
        assert!(matches!(
            client.intent_url(Some("pi_1/../../customers")),
            Err(ProviderError::InvalidIntentId(_))
        ));
        assert!(matches!(
            client.intent_url(Some("")),
            Err(ProviderError::InvalidIntentId(_))
        ));
    }

    #[test]
    fn test_parse_intent_response() {
        let body = r#"{
            "id": "pi_123",
            "object": "payment_intent",
            "amount": 1999,
            "currency": "usd",
            "status": "requires_payment_method",
            "client_secret": "pi_123_secret_456",
            "metadata": {"user_id": "42"}
        }"#;

        let intent: PaymentIntent = serde_json::from_str::<StripePaymentIntent>(body)
            .unwrap()
            .into();

        assert_eq!(intent.id, "pi_123");
        assert_eq!(intent.amount, 1999);
        assert_eq!(intent.status, "requires_payment_method");
        assert_eq!(intent.client_secret.as_deref(), Some("pi_123_secret_456"));
        assert_eq!(intent.metadata.get("user_id").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_error_message() {
        let body = r#"{"error": {"type": "invalid_request_error", "message": "Amount must be at least $0.50 usd"}}"#;
        assert_eq!(error_message(body), "Amount must be at least $0.50 usd");
        assert_eq!(error_message("upstream timeout"), "upstream timeout");
    }
}
