//! Contract tests for the bookstore storefront HTTP API.
//!
//! The real router runs in-process via `tower::ServiceExt::oneshot`; the
//! database, Stripe and SMTP are replaced by the in-memory doubles in this
//! crate, so no external services are needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bookstore-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use chrono::Utc;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use bookstore_core::{CartId, Email, PaymentId, UserId};
use bookstore_storefront::config::{AuthConfig, StorefrontConfig, StripeConfig};
use bookstore_storefront::db::{NewsletterStore, PaymentStore, RepositoryError, UserStore};
use bookstore_storefront::models::{Cart, NewUser, PaymentIntent, PaymentRecord, User};
use bookstore_storefront::routes;
use bookstore_storefront::services::email::{MailError, Mailer, OutgoingEmail};
use bookstore_storefront::services::payments::{IntentParams, PaymentProvider, ProviderError};
use bookstore_storefront::state::{AppState, Backends};

/// Password that satisfies the policy, for tests that don't care.
pub const STRONG_PASSWORD: &str = "Sup3rSecret";

// =============================================================================
// Users
// =============================================================================

struct StoredUser {
    user: User,
    password_hash: String,
    cart: Cart,
}

/// In-memory [`UserStore`] with the same uniqueness rule as the schema.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<Vec<StoredUser>>,
}

impl InMemoryUserStore {
    /// Number of stored users.
    pub fn len(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    /// Whether no users are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored password hash for an email, if the user exists.
    pub fn password_hash(&self, email: &str) -> Option<String> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.user.email.as_str() == email)
            .map(|u| u.password_hash.clone())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create_with_cart(&self, new_user: &NewUser) -> Result<User, RepositoryError> {
        let mut users = self.users.lock().unwrap();

        if users.iter().any(|u| u.user.email == new_user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let id = i32::try_from(users.len()).unwrap() + 1;
        let now = Utc::now();
        let cart = Cart {
            id: CartId::new(id + 100),
            user_id: UserId::new(id),
            created_at: now,
        };
        let user = User {
            id: UserId::new(id),
            name: new_user.name.clone(),
            email: new_user.email.clone(),
            role: new_user.role,
            cart_id: Some(cart.id),
            created_at: now,
            updated_at: now,
        };

        users.push(StoredUser {
            user: user.clone(),
            password_hash: new_user.password_hash.clone(),
            cart,
        });

        Ok(user)
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.user.id == id)
            .map(|u| u.user.clone()))
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| &u.user.email == email)
            .map(|u| (u.user.clone(), u.password_hash.clone())))
    }

    async fn update_name(&self, id: UserId, name: &str) -> Result<User, RepositoryError> {
        let mut users = self.users.lock().unwrap();
        let stored = users
            .iter_mut()
            .find(|u| u.user.id == id)
            .ok_or(RepositoryError::NotFound)?;

        name.clone_into(&mut stored.user.name);
        stored.user.updated_at = Utc::now();
        Ok(stored.user.clone())
    }

    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.user.id == user_id)
            .map(|u| u.cart.clone()))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

// =============================================================================
// Payment mirror
// =============================================================================

/// In-memory [`PaymentStore`].
#[derive(Default)]
pub struct InMemoryPaymentStore {
    records: Mutex<Vec<PaymentRecord>>,
}

impl InMemoryPaymentStore {
    /// Snapshot of every mirrored intent.
    pub fn records(&self) -> Vec<PaymentRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn record(
        &self,
        user_id: UserId,
        intent: &PaymentIntent,
    ) -> Result<PaymentRecord, RepositoryError> {
        let mut records = self.records.lock().unwrap();

        if records.iter().any(|r| r.provider_id == intent.id) {
            return Err(RepositoryError::Conflict(
                "payment intent already recorded".to_owned(),
            ));
        }

        let now = Utc::now();
        let record = PaymentRecord {
            id: PaymentId::new(i32::try_from(records.len()).unwrap() + 1),
            user_id,
            provider_id: intent.id.clone(),
            amount: intent.amount,
            currency: intent.currency.clone(),
            status: intent.status.clone(),
            created_at: now,
            updated_at: now,
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn find_for_user(
        &self,
        user_id: UserId,
        provider_id: &str,
    ) -> Result<Option<PaymentRecord>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.user_id == user_id && r.provider_id == provider_id)
            .cloned())
    }

    async fn sync(
        &self,
        user_id: UserId,
        intent: &PaymentIntent,
    ) -> Result<PaymentRecord, RepositoryError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.user_id == user_id && r.provider_id == intent.id)
            .ok_or(RepositoryError::NotFound)?;

        record.amount = intent.amount;
        intent.currency.clone_into(&mut record.currency);
        intent.status.clone_into(&mut record.status);
        record.updated_at = Utc::now();
        Ok(record.clone())
    }
}

// =============================================================================
// Newsletter
// =============================================================================

/// In-memory [`NewsletterStore`].
#[derive(Default)]
pub struct InMemoryNewsletterStore {
    subscribers: Mutex<BTreeMap<String, String>>,
}

impl InMemoryNewsletterStore {
    /// Locale stored for a subscriber.
    pub fn locale_of(&self, email: &str) -> Option<String> {
        self.subscribers.lock().unwrap().get(email).cloned()
    }
}

#[async_trait]
impl NewsletterStore for InMemoryNewsletterStore {
    async fn subscribe(&self, email: &Email, locale: &str) -> Result<bool, RepositoryError> {
        let mut subscribers = self.subscribers.lock().unwrap();
        if subscribers.contains_key(email.as_str()) {
            return Ok(false);
        }
        subscribers.insert(email.as_str().to_owned(), locale.to_owned());
        Ok(true)
    }
}

// =============================================================================
// Payment provider
// =============================================================================

/// A call received by [`FakePaymentProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Create(IntentParams),
    Update(String, IntentParams),
    Retrieve(String),
}

/// Payment provider double that keeps intents in memory and records calls.
#[derive(Default)]
pub struct FakePaymentProvider {
    intents: Mutex<BTreeMap<String, PaymentIntent>>,
    calls: Mutex<Vec<ProviderCall>>,
    fail: AtomicBool,
}

impl FakePaymentProvider {
    /// Every call received so far.
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Make every following call fail with an API error.
    pub fn fail_requests(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    fn check_failure(&self) -> Result<(), ProviderError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProviderError::Api {
                status: 500,
                message: "provider unavailable".to_owned(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentProvider for FakePaymentProvider {
    async fn create_intent(&self, params: &IntentParams) -> Result<PaymentIntent, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push(ProviderCall::Create(params.clone()));
        self.check_failure()?;

        let mut intents = self.intents.lock().unwrap();
        let id = format!("pi_test_{}", intents.len() + 1);
        let intent = PaymentIntent {
            id: id.clone(),
            amount: params.amount,
            currency: params.currency.as_str().to_owned(),
            status: "requires_payment_method".to_owned(),
            client_secret: Some(format!("{id}_secret_abc")),
            metadata: params.metadata.clone(),
        };
        intents.insert(id, intent.clone());
        Ok(intent)
    }

    async fn update_intent(
        &self,
        id: &str,
        params: &IntentParams,
    ) -> Result<PaymentIntent, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push(ProviderCall::Update(id.to_owned(), params.clone()));
        self.check_failure()?;

        let mut intents = self.intents.lock().unwrap();
        let intent = intents.get_mut(id).ok_or_else(|| ProviderError::Api {
            status: 404,
            message: format!("No such payment_intent: '{id}'"),
        })?;
        intent.amount = params.amount;
        params.currency.as_str().clone_into(&mut intent.currency);
        intent.metadata.extend(params.metadata.clone());
        Ok(intent.clone())
    }

    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntent, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push(ProviderCall::Retrieve(id.to_owned()));
        self.check_failure()?;

        self.intents
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ProviderError::Api {
                status: 404,
                message: format!("No such payment_intent: '{id}'"),
            })
    }
}

// =============================================================================
// Mail
// =============================================================================

/// Mailer double that records messages and can be told to fail.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    attempts: Mutex<usize>,
    fail: AtomicBool,
}

impl RecordingMailer {
    /// Messages delivered successfully.
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// Delivery attempts, successful or not.
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    /// Make every following delivery fail.
    pub fn fail_deliveries(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        *self.attempts.lock().unwrap() += 1;

        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::InvalidAddress("relay refused".to_owned()));
        }

        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

// =============================================================================
// Test application
// =============================================================================

/// Configuration suitable for in-process tests.
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://unused/bookstore_test"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "https://books.test".to_owned(),
        auth: AuthConfig {
            secret: SecretString::from("tEst-S1gning-k3y-Zq8Wm2Rv5Np7Xc4B"),
            token_ttl: Duration::from_secs(3600),
        },
        stripe: StripeConfig {
            secret_key: SecretString::from("sk_test_unused"),
            api_base: "https://stripe.invalid".to_owned(),
        },
        email: None,
        rate_limit_enabled: false,
        trust_proxy_headers: false,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// A response with its body read.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub text: String,
}

impl TestResponse {
    /// Body parsed as JSON.
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.text)
            .unwrap_or_else(|e| panic!("response is not JSON ({e}): {}", self.text))
    }
}

/// The storefront router wired to in-memory doubles.
pub struct TestApp {
    pub router: Router,
    pub users: Arc<InMemoryUserStore>,
    pub payments: Arc<InMemoryPaymentStore>,
    pub newsletter: Arc<InMemoryNewsletterStore>,
    pub provider: Arc<FakePaymentProvider>,
    pub mailer: Arc<RecordingMailer>,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// Build a fresh application with empty stores.
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Build a fresh application with empty stores and custom configuration.
    pub fn with_config(config: StorefrontConfig) -> Self {
        let users = Arc::new(InMemoryUserStore::default());
        let payments = Arc::new(InMemoryPaymentStore::default());
        let newsletter = Arc::new(InMemoryNewsletterStore::default());
        let provider = Arc::new(FakePaymentProvider::default());
        let mailer = Arc::new(RecordingMailer::default());

        let backends = Backends {
            users: users.clone(),
            payments: payments.clone(),
            newsletter: newsletter.clone(),
            payment_provider: provider.clone(),
            mailer: mailer.clone(),
        };
        let router = routes::app(AppState::new(config, backends));

        Self {
            router,
            users,
            payments,
            newsletter,
            provider,
            mailer,
        }
    }

    /// Send a request through the router.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            headers,
            text: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }

    /// Send a JSON request, optionally with a bearer token.
    pub async fn json(
        &self,
        method: Method,
        path: &str,
        body: &Value,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// `GET` a path, optionally with a bearer token.
    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Register a user through the API.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> TestResponse {
        self.json(
            Method::POST,
            "/api/auth/register",
            &serde_json::json!({ "name": name, "email": email, "password": password }),
            None,
        )
        .await
    }

    /// Log in through the API.
    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.json(
            Method::POST,
            "/api/auth/login",
            &serde_json::json!({ "email": email, "password": password }),
            None,
        )
        .await
    }

    /// Register and log in, returning the access token.
    pub async fn token_for(&self, email: &str) -> String {
        let registered = self.register("Test Reader", email, STRONG_PASSWORD).await;
        assert_eq!(registered.status, StatusCode::CREATED, "{}", registered.text);

        let login = self.login(email, STRONG_PASSWORD).await;
        assert_eq!(login.status, StatusCode::OK, "{}", login.text);

        login.json()["token"].as_str().unwrap().to_owned()
    }
}
