//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::{
    NewsletterStore, PaymentStore, PgNewsletterRepository, PgPaymentRepository, PgUserRepository,
    UserStore,
};
use crate::services::auth::TokenService;
use crate::services::email::{LogMailer, MailError, Mailer, SmtpMailer};
use crate::services::payments::{PaymentProvider, ProviderError, StripeClient};

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("payment provider: {0}")]
    Payments(#[from] ProviderError),
    #[error("mailer: {0}")]
    Mail(#[from] MailError),
}

/// The I/O backends handlers talk to.
///
/// Production wires Postgres, Stripe and SMTP; tests substitute doubles.
#[derive(Clone)]
pub struct Backends {
    pub users: Arc<dyn UserStore>,
    pub payments: Arc<dyn PaymentStore>,
    pub newsletter: Arc<dyn NewsletterStore>,
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub mailer: Arc<dyn Mailer>,
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the stores and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backends: Backends,
    tokens: TokenService,
}

impl AppState {
    /// Create application state from explicit backends.
    #[must_use]
    pub fn new(config: StorefrontConfig, backends: Backends) -> Self {
        let tokens = TokenService::new(&config.auth);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                backends,
                tokens,
            }),
        }
    }

    /// Create production state: Postgres repositories, the Stripe client
    /// and SMTP delivery when configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the Stripe client or the SMTP transport cannot
    /// be built.
    pub fn from_pool(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let payment_provider = Arc::new(StripeClient::new(&config.stripe)?);

        let mailer: Arc<dyn Mailer> = match &config.email {
            Some(email) => Arc::new(SmtpMailer::new(email)?),
            None => {
                tracing::warn!("SMTP_HOST not set, outgoing email will only be logged");
                Arc::new(LogMailer)
            }
        };

        let backends = Backends {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            payments: Arc::new(PgPaymentRepository::new(pool.clone())),
            newsletter: Arc::new(PgNewsletterRepository::new(pool)),
            payment_provider,
            mailer,
        };

        Ok(Self::new(config, backends))
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// User and cart store.
    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.inner.backends.users.as_ref()
    }

    /// Payment intent mirror.
    #[must_use]
    pub fn payments(&self) -> &dyn PaymentStore {
        self.inner.backends.payments.as_ref()
    }

    /// Newsletter subscribers.
    #[must_use]
    pub fn newsletter(&self) -> &dyn NewsletterStore {
        self.inner.backends.newsletter.as_ref()
    }

    /// Payment provider client.
    #[must_use]
    pub fn payment_provider(&self) -> &dyn PaymentProvider {
        self.inner.backends.payment_provider.as_ref()
    }

    /// Outgoing mail.
    #[must_use]
    pub fn mailer(&self) -> &dyn Mailer {
        self.inner.backends.mailer.as_ref()
    }

    /// Access token service.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }
}
