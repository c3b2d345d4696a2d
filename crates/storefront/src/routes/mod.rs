//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET   /                      - Redirect to the negotiated locale
//! GET   /{locale}              - Localized landing page
//! GET   /robots.txt            - Crawler rules
//! GET   /sitemap.xml           - Sitemap with hreflang alternates
//! GET   /site.webmanifest      - Web app manifest
//! GET   /health                - Liveness
//! GET   /health/ready          - Readiness (database ping)
//!
//! # Auth (register/login are rate limited)
//! POST  /api/auth/register     - Create account and cart
//! POST  /api/auth/login        - Issue access token (+ cookie)
//! POST  /api/auth/logout       - Revoke token (requires auth)
//! GET   /api/auth/me           - Current user (requires auth)
//!
//! # Account (requires auth)
//! PATCH /api/users/me          - Change display name
//! GET   /api/cart              - The user's cart
//!
//! # Payments (requires auth)
//! POST  /api/payments/stripe   - Create payment intent
//! PUT   /api/payments/stripe   - Update or refresh payment intent
//!
//! # Newsletter
//! POST  /api/newsletter        - Subscribe
//! ```

pub mod auth;
pub mod cart;
pub mod health;
pub mod home;
pub mod newsletter;
pub mod payments;
pub mod seo;
pub mod users;

use axum::{
    Json, Router,
    extract::{FromRequest, Request, rejection::JsonRejection},
    middleware,
    routing::{get, patch, post},
};
use tower_http::trace::TraceLayer;

use crate::config::StorefrontConfig;
use crate::error::AppError;
use crate::middleware::{auth_rate_limiter, request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// JSON request body whose rejections use the API's error format.
///
/// Malformed JSON, a wrong content type or a type mismatch all become a
/// 400 with `{"error": ...}`.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| Self(value))
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
    }
}

/// Create the auth routes router.
///
/// Registration and login get their own rate limit when enabled.
pub fn auth_routes(config: &StorefrontConfig) -> Router<AppState> {
    let credentials = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let credentials = if config.rate_limit_enabled {
        credentials.layer(auth_rate_limiter(config.trust_proxy_headers))
    } else {
        credentials
    };

    Router::new()
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .merge(credentials)
}

/// Create the JSON API router (mounted at `/api`).
pub fn api_routes(config: &StorefrontConfig) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes(config))
        .route("/users/me", patch(users::update_me))
        .route("/cart", get(cart::show))
        .route(
            "/payments/stripe",
            post(payments::create_intent).put(payments::update_intent),
        )
        .route("/newsletter", post(newsletter::subscribe))
}

/// Build the complete application router with its middleware stack.
///
/// Static files and the Sentry layers are added by the binary.
pub fn app(state: AppState) -> Router {
    let api = api_routes(state.config());

    Router::new()
        .route("/", get(home::redirect_to_locale))
        .route("/robots.txt", get(seo::robots))
        .route("/sitemap.xml", get(seo::sitemap))
        .route("/site.webmanifest", get(seo::webmanifest))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/{locale}", get(home::landing))
        .nest("/api", api)
        .fallback(not_found)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
                user_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_owned())
}
