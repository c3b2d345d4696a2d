//! Rate limiting for authentication endpoints using governor and `tower_governor`.
//!
//! Clients are keyed by the socket peer address (requires serving with
//! `into_make_service_with_connect_info`). Forwarded headers are only
//! consulted when the deployment says a trusted proxy sets them; otherwise
//! any client could pick a fresh key per request.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use axum::response::{IntoResponse, Response};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

use crate::error::AppError;

/// Key extractor: the peer address, or the proxy-reported client address
/// when `trust_proxy_headers` is set.
#[derive(Debug, Clone, Copy)]
pub struct ClientIpKeyExtractor {
    trust_proxy_headers: bool,
}

impl ClientIpKeyExtractor {
    /// Create an extractor.
    #[must_use]
    pub const fn new(trust_proxy_headers: bool) -> Self {
        Self {
            trust_proxy_headers,
        }
    }
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let peer = || {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        };

        let ip = if self.trust_proxy_headers {
            forwarded_ip(req.headers()).or_else(peer)
        } else {
            peer()
        };

        ip.ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Client IP reported by a proxy, if any.
fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    // First IP in the X-Forwarded-For chain is the original client
    let from_forwarded_for = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok());

    from_forwarded_for.or_else(|| {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    })
}

/// Render limiter rejections in the API's JSON error format.
fn governor_error_response(err: GovernorError) -> Response {
    match err {
        GovernorError::TooManyRequests { wait_time, .. } => {
            tracing::warn!(wait_seconds = wait_time, "Auth rate limit exceeded");
            AppError::RateLimited.into_response()
        }
        GovernorError::UnableToExtractKey => {
            AppError::Internal("unable to determine client address for rate limiting".to_owned())
                .into_response()
        }
        GovernorError::Other { code, msg, .. } => AppError::Internal(format!(
            "rate limiter error {code}: {}",
            msg.unwrap_or_default()
        ))
        .into_response(),
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for auth endpoints: ~10 requests per minute per IP.
///
/// Configuration: 1 request every 6 seconds (replenish), burst of 5.
/// Applied to registration and login to slow down credential stuffing.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers (`per_second(6)` and `burst_size(5)`), which are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn auth_rate_limiter(trust_proxy_headers: bool) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor::new(trust_proxy_headers))
        .per_second(6)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");

    GovernorLayer::new(Arc::new(config)).error_handler(governor_error_response)
}
