//! Rate limiting of registration and login.

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::json;

use bookstore_integration_tests::{TestApp, TestResponse, test_config};

/// Requests allowed before the limiter kicks in.
const BURST: usize = 5;

fn limited_app(trust_proxy_headers: bool) -> TestApp {
    let mut config = test_config();
    config.rate_limit_enabled = true;
    config.trust_proxy_headers = trust_proxy_headers;
    TestApp::with_config(config)
}

async fn login_from(app: &TestApp, peer: &str, forwarded_for: Option<&str>) -> TestResponse {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(ip) = forwarded_for {
        builder = builder.header("x-forwarded-for", ip);
    }

    // A malformed body keeps password hashing out of the timing.
    let mut request = builder.body(Body::from("{")).unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));

    app.send(request).await
}

#[tokio::test]
async fn test_login_limit_returns_json_429() {
    let app = limited_app(false);

    for attempt in 0..BURST {
        let response = login_from(&app, "203.0.113.9:40000", None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "attempt {attempt}");
    }

    let limited = login_from(&app, "203.0.113.9:40000", None).await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    assert!(
        limited.headers[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("application/json")
    );
    assert_eq!(limited.json()["error"], "Too many requests");
}

#[tokio::test]
async fn test_limit_is_per_client() {
    let app = limited_app(false);

    for _ in 0..=BURST {
        login_from(&app, "203.0.113.9:40000", None).await;
    }

    let other = login_from(&app, "198.51.100.4:40000", None).await;
    assert_eq!(other.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_spoofed_forwarded_for_does_not_reset_limit() {
    let app = limited_app(false);

    for n in 0..BURST {
        let spoofed = format!("192.0.2.{n}");
        login_from(&app, "203.0.113.9:40000", Some(&spoofed)).await;
    }

    let response = login_from(&app, "203.0.113.9:40000", Some("192.0.2.200")).await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_trusted_proxy_keys_on_forwarded_for() {
    let app = limited_app(true);

    for _ in 0..=BURST {
        login_from(&app, "10.0.0.1:443", Some("203.0.113.9")).await;
    }

    let blocked = login_from(&app, "10.0.0.1:443", Some("203.0.113.9")).await;
    assert_eq!(blocked.status, StatusCode::TOO_MANY_REQUESTS);

    let other_client = login_from(&app, "10.0.0.1:443", Some("198.51.100.4")).await;
    assert_eq!(other_client.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unidentifiable_client_is_json_500() {
    let app = limited_app(false);

    let response = app
        .json(
            Method::POST,
            "/api/auth/login",
            &json!({ "email": "nobody@example.com", "password": "Wr0ngPassword" }),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["error"], "Internal server error");
}

#[tokio::test]
async fn test_other_endpoints_are_not_limited() {
    let app = limited_app(false);

    for _ in 0..=BURST {
        let response = app.get("/api/auth/me", None).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }
}
