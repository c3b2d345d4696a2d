//! Registration, login, logout and profile endpoints.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::json;

use bookstore_integration_tests::{STRONG_PASSWORD, TestApp};

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_register_returns_user_without_password() {
    let app = TestApp::new();

    let response = app
        .register("Ada Lovelace", "Ada@Example.com", STRONG_PASSWORD)
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    let body = response.json();
    let user = &body["user"];
    assert_eq!(user["name"], "Ada Lovelace");
    assert_eq!(user["email"], "ada@example.com");
    assert_eq!(user["role"], "customer");
    assert!(user["cart_id"].is_number());
    assert!(user.get("password").is_none());
    assert!(user.get("password_hash").is_none());
    assert!(!response.text.contains(STRONG_PASSWORD));
}

#[tokio::test]
async fn test_register_stores_hash_not_plaintext() {
    let app = TestApp::new();
    app.register("Ada", "ada@example.com", STRONG_PASSWORD).await;

    let hash = app.users.password_hash("ada@example.com").unwrap();
    assert!(hash.starts_with("$argon2id$"));
    assert!(!hash.contains(STRONG_PASSWORD));
}

#[tokio::test]
async fn test_register_rejects_malformed_email() {
    let app = TestApp::new();

    let response = app.register("Ada", "not-an-email", STRONG_PASSWORD).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "Invalid email address");
    assert!(app.users.is_empty());
}

#[tokio::test]
async fn test_register_rejects_weak_passwords() {
    let app = TestApp::new();

    for weak in ["short1A", "alllowercase1", "ALLUPPERCASE1", "NoDigitsHere"] {
        let response = app.register("Ada", "ada@example.com", weak).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "password {weak}");
        assert!(response.json()["error"].as_str().unwrap().starts_with("Password"));
    }

    assert!(app.users.is_empty());
}

#[tokio::test]
async fn test_register_rejects_blank_name() {
    let app = TestApp::new();

    let response = app.register("   ", "ada@example.com", STRONG_PASSWORD).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "Name is required");
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let app = TestApp::new();
    app.register("Ada", "ada@example.com", STRONG_PASSWORD).await;

    let response = app
        .register("Other Ada", "ADA@example.com", STRONG_PASSWORD)
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(
        response.json()["error"],
        "An account with this email already exists"
    );
    assert_eq!(app.users.len(), 1);
}

#[tokio::test]
async fn test_register_rejects_malformed_json() {
    let app = TestApp::new();

    let response = app
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"name\": "))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["error"].is_string());
}

#[tokio::test]
async fn test_register_sends_welcome_email() {
    let app = TestApp::new();

    app.register("Ada", "ada@example.com", STRONG_PASSWORD).await;

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to.as_str(), "ada@example.com");
    assert!(sent[0].text_body.contains("Ada"));
    assert!(sent[0].text_body.contains("https://books.test"));
}

#[tokio::test]
async fn test_register_succeeds_when_mail_fails() {
    let app = TestApp::new();
    app.mailer.fail_deliveries();

    let response = app.register("Ada", "ada@example.com", STRONG_PASSWORD).await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(app.mailer.attempts(), 1);
    assert!(app.mailer.sent().is_empty());
    assert_eq!(app.users.len(), 1);
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_login_issues_token_and_cookie() {
    let app = TestApp::new();
    app.register("Ada", "ada@example.com", STRONG_PASSWORD).await;

    let response = app.login("ADA@example.com", STRONG_PASSWORD).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    let token = body["token"].as_str().unwrap();
    assert_eq!(token.split('.').count(), 3);
    assert!(body["expires_at"].is_string());
    assert_eq!(body["user"]["email"], "ada@example.com");

    let cookie = response.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with(&format!("bookstore_token={token}")));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Secure"));
}

#[tokio::test]
async fn test_login_wrong_password_is_unauthorized() {
    let app = TestApp::new();
    app.register("Ada", "ada@example.com", STRONG_PASSWORD).await;

    let response = app.login("ada@example.com", "Wr0ngPassword").await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json()["error"], "Invalid credentials");
    assert!(response.headers.get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_login_unknown_email_matches_wrong_password() {
    let app = TestApp::new();

    let unknown = app.login("nobody@example.com", STRONG_PASSWORD).await;
    let malformed = app.login("nobody", STRONG_PASSWORD).await;

    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.json()["error"], "Invalid credentials");
    assert_eq!(malformed.status, StatusCode::UNAUTHORIZED);
    assert_eq!(malformed.json()["error"], "Invalid credentials");
}

// =============================================================================
// Session
// =============================================================================

#[tokio::test]
async fn test_me_requires_token() {
    let app = TestApp::new();

    let response = app.get("/api/auth/me", None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json()["error"], "Authentication required");
}

#[tokio::test]
async fn test_me_returns_current_user() {
    let app = TestApp::new();
    let token = app.token_for("ada@example.com").await;

    let response = app.get("/api/auth/me", Some(&token)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["user"]["email"], "ada@example.com");
}

#[tokio::test]
async fn test_me_rejects_garbage_token() {
    let app = TestApp::new();

    let response = app.get("/api/auth/me", Some("not.a.jwt")).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json()["error"], "Invalid token");
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let app = TestApp::new();
    let token = app.token_for("ada@example.com").await;

    let response = app
        .json(Method::POST, "/api/auth/logout", &json!({}), Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::NO_CONTENT);
    let cookie = response.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.contains("Max-Age=0"));

    let after = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    assert_eq!(after.json()["error"], "Token revoked");
}

#[tokio::test]
async fn test_logout_leaves_other_tokens_valid() {
    let app = TestApp::new();
    let first = app.token_for("ada@example.com").await;
    let second = app.login("ada@example.com", STRONG_PASSWORD).await.json()["token"]
        .as_str()
        .unwrap()
        .to_owned();

    app.json(Method::POST, "/api/auth/logout", &json!({}), Some(&first))
        .await;

    let response = app.get("/api/auth/me", Some(&second)).await;
    assert_eq!(response.status, StatusCode::OK);
}

// =============================================================================
// Profile and cart
// =============================================================================

#[tokio::test]
async fn test_update_name() {
    let app = TestApp::new();
    let token = app.token_for("ada@example.com").await;

    let response = app
        .json(
            Method::PATCH,
            "/api/users/me",
            &json!({ "name": "  Countess Ada  " }),
            Some(&token),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["user"]["name"], "Countess Ada");

    let me = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(me.json()["user"]["name"], "Countess Ada");
}

#[tokio::test]
async fn test_update_name_rejects_blank() {
    let app = TestApp::new();
    let token = app.token_for("ada@example.com").await;

    let response = app
        .json(Method::PATCH, "/api/users/me", &json!({ "name": "" }), Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "Name is required");
}

#[tokio::test]
async fn test_cart_belongs_to_user() {
    let app = TestApp::new();
    let token = app.token_for("ada@example.com").await;
    let me = app.get("/api/auth/me", Some(&token)).await.json();

    let response = app.get("/api/cart", Some(&token)).await;

    assert_eq!(response.status, StatusCode::OK);
    let cart = &response.json()["cart"];
    assert_eq!(cart["id"], me["user"]["cart_id"]);
    assert_eq!(cart["user_id"], me["user"]["id"]);
}

#[tokio::test]
async fn test_cart_requires_token() {
    let app = TestApp::new();

    let response = app.get("/api/cart", None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}
