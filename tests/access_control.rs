mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::TestApp;
use pricebook::models::user::UserStatus;

#[tokio::test]
async fn unauthenticated_requests_get_401() {
    let t = TestApp::new();

    let cases = [
        (Method::GET, "/api/products"),
        (Method::POST, "/api/products"),
        (Method::GET, "/api/categories"),
        (Method::GET, "/api/client-prices"),
        (Method::PUT, "/api/client-prices/1"),
        (Method::DELETE, "/api/client-prices/1"),
        (Method::POST, "/api/client-prices/bulk-adjust"),
        (Method::GET, "/api/price-history"),
        (Method::POST, "/api/auth/invite"),
        (Method::GET, "/api/auth/me"),
        (Method::GET, "/api/users"),
    ];

    for (method, uri) in cases {
        let (status, body) = t
            .raw_request(method.clone(), uri, None, Some("{not json".to_string()))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}: {body}");
        assert!(body["error"].is_string(), "{method} {uri}: {body}");
    }
}

#[tokio::test]
async fn malformed_path_and_query_values_get_json_400() {
    let t = TestApp::new();
    let (_, admin) = t.admin().await;

    for uri in [
        "/api/products/abc",
        "/api/users/not-a-number",
        "/api/price-history?limit=abc",
        "/api/products?active=maybe",
    ] {
        let (status, body) = t.get(uri, &admin).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}: {body}");
        assert!(body["error"].is_string(), "{uri}: {body}");
    }
}

#[tokio::test]
async fn garbage_or_foreign_tokens_get_401() {
    let t = TestApp::new();

    let (status, _) = t.get("/api/products", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = pricebook::auth::jwt::sign_token(1, "x@y.test", true, "some-other-secret-value", 1).unwrap();
    let (status, _) = t.get("/api/products", &forged).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = t
        .raw_request(Method::GET, "/api/products", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_admins_get_403_on_admin_routes_regardless_of_payload() {
    let t = TestApp::new();
    let (_, client_token) = t.client("buyer@acme.test").await;

    let payloads = [
        Some(json!({ "code": "OK-1", "name": "Valid", "base_price_usd": 10.0 }).to_string()),
        Some(json!({ "code": "", "base_price_usd": -3 }).to_string()),
        Some("{definitely not json".to_string()),
        None,
    ];
    let routes = [
        (Method::POST, "/api/products"),
        (Method::PUT, "/api/products/1"),
        (Method::DELETE, "/api/products/1"),
        (Method::POST, "/api/categories"),
        (Method::PUT, "/api/categories/1"),
        (Method::POST, "/api/client-prices"),
        (Method::PUT, "/api/client-prices/1"),
        (Method::DELETE, "/api/client-prices/1"),
        (Method::POST, "/api/client-prices/bulk-adjust"),
        (Method::POST, "/api/auth/invite"),
        (Method::GET, "/api/users"),
        (Method::PUT, "/api/users/1/status"),
    ];

    for (method, uri) in routes {
        for payload in &payloads {
            let (status, body) = t
                .raw_request(method.clone(), uri, Some(&client_token), payload.clone())
                .await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{method} {uri} with {payload:?}: {body}");
        }
    }
}

#[tokio::test]
async fn suspended_accounts_are_locked_out_with_existing_tokens() {
    let t = TestApp::new();
    let (_, admin_token) = t.admin().await;
    let (client, client_token) = t.client("buyer@acme.test").await;

    let (status, _) = t.get("/api/auth/me", &client_token).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = t
        .put(&format!("/api/users/{}/status", client.id), &admin_token, json!({ "status": "suspended" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "suspended");

    let (status, _) = t.get("/api/auth/me", &client_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn pending_account_token_is_rejected() {
    let t = TestApp::new();
    let pending = t.seed_user("new@acme.test", false, UserStatus::Pending).await;
    let token = t.token_for(&pending);

    let (status, _) = t.get("/api/products", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn health_is_open() {
    let t = TestApp::new();
    let (status, body) = t.raw_request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("OK"));
}
