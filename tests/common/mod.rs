#![allow(dead_code)]

use std::net::IpAddr;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use pricebook::auth::jwt::sign_token;
use pricebook::auth::password::hash_password;
use pricebook::build_app;
use pricebook::config::Config;
use pricebook::mailer::mock::RecordingMailer;
use pricebook::models::user::{NewUser, UserProfile, UserStatus};
use pricebook::services::memory::MemoryStore;
use pricebook::state::AppState;

pub const PASSWORD: &str = "correct-horse-1";

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        database_max_connections: 1,
        host: IpAddr::from([127, 0, 0, 1]),
        port: 0,
        jwt_secret: "integration-test-secret".to_string(),
        token_ttl_hours: 1,
        bcrypt_cost: 4,
        app_base_url: "http://portal.test".to_string(),
        cors_allowed_origins: Vec::new(),
        bootstrap_admin: None,
    }
}

impl TestApp {
    pub fn new() -> Self {
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::from_store(test_config(), Arc::new(MemoryStore::new()), mailer.clone());
        Self { app: build_app(state.clone()), state, mailer }
    }

    pub async fn seed_user(&self, email: &str, is_admin: bool, status: UserStatus) -> UserProfile {
        self.state
            .users
            .create(NewUser {
                email: email.to_string(),
                company_name: format!("{email} Inc"),
                is_admin,
                status,
                password_hash: Some(hash_password(PASSWORD, 4).unwrap()),
                invite_token: None,
            })
            .await
            .unwrap()
    }

    pub fn token_for(&self, user: &UserProfile) -> String {
        sign_token(user.id, &user.email, user.is_admin, &self.state.config.jwt_secret, 1).unwrap()
    }

    pub async fn admin(&self) -> (UserProfile, String) {
        let user = self.seed_user("admin@pricebook.test", true, UserStatus::Active).await;
        let token = self.token_for(&user);
        (user, token)
    }

    pub async fn client(&self, email: &str) -> (UserProfile, String) {
        let user = self.seed_user(email, false, UserStatus::Active).await;
        let token = self.token_for(&user);
        (user, token)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let body = body.map(|b| b.to_string());
        self.raw_request(method, uri, token, body).await
    }

    pub async fn raw_request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<String>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    /// Creates a product through the API and returns its id.
    pub async fn create_product(&self, admin_token: &str, code: &str, base_price: f64) -> i64 {
        let (status, body) = self
            .post(
                "/api/products",
                admin_token,
                serde_json::json!({ "code": code, "name": format!("Product {code}"), "base_price_usd": base_price }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }
}
