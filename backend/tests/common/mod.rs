//! Common test utilities for integration tests
//!
//! Builds the full router over the in-memory credential store and the
//! log-only notifier, so these tests need neither PostgreSQL nor SMTP.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use shopfront_backend::{
    config::AppConfig,
    notify::{LogNotifier, ResetNotice},
    repositories::InMemoryUserRepository,
    routes,
    state::AppState,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// Response captured for assertions
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }

    /// Value of the `Set-Cookie` header, if any
    pub fn set_cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .map(|value| value.to_str().unwrap().to_string())
    }
}

/// Test application wrapper
pub struct TestApp {
    pub app: Router,
    pub users: InMemoryUserRepository,
    pub notifier: LogNotifier,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_notifier(LogNotifier::new())
    }

    pub fn with_notifier(notifier: LogNotifier) -> Self {
        Self::build(notifier, &[])
    }

    /// Build with extra configuration variables
    pub fn with_env(extra: &[(&str, &str)]) -> Self {
        Self::build(LogNotifier::new(), extra)
    }

    fn build(notifier: LogNotifier, extra: &[(&str, &str)]) -> Self {
        let users = InMemoryUserRepository::new();
        let state = AppState::new(
            Arc::new(users.clone()),
            Arc::new(notifier.clone()),
            test_config(extra),
        )
        .unwrap();

        Self {
            app: routes::create_router(state),
            users,
            notifier,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            headers,
            body: String::from_utf8(body.to_vec()).unwrap(),
        }
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Make a GET request with a Bearer token
    pub async fn get_authorized(&self, path: &str, token: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Make a POST request with JSON body
    pub async fn post(&self, path: &str, body: &serde_json::Value) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Make a POST request with JSON body and a Bearer token
    pub async fn post_authorized(
        &self,
        path: &str,
        token: &str,
        body: &serde_json::Value,
    ) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Make a POST request carrying a `Cookie` header and no body
    pub async fn post_with_cookie(&self, path: &str, cookie: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Register a user through the API
    pub async fn register(&self, name: &str, email: &str, password: &str) -> TestResponse {
        self.post(
            "/register",
            &serde_json::json!({ "name": name, "email": email, "password": password }),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.post(
            "/login",
            &serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    /// Log in and return the access token and the refresh cookie pair
    pub async fn login_session(&self, email: &str, password: &str) -> (String, String) {
        let response = self.login(email, password).await;
        assert_eq!(response.status, StatusCode::OK);
        let access = response.json()["token"].as_str().unwrap().to_string();
        let cookie = cookie_pair(&response.set_cookie().unwrap());
        (access, cookie)
    }

    /// Wait for the background reset dispatch to reach the notifier
    pub async fn wait_for_notice(&self) -> ResetNotice {
        for _ in 0..200 {
            if let Some(notice) = self.notifier.last_notice() {
                return notice;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no reset notice was sent");
    }
}

/// Random account details
pub fn fake_account() -> (String, String) {
    let name: String = Name().fake();
    let email: String = SafeEmail().fake();
    (name, email)
}

/// Reset token carried by a mailed link
pub fn token_from_link(link: &str) -> String {
    link.split("token=").nth(1).unwrap().to_string()
}

/// `name=value` part of a `Set-Cookie` header
pub fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap().trim().to_string()
}

fn test_config(extra: &[(&str, &str)]) -> AppConfig {
    let mut vars: HashMap<String, String> = [
        ("SHOP__AUTH__ACCESS_SECRET", "test-access-secret"),
        ("SHOP__AUTH__REFRESH_SECRET", "test-refresh-secret"),
        ("SHOP__PASSWORD__MEMORY_KIB", "8"),
        ("SHOP__PASSWORD__ITERATIONS", "1"),
        ("SHOP__DATABASE__IN_MEMORY", "true"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    vars.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));

    AppConfig::from_env_map(&vars).unwrap()
}
