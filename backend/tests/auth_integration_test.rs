//! Integration tests for authentication endpoints

mod common;

use axum::http::StatusCode;
use serde_json::json;
use shopfront_backend::notify::LogNotifier;

#[tokio::test]
async fn test_register_login_flow() {
    let app = common::TestApp::new();

    let response = app.register("Ann", "ann@x.com", "Secret123").await;
    assert_eq!(response.status, StatusCode::OK);
    let user = response.json();
    assert!(user["id"].is_string());
    assert_eq!(user["name"], "Ann");
    assert_eq!(user["email"], "ann@x.com");
    assert_eq!(user["role"], "CUSTOMER");
    assert!(user["createdAt"].is_string());
    assert!(user.get("password").is_none());
    assert!(user.get("passwordHash").is_none());

    let response = app.login("ann@x.com", "Secret123").await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert_eq!(body.as_object().unwrap().len(), 1);

    let response = app.login("ann@x.com", "Wrong1234").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json(), json!({ "error": "Invalid credentials" }));
}

#[tokio::test]
async fn test_padded_email_is_normalized() {
    let app = common::TestApp::new();

    let response = app.register("Ann", "  Ann@X.com ", "Secret123").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["email"], "ann@x.com");

    let response = app
        .post("/forgot-password", &json!({ "email": " ANN@x.com " }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.wait_for_notice().await.to_email, "ann@x.com");

    assert_eq!(app.login(" ann@X.COM", "Secret123").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let app = common::TestApp::new();
    let (name, email) = common::fake_account();

    let first = app.register(&name, &email, "Secret123").await;
    assert_eq!(first.status, StatusCode::OK);

    let second = app.register(&name, &email.to_uppercase(), "Other1234").await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.json(), json!({ "error": "Email already registered" }));
    assert_eq!(app.users.len().await, 1);
}

#[tokio::test]
async fn test_register_invalid_input() {
    let app = common::TestApp::new();

    let response = app.register("Ann", "not-an-email", "Secret123").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"], "Invalid email format");

    let response = app.register("Ann", "ann@x.com", "short").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.post("/register", &json!({ "email": "ann@x.com" })).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    assert!(app.users.is_empty().await);
}

#[tokio::test]
async fn test_register_with_role() {
    let app = common::TestApp::new();

    let response = app
        .post(
            "/register",
            &json!({ "name": "Sam", "email": "sam@x.com", "password": "Secret123", "role": "SELLER" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["role"], "SELLER");

    let response = app
        .post(
            "/register",
            &json!({ "name": "Eve", "email": "eve@x.com", "password": "Secret123", "role": "ADMIN" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_signup_can_be_enabled() {
    let app = common::TestApp::with_env(&[("SHOP__AUTH__ALLOW_ADMIN_SIGNUP", "true")]);

    let response = app
        .post(
            "/register",
            &json!({ "name": "Eve", "email": "eve@x.com", "password": "Secret123", "role": "ADMIN" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["role"], "ADMIN");
}

#[tokio::test]
async fn test_login_does_not_reveal_unknown_emails() {
    let app = common::TestApp::new();
    app.register("Ann", "ann@x.com", "Secret123").await;

    let wrong_password = app.login("ann@x.com", "Wrong1234").await;
    let unknown_email = app.login("nobody@x.com", "Secret123").await;

    assert_eq!(wrong_password.status, unknown_email.status);
    assert_eq!(wrong_password.body, unknown_email.body);
}

#[tokio::test]
async fn test_login_sets_refresh_cookie() {
    let app = common::TestApp::new();
    app.register("Ann", "ann@x.com", "Secret123").await;

    let response = app.login("ann@x.com", "Secret123").await;
    let cookie = response.set_cookie().unwrap();

    assert!(cookie.starts_with("refreshToken="));
    assert!(cookie.contains("HttpOnly"));
    assert!(!response.body.contains("refreshToken"));
}

#[tokio::test]
async fn test_refresh_token_from_cookie() {
    let app = common::TestApp::new();
    app.register("Ann", "ann@x.com", "Secret123").await;
    let login = app.login("ann@x.com", "Secret123").await;
    let cookie = common::cookie_pair(&login.set_cookie().unwrap());

    let response = app.post_with_cookie("/refresh-token", &cookie).await;
    assert_eq!(response.status, StatusCode::OK);
    let token = response.json()["token"].as_str().unwrap().to_string();

    let me = app.get_authorized("/me", &token).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.json()["email"], "ann@x.com");
}

#[tokio::test]
async fn test_refresh_without_cookie_is_rejected() {
    let app = common::TestApp::new();

    let response = app.post("/refresh-token", &json!({})).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json(), json!({ "error": "Invalid token" }));
}

#[tokio::test]
async fn test_tokens_are_not_interchangeable() {
    let app = common::TestApp::new();
    app.register("Ann", "ann@x.com", "Secret123").await;
    let login = app.login("ann@x.com", "Secret123").await;
    let access = login.json()["token"].as_str().unwrap().to_string();
    let refresh = common::cookie_pair(&login.set_cookie().unwrap())
        .trim_start_matches("refreshToken=")
        .to_string();

    let me = app.get_authorized("/me", &refresh).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);

    let response = app
        .post_with_cookie("/refresh-token", &format!("refreshToken={}", access))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = common::TestApp::new();

    let response = app.post("/logout", &json!({})).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({ "message": "Logged out" }));
    let cookie = response.set_cookie().unwrap();
    assert!(cookie.starts_with("refreshToken=;"));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_forgot_password_answers_identically() {
    let app = common::TestApp::new();
    app.register("Ann", "ann@x.com", "Secret123").await;

    let known = app
        .post("/forgot-password", &json!({ "email": "ann@x.com" }))
        .await;
    let unknown = app
        .post("/forgot-password", &json!({ "email": "nobody@x.com" }))
        .await;

    assert_eq!(known.status, StatusCode::OK);
    assert_eq!(known.status, unknown.status);
    assert_eq!(known.body, unknown.body);
    assert_eq!(known.json(), json!({ "message": "Password reset email sent" }));

    let notice = app.wait_for_notice().await;
    assert_eq!(notice.to_email, "ann@x.com");
    assert_eq!(app.notifier.sent_count(), 1);
}

#[tokio::test]
async fn test_forgot_password_survives_notifier_failure() {
    let app = common::TestApp::with_notifier(LogNotifier::failing());
    app.register("Ann", "ann@x.com", "Secret123").await;

    let response = app
        .post("/forgot-password", &json!({ "email": "ann@x.com" }))
        .await;

    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_forgot_password_rejects_malformed_email() {
    let app = common::TestApp::new();

    let response = app
        .post("/forgot-password", &json!({ "email": "nope" }))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = common::TestApp::new();
    app.register("Ann", "ann@x.com", "Secret123").await;
    app.post("/forgot-password", &json!({ "email": "ann@x.com" }))
        .await;
    let token = common::token_from_link(&app.wait_for_notice().await.reset_link);

    let response = app
        .post(
            "/reset-password",
            &json!({ "token": token, "password": "NewSecret456" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({ "message": "Password has been reset" }));

    assert_eq!(app.login("ann@x.com", "NewSecret456").await.status, StatusCode::OK);
    assert_eq!(
        app.login("ann@x.com", "Secret123").await.status,
        StatusCode::UNAUTHORIZED
    );

    // Second use of the same link
    let response = app
        .post(
            "/reset-password",
            &json!({ "token": token, "password": "Another789" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_password_reset_retires_refresh_cookie() {
    let app = common::TestApp::new();
    app.register("Ann", "ann@x.com", "Secret123").await;
    let (_, stolen) = app.login_session("ann@x.com", "Secret123").await;
    assert_eq!(
        app.post_with_cookie("/refresh-token", &stolen).await.status,
        StatusCode::OK
    );

    app.post("/forgot-password", &json!({ "email": "ann@x.com" }))
        .await;
    let token = common::token_from_link(&app.wait_for_notice().await.reset_link);
    let response = app
        .post(
            "/reset-password",
            &json!({ "token": token, "password": "NewSecret456" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app.post_with_cookie("/refresh-token", &stolen).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json(), json!({ "error": "Invalid token" }));
}

#[tokio::test]
async fn test_change_password_flow() {
    let app = common::TestApp::new();
    app.register("Ann", "ann@x.com", "Secret123").await;
    let (access, cookie) = app.login_session("ann@x.com", "Secret123").await;

    let response = app
        .post_authorized(
            "/change-password",
            &access,
            &json!({ "currentPassword": "Wrong1234", "newPassword": "NewSecret456" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json(), json!({ "error": "Invalid credentials" }));

    let response = app
        .post_authorized(
            "/change-password",
            &access,
            &json!({ "currentPassword": "Secret123", "newPassword": "Secret123" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .post_authorized(
            "/change-password",
            &access,
            &json!({ "currentPassword": "Secret123", "newPassword": "NewSecret456" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({ "message": "Password has been changed" }));

    assert_eq!(app.login("ann@x.com", "NewSecret456").await.status, StatusCode::OK);
    assert_eq!(
        app.login("ann@x.com", "Secret123").await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        app.post_with_cookie("/refresh-token", &cookie).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_user_lookup_is_admin_only() {
    let app = common::TestApp::with_env(&[("SHOP__AUTH__ALLOW_ADMIN_SIGNUP", "true")]);
    let ann = app.register("Ann", "ann@x.com", "Secret123").await.json();
    app.post(
        "/register",
        &json!({ "name": "Sam", "email": "sam@x.com", "password": "Secret123", "role": "SELLER" }),
    )
    .await;
    app.post(
        "/register",
        &json!({ "name": "Eve", "email": "eve@x.com", "password": "Secret123", "role": "ADMIN" }),
    )
    .await;
    let path = format!("/users/{}", ann["id"].as_str().unwrap());

    let (customer, _) = app.login_session("ann@x.com", "Secret123").await;
    let (seller, _) = app.login_session("sam@x.com", "Secret123").await;
    let (admin, _) = app.login_session("eve@x.com", "Secret123").await;

    assert_eq!(app.get(&path).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        app.get_authorized(&path, &customer).await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        app.get_authorized(&path, &seller).await.status,
        StatusCode::UNAUTHORIZED
    );

    let response = app.get_authorized(&path, &admin).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["email"], "ann@x.com");

    let response = app.get_authorized("/users/not-a-uuid", &admin).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["statusCode"], 400);
}

#[tokio::test]
async fn test_store_outage_is_a_generic_500() {
    let app = common::TestApp::new();
    app.users.set_unavailable(true);

    let response = app.login("ann@x.com", "Secret123").await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json(), json!({ "error": "An error occurred" }));
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let app = common::TestApp::with_env(&[("SHOP__SERVER__BODY_LIMIT_BYTES", "64")]);
    let long_name = "a".repeat(200);

    let response = app.register(&long_name, "ann@x.com", "Secret123").await;

    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.json()["statusCode"], 413);
}
