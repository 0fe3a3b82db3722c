//! Authentication routes
//!
//! Register, login, token refresh, logout, the password reset pair, password
//! change, the current-user lookup and the admin-only user lookup. Login answers `{token}` with the access token and sets
//! the refresh token as an HttpOnly cookie that `/refresh-token` reads back.

use super::extract::ValidatedJson;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue,
    },
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use shopfront_shared::{
    ChangePasswordRequest, CreateUserDto, ForgotPasswordRequest, LoginRequest, MessageResponse,
    ResetPasswordRequest, Role, TokenResponse, User,
};
use uuid::Uuid;

/// Name of the cookie carrying the refresh token
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Create auth routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/refresh-token", post(refresh_token))
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
        .route("/me", get(current_user))
        .route("/users/:id", get(get_user))
}

/// Register a new user
///
/// POST /register
async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateUserDto>,
) -> ApiResult<Json<User>> {
    let user = state.auth().register(req).await?;
    Ok(Json(user))
}

/// Login with email and password
///
/// POST /login
async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let tokens = state.auth().login(&req.email, &req.password).await?;

    let cookie = refresh_cookie(
        &tokens.refresh_token,
        state.jwt().refresh_token_ttl_secs(),
        state.config().auth.secure_cookies,
    )?;

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(TokenResponse {
            token: tokens.access_token,
        }),
    ))
}

/// Start a password reset
///
/// POST /forgot-password
async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ForgotPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state.auth().forgot_password(&req.email).await?;
    Ok(Json(MessageResponse::new("Password reset email sent")))
}

/// Complete a password reset
///
/// POST /reset-password
async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state.auth().reset_password(&req.token, &req.password).await?;
    Ok(Json(MessageResponse::new("Password has been reset")))
}

/// Mint a new access token from the refresh cookie
///
/// POST /refresh-token
async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<TokenResponse>> {
    let refresh = cookie_value(&headers, REFRESH_COOKIE).ok_or(ApiError::InvalidToken)?;
    let token = state.auth().refresh(refresh).await?;
    Ok(Json(TokenResponse { token }))
}

/// Drop the refresh cookie
///
/// POST /logout
///
/// Tokens are stateless, so an already copied refresh token stays valid
/// until it expires.
async fn logout(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let cookie = clear_refresh_cookie(state.config().auth.secure_cookies)?;
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(MessageResponse::new("Logged out")),
    ))
}

/// Change the caller's password
///
/// POST /change-password
///
/// Refresh tokens issued before the change stop working, so the refresh
/// cookie is cleared as well.
async fn change_password(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    state
        .auth()
        .change_password(auth_user.user_id, &req.current_password, &req.new_password)
        .await?;

    let cookie = clear_refresh_cookie(state.config().auth.secure_cookies)?;
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(MessageResponse::new("Password has been changed")),
    ))
}

/// Current user (requires a Bearer access token)
///
/// GET /me
async fn current_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Json<User>> {
    let user = state.auth().current_user(auth_user.user_id).await?;
    Ok(Json(user))
}

/// Any user by ID (admins only)
///
/// GET /users/:id
async fn get_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    auth_user.require_role(&[Role::Admin])?;
    let user = state.auth().find_user(user_id).await?;
    Ok(Json(user))
}

fn cookie_attributes(max_age_secs: i64, secure: bool) -> String {
    let mut attributes = format!("HttpOnly; Path=/; SameSite=Strict; Max-Age={}", max_age_secs);
    if secure {
        attributes.push_str("; Secure");
    }
    attributes
}

/// `Set-Cookie` value delivering a refresh token
pub fn refresh_cookie(token: &str, max_age_secs: i64, secure: bool) -> ApiResult<HeaderValue> {
    let value = format!(
        "{}={}; {}",
        REFRESH_COOKIE,
        token,
        cookie_attributes(max_age_secs, secure)
    );
    HeaderValue::from_str(&value)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Invalid cookie value: {}", e)))
}

/// `Set-Cookie` value expiring the refresh token cookie
pub fn clear_refresh_cookie(secure: bool) -> ApiResult<HeaderValue> {
    let value = format!("{}=; {}", REFRESH_COOKIE, cookie_attributes(0, secure));
    HeaderValue::from_str(&value)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Invalid cookie value: {}", e)))
}

/// Value of the named cookie across all `Cookie` headers
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value)
}
