//! Authentication service
//!
//! Orchestrates registration, login, token refresh, password changes and the
//! password reset flow on top of the credential store, token issuer, password hasher and
//! notifier. The service keeps no state between requests.
//!
//! Login never tells an unknown email apart from a wrong password: both end
//! in `InvalidCredentials`, and the unknown-email path still spends one
//! password verification.
//!
//! Refresh and reset tokens carry the credential version they were issued
//! for. Storing a new password moves that version, which retires every
//! outstanding refresh token of the account.

use crate::auth::{JwtService, PasswordService, TokenError, TokenKind, VerifiedToken};
use crate::error::ApiError;
use crate::notify::{mask_email, Notifier, ResetNotice};
use crate::repositories::{NewUser, UserRepository};
use metrics::counter;
use shopfront_shared::validation::normalize_email;
use shopfront_shared::{CreateUserDto, Role, User};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 128;

/// Tokens minted by a successful login
#[derive(Debug, Clone)]
pub struct LoginTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Behaviour switches taken from configuration
#[derive(Debug, Clone)]
pub struct AuthPolicy {
    pub allow_admin_signup: bool,
    /// Base of the link mailed to users; the token is appended as a query
    pub reset_url: String,
}

/// Authentication use cases
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    notifier: Arc<dyn Notifier>,
    jwt: JwtService,
    passwords: PasswordService,
    policy: AuthPolicy,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        notifier: Arc<dyn Notifier>,
        jwt: JwtService,
        passwords: PasswordService,
        policy: AuthPolicy,
    ) -> Self {
        Self {
            users,
            notifier,
            jwt,
            passwords,
            policy,
        }
    }

    #[inline]
    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    /// Register a new account
    ///
    /// Returns the stored user; the password hash never leaves the store.
    pub async fn register(&self, mut request: CreateUserDto) -> Result<User, ApiError> {
        request.email = normalize_email(&request.email);
        request.validate()?;

        let role = request.role.unwrap_or_default();
        if role == Role::Admin && !self.policy.allow_admin_signup {
            record("auth_register_total", "rejected_role");
            return Err(ApiError::Validation(
                "Role ADMIN cannot be self-assigned".to_string(),
            ));
        }

        let email = request.email;
        if self.users.find_by_email(&email).await?.is_some() {
            record("auth_register_total", "duplicate");
            return Err(ApiError::DuplicateEmail);
        }

        let password_hash = self.passwords.hash_async(request.password).await?;

        // The unique constraint still decides a concurrent duplicate
        let created = self
            .users
            .create(NewUser {
                name: request.name.trim().to_string(),
                email,
                password_hash,
                role,
            })
            .await
            .map_err(|e| {
                let err = ApiError::from(e);
                if matches!(err, ApiError::DuplicateEmail) {
                    record("auth_register_total", "duplicate");
                }
                err
            })?;

        record("auth_register_total", "success");
        info!(user_id = %created.id, role = %created.role, "User registered");
        Ok(created.to_user())
    }

    /// Exchange credentials for an access and a refresh token
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginTokens, ApiError> {
        let email = normalize_email(email);

        let Some(user) = self.users.find_by_email(&email).await? else {
            self.passwords.verify_dummy(password.to_string()).await?;
            record("auth_login_total", "failure");
            debug!("Login for unknown email");
            return Err(ApiError::InvalidCredentials);
        };

        let valid = self
            .passwords
            .verify_async(password.to_string(), user.password_hash.clone())
            .await?;
        if !valid {
            record("auth_login_total", "failure");
            debug!(user_id = %user.id, "Login with wrong password");
            return Err(ApiError::InvalidCredentials);
        }

        let access_token = self.jwt.issue_access_token(user.id, user.role)?;
        let refresh_token = self
            .jwt
            .issue_refresh_token(user.id, user.credential_version())?;

        record("auth_login_total", "success");
        info!(user_id = %user.id, "User logged in");
        Ok(LoginTokens {
            access_token,
            refresh_token,
        })
    }

    /// Start a password reset
    ///
    /// Succeeds whether or not the email belongs to an account. Delivery runs
    /// on a spawned task; its failures are logged and never reach the caller.
    pub async fn forgot_password(&self, email: &str) -> Result<(), ApiError> {
        let email = normalize_email(email);
        record("auth_password_reset_total", "requested");

        let Some(user) = self.users.find_by_email(&email).await? else {
            debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = self
            .jwt
            .issue_reset_token(user.id, user.credential_version())?;
        let notice = ResetNotice {
            to_email: user.email,
            to_name: user.name,
            reset_link: reset_link(&self.policy.reset_url, &token),
        };

        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            match notifier.send_password_reset(&notice).await {
                Ok(()) => debug!(
                    provider = notifier.provider_name(),
                    to = %mask_email(&notice.to_email),
                    "Password reset notice sent"
                ),
                Err(e) => {
                    counter!("auth_notification_failures_total").increment(1);
                    warn!(
                        provider = notifier.provider_name(),
                        to = %mask_email(&notice.to_email),
                        error = %e,
                        "Password reset notice failed"
                    );
                }
            }
        });

        Ok(())
    }

    /// Mint a new access token from a refresh token
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, ApiError> {
        let verified = self.authenticate(refresh_token, TokenKind::Refresh)?;

        let user = self
            .users
            .find_by_id(verified.user_id)
            .await?
            .ok_or_else(|| {
                debug!(user_id = %verified.user_id, "Refresh token for missing user");
                ApiError::InvalidToken
            })?;

        if verified.version != Some(user.credential_version()) {
            record("auth_token_rejected_total", "stale_refresh");
            debug!(user_id = %user.id, "Refresh token predates a password change");
            return Err(ApiError::InvalidToken);
        }

        // Role comes from the store so demotions apply on the next refresh
        let token = self.jwt.issue_access_token(user.id, user.role)?;
        record("auth_refresh_total", "success");
        Ok(token)
    }

    /// Finish a password reset
    ///
    /// The token is bound to the credential version it was issued for, so it
    /// stops working once any password change has been stored.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), ApiError> {
        let verified = self.authenticate(token, TokenKind::Reset)?;

        let user = self
            .users
            .find_by_id(verified.user_id)
            .await?
            .ok_or(ApiError::InvalidToken)?;

        if verified.version != Some(user.credential_version()) {
            record("auth_token_rejected_total", "stale_reset");
            debug!(user_id = %user.id, "Reset token for an outdated credential");
            return Err(ApiError::InvalidToken);
        }

        check_password_length(new_password)?;
        let password_hash = self.passwords.hash_async(new_password.to_string()).await?;

        self.users
            .update_password(user.id, &password_hash)
            .await?
            .ok_or(ApiError::InvalidToken)?;

        record("auth_password_reset_total", "completed");
        info!(user_id = %user.id, "Password reset");
        Ok(())
    }

    /// Replace the password of an authenticated user
    ///
    /// The current password must match and the new one must differ from it.
    /// Refresh tokens issued before the change stop working.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(ApiError::InvalidToken)?;

        let valid = self
            .passwords
            .verify_async(current_password.to_string(), user.password_hash.clone())
            .await?;
        if !valid {
            record("auth_password_change_total", "wrong_password");
            debug!(user_id = %user.id, "Password change with wrong current password");
            return Err(ApiError::InvalidCredentials);
        }

        if current_password == new_password {
            record("auth_password_change_total", "unchanged");
            return Err(ApiError::Validation(
                "New password must be different from the current password".to_string(),
            ));
        }

        check_password_length(new_password)?;
        let password_hash = self.passwords.hash_async(new_password.to_string()).await?;

        self.users
            .update_password(user.id, &password_hash)
            .await?
            .ok_or(ApiError::InvalidToken)?;

        record("auth_password_change_total", "success");
        info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    /// Load the account behind an authenticated request
    pub async fn current_user(&self, user_id: Uuid) -> Result<User, ApiError> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(|record| record.to_user())
            .ok_or(ApiError::InvalidToken)
    }

    /// Look up any account by ID
    pub async fn find_user(&self, user_id: Uuid) -> Result<User, ApiError> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(|record| record.to_user())
            .ok_or(ApiError::UserNotFound)
    }

    /// Verify a token of the given kind, collapsing every failure to `InvalidToken`
    pub fn authenticate(&self, token: &str, kind: TokenKind) -> Result<VerifiedToken, ApiError> {
        self.jwt.verify(token, kind).map_err(|e| reject(kind, &e))
    }
}

fn reject(kind: TokenKind, err: &TokenError) -> ApiError {
    record("auth_token_rejected_total", err.reason());
    debug!(kind = %kind, reason = err.reason(), "Token rejected: {}", err);
    ApiError::InvalidToken
}

fn check_password_length(password: &str) -> Result<(), ApiError> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        return Err(ApiError::Validation(format!(
            "Password must be between {} and {} characters",
            MIN_PASSWORD_LEN, MAX_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn reset_link(base: &str, token: &str) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}token={}", base, separator, token)
}

fn record(name: &'static str, outcome: &'static str) {
    counter!(name, "outcome" => outcome).increment(1);
}
