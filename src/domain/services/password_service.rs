use std::sync::Arc;
use chrono::{Duration, Utc};
use tera::{Context, Tera};
use tracing::{debug, error, info, warn};

use crate::config::{normalize_email, Config, RESET_TOKEN_TTL_MINUTES};
use crate::domain::{
    models::{password_reset::PasswordResetToken, user::User},
    ports::{EmailService, IdentityProvider, PasswordResetRepository, UserRepository},
    services::{
        credential_store::CredentialStore,
        passwords::{digest_token, generate_reset_token, hash_password, verify_password},
    },
};
use crate::error::AppError;

pub const GENERIC_RESET_MESSAGE: &str =
    "If an account exists with this email, you will receive a password reset link.";

const ADMIN_RESET_BLOCKED: &str =
    "Admin password cannot be reset via this method. Please use the change password option while logged in.";
const INVALID_RESET_TOKEN: &str = "Invalid or expired reset token";

pub struct PasswordService {
    users: Arc<dyn UserRepository>,
    reset_tokens: Arc<dyn PasswordResetRepository>,
    credentials: Arc<CredentialStore>,
    identity: Arc<dyn IdentityProvider>,
    mailer: Option<Arc<dyn EmailService>>,
    templates: Arc<Tera>,
    config: Config,
}

impl PasswordService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        reset_tokens: Arc<dyn PasswordResetRepository>,
        credentials: Arc<CredentialStore>,
        identity: Arc<dyn IdentityProvider>,
        mailer: Option<Arc<dyn EmailService>>,
        templates: Arc<Tera>,
        config: Config,
    ) -> Self {
        Self { users, reset_tokens, credentials, identity, mailer, templates, config }
    }

    /// Immediate self-service change. Clears the must-reset flag.
    pub async fn change_password(&self, user: &User, current_password: &str, new_password: &str) -> Result<(), AppError> {
        if current_password == new_password {
            return Err(AppError::Validation("New password must be different from current password".into()));
        }

        if !verify_password(current_password, &user.password_hash)? {
            return Err(AppError::Validation("Current password is incorrect".into()));
        }

        self.credentials.set_password(user, new_password, true).await?;
        info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    /// Always succeeds from the caller's point of view unless storage fails; the
    /// response must not reveal whether the account exists, is inactive, or is the admin.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AppError> {
        let email = normalize_email(email);

        let Some(user) = self.users.find_by_email(&email).await? else {
            debug!("Password reset requested for unknown address");
            return Ok(());
        };

        if !user.is_active {
            debug!(user_id = %user.id, "Password reset requested for inactive account");
            return Ok(());
        }

        if user.is_admin() {
            warn!(email = %email, "Blocked password reset attempt for admin account");
            return Ok(());
        }

        if user.is_linked_to_provider() && self.identity.is_enabled() {
            match self.identity.send_password_reset(&user.email, &self.config.reset_redirect_url()).await {
                Ok(()) => {
                    info!(user_id = %user.id, "Password reset email sent via identity provider");
                    return Ok(());
                }
                Err(e) => error!(user_id = %user.id, "Provider reset failed, falling back to local token: {}", e),
            }
        }

        self.issue_local_reset(&user).await
    }

    async fn issue_local_reset(&self, user: &User) -> Result<(), AppError> {
        self.reset_tokens.delete_for_user(&user.id).await?;

        let raw_token = generate_reset_token();
        let token = PasswordResetToken::new(
            user.id.clone(),
            digest_token(&raw_token),
            Duration::minutes(RESET_TOKEN_TTL_MINUTES),
        );
        self.reset_tokens.create(&token).await?;

        let reset_url = self.config.reset_link(&raw_token);

        let Some(mailer) = &self.mailer else {
            if self.config.is_production() {
                error!(user_id = %user.id, "No email transport configured; reset link could not be delivered");
            } else {
                info!(reset_url = %reset_url, email = %user.email, expires_at = %token.expires_at,
                    "Email service not configured - password reset link logged");
            }
            return Ok(());
        };

        let mut ctx = Context::new();
        ctx.insert("name", &user.name);
        ctx.insert("reset_url", &reset_url);
        ctx.insert("expires_minutes", &RESET_TOKEN_TTL_MINUTES);

        let body = match self.templates.render("password_reset.html", &ctx) {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to render password reset email: {:?}", e);
                return Ok(());
            }
        };

        match mailer.send(&user.email, "Reset your password", &body).await {
            Ok(()) => info!(user_id = %user.id, "Password reset email sent"),
            Err(e) => error!(user_id = %user.id, "Failed to send password reset email: {}", e),
        }
        Ok(())
    }

    async fn find_live_token(&self, raw_token: &str) -> Result<PasswordResetToken, AppError> {
        let token = self.reset_tokens.find_by_hash(&digest_token(raw_token)).await?
            .ok_or_else(|| AppError::Validation(INVALID_RESET_TOKEN.into()))?;

        token.check(Utc::now())
            .map_err(|rejection| AppError::Validation(rejection.message().into()))?;

        Ok(token)
    }

    /// Returns the email of the account the token belongs to.
    pub async fn verify_reset_token(&self, raw_token: &str) -> Result<String, AppError> {
        let token = self.find_live_token(raw_token).await?;
        let user = self.users.find_by_id(&token.user_id).await?
            .ok_or_else(|| AppError::Validation(INVALID_RESET_TOKEN.into()))?;
        Ok(user.email)
    }

    /// Local-token completion. Admin accounts are refused and the token is burned.
    pub async fn reset_with_token(&self, raw_token: &str, new_password: &str) -> Result<(), AppError> {
        let token = self.find_live_token(raw_token).await?;

        let user = self.users.find_by_id(&token.user_id).await?
            .ok_or_else(|| AppError::Validation(INVALID_RESET_TOKEN.into()))?;

        if user.is_admin() {
            warn!(user_id = %user.id, "Blocked legacy token password reset for admin account");
            self.reset_tokens.mark_used(&token.id).await?;
            return Err(AppError::Forbidden(ADMIN_RESET_BLOCKED.into()));
        }

        if !self.reset_tokens.mark_used(&token.id).await? {
            return Err(AppError::Validation(INVALID_RESET_TOKEN.into()));
        }
        self.credentials.set_password(&user, new_password, false).await?;
        self.reset_tokens.delete_for_user(&user.id).await?;

        info!(user_id = %user.id, "Password reset via local token");
        Ok(())
    }

    /// Provider-linked completion: the caller must prove a verified recovery session by
    /// presenting the provider's access token for the same email.
    pub async fn reset_with_provider_session(
        &self,
        email: &str,
        access_token: Option<&str>,
        new_password: &str,
    ) -> Result<(), AppError> {
        let email = normalize_email(email);

        let Some(access_token) = access_token.filter(|t| !t.trim().is_empty()) else {
            warn!(email = %email, "Password sync attempt without provider access token");
            return Err(AppError::Unauthorized("Authentication required for password sync".into()));
        };

        let account = match self.identity.user_for_access_token(access_token).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                warn!(email = %email, "Provider rejected access token for password sync");
                return Err(AppError::Unauthorized("Invalid or expired authentication token".into()));
            }
            Err(e) => {
                warn!(email = %email, "Could not verify provider access token: {}", e);
                return Err(AppError::Unauthorized("Invalid or expired authentication token".into()));
            }
        };

        if account.email.as_deref().map(normalize_email).as_deref() != Some(email.as_str()) {
            warn!(request_email = %email, token_email = ?account.email, "Token email mismatch in password sync");
            return Err(AppError::Forbidden("Token does not match the requested email".into()));
        }

        if self.config.is_admin_email(&email) {
            warn!(email = %email, "Blocked provider password sync for admin account");
            return Err(AppError::Forbidden(ADMIN_RESET_BLOCKED.into()));
        }

        let user = self.users.find_by_email(&email).await?
            .ok_or_else(|| AppError::Validation("User not found".into()))?;

        if user.is_admin() {
            return Err(AppError::Forbidden(ADMIN_RESET_BLOCKED.into()));
        }

        let password_hash = hash_password(new_password)?;
        self.credentials.apply_password_hash(&user.id, &password_hash, false).await?;

        info!(user_id = %user.id, "Password synced after provider recovery");
        Ok(())
    }
}
