use crate::domain::models::{
    identity::ProviderAccount,
    password_change::{ChangeRequestStatus, PasswordChangeRequest, PasswordChangeRequestView},
    password_reset::PasswordResetToken,
    user::{Role, User},
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<User, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError>;
    /// `email` must already be normalized.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn list(&self, role: Option<Role>) -> Result<Vec<User>, AppError>;
    async fn list_unlinked(&self) -> Result<Vec<User>, AppError>;
    async fn update_profile(&self, user: &User) -> Result<User, AppError>;
    async fn update_password(&self, id: &str, password_hash: &str, clear_must_reset: bool) -> Result<(), AppError>;
    async fn set_active(&self, id: &str, is_active: bool) -> Result<(), AppError>;
    async fn set_identity_provider_id(&self, id: &str, provider_id: Option<&str>) -> Result<(), AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait PasswordResetRepository: Send + Sync {
    async fn create(&self, token: &PasswordResetToken) -> Result<(), AppError>;
    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<PasswordResetToken>, AppError>;
    /// Claims an unused token; `false` when it was already used.
    async fn mark_used(&self, id: &str) -> Result<bool, AppError>;
    async fn delete_for_user(&self, user_id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait PasswordChangeRepository: Send + Sync {
    async fn create(&self, request: &PasswordChangeRequest) -> Result<PasswordChangeRequest, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<PasswordChangeRequest>, AppError>;
    async fn find_pending_for_user(&self, user_id: &str) -> Result<Option<PasswordChangeRequest>, AppError>;
    async fn find_view(&self, id: &str) -> Result<Option<PasswordChangeRequestView>, AppError>;
    async fn list(&self, status: Option<ChangeRequestStatus>) -> Result<Vec<PasswordChangeRequestView>, AppError>;
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<PasswordChangeRequestView>, AppError>;
    /// Moves a Pending request to its final status; `false` when it is no longer Pending.
    async fn review(
        &self,
        id: &str,
        status: ChangeRequestStatus,
        reviewer_id: &str,
        reason: Option<&str>,
        reviewed_at: DateTime<Utc>,
    ) -> Result<bool, AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, html_body: &str) -> Result<(), AppError>;
}

/// External managed identity provider. Used to mirror passwords and to deliver
/// its own reset emails; never the authority for logins.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn is_enabled(&self) -> bool;
    async fn create_user(&self, email: &str, password: &str, name: &str, role: Role) -> Result<String, AppError>;
    async fn update_password(&self, provider_id: &str, password: &str) -> Result<(), AppError>;
    async fn delete_user(&self, provider_id: &str) -> Result<(), AppError>;
    async fn send_password_reset(&self, email: &str, redirect_to: &str) -> Result<(), AppError>;
    /// Resolves a provider-issued access token; `None` when the token is not accepted.
    async fn user_for_access_token(&self, access_token: &str) -> Result<Option<ProviderAccount>, AppError>;
}
