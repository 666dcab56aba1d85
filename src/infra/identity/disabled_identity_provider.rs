use crate::domain::models::{identity::ProviderAccount, user::Role};
use crate::domain::ports::IdentityProvider;
use crate::error::AppError;
use async_trait::async_trait;

/// Stand-in used when no provider is configured. Mirroring becomes a no-op at the
/// call sites because they check `is_enabled` first; direct calls report the gap.
pub struct DisabledIdentityProvider;

fn not_configured() -> AppError {
    AppError::IdentityProvider("identity provider is not configured".into())
}

#[async_trait]
impl IdentityProvider for DisabledIdentityProvider {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn create_user(&self, _email: &str, _password: &str, _name: &str, _role: Role) -> Result<String, AppError> {
        Err(not_configured())
    }

    async fn update_password(&self, _provider_id: &str, _password: &str) -> Result<(), AppError> {
        Err(not_configured())
    }

    async fn delete_user(&self, _provider_id: &str) -> Result<(), AppError> {
        Err(not_configured())
    }

    async fn send_password_reset(&self, _email: &str, _redirect_to: &str) -> Result<(), AppError> {
        Err(not_configured())
    }

    async fn user_for_access_token(&self, _access_token: &str) -> Result<Option<ProviderAccount>, AppError> {
        Ok(None)
    }
}
