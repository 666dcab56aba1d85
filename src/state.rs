use std::sync::Arc;
use crate::domain::ports::{IdentityProvider, PasswordChangeRepository, PasswordResetRepository, UserRepository};
use crate::domain::services::{
    auth_service::AuthService,
    credential_store::CredentialStore,
    password_change_service::PasswordChangeService,
    password_service::PasswordService,
};
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub user_repo: Arc<dyn UserRepository>,
    pub reset_repo: Arc<dyn PasswordResetRepository>,
    pub change_repo: Arc<dyn PasswordChangeRepository>,
    pub identity_provider: Arc<dyn IdentityProvider>,
    pub credential_store: Arc<CredentialStore>,
    pub auth_service: Arc<AuthService>,
    pub password_service: Arc<PasswordService>,
    pub password_change_service: Arc<PasswordChangeService>,
}
