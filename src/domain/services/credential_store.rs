use std::sync::Arc;
use tracing::{error, info, warn};

use crate::domain::{
    models::user::User,
    ports::{IdentityProvider, UserRepository},
    services::passwords::hash_password,
};
use crate::error::AppError;

/// The local `users` table is authoritative. The identity provider is a mirror that
/// is written after every successful local write; its failures are logged and dropped.
pub struct CredentialStore {
    users: Arc<dyn UserRepository>,
    mirror: Arc<dyn IdentityProvider>,
}

impl CredentialStore {
    pub fn new(users: Arc<dyn UserRepository>, mirror: Arc<dyn IdentityProvider>) -> Self {
        Self { users, mirror }
    }

    pub async fn set_password(&self, user: &User, new_password: &str, clear_must_reset: bool) -> Result<(), AppError> {
        let password_hash = hash_password(new_password)?;
        self.users.update_password(&user.id, &password_hash, clear_must_reset).await?;
        self.mirror_password(user, new_password).await;
        Ok(())
    }

    /// Applies an already-hashed password. There is no plaintext here, so the mirror
    /// is left as is.
    pub async fn apply_password_hash(&self, user_id: &str, password_hash: &str, clear_must_reset: bool) -> Result<(), AppError> {
        self.users.update_password(user_id, password_hash, clear_must_reset).await
    }

    async fn mirror_password(&self, user: &User, new_password: &str) {
        let Some(provider_id) = user.identity_provider_id.as_deref() else {
            return;
        };
        if !self.mirror.is_enabled() {
            return;
        }

        if let Err(e) = self.mirror.update_password(provider_id, new_password).await {
            warn!(user_id = %user.id, "Failed to mirror password to identity provider (non-fatal): {}", e);
        }
    }

    /// Creates the provider account first so the local row can carry its id; a provider
    /// failure leaves the user unlinked. If the local insert fails, the provider account
    /// is removed again.
    pub async fn create_user(&self, mut user: User, plain_password: &str) -> Result<User, AppError> {
        user.password_hash = hash_password(plain_password)?;

        let mut provider_id = None;
        if self.mirror.is_enabled() {
            match self.mirror.create_user(&user.email, plain_password, &user.name, user.role).await {
                Ok(id) => provider_id = Some(id),
                Err(e) => error!(email = %user.email, "Provider account creation failed, continuing unlinked: {}", e),
            }
        }

        user.identity_provider_id = provider_id.clone();

        match self.users.create(&user).await {
            Ok(created) => {
                info!(user_id = %created.id, role = %created.role, linked = created.is_linked_to_provider(), "User created");
                Ok(created)
            }
            Err(e) => {
                if let Some(id) = provider_id {
                    if let Err(cleanup) = self.mirror.delete_user(&id).await {
                        error!("Failed to clean up provider account {}: {}", id, cleanup);
                    }
                }
                Err(e)
            }
        }
    }

    /// Links an existing local user to a new provider account. Unlike mirroring,
    /// failure here is reported to the caller.
    pub async fn link_to_provider(&self, user: &User, temporary_password: &str) -> Result<String, AppError> {
        let provider_id = self.mirror
            .create_user(&user.email, temporary_password, &user.name, user.role)
            .await?;

        if let Err(e) = self.users.set_identity_provider_id(&user.id, Some(&provider_id)).await {
            error!(user_id = %user.id, "Provider account created but local link failed: {}", e);
            if let Err(cleanup) = self.mirror.delete_user(&provider_id).await {
                error!("Failed to clean up provider account {}: {}", provider_id, cleanup);
            }
            return Err(e);
        }

        info!(user_id = %user.id, "User linked to identity provider");
        Ok(provider_id)
    }
}
