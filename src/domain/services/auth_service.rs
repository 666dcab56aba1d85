use std::sync::Arc;
use crate::domain::{
    models::{auth::Claims, user::{Role, User}},
    ports::UserRepository,
    services::passwords::verify_password,
};
use crate::error::{AppError, LoginError, StartupError};
use crate::config::{normalize_email, Config};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;
use chrono::Utc;
use tracing::{debug, info, warn};

/// Issues session tokens, checks credentials, and resolves bearer tokens back to live users.
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    config: Config,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, config: Config) -> Result<Self, StartupError> {
        if config.jwt_secret.trim().is_empty() {
            return Err(StartupError::SigningKey("JWT_SECRET is empty".into()));
        }

        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.auth_issuer.as_str()]);
        validation.leeway = 0;

        Ok(Self { users, config, encoding_key, decoding_key, validation })
    }

    pub fn issue_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            iss: self.config.auth_issuer.clone(),
            sub: user.id.clone(),
            exp: (now + self.config.jwt_expiry).timestamp() as usize,
            iat: now.timestamp() as usize,
            jti: Uuid::new_v4().to_string(),
            role: user.role,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| {
                tracing::error!("JWT encoding failed: {}", e);
                AppError::Internal
            })
    }

    pub fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Rejected bearer token: {}", e);
                AppError::Unauthorized("Not authorized, token failed".into())
            })
    }

    /// Resolves a bearer token to the user as currently stored. A token whose subject
    /// was deleted or deactivated after issuance yields `SessionInvalid`.
    pub async fn resolve_session(&self, token: &str) -> Result<User, AppError> {
        let claims = self.decode_token(token)?;

        let user = match self.users.find_by_id(&claims.sub).await? {
            Some(user) => user,
            None => {
                warn!("Token subject no longer exists: {}", claims.sub);
                return Err(AppError::SessionInvalid);
            }
        };

        if !user.is_active {
            warn!("Token presented for deactivated user: {}", user.id);
            return Err(AppError::SessionInvalid);
        }

        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str, selected_role: Option<Role>) -> Result<(String, User), AppError> {
        let email = normalize_email(email);
        let user = self.users.find_by_email(&email).await?
            .ok_or(LoginError::AccountNotFound)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(LoginError::InvalidPassword.into());
        }

        if !user.is_active {
            return Err(LoginError::AccountDeactivated {
                support_email: self.config.support_email.clone(),
            }.into());
        }

        if user.is_admin() && !self.config.is_admin_email(&user.email) {
            warn!("Admin-role login refused for non-designated address: {}", user.email);
            return Err(LoginError::AdminAccessRestricted.into());
        }

        if let Some(selected) = selected_role {
            if selected != user.role {
                return Err(LoginError::RoleMismatch { selected, actual: user.role }.into());
            }
        }

        let token = self.issue_token(&user)?;
        info!(user_id = %user.id, role = %user.role, "User logged in");

        Ok((token, user))
    }
}
