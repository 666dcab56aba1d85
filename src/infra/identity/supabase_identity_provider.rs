use crate::config::IdentityProviderConfig;
use crate::domain::models::{identity::ProviderAccount, user::Role};
use crate::domain::ports::IdentityProvider;
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, instrument};

/// Talks to the GoTrue admin REST API behind a Supabase project.
pub struct SupabaseIdentityProvider {
    client: Client,
    base_url: String,
    service_key: String,
}

impl SupabaseIdentityProvider {
    pub fn new(config: &IdentityProviderConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: config.url.clone(),
            service_key: config.service_key.clone(),
        }
    }

    fn admin(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn expect_success(&self, action: &str, res: Result<Response, reqwest::Error>) -> Result<Response, AppError> {
        let res = res.map_err(|e| {
            error!("Identity provider {} request failed: {:?}", action, e);
            AppError::IdentityProvider(format!("{}: {}", action, e))
        })?;

        if res.status().is_success() {
            return Ok(res);
        }

        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        Err(AppError::IdentityProvider(format!("{} failed. Status: {}, Body: {}", action, status, text)))
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentityProvider {
    fn is_enabled(&self) -> bool {
        true
    }

    #[instrument(skip(self, password, name))]
    async fn create_user(&self, email: &str, password: &str, name: &str, role: Role) -> Result<String, AppError> {
        let url = format!("{}/auth/v1/admin/users", self.base_url);
        let res = self.admin(self.client.post(&url))
            .json(&json!({
                "email": email,
                "password": password,
                "email_confirm": true,
                "user_metadata": { "name": name, "role": role.as_str() }
            }))
            .send()
            .await;

        let account: ProviderAccount = self.expect_success("create_user", res).await?
            .json()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("create_user response: {}", e)))?;

        debug!("Provider account created: {}", account.id);
        Ok(account.id)
    }

    #[instrument(skip(self, password))]
    async fn update_password(&self, provider_id: &str, password: &str) -> Result<(), AppError> {
        let url = format!("{}/auth/v1/admin/users/{}", self.base_url, provider_id);
        let res = self.admin(self.client.put(&url))
            .json(&json!({ "password": password }))
            .send()
            .await;

        self.expect_success("update_password", res).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, provider_id: &str) -> Result<(), AppError> {
        let url = format!("{}/auth/v1/admin/users/{}", self.base_url, provider_id);
        let res = self.admin(self.client.delete(&url)).send().await;

        self.expect_success("delete_user", res).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn send_password_reset(&self, email: &str, redirect_to: &str) -> Result<(), AppError> {
        let url = format!("{}/auth/v1/recover", self.base_url);
        let res = self.client.post(&url)
            .header("apikey", &self.service_key)
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({ "email": email }))
            .send()
            .await;

        self.expect_success("send_password_reset", res).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn user_for_access_token(&self, access_token: &str) -> Result<Option<ProviderAccount>, AppError> {
        let url = format!("{}/auth/v1/user", self.base_url);
        let res = self.client.get(&url)
            .header("apikey", &self.service_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("get_user: {}", e)))?;

        match res.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let account = res.json::<ProviderAccount>()
                    .await
                    .map_err(|e| AppError::IdentityProvider(format!("get_user response: {}", e)))?;
                Ok(Some(account))
            }
            status => {
                let text = res.text().await.unwrap_or_default();
                Err(AppError::IdentityProvider(format!("get_user failed. Status: {}, Body: {}", status, text)))
            }
        }
    }
}
