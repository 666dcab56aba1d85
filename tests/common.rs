#![allow(dead_code)]

use timecard_backend::{
    api::router::create_router,
    state::AppState,
    config::{Config, Environment},
    infra::factory::{build_state, load_templates, Repositories},
    domain::{
        models::{identity::ProviderAccount, user::{Role, User}},
        ports::{EmailService, IdentityProvider},
        services::passwords::hash_password,
    },
    error::AppError,
};
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Pool, Sqlite};
use std::collections::HashMap;
use std::sync::{atomic::{AtomicBool, Ordering}, Arc, Mutex};
use uuid::Uuid;
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    Router,
};
use std::str::FromStr;
use async_trait::async_trait;
use chrono::Duration;
use tower::ServiceExt;
use serde_json::Value;

pub const ADMIN_EMAIL: &str = "admin@timecard.test";
pub const FRONTEND_URL: &str = "http://frontend.test";

#[derive(Clone, Debug)]
pub struct SentEmail {
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
}

#[derive(Default)]
pub struct MockEmailService {
    pub sent: Mutex<Vec<SentEmail>>,
}

#[async_trait]
impl EmailService for MockEmailService {
    async fn send(&self, recipient: &str, subject: &str, html_body: &str) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(SentEmail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
        });
        Ok(())
    }
}

/// Records every call; `fail` makes all mutating calls error out.
#[derive(Default)]
pub struct MockIdentityProvider {
    pub fail: AtomicBool,
    pub calls: Mutex<Vec<String>>,
    /// access token -> email of the account it belongs to
    pub sessions: Mutex<HashMap<String, String>>,
}

impl MockIdentityProvider {
    fn record(&self, call: String) -> Result<(), AppError> {
        self.calls.lock().unwrap().push(call);
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::IdentityProvider("mock provider failure".into()));
        }
        Ok(())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls().into_iter().filter(|c| c.starts_with(prefix)).collect()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn add_session(&self, access_token: &str, email: &str) {
        self.sessions.lock().unwrap().insert(access_token.to_string(), email.to_string());
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn create_user(&self, email: &str, _password: &str, _name: &str, _role: Role) -> Result<String, AppError> {
        self.record(format!("create_user:{}", email))?;
        Ok(format!("provider-{}", Uuid::new_v4()))
    }

    async fn update_password(&self, provider_id: &str, _password: &str) -> Result<(), AppError> {
        self.record(format!("update_password:{}", provider_id))
    }

    async fn delete_user(&self, provider_id: &str) -> Result<(), AppError> {
        self.record(format!("delete_user:{}", provider_id))
    }

    async fn send_password_reset(&self, email: &str, _redirect_to: &str) -> Result<(), AppError> {
        self.record(format!("send_password_reset:{}", email))
    }

    async fn user_for_access_token(&self, access_token: &str) -> Result<Option<ProviderAccount>, AppError> {
        Ok(self.sessions.lock().unwrap().get(access_token).map(|email| ProviderAccount {
            id: format!("provider-session-{}", access_token),
            email: Some(email.clone()),
        }))
    }
}

pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub state: Arc<AppState>,
    pub mailer: Arc<MockEmailService>,
    pub provider: Arc<MockIdentityProvider>,
}

pub fn test_config(database_url: &str) -> Config {
    Config {
        database_url: database_url.to_string(),
        port: 0,
        environment: Environment::Test,
        jwt_secret: "test-secret-that-is-long-enough-for-hs256-signing".to_string(),
        jwt_expiry: Duration::days(7),
        auth_issuer: "test-issuer".to_string(),
        admin_email: ADMIN_EMAIL.to_string(),
        support_email: "support@timecard.test".to_string(),
        frontend_url: FRONTEND_URL.to_string(),
        mail: None,
        identity_provider: None,
        admin_bootstrap_password: None,
    }
}

impl TestApp {
    pub async fn new() -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let mailer = Arc::new(MockEmailService::default());
        let provider = Arc::new(MockIdentityProvider::default());

        let state = build_state(
            test_config(&db_url),
            Repositories::sqlite(pool.clone()),
            provider.clone(),
            Some(mailer.clone() as Arc<dyn EmailService>),
            Arc::new(load_templates().expect("templates")),
        ).expect("Failed to build state");
        let state = Arc::new(state);

        let router = create_router(state.clone());

        Self {
            router,
            pool,
            db_filename,
            state,
            mailer,
            provider,
        }
    }

    /// Inserts a user directly; `must_reset_password` starts false so tests opt in explicitly.
    pub async fn seed_user(&self, name: &str, email: &str, password: &str, role: Role) -> User {
        let mut user = User::new(
            name.to_string(),
            email.to_string(),
            hash_password(password).unwrap(),
            role,
        );
        user.must_reset_password = false;
        self.state.user_repo.create(&user).await.expect("seed user")
    }

    pub async fn seed_admin(&self, password: &str) -> User {
        self.seed_user("Admin", ADMIN_EMAIL, password, Role::Admin).await
    }

    pub async fn link_user(&self, user_id: &str) -> String {
        let provider_id = format!("provider-{}", Uuid::new_v4());
        self.state.user_repo.set_identity_provider_id(user_id, Some(&provider_id)).await.unwrap();
        provider_id
    }

    pub async fn request(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self.request(
            "POST",
            "/api/auth/login",
            None,
            Some(serde_json::json!({ "email": email, "password": password })),
        ).await;

        if !status.is_success() {
            panic!("Login failed in test helper: status {} body {}", status, body);
        }

        body["token"].as_str().expect("No token in login response").to_string()
    }

    pub fn sent_emails(&self) -> Vec<SentEmail> {
        self.mailer.sent.lock().unwrap().clone()
    }

    /// Raw reset token from the most recent reset email to `email`.
    pub fn last_reset_token(&self, email: &str) -> Option<String> {
        let marker = format!("{}/reset-password/", FRONTEND_URL);
        self.sent_emails()
            .iter()
            .rev()
            .find(|m| m.recipient == email)
            .and_then(|m| {
                let start = m.html_body.find(&marker)? + marker.len();
                Some(m.html_body[start..start + 64].to_string())
            })
    }

    pub async fn reset_token_count(&self, user_id: &str) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM password_reset_tokens WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
    }
}
