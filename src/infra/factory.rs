use std::sync::Arc;
use std::str::FromStr;
use std::time::Duration;

use sqlx::{
    postgres::{PgConnectOptions, PgPool, PgPoolOptions},
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions},
    ConnectOptions,
};
use tera::Tera;
use tracing::{info, warn};
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::domain::{
    models::user::{Role, User},
    ports::{EmailService, IdentityProvider, PasswordChangeRepository, PasswordResetRepository, UserRepository},
    services::{
        auth_service::AuthService,
        credential_store::CredentialStore,
        password_change_service::PasswordChangeService,
        password_service::PasswordService,
        passwords::hash_password,
    },
};
use crate::error::StartupError;
use crate::infra::{
    email::http_email_service::HttpEmailService,
    identity::{
        disabled_identity_provider::DisabledIdentityProvider,
        supabase_identity_provider::SupabaseIdentityProvider,
    },
    repositories::{
        postgres_password_change_repo::PostgresPasswordChangeRepo,
        postgres_password_reset_repo::PostgresPasswordResetRepo,
        postgres_user_repo::PostgresUserRepo,
        sqlite_password_change_repo::SqlitePasswordChangeRepo,
        sqlite_password_reset_repo::SqlitePasswordResetRepo,
        sqlite_user_repo::SqliteUserRepo,
    },
};
use crate::state::AppState;

/// Storage adapters for one database backend.
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub reset_tokens: Arc<dyn PasswordResetRepository>,
    pub change_requests: Arc<dyn PasswordChangeRepository>,
}

impl Repositories {
    pub fn sqlite(pool: SqlitePool) -> Self {
        Self {
            users: Arc::new(SqliteUserRepo::new(pool.clone())),
            reset_tokens: Arc::new(SqlitePasswordResetRepo::new(pool.clone())),
            change_requests: Arc::new(SqlitePasswordChangeRepo::new(pool)),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PostgresUserRepo::new(pool.clone())),
            reset_tokens: Arc::new(PostgresPasswordResetRepo::new(pool.clone())),
            change_requests: Arc::new(PostgresPasswordChangeRepo::new(pool)),
        }
    }
}

pub async fn bootstrap_state(config: &Config) -> Result<AppState, StartupError> {
    let database_url = &config.database_url;

    let repositories = if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Initializing PostgreSQL connection...");

        let opts = PgConnectOptions::from_str(database_url)?
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await?;

        sqlx::migrate!("./migrations/postgres").run(&pool).await?;
        Repositories::postgres(pool)
    } else {
        info!("Initializing SQLite connection with WAL Mode...");

        let opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;

        sqlx::migrate!("./migrations/sqlite").run(&pool).await?;
        Repositories::sqlite(pool)
    };

    let identity_provider: Arc<dyn IdentityProvider> = match &config.identity_provider {
        Some(provider) => {
            info!(url = %provider.url, "Identity provider mirroring enabled");
            Arc::new(SupabaseIdentityProvider::new(provider))
        }
        None => {
            info!("Identity provider not configured; local credentials only");
            Arc::new(DisabledIdentityProvider)
        }
    };

    let email_service: Option<Arc<dyn EmailService>> = match &config.mail {
        Some(mail) => Some(Arc::new(HttpEmailService::new(mail.url.clone(), mail.token.clone()))),
        None => {
            warn!("MAIL_SERVICE_URL not set; password reset links will be logged instead of emailed");
            None
        }
    };

    let state = build_state(
        config.clone(),
        repositories,
        identity_provider,
        email_service,
        Arc::new(load_templates()?),
    )?;

    bootstrap_admin(&state).await?;
    Ok(state)
}

pub fn load_templates() -> Result<Tera, StartupError> {
    let mut tera = Tera::default();
    tera.add_raw_template("password_reset.html", include_str!("../templates/password_reset.html"))?;
    Ok(tera)
}

/// Wires services over already-constructed adapters.
pub fn build_state(
    config: Config,
    repositories: Repositories,
    identity_provider: Arc<dyn IdentityProvider>,
    email_service: Option<Arc<dyn EmailService>>,
    templates: Arc<Tera>,
) -> Result<AppState, StartupError> {
    let Repositories { users, reset_tokens, change_requests } = repositories;

    let credential_store = Arc::new(CredentialStore::new(users.clone(), identity_provider.clone()));
    let auth_service = Arc::new(AuthService::new(users.clone(), config.clone())?);
    let password_service = Arc::new(PasswordService::new(
        users.clone(),
        reset_tokens.clone(),
        credential_store.clone(),
        identity_provider.clone(),
        email_service,
        templates,
        config.clone(),
    ));
    let password_change_service = Arc::new(PasswordChangeService::new(
        change_requests.clone(),
        credential_store.clone(),
    ));

    Ok(AppState {
        config,
        user_repo: users,
        reset_repo: reset_tokens,
        change_repo: change_requests,
        identity_provider,
        credential_store,
        auth_service,
        password_service,
        password_change_service,
    })
}

/// Creates the designated admin account on first start when a bootstrap password is
/// configured. The account stays local-only and must reset its password on first login.
pub async fn bootstrap_admin(state: &AppState) -> Result<(), StartupError> {
    let config = &state.config;
    let Some(password) = config.admin_bootstrap_password.as_deref() else {
        return Ok(());
    };

    if state.user_repo.find_by_email(&config.admin_email).await?.is_some() {
        return Ok(());
    }

    let admin = User::new(
        "Administrator".to_string(),
        config.admin_email.clone(),
        hash_password(password)?,
        Role::Admin,
    );
    state.user_repo.create(&admin).await?;

    info!(email = %config.admin_email, "Bootstrapped admin account");
    Ok(())
}
