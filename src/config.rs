use chrono::{Duration, Utc};
use std::env;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            "test" => Some(Self::Test),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MailConfig {
    pub url: String,
    pub token: String,
}

/// Admin API credentials for the external identity provider (a Supabase/GoTrue project).
#[derive(Clone, Debug)]
pub struct IdentityProviderConfig {
    pub url: String,
    pub service_key: String,
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub environment: Environment,
    pub jwt_secret: String,
    pub jwt_expiry: Duration,
    pub auth_issuer: String,
    /// Stored lowercase; the only address allowed to hold the admin role.
    pub admin_email: String,
    pub support_email: String,
    pub frontend_url: String,
    pub mail: Option<MailConfig>,
    pub identity_provider: Option<IdentityProviderConfig>,
    pub admin_bootstrap_password: Option<String>,
}

pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match optional("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid { name: "PORT", value: raw })?,
            None => 5000,
        };

        let environment = match optional("APP_ENV") {
            Some(raw) => Environment::parse(&raw).ok_or(ConfigError::Invalid { name: "APP_ENV", value: raw })?,
            None => Environment::Development,
        };

        let jwt_expiry = match optional("JWT_EXPIRE") {
            Some(raw) => parse_duration(&raw).ok_or(ConfigError::Invalid { name: "JWT_EXPIRE", value: raw })?,
            None => Duration::days(7),
        };

        let mail = optional("MAIL_SERVICE_URL").map(|url| MailConfig {
            url,
            token: optional("MAIL_SERVICE_TOKEN").unwrap_or_default(),
        });

        let identity_provider = match (optional("SUPABASE_URL"), optional("SUPABASE_SERVICE_ROLE_KEY")) {
            (Some(url), Some(service_key)) => Some(IdentityProviderConfig {
                url: url.trim_end_matches('/').to_string(),
                service_key,
            }),
            (Some(_), None) => return Err(ConfigError::Missing("SUPABASE_SERVICE_ROLE_KEY")),
            _ => None,
        };

        let config = Self {
            database_url: required("DATABASE_URL")?,
            port,
            environment,
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiry,
            auth_issuer: optional("AUTH_ISSUER").unwrap_or_else(|| "timecard-backend".to_string()),
            admin_email: normalize_email(&required("ADMIN_EMAIL")?),
            support_email: optional("SUPPORT_EMAIL").unwrap_or_else(|| "support@example.com".to_string()),
            frontend_url: optional("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:5173".to_string())
                .trim_end_matches('/')
                .to_string(),
            mail,
            identity_provider,
            admin_bootstrap_password: optional("ADMIN_BOOTSTRAP_PASSWORD"),
        };

        config.warn_on_weak_settings();
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        normalize_email(email) == self.admin_email
    }

    pub fn reset_link(&self, raw_token: &str) -> String {
        format!("{}/reset-password/{}", self.frontend_url, raw_token)
    }

    pub fn reset_redirect_url(&self) -> String {
        format!("{}/reset-password", self.frontend_url)
    }

    fn warn_on_weak_settings(&self) {
        if self.jwt_secret.len() < 32 {
            warn!("JWT_SECRET should be at least 32 characters long");
        }
        if self.is_production() {
            if self.frontend_url.contains("localhost") {
                warn!("FRONTEND_URL points at localhost in production");
            }
            if self.mail.is_none() && self.identity_provider.is_none() {
                warn!("No email transport configured in production; reset links will only be logged");
            }
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Parses `30s`, `15m`, `12h` or `7d`. A bare number is read as seconds.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let split = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let value: i64 = digits.parse().ok()?;
    if value <= 0 {
        return None;
    }

    let duration = match unit {
        "" | "s" => Duration::try_seconds(value),
        "m" => Duration::try_minutes(value),
        "h" => Duration::try_hours(value),
        "d" => Duration::try_days(value),
        _ => None,
    }?;

    // Token expiry is added to the current time, so that sum must be representable.
    Utc::now().checked_add_signed(duration)?;
    Some(duration)
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
