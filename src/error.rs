use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::error;

use crate::config::ConfigError;
use crate::domain::models::user::Role;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Session invalid")]
    SessionInvalid,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Invalid input")]
    InvalidFields(Vec<FieldError>),
    #[error(transparent)]
    Login(#[from] LoginError),
    #[error("Identity provider error: {0}")]
    IdentityProvider(String),
    #[error("Internal server error")]
    Internal,
    #[error("Internal server error: {0}")]
    InternalWithMsg(String),
}

/// Login outcomes the client is allowed to tell apart.
///
/// `AccountNotFound` and `InvalidPassword` are deliberately distinct so users get
/// actionable feedback at login; the forgot-password flow does not make this distinction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    #[error("No account found with this email address. Please check your email or contact your administrator.")]
    AccountNotFound,
    #[error("Invalid password. Please try again or reset your password.")]
    InvalidPassword,
    #[error("Your account has been deactivated. Please contact your administrator to reactivate your account.")]
    AccountDeactivated { support_email: String },
    #[error("Admin access is restricted. You do not have permission to log in as administrator.")]
    AdminAccessRestricted,
    #[error("You cannot login as {selected}. Your account role is {actual}.")]
    RoleMismatch { selected: Role, actual: Role },
}

impl LoginError {
    pub fn status(&self) -> StatusCode {
        match self {
            LoginError::AccountNotFound => StatusCode::NOT_FOUND,
            LoginError::InvalidPassword => StatusCode::UNAUTHORIZED,
            LoginError::AccountDeactivated { .. }
            | LoginError::AdminAccessRestricted
            | LoginError::RoleMismatch { .. } => StatusCode::FORBIDDEN,
        }
    }

    pub fn code(&self) -> Option<&'static str> {
        match self {
            LoginError::AccountNotFound => Some("ACCOUNT_NOT_FOUND"),
            LoginError::InvalidPassword => Some("INVALID_PASSWORD"),
            LoginError::AccountDeactivated { .. } => Some("ACCOUNT_DEACTIVATED"),
            LoginError::AdminAccessRestricted => Some("ADMIN_ACCESS_RESTRICTED"),
            LoginError::RoleMismatch { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| FieldError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field)),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::InvalidFields(fields)
    }
}

pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db_err| db_err.is_unique_violation())
        .unwrap_or(false)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut body = Map::new();
        body.insert("success".into(), Value::Bool(false));

        let status = match &self {
            AppError::Database(e) => {
                if is_unique_violation(e) {
                    body.insert("message".into(), json!("Resource already exists (duplicate entry)"));
                    StatusCode::CONFLICT
                } else {
                    error!("Database error: {:?}", e);
                    body.insert("message".into(), json!("Server error"));
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
            AppError::NotFound(msg) => {
                body.insert("message".into(), json!(msg));
                StatusCode::NOT_FOUND
            }
            AppError::Unauthorized(msg) => {
                body.insert("message".into(), json!(msg));
                StatusCode::UNAUTHORIZED
            }
            AppError::SessionInvalid => {
                body.insert("message".into(), json!("Your session is invalid. Please log in again."));
                body.insert("errorCode".into(), json!("SESSION_INVALID"));
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden(msg) => {
                body.insert("message".into(), json!(msg));
                StatusCode::FORBIDDEN
            }
            AppError::Conflict(msg) | AppError::Validation(msg) => {
                body.insert("message".into(), json!(msg));
                StatusCode::BAD_REQUEST
            }
            AppError::InvalidFields(fields) => {
                body.insert("message".into(), json!("Validation failed"));
                body.insert("errors".into(), json!(fields));
                StatusCode::BAD_REQUEST
            }
            AppError::Login(login) => {
                body.insert("message".into(), json!(login.to_string()));
                if let Some(code) = login.code() {
                    body.insert("errorCode".into(), json!(code));
                }
                if let LoginError::AccountDeactivated { support_email } = login {
                    body.insert("supportEmail".into(), json!(support_email));
                }
                login.status()
            }
            AppError::IdentityProvider(msg) => {
                error!("Identity provider error: {}", msg);
                body.insert("message".into(), json!("Server error"));
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Internal => {
                body.insert("message".into(), json!("Server error"));
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::InternalWithMsg(msg) => {
                error!("Internal error: {}", msg);
                body.insert("message".into(), json!("Server error"));
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(Value::Object(body))).into_response()
    }
}

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Database connection failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),
    #[error("Invalid signing key: {0}")]
    SigningKey(String),
    #[error("Admin bootstrap failed: {0}")]
    Bootstrap(#[from] AppError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
