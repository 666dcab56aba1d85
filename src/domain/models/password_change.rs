use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use super::user::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeRequestStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Error, Debug)]
#[error("Unknown request status: {0}")]
pub struct StatusParseError(pub String);

impl ChangeRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeRequestStatus::Pending => "Pending",
            ChangeRequestStatus::Approved => "Approved",
            ChangeRequestStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for ChangeRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeRequestStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(ChangeRequestStatus::Pending),
            "Approved" => Ok(ChangeRequestStatus::Approved),
            "Rejected" => Ok(ChangeRequestStatus::Rejected),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

impl TryFrom<String> for ChangeRequestStatus {
    type Error = StatusParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A password change held back until an admin approves it.
#[derive(Debug, Clone, FromRow)]
pub struct PasswordChangeRequest {
    pub id: String,
    pub user_id: String,
    pub new_password_hash: String,
    #[sqlx(try_from = "String")]
    pub status: ChangeRequestStatus,
    pub requested_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub reason: Option<String>,
}

impl PasswordChangeRequest {
    pub fn new(user_id: String, new_password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            new_password_hash,
            status: ChangeRequestStatus::Pending,
            requested_at: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
            reason: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ChangeRequestStatus::Pending
    }
}

/// Request row joined with requester and reviewer identity, for listings.
#[derive(Debug, Clone, FromRow)]
pub struct PasswordChangeRequestView {
    pub id: String,
    pub user_id: String,
    #[sqlx(try_from = "String")]
    pub status: ChangeRequestStatus,
    pub requested_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub reason: Option<String>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub user_role: Option<String>,
    pub reviewer_name: Option<String>,
    pub reviewer_email: Option<String>,
}

impl PasswordChangeRequestView {
    pub fn user_role(&self) -> Option<Role> {
        self.user_role.as_deref().and_then(|r| r.parse().ok())
    }
}
