use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Local one-time reset credential. Only the SHA-256 digest of the emailed token is stored.
#[derive(Debug, Clone, FromRow)]
pub struct PasswordResetToken {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetTokenRejection {
    Used,
    Expired,
}

impl ResetTokenRejection {
    pub fn message(&self) -> &'static str {
        match self {
            ResetTokenRejection::Used => "Invalid or expired reset token",
            ResetTokenRejection::Expired => "Reset token has expired. Please request a new one.",
        }
    }
}

impl PasswordResetToken {
    pub fn new(user_id: String, token_hash: String, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            token_hash,
            expires_at: now + ttl,
            used: false,
            created_at: now,
        }
    }

    /// A token is usable strictly before its expiry instant.
    pub fn check(&self, now: DateTime<Utc>) -> Result<(), ResetTokenRejection> {
        if self.used {
            return Err(ResetTokenRejection::Used);
        }
        if now >= self.expires_at {
            return Err(ResetTokenRejection::Expired);
        }
        Ok(())
    }
}
