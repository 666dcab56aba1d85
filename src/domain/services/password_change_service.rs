use std::sync::Arc;
use chrono::Utc;
use tracing::{info, warn};

use crate::domain::{
    models::{
        password_change::{ChangeRequestStatus, PasswordChangeRequest, PasswordChangeRequestView},
        user::{Role, User},
    },
    ports::PasswordChangeRepository,
    services::{
        credential_store::CredentialStore,
        passwords::{hash_password, verify_password},
    },
};
use crate::error::{is_unique_violation, AppError};

const ALREADY_PENDING: &str = "You already have a pending password change request";
const ALREADY_PROCESSED: &str = "This request has already been processed";

/// Admin-approved password changes. A user holds at most one `Pending` request;
/// approval, rejection and cancellation are only valid from `Pending`.
pub struct PasswordChangeService {
    requests: Arc<dyn PasswordChangeRepository>,
    credentials: Arc<CredentialStore>,
}

impl PasswordChangeService {
    pub fn new(requests: Arc<dyn PasswordChangeRepository>, credentials: Arc<CredentialStore>) -> Self {
        Self { requests, credentials }
    }

    pub async fn submit(&self, user: &User, current_password: &str, new_password: &str) -> Result<PasswordChangeRequestView, AppError> {
        if user.is_admin() {
            return Err(AppError::Forbidden("Admins change their password directly".into()));
        }

        if current_password == new_password {
            return Err(AppError::Validation("New password must be different from current password".into()));
        }

        if !verify_password(current_password, &user.password_hash)? {
            return Err(AppError::Validation("Current password is incorrect".into()));
        }

        if self.requests.find_pending_for_user(&user.id).await?.is_some() {
            return Err(AppError::Conflict(ALREADY_PENDING.into()));
        }

        let request = PasswordChangeRequest::new(user.id.clone(), hash_password(new_password)?);

        // The partial unique index catches a concurrent submission that slipped past the pre-check.
        let created = match self.requests.create(&request).await {
            Ok(created) => created,
            Err(AppError::Database(e)) if is_unique_violation(&e) => {
                warn!(user_id = %user.id, "Concurrent password change request rejected by index");
                return Err(AppError::Conflict(ALREADY_PENDING.into()));
            }
            Err(e) => return Err(e),
        };

        info!(user_id = %user.id, request_id = %created.id, "Password change requested");
        self.view(&created.id).await
    }

    pub async fn list(&self, status: Option<ChangeRequestStatus>) -> Result<Vec<PasswordChangeRequestView>, AppError> {
        self.requests.list(status).await
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<PasswordChangeRequestView>, AppError> {
        self.requests.list_for_user(user_id).await
    }

    pub async fn approve(&self, reviewer: &User, request_id: &str) -> Result<PasswordChangeRequestView, AppError> {
        reviewer.authorize(&[Role::Admin])?;
        let request = self.pending(request_id).await?;

        // The status flip is the claim; only the winner applies the hash.
        let claimed = self.requests
            .review(&request.id, ChangeRequestStatus::Approved, &reviewer.id, None, Utc::now())
            .await?;
        if !claimed {
            return Err(AppError::Conflict(ALREADY_PROCESSED.into()));
        }

        self.credentials
            .apply_password_hash(&request.user_id, &request.new_password_hash, true)
            .await?;

        info!(request_id = %request.id, user_id = %request.user_id, reviewer = %reviewer.id, "Password change approved");
        self.view(&request.id).await
    }

    pub async fn reject(&self, reviewer: &User, request_id: &str, reason: &str) -> Result<PasswordChangeRequestView, AppError> {
        reviewer.authorize(&[Role::Admin])?;

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation("Rejection reason is required".into()));
        }

        let request = self.pending(request_id).await?;
        let claimed = self.requests
            .review(&request.id, ChangeRequestStatus::Rejected, &reviewer.id, Some(reason), Utc::now())
            .await?;
        if !claimed {
            return Err(AppError::Conflict(ALREADY_PROCESSED.into()));
        }

        info!(request_id = %request.id, user_id = %request.user_id, reviewer = %reviewer.id, "Password change rejected");
        self.view(&request.id).await
    }

    pub async fn cancel(&self, owner: &User, request_id: &str) -> Result<(), AppError> {
        let request = self.requests.find_by_id(request_id).await?
            .ok_or_else(|| AppError::NotFound("Password change request not found".into()))?;

        if request.user_id != owner.id {
            return Err(AppError::Forbidden("You can only cancel your own requests".into()));
        }

        if !request.is_pending() {
            return Err(AppError::Conflict("Can only cancel pending requests".into()));
        }

        self.requests.delete(&request.id).await?;
        info!(request_id = %request.id, user_id = %owner.id, "Password change request cancelled");
        Ok(())
    }

    async fn pending(&self, request_id: &str) -> Result<PasswordChangeRequest, AppError> {
        let request = self.requests.find_by_id(request_id).await?
            .ok_or_else(|| AppError::NotFound("Password change request not found".into()))?;

        if !request.is_pending() {
            return Err(AppError::Conflict(ALREADY_PROCESSED.into()));
        }
        Ok(request)
    }

    async fn view(&self, request_id: &str) -> Result<PasswordChangeRequestView, AppError> {
        self.requests.find_view(request_id).await?
            .ok_or_else(|| AppError::NotFound("Password change request not found".into()))
    }
}
