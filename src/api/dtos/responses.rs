use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::models::{
    auth::UserProfile,
    password_change::{ChangeRequestStatus, PasswordChangeRequestView},
    user::{Role, User},
};

#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }
}

#[derive(Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: UserProfile,
}

#[derive(Serialize)]
pub struct VerifyResetTokenResponse {
    pub success: bool,
    pub message: String,
    pub email: String,
}

#[derive(Serialize)]
pub struct PartyResponse {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChangeRequestResponse {
    pub id: String,
    pub user_id: String,
    pub status: ChangeRequestStatus,
    pub requested_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub reason: Option<String>,
    pub user: PartyResponse,
    pub reviewer: Option<PartyResponse>,
}

impl From<PasswordChangeRequestView> for PasswordChangeRequestResponse {
    fn from(view: PasswordChangeRequestView) -> Self {
        let role = view.user_role();
        let reviewer = view.reviewed_by.as_ref().map(|_| PartyResponse {
            name: view.reviewer_name.clone(),
            email: view.reviewer_email.clone(),
            role: None,
        });

        Self {
            id: view.id,
            user_id: view.user_id,
            status: view.status,
            requested_at: view.requested_at,
            reviewed_at: view.reviewed_at,
            reviewed_by: view.reviewed_by,
            reason: view.reason,
            user: PartyResponse { name: view.user_name, email: view.user_email, role },
            reviewer,
        }
    }
}

#[derive(Serialize)]
pub struct ChangeRequestResponse {
    pub success: bool,
    pub message: String,
    pub request: PasswordChangeRequestResponse,
}

#[derive(Serialize)]
pub struct ChangeRequestListResponse {
    pub success: bool,
    pub count: usize,
    pub requests: Vec<PasswordChangeRequestResponse>,
}

impl ChangeRequestListResponse {
    pub fn new(views: Vec<PasswordChangeRequestView>) -> Self {
        let requests: Vec<_> = views.into_iter().map(Into::into).collect();
        Self { success: true, count: requests.len(), requests }
    }
}

#[derive(Serialize, Clone)]
pub struct EmployerSummary {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&User> for EmployerSummary {
    fn from(user: &User) -> Self {
        Self { id: user.id.clone(), name: user.name.clone(), email: user.email.clone() }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedUserResponse {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub auth_linked: bool,
    pub employer: Option<EmployerSummary>,
}

#[derive(Serialize)]
pub struct UserListResponse {
    pub success: bool,
    pub count: usize,
    pub users: Vec<ManagedUserResponse>,
}

#[derive(Serialize)]
pub struct EmployerListResponse {
    pub success: bool,
    pub employers: Vec<EmployerSummary>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncAuthResponse {
    pub success: bool,
    pub message: String,
    pub synced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_user_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub id: String,
    pub is_active: bool,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
    pub user: StatusSummary,
}

#[derive(Serialize)]
pub struct SyncFailure {
    pub email: String,
    pub error: String,
}

#[derive(Serialize)]
pub struct SyncAllResponse {
    pub success: bool,
    pub message: String,
    pub synced: usize,
    pub failed: usize,
    pub errors: Vec<SyncFailure>,
}
