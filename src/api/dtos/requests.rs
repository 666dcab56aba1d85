use crate::domain::models::{password_change::ChangeRequestStatus, user::Role};
use serde::Deserialize;
use validator::Validate;

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    pub selected_role: Option<Role>,
}

/// Body of both the immediate change and the change-request endpoints.
#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 6, message = "New password must be at least 6 characters"))]
    pub new_password: String,
}

#[derive(Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
}

/// Either `token` (local reset link) or `email` + `supabaseSync` + `supabaseAccessToken`
/// (provider recovery session).
#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
    #[serde(default)]
    pub supabase_sync: bool,
    pub supabase_access_token: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct RejectRequest {
    #[validate(length(min = 1, message = "Rejection reason is required"))]
    pub reason: String,
}

#[derive(Deserialize)]
pub struct ListRequestsQuery {
    pub status: Option<ChangeRequestStatus>,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub role: Role,
    pub designation: Option<String>,
    pub department: Option<String>,
    pub employer_id: Option<String>,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
    pub designation: Option<String>,
    pub department: Option<String>,
    pub role: Option<Role>,
    pub employer_id: Option<String>,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub is_active: bool,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SyncAuthRequest {
    #[validate(length(min = 6, message = "Temporary password must be at least 6 characters"))]
    pub temporary_password: Option<String>,
}

#[derive(Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<Role>,
}
