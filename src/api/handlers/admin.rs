use axum::{extract::{Path, Query, State}, http::StatusCode, response::IntoResponse, Json};
use crate::state::AppState;
use crate::error::AppError;
use crate::config::normalize_email;
use crate::api::extractors::{auth::AdminUser, json::ValidatedJson};
use crate::api::dtos::{
    requests::{CreateUserRequest, ListUsersQuery, SyncAuthRequest, UpdateStatusRequest, UpdateUserRequest},
    responses::{
        EmployerListResponse, EmployerSummary, ManagedUserResponse, MessageResponse, StatusResponse,
        StatusSummary, SyncAllResponse, SyncAuthResponse, SyncFailure, UserListResponse, UserResponse,
    },
};
use crate::domain::models::{auth::UserProfile, user::{Role, User}};
use crate::domain::services::passwords::generate_temp_password;
use std::collections::HashMap;
use std::sync::Arc;
use validator::Validate;
use tracing::{info, warn};

const SYNC_FAILED: &str = "Could not link this user to the identity provider";

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.role == Role::Admin {
        return Err(AppError::Validation("Role must be employer or employee".into()));
    }

    let email = normalize_email(&payload.email);
    if state.config.is_admin_email(&email) {
        return Err(AppError::Validation("This email is reserved for the admin account".into()));
    }
    if state.user_repo.find_by_email(&email).await?.is_some() {
        return Err(AppError::Validation("User with this email already exists".into()));
    }

    let employer_id = match payload.role {
        Role::Employee => {
            let employer_id = payload.employer_id.as_deref()
                .filter(|id| !id.is_empty())
                .ok_or_else(|| AppError::Validation("Employer ID is required for employee accounts".into()))?;
            Some(require_employer(&state, employer_id).await?)
        }
        _ => None,
    };

    let mut user = User::new(payload.name.trim().to_string(), email, String::new(), payload.role);
    user.designation = payload.designation.unwrap_or_default().trim().to_string();
    user.department = payload.department.unwrap_or_default().trim().to_string();
    user.employer_id = employer_id;

    let created = state.credential_store.create_user(user, &payload.password).await?;
    info!(admin_id = %admin.id, user_id = %created.id, "Admin created user");

    Ok((StatusCode::CREATED, Json(UserResponse { success: true, user: UserProfile::from(&created) })))
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (users, employers) = tokio::try_join!(
        state.user_repo.list(query.role),
        state.user_repo.list(Some(Role::Employer)),
    )?;

    let employers: HashMap<&str, EmployerSummary> = employers
        .iter()
        .map(|e| (e.id.as_str(), EmployerSummary::from(e)))
        .collect();

    let users: Vec<ManagedUserResponse> = users
        .iter()
        .map(|u| ManagedUserResponse {
            profile: UserProfile::from(u),
            auth_linked: u.is_linked_to_provider(),
            employer: u.employer_id.as_deref().and_then(|id| employers.get(id).cloned()),
        })
        .collect();

    Ok(Json(UserListResponse { success: true, count: users.len(), users }))
}

pub async fn list_employers(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let mut employers: Vec<EmployerSummary> = state.user_repo.list(Some(Role::Employer)).await?
        .iter()
        .filter(|e| e.is_active)
        .map(EmployerSummary::from)
        .collect();
    employers.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(Json(EmployerListResponse { success: true, employers }))
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let target = find_managed_user(&state, &id, "Cannot change admin account status").await?;

    state.user_repo.set_active(&target.id, payload.is_active).await?;
    info!(admin_id = %admin.id, user_id = %target.id, is_active = payload.is_active, "User status changed");

    let verb = if payload.is_active { "activated" } else { "deactivated" };
    Ok(Json(StatusResponse {
        success: true,
        message: format!("User {} successfully", verb),
        user: StatusSummary { id: target.id, is_active: payload.is_active },
    }))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut user = find_managed_user(&state, &id, "Cannot modify admin users").await?;

    if let Some(email) = payload.email.as_deref() {
        let email = normalize_email(email);
        if state.config.is_admin_email(&email) {
            return Err(AppError::Validation("This email is reserved for the admin account".into()));
        }
        if email != user.email {
            if state.user_repo.find_by_email(&email).await?.is_some() {
                return Err(AppError::Validation("User with this email already exists".into()));
            }
            user.email = email;
        }
    }

    if let Some(name) = payload.name.as_deref() {
        user.name = name.trim().to_string();
    }
    if let Some(designation) = payload.designation.as_deref() {
        user.designation = designation.trim().to_string();
    }
    if let Some(department) = payload.department.as_deref() {
        user.department = department.trim().to_string();
    }

    let requested_employer = payload.employer_id.as_deref().filter(|id| !id.is_empty());
    match payload.role {
        Some(Role::Admin) => return Err(AppError::Validation("Role must be employer or employee".into())),
        Some(Role::Employer) => {
            user.role = Role::Employer;
            user.employer_id = None;
        }
        Some(Role::Employee) => {
            user.role = Role::Employee;
            if let Some(employer_id) = requested_employer {
                user.employer_id = Some(require_employer(&state, employer_id).await?);
            }
        }
        None if payload.employer_id.is_some() => {
            user.employer_id = match requested_employer {
                Some(employer_id) => Some(require_employer(&state, employer_id).await?),
                None => None,
            };
        }
        None => {}
    }

    let updated = state.user_repo.update_profile(&user).await?;
    info!(admin_id = %admin.id, user_id = %updated.id, "User updated");

    Ok(Json(UserResponse { success: true, user: UserProfile::from(&updated) }))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let target = find_managed_user(&state, &id, "Cannot delete admin users").await?;

    state.user_repo.delete(&target.id).await?;

    if let Some(provider_id) = target.identity_provider_id.as_deref() {
        if state.identity_provider.is_enabled() {
            if let Err(e) = state.identity_provider.delete_user(provider_id).await {
                warn!(user_id = %target.id, "Failed to delete provider account (non-fatal): {}", e);
            }
        }
    }

    info!(admin_id = %admin.id, user_id = %target.id, "User deleted");
    Ok(Json(MessageResponse::ok("User deleted successfully")))
}

pub async fn sync_auth(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    body: Option<Json<SyncAuthRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let temporary_password = match body {
        Some(Json(payload)) => {
            payload.validate()?;
            payload.temporary_password
        }
        None => None,
    };

    let user = state.user_repo.find_by_id(&id).await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if user.is_linked_to_provider() {
        return Ok(Json(SyncAuthResponse {
            success: true,
            message: "User already synced to the identity provider".into(),
            synced: true,
            auth_user_id: None,
        }));
    }

    if !state.identity_provider.is_enabled() {
        return Err(AppError::Validation("Identity provider is not configured".into()));
    }

    let password = temporary_password.unwrap_or_else(generate_temp_password);
    let provider_id = state.credential_store.link_to_provider(&user, &password).await?;
    info!(admin_id = %admin.id, user_id = %user.id, "User synced to identity provider");

    Ok(Json(SyncAuthResponse {
        success: true,
        message: "User synced to the identity provider. They can now use \"Forgot Password\" to receive reset emails.".into(),
        synced: true,
        auth_user_id: Some(provider_id),
    }))
}

pub async fn sync_all_auth(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
) -> Result<impl IntoResponse, AppError> {
    if !state.identity_provider.is_enabled() {
        return Err(AppError::Validation("Identity provider is not configured".into()));
    }

    let users = state.user_repo.list_unlinked().await?;

    let mut synced = 0;
    let mut errors = Vec::new();
    for user in &users {
        match state.credential_store.link_to_provider(user, &generate_temp_password()).await {
            Ok(_) => synced += 1,
            Err(e) => {
                warn!(user_id = %user.id, "Bulk provider sync failed for user: {}", e);
                errors.push(SyncFailure { email: user.email.clone(), error: SYNC_FAILED.to_string() });
            }
        }
    }

    info!(admin_id = %admin.id, synced, failed = errors.len(), "Bulk provider sync finished");

    let message = if users.is_empty() {
        "All users are already synced to the identity provider".to_string()
    } else {
        "Sync complete. Users can now use \"Forgot Password\" to reset their passwords via email.".to_string()
    };

    Ok(Json(SyncAllResponse {
        success: true,
        message,
        synced,
        failed: errors.len(),
        errors,
    }))
}

/// Loads a non-admin user for modification; admin accounts are off limits here.
async fn find_managed_user(state: &AppState, id: &str, admin_message: &str) -> Result<User, AppError> {
    let user = state.user_repo.find_by_id(id).await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if user.is_admin() {
        return Err(AppError::Forbidden(admin_message.to_string()));
    }
    Ok(user)
}

async fn require_employer(state: &AppState, employer_id: &str) -> Result<String, AppError> {
    match state.user_repo.find_by_id(employer_id).await? {
        Some(employer) if employer.role == Role::Employer => Ok(employer.id),
        _ => Err(AppError::Validation("Invalid employer ID".into())),
    }
}
