use axum::{extract::{Path, State}, response::IntoResponse, Json};
use crate::state::AppState;
use crate::error::AppError;
use crate::api::extractors::{auth::AuthUser, json::ValidatedJson};
use crate::api::dtos::{
    requests::{ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, ResetPasswordRequest},
    responses::{MessageResponse, UserResponse, VerifyResetTokenResponse},
};
use crate::domain::models::auth::{AuthResponse, UserProfile};
use crate::domain::services::password_service::GENERIC_RESET_MESSAGE;
use std::sync::Arc;
use tracing::{info, warn};

pub async fn register() -> AppError {
    warn!("Rejected self-registration attempt");
    AppError::Forbidden(
        "Public registration is disabled. Please contact your administrator to create an account.".into(),
    )
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (token, user) = state.auth_service
        .login(&payload.email, &payload.password, payload.selected_role)
        .await?;

    Ok(Json(AuthResponse {
        success: true,
        token,
        user: UserProfile::from(&user),
    }))
}

pub async fn me(AuthUser(user): AuthUser) -> Result<impl IntoResponse, AppError> {
    Ok(Json(UserResponse { success: true, user: UserProfile::from(&user) }))
}

/// Tokens are stateless; the client discards its copy.
pub async fn logout(AuthUser(user): AuthUser) -> Result<impl IntoResponse, AppError> {
    info!(user_id = %user.id, "User logged out");
    Ok(Json(MessageResponse::ok("Logged out successfully")))
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ValidatedJson(payload): ValidatedJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.password_service
        .change_password(&user, &payload.current_password, &payload.new_password)
        .await?;

    Ok(Json(MessageResponse::ok("Password changed successfully")))
}

pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.password_service.forgot_password(&payload.email).await?;
    Ok(Json(MessageResponse::ok(GENERIC_RESET_MESSAGE)))
}

pub async fn verify_reset_token(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let email = state.password_service.verify_reset_token(&token).await?;

    Ok(Json(VerifyResetTokenResponse {
        success: true,
        message: "Token is valid".into(),
        email,
    }))
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.supabase_sync {
        let email = payload.email.as_deref()
            .ok_or_else(|| AppError::Validation("Email is required".into()))?;

        state.password_service
            .reset_with_provider_session(email, payload.supabase_access_token.as_deref(), &payload.password)
            .await?;

        return Ok(Json(MessageResponse::ok("Password synced successfully")));
    }

    let token = payload.token.as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Validation("Reset token is required".into()))?;

    state.password_service.reset_with_token(token, &payload.password).await?;

    Ok(Json(MessageResponse::ok(
        "Password has been reset successfully. You can now login with your new password.",
    )))
}
