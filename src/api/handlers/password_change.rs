use axum::{extract::{Path, Query, State}, http::StatusCode, response::IntoResponse, Json};
use crate::state::AppState;
use crate::error::AppError;
use crate::api::extractors::{auth::{AdminUser, AuthUser}, json::ValidatedJson};
use crate::api::dtos::{
    requests::{ChangePasswordRequest, ListRequestsQuery, RejectRequest},
    responses::{ChangeRequestListResponse, ChangeRequestResponse, MessageResponse},
};
use std::sync::Arc;

pub async fn submit_request(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ValidatedJson(payload): ValidatedJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let view = state.password_change_service
        .submit(&user, &payload.current_password, &payload.new_password)
        .await?;

    Ok((StatusCode::CREATED, Json(ChangeRequestResponse {
        success: true,
        message: "Password change request submitted. Awaiting admin approval.".into(),
        request: view.into(),
    })))
}

pub async fn list_requests(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<ListRequestsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let views = state.password_change_service.list(query.status).await?;
    Ok(Json(ChangeRequestListResponse::new(views)))
}

pub async fn my_requests(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let views = state.password_change_service.list_for_user(&user.id).await?;
    Ok(Json(ChangeRequestListResponse::new(views)))
}

pub async fn approve_request(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let view = state.password_change_service.approve(&admin, &id).await?;

    Ok(Json(ChangeRequestResponse {
        success: true,
        message: "Password change request approved".into(),
        request: view.into(),
    }))
}

pub async fn reject_request(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<RejectRequest>,
) -> Result<impl IntoResponse, AppError> {
    let view = state.password_change_service.reject(&admin, &id, &payload.reason).await?;

    Ok(Json(ChangeRequestResponse {
        success: true,
        message: "Password change request rejected".into(),
        request: view.into(),
    }))
}

pub async fn cancel_request(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.password_change_service.cancel(&user, &id).await?;
    Ok(Json(MessageResponse::ok("Password change request cancelled")))
}

/// Admins skip the approval queue.
pub async fn admin_direct_change(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ValidatedJson(payload): ValidatedJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.password_service
        .change_password(&admin, &payload.current_password, &payload.new_password)
        .await?;

    Ok(Json(MessageResponse::ok("Password changed successfully")))
}
