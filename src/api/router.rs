use axum::{
    body::Body,
    extract::Request,
    routing::{delete, get, patch, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{admin, auth, health, password_change};
use tower_http::{
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

pub fn create_router(state: Arc<AppState>) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout))
        .route("/change-password", post(auth::change_password))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/verify-reset-token/{token}", get(auth::verify_reset_token))
        .route("/reset-password", post(auth::reset_password));

    let password_change_routes = Router::new()
        .route("/request", post(password_change::submit_request))
        .route("/requests", get(password_change::list_requests))
        .route("/my-requests", get(password_change::my_requests))
        .route("/approve/{id}", put(password_change::approve_request).post(password_change::approve_request))
        .route("/reject/{id}", put(password_change::reject_request).post(password_change::reject_request))
        .route("/cancel/{id}", delete(password_change::cancel_request).post(password_change::cancel_request))
        .route("/admin-direct", post(password_change::admin_direct_change));

    let admin_routes = Router::new()
        .route("/users/create", post(admin::create_user))
        .route("/users", get(admin::list_users))
        .route("/employers", get(admin::list_employers))
        .route("/users/sync-all-auth", post(admin::sync_all_auth))
        .route("/users/{id}/status", patch(admin::update_status))
        .route("/users/{id}/sync-auth", post(admin::sync_auth))
        .route("/users/{id}", put(admin::update_user).delete(admin::delete_user));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api/password-change", password_change_routes)
        .nest("/api/admin", admin_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                        user_id = tracing::field::Empty,
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .with_state(state)
}
