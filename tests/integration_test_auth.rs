mod common;

use axum::http::StatusCode;
use common::{TestApp, ADMIN_EMAIL};
use serde_json::json;
use timecard_backend::domain::models::user::Role;

#[tokio::test]
async fn test_login_token_resolves_to_same_user() {
    let app = TestApp::new().await;
    let user = app.seed_user("Erin Employee", "erin@corp.test", "secret123", Role::Employee).await;

    let (status, body) = app.request("POST", "/api/auth/login", None, Some(json!({
        "email": "erin@corp.test",
        "password": "secret123"
    }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["id"], user.id.as_str());
    assert_eq!(body["user"]["mustResetPassword"], false);
    assert!(body["user"].get("passwordHash").is_none());

    let token = body["token"].as_str().unwrap();
    let (status, me) = app.request("GET", "/api/auth/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user"]["id"], user.id.as_str());
    assert_eq!(me["user"]["role"], "employee");
}

#[tokio::test]
async fn test_login_email_is_case_insensitive() {
    let app = TestApp::new().await;
    app.seed_user("Erin", "erin@corp.test", "secret123", Role::Employee).await;

    let token = app.login("ERIN@Corp.Test", "secret123").await;
    assert!(!token.is_empty());
}

#[tokio::test]
async fn test_login_distinguishes_unknown_account_from_wrong_password() {
    let app = TestApp::new().await;
    app.seed_user("Erin", "erin@corp.test", "secret123", Role::Employee).await;

    let (status, body) = app.request("POST", "/api/auth/login", None, Some(json!({
        "email": "nobody@corp.test",
        "password": "secret123"
    }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errorCode"], "ACCOUNT_NOT_FOUND");

    let (status, body) = app.request("POST", "/api/auth/login", None, Some(json!({
        "email": "erin@corp.test",
        "password": "wrong-password"
    }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errorCode"], "INVALID_PASSWORD");
}

#[tokio::test]
async fn test_deactivated_account_cannot_login() {
    let app = TestApp::new().await;
    let user = app.seed_user("Dora", "dora@corp.test", "secret123", Role::Employer).await;
    app.state.user_repo.set_active(&user.id, false).await.unwrap();

    let (status, body) = app.request("POST", "/api/auth/login", None, Some(json!({
        "email": "dora@corp.test",
        "password": "secret123"
    }))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errorCode"], "ACCOUNT_DEACTIVATED");
    assert_eq!(body["supportEmail"], "support@timecard.test");
}

#[tokio::test]
async fn test_admin_role_requires_designated_email() {
    let app = TestApp::new().await;
    app.seed_user("Rogue", "rogue@corp.test", "secret123", Role::Admin).await;
    app.seed_admin("adminpass").await;

    let (status, body) = app.request("POST", "/api/auth/login", None, Some(json!({
        "email": "rogue@corp.test",
        "password": "secret123"
    }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errorCode"], "ADMIN_ACCESS_RESTRICTED");

    let token = app.login(ADMIN_EMAIL, "adminpass").await;
    assert!(!token.is_empty());
}

#[tokio::test]
async fn test_selected_role_mismatch_names_both_roles() {
    let app = TestApp::new().await;
    app.seed_user("Erin", "erin@corp.test", "secret123", Role::Employee).await;

    let (status, body) = app.request("POST", "/api/auth/login", None, Some(json!({
        "email": "erin@corp.test",
        "password": "secret123",
        "selectedRole": "employer"
    }))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You cannot login as employer. Your account role is employee.");

    let (status, _) = app.request("POST", "/api/auth/login", None, Some(json!({
        "email": "erin@corp.test",
        "password": "secret123",
        "selectedRole": "employee"
    }))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_rejects_malformed_body() {
    let app = TestApp::new().await;

    let (status, body) = app.request("POST", "/api/auth/login", None, Some(json!({
        "email": "not-an-email",
        "password": ""
    }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = body["errors"].as_array().unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["email", "password"]);
}

#[tokio::test]
async fn test_missing_or_garbage_token_is_unauthorized() {
    let app = TestApp::new().await;

    let (status, _) = app.request("GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.request("GET", "/api/auth/me", Some("not.a.jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.get("errorCode").is_none());
}

#[tokio::test]
async fn test_deleted_subject_yields_session_invalid() {
    let app = TestApp::new().await;
    let user = app.seed_user("Gone", "gone@corp.test", "secret123", Role::Employee).await;
    let token = app.login("gone@corp.test", "secret123").await;

    app.state.user_repo.delete(&user.id).await.unwrap();

    let (status, body) = app.request("GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errorCode"], "SESSION_INVALID");
}

#[tokio::test]
async fn test_deactivation_revokes_live_session() {
    let app = TestApp::new().await;
    let user = app.seed_user("Paused", "paused@corp.test", "secret123", Role::Employee).await;
    let token = app.login("paused@corp.test", "secret123").await;

    app.state.user_repo.set_active(&user.id, false).await.unwrap();

    let (status, body) = app.request("GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errorCode"], "SESSION_INVALID");
}

#[tokio::test]
async fn test_session_guard_uses_live_role() {
    let app = TestApp::new().await;
    let employer = app.seed_user("Boss", "boss@corp.test", "secret123", Role::Employer).await;
    let token = app.login("boss@corp.test", "secret123").await;

    let mut demoted = employer.clone();
    demoted.role = Role::Employee;
    app.state.user_repo.update_profile(&demoted).await.unwrap();

    let (status, me) = app.request("GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user"]["role"], "employee");
}

#[tokio::test]
async fn test_register_is_disabled() {
    let app = TestApp::new().await;

    let (status, body) = app.request("POST", "/api/auth/register", None, Some(json!({
        "email": "new@corp.test",
        "password": "secret123"
    }))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_change_password_clears_must_reset() {
    let app = TestApp::new().await;
    let user = app.seed_user("Newbie", "newbie@corp.test", "initial1", Role::Employee).await;
    sqlx::query("UPDATE users SET must_reset_password = 1 WHERE id = ?")
        .bind(&user.id)
        .execute(&app.pool)
        .await
        .unwrap();

    let (_, body) = app.request("POST", "/api/auth/login", None, Some(json!({
        "email": "newbie@corp.test",
        "password": "initial1"
    }))).await;
    assert_eq!(body["user"]["mustResetPassword"], true);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, _) = app.request("POST", "/api/auth/change-password", Some(&token), Some(json!({
        "currentPassword": "initial1",
        "newPassword": "brandnew1"
    }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.request("POST", "/api/auth/login", None, Some(json!({
        "email": "newbie@corp.test",
        "password": "brandnew1"
    }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["mustResetPassword"], false);

    let (status, _) = app.request("POST", "/api/auth/login", None, Some(json!({
        "email": "newbie@corp.test",
        "password": "initial1"
    }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_password_rejects_bad_input() {
    let app = TestApp::new().await;
    app.seed_user("Erin", "erin@corp.test", "secret123", Role::Employee).await;
    let token = app.login("erin@corp.test", "secret123").await;

    let (status, body) = app.request("POST", "/api/auth/change-password", Some(&token), Some(json!({
        "currentPassword": "secret123",
        "newPassword": "secret123"
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "New password must be different from current password");

    let (status, body) = app.request("POST", "/api/auth/change-password", Some(&token), Some(json!({
        "currentPassword": "wrong-one",
        "newPassword": "another1"
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Current password is incorrect");

    let (status, body) = app.request("POST", "/api/auth/change-password", Some(&token), Some(json!({
        "currentPassword": "secret123",
        "newPassword": "abc"
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "new_password");
}

#[tokio::test]
async fn test_change_password_mirrors_linked_user_and_tolerates_provider_failure() {
    let app = TestApp::new().await;
    let user = app.seed_user("Linked", "linked@corp.test", "secret123", Role::Employee).await;
    let provider_id = app.link_user(&user.id).await;
    let token = app.login("linked@corp.test", "secret123").await;

    let (status, _) = app.request("POST", "/api/auth/change-password", Some(&token), Some(json!({
        "currentPassword": "secret123",
        "newPassword": "mirrored1"
    }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.provider.calls_starting_with("update_password:"), vec![format!("update_password:{}", provider_id)]);

    app.provider.set_failing(true);
    let (status, _) = app.request("POST", "/api/auth/change-password", Some(&token), Some(json!({
        "currentPassword": "mirrored1",
        "newPassword": "localonly1"
    }))).await;
    assert_eq!(status, StatusCode::OK);

    app.login("linked@corp.test", "localonly1").await;
}

#[tokio::test]
async fn test_logout_requires_session() {
    let app = TestApp::new().await;
    app.seed_user("Erin", "erin@corp.test", "secret123", Role::Employee).await;
    let token = app.login("erin@corp.test", "secret123").await;

    let (status, _) = app.request("POST", "/api/auth/logout", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.request("POST", "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;
    let (status, body) = app.request("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
}
