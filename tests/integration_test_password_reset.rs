mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{TestApp, ADMIN_EMAIL};
use serde_json::json;
use timecard_backend::domain::{
    models::{password_reset::PasswordResetToken, user::Role},
    services::passwords::digest_token,
};

const GENERIC: &str = "If an account exists with this email, you will receive a password reset link.";

async fn forgot(app: &TestApp, email: &str) -> serde_json::Value {
    let (status, body) = app.request("POST", "/api/auth/forgot-password", None, Some(json!({ "email": email }))).await;
    assert_eq!(status, StatusCode::OK);
    body
}

#[tokio::test]
async fn test_forgot_password_response_is_identical_for_every_account_state() {
    let app = TestApp::new().await;
    app.seed_admin("adminpass").await;
    let inactive = app.seed_user("Idle", "idle@corp.test", "secret123", Role::Employee).await;
    app.state.user_repo.set_active(&inactive.id, false).await.unwrap();
    app.seed_user("Active", "active@corp.test", "secret123", Role::Employee).await;

    let unknown = forgot(&app, "ghost@corp.test").await;
    let admin = forgot(&app, ADMIN_EMAIL).await;
    let idle = forgot(&app, "idle@corp.test").await;
    let active = forgot(&app, "active@corp.test").await;

    for body in [&unknown, &admin, &idle, &active] {
        assert_eq!(body, &json!({ "success": true, "message": GENERIC }));
    }

    let recipients: Vec<String> = app.sent_emails().into_iter().map(|m| m.recipient).collect();
    assert_eq!(recipients, vec!["active@corp.test".to_string()]);
    assert_eq!(app.reset_token_count(&inactive.id).await, 0);
}

#[tokio::test]
async fn test_admin_forgot_password_creates_nothing() {
    let app = TestApp::new().await;
    let admin = app.seed_admin("adminpass").await;
    app.link_user(&admin.id).await;

    forgot(&app, ADMIN_EMAIL).await;

    assert_eq!(app.reset_token_count(&admin.id).await, 0);
    assert!(app.sent_emails().is_empty());
    assert!(app.provider.calls_starting_with("send_password_reset").is_empty());
}

#[tokio::test]
async fn test_reset_email_link_verifies_and_names_the_account() {
    let app = TestApp::new().await;
    app.seed_user("Erin", "erin@corp.test", "secret123", Role::Employee).await;

    forgot(&app, "Erin@Corp.test").await;

    let emails = app.sent_emails();
    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0].subject, "Reset your password");
    assert!(emails[0].html_body.contains("Hello Erin"));
    assert!(emails[0].html_body.contains("60 minutes"));

    let token = app.last_reset_token("erin@corp.test").expect("reset link in email");
    let (status, body) = app.request("GET", &format!("/api/auth/verify-reset-token/{}", token), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "erin@corp.test");
}

#[tokio::test]
async fn test_second_request_supersedes_first_token() {
    let app = TestApp::new().await;
    let user = app.seed_user("Erin", "erin@corp.test", "secret123", Role::Employee).await;

    forgot(&app, "erin@corp.test").await;
    let first = app.last_reset_token("erin@corp.test").unwrap();
    forgot(&app, "erin@corp.test").await;
    let second = app.last_reset_token("erin@corp.test").unwrap();

    assert_ne!(first, second);
    assert_eq!(app.reset_token_count(&user.id).await, 1);

    let (status, _) = app.request("GET", &format!("/api/auth/verify-reset-token/{}", first), None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.request("GET", &format!("/api/auth/verify-reset-token/{}", second), None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_reset_token_is_single_use() {
    let app = TestApp::new().await;
    let user = app.seed_user("Erin", "erin@corp.test", "secret123", Role::Employee).await;

    forgot(&app, "erin@corp.test").await;
    let token = app.last_reset_token("erin@corp.test").unwrap();

    let (status, _) = app.request("POST", "/api/auth/reset-password", None, Some(json!({
        "token": token,
        "password": "fresh-pass",
        "confirmPassword": "fresh-pass"
    }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.reset_token_count(&user.id).await, 0);

    app.login("erin@corp.test", "fresh-pass").await;

    let (status, body) = app.request("POST", "/api/auth/reset-password", None, Some(json!({
        "token": token,
        "password": "again-pass",
        "confirmPassword": "again-pass"
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid or expired reset token");

    let (status, _) = app.request("GET", &format!("/api/auth/verify-reset-token/{}", token), None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app = TestApp::new().await;
    let user = app.seed_user("Erin", "erin@corp.test", "secret123", Role::Employee).await;

    let raw = "a".repeat(64);
    let mut token = PasswordResetToken::new(user.id.clone(), digest_token(&raw), Duration::minutes(60));
    token.expires_at = Utc::now() - Duration::seconds(1);
    app.state.reset_repo.create(&token).await.unwrap();

    let (status, body) = app.request("GET", &format!("/api/auth/verify-reset-token/{}", raw), None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Reset token has expired. Please request a new one.");

    let (status, _) = app.request("POST", "/api/auth/reset-password", None, Some(json!({
        "token": raw,
        "password": "fresh-pass",
        "confirmPassword": "fresh-pass"
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    app.login("erin@corp.test", "secret123").await;
}

#[tokio::test]
async fn test_admin_reset_token_is_refused_and_burned() {
    let app = TestApp::new().await;
    let admin = app.seed_admin("adminpass").await;

    let raw = "b".repeat(64);
    let token = PasswordResetToken::new(admin.id.clone(), digest_token(&raw), Duration::minutes(60));
    app.state.reset_repo.create(&token).await.unwrap();

    let (status, _) = app.request("POST", "/api/auth/reset-password", None, Some(json!({
        "token": raw,
        "password": "hijacked1",
        "confirmPassword": "hijacked1"
    }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.request("GET", &format!("/api/auth/verify-reset-token/{}", raw), None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.login(ADMIN_EMAIL, "adminpass").await;
}

#[tokio::test]
async fn test_reset_requires_matching_confirmation() {
    let app = TestApp::new().await;
    app.seed_user("Erin", "erin@corp.test", "secret123", Role::Employee).await;
    forgot(&app, "erin@corp.test").await;
    let token = app.last_reset_token("erin@corp.test").unwrap();

    let (status, body) = app.request("POST", "/api/auth/reset-password", None, Some(json!({
        "token": token,
        "password": "fresh-pass",
        "confirmPassword": "other-pass"
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "confirm_password");

    let (status, _) = app.request("POST", "/api/auth/reset-password", None, Some(json!({
        "password": "fresh-pass",
        "confirmPassword": "fresh-pass"
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_linked_user_reset_is_delegated_to_provider() {
    let app = TestApp::new().await;
    let user = app.seed_user("Lena", "lena@corp.test", "secret123", Role::Employer).await;
    app.link_user(&user.id).await;

    forgot(&app, "lena@corp.test").await;

    assert_eq!(app.provider.calls_starting_with("send_password_reset"), vec!["send_password_reset:lena@corp.test".to_string()]);
    assert_eq!(app.reset_token_count(&user.id).await, 0);
    assert!(app.sent_emails().is_empty());
}

#[tokio::test]
async fn test_provider_reset_failure_falls_back_to_local_token() {
    let app = TestApp::new().await;
    let user = app.seed_user("Lena", "lena@corp.test", "secret123", Role::Employer).await;
    app.link_user(&user.id).await;
    app.provider.set_failing(true);

    let body = forgot(&app, "lena@corp.test").await;

    assert_eq!(body["message"], GENERIC);
    assert_eq!(app.reset_token_count(&user.id).await, 1);
    assert!(app.last_reset_token("lena@corp.test").is_some());
}

#[tokio::test]
async fn test_provider_sync_requires_matching_recovery_session() {
    let app = TestApp::new().await;
    app.seed_user("Lena", "lena@corp.test", "secret123", Role::Employer).await;
    app.provider.add_session("lena-session", "lena@corp.test");
    app.provider.add_session("mallory-session", "mallory@corp.test");

    let sync = |token: Option<&'static str>| json!({
        "email": "lena@corp.test",
        "password": "synced-pass",
        "confirmPassword": "synced-pass",
        "supabaseSync": true,
        "supabaseAccessToken": token
    });

    let (status, _) = app.request("POST", "/api/auth/reset-password", None, Some(sync(None))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.request("POST", "/api/auth/reset-password", None, Some(sync(Some("forged")))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.request("POST", "/api/auth/reset-password", None, Some(sync(Some("mallory-session")))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.login("lena@corp.test", "secret123").await;

    let (status, _) = app.request("POST", "/api/auth/reset-password", None, Some(sync(Some("lena-session")))).await;
    assert_eq!(status, StatusCode::OK);

    app.login("lena@corp.test", "synced-pass").await;
}

#[tokio::test]
async fn test_provider_sync_refuses_admin_and_unknown_accounts() {
    let app = TestApp::new().await;
    app.seed_admin("adminpass").await;
    app.provider.add_session("admin-session", ADMIN_EMAIL);
    app.provider.add_session("ghost-session", "ghost@corp.test");

    let (status, _) = app.request("POST", "/api/auth/reset-password", None, Some(json!({
        "email": ADMIN_EMAIL,
        "password": "takeover1",
        "confirmPassword": "takeover1",
        "supabaseSync": true,
        "supabaseAccessToken": "admin-session"
    }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.request("POST", "/api/auth/reset-password", None, Some(json!({
        "email": "ghost@corp.test",
        "password": "whatever1",
        "confirmPassword": "whatever1",
        "supabaseSync": true,
        "supabaseAccessToken": "ghost-session"
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User not found");

    app.login(ADMIN_EMAIL, "adminpass").await;
}

#[tokio::test]
async fn test_reset_token_claim_succeeds_once() {
    let app = TestApp::new().await;
    let user = app.seed_user("Erin", "erin@corp.test", "secret123", Role::Employee).await;

    let token = PasswordResetToken::new(user.id.clone(), digest_token(&"c".repeat(64)), Duration::minutes(60));
    app.state.reset_repo.create(&token).await.unwrap();

    assert!(app.state.reset_repo.mark_used(&token.id).await.unwrap());
    assert!(!app.state.reset_repo.mark_used(&token.id).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_resets_with_one_token_apply_once() {
    for _ in 0..5 {
        let app = TestApp::new().await;
        app.seed_user("Erin", "erin@corp.test", "secret123", Role::Employee).await;
        forgot(&app, "erin@corp.test").await;
        let token = app.last_reset_token("erin@corp.test").unwrap();

        let reset = |password: &'static str| {
            app.request("POST", "/api/auth/reset-password", None, Some(json!({
                "token": token,
                "password": password,
                "confirmPassword": password
            })))
        };
        let ((first, _), (second, _)) = tokio::join!(reset("first-pass"), reset("second-pass"));

        let winners = [first, second].iter().filter(|s| **s == StatusCode::OK).count();
        assert_eq!(winners, 1, "statuses were {} and {}", first, second);
        assert!([first, second].contains(&StatusCode::BAD_REQUEST));

        let winner = if first == StatusCode::OK { "first-pass" } else { "second-pass" };
        app.login("erin@corp.test", winner).await;
    }
}
