//! Identity gateway: signup, sessions, and the confirmation flow.

mod helpers;

use helpers::{test_app, test_app_with};
use reel_core::auth::{AuthError, IdentityMetadata};

fn metadata(username: &str) -> IdentityMetadata {
    IdentityMetadata {
        username: Some(username.to_string()),
        full_name: None,
    }
}

#[tokio::test]
async fn signup_withholds_the_session_until_confirmation() {
    let app = test_app().await;

    let outcome = app
        .auth
        .sign_up("kim@example.com", "correct horse", metadata("kim"))
        .await
        .unwrap();

    assert!(outcome.session.is_none());
    assert!(outcome.email_confirmed_at.is_none());

    let confirmed = app.auth.confirm_email(outcome.identity_id).await.unwrap();
    assert!(confirmed.email_confirmed_at.is_some());

    // Confirming again keeps the original timestamp
    let again = app.auth.confirm_email(outcome.identity_id).await.unwrap();
    assert_eq!(again.email_confirmed_at, confirmed.email_confirmed_at);
}

#[tokio::test]
async fn signup_without_confirmation_requirement_issues_a_session() {
    let app = test_app_with(false).await;

    let outcome = app
        .auth
        .sign_up("kim@example.com", "correct horse", metadata("kim"))
        .await
        .unwrap();

    assert!(outcome.email_confirmed_at.is_some());
    let session = outcome.session.expect("session should be issued");

    let identity = app.auth.current_identity(&session).await.unwrap().unwrap();
    assert_eq!(identity.id, outcome.identity_id);
    assert_eq!(identity.metadata.username.as_deref(), Some("kim"));
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = test_app().await;

    app.auth
        .sign_up("kim@example.com", "correct horse", metadata("kim"))
        .await
        .unwrap();

    let err = app
        .auth
        .sign_up("kim@example.com", "other password", metadata("kim2"))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::EmailTaken));
}

#[tokio::test]
async fn sign_in_rejects_bad_credentials() {
    let app = test_app_with(false).await;

    app.auth
        .sign_up("kim@example.com", "correct horse", metadata("kim"))
        .await
        .unwrap();

    let wrong_password = app.auth.sign_in("kim@example.com", "battery staple").await;
    assert!(matches!(wrong_password, Err(AuthError::InvalidCredentials)));

    let unknown_email = app.auth.sign_in("nobody@example.com", "whatever").await;
    assert!(matches!(unknown_email, Err(AuthError::InvalidCredentials)));
}

#[tokio::test]
async fn sign_out_kills_the_session_idempotently() {
    let app = test_app_with(false).await;

    let outcome = app
        .auth
        .sign_up("kim@example.com", "correct horse", metadata("kim"))
        .await
        .unwrap();
    let session = outcome.session.unwrap();

    app.auth.sign_out(&session).await.unwrap();
    assert!(app.auth.current_identity(&session).await.unwrap().is_none());

    // Second sign-out is a no-op
    app.auth.sign_out(&session).await.unwrap();
}
