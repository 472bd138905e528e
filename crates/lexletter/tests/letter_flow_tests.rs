// Letter creation gates and the simulated generation lifecycle.
//
// Lifecycle tests run under a paused tokio clock, so the 8-second generation
// delay elapses in virtual time.

use std::time::Duration;

use lexletter::{LetterRequest, LexLetter, Options};
use lexletter_core::error::ErrorCode;
use lexletter_core::logger::LoggerConfig;
use lexletter_core::models::{Letter, LetterStatus, Plan, Role, User};

fn test_app() -> LexLetter {
    LexLetter::in_memory(Options {
        auth_latency: Duration::ZERO,
        logger: LoggerConfig {
            disabled: true,
            ..Default::default()
        },
        ..Default::default()
    })
}

fn request_for(user: &User) -> LetterRequest {
    LetterRequest {
        user_id: user.id.clone(),
        sender_name: "John Doe".into(),
        sender_address: "123 Main St, Anytown, ST 12345".into(),
        recipient_name: "ABC Corporation".into(),
        recipient_address: "456 Business Ave, Corporate City".into(),
        matter: "Breach of Contract".into(),
        resolution: "Seeking immediate resolution and compensation for damages.".into(),
    }
}

async fn subscribed_user(app: &LexLetter, plan: Plan) -> User {
    let user = app
        .identity
        .sign_up("john@example.com", "Str0ngPass", "John Doe", Role::User, None)
        .await
        .unwrap();
    app.subscriptions
        .create_subscription(&user.id, plan, None)
        .await
        .unwrap();
    user
}

/// Advance virtual time until the letter leaves its in-flight states, or give
/// up after `max_secs`.
async fn wait_for_settled(app: &LexLetter, user_id: &str, max_secs: u64) -> Letter {
    for _ in 0..max_secs {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let letters = app.letters.letters_for_user(user_id).await.unwrap();
        if let Some(letter) = letters.first() {
            if matches!(letter.status, LetterStatus::Completed | LetterStatus::Failed) {
                return letter.clone();
            }
        }
    }
    panic!("letter did not settle within {max_secs} virtual seconds");
}

#[tokio::test(start_paused = true)]
async fn test_letter_lifecycle_pending_to_completed() {
    let app = test_app();
    let user = subscribed_user(&app, Plan::Annual4).await;

    let created = app.letters.create_letter(request_for(&user)).await.unwrap();
    assert_eq!(created.status, LetterStatus::Pending);
    assert_eq!(created.version, 1);
    assert!(created.content.is_empty());
    assert!(created.completed_at.is_none());

    // Immediately after creation the letter is listed but not yet completed.
    let listed = app.letters.letters_for_user(&user.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.id);
    assert_ne!(listed[0].status, LetterStatus::Completed);
    assert!(listed[0].content.is_empty());

    // After the simulated processing delay the same record has completed.
    let done = wait_for_settled(&app, &user.id, 20).await;
    assert_eq!(done.id, created.id);
    assert_eq!(done.status, LetterStatus::Completed);
    assert!(!done.content.is_empty());
    assert!(done.version > created.version);
    assert!(done.completed_at.is_some());

    // Generated content is assembled from the request fields.
    assert!(done.content.contains("Re: Breach of Contract"));
    assert!(done.content.contains("Dear ABC,"));
    assert!(done.content.contains("Sincerely,\n\nJohn Doe"));
    assert!(done.content.contains("thirty (30) days"));

    // Completion metadata.
    assert!(done.metadata.word_count > 0);
    assert!((0.85..0.95).contains(&done.metadata.confidence_score));
    assert!(done.metadata.processing_time > 0.0);

    // Quota was consumed exactly once.
    let sub = app.subscriptions.active_subscription(&user.id).await.unwrap().unwrap();
    assert_eq!(sub.letters_used, 1);
}

#[tokio::test(start_paused = true)]
async fn test_quota_exceeded_creates_nothing() {
    let app = test_app();
    let user = subscribed_user(&app, Plan::Single).await;

    app.letters.create_letter(request_for(&user)).await.unwrap();

    let err = app.letters.create_letter(request_for(&user)).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::QuotaExceeded);

    // No second letter, and the subscription was not touched again.
    let letters = app.letters.letters_for_user(&user.id).await.unwrap();
    assert_eq!(letters.len(), 1);
    let sub = app.subscriptions.active_subscription(&user.id).await.unwrap().unwrap();
    assert_eq!(sub.letters_used, 1);
}

#[tokio::test]
async fn test_letter_requires_subscription() {
    let app = test_app();
    let user = app
        .identity
        .sign_up("john@example.com", "Str0ngPass", "John Doe", Role::User, None)
        .await
        .unwrap();

    let err = app.letters.create_letter(request_for(&user)).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NoSubscription);
    assert!(app.letters.letters_for_user(&user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_letter_requires_authentication() {
    let app = test_app();
    let user = subscribed_user(&app, Plan::Single).await;
    app.identity.sign_out().await.unwrap();

    let err = app.letters.create_letter(request_for(&user)).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotAuthenticated);
}

#[tokio::test]
async fn test_only_the_session_user_may_create() {
    let app = test_app();
    let owner = subscribed_user(&app, Plan::Single).await;
    // A second sign-up takes over the session.
    app.identity
        .sign_up("mallory@example.com", "Str0ngPass", "Mallory May", Role::User, None)
        .await
        .unwrap();

    let err = app.letters.create_letter(request_for(&owner)).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::AccessDenied);
}

#[tokio::test]
async fn test_employees_and_admins_cannot_create_letters() {
    let app = test_app();
    let employee = app
        .identity
        .sign_up("jane@example.com", "Str0ngPass", "Jane Smith", Role::Employee, None)
        .await
        .unwrap();
    let err = app.letters.create_letter(request_for(&employee)).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InsufficientPermissions);

    let admin = app
        .identity
        .sign_up(
            "root@example.com",
            "Str0ngPass",
            "Root Admin",
            Role::Admin,
            Some("ADMIN_SECRET_2025"),
        )
        .await
        .unwrap();
    let err = app.letters.create_letter(request_for(&admin)).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InsufficientPermissions);
}

#[tokio::test]
async fn test_empty_fields_rejected_with_field_name() {
    let app = test_app();
    let user = subscribed_user(&app, Plan::Single).await;

    let mut request = request_for(&user);
    request.matter = "  ".into();
    let err = app.letters.create_letter(request).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::MissingField);

    // Nothing was created and no quota consumed.
    assert!(app.letters.letters_for_user(&user.id).await.unwrap().is_empty());
    let sub = app.subscriptions.active_subscription(&user.id).await.unwrap().unwrap();
    assert_eq!(sub.letters_used, 0);
}

#[tokio::test(start_paused = true)]
async fn test_listing_is_newest_first() {
    let app = test_app();
    let user = subscribed_user(&app, Plan::Annual8).await;

    let first = app.letters.create_letter(request_for(&user)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;
    let second = app.letters.create_letter(request_for(&user)).await.unwrap();

    let listed = app.letters.letters_for_user(&user.id).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, second.id);
    assert_eq!(listed[1].id, first.id);
}

#[tokio::test(start_paused = true)]
async fn test_soft_deleted_letters_disappear_from_listings() {
    let app = test_app();
    let user = subscribed_user(&app, Plan::Annual4).await;
    let letter = app.letters.create_letter(request_for(&user)).await.unwrap();
    wait_for_settled(&app, &user.id, 20).await;

    app.letters.delete_letter(&user.id, &letter.id).await.unwrap();

    assert!(app.letters.letters_for_user(&user.id).await.unwrap().is_empty());
    assert!(app.letters.all_letters().await.unwrap().is_empty());

    // Deleting again reports the letter as gone.
    let err = app.letters.delete_letter(&user.id, &letter.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::LetterNotFound);
}

#[tokio::test(start_paused = true)]
async fn test_only_owner_or_admin_may_delete() {
    let app = test_app();
    let owner = subscribed_user(&app, Plan::Single).await;
    let letter = app.letters.create_letter(request_for(&owner)).await.unwrap();

    let other = app
        .identity
        .sign_up("mallory@example.com", "Str0ngPass", "Mallory May", Role::User, None)
        .await
        .unwrap();
    let err = app.letters.delete_letter(&other.id, &letter.id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::AccessDenied);

    let admin = app
        .identity
        .sign_up(
            "root@example.com",
            "Str0ngPass",
            "Root Admin",
            Role::Admin,
            Some("ADMIN_SECRET_2025"),
        )
        .await
        .unwrap();
    app.letters.delete_letter(&admin.id, &letter.id).await.unwrap();
    assert!(app.letters.letters_for_user(&owner.id).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_download_counter_increments() {
    let app = test_app();
    let user = subscribed_user(&app, Plan::Single).await;
    let letter = app.letters.create_letter(request_for(&user)).await.unwrap();
    wait_for_settled(&app, &user.id, 20).await;

    app.letters.record_download(&letter.id).await.unwrap();
    app.letters.record_download(&letter.id).await.unwrap();

    let listed = app.letters.letters_for_user(&user.id).await.unwrap();
    assert_eq!(listed[0].download_count, 2);
}

#[tokio::test(start_paused = true)]
async fn test_generation_survives_sign_out() {
    // The scheduled completion runs even if the owner signs out mid-flight.
    let app = test_app();
    let user = subscribed_user(&app, Plan::Single).await;
    let created = app.letters.create_letter(request_for(&user)).await.unwrap();

    app.identity.sign_out().await.unwrap();

    let done = wait_for_settled(&app, &user.id, 20).await;
    assert_eq!(done.id, created.id);
    assert_eq!(done.status, LetterStatus::Completed);
}
