//! PostgreSQL integration tests for the repositories behind `PgStore`.
//!
//! These need a live database (`DATABASE_URL`) and are ignored by default:
//! `cargo test -p gatekeep-db -- --ignored`.

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use gatekeep_db::models::email_settings::SaveEmailSettings;
use gatekeep_db::models::login_token::CreateLoginToken;
use gatekeep_db::models::user::CreateUser;
use gatekeep_db::models::user_token::{CreateUserToken, SessionOrigin};
use gatekeep_db::store::{AuthStore, PgStore, StoreError};
use sqlx::PgPool;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_user(store: &PgStore, email: &str) -> gatekeep_db::models::user::User {
    store
        .insert_user(&CreateUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
            created_at: Utc::now(),
        })
        .await
        .expect("user insert should succeed")
}

fn new_login_token(email: &str) -> CreateLoginToken {
    let now = Utc::now();
    CreateLoginToken {
        id: Uuid::new_v4(),
        email: email.to_string(),
        ip_address: Some("203.0.113.7".into()),
        device_label: Some("Linux:Mozilla Firefox".into()),
        expires_at: now + Duration::minutes(10),
        created_at: now,
    }
}

async fn seed_login_token(store: &PgStore, email: &str) -> Uuid {
    store
        .insert_login_token(&new_login_token(email), 3)
        .await
        .expect("login token insert should succeed")
        .expect("email should be under the cap")
        .id
}

fn new_session(user_id: Uuid, origin: SessionOrigin) -> CreateUserToken {
    let now = Utc::now();
    CreateUserToken {
        id: Uuid::new_v4(),
        user_id,
        origin,
        ip_address: None,
        device_label: None,
        expires_at: now + Duration::days(30),
        created_at: now,
    }
}

// ---------------------------------------------------------------------------
// Constraint classification
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_id_is_classified_as_collision(pool: PgPool) {
    let store = PgStore::new(pool);
    let user = seed_user(&store, "first@example.com").await;

    let result = store
        .insert_user(&CreateUser {
            id: user.id,
            email: "second@example.com".into(),
            created_at: Utc::now(),
        })
        .await;
    assert_matches!(result, Err(StoreError::IdCollision(c)) if c == "users_pkey");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_email_is_classified_as_unique_violation(pool: PgPool) {
    let store = PgStore::new(pool);
    seed_user(&store, "dup@example.com").await;

    let result = store
        .insert_user(&CreateUser {
            id: Uuid::new_v4(),
            email: "dup@example.com".into(),
            created_at: Utc::now(),
        })
        .await;
    assert_matches!(result, Err(StoreError::UniqueViolation(c)) if c == "uq_users_email");
}

// ---------------------------------------------------------------------------
// Login tokens
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn decision_update_applies_once(pool: PgPool) {
    let store = PgStore::new(pool);
    let id = seed_login_token(&store, "a@b.com").await;

    assert!(store.decide_login_token(id, false).await.unwrap());
    assert!(!store.decide_login_token(id, true).await.unwrap());

    let token = store.find_login_token(id).await.unwrap().unwrap();
    assert!(token.denied);
    assert!(!token.authorized);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn activity_reports_count_and_newest(pool: PgPool) {
    let store = PgStore::new(pool);
    seed_login_token(&store, "a@b.com").await;
    seed_login_token(&store, "a@b.com").await;

    let activity = store.login_token_activity("a@b.com", Utc::now()).await.unwrap();
    assert_eq!(activity.active, 2);
    assert!(activity.last_created_at.is_some());

    let none = store.login_token_activity("nobody@b.com", Utc::now()).await.unwrap();
    assert_eq!(none.active, 0);
    assert!(none.last_created_at.is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_inserts_respect_the_cap(pool: PgPool) {
    let store = PgStore::new(pool);
    let inputs: Vec<_> = (0..6).map(|_| new_login_token("busy@b.com")).collect();

    let results = insert_concurrently(&store, &inputs).await;
    let inserted = results.iter().filter(|r| r.is_some()).count();
    assert_eq!(inserted, 3);

    let activity = store
        .login_token_activity("busy@b.com", Utc::now())
        .await
        .unwrap();
    assert_eq!(activity.active, 3);
}

async fn insert_concurrently(
    store: &PgStore,
    inputs: &[CreateLoginToken],
) -> Vec<Option<gatekeep_db::models::login_token::LoginToken>> {
    let mut handles = Vec::new();
    for input in inputs {
        let store = store.clone();
        let input = input.clone();
        handles.push(tokio::spawn(async move {
            store.insert_login_token(&input, 3).await.unwrap()
        }));
    }
    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    results
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn login_token_redeems_into_one_session(pool: PgPool) {
    let store = PgStore::new(pool);
    let user = seed_user(&store, "a@b.com").await;
    let login_id = seed_login_token(&store, "a@b.com").await;

    store
        .insert_user_token(&new_session(user.id, SessionOrigin::LoginToken(login_id)))
        .await
        .expect("first redemption should succeed");

    let second = store
        .insert_user_token(&new_session(user.id, SessionOrigin::LoginToken(login_id)))
        .await;
    assert_matches!(
        second,
        Err(StoreError::UniqueViolation(c)) if c == "uq_user_tokens_from_login_token"
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn session_renews_once_and_disconnects_once(pool: PgPool) {
    let store = PgStore::new(pool);
    let user = seed_user(&store, "a@b.com").await;
    let login_id = seed_login_token(&store, "a@b.com").await;
    let parent = store
        .insert_user_token(&new_session(user.id, SessionOrigin::LoginToken(login_id)))
        .await
        .unwrap();

    let renewal = SessionOrigin::Renewal { parent: parent.id };
    let child = store
        .insert_user_token(&new_session(user.id, renewal))
        .await
        .unwrap();
    assert_eq!(child.from_user_token, Some(parent.id));
    let found = store.find_user_token_by_parent(parent.id).await.unwrap();
    assert_eq!(found.map(|t| t.id), Some(child.id));
    assert_matches!(
        store.insert_user_token(&new_session(user.id, renewal)).await,
        Err(StoreError::UniqueViolation(c)) if c == "uq_user_tokens_from_user_token"
    );

    assert!(store.disconnect_user_token(child.id).await.unwrap());
    assert!(!store.disconnect_user_token(child.id).await.unwrap());
}

// ---------------------------------------------------------------------------
// Email settings
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn settings_revision_keeps_previous_password(pool: PgPool) {
    let store = PgStore::new(pool);
    let first = SaveEmailSettings {
        id: Uuid::new_v4(),
        host: "smtp.example.com".into(),
        port: 587,
        username: "mailer".into(),
        password_encrypted: Some("ciphertext".into()),
        created_at: Utc::now() - Duration::minutes(1),
    };
    store.save_email_settings(&first).await.unwrap();

    let second = SaveEmailSettings {
        id: Uuid::new_v4(),
        port: 2525,
        password_encrypted: None,
        created_at: Utc::now(),
        ..first
    };
    let saved = store.save_email_settings(&second).await.unwrap();
    assert_eq!(saved.password_encrypted.as_deref(), Some("ciphertext"));

    let latest = store.latest_email_settings().await.unwrap().unwrap();
    assert_eq!(latest.port, 2525);
}
