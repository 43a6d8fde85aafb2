/// Integration tests for accounts: registration, login, external signup,
/// system roles and account deletion
///
/// Run with: cargo test --test accounts_tests

mod common;

use chrono::Duration;
use collabhub_shared::auth::identity::Provider;
use collabhub_shared::db::store::{Store, UnitOfWork};
use collabhub_shared::error::CollabError;
use collabhub_shared::models::membership::{Membership, ProjectRole};
use collabhub_shared::models::user::SystemRole;
use collabhub_shared::services::accounts::ExternalLogin;
use collabhub_shared::services::ServiceSettings;
use common::{auth, TestContext, SYSTEM_EMAIL};
use serde_json::json;

#[tokio::test]
async fn test_register_and_login() {
    let ctx = TestContext::new();
    let accounts = &ctx.services.accounts;

    let user = accounts
        .register(" Alice@X.com ", "Str0ng!pass", "Alice")
        .await
        .unwrap();
    assert_eq!(user.email, "alice@x.com");
    assert_eq!(user.role, SystemRole::User);

    let duplicate = accounts.register("alice@x.com", "Str0ng!pass", "Alice").await;
    assert!(matches!(duplicate, Err(CollabError::DuplicateAccount(_))));

    let logged_in = accounts.login("ALICE@x.com", "Str0ng!pass").await.unwrap();
    assert_eq!(logged_in.id, user.id);

    let wrong = accounts.login("alice@x.com", "Wr0ng!pass").await;
    assert!(matches!(wrong, Err(CollabError::Unauthenticated)));

    let unknown = accounts.login("nobody@x.com", "Str0ng!pass").await;
    assert!(matches!(unknown, Err(CollabError::Unauthenticated)));
}

#[tokio::test]
async fn test_register_validation() {
    let ctx = TestContext::new();
    let accounts = &ctx.services.accounts;

    let weak = accounts.register("alice@x.com", "short", "Alice").await;
    assert!(matches!(weak, Err(CollabError::Validation(_))));

    let bad_email = accounts.register("alice", "Str0ng!pass", "Alice").await;
    assert!(matches!(bad_email, Err(CollabError::Validation(_))));

    let blank_name = accounts.register("alice@x.com", "Str0ng!pass", "  ").await;
    assert!(matches!(blank_name, Err(CollabError::Validation(_))));
}

#[tokio::test]
async fn test_passwordless_account_cannot_login() {
    let ctx = TestContext::new();
    ctx.system_account().await;

    let result = ctx.services.accounts.login(SYSTEM_EMAIL, "anything").await;
    assert!(matches!(result, Err(CollabError::Unauthenticated)));
}

#[tokio::test]
async fn test_external_login_pending_then_complete() {
    let ctx = TestContext::new();
    let accounts = &ctx.services.accounts;
    let attributes = json!({
        "response": { "id": "n-42", "email": "Dana@Naver.com", "name": "Dana" }
    });

    let token = match accounts.external_login(Provider::Naver, &attributes).await.unwrap() {
        ExternalLogin::PendingSignup { token, profile } => {
            assert_eq!(profile.email, "dana@naver.com");
            token
        }
        ExternalLogin::Existing(_) => panic!("no account should exist yet"),
    };

    let user = accounts.complete_signup(&token).await.unwrap();
    assert_eq!(user.email, "dana@naver.com");
    assert_eq!(user.provider.as_deref(), Some("naver"));
    assert_eq!(user.provider_id.as_deref(), Some("n-42"));
    assert!(user.password_hash.is_none());

    let reused = accounts.complete_signup(&token).await;
    assert!(matches!(reused, Err(CollabError::InvalidToken)));

    match accounts.external_login(Provider::Naver, &attributes).await.unwrap() {
        ExternalLogin::Existing(existing) => assert_eq!(existing.id, user.id),
        ExternalLogin::PendingSignup { .. } => panic!("account should exist"),
    }
}

#[tokio::test]
async fn test_external_login_missing_email() {
    let ctx = TestContext::new();
    let result = ctx
        .services
        .accounts
        .external_login(Provider::Google, &json!({ "sub": "g-1", "name": "Eve" }))
        .await;
    assert!(matches!(result, Err(CollabError::Unauthenticated)));
}

#[tokio::test]
async fn test_expired_signup_token() {
    let ctx = TestContext::with_settings(ServiceSettings {
        signup_ttl: Duration::seconds(-1),
        ..ServiceSettings::default()
    });
    let attributes = json!({ "sub": "g-1", "email": "eve@gmail.com", "name": "Eve" });

    let login = ctx
        .services
        .accounts
        .external_login(Provider::Google, &attributes)
        .await
        .unwrap();
    let ExternalLogin::PendingSignup { token, .. } = login else {
        panic!("expected a pending signup");
    };

    let result = ctx.services.accounts.complete_signup(&token).await;
    assert!(matches!(result, Err(CollabError::InvalidToken)));
}

#[tokio::test]
async fn test_delete_account_transfers_projects() {
    let ctx = TestContext::new();
    let system = ctx.system_account().await;
    let alice = ctx.user("alice@x.com", SystemRole::User).await;
    ctx.user("carol@x.com", SystemRole::User).await;

    let owned = ctx.project("alice@x.com").await;
    let joined = ctx.project("carol@x.com").await;
    let mut tx = ctx.store.begin().await.unwrap();
    Membership::add(tx.as_mut(), joined.id, alice.id, ProjectRole::Member)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    ctx.services
        .accounts
        .delete_account(&auth("alice@x.com"))
        .await
        .unwrap();

    let mut tx = ctx.store.begin().await.unwrap();
    assert!(tx.find_user(alice.id).await.unwrap().is_none());

    let transferred = tx.find_project(owned.id).await.unwrap().unwrap();
    assert_eq!(transferred.creator_id, system.id);
    assert!(transferred.description.ends_with(" [creator transferred]"));
    assert_eq!(transferred.version, owned.version + 1);

    for project_id in [owned.id, joined.id] {
        assert!(tx.find_membership(project_id, alice.id).await.unwrap().is_none());
        let membership = tx.find_membership(project_id, system.id).await.unwrap().unwrap();
        assert_eq!(membership.role, ProjectRole::Admin);
    }

    let untouched = tx.find_project(joined.id).await.unwrap().unwrap();
    assert_eq!(untouched.version, 0);
}

#[tokio::test]
async fn test_system_account_cannot_be_deleted() {
    let ctx = TestContext::new();
    ctx.system_account().await;

    let result = ctx.services.accounts.delete_account(&auth(SYSTEM_EMAIL)).await;
    assert!(matches!(result, Err(CollabError::InvalidOperation(_))));
}

#[tokio::test]
async fn test_delete_account_needs_system_account() {
    let ctx = TestContext::new();
    ctx.user("alice@x.com", SystemRole::User).await;

    let result = ctx.services.accounts.delete_account(&auth("alice@x.com")).await;
    assert!(matches!(result, Err(CollabError::AccountNotFound(_))));
}

#[tokio::test]
async fn test_set_system_role() {
    let ctx = TestContext::new();
    ctx.system_account().await;
    let alice = ctx.user("alice@x.com", SystemRole::User).await;
    let bob = ctx.user("bob@x.com", SystemRole::User).await;

    let denied = ctx
        .services
        .accounts
        .set_system_role(&auth("alice@x.com"), bob.id, SystemRole::Admin)
        .await;
    assert!(matches!(denied, Err(CollabError::Forbidden(_))));

    let promoted = ctx
        .services
        .accounts
        .set_system_role(&auth(SYSTEM_EMAIL), alice.id, SystemRole::Admin)
        .await
        .unwrap();
    assert_eq!(promoted.role, SystemRole::Admin);

    // the new role applies on the next request
    ctx.services
        .accounts
        .set_system_role(&auth("alice@x.com"), bob.id, SystemRole::Admin)
        .await
        .unwrap();

    let missing = ctx
        .services
        .accounts
        .set_system_role(&auth(SYSTEM_EMAIL), uuid::Uuid::new_v4(), SystemRole::Admin)
        .await;
    assert!(matches!(missing, Err(CollabError::AccountNotFound(_))));
}

#[tokio::test]
async fn test_ensure_system_account_is_idempotent() {
    let ctx = TestContext::new();
    let first = ctx.system_account().await;
    let second = ctx.system_account().await;
    assert_eq!(first.id, second.id);
    assert_eq!(first.role, SystemRole::Admin);
    assert_eq!(first.name, "Administrator");
}
