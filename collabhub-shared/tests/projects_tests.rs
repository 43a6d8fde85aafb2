/// Integration tests for project authorization, membership and mutation
///
/// Run with: cargo test --test projects_tests

mod common;

use collabhub_shared::auth::authorization::{authorize, Capability};
use collabhub_shared::db::store::{Store, UnitOfWork};
use collabhub_shared::error::CollabError;
use collabhub_shared::models::membership::{Membership, ProjectRole};
use collabhub_shared::models::user::SystemRole;
use common::{auth, project_input, TestContext, SYSTEM_EMAIL};
use uuid::Uuid;

async fn check(
    ctx: &TestContext,
    project_id: Uuid,
    email: &str,
    capability: Capability,
) -> Result<(), CollabError> {
    let mut tx = ctx.store.begin().await.unwrap();
    authorize(tx.as_mut(), project_id, &auth(email), capability)
        .await
        .map(|_| ())
}

#[tokio::test]
async fn test_create_sets_up_leader_notice_and_activity() {
    let ctx = TestContext::new();
    ctx.system_account().await;
    let alice = ctx.user("alice@x.com", SystemRole::User).await;

    let project = ctx.project("alice@x.com").await;
    assert_eq!(project.version, 0);
    assert_eq!(project.creator_id, alice.id);

    let members = ctx
        .services
        .members
        .list(&auth("alice@x.com"), project.id)
        .await
        .unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].user_id, alice.id);
    assert_eq!(members[0].role, ProjectRole::Leader);

    let notices = ctx
        .services
        .boards
        .notices(&auth("alice@x.com"), project.id)
        .await
        .unwrap();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].title, "Notice board guidelines");
    assert_eq!(notices[0].author_name, "Administrator");

    let activity = ctx
        .services
        .boards
        .recent_activity(&auth("alice@x.com"), project.id, None)
        .await
        .unwrap();
    assert_eq!(activity.len(), 1);
    assert_eq!(activity[0].board_name, "notice");
    assert_eq!(activity[0].action, "create");
    assert_eq!(activity[0].subject_id, Some(notices[0].id));
}

#[tokio::test]
async fn test_create_requires_identity_and_account() {
    let ctx = TestContext::new();

    let anonymous = ctx
        .services
        .projects
        .create(
            &collabhub_shared::auth::identity::AuthContext::Anonymous,
            project_input("Launch"),
        )
        .await;
    assert!(matches!(anonymous, Err(CollabError::Unauthenticated)));

    let unknown = ctx
        .services
        .projects
        .create(&auth("ghost@x.com"), project_input("Launch"))
        .await;
    assert!(matches!(unknown, Err(CollabError::AccountNotFound(_))));
}

#[tokio::test]
async fn test_create_rejects_invalid_input() {
    let ctx = TestContext::new();
    ctx.user("alice@x.com", SystemRole::User).await;

    let blank = ctx
        .services
        .projects
        .create(&auth("alice@x.com"), project_input("   "))
        .await;
    assert!(matches!(blank, Err(CollabError::Validation(_))));

    let mut backwards = project_input("Launch");
    std::mem::swap(&mut backwards.start_date, &mut backwards.end_date);
    let result = ctx
        .services
        .projects
        .create(&auth("alice@x.com"), backwards)
        .await;
    assert!(matches!(result, Err(CollabError::Validation(_))));

    let projects = ctx
        .services
        .projects
        .list_mine(&auth("alice@x.com"))
        .await
        .unwrap();
    assert!(projects.is_empty());
}

#[tokio::test]
async fn test_unknown_project_not_found() {
    let ctx = TestContext::new();
    ctx.user("alice@x.com", SystemRole::User).await;

    let result = check(&ctx, Uuid::new_v4(), "alice@x.com", Capability::Access).await;
    assert!(matches!(result, Err(CollabError::ProjectNotFound(_))));
}

#[tokio::test]
async fn test_creator_override_without_membership() {
    let ctx = TestContext::new();
    let alice = ctx.user("alice@x.com", SystemRole::User).await;
    let project = ctx.project("alice@x.com").await;

    let mut tx = ctx.store.begin().await.unwrap();
    Membership::remove(tx.as_mut(), project.id, alice.id)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert!(check(&ctx, project.id, "alice@x.com", Capability::Access).await.is_ok());
    assert!(check(&ctx, project.id, "ALICE@x.com", Capability::Administer).await.is_ok());
    assert!(matches!(
        check(&ctx, project.id, "alice@x.com", Capability::Leave).await,
        Err(CollabError::InvalidOperation(_))
    ));
}

#[tokio::test]
async fn test_duplicate_membership_rejected() {
    let ctx = TestContext::new();
    ctx.user("alice@x.com", SystemRole::User).await;
    let bob = ctx.user("bob@x.com", SystemRole::User).await;
    let project = ctx.project("alice@x.com").await;

    let mut tx = ctx.store.begin().await.unwrap();
    Membership::add(tx.as_mut(), project.id, bob.id, ProjectRole::Member)
        .await
        .unwrap();
    let second = Membership::add(tx.as_mut(), project.id, bob.id, ProjectRole::Admin).await;
    assert!(matches!(second, Err(CollabError::DuplicateMembership)));
    assert_eq!(
        Membership::role_of(tx.as_mut(), project.id, bob.id).await.unwrap(),
        Some(ProjectRole::Member)
    );
}

#[tokio::test]
async fn test_member_roles_and_capabilities() {
    let ctx = TestContext::new();
    ctx.user("alice@x.com", SystemRole::User).await;
    let bob = ctx.user("bob@x.com", SystemRole::User).await;
    ctx.user("carol@x.com", SystemRole::User).await;
    let project = ctx.project("alice@x.com").await;

    let mut tx = ctx.store.begin().await.unwrap();
    Membership::add(tx.as_mut(), project.id, bob.id, ProjectRole::Member)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert!(check(&ctx, project.id, "bob@x.com", Capability::Access).await.is_ok());
    assert!(matches!(
        check(&ctx, project.id, "bob@x.com", Capability::Administer).await,
        Err(CollabError::Forbidden(_))
    ));
    assert!(matches!(
        check(&ctx, project.id, "carol@x.com", Capability::Access).await,
        Err(CollabError::Forbidden(_))
    ));

    ctx.services
        .members
        .update_role(&auth("alice@x.com"), project.id, bob.id, ProjectRole::Admin)
        .await
        .unwrap();
    assert!(check(&ctx, project.id, "bob@x.com", Capability::Administer).await.is_ok());
}

#[tokio::test]
async fn test_creator_role_cannot_be_lowered() {
    let ctx = TestContext::new();
    let alice = ctx.user("alice@x.com", SystemRole::User).await;
    let project = ctx.project("alice@x.com").await;

    let result = ctx
        .services
        .members
        .update_role(&auth("alice@x.com"), project.id, alice.id, ProjectRole::Member)
        .await;
    assert!(matches!(result, Err(CollabError::InvalidOperation(_))));
}

#[tokio::test]
async fn test_update_role_of_non_member() {
    let ctx = TestContext::new();
    ctx.user("alice@x.com", SystemRole::User).await;
    let carol = ctx.user("carol@x.com", SystemRole::User).await;
    let project = ctx.project("alice@x.com").await;

    let result = ctx
        .services
        .members
        .update_role(&auth("alice@x.com"), project.id, carol.id, ProjectRole::Admin)
        .await;
    assert!(matches!(result, Err(CollabError::MembershipNotFound)));
}

#[tokio::test]
async fn test_kick_rules() {
    let ctx = TestContext::new();
    let alice = ctx.user("alice@x.com", SystemRole::User).await;
    let bob = ctx.user("bob@x.com", SystemRole::User).await;
    let carol = ctx.user("carol@x.com", SystemRole::User).await;
    let project = ctx.project("alice@x.com").await;

    let mut tx = ctx.store.begin().await.unwrap();
    Membership::add(tx.as_mut(), project.id, bob.id, ProjectRole::Leader)
        .await
        .unwrap();
    Membership::add(tx.as_mut(), project.id, carol.id, ProjectRole::Member)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let by_leader = ctx
        .services
        .members
        .kick(&auth("bob@x.com"), project.id, carol.id)
        .await;
    assert!(matches!(by_leader, Err(CollabError::Forbidden(_))));

    let self_kick = ctx
        .services
        .members
        .kick(&auth("alice@x.com"), project.id, alice.id)
        .await;
    assert!(matches!(self_kick, Err(CollabError::InvalidOperation(_))));

    ctx.services
        .members
        .kick(&auth("alice@x.com"), project.id, carol.id)
        .await
        .unwrap();
    assert!(matches!(
        check(&ctx, project.id, "carol@x.com", Capability::Access).await,
        Err(CollabError::Forbidden(_))
    ));

    let again = ctx
        .services
        .members
        .kick(&auth("alice@x.com"), project.id, carol.id)
        .await;
    assert!(matches!(again, Err(CollabError::MembershipNotFound)));
}

#[tokio::test]
async fn test_leave() {
    let ctx = TestContext::new();
    ctx.user("alice@x.com", SystemRole::User).await;
    let bob = ctx.user("bob@x.com", SystemRole::User).await;
    let project = ctx.project("alice@x.com").await;

    let creator = ctx.services.projects.leave(&auth("alice@x.com"), project.id).await;
    assert!(matches!(creator, Err(CollabError::InvalidOperation(_))));

    let outsider = ctx.services.projects.leave(&auth("bob@x.com"), project.id).await;
    assert!(matches!(outsider, Err(CollabError::Forbidden(_))));

    let mut tx = ctx.store.begin().await.unwrap();
    Membership::add(tx.as_mut(), project.id, bob.id, ProjectRole::Member)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    ctx.services
        .projects
        .leave(&auth("bob@x.com"), project.id)
        .await
        .unwrap();
    let mine = ctx.services.projects.list_mine(&auth("bob@x.com")).await.unwrap();
    assert!(mine.is_empty());
}

#[tokio::test]
async fn test_stale_version_conflicts() {
    let ctx = TestContext::new();
    ctx.user("alice@x.com", SystemRole::User).await;
    let project = ctx.project("alice@x.com").await;
    let projects = &ctx.services.projects;
    let alice = auth("alice@x.com");

    for version in 0..3 {
        projects
            .update(&alice, project.id, version, project_input("Launch"))
            .await
            .unwrap();
    }

    let loaded_a = projects.get(&alice, project.id).await.unwrap();
    let loaded_b = projects.get(&alice, project.id).await.unwrap();
    assert_eq!(loaded_a.project.version, 3);

    let updated = projects
        .update(&alice, project.id, loaded_b.project.version, project_input("B wins"))
        .await
        .unwrap();
    assert_eq!(updated.version, 4);

    let stale = projects
        .update(&alice, project.id, loaded_a.project.version, project_input("A loses"))
        .await;
    assert!(matches!(stale, Err(CollabError::VersionConflict { expected: 3 })));

    let current = projects.get(&alice, project.id).await.unwrap();
    assert_eq!(current.project.name, "B wins");
    assert_eq!(current.project.version, 4);
}

#[tokio::test]
async fn test_concurrent_updates_one_wins() {
    let ctx = TestContext::new();
    ctx.user("alice@x.com", SystemRole::User).await;
    let project = ctx.project("alice@x.com").await;

    let first = ctx.services.projects.clone();
    let second = ctx.services.projects.clone();
    let id = project.id;
    let (a, b) = tokio::join!(
        tokio::spawn(async move {
            first
                .update(&auth("alice@x.com"), id, 0, project_input("First"))
                .await
        }),
        tokio::spawn(async move {
            second
                .update(&auth("alice@x.com"), id, 0, project_input("Second"))
                .await
        }),
    );
    let results = [a.unwrap(), b.unwrap()];

    let wins = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(CollabError::VersionConflict { .. })))
        .count();
    assert_eq!(wins, 1);
    assert_eq!(conflicts, 1);

    let current = ctx
        .services
        .projects
        .get(&auth("alice@x.com"), id)
        .await
        .unwrap();
    assert_eq!(current.project.version, 1);
}

#[tokio::test]
async fn test_member_cannot_update() {
    let ctx = TestContext::new();
    ctx.user("alice@x.com", SystemRole::User).await;
    let bob = ctx.user("bob@x.com", SystemRole::User).await;
    let project = ctx.project("alice@x.com").await;

    let mut tx = ctx.store.begin().await.unwrap();
    Membership::add(tx.as_mut(), project.id, bob.id, ProjectRole::Member)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let result = ctx
        .services
        .projects
        .update(&auth("bob@x.com"), project.id, 0, project_input("Mine now"))
        .await;
    assert!(matches!(result, Err(CollabError::Forbidden(_))));
}

#[tokio::test]
async fn test_delete_cascades() {
    let ctx = TestContext::new();
    ctx.system_account().await;
    ctx.user("alice@x.com", SystemRole::User).await;
    let project = ctx.project("alice@x.com").await;
    ctx.services
        .invitations
        .create(&auth("alice@x.com"), project.id, "bob@x.com")
        .await
        .unwrap();

    let stale = ctx
        .services
        .projects
        .delete(&auth("alice@x.com"), project.id, 7)
        .await;
    assert!(matches!(stale, Err(CollabError::VersionConflict { .. })));

    ctx.services
        .projects
        .delete(&auth("alice@x.com"), project.id, 0)
        .await
        .unwrap();

    let gone = ctx.services.projects.get(&auth("alice@x.com"), project.id).await;
    assert!(matches!(gone, Err(CollabError::ProjectNotFound(_))));

    let mut tx = ctx.store.begin().await.unwrap();
    assert!(tx.list_members(project.id).await.unwrap().is_empty());
    assert!(tx.list_invitations(project.id).await.unwrap().is_empty());
    assert!(tx.list_notices(project.id).await.unwrap().is_empty());
    let activity = tx.list_activity(project.id, 50).await.unwrap();
    assert_eq!(activity.len(), 1);
    assert_eq!(activity[0].action, "delete");
}

#[tokio::test]
async fn test_admin_delete_requires_system_admin() {
    let ctx = TestContext::new();
    ctx.system_account().await;
    ctx.user("alice@x.com", SystemRole::User).await;
    let project = ctx.project("alice@x.com").await;

    let denied = ctx
        .services
        .projects
        .admin_delete(&auth("alice@x.com"), project.id, 0)
        .await;
    assert!(matches!(denied, Err(CollabError::Forbidden(_))));

    let no_access = ctx.services.projects.get(&auth(SYSTEM_EMAIL), project.id).await;
    assert!(matches!(no_access, Err(CollabError::Forbidden(_))));

    ctx.services
        .projects
        .admin_delete(&auth(SYSTEM_EMAIL), project.id, 0)
        .await
        .unwrap();
    let all = ctx.services.projects.list_all(&auth(SYSTEM_EMAIL)).await.unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn test_list_by_role() {
    let ctx = TestContext::new();
    ctx.user("alice@x.com", SystemRole::User).await;
    let bob = ctx.user("bob@x.com", SystemRole::User).await;
    let led = ctx.project("alice@x.com").await;
    let joined = ctx.project("bob@x.com").await;

    let mut tx = ctx.store.begin().await.unwrap();
    Membership::add(tx.as_mut(), led.id, bob.id, ProjectRole::Member)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let bob_auth = auth("bob@x.com");
    let leading = ctx
        .services
        .projects
        .list_by_role(&bob_auth, ProjectRole::Leader)
        .await
        .unwrap();
    assert_eq!(leading.len(), 1);
    assert_eq!(leading[0].id, joined.id);

    let member_of = ctx
        .services
        .projects
        .list_by_role(&bob_auth, ProjectRole::Member)
        .await
        .unwrap();
    assert_eq!(member_of.len(), 1);
    assert_eq!(member_of[0].id, led.id);

    let mine = ctx.services.projects.list_mine(&bob_auth).await.unwrap();
    assert_eq!(mine.len(), 2);
}

#[tokio::test]
async fn test_activity_records_updates_and_all_activity_is_admin_only() {
    let ctx = TestContext::new();
    ctx.system_account().await;
    ctx.user("alice@x.com", SystemRole::User).await;
    let project = ctx.project("alice@x.com").await;

    ctx.services
        .projects
        .update(&auth("alice@x.com"), project.id, 0, project_input("Renamed"))
        .await
        .unwrap();

    let activity = ctx
        .services
        .boards
        .recent_activity(&auth("alice@x.com"), project.id, Some(10))
        .await
        .unwrap();
    assert_eq!(activity.len(), 2);
    assert!(activity.iter().any(|e| e.action == "update" && e.board_name == "project"));

    let denied = ctx.services.boards.all_activity(&auth("alice@x.com"), None).await;
    assert!(matches!(denied, Err(CollabError::Forbidden(_))));

    let all = ctx
        .services
        .boards
        .all_activity(&auth(SYSTEM_EMAIL), None)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}
