/// Project mutation coordinator
///
/// Every operation opens one unit of work, authorizes inside it, mutates, and
/// commits. Activity is recorded after commit through [`AuditRecorder`].
///
/// # Optimistic concurrency
///
/// Writers pass the `version` they last read. The coordinator compares it with
/// the stored version and then issues a write that is itself conditional on
/// that version, so of two writers that read the same version exactly one
/// succeeds. The loser gets `VersionConflict` and is expected to reload and
/// resubmit; there is no waiting, merging or server-side retry.
///
/// # Deletion
///
/// Deletion removes, in order: memberships, invitations, notices, activity,
/// then the project row. The deletion entry is written to the activity log
/// afterwards and outlives the project.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use collabhub_shared::auth::identity::AuthContext;
/// use collabhub_shared::db::memory::MemoryStore;
/// use collabhub_shared::models::project::{ProjectInput, ProjectStatus};
/// use collabhub_shared::services::audit::AuditRecorder;
/// use collabhub_shared::services::projects::ProjectService;
/// use chrono::NaiveDate;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(MemoryStore::new());
/// let projects = ProjectService::new(store.clone(), AuditRecorder::new(store), "admin@admin.com");
///
/// let alice = AuthContext::Credentials { username: "alice@x.com".into() };
/// let project = projects
///     .create(&alice, ProjectInput {
///         name: "Launch".into(),
///         description: String::new(),
///         start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///         end_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
///         status: ProjectStatus::Planning,
///     })
///     .await?;
/// assert_eq!(project.version, 0);
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::audit::AuditRecorder;
use crate::auth::authorization::{
    authorize, require_account, require_system_admin, Capability, Grant,
};
use crate::auth::identity::{resolve, AuthContext};
use crate::db::store::{Store, UnitOfWork};
use crate::error::CollabError;
use crate::models::activity::{ActivityAction, ActivityEntry, MEMBER_BOARD, PROJECT_BOARD};
use crate::models::membership::{Membership, ProjectRole};
use crate::models::notice::{Notice, NOTICE_BOARD};
use crate::models::project::{Project, ProjectInput};
use crate::models::user::{normalize_email, User};

/// Author name used for system-generated posts when no system account exists
const FALLBACK_AUTHOR: &str = "Administrator";

/// A project as seen by one caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectView {
    #[serde(flatten)]
    pub project: Project,

    /// The caller's membership role, if any
    pub role: Option<ProjectRole>,

    pub is_creator: bool,
}

impl From<Grant> for ProjectView {
    fn from(grant: Grant) -> Self {
        Self {
            project: grant.project,
            role: grant.role,
            is_creator: grant.is_creator,
        }
    }
}

#[derive(Clone)]
pub struct ProjectService {
    store: Arc<dyn Store>,
    audit: AuditRecorder,
    system_account_email: String,
}

impl ProjectService {
    pub fn new(store: Arc<dyn Store>, audit: AuditRecorder, system_account_email: &str) -> Self {
        Self {
            store,
            audit,
            system_account_email: normalize_email(system_account_email),
        }
    }

    /// Creates a project owned by the caller
    ///
    /// The project, the creator's Leader membership, the default notice and
    /// the initial activity entry are written in one unit of work; none of
    /// them is observable without the others.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` if the caller cannot be resolved
    /// - `Validation` for a blank name or an end date before the start date
    /// - `AccountNotFound` if the identity has no account
    pub async fn create(
        &self,
        auth: &AuthContext,
        input: ProjectInput,
    ) -> Result<Project, CollabError> {
        let identity = resolve(auth)?;
        let input = input.normalized()?;

        let mut tx = self.store.begin().await?;
        let creator = require_account(tx.as_mut(), &identity).await?;

        let project = Project::from_input(input, creator.id);
        tx.insert_project(&project).await?;
        Membership::add(tx.as_mut(), project.id, creator.id, ProjectRole::Leader).await?;

        let author = self.system_author_name(tx.as_mut()).await?;
        let notice = Notice::guidelines(project.id, &author);
        tx.insert_notice(&notice).await?;
        tx.insert_activity(&ActivityEntry::new(
            project.id,
            NOTICE_BOARD,
            Some(notice.id),
            &creator.email,
            &creator.name,
            ActivityAction::Create,
        ))
        .await?;

        tx.commit().await?;

        info!(project_id = %project.id, creator = %creator.email, "Project created");
        Ok(project)
    }

    /// Reads a project the caller has access to
    pub async fn get(&self, auth: &AuthContext, project_id: Uuid) -> Result<ProjectView, CollabError> {
        let mut tx = self.store.begin().await?;
        let grant = authorize(tx.as_mut(), project_id, auth, Capability::Access).await?;
        Ok(grant.into())
    }

    /// Replaces the project's editable fields
    ///
    /// # Errors
    ///
    /// - `VersionConflict` if the stored version is not `expected_version`
    /// - `Forbidden` without the administrative capability
    pub async fn update(
        &self,
        auth: &AuthContext,
        project_id: Uuid,
        expected_version: i64,
        input: ProjectInput,
    ) -> Result<Project, CollabError> {
        let input = input.normalized()?;

        let mut tx = self.store.begin().await?;
        let grant = authorize(tx.as_mut(), project_id, auth, Capability::Administer).await?;

        let updated = grant.project.with_changes(input);
        write_versioned(tx.as_mut(), &grant.project, &updated, expected_version).await?;
        tx.commit().await?;

        info!(project_id = %project_id, version = updated.version, "Project updated");
        self.audit
            .record(ActivityEntry::new(
                project_id,
                PROJECT_BOARD,
                Some(project_id),
                &grant.actor.email,
                &grant.actor.name,
                ActivityAction::Update,
            ))
            .await;

        Ok(updated)
    }

    /// Deletes a project and everything attached to it
    pub async fn delete(
        &self,
        auth: &AuthContext,
        project_id: Uuid,
        expected_version: i64,
    ) -> Result<(), CollabError> {
        let mut tx = self.store.begin().await?;
        let grant = authorize(tx.as_mut(), project_id, auth, Capability::Administer).await?;

        delete_cascade(tx.as_mut(), &grant.project, expected_version).await?;
        tx.commit().await?;

        self.record_deletion(&grant.project, &grant.actor).await;
        Ok(())
    }

    /// Deletes any project; requires the system ADMIN role
    pub async fn admin_delete(
        &self,
        auth: &AuthContext,
        project_id: Uuid,
        expected_version: i64,
    ) -> Result<(), CollabError> {
        let mut tx = self.store.begin().await?;
        let admin = require_system_admin(tx.as_mut(), auth).await?;
        let project = tx
            .find_project(project_id)
            .await?
            .ok_or(CollabError::ProjectNotFound(project_id))?;

        delete_cascade(tx.as_mut(), &project, expected_version).await?;
        tx.commit().await?;

        self.record_deletion(&project, &admin).await;
        Ok(())
    }

    /// Removes the caller's own membership
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` for the creator
    /// - `Forbidden` for a non-member
    pub async fn leave(&self, auth: &AuthContext, project_id: Uuid) -> Result<(), CollabError> {
        let mut tx = self.store.begin().await?;
        let grant = authorize(tx.as_mut(), project_id, auth, Capability::Leave).await?;

        Membership::remove(tx.as_mut(), project_id, grant.actor.id).await?;
        tx.commit().await?;

        info!(project_id = %project_id, user_id = %grant.actor.id, "Member left project");
        self.audit
            .record(ActivityEntry::new(
                project_id,
                MEMBER_BOARD,
                Some(grant.actor.id),
                &grant.actor.email,
                &grant.actor.name,
                ActivityAction::Leave,
            ))
            .await;

        Ok(())
    }

    /// Projects the caller created or is a member of
    pub async fn list_mine(&self, auth: &AuthContext) -> Result<Vec<Project>, CollabError> {
        let identity = resolve(auth)?;
        let mut tx = self.store.begin().await?;
        let user = require_account(tx.as_mut(), &identity).await?;
        Ok(tx.list_projects_for_user(user.id).await?)
    }

    /// Projects where the caller holds `role`
    pub async fn list_by_role(
        &self,
        auth: &AuthContext,
        role: ProjectRole,
    ) -> Result<Vec<Project>, CollabError> {
        let identity = resolve(auth)?;
        let mut tx = self.store.begin().await?;
        let user = require_account(tx.as_mut(), &identity).await?;
        Ok(tx.list_projects_by_role(user.id, role).await?)
    }

    /// Every project; requires the system ADMIN role
    pub async fn list_all(&self, auth: &AuthContext) -> Result<Vec<Project>, CollabError> {
        let mut tx = self.store.begin().await?;
        require_system_admin(tx.as_mut(), auth).await?;
        Ok(tx.list_all_projects().await?)
    }

    async fn system_author_name(&self, tx: &mut dyn UnitOfWork) -> Result<String, CollabError> {
        Ok(tx
            .find_user_by_email(&self.system_account_email)
            .await?
            .map(|user| user.name)
            .unwrap_or_else(|| FALLBACK_AUTHOR.to_string()))
    }

    async fn record_deletion(&self, project: &Project, actor: &User) {
        info!(project_id = %project.id, actor = %actor.email, "Project deleted");
        self.audit
            .record(ActivityEntry::new(
                project.id,
                PROJECT_BOARD,
                Some(project.id),
                &actor.email,
                &actor.name,
                ActivityAction::Delete,
            ))
            .await;
    }
}

/// Writes `updated` over `current` if nobody else has written since
/// `expected_version` was read
pub(crate) async fn write_versioned(
    tx: &mut dyn UnitOfWork,
    current: &Project,
    updated: &Project,
    expected_version: i64,
) -> Result<(), CollabError> {
    if current.version != expected_version {
        return Err(CollabError::VersionConflict {
            expected: expected_version,
        });
    }
    if !tx.update_project(updated, expected_version).await? {
        return Err(CollabError::VersionConflict {
            expected: expected_version,
        });
    }
    Ok(())
}

async fn delete_cascade(
    tx: &mut dyn UnitOfWork,
    project: &Project,
    expected_version: i64,
) -> Result<(), CollabError> {
    // claim the version first so a concurrent writer loses instead of interleaving
    write_versioned(tx, project, project, expected_version).await?;

    let memberships = tx.delete_project_memberships(project.id).await?;
    let invitations = tx.delete_project_invitations(project.id).await?;
    let notices = tx.delete_project_notices(project.id).await?;
    let activity = tx.delete_project_activity(project.id).await?;
    if !tx.delete_project(project.id).await? {
        return Err(CollabError::ProjectNotFound(project.id));
    }

    tracing::debug!(
        project_id = %project.id,
        memberships,
        invitations,
        notices,
        activity,
        "Project cascade removed"
    );
    Ok(())
}
