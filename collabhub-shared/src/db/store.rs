/// Storage abstraction
///
/// Every collaboration operation runs inside one [`UnitOfWork`]: the
/// authorization reads and the writes they guard share a single transaction
/// boundary. A unit of work that is dropped without [`UnitOfWork::commit`]
/// rolls back.
///
/// Two backends implement the traits:
///
/// - [`PgStore`](crate::db::postgres::PgStore): a Postgres transaction per unit
/// - [`MemoryStore`](crate::db::memory::MemoryStore): an exclusive snapshot of
///   in-process state, used by tests and by development runs without a database
///
/// # Example
///
/// ```no_run
/// use collabhub_shared::db::memory::MemoryStore;
/// use collabhub_shared::db::store::Store;
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let mut tx = store.begin().await?;
/// let project = tx.find_project(Uuid::new_v4()).await?;
/// assert!(project.is_none());
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::models::activity::ActivityEntry;
use crate::models::invitation::{Invitation, InvitationStatus};
use crate::models::membership::{Membership, ProjectMember, ProjectRole};
use crate::models::notice::Notice;
use crate::models::project::Project;
use crate::models::user::{SystemRole, User};

/// Backend failure
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Entry point to a backend
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a new unit of work
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;

    /// Checks that the backend is reachable
    async fn ping(&self) -> Result<(), StoreError>;
}

/// One transaction against a backend
///
/// Emails passed to lookups must already be normalized
/// (see [`normalize_email`](crate::models::user::normalize_email)).
#[async_trait]
pub trait UnitOfWork: Send {
    // Users

    async fn find_user(&mut self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError>;

    /// Fails with [`StoreError::UniqueViolation`] if the email is taken
    async fn insert_user(&mut self, user: &User) -> Result<(), StoreError>;

    async fn update_user_role(
        &mut self,
        id: Uuid,
        role: SystemRole,
    ) -> Result<Option<User>, StoreError>;

    async fn delete_user(&mut self, id: Uuid) -> Result<bool, StoreError>;

    // Projects

    async fn find_project(&mut self, id: Uuid) -> Result<Option<Project>, StoreError>;

    async fn insert_project(&mut self, project: &Project) -> Result<(), StoreError>;

    /// Writes `project` only if the stored version still equals
    /// `expected_version`. Returns `false` when the guard did not match.
    async fn update_project(
        &mut self,
        project: &Project,
        expected_version: i64,
    ) -> Result<bool, StoreError>;

    async fn delete_project(&mut self, id: Uuid) -> Result<bool, StoreError>;

    /// Projects the user created or holds a membership in, newest first
    async fn list_projects_for_user(&mut self, user_id: Uuid) -> Result<Vec<Project>, StoreError>;

    async fn list_projects_by_role(
        &mut self,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<Vec<Project>, StoreError>;

    async fn list_projects_created_by(
        &mut self,
        user_id: Uuid,
    ) -> Result<Vec<Project>, StoreError>;

    async fn list_all_projects(&mut self) -> Result<Vec<Project>, StoreError>;

    // Memberships

    async fn find_membership(
        &mut self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Membership>, StoreError>;

    /// Fails with [`StoreError::UniqueViolation`] if the pair already exists.
    /// The transaction stays usable after that failure.
    async fn insert_membership(&mut self, membership: &Membership) -> Result<(), StoreError>;

    async fn update_membership_role(
        &mut self,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<bool, StoreError>;

    async fn delete_membership(&mut self, project_id: Uuid, user_id: Uuid)
        -> Result<bool, StoreError>;

    async fn delete_project_memberships(&mut self, project_id: Uuid) -> Result<u64, StoreError>;

    /// Members joined with their user records, oldest membership first
    async fn list_members(&mut self, project_id: Uuid) -> Result<Vec<ProjectMember>, StoreError>;

    async fn list_user_memberships(&mut self, user_id: Uuid)
        -> Result<Vec<Membership>, StoreError>;

    // Invitations

    async fn insert_invitation(&mut self, invitation: &Invitation) -> Result<(), StoreError>;

    /// Looks up an invitation and locks it for the rest of the unit of work
    async fn find_invitation_by_token(
        &mut self,
        token: &str,
    ) -> Result<Option<Invitation>, StoreError>;

    async fn update_invitation_status(
        &mut self,
        id: Uuid,
        status: InvitationStatus,
    ) -> Result<bool, StoreError>;

    async fn list_invitations(&mut self, project_id: Uuid) -> Result<Vec<Invitation>, StoreError>;

    async fn delete_project_invitations(&mut self, project_id: Uuid) -> Result<u64, StoreError>;

    // Boards

    async fn insert_notice(&mut self, notice: &Notice) -> Result<(), StoreError>;

    async fn list_notices(&mut self, project_id: Uuid) -> Result<Vec<Notice>, StoreError>;

    async fn delete_project_notices(&mut self, project_id: Uuid) -> Result<u64, StoreError>;

    async fn insert_activity(&mut self, entry: &ActivityEntry) -> Result<(), StoreError>;

    /// Most recent entries first
    async fn list_activity(
        &mut self,
        project_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ActivityEntry>, StoreError>;

    async fn list_all_activity(&mut self, limit: i64) -> Result<Vec<ActivityEntry>, StoreError>;

    async fn delete_project_activity(&mut self, project_id: Uuid) -> Result<u64, StoreError>;

    /// Makes every write of this unit visible atomically
    fn commit(self: Box<Self>) -> BoxFuture<'static, Result<(), StoreError>>;
}
