/// Postgres storage backend
///
/// Each unit of work is one Postgres transaction at READ COMMITTED. On top of
/// that:
///
/// - project writes are conditional on the version the caller read
///   (`UPDATE ... WHERE id = $1 AND version = $n`), so concurrent writers
///   cannot both succeed
/// - membership lookups take `FOR SHARE`, so a concurrent revocation waits for
///   the transaction that relied on the membership
/// - invitation lookups by token take `FOR UPDATE`, so concurrent accepts of
///   one token run one after the other
/// - membership inserts use `ON CONFLICT DO NOTHING` against the composite
///   primary key, which reports a duplicate without aborting the transaction
///
/// # Example
///
/// ```no_run
/// use collabhub_shared::db::pool::DatabaseConfig;
/// use collabhub_shared::db::postgres::PgStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = PgStore::connect(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use futures::future::BoxFuture;
use sqlx::postgres::{PgPool, Postgres};
use sqlx::Transaction;
use tracing::info;
use uuid::Uuid;

use super::migrations::run_migrations;
use super::pool::{create_pool, health_check, DatabaseConfig};
use super::store::{Store, StoreError, UnitOfWork};
use crate::models::activity::ActivityEntry;
use crate::models::invitation::{Invitation, InvitationStatus};
use crate::models::membership::{Membership, ProjectMember, ProjectRole};
use crate::models::notice::Notice;
use crate::models::project::Project;
use crate::models::user::{SystemRole, User};

const USER_COLUMNS: &str =
    "id, email, name, password_hash, role, provider, provider_id, created_at, updated_at";

const PROJECT_COLUMNS: &str = "id, name, description, start_date, end_date, status, creator_id, \
     version, created_at, updated_at";

const INVITATION_COLUMNS: &str = "id, email, project_id, token, status, created_at, expires_at";

const ACTIVITY_COLUMNS: &str =
    "id, project_id, board_name, subject_id, actor, actor_name, action, action_at";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the pool and applies pending migrations
    pub async fn connect(config: DatabaseConfig) -> Result<Self, StoreError> {
        let pool = create_pool(config).await?;
        run_migrations(&pool).await?;
        info!("Postgres store ready");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        health_check(&self.pool).await?;
        Ok(())
    }
}

struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

fn unique_violation(err: sqlx::Error, constraint: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::UniqueViolation(constraint.to_string())
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn find_user(&mut self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(user)
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(user)
    }

    async fn insert_user(&mut self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, password_hash, role, provider, provider_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(&user.provider)
        .bind(&user.provider_id)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| unique_violation(e, "users_email_key"))?;

        Ok(())
    }

    async fn update_user_role(
        &mut self,
        id: Uuid,
        role: SystemRole,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(user)
    }

    async fn delete_user(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_project(&mut self, id: Uuid) -> Result<Option<Project>, StoreError> {
        let project = sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects WHERE id = $1",
            PROJECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(project)
    }

    async fn insert_project(&mut self, project: &Project) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO projects (id, name, description, start_date, end_date, status, creator_id, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(project.id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.start_date)
        .bind(project.end_date)
        .bind(project.status)
        .bind(project.creator_id)
        .bind(project.version)
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn update_project(
        &mut self,
        project: &Project,
        expected_version: i64,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE projects
            SET name = $2, description = $3, start_date = $4, end_date = $5,
                status = $6, creator_id = $7, version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $8
            "#,
        )
        .bind(project.id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.start_date)
        .bind(project.end_date)
        .bind(project.status)
        .bind(project.creator_id)
        .bind(expected_version)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_project(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_projects_for_user(&mut self, user_id: Uuid) -> Result<Vec<Project>, StoreError> {
        let projects = sqlx::query_as::<_, Project>(&format!(
            r#"
            SELECT {} FROM projects p
            WHERE p.creator_id = $1
               OR EXISTS (SELECT 1 FROM project_members m WHERE m.project_id = p.id AND m.user_id = $1)
            ORDER BY p.created_at DESC
            "#,
            PROJECT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(projects)
    }

    async fn list_projects_by_role(
        &mut self,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<Vec<Project>, StoreError> {
        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT p.id, p.name, p.description, p.start_date, p.end_date, p.status,
                   p.creator_id, p.version, p.created_at, p.updated_at
            FROM projects p
            INNER JOIN project_members m ON m.project_id = p.id
            WHERE m.user_id = $1 AND m.role = $2
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(role)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(projects)
    }

    async fn list_projects_created_by(
        &mut self,
        user_id: Uuid,
    ) -> Result<Vec<Project>, StoreError> {
        let projects = sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects WHERE creator_id = $1 ORDER BY created_at DESC",
            PROJECT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(projects)
    }

    async fn list_all_projects(&mut self) -> Result<Vec<Project>, StoreError> {
        let projects = sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects ORDER BY created_at DESC",
            PROJECT_COLUMNS
        ))
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(projects)
    }

    async fn find_membership(
        &mut self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Membership>, StoreError> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            SELECT project_id, user_id, role, joined_at
            FROM project_members
            WHERE project_id = $1 AND user_id = $2
            FOR SHARE
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(membership)
    }

    async fn insert_membership(&mut self, membership: &Membership) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO project_members (project_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (project_id, user_id) DO NOTHING
            "#,
        )
        .bind(membership.project_id)
        .bind(membership.user_id)
        .bind(membership.role)
        .bind(membership.joined_at)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::UniqueViolation("project_members_pkey".into()));
        }
        Ok(())
    }

    async fn update_membership_role(
        &mut self,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE project_members SET role = $3 WHERE project_id = $1 AND user_id = $2",
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_membership(
        &mut self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, StoreError> {
        let result =
            sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
                .bind(project_id)
                .bind(user_id)
                .execute(&mut *self.tx)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_project_memberships(&mut self, project_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM project_members WHERE project_id = $1")
            .bind(project_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn list_members(&mut self, project_id: Uuid) -> Result<Vec<ProjectMember>, StoreError> {
        let members = sqlx::query_as::<_, ProjectMember>(
            r#"
            SELECT m.user_id, u.email, u.name, m.role, m.joined_at
            FROM project_members m
            INNER JOIN users u ON u.id = m.user_id
            WHERE m.project_id = $1
            ORDER BY m.joined_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(members)
    }

    async fn list_user_memberships(
        &mut self,
        user_id: Uuid,
    ) -> Result<Vec<Membership>, StoreError> {
        let memberships = sqlx::query_as::<_, Membership>(
            "SELECT project_id, user_id, role, joined_at FROM project_members WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(memberships)
    }

    async fn insert_invitation(&mut self, invitation: &Invitation) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO invitations (id, email, project_id, token, status, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(invitation.id)
        .bind(&invitation.email)
        .bind(invitation.project_id)
        .bind(&invitation.token)
        .bind(invitation.status)
        .bind(invitation.created_at)
        .bind(invitation.expires_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| unique_violation(e, "invitations_token_key"))?;

        Ok(())
    }

    async fn find_invitation_by_token(
        &mut self,
        token: &str,
    ) -> Result<Option<Invitation>, StoreError> {
        let invitation = sqlx::query_as::<_, Invitation>(&format!(
            "SELECT {} FROM invitations WHERE token = $1 FOR UPDATE",
            INVITATION_COLUMNS
        ))
        .bind(token)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(invitation)
    }

    async fn update_invitation_status(
        &mut self,
        id: Uuid,
        status: InvitationStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE invitations SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_invitations(&mut self, project_id: Uuid) -> Result<Vec<Invitation>, StoreError> {
        let invitations = sqlx::query_as::<_, Invitation>(&format!(
            "SELECT {} FROM invitations WHERE project_id = $1 ORDER BY created_at DESC",
            INVITATION_COLUMNS
        ))
        .bind(project_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(invitations)
    }

    async fn delete_project_invitations(&mut self, project_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM invitations WHERE project_id = $1")
            .bind(project_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn insert_notice(&mut self, notice: &Notice) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO notices (id, project_id, title, content, author_name, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(notice.id)
        .bind(notice.project_id)
        .bind(&notice.title)
        .bind(&notice.content)
        .bind(&notice.author_name)
        .bind(notice.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn list_notices(&mut self, project_id: Uuid) -> Result<Vec<Notice>, StoreError> {
        let notices = sqlx::query_as::<_, Notice>(
            r#"
            SELECT id, project_id, title, content, author_name, created_at
            FROM notices
            WHERE project_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(project_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(notices)
    }

    async fn delete_project_notices(&mut self, project_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM notices WHERE project_id = $1")
            .bind(project_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn insert_activity(&mut self, entry: &ActivityEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO activity_log (id, project_id, board_name, subject_id, actor, actor_name, action, action_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id)
        .bind(entry.project_id)
        .bind(&entry.board_name)
        .bind(entry.subject_id)
        .bind(&entry.actor)
        .bind(&entry.actor_name)
        .bind(&entry.action)
        .bind(entry.action_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn list_activity(
        &mut self,
        project_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ActivityEntry>, StoreError> {
        let entries = sqlx::query_as::<_, ActivityEntry>(&format!(
            "SELECT {} FROM activity_log WHERE project_id = $1 ORDER BY action_at DESC LIMIT $2",
            ACTIVITY_COLUMNS
        ))
        .bind(project_id)
        .bind(limit)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(entries)
    }

    async fn list_all_activity(&mut self, limit: i64) -> Result<Vec<ActivityEntry>, StoreError> {
        let entries = sqlx::query_as::<_, ActivityEntry>(&format!(
            "SELECT {} FROM activity_log ORDER BY action_at DESC LIMIT $1",
            ACTIVITY_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(entries)
    }

    async fn delete_project_activity(&mut self, project_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM activity_log WHERE project_id = $1")
            .bind(project_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    fn commit(self: Box<Self>) -> BoxFuture<'static, Result<(), StoreError>> {
        let PgUnitOfWork { tx } = *self;
        Box::pin(async move {
            tx.commit().await?;
            Ok(())
        })
    }
}
