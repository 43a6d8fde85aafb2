/// Project memberships
///
/// A membership maps a (project, user) pair to a project-scoped role. The
/// pair is the identity of the row: at most one membership exists per pair.
/// Every write path goes through the associated functions on [`Membership`],
/// which check existence before mutating and translate backend uniqueness
/// failures into [`CollabError::DuplicateMembership`].
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_role AS ENUM ('leader', 'member', 'admin');
///
/// CREATE TABLE project_members (
///     project_id UUID NOT NULL REFERENCES projects(id),
///     user_id UUID NOT NULL REFERENCES users(id),
///     role project_role NOT NULL DEFAULT 'member',
///     joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (project_id, user_id)
/// );
/// ```
///
/// # Roles
///
/// - **leader**: granted to the creator at project creation; administrative
/// - **admin**: administrative
/// - **member**: access only
///
/// # Example
///
/// ```no_run
/// use collabhub_shared::db::memory::MemoryStore;
/// use collabhub_shared::db::store::Store;
/// use collabhub_shared::models::membership::{Membership, ProjectRole};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let (project_id, user_id) = (Uuid::new_v4(), Uuid::new_v4());
///
/// let mut tx = store.begin().await?;
/// Membership::add(tx.as_mut(), project_id, user_id, ProjectRole::Member).await?;
/// assert_eq!(
///     Membership::role_of(tx.as_mut(), project_id, user_id).await?,
///     Some(ProjectRole::Member)
/// );
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::store::{StoreError, UnitOfWork};
use crate::error::CollabError;

/// Project-scoped role, distinct from the system-wide [`SystemRole`](crate::models::user::SystemRole)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    Leader,
    Member,
    Admin,
}

impl ProjectRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Leader => "leader",
            ProjectRole::Member => "member",
            ProjectRole::Admin => "admin",
        }
    }

    /// Leader and Admin may edit, delete, invite and manage roles
    pub fn is_administrative(&self) -> bool {
        matches!(self, ProjectRole::Leader | ProjectRole::Admin)
    }
}

impl std::str::FromStr for ProjectRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "leader" => Ok(ProjectRole::Leader),
            "member" => Ok(ProjectRole::Member),
            "admin" => Ok(ProjectRole::Admin),
            other => Err(format!("Unknown project role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: ProjectRole,
    pub joined_at: DateTime<Utc>,
}

/// A membership joined with the member's user record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectMember {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: ProjectRole,
    pub joined_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(project_id: Uuid, user_id: Uuid, role: ProjectRole) -> Self {
        Self {
            project_id,
            user_id,
            role,
            joined_at: Utc::now(),
        }
    }

    /// Adds a user to a project
    ///
    /// # Errors
    ///
    /// - `DuplicateMembership` if the pair already exists, whether detected by
    ///   the existence check or by the backend's uniqueness constraint
    /// - `Store` on backend failure
    pub async fn add(
        tx: &mut dyn UnitOfWork,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<Membership, CollabError> {
        if tx.find_membership(project_id, user_id).await?.is_some() {
            return Err(CollabError::DuplicateMembership);
        }

        let membership = Membership::new(project_id, user_id, role);
        match tx.insert_membership(&membership).await {
            Ok(()) => Ok(membership),
            Err(StoreError::UniqueViolation(_)) => Err(CollabError::DuplicateMembership),
            Err(e) => Err(e.into()),
        }
    }

    /// Looks up the role for a (project, user) pair
    pub async fn role_of(
        tx: &mut dyn UnitOfWork,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectRole>, CollabError> {
        Ok(tx
            .find_membership(project_id, user_id)
            .await?
            .map(|m| m.role))
    }

    pub async fn is_member(
        tx: &mut dyn UnitOfWork,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, CollabError> {
        Ok(Self::role_of(tx, project_id, user_id).await?.is_some())
    }

    /// Removes a membership
    ///
    /// # Errors
    ///
    /// Returns `MembershipNotFound` if the pair does not exist; removal is not
    /// idempotent.
    pub async fn remove(
        tx: &mut dyn UnitOfWork,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), CollabError> {
        if tx.find_membership(project_id, user_id).await?.is_none() {
            return Err(CollabError::MembershipNotFound);
        }

        if !tx.delete_membership(project_id, user_id).await? {
            return Err(CollabError::MembershipNotFound);
        }
        Ok(())
    }

    /// Changes the role of an existing membership
    pub async fn change_role(
        tx: &mut dyn UnitOfWork,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<(), CollabError> {
        if !tx.update_membership_role(project_id, user_id, role).await? {
            return Err(CollabError::MembershipNotFound);
        }
        Ok(())
    }
}
