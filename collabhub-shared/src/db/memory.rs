/// In-memory storage backend
///
/// Holds all state behind one async mutex. A unit of work takes the lock for
/// its whole lifetime and edits a private copy of the state; `commit` writes
/// the copy back, dropping the unit discards it. Units of work are therefore
/// fully serialized, which gives the same atomicity and conditional-update
/// behaviour the Postgres backend gets from transactions.
///
/// Used by the test suites and by development runs without `DATABASE_URL`.
/// Data does not survive a restart.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::store::{Store, StoreError, UnitOfWork};
use crate::models::activity::ActivityEntry;
use crate::models::invitation::{Invitation, InvitationStatus};
use crate::models::membership::{Membership, ProjectMember, ProjectRole};
use crate::models::notice::Notice;
use crate::models::project::Project;
use crate::models::user::{SystemRole, User};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    projects: HashMap<Uuid, Project>,
    memberships: HashMap<(Uuid, Uuid), Membership>,
    invitations: HashMap<Uuid, Invitation>,
    notices: Vec<Notice>,
    activity: Vec<ActivityEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork { guard, working }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

fn newest_first(mut projects: Vec<Project>) -> Vec<Project> {
    projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    projects
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn find_user(&mut self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.working.users.get(&id).cloned())
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .working
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn insert_user(&mut self, user: &User) -> Result<(), StoreError> {
        if self.working.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation("users.email".into()));
        }
        self.working.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user_role(
        &mut self,
        id: Uuid,
        role: SystemRole,
    ) -> Result<Option<User>, StoreError> {
        Ok(self.working.users.get_mut(&id).map(|user| {
            user.role = role;
            user.updated_at = chrono::Utc::now();
            user.clone()
        }))
    }

    async fn delete_user(&mut self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.working.users.remove(&id).is_some())
    }

    async fn find_project(&mut self, id: Uuid) -> Result<Option<Project>, StoreError> {
        Ok(self.working.projects.get(&id).cloned())
    }

    async fn insert_project(&mut self, project: &Project) -> Result<(), StoreError> {
        self.working.projects.insert(project.id, project.clone());
        Ok(())
    }

    async fn update_project(
        &mut self,
        project: &Project,
        expected_version: i64,
    ) -> Result<bool, StoreError> {
        match self.working.projects.get_mut(&project.id) {
            Some(stored) if stored.version == expected_version => {
                *stored = project.clone();
                stored.version = expected_version + 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_project(&mut self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.working.projects.remove(&id).is_some())
    }

    async fn list_projects_for_user(&mut self, user_id: Uuid) -> Result<Vec<Project>, StoreError> {
        let memberships = &self.working.memberships;
        let projects = self
            .working
            .projects
            .values()
            .filter(|p| p.creator_id == user_id || memberships.contains_key(&(p.id, user_id)))
            .cloned()
            .collect();
        Ok(newest_first(projects))
    }

    async fn list_projects_by_role(
        &mut self,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<Vec<Project>, StoreError> {
        let projects = self
            .working
            .memberships
            .values()
            .filter(|m| m.user_id == user_id && m.role == role)
            .filter_map(|m| self.working.projects.get(&m.project_id))
            .cloned()
            .collect();
        Ok(newest_first(projects))
    }

    async fn list_projects_created_by(
        &mut self,
        user_id: Uuid,
    ) -> Result<Vec<Project>, StoreError> {
        let projects = self
            .working
            .projects
            .values()
            .filter(|p| p.creator_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(projects))
    }

    async fn list_all_projects(&mut self) -> Result<Vec<Project>, StoreError> {
        Ok(newest_first(self.working.projects.values().cloned().collect()))
    }

    async fn find_membership(
        &mut self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Membership>, StoreError> {
        Ok(self.working.memberships.get(&(project_id, user_id)).cloned())
    }

    async fn insert_membership(&mut self, membership: &Membership) -> Result<(), StoreError> {
        let key = (membership.project_id, membership.user_id);
        if self.working.memberships.contains_key(&key) {
            return Err(StoreError::UniqueViolation("project_members_pkey".into()));
        }
        self.working.memberships.insert(key, membership.clone());
        Ok(())
    }

    async fn update_membership_role(
        &mut self,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<bool, StoreError> {
        Ok(self
            .working
            .memberships
            .get_mut(&(project_id, user_id))
            .map(|m| m.role = role)
            .is_some())
    }

    async fn delete_membership(
        &mut self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, StoreError> {
        Ok(self
            .working
            .memberships
            .remove(&(project_id, user_id))
            .is_some())
    }

    async fn delete_project_memberships(&mut self, project_id: Uuid) -> Result<u64, StoreError> {
        let before = self.working.memberships.len();
        self.working
            .memberships
            .retain(|(pid, _), _| *pid != project_id);
        Ok((before - self.working.memberships.len()) as u64)
    }

    async fn list_members(&mut self, project_id: Uuid) -> Result<Vec<ProjectMember>, StoreError> {
        let mut members: Vec<ProjectMember> = self
            .working
            .memberships
            .values()
            .filter(|m| m.project_id == project_id)
            .filter_map(|m| {
                self.working.users.get(&m.user_id).map(|u| ProjectMember {
                    user_id: u.id,
                    email: u.email.clone(),
                    name: u.name.clone(),
                    role: m.role,
                    joined_at: m.joined_at,
                })
            })
            .collect();
        members.sort_by(|a, b| a.joined_at.cmp(&b.joined_at));
        Ok(members)
    }

    async fn list_user_memberships(
        &mut self,
        user_id: Uuid,
    ) -> Result<Vec<Membership>, StoreError> {
        Ok(self
            .working
            .memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_invitation(&mut self, invitation: &Invitation) -> Result<(), StoreError> {
        if self
            .working
            .invitations
            .values()
            .any(|i| i.token == invitation.token)
        {
            return Err(StoreError::UniqueViolation("invitations.token".into()));
        }
        self.working
            .invitations
            .insert(invitation.id, invitation.clone());
        Ok(())
    }

    async fn find_invitation_by_token(
        &mut self,
        token: &str,
    ) -> Result<Option<Invitation>, StoreError> {
        Ok(self
            .working
            .invitations
            .values()
            .find(|i| i.token == token)
            .cloned())
    }

    async fn update_invitation_status(
        &mut self,
        id: Uuid,
        status: InvitationStatus,
    ) -> Result<bool, StoreError> {
        Ok(self
            .working
            .invitations
            .get_mut(&id)
            .map(|i| i.status = status)
            .is_some())
    }

    async fn list_invitations(&mut self, project_id: Uuid) -> Result<Vec<Invitation>, StoreError> {
        let mut invitations: Vec<Invitation> = self
            .working
            .invitations
            .values()
            .filter(|i| i.project_id == project_id)
            .cloned()
            .collect();
        invitations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invitations)
    }

    async fn delete_project_invitations(&mut self, project_id: Uuid) -> Result<u64, StoreError> {
        let before = self.working.invitations.len();
        self.working
            .invitations
            .retain(|_, i| i.project_id != project_id);
        Ok((before - self.working.invitations.len()) as u64)
    }

    async fn insert_notice(&mut self, notice: &Notice) -> Result<(), StoreError> {
        self.working.notices.push(notice.clone());
        Ok(())
    }

    async fn list_notices(&mut self, project_id: Uuid) -> Result<Vec<Notice>, StoreError> {
        let mut notices: Vec<Notice> = self
            .working
            .notices
            .iter()
            .filter(|n| n.project_id == project_id)
            .cloned()
            .collect();
        notices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notices)
    }

    async fn delete_project_notices(&mut self, project_id: Uuid) -> Result<u64, StoreError> {
        let before = self.working.notices.len();
        self.working.notices.retain(|n| n.project_id != project_id);
        Ok((before - self.working.notices.len()) as u64)
    }

    async fn insert_activity(&mut self, entry: &ActivityEntry) -> Result<(), StoreError> {
        self.working.activity.push(entry.clone());
        Ok(())
    }

    async fn list_activity(
        &mut self,
        project_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ActivityEntry>, StoreError> {
        // entries are appended in time order
        Ok(self
            .working
            .activity
            .iter()
            .rev()
            .filter(|e| e.project_id == project_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn list_all_activity(&mut self, limit: i64) -> Result<Vec<ActivityEntry>, StoreError> {
        Ok(self
            .working
            .activity
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn delete_project_activity(&mut self, project_id: Uuid) -> Result<u64, StoreError> {
        let before = self.working.activity.len();
        self.working.activity.retain(|e| e.project_id != project_id);
        Ok((before - self.working.activity.len()) as u64)
    }

    fn commit(self: Box<Self>) -> BoxFuture<'static, Result<(), StoreError>> {
        let MemoryUnitOfWork { mut guard, working } = *self;
        *guard = working;
        Box::pin(async { Ok(()) })
    }
}
