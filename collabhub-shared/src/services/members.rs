/// Member management: listing, role changes, and kicks
///
/// Kicking is stricter than other administrative actions: only the project
/// creator may remove someone, and never the creator themself. Role changes
/// follow the ordinary administrative rule (creator, Leader or Admin).

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::audit::AuditRecorder;
use crate::auth::authorization::{authorize, Capability};
use crate::auth::identity::AuthContext;
use crate::db::store::Store;
use crate::error::CollabError;
use crate::models::activity::{ActivityAction, ActivityEntry, MEMBER_BOARD};
use crate::models::membership::{Membership, ProjectMember, ProjectRole};

#[derive(Clone)]
pub struct MemberService {
    store: Arc<dyn Store>,
    audit: AuditRecorder,
}

impl MemberService {
    pub fn new(store: Arc<dyn Store>, audit: AuditRecorder) -> Self {
        Self { store, audit }
    }

    pub async fn list(
        &self,
        auth: &AuthContext,
        project_id: Uuid,
    ) -> Result<Vec<ProjectMember>, CollabError> {
        let mut tx = self.store.begin().await?;
        authorize(tx.as_mut(), project_id, auth, Capability::Access).await?;
        Ok(tx.list_members(project_id).await?)
    }

    /// Changes another member's project role
    ///
    /// # Errors
    ///
    /// - `Forbidden` without the administrative capability
    /// - `InvalidOperation` when targeting the creator's membership
    /// - `MembershipNotFound` if the target is not a member
    pub async fn update_role(
        &self,
        auth: &AuthContext,
        project_id: Uuid,
        target_user_id: Uuid,
        role: ProjectRole,
    ) -> Result<(), CollabError> {
        let mut tx = self.store.begin().await?;
        let grant = authorize(tx.as_mut(), project_id, auth, Capability::Administer).await?;

        if target_user_id == grant.project.creator_id && role != ProjectRole::Leader {
            return Err(CollabError::InvalidOperation(
                "The project creator always holds the leader role".into(),
            ));
        }

        Membership::change_role(tx.as_mut(), project_id, target_user_id, role).await?;
        tx.commit().await?;

        info!(
            project_id = %project_id,
            user_id = %target_user_id,
            role = role.as_str(),
            "Member role changed"
        );
        self.audit
            .record(ActivityEntry::new(
                project_id,
                MEMBER_BOARD,
                Some(target_user_id),
                &grant.actor.email,
                &grant.actor.name,
                ActivityAction::RoleChange,
            ))
            .await;

        Ok(())
    }

    /// Removes another member from the project
    ///
    /// Invitation records are left untouched.
    ///
    /// # Errors
    ///
    /// - `Forbidden` unless the caller is the creator
    /// - `InvalidOperation` if the target is the creator
    /// - `MembershipNotFound` if the target is not a member
    pub async fn kick(
        &self,
        auth: &AuthContext,
        project_id: Uuid,
        target_user_id: Uuid,
    ) -> Result<(), CollabError> {
        let mut tx = self.store.begin().await?;
        let grant = authorize(
            tx.as_mut(),
            project_id,
            auth,
            Capability::Kick { target_user_id },
        )
        .await?;

        Membership::remove(tx.as_mut(), project_id, target_user_id).await?;
        tx.commit().await?;

        info!(project_id = %project_id, user_id = %target_user_id, "Member removed");
        self.audit
            .record(ActivityEntry::new(
                project_id,
                MEMBER_BOARD,
                Some(target_user_id),
                &grant.actor.email,
                &grant.actor.name,
                ActivityAction::Kick,
            ))
            .await;

        Ok(())
    }
}
