/// Project authorization engine
///
/// Decides, per call, whether an identity may exercise a [`Capability`] on a
/// project. Nothing is cached: every call re-reads the project, the creator
/// and the caller's membership inside the caller's unit of work, so the
/// decision and the mutation it guards see the same snapshot.
///
/// # Decision order
///
/// 1. Resolve the identity, else `Unauthenticated`
/// 2. Load the project, else `ProjectNotFound`
/// 3. `is_creator`: creator email equals identity email (case-insensitive)
/// 4. Look up the caller's membership role
/// 5. Apply the capability rule; creator status always wins over role
///
/// | capability  | granted when                                  | otherwise                      |
/// |-------------|-----------------------------------------------|--------------------------------|
/// | `Access`    | creator, or any membership                    | `Forbidden`                    |
/// | `Administer`| creator, or role Leader/Admin                 | `Forbidden`                    |
/// | `Leave`     | membership and not creator                    | creator: `InvalidOperation`, else `Forbidden` |
/// | `Kick`      | creator, target is not the creator            | non-creator: `Forbidden`, self: `InvalidOperation` |
///
/// A system-wide ADMIN role is not an override here. Operations that are
/// globally administrable call [`require_system_admin`] explicitly.

use uuid::Uuid;

use super::identity::{resolve, AuthContext, Identity};
use crate::db::store::UnitOfWork;
use crate::error::CollabError;
use crate::models::membership::{Membership, ProjectRole};
use crate::models::project::Project;
use crate::models::user::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Read, view and list
    Access,

    /// Edit metadata, delete, manage invitations and member roles
    Administer,

    /// Remove one's own membership
    Leave,

    /// Remove someone else's membership
    Kick { target_user_id: Uuid },
}

/// Outcome of a successful authorization, carrying what was loaded to decide it
#[derive(Debug, Clone)]
pub struct Grant {
    pub project: Project,
    pub actor: User,
    pub role: Option<ProjectRole>,
    pub is_creator: bool,
}

/// The capability rule on its own, free of storage
pub fn decide(
    capability: Capability,
    is_creator: bool,
    role: Option<ProjectRole>,
    creator_id: Uuid,
) -> Result<(), CollabError> {
    match capability {
        Capability::Access => {
            if is_creator || role.is_some() {
                Ok(())
            } else {
                Err(CollabError::Forbidden("Not a member of this project".into()))
            }
        }
        Capability::Administer => {
            if is_creator || role.map_or(false, |r| r.is_administrative()) {
                Ok(())
            } else {
                Err(CollabError::Forbidden(
                    "Requires the project creator or a leader/admin role".into(),
                ))
            }
        }
        Capability::Leave => {
            if is_creator {
                Err(CollabError::InvalidOperation(
                    "The project creator cannot leave; delete the project instead".into(),
                ))
            } else if role.is_some() {
                Ok(())
            } else {
                Err(CollabError::Forbidden("Not a member of this project".into()))
            }
        }
        Capability::Kick { target_user_id } => {
            if !is_creator {
                Err(CollabError::Forbidden(
                    "Only the project creator can remove members".into(),
                ))
            } else if target_user_id == creator_id {
                Err(CollabError::InvalidOperation(
                    "The project creator cannot be removed".into(),
                ))
            } else {
                Ok(())
            }
        }
    }
}

/// Resolves the caller and authorizes `capability` on `project_id`
pub async fn authorize(
    tx: &mut dyn UnitOfWork,
    project_id: Uuid,
    auth: &AuthContext,
    capability: Capability,
) -> Result<Grant, CollabError> {
    let identity = resolve(auth)?;
    authorize_identity(tx, project_id, &identity, capability).await
}

/// Authorizes an already-resolved identity
///
/// # Errors
///
/// `ProjectNotFound`, `Forbidden`, `InvalidOperation` per the table above,
/// or `Store` on backend failure.
pub async fn authorize_identity(
    tx: &mut dyn UnitOfWork,
    project_id: Uuid,
    identity: &Identity,
    capability: Capability,
) -> Result<Grant, CollabError> {
    let project = tx
        .find_project(project_id)
        .await?
        .ok_or(CollabError::ProjectNotFound(project_id))?;

    let is_creator = tx
        .find_user(project.creator_id)
        .await?
        .map_or(false, |creator| identity.matches(&creator.email));

    let actor = tx.find_user_by_email(identity.email()).await?;
    let role = match &actor {
        Some(user) => Membership::role_of(tx, project.id, user.id).await?,
        None => None,
    };

    decide(capability, is_creator, role, project.creator_id)?;

    let actor = actor.ok_or_else(|| CollabError::Forbidden("No account for this identity".into()))?;

    tracing::debug!(
        project_id = %project.id,
        user_id = %actor.id,
        capability = ?capability,
        is_creator,
        "Capability granted"
    );

    Ok(Grant {
        project,
        actor,
        role,
        is_creator,
    })
}

/// Loads the caller's account, failing `AccountNotFound` if there is none
pub async fn require_account(
    tx: &mut dyn UnitOfWork,
    identity: &Identity,
) -> Result<User, CollabError> {
    tx.find_user_by_email(identity.email())
        .await?
        .ok_or_else(|| CollabError::AccountNotFound(identity.email().to_string()))
}

/// Requires the system-wide ADMIN role, read fresh from storage
pub async fn require_system_admin(
    tx: &mut dyn UnitOfWork,
    auth: &AuthContext,
) -> Result<User, CollabError> {
    let identity = resolve(auth)?;
    let user = tx
        .find_user_by_email(identity.email())
        .await?
        .filter(|user| user.role.is_admin())
        .ok_or_else(|| CollabError::Forbidden("Requires system administrator".into()))?;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creator() -> Uuid {
        Uuid::from_u128(1)
    }

    #[test]
    fn test_creator_without_membership_has_access_and_admin() {
        assert!(decide(Capability::Access, true, None, creator()).is_ok());
        assert!(decide(Capability::Administer, true, None, creator()).is_ok());
    }

    #[test]
    fn test_member_role_access_only() {
        let role = Some(ProjectRole::Member);
        assert!(decide(Capability::Access, false, role, creator()).is_ok());
        assert!(matches!(
            decide(Capability::Administer, false, role, creator()),
            Err(CollabError::Forbidden(_))
        ));
    }

    #[test]
    fn test_leader_and_admin_roles_administer() {
        for role in [ProjectRole::Leader, ProjectRole::Admin] {
            assert!(decide(Capability::Administer, false, Some(role), creator()).is_ok());
        }
    }

    #[test]
    fn test_non_member_denied() {
        assert!(matches!(
            decide(Capability::Access, false, None, creator()),
            Err(CollabError::Forbidden(_))
        ));
        assert!(matches!(
            decide(Capability::Leave, false, None, creator()),
            Err(CollabError::Forbidden(_))
        ));
    }

    #[test]
    fn test_creator_cannot_leave_even_with_role() {
        for role in [None, Some(ProjectRole::Leader)] {
            assert!(matches!(
                decide(Capability::Leave, true, role, creator()),
                Err(CollabError::InvalidOperation(_))
            ));
        }
        assert!(decide(Capability::Leave, false, Some(ProjectRole::Member), creator()).is_ok());
    }

    #[test]
    fn test_kick_is_creator_only() {
        let target = Uuid::from_u128(2);
        assert!(decide(Capability::Kick { target_user_id: target }, true, None, creator()).is_ok());

        for role in [ProjectRole::Leader, ProjectRole::Admin] {
            assert!(matches!(
                decide(Capability::Kick { target_user_id: target }, false, Some(role), creator()),
                Err(CollabError::Forbidden(_))
            ));
        }
    }

    #[test]
    fn test_kick_creator_is_invalid() {
        assert!(matches!(
            decide(
                Capability::Kick { target_user_id: creator() },
                true,
                Some(ProjectRole::Leader),
                creator()
            ),
            Err(CollabError::InvalidOperation(_))
        ));
        // a non-creator aiming at the creator is simply forbidden
        assert!(matches!(
            decide(
                Capability::Kick { target_user_id: creator() },
                false,
                Some(ProjectRole::Admin),
                creator()
            ),
            Err(CollabError::Forbidden(_))
        ));
    }
}
