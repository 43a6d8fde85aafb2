/// Project activity log
///
/// Append-only record of who did what to a project. Entries deliberately do
/// not reference `projects` by foreign key so the deletion entry outlives the
/// project it describes.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE activity_log (
///     id UUID PRIMARY KEY,
///     project_id UUID NOT NULL,
///     board_name TEXT NOT NULL,
///     subject_id UUID,
///     actor TEXT NOT NULL,
///     actor_name TEXT NOT NULL,
///     action TEXT NOT NULL,
///     action_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE INDEX idx_activity_log_project ON activity_log(project_id, action_at DESC);
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Board name used for entries about the project itself
pub const PROJECT_BOARD: &str = "project";

/// Board name used for entries about memberships and invitations
pub const MEMBER_BOARD: &str = "member";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Create,
    Update,
    Delete,
    Invite,
    Join,
    Leave,
    Kick,
    RoleChange,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Create => "create",
            ActivityAction::Update => "update",
            ActivityAction::Delete => "delete",
            ActivityAction::Invite => "invite",
            ActivityAction::Join => "join",
            ActivityAction::Leave => "leave",
            ActivityAction::Kick => "kick",
            ActivityAction::RoleChange => "role_change",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub project_id: Uuid,

    /// Which board the subject lives on (`project`, `member`, `notice`)
    pub board_name: String,

    /// The affected record, when there is one
    pub subject_id: Option<Uuid>,

    /// Acting user's email
    pub actor: String,

    pub actor_name: String,

    pub action: String,

    pub action_at: DateTime<Utc>,
}

impl ActivityEntry {
    pub fn new(
        project_id: Uuid,
        board_name: &str,
        subject_id: Option<Uuid>,
        actor: &str,
        actor_name: &str,
        action: ActivityAction,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            board_name: board_name.to_string(),
            subject_id,
            actor: actor.to_string(),
            actor_name: actor_name.to_string(),
            action: action.as_str().to_string(),
            action_at: Utc::now(),
        }
    }
}
