/// Read access to project boards: the activity log and notices

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::authorization::{authorize, require_system_admin, Capability};
use crate::auth::identity::AuthContext;
use crate::db::store::Store;
use crate::error::CollabError;
use crate::models::activity::ActivityEntry;
use crate::models::notice::Notice;

pub const DEFAULT_ACTIVITY_LIMIT: i64 = 50;

pub const MAX_ACTIVITY_LIMIT: i64 = 200;

#[derive(Clone)]
pub struct BoardService {
    store: Arc<dyn Store>,
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
        .clamp(1, MAX_ACTIVITY_LIMIT)
}

impl BoardService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Most recent activity on a project the caller can access
    pub async fn recent_activity(
        &self,
        auth: &AuthContext,
        project_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<ActivityEntry>, CollabError> {
        let mut tx = self.store.begin().await?;
        authorize(tx.as_mut(), project_id, auth, Capability::Access).await?;
        Ok(tx.list_activity(project_id, clamp_limit(limit)).await?)
    }

    /// Most recent activity across every project; requires the system ADMIN role
    pub async fn all_activity(
        &self,
        auth: &AuthContext,
        limit: Option<i64>,
    ) -> Result<Vec<ActivityEntry>, CollabError> {
        let mut tx = self.store.begin().await?;
        require_system_admin(tx.as_mut(), auth).await?;
        Ok(tx.list_all_activity(clamp_limit(limit)).await?)
    }

    pub async fn notices(
        &self,
        auth: &AuthContext,
        project_id: Uuid,
    ) -> Result<Vec<Notice>, CollabError> {
        let mut tx = self.store.begin().await?;
        authorize(tx.as_mut(), project_id, auth, Capability::Access).await?;
        Ok(tx.list_notices(project_id).await?)
    }
}
