/// Post-commit activity recording
///
/// Operations record what happened after their own unit of work has
/// committed, in a separate short unit of work. A failure here is logged and
/// dropped; it never fails or rolls back the operation being recorded.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::db::store::{Store, StoreError};
use crate::models::activity::ActivityEntry;

#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn Store>,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn record(&self, entry: ActivityEntry) {
        match self.try_record(&entry).await {
            Ok(()) => debug!(
                project_id = %entry.project_id,
                action = %entry.action,
                actor = %entry.actor,
                "Activity recorded"
            ),
            Err(e) => warn!(
                project_id = %entry.project_id,
                action = %entry.action,
                error = %e,
                "Failed to record activity"
            ),
        }
    }

    async fn try_record(&self, entry: &ActivityEntry) -> Result<(), StoreError> {
        let mut tx = self.store.begin().await?;
        tx.insert_activity(entry).await?;
        tx.commit().await
    }
}
