/// Notice board posts
///
/// Only the default post written at project creation is produced here; the
/// board's own CRUD lives outside this crate.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE notices (
///     id UUID PRIMARY KEY,
///     project_id UUID NOT NULL REFERENCES projects(id),
///     title TEXT NOT NULL,
///     content TEXT NOT NULL,
///     author_name TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const NOTICE_BOARD: &str = "notice";

const GUIDELINES_TITLE: &str = "Notice board guidelines";

const GUIDELINES_CONTENT: &str = "Use this board for announcements that concern the whole \
project team. Keep posts short, link to details, and pin nothing that will be stale next week.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notice {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub content: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
}

impl Notice {
    /// The post every new project starts with
    pub fn guidelines(project_id: Uuid, author_name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            title: GUIDELINES_TITLE.to_string(),
            content: GUIDELINES_CONTENT.to_string(),
            author_name: author_name.to_string(),
            created_at: Utc::now(),
        }
    }
}
