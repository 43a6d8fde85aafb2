/// Projects
///
/// A project is the collaboration workspace every membership, invitation,
/// notice and activity entry hangs off. Its `version` counter starts at 0 and
/// is incremented by every mutation; writers must present the version they
/// last observed (see [`ProjectService`](crate::services::projects::ProjectService)).
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_status AS ENUM
///     ('PLANNING', 'IN_PROGRESS', 'COMPLETED', 'ON_HOLD', 'CANCELLED');
///
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY,
///     name TEXT NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     start_date DATE NOT NULL,
///     end_date DATE NOT NULL,
///     status project_status NOT NULL DEFAULT 'PLANNING',
///     creator_id UUID NOT NULL REFERENCES users(id),
///     version BIGINT NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::CollabError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Planning,
    InProgress,
    Completed,
    OnHold,
    Cancelled,
}

impl Default for ProjectStatus {
    fn default() -> Self {
        ProjectStatus::Planning
    }
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planning => "PLANNING",
            ProjectStatus::InProgress => "IN_PROGRESS",
            ProjectStatus::Completed => "COMPLETED",
            ProjectStatus::OnHold => "ON_HOLD",
            ProjectStatus::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: ProjectStatus,

    /// Owning user; implicitly authorized for everything except leaving
    pub creator_id: Uuid,

    /// Optimistic concurrency counter
    pub version: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Project fields as submitted by a client, for both create and update
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_date_range", skip_on_field_errors = false))]
pub struct ProjectInput {
    #[validate(length(min = 1, max = 100, message = "Project name must be 1-100 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: String,

    pub start_date: NaiveDate,

    pub end_date: NaiveDate,

    #[serde(default)]
    pub status: ProjectStatus,
}

fn validate_date_range(input: &ProjectInput) -> Result<(), ValidationError> {
    if input.end_date < input.start_date {
        let mut err = ValidationError::new("date_range");
        err.message = Some("End date must not precede start date".into());
        return Err(err);
    }
    Ok(())
}

impl ProjectInput {
    /// Validates the input and returns a trimmed copy
    pub fn normalized(&self) -> Result<ProjectInput, CollabError> {
        let input = ProjectInput {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            ..self.clone()
        };
        input.validate()?;
        Ok(input)
    }
}

impl Project {
    /// Materializes a new project at version 0
    pub fn from_input(input: ProjectInput, creator_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            start_date: input.start_date,
            end_date: input.end_date,
            status: input.status,
            creator_id,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the project with `input` applied and the version bumped
    pub fn with_changes(&self, input: ProjectInput) -> Self {
        Self {
            name: input.name,
            description: input.description,
            start_date: input.start_date,
            end_date: input.end_date,
            status: input.status,
            version: self.version + 1,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, start: (i32, u32, u32), end: (i32, u32, u32)) -> ProjectInput {
        ProjectInput {
            name: name.to_string(),
            description: "  planning the launch ".to_string(),
            start_date: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
            status: ProjectStatus::Planning,
        }
    }

    #[test]
    fn test_status_serde_format() {
        let json = serde_json::to_string(&ProjectStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
        let parsed: ProjectStatus = serde_json::from_str("\"ON_HOLD\"").unwrap();
        assert_eq!(parsed, ProjectStatus::OnHold);
    }

    #[test]
    fn test_normalized_trims_fields() {
        let normalized = input("  Launch ", (2024, 1, 1), (2024, 2, 1)).normalized().unwrap();
        assert_eq!(normalized.name, "Launch");
        assert_eq!(normalized.description, "planning the launch");
    }

    #[test]
    fn test_blank_name_rejected() {
        let result = input("   ", (2024, 1, 1), (2024, 2, 1)).normalized();
        assert!(matches!(result, Err(CollabError::Validation(_))));
    }

    #[test]
    fn test_inverted_dates_rejected() {
        let result = input("Launch", (2024, 3, 1), (2024, 2, 1)).normalized();
        assert!(matches!(result, Err(CollabError::Validation(_))));
    }

    #[test]
    fn test_with_changes_bumps_version() {
        let project = Project::from_input(input("Launch", (2024, 1, 1), (2024, 2, 1)), Uuid::new_v4());
        assert_eq!(project.version, 0);

        let mut changes = input("Relaunch", (2024, 1, 1), (2024, 6, 1));
        changes.status = ProjectStatus::InProgress;
        let updated = project.with_changes(changes);

        assert_eq!(updated.version, 1);
        assert_eq!(updated.name, "Relaunch");
        assert_eq!(updated.id, project.id);
        assert_eq!(updated.creator_id, project.creator_id);
    }
}
