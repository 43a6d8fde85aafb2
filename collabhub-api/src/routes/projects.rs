/// Project endpoints
///
/// # Endpoints
///
/// - `GET /v1/projects` - Projects the caller created or belongs to
/// - `POST /v1/projects` - Create a project
/// - `GET /v1/projects/roles/:role` - Projects where the caller holds a role
/// - `GET /v1/projects/:id` - Read a project
/// - `PUT /v1/projects/:id` - Update a project (body carries `version`)
/// - `DELETE /v1/projects/:id?version=N` - Delete a project
/// - `POST /v1/projects/:id/leave` - Leave a project
///
/// # Optimistic concurrency
///
/// Updates and deletes must send the `version` the client last read. A stale
/// version yields 409 with `"error": "version_conflict"`; reload and resubmit.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use collabhub_shared::{
    auth::identity::AuthContext,
    models::{
        membership::ProjectRole,
        project::{Project, ProjectInput},
    },
    services::projects::ProjectView,
};
use serde::Deserialize;
use uuid::Uuid;

use super::VersionQuery;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    /// The version the client last read
    pub version: i64,

    #[serde(flatten)]
    pub project: ProjectInput,
}

pub async fn list_mine(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(state.services.projects.list_mine(&auth).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(input): Json<ProjectInput>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let project = state.services.projects.create(&auth, input).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn list_by_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(role): Path<String>,
) -> ApiResult<Json<Vec<Project>>> {
    let role: ProjectRole = role.parse().map_err(ApiError::BadRequest)?;
    Ok(Json(state.services.projects.list_by_role(&auth, role).await?))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProjectView>> {
    Ok(Json(state.services.projects.get(&auth, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> ApiResult<Json<Project>> {
    let project = state
        .services
        .projects
        .update(&auth, id, req.version, req.project)
        .await?;
    Ok(Json(project))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Query(query): Query<VersionQuery>,
) -> ApiResult<StatusCode> {
    state
        .services
        .projects
        .delete(&auth, id, query.version)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn leave(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.projects.leave(&auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
