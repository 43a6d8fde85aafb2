/// System administration endpoints
///
/// Every handler here requires the system ADMIN role, re-read from storage on
/// each request. The role grants nothing on the ordinary project routes.
///
/// - `GET /v1/admin/projects`
/// - `DELETE /v1/admin/projects/:id?version=N`
/// - `GET /v1/admin/activity?limit=N`
/// - `PUT /v1/admin/users/:id/role` - `{"role": "ADMIN"}`

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use collabhub_shared::{
    auth::identity::AuthContext,
    models::{
        activity::ActivityEntry,
        project::Project,
        user::{SystemRole, User},
    },
};
use serde::Deserialize;
use uuid::Uuid;

use super::{LimitQuery, VersionQuery};
use crate::{app::AppState, error::ApiResult};

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: SystemRole,
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(state.services.projects.list_all(&auth).await?))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<VersionQuery>,
) -> ApiResult<StatusCode> {
    state
        .services
        .projects
        .admin_delete(&auth, project_id, query.version)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn activity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Vec<ActivityEntry>>> {
    Ok(Json(
        state.services.boards.all_activity(&auth, query.limit).await?,
    ))
}

pub async fn set_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<SetRoleRequest>,
) -> ApiResult<Json<User>> {
    let user = state
        .services
        .accounts
        .set_system_role(&auth, user_id, req.role)
        .await?;
    Ok(Json(user))
}
