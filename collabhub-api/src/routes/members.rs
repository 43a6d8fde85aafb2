/// Project member endpoints
///
/// - `GET /v1/projects/:id/members`
/// - `PUT /v1/projects/:id/members/:user_id` - `{"role": "admin"}`
/// - `DELETE /v1/projects/:id/members/:user_id` - kick (creator only)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use collabhub_shared::{
    auth::identity::AuthContext,
    models::membership::{ProjectMember, ProjectRole},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{app::AppState, error::ApiResult};

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: ProjectRole,
}

pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ProjectMember>>> {
    Ok(Json(state.services.members.list(&auth, project_id).await?))
}

pub async fn update_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateRoleRequest>,
) -> ApiResult<StatusCode> {
    state
        .services
        .members
        .update_role(&auth, project_id, user_id, req.role)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn kick(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    state
        .services
        .members
        .kick(&auth, project_id, user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
