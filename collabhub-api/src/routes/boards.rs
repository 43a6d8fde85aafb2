/// Board read endpoints
///
/// - `GET /v1/projects/:id/activity?limit=N` - newest first, limit 1-200 (default 50)
/// - `GET /v1/projects/:id/notices`

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use collabhub_shared::{
    auth::identity::AuthContext,
    models::{activity::ActivityEntry, notice::Notice},
};
use uuid::Uuid;

use super::LimitQuery;
use crate::{app::AppState, error::ApiResult};

pub async fn activity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Vec<ActivityEntry>>> {
    let entries = state
        .services
        .boards
        .recent_activity(&auth, project_id, query.limit)
        .await?;
    Ok(Json(entries))
}

pub async fn notices(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Notice>>> {
    Ok(Json(state.services.boards.notices(&auth, project_id).await?))
}
