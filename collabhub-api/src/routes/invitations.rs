/// Invitation endpoints
///
/// - `GET /v1/projects/:id/invitations` - pending invitations past expiry are reported as EXPIRED
/// - `POST /v1/projects/:id/invitations` - `{"emails": "a@x.com, b@x.com"}`
/// - `POST /v1/invitations/accept` - `{"token": "inv_..."}`
///
/// Accept failures map to 404 `invalid_token`, 409 `already_accepted`,
/// 410 `expired`, 404 `account_not_found` and 403 `email_mismatch`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use collabhub_shared::{auth::identity::AuthContext, models::invitation::Invitation};
use serde::Deserialize;
use uuid::Uuid;

use crate::{app::AppState, error::ApiResult};

#[derive(Debug, Deserialize)]
pub struct CreateInvitationsRequest {
    /// One address or a comma-separated list
    pub emails: String,
}

#[derive(Debug, Deserialize)]
pub struct AcceptInvitationRequest {
    pub token: String,
}

pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Invitation>>> {
    Ok(Json(state.services.invitations.list(&auth, project_id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<CreateInvitationsRequest>,
) -> ApiResult<(StatusCode, Json<Vec<Invitation>>)> {
    let invitations = state
        .services
        .invitations
        .invite_bulk(&auth, project_id, &req.emails)
        .await?;
    Ok((StatusCode::CREATED, Json(invitations)))
}

pub async fn accept(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<AcceptInvitationRequest>,
) -> ApiResult<Json<Invitation>> {
    Ok(Json(state.services.invitations.accept(&auth, &req.token).await?))
}
