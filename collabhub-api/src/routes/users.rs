/// The caller's own account
///
/// - `GET /v1/users/me`
/// - `DELETE /v1/users/me` - projects the caller created pass to the system account

use axum::{extract::State, http::StatusCode, Extension, Json};
use collabhub_shared::{auth::identity::AuthContext, models::user::User};

use crate::{app::AppState, error::ApiResult};

pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.services.accounts.current_user(&auth).await?))
}

pub async fn delete_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<StatusCode> {
    state.services.accounts.delete_account(&auth).await?;
    Ok(StatusCode::NO_CONTENT)
}
