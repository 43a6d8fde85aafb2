/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register a local account
/// - `POST /v1/auth/login` - Login and get tokens
/// - `POST /v1/auth/refresh` - Exchange a refresh token for a new access token
/// - `POST /v1/auth/external` - Sign in with a signed external-provider assertion
/// - `POST /v1/auth/external/complete` - Confirm a pending external signup

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use collabhub_shared::{
    auth::{
        assertion::{verify_assertion, AssertionError, IDENTITY_SIGNATURE_HEADER},
        identity::{ExternalProfile, Provider},
        jwt::{self, Claims, TokenPair, TokenType},
    },
    models::user::User,
    services::accounts::ExternalLogin,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Strength rules are enforced by the account service
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Deserialize)]
pub struct ExternalLoginRequest {
    /// `google`, `naver` or `kakao`
    pub provider: String,

    /// The provider's attribute bag, as received from it
    pub attributes: Value,
}

#[derive(Debug, Deserialize)]
pub struct CompleteSignupRequest {
    pub token: String,
}

/// A user together with freshly issued tokens
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,

    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExternalLoginResponse {
    Authenticated(AuthResponse),
    SignupRequired {
        signup_token: String,
        profile: ExternalProfile,
    },
}

fn authenticate(state: &AppState, user: User) -> ApiResult<AuthResponse> {
    let tokens = jwt::issue_token_pair(&user, state.jwt_secret())?;
    Ok(AuthResponse { user, tokens })
}

/// Register a new local account
///
/// ```text
/// POST /v1/auth/register
///
/// { "email": "alice@example.com", "password": "Str0ng!pass", "name": "Alice" }
/// ```
///
/// # Errors
///
/// - 422 for malformed input or a weak password
/// - 409 if the email is already registered
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    req.validate()?;

    let user = state
        .services
        .accounts
        .register(&req.email, &req.password, &req.name)
        .await?;

    Ok((StatusCode::CREATED, Json(authenticate(&state, user)?)))
}

/// Login with email and password
///
/// # Errors
///
/// - 401 for unknown email, wrong password, or an account without a password
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()?;

    let user = state
        .services
        .accounts
        .login(&req.email, &req.password)
        .await?;

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(authenticate(&state, user)?))
}

/// Exchange a refresh token for a new access token
///
/// The access token is minted from the account as stored now, so role changes
/// and deletions take effect on refresh.
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;

    let user = state
        .services
        .accounts
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))?;

    let access = Claims::for_user(&user, TokenType::Access);
    Ok(Json(RefreshResponse {
        access_token: jwt::create_token(&access, state.jwt_secret())?,
        token_type: "Bearer".to_string(),
        expires_in: TokenType::Access.default_expiration().num_seconds(),
    }))
}

/// Sign in with an external provider's attribute bag
///
/// The body must come from the external sign-in collaborator, signed with
/// `EXTERNAL_IDENTITY_SECRET` in `X-Collabhub-Identity-Signature`. Known
/// emails get tokens straight away; unknown ones get a short-lived signup
/// token to confirm with `/v1/auth/external/complete`.
///
/// # Errors
///
/// - 401 if external sign-in is disabled or the signature is missing or wrong
/// - 400 for a malformed body or an unknown provider
pub async fn external_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<ExternalLoginResponse>)> {
    let secret = state
        .config
        .external_identity
        .secret
        .as_deref()
        .ok_or_else(|| ApiError::Unauthorized("External sign-in is not enabled".to_string()))?;

    let signature = headers
        .get(IDENTITY_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(AssertionError::MissingSignature)?;
    if let Err(e) = verify_assertion(secret.as_bytes(), &body, signature) {
        tracing::warn!(error = %e, "Rejected external identity assertion");
        return Err(e.into());
    }

    let req: ExternalLoginRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?;
    let provider: Provider = req.provider.parse()?;

    match state
        .services
        .accounts
        .external_login(provider, &req.attributes)
        .await?
    {
        ExternalLogin::Existing(user) => Ok((
            StatusCode::OK,
            Json(ExternalLoginResponse::Authenticated(authenticate(
                &state, user,
            )?)),
        )),
        ExternalLogin::PendingSignup { token, profile } => Ok((
            StatusCode::ACCEPTED,
            Json(ExternalLoginResponse::SignupRequired {
                signup_token: token,
                profile,
            }),
        )),
    }
}

/// Confirm a pending external signup
///
/// # Errors
///
/// - 404 (`invalid_token`) for an unknown, used or expired signup token
pub async fn complete_signup(
    State(state): State<AppState>,
    Json(req): Json<CompleteSignupRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let user = state.services.accounts.complete_signup(&req.token).await?;
    Ok((StatusCode::CREATED, Json(authenticate(&state, user)?)))
}
