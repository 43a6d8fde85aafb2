/// Error handling for the API server
///
/// Handlers return `ApiResult<T>`; `ApiError` converts into a JSON response
/// of the form `{"error": code, "message": text, "details": [...]}`.
///
/// Domain failures keep their own machine-readable code (`version_conflict`,
/// `email_mismatch`, ...) so clients can tell, for example, a stale write from
/// a duplicate membership even though both are 409.
///
/// # Example
///
/// ```ignore
/// use collabhub_api::error::ApiResult;
/// use axum::Json;
///
/// async fn handler(State(state): State<AppState>) -> ApiResult<Json<Project>> {
///     let project = state.services.projects.get(&auth, id).await?;
///     Ok(Json(project))
/// }
/// ```

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use collabhub_shared::auth::assertion::AssertionError;
use collabhub_shared::auth::identity::IdentityError;
use collabhub_shared::auth::jwt::JwtError;
use collabhub_shared::auth::password::PasswordError;
use collabhub_shared::error::CollabError;
use serde::{Deserialize, Serialize};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Unprocessable entity (422) with per-field details
    ValidationError(Vec<ValidationErrorDetail>),

    /// A failure raised by the collaboration services
    Collab(CollabError),

    /// Internal server error (500)
    InternalError(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "version_conflict")
    pub error: String,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

/// HTTP status for each domain failure
pub fn collab_status(err: &CollabError) -> StatusCode {
    match err {
        CollabError::Unauthenticated => StatusCode::UNAUTHORIZED,
        CollabError::ProjectNotFound(_)
        | CollabError::MembershipNotFound
        | CollabError::InvalidToken
        | CollabError::AccountNotFound(_) => StatusCode::NOT_FOUND,
        CollabError::Forbidden(_) | CollabError::EmailMismatch => StatusCode::FORBIDDEN,
        CollabError::VersionConflict { .. }
        | CollabError::DuplicateMembership
        | CollabError::AlreadyAccepted
        | CollabError::DuplicateAccount(_) => StatusCode::CONFLICT,
        CollabError::Expired => StatusCode::GONE,
        CollabError::InvalidOperation(_) => StatusCode::BAD_REQUEST,
        CollabError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CollabError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::Collab(err) => write!(f, "{}", err),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::Collab(CollabError::Store(err)) => {
                // Log internal errors but don't expose details to clients
                tracing::error!(error = %err, "Store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::Collab(err) => {
                tracing::debug!(code = err.code(), error = %err, "Request rejected");
                (collab_status(&err), err.code(), err.to_string(), None)
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

impl From<CollabError> for ApiError {
    fn from(err: CollabError) -> Self {
        ApiError::Collab(err)
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::UnknownProvider(provider) => {
                ApiError::BadRequest(format!("Unknown identity provider: {}", provider))
            }
            IdentityError::MissingAttribute { .. } => ApiError::Unauthorized(err.to_string()),
            IdentityError::Anonymous => ApiError::Collab(CollabError::Unauthenticated),
        }
    }
}

impl From<AssertionError> for ApiError {
    fn from(err: AssertionError) -> Self {
        match err {
            AssertionError::SigningKey => {
                ApiError::InternalError(format!("Assertion check failed: {}", err))
            }
            _ => ApiError::Unauthorized(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| ValidationErrorDetail {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(details)
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidIssuer => ApiError::Unauthorized("Invalid token issuer".to_string()),
            JwtError::CreateError(msg) => {
                ApiError::InternalError(format!("Token creation failed: {}", msg))
            }
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");
    }

    #[test]
    fn test_collab_status_mapping() {
        assert_eq!(collab_status(&CollabError::Unauthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(
            collab_status(&CollabError::ProjectNotFound(Uuid::new_v4())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(collab_status(&CollabError::EmailMismatch), StatusCode::FORBIDDEN);
        assert_eq!(
            collab_status(&CollabError::VersionConflict { expected: 2 }),
            StatusCode::CONFLICT
        );
        assert_eq!(collab_status(&CollabError::AlreadyAccepted), StatusCode::CONFLICT);
        assert_eq!(collab_status(&CollabError::Expired), StatusCode::GONE);
        assert_eq!(
            collab_status(&CollabError::InvalidOperation("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            collab_status(&CollabError::Validation("x".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_collab_response_keeps_domain_code() {
        let response = ApiError::from(CollabError::DuplicateMembership).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_bad_assertion_is_unauthorized() {
        let err: ApiError = AssertionError::SignatureMismatch.into();
        assert!(matches!(err, ApiError::Unauthorized(_)));
        let err: ApiError = AssertionError::MissingSignature.into();
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_jwt_expired_is_unauthorized() {
        let err: ApiError = JwtError::Expired.into();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
