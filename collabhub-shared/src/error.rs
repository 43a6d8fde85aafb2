/// Error taxonomy for collaboration operations
///
/// Every operation on projects, memberships and invitations fails with a
/// [`CollabError`]. The variants are distinguishable so the HTTP boundary can
/// pick the right status code; nothing in this crate renders or swallows them.
///
/// Backend failures surface as [`CollabError::Store`] and wrap a
/// [`StoreError`](crate::db::store::StoreError).

use uuid::Uuid;

use crate::auth::identity::IdentityError;
use crate::db::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum CollabError {
    /// No resolvable identity on the request
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Project not found: {0}")]
    ProjectNotFound(Uuid),

    /// Identity resolved and project exists, but the capability is denied
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Optimistic concurrency loss; the caller should reload and resubmit
    #[error("Project was modified concurrently (expected version {expected})")]
    VersionConflict { expected: i64 },

    #[error("User is already a member of this project")]
    DuplicateMembership,

    #[error("Membership not found")]
    MembershipNotFound,

    #[error("Invitation token is invalid")]
    InvalidToken,

    #[error("Invitation has expired")]
    Expired,

    #[error("Invitation was issued to a different email address")]
    EmailMismatch,

    #[error("Invitation has already been accepted")]
    AlreadyAccepted,

    #[error("No account exists for {0}")]
    AccountNotFound(String),

    #[error("An account already exists for {0}")]
    DuplicateAccount(String),

    /// Structurally forbidden, e.g. the creator leaving or kicking themself
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CollabError {
    /// Stable machine-readable code for the variant
    pub fn code(&self) -> &'static str {
        match self {
            CollabError::Unauthenticated => "unauthenticated",
            CollabError::ProjectNotFound(_) => "project_not_found",
            CollabError::Forbidden(_) => "forbidden",
            CollabError::VersionConflict { .. } => "version_conflict",
            CollabError::DuplicateMembership => "duplicate_membership",
            CollabError::MembershipNotFound => "membership_not_found",
            CollabError::InvalidToken => "invalid_token",
            CollabError::Expired => "expired",
            CollabError::EmailMismatch => "email_mismatch",
            CollabError::AlreadyAccepted => "already_accepted",
            CollabError::AccountNotFound(_) => "account_not_found",
            CollabError::DuplicateAccount(_) => "duplicate_account",
            CollabError::InvalidOperation(_) => "invalid_operation",
            CollabError::Validation(_) => "validation_error",
            CollabError::Store(_) => "internal_error",
        }
    }
}

impl From<IdentityError> for CollabError {
    fn from(_: IdentityError) -> Self {
        CollabError::Unauthenticated
    }
}

impl From<validator::ValidationErrors> for CollabError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "is invalid".to_string());
                if field == "__all__" {
                    message
                } else {
                    format!("{}: {}", field, message)
                }
            })
            .collect();
        fields.sort();
        CollabError::Validation(fields.join(", "))
    }
}
