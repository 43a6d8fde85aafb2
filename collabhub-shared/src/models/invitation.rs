/// Project invitations
///
/// An invitation is a single-use admission ticket for one email address into
/// one project. Expiry is enforced lazily: nothing sweeps stale rows, readers
/// compare `expires_at` against the current time.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE invitation_status AS ENUM ('PENDING', 'ACCEPTED', 'EXPIRED');
///
/// CREATE TABLE invitations (
///     id UUID PRIMARY KEY,
///     email TEXT NOT NULL,
///     project_id UUID NOT NULL REFERENCES projects(id),
///     token TEXT NOT NULL UNIQUE,
///     status invitation_status NOT NULL DEFAULT 'PENDING',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     expires_at TIMESTAMPTZ NOT NULL
/// );
/// ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::tokens::{generate_token, INVITATION_TOKEN_PREFIX};
use crate::models::user::normalize_email;

/// Default invitation lifetime
pub const DEFAULT_INVITATION_TTL_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invitation_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "PENDING",
            InvitationStatus::Accepted => "ACCEPTED",
            InvitationStatus::Expired => "EXPIRED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invitation {
    pub id: Uuid,

    /// Target email, lowercased
    pub email: String,

    pub project_id: Uuid,

    /// Random redemption token (`inv_` + 32 base62 chars)
    pub token: String,

    pub status: InvitationStatus,

    pub created_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,
}

impl Invitation {
    /// Issues a pending invitation that expires after `ttl`
    pub fn issue(email: &str, project_id: Uuid, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: normalize_email(email),
            project_id,
            token: generate_token(INVITATION_TOKEN_PREFIX),
            status: InvitationStatus::Pending,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Strictly past expiry at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Status as observed at `now`: a pending invitation past expiry reads as EXPIRED
    pub fn effective_status(&self, now: DateTime<Utc>) -> InvitationStatus {
        match self.status {
            InvitationStatus::Pending if self.is_expired_at(now) => InvitationStatus::Expired,
            status => status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_defaults() {
        let project_id = Uuid::new_v4();
        let invitation = Invitation::issue(" Bob@X.com", project_id, Duration::days(3));

        assert_eq!(invitation.email, "bob@x.com");
        assert_eq!(invitation.project_id, project_id);
        assert_eq!(invitation.status, InvitationStatus::Pending);
        assert!(invitation.token.starts_with("inv_"));
        assert_eq!(invitation.expires_at - invitation.created_at, Duration::days(3));
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = Invitation::issue("a@x.com", Uuid::new_v4(), Duration::days(3));
        let b = Invitation::issue("a@x.com", Uuid::new_v4(), Duration::days(3));
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn test_expiry_is_strict() {
        let invitation = Invitation::issue("a@x.com", Uuid::new_v4(), Duration::days(3));
        assert!(!invitation.is_expired_at(invitation.expires_at));
        assert!(invitation.is_expired_at(invitation.expires_at + Duration::seconds(1)));
    }

    #[test]
    fn test_effective_status() {
        let mut invitation = Invitation::issue("a@x.com", Uuid::new_v4(), Duration::seconds(-1));
        assert_eq!(invitation.effective_status(Utc::now()), InvitationStatus::Expired);

        invitation.status = InvitationStatus::Accepted;
        assert_eq!(invitation.effective_status(Utc::now()), InvitationStatus::Accepted);
    }
}
