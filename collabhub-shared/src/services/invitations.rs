/// Invitation lifecycle
///
/// ```text
/// PENDING --accept(valid, unexpired, matching identity)--> ACCEPTED
/// PENDING --now > expires_at, observed on accept-------> EXPIRED
/// ```
///
/// Nothing leaves ACCEPTED or EXPIRED. Expiry is detected lazily; listing
/// reports overdue pending invitations as EXPIRED without writing, and an
/// accept attempt on one persists the EXPIRED status before failing.
///
/// # Accept checks, in order
///
/// 1. caller identity resolves, else `Unauthenticated`
/// 2. token exists, else `InvalidToken`
/// 3. not already accepted, else `AlreadyAccepted`
/// 4. not expired, else `Expired`
/// 5. an account exists for the invited email, else `AccountNotFound`
/// 6. caller email matches the invited email, else `EmailMismatch`
///
/// All checks run before any membership write. The token row is locked for
/// the unit of work, and an existing membership for the pair is kept rather
/// than duplicated, so concurrent accepts of one token produce at most one
/// membership and one ACCEPTED transition.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;
use validator::ValidateEmail;

use super::audit::AuditRecorder;
use crate::auth::authorization::{authorize, Capability};
use crate::auth::identity::{resolve, AuthContext};
use crate::auth::tokens::{validate_token_format, INVITATION_TOKEN_PREFIX};
use crate::db::store::{Store, UnitOfWork};
use crate::error::CollabError;
use crate::models::activity::{ActivityAction, ActivityEntry, MEMBER_BOARD};
use crate::models::invitation::{Invitation, InvitationStatus, DEFAULT_INVITATION_TTL_DAYS};
use crate::models::membership::{Membership, ProjectRole};
use crate::models::project::Project;
use crate::models::user::normalize_email;
use crate::notify::InvitationNotifier;

#[derive(Clone)]
pub struct InvitationService {
    store: Arc<dyn Store>,
    notifier: Arc<dyn InvitationNotifier>,
    audit: AuditRecorder,
    ttl: Duration,
}

impl InvitationService {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn InvitationNotifier>,
        audit: AuditRecorder,
    ) -> Self {
        Self {
            store,
            notifier,
            audit,
            ttl: Duration::days(DEFAULT_INVITATION_TTL_DAYS),
        }
    }

    /// Overrides the invitation lifetime
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Invites one email address to a project
    pub async fn create(
        &self,
        auth: &AuthContext,
        project_id: Uuid,
        email: &str,
    ) -> Result<Invitation, CollabError> {
        let mut invitations = self.invite_all(auth, project_id, vec![parse_email(email)?]).await?;
        invitations
            .pop()
            .ok_or_else(|| CollabError::Validation("No email address given".into()))
    }

    /// Invites every address in a comma-separated list
    ///
    /// Blank entries are skipped and repeats collapse to one invitation. Any
    /// malformed address rejects the whole request before anything is written.
    pub async fn invite_bulk(
        &self,
        auth: &AuthContext,
        project_id: Uuid,
        emails: &str,
    ) -> Result<Vec<Invitation>, CollabError> {
        let mut seen = HashSet::new();
        let mut parsed = Vec::new();
        for raw in emails.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let email = parse_email(raw)?;
            if seen.insert(email.clone()) {
                parsed.push(email);
            }
        }

        if parsed.is_empty() {
            return Err(CollabError::Validation("No email address given".into()));
        }

        self.invite_all(auth, project_id, parsed).await
    }

    async fn invite_all(
        &self,
        auth: &AuthContext,
        project_id: Uuid,
        emails: Vec<String>,
    ) -> Result<Vec<Invitation>, CollabError> {
        let mut tx = self.store.begin().await?;
        let grant = authorize(tx.as_mut(), project_id, auth, Capability::Administer).await?;

        let mut invitations = Vec::with_capacity(emails.len());
        for email in &emails {
            invitations.push(issue(tx.as_mut(), &grant.project, email, self.ttl).await?);
        }
        tx.commit().await?;

        for invitation in &invitations {
            info!(project_id = %project_id, email = %invitation.email, "Invitation created");
            self.notify(invitation, &grant.project).await;
            self.audit
                .record(ActivityEntry::new(
                    project_id,
                    MEMBER_BOARD,
                    Some(invitation.id),
                    &grant.actor.email,
                    &grant.actor.name,
                    ActivityAction::Invite,
                ))
                .await;
        }

        Ok(invitations)
    }

    /// Redeems an invitation token for the calling identity
    ///
    /// Returns the invitation in its ACCEPTED state. See the module docs for
    /// the order of failure checks.
    pub async fn accept(&self, auth: &AuthContext, token: &str) -> Result<Invitation, CollabError> {
        let identity = resolve(auth)?;
        let token = token.trim();
        if !validate_token_format(token, INVITATION_TOKEN_PREFIX) {
            return Err(CollabError::InvalidToken);
        }

        let mut tx = self.store.begin().await?;
        let mut invitation = tx
            .find_invitation_by_token(token)
            .await?
            .ok_or(CollabError::InvalidToken)?;

        match invitation.status {
            InvitationStatus::Accepted => return Err(CollabError::AlreadyAccepted),
            InvitationStatus::Expired => return Err(CollabError::Expired),
            InvitationStatus::Pending => {}
        }

        if invitation.is_expired_at(Utc::now()) {
            tx.update_invitation_status(invitation.id, InvitationStatus::Expired)
                .await?;
            tx.commit().await?;
            info!(invitation_id = %invitation.id, "Invitation expired on accept");
            return Err(CollabError::Expired);
        }

        let invitee = tx
            .find_user_by_email(&invitation.email)
            .await?
            .ok_or_else(|| CollabError::AccountNotFound(invitation.email.clone()))?;

        if !identity.matches(&invitation.email) {
            return Err(CollabError::EmailMismatch);
        }

        let joined = match Membership::add(
            tx.as_mut(),
            invitation.project_id,
            invitee.id,
            ProjectRole::Member,
        )
        .await
        {
            Ok(_) => true,
            Err(CollabError::DuplicateMembership) => false,
            Err(e) => return Err(e),
        };

        tx.update_invitation_status(invitation.id, InvitationStatus::Accepted)
            .await?;
        tx.commit().await?;
        invitation.status = InvitationStatus::Accepted;

        info!(
            project_id = %invitation.project_id,
            user_id = %invitee.id,
            joined,
            "Invitation accepted"
        );
        self.audit
            .record(ActivityEntry::new(
                invitation.project_id,
                MEMBER_BOARD,
                Some(invitee.id),
                &invitee.email,
                &invitee.name,
                ActivityAction::Join,
            ))
            .await;

        Ok(invitation)
    }

    /// Invitations for a project, newest first, with lazy expiry applied
    pub async fn list(
        &self,
        auth: &AuthContext,
        project_id: Uuid,
    ) -> Result<Vec<Invitation>, CollabError> {
        let mut tx = self.store.begin().await?;
        authorize(tx.as_mut(), project_id, auth, Capability::Administer).await?;

        let now = Utc::now();
        Ok(tx
            .list_invitations(project_id)
            .await?
            .into_iter()
            .map(|mut invitation| {
                invitation.status = invitation.effective_status(now);
                invitation
            })
            .collect())
    }

    async fn notify(&self, invitation: &Invitation, project: &Project) {
        if let Err(e) = self.notifier.send_invitation(invitation, project).await {
            warn!(
                email = %invitation.email,
                project_id = %project.id,
                error = %e,
                "Failed to deliver invitation"
            );
        }
    }
}

/// Creates a pending invitation; authorization is the caller's job
pub async fn issue(
    tx: &mut dyn UnitOfWork,
    project: &Project,
    email: &str,
    ttl: Duration,
) -> Result<Invitation, CollabError> {
    let invitation = Invitation::issue(email, project.id, ttl);
    tx.insert_invitation(&invitation).await?;
    Ok(invitation)
}

fn parse_email(raw: &str) -> Result<String, CollabError> {
    let email = normalize_email(raw);
    if !email.validate_email() {
        return Err(CollabError::Validation(format!(
            "Invalid email address: {}",
            raw.trim()
        )));
    }
    Ok(email)
}
