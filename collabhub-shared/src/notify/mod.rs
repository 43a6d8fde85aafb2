/// Invitation notification
///
/// Delivering an invitation is best effort. Callers hand each freshly
/// committed invitation to an [`InvitationNotifier`] and log, but never
/// propagate, a failure; the invitation stays valid either way.
///
/// # Implementations
///
/// - [`LogNotifier`]: writes a log line, the default without a webhook
/// - [`webhook::WebhookNotifier`]: POSTs a signed JSON payload
/// - [`RecordingNotifier`]: keeps what it was given, for tests

pub mod webhook;

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::info;

use crate::models::invitation::Invitation;
use crate::models::project::Project;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook responded with status {0}")]
    Status(u16),

    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Invalid signing key")]
    SigningKey,
}

#[async_trait]
pub trait InvitationNotifier: Send + Sync {
    async fn send_invitation(
        &self,
        invitation: &Invitation,
        project: &Project,
    ) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl InvitationNotifier for LogNotifier {
    async fn send_invitation(
        &self,
        invitation: &Invitation,
        project: &Project,
    ) -> Result<(), NotifyError> {
        info!(
            email = %invitation.email,
            project_id = %project.id,
            project = %project.name,
            expires_at = %invitation.expires_at,
            "Invitation issued"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Invitation>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invitations received so far, oldest first
    pub fn sent(&self) -> Vec<Invitation> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl InvitationNotifier for RecordingNotifier {
    async fn send_invitation(
        &self,
        invitation: &Invitation,
        _project: &Project,
    ) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(invitation.clone());
        Ok(())
    }
}
