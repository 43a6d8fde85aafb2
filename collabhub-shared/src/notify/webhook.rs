/// Webhook delivery for invitations
///
/// Each invitation is POSTed as JSON to a configured URL so an external
/// mailer can send it. When a secret is configured the raw body is signed
/// with HMAC-SHA256 and the lowercase hex digest is sent in
/// `X-Collabhub-Signature`; receivers recompute it over the bytes they got.
///
/// # Payload
///
/// ```json
/// {
///   "email": "bob@x.com",
///   "project_id": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
///   "project_name": "Launch",
///   "accept_url": "https://collabhub.example/invitations/accept?token=inv_...",
///   "expires_at": "2024-01-04T12:00:00Z"
/// }
/// ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;
use uuid::Uuid;

use super::{InvitationNotifier, NotifyError};
use crate::models::invitation::Invitation;
use crate::models::project::Project;

pub const SIGNATURE_HEADER: &str = "X-Collabhub-Signature";

const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvitationPayload {
    pub email: String,
    pub project_id: Uuid,
    pub project_name: String,
    pub accept_url: String,
    pub expires_at: DateTime<Utc>,
}

impl InvitationPayload {
    pub fn new(invitation: &Invitation, project: &Project, public_base_url: &str) -> Self {
        Self {
            email: invitation.email.clone(),
            project_id: project.id,
            project_name: project.name.clone(),
            accept_url: format!(
                "{}/invitations/accept?token={}",
                public_base_url.trim_end_matches('/'),
                invitation.token
            ),
            expires_at: invitation.expires_at,
        }
    }
}

/// Hex HMAC-SHA256 of `payload` under `secret`
pub fn sign(secret: &[u8], payload: &[u8]) -> Result<String, NotifyError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret).map_err(|_| NotifyError::SigningKey)?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    secret: Option<Vec<u8>>,
    public_base_url: String,
}

impl WebhookNotifier {
    pub fn new(
        url: impl Into<String>,
        secret: Option<String>,
        public_base_url: impl Into<String>,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
            secret: secret.map(String::into_bytes),
            public_base_url: public_base_url.into(),
        })
    }
}

#[async_trait]
impl InvitationNotifier for WebhookNotifier {
    async fn send_invitation(
        &self,
        invitation: &Invitation,
        project: &Project,
    ) -> Result<(), NotifyError> {
        let payload = InvitationPayload::new(invitation, project, &self.public_base_url);
        let body = serde_json::to_vec(&payload)?;

        let mut request = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(secret) = &self.secret {
            request = request.header(SIGNATURE_HEADER, sign(secret, &body)?);
        }

        let response = request.body(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }

        debug!(email = %invitation.email, status = status.as_u16(), "Invitation webhook delivered");
        Ok(())
    }
}
