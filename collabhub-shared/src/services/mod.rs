/// Application services
///
/// Each service owns a handle to the [`Store`] and coordinates one area of the
/// domain. [`Services`] wires them together over a single store so handlers
/// can share one value.

pub mod accounts;
pub mod audit;
pub mod boards;
pub mod invitations;
pub mod members;
pub mod projects;

use std::sync::Arc;

use chrono::Duration;

use crate::auth::signup::{PendingSignupStore, DEFAULT_SIGNUP_TTL_MINUTES};
use crate::db::store::Store;
use crate::models::invitation::DEFAULT_INVITATION_TTL_DAYS;
use crate::notify::InvitationNotifier;

use accounts::{AccountService, DEFAULT_SYSTEM_ACCOUNT_EMAIL};
use audit::AuditRecorder;
use boards::BoardService;
use invitations::InvitationService;
use members::MemberService;
use projects::ProjectService;

/// Tunables shared by the services
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub system_account_email: String,
    pub invitation_ttl: Duration,
    pub signup_ttl: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            system_account_email: DEFAULT_SYSTEM_ACCOUNT_EMAIL.to_string(),
            invitation_ttl: Duration::days(DEFAULT_INVITATION_TTL_DAYS),
            signup_ttl: Duration::minutes(DEFAULT_SIGNUP_TTL_MINUTES),
        }
    }
}

#[derive(Clone)]
pub struct Services {
    pub accounts: AccountService,
    pub projects: ProjectService,
    pub members: MemberService,
    pub invitations: InvitationService,
    pub boards: BoardService,
    pub audit: AuditRecorder,
    pub signups: Arc<PendingSignupStore>,
}

impl Services {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn InvitationNotifier>,
        settings: ServiceSettings,
    ) -> Self {
        let audit = AuditRecorder::new(store.clone());
        let signups = Arc::new(PendingSignupStore::new(settings.signup_ttl));

        Self {
            accounts: AccountService::new(
                store.clone(),
                signups.clone(),
                &settings.system_account_email,
            ),
            projects: ProjectService::new(
                store.clone(),
                audit.clone(),
                &settings.system_account_email,
            ),
            members: MemberService::new(store.clone(), audit.clone()),
            invitations: InvitationService::new(store.clone(), notifier, audit.clone())
                .with_ttl(settings.invitation_ttl),
            boards: BoardService::new(store),
            audit,
            signups,
        }
    }
}
