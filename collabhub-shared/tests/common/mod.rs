/// Shared fixtures for service-level tests
///
/// Every test gets its own in-memory store. Accounts are inserted directly
/// rather than registered, which keeps Argon2 out of the hot path.

use std::sync::Arc;

use chrono::NaiveDate;
use collabhub_shared::auth::identity::AuthContext;
use collabhub_shared::db::memory::MemoryStore;
use collabhub_shared::db::store::{Store, UnitOfWork};
use collabhub_shared::models::project::{Project, ProjectInput, ProjectStatus};
use collabhub_shared::models::user::{NewUser, SystemRole, User};
use collabhub_shared::notify::RecordingNotifier;
use collabhub_shared::services::{ServiceSettings, Services};

pub const SYSTEM_EMAIL: &str = "admin@admin.com";

pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub services: Services,
}

#[allow(dead_code)]
impl TestContext {
    pub fn new() -> Self {
        Self::with_settings(ServiceSettings::default())
    }

    pub fn with_settings(settings: ServiceSettings) -> Self {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let services = Services::new(store.clone(), notifier.clone(), settings);
        Self {
            store,
            notifier,
            services,
        }
    }

    /// Inserts an account with no password
    pub async fn user(&self, email: &str, role: SystemRole) -> User {
        let name = email.split('@').next().unwrap_or(email);
        let user = User::from_new(NewUser {
            email: email.to_string(),
            name: name.to_string(),
            password_hash: None,
            role,
            provider: None,
            provider_id: None,
        });

        let mut tx = self.store.begin().await.unwrap();
        tx.insert_user(&user).await.unwrap();
        tx.commit().await.unwrap();
        user
    }

    pub async fn system_account(&self) -> User {
        self.services.accounts.ensure_system_account().await.unwrap()
    }

    /// Creates a project owned by `creator`
    pub async fn project(&self, creator: &str) -> Project {
        self.services
            .projects
            .create(&auth(creator), project_input("Launch"))
            .await
            .unwrap()
    }
}

pub fn auth(email: &str) -> AuthContext {
    AuthContext::Credentials {
        username: email.to_string(),
    }
}

pub fn project_input(name: &str) -> ProjectInput {
    ProjectInput {
        name: name.to_string(),
        description: "Quarterly launch".to_string(),
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        status: ProjectStatus::Planning,
    }
}
