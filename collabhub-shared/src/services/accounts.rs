/// Accounts
///
/// Local registration and login, external-provider signup, system role
/// changes, and account deletion.
///
/// # Account deletion
///
/// A user who created projects is never deleted out from under them. In one
/// unit of work:
///
/// 1. every project they created is reassigned to the system account, with
///    ` [creator transferred]` appended to its description
/// 2. each of their memberships is replaced by a system-account membership
///    with role Admin, unless the system account already has one there
/// 3. the user row is deleted
///
/// The system account itself cannot be deleted.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;
use validator::ValidateEmail;

use crate::auth::authorization::{require_account, require_system_admin};
use crate::auth::identity::{resolve, AuthContext, ExternalProfile, Provider};
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::auth::signup::PendingSignupStore;
use crate::db::store::{Store, StoreError, UnitOfWork};
use crate::error::CollabError;
use crate::models::membership::{Membership, ProjectRole};
use crate::models::project::Project;
use crate::models::user::{normalize_email, NewUser, SystemRole, User};

pub const DEFAULT_SYSTEM_ACCOUNT_EMAIL: &str = "admin@admin.com";

const SYSTEM_ACCOUNT_NAME: &str = "Administrator";

const TRANSFER_SUFFIX: &str = " [creator transferred]";

/// Result of signing in with an external provider
#[derive(Debug, Clone)]
pub enum ExternalLogin {
    /// An account already exists for the provider's email
    Existing(User),

    /// No account yet; the profile is parked under `token` until confirmed
    PendingSignup {
        token: String,
        profile: ExternalProfile,
    },
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
    signups: Arc<PendingSignupStore>,
    system_account_email: String,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn Store>,
        signups: Arc<PendingSignupStore>,
        system_account_email: &str,
    ) -> Self {
        Self {
            store,
            signups,
            system_account_email: normalize_email(system_account_email),
        }
    }

    pub fn system_account_email(&self) -> &str {
        &self.system_account_email
    }

    /// Registers a local account with role USER
    ///
    /// # Errors
    ///
    /// - `Validation` for a malformed email, blank name or weak password
    /// - `DuplicateAccount` if the email is taken
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<User, CollabError> {
        let email = normalize_email(email);
        if !email.validate_email() {
            return Err(CollabError::Validation("Invalid email address".into()));
        }
        if name.trim().is_empty() {
            return Err(CollabError::Validation("Name must not be blank".into()));
        }
        validate_password_strength(password).map_err(CollabError::Validation)?;

        let password_hash = hash_password(password).map_err(|e| {
            warn!(error = %e, "Password hashing failed");
            CollabError::Validation("Password could not be processed".into())
        })?;

        let user = User::from_new(NewUser::local(&email, name, password_hash));
        self.insert_new_user(&user).await?;

        info!(user_id = %user.id, email = %user.email, "User registered");
        Ok(user)
    }

    /// Verifies local credentials
    ///
    /// Every failure, including accounts without a password, is reported as
    /// `Unauthenticated` so callers cannot probe which emails exist.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, CollabError> {
        let user = self.find_by_email(email).await?.ok_or(CollabError::Unauthenticated)?;
        let hash = user
            .password_hash
            .as_deref()
            .ok_or(CollabError::Unauthenticated)?;

        match verify_password(password, hash) {
            Ok(true) => Ok(user),
            Ok(false) => Err(CollabError::Unauthenticated),
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "Stored password hash is unusable");
                Err(CollabError::Unauthenticated)
            }
        }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, CollabError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.find_user(id).await?)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, CollabError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.find_user_by_email(&normalize_email(email)).await?)
    }

    /// The account behind an authentication context
    pub async fn current_user(&self, auth: &AuthContext) -> Result<User, CollabError> {
        let identity = resolve(auth)?;
        let mut tx = self.store.begin().await?;
        require_account(tx.as_mut(), &identity).await
    }

    /// Signs in with a verified external-provider attribute bag
    ///
    /// The bag is trusted as is; callers must have checked where it came from
    /// (see [`crate::auth::assertion`]).
    pub async fn external_login(
        &self,
        provider: Provider,
        attributes: &Value,
    ) -> Result<ExternalLogin, CollabError> {
        let profile = provider.profile(attributes)?;

        if let Some(user) = self.find_by_email(&profile.email).await? {
            info!(user_id = %user.id, provider = provider.as_str(), "External login");
            return Ok(ExternalLogin::Existing(user));
        }

        let token = self.signups.insert(profile.clone());
        info!(email = %profile.email, provider = provider.as_str(), "External signup pending");
        Ok(ExternalLogin::PendingSignup { token, profile })
    }

    /// Confirms a pending external signup and creates the account
    ///
    /// # Errors
    ///
    /// - `InvalidToken` for an unknown, used or expired signup token
    /// - `DuplicateAccount` if the email was registered in the meantime
    pub async fn complete_signup(&self, token: &str) -> Result<User, CollabError> {
        let profile = self.signups.take(token).ok_or(CollabError::InvalidToken)?;

        let user = User::from_new(NewUser {
            email: profile.email,
            name: profile.name,
            password_hash: None,
            role: SystemRole::User,
            provider: Some(profile.provider.as_str().to_string()),
            provider_id: Some(profile.provider_id),
        });
        self.insert_new_user(&user).await?;

        info!(user_id = %user.id, provider = ?user.provider, "External signup completed");
        Ok(user)
    }

    /// Deletes the caller's account, handing their projects to the system account
    pub async fn delete_account(&self, auth: &AuthContext) -> Result<(), CollabError> {
        let identity = resolve(auth)?;
        if identity.matches(&self.system_account_email) {
            return Err(CollabError::InvalidOperation(
                "The system account cannot be deleted".into(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let user = require_account(tx.as_mut(), &identity).await?;
        let system = tx
            .find_user_by_email(&self.system_account_email)
            .await?
            .ok_or_else(|| CollabError::AccountNotFound(self.system_account_email.clone()))?;

        let transferred = transfer_projects(tx.as_mut(), &user, &system).await?;
        let replaced = replace_memberships(tx.as_mut(), &user, &system).await?;

        if !tx.delete_user(user.id).await? {
            return Err(CollabError::AccountNotFound(user.email.clone()));
        }
        tx.commit().await?;

        info!(
            user_id = %user.id,
            transferred_projects = transferred,
            replaced_memberships = replaced,
            "Account deleted"
        );
        Ok(())
    }

    /// Changes a user's system-wide role; requires the system ADMIN role
    pub async fn set_system_role(
        &self,
        auth: &AuthContext,
        user_id: Uuid,
        role: SystemRole,
    ) -> Result<User, CollabError> {
        let mut tx = self.store.begin().await?;
        let admin = require_system_admin(tx.as_mut(), auth).await?;

        let user = tx
            .update_user_role(user_id, role)
            .await?
            .ok_or_else(|| CollabError::AccountNotFound(user_id.to_string()))?;
        tx.commit().await?;

        info!(user_id = %user_id, role = role.as_str(), by = %admin.email, "System role changed");
        Ok(user)
    }

    /// Creates the system account (role ADMIN, no password) if it is missing
    pub async fn ensure_system_account(&self) -> Result<User, CollabError> {
        let mut tx = self.store.begin().await?;
        if let Some(existing) = tx.find_user_by_email(&self.system_account_email).await? {
            return Ok(existing);
        }

        let user = User::from_new(NewUser {
            email: self.system_account_email.clone(),
            name: SYSTEM_ACCOUNT_NAME.to_string(),
            password_hash: None,
            role: SystemRole::Admin,
            provider: None,
            provider_id: None,
        });
        tx.insert_user(&user).await?;
        tx.commit().await?;

        info!(email = %user.email, "System account created");
        Ok(user)
    }

    async fn insert_new_user(&self, user: &User) -> Result<(), CollabError> {
        let mut tx = self.store.begin().await?;
        match tx.insert_user(user).await {
            Ok(()) => {}
            Err(StoreError::UniqueViolation(_)) => {
                return Err(CollabError::DuplicateAccount(user.email.clone()))
            }
            Err(e) => return Err(e.into()),
        }
        tx.commit().await?;
        Ok(())
    }
}

async fn transfer_projects(
    tx: &mut dyn UnitOfWork,
    from: &User,
    to: &User,
) -> Result<usize, CollabError> {
    let projects = tx.list_projects_created_by(from.id).await?;
    for project in &projects {
        let transferred = Project {
            creator_id: to.id,
            description: format!("{}{}", project.description, TRANSFER_SUFFIX),
            version: project.version + 1,
            ..project.clone()
        };
        super::projects::write_versioned(tx, project, &transferred, project.version).await?;
    }
    Ok(projects.len())
}

async fn replace_memberships(
    tx: &mut dyn UnitOfWork,
    from: &User,
    to: &User,
) -> Result<usize, CollabError> {
    let memberships = tx.list_user_memberships(from.id).await?;
    for membership in &memberships {
        Membership::remove(tx, membership.project_id, from.id).await?;
        if !Membership::is_member(tx, membership.project_id, to.id).await? {
            Membership::add(tx, membership.project_id, to.id, ProjectRole::Admin).await?;
        }
    }
    Ok(memberships.len())
}
