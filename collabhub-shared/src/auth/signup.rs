/// Pending external signups
///
/// When an external provider authenticates someone who has no account yet,
/// their verified profile is parked here under a short-lived `sgn_` token
/// until the client confirms the signup.
///
/// Entries expire after a fixed TTL (30 minutes by default). Expiry is lazy:
/// an expired entry is evicted when it is read and reported as absent, and
/// every insert sweeps out whatever else has expired.
/// Entries live in process memory only, so a restart drops every pending
/// signup and the user simply signs in with the provider again.
///
/// # Example
///
/// ```
/// use collabhub_shared::auth::identity::{ExternalProfile, Provider};
/// use collabhub_shared::auth::signup::PendingSignupStore;
///
/// let store = PendingSignupStore::default();
/// let token = store.insert(ExternalProfile {
///     email: "gina@x.com".into(),
///     name: "Gina".into(),
///     provider: Provider::Google,
///     provider_id: "g-42".into(),
/// });
///
/// assert!(store.get(&token).is_some());
/// assert!(store.take(&token).is_some());
/// assert!(store.get(&token).is_none());
/// ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::identity::ExternalProfile;
use super::tokens::{generate_token, SIGNUP_TOKEN_PREFIX};

pub const DEFAULT_SIGNUP_TTL_MINUTES: i64 = 30;

#[derive(Debug, Clone)]
struct PendingSignup {
    profile: ExternalProfile,
    expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct PendingSignupStore {
    entries: Mutex<HashMap<String, PendingSignup>>,
    ttl: Duration,
}

impl Default for PendingSignupStore {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_SIGNUP_TTL_MINUTES))
    }
}

impl PendingSignupStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, PendingSignup>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Parks a profile and returns its token
    pub fn insert(&self, profile: ExternalProfile) -> String {
        let token = generate_token(SIGNUP_TOKEN_PREFIX);
        let now = Utc::now();

        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at >= now);
        if entries.len() < before {
            debug!(evicted = before - entries.len(), "Swept expired pending signups");
        }

        entries.insert(
            token.clone(),
            PendingSignup {
                profile,
                expires_at: now + self.ttl,
            },
        );
        token
    }

    /// Reads a pending profile, evicting it if it has expired
    pub fn get(&self, token: &str) -> Option<ExternalProfile> {
        let mut entries = self.lock();
        let expired = entries.get(token)?.expires_at < Utc::now();
        if expired {
            debug!("Evicting expired pending signup");
            entries.remove(token);
            return None;
        }
        entries.get(token).map(|entry| entry.profile.clone())
    }

    /// Reads and removes a pending profile; tokens are single use
    pub fn take(&self, token: &str) -> Option<ExternalProfile> {
        let entry = self.lock().remove(token)?;
        if entry.expires_at < Utc::now() {
            return None;
        }
        Some(entry.profile)
    }

    pub fn remove(&self, token: &str) -> bool {
        self.lock().remove(token).is_some()
    }

    /// Entries currently held, including expired ones not yet read
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::Provider;

    fn profile() -> ExternalProfile {
        ExternalProfile {
            email: "hank@x.com".into(),
            name: "Hank".into(),
            provider: Provider::Kakao,
            provider_id: "99".into(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let store = PendingSignupStore::default();
        let token = store.insert(profile());

        assert!(token.starts_with("sgn_"));
        assert_eq!(store.get(&token), Some(profile()));
        // reads do not consume
        assert_eq!(store.get(&token), Some(profile()));
    }

    #[test]
    fn test_expired_entry_evicted_on_read() {
        let store = PendingSignupStore::new(Duration::seconds(-1));
        let token = store.insert(profile());
        assert_eq!(store.len(), 1);

        assert_eq!(store.get(&token), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_insert_sweeps_expired_entries() {
        let store = PendingSignupStore::new(Duration::seconds(-1));
        store.insert(profile());
        store.insert(profile());
        store.insert(profile());

        // only the newest, itself already expired, survives each sweep
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_insert_keeps_live_entries() {
        let store = PendingSignupStore::default();
        let first = store.insert(profile());
        store.insert(profile());

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(&first), Some(profile()));
    }

    #[test]
    fn test_take_is_single_use() {
        let store = PendingSignupStore::default();
        let token = store.insert(profile());

        assert!(store.take(&token).is_some());
        assert!(store.take(&token).is_none());
    }

    #[test]
    fn test_take_expired_fails() {
        let store = PendingSignupStore::new(Duration::seconds(-1));
        let token = store.insert(profile());
        assert!(store.take(&token).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_unknown_token() {
        let store = PendingSignupStore::default();
        assert!(store.get("sgn_missing").is_none());
        assert!(!store.remove("sgn_missing"));
    }
}
