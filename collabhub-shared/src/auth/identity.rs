/// Identity resolution
///
/// Requests reach the core with one of several kinds of authentication
/// context: a local session token, an external provider's attribute bag, a
/// username from a credential login, or an already-loaded account. [`resolve`]
/// is the single place that knows how to project each of them onto a
/// canonical [`Identity`] (a lowercased email). Handlers call it once at the
/// boundary instead of branching on the principal type themselves.
///
/// # Provider attribute shapes
///
/// | provider | email                  | name                              | subject id     |
/// |----------|------------------------|-----------------------------------|----------------|
/// | google   | `email`                | `name`                            | `sub`          |
/// | naver    | `response.email`       | `response.name`                   | `response.id`  |
/// | kakao    | `kakao_account.email`  | `kakao_account.profile.nickname`  | `id`           |
///
/// # Example
///
/// ```
/// use collabhub_shared::auth::identity::{resolve, AuthContext, Provider};
/// use serde_json::json;
///
/// let ctx = AuthContext::External {
///     provider: Provider::Naver,
///     attributes: json!({ "response": { "id": "n-1", "email": "Bob@X.com", "name": "Bob" } }),
/// };
/// assert_eq!(resolve(&ctx).unwrap().email(), "bob@x.com");
/// ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::jwt::Claims;
use crate::models::user::{normalize_email, User};

/// Principal name some session layers use for unauthenticated callers
pub const ANONYMOUS_PRINCIPAL: &str = "anonymousUser";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("No authenticated principal")]
    Anonymous,

    #[error("{provider} did not supply {attribute}")]
    MissingAttribute {
        provider: &'static str,
        attribute: &'static str,
    },

    #[error("Unsupported identity provider: {0}")]
    UnknownProvider(String),
}

/// External identity providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Naver,
    Kakao,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Naver => "naver",
            Provider::Kakao => "kakao",
        }
    }

    fn email(&self, attributes: &Value) -> Option<String> {
        match self {
            Provider::Google => string_at(attributes, &["email"]),
            Provider::Naver => string_at(attributes, &["response", "email"]),
            Provider::Kakao => string_at(attributes, &["kakao_account", "email"]),
        }
    }

    fn name(&self, attributes: &Value) -> Option<String> {
        match self {
            Provider::Google => string_at(attributes, &["name"]),
            Provider::Naver => string_at(attributes, &["response", "name"]),
            Provider::Kakao => string_at(attributes, &["kakao_account", "profile", "nickname"]),
        }
    }

    fn subject(&self, attributes: &Value) -> Option<String> {
        match self {
            Provider::Google => string_at(attributes, &["sub"]),
            Provider::Naver => string_at(attributes, &["response", "id"]),
            Provider::Kakao => string_at(attributes, &["id"]),
        }
    }

    /// Extracts the full profile used to provision an account
    ///
    /// # Errors
    ///
    /// `MissingAttribute` if the email, name or subject id cannot be located
    pub fn profile(&self, attributes: &Value) -> Result<ExternalProfile, IdentityError> {
        let missing = |attribute| IdentityError::MissingAttribute {
            provider: self.as_str(),
            attribute,
        };

        let email = self.email(attributes).ok_or_else(|| missing("email"))?;
        let name = self.name(attributes).ok_or_else(|| missing("name"))?;
        let provider_id = self.subject(attributes).ok_or_else(|| missing("id"))?;

        Ok(ExternalProfile {
            email: normalize_email(&email),
            name,
            provider: *self,
            provider_id,
        })
    }
}

impl std::str::FromStr for Provider {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Ok(Provider::Google),
            "naver" => Ok(Provider::Naver),
            "kakao" => Ok(Provider::Kakao),
            other => Err(IdentityError::UnknownProvider(other.to_string())),
        }
    }
}

/// Verified profile handed over by an external identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalProfile {
    pub email: String,
    pub name: String,
    pub provider: Provider,
    pub provider_id: String,
}

/// Authentication context attached to an inbound request
#[derive(Debug, Clone)]
pub enum AuthContext {
    /// Nothing authenticated the caller
    Anonymous,

    /// A credential login; `username` is the login email
    Credentials { username: String },

    /// A principal from an external provider, still in its raw attribute shape
    External { provider: Provider, attributes: Value },

    /// A validated local session token
    Session(Claims),

    /// An account already loaded from storage
    Account(User),
}

/// Canonical caller identity: a normalized email address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    email: String,
}

impl Identity {
    /// Builds an identity from a raw email, normalizing case and whitespace
    pub fn from_email(email: &str) -> Result<Self, IdentityError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(IdentityError::Anonymous);
        }
        Ok(Self { email })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Case-insensitive comparison against another address
    pub fn matches(&self, email: &str) -> bool {
        self.email == normalize_email(email)
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.email)
    }
}

/// Projects an authentication context onto a canonical identity
///
/// # Errors
///
/// - `Anonymous` for no context, a blank principal, or the anonymous placeholder
/// - `MissingAttribute` when an external provider's bag has no email
pub fn resolve(ctx: &AuthContext) -> Result<Identity, IdentityError> {
    match ctx {
        AuthContext::Anonymous => Err(IdentityError::Anonymous),
        AuthContext::Credentials { username } => {
            if username.trim().is_empty() || username == ANONYMOUS_PRINCIPAL {
                return Err(IdentityError::Anonymous);
            }
            Identity::from_email(username)
        }
        AuthContext::External {
            provider,
            attributes,
        } => {
            let email = provider
                .email(attributes)
                .ok_or(IdentityError::MissingAttribute {
                    provider: provider.as_str(),
                    attribute: "email",
                })?;
            Identity::from_email(&email)
        }
        AuthContext::Session(claims) => Identity::from_email(&claims.email),
        AuthContext::Account(user) => Identity::from_email(&user.email),
    }
}

/// Walks `path` through nested objects; accepts non-blank strings and numbers
fn string_at(value: &Value, path: &[&str]) -> Option<String> {
    let leaf = path.iter().try_fold(value, |node, key| node.get(*key))?;
    match leaf {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::TokenType;
    use crate::models::user::SystemRole;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_anonymous_contexts_rejected() {
        assert_eq!(resolve(&AuthContext::Anonymous), Err(IdentityError::Anonymous));
        assert_eq!(
            resolve(&AuthContext::Credentials {
                username: ANONYMOUS_PRINCIPAL.to_string()
            }),
            Err(IdentityError::Anonymous)
        );
        assert_eq!(
            resolve(&AuthContext::Credentials {
                username: "   ".to_string()
            }),
            Err(IdentityError::Anonymous)
        );
    }

    #[test]
    fn test_credentials_normalized() {
        let identity = resolve(&AuthContext::Credentials {
            username: "Alice@X.COM".to_string(),
        })
        .unwrap();
        assert_eq!(identity.email(), "alice@x.com");
        assert!(identity.matches(" ALICE@x.com"));
    }

    #[test]
    fn test_google_shape() {
        let ctx = AuthContext::External {
            provider: Provider::Google,
            attributes: json!({ "sub": "g-1", "email": "Carol@Gmail.com", "name": "Carol" }),
        };
        assert_eq!(resolve(&ctx).unwrap().email(), "carol@gmail.com");
    }

    #[test]
    fn test_kakao_shape() {
        let attributes = json!({
            "id": 123456789,
            "kakao_account": {
                "email": "dave@kakao.com",
                "profile": { "nickname": "Dave" }
            }
        });
        let ctx = AuthContext::External {
            provider: Provider::Kakao,
            attributes: attributes.clone(),
        };
        assert_eq!(resolve(&ctx).unwrap().email(), "dave@kakao.com");

        let profile = Provider::Kakao.profile(&attributes).unwrap();
        assert_eq!(profile.name, "Dave");
        assert_eq!(profile.provider_id, "123456789");
        assert_eq!(profile.provider, Provider::Kakao);
    }

    #[test]
    fn test_naver_profile() {
        let attributes = json!({ "response": { "id": "n-7", "email": "Erin@Naver.com", "name": "Erin" } });
        let profile = Provider::Naver.profile(&attributes).unwrap();
        assert_eq!(profile.email, "erin@naver.com");
        assert_eq!(profile.provider_id, "n-7");
    }

    #[test]
    fn test_wrong_shape_has_no_email() {
        // a flat google-style bag does not satisfy the naver shape
        let ctx = AuthContext::External {
            provider: Provider::Naver,
            attributes: json!({ "email": "x@y.com", "name": "X" }),
        };
        assert_eq!(
            resolve(&ctx),
            Err(IdentityError::MissingAttribute {
                provider: "naver",
                attribute: "email"
            })
        );
    }

    #[test]
    fn test_profile_requires_name() {
        let result = Provider::Google.profile(&json!({ "sub": "g-1", "email": "a@b.c" }));
        assert!(matches!(
            result,
            Err(IdentityError::MissingAttribute { attribute: "name", .. })
        ));
    }

    #[test]
    fn test_session_claims() {
        let claims = Claims::new(Uuid::new_v4(), "frank@x.com", SystemRole::User, TokenType::Access);
        assert_eq!(resolve(&AuthContext::Session(claims)).unwrap().email(), "frank@x.com");
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("Google".parse::<Provider>().unwrap(), Provider::Google);
        assert!("github".parse::<Provider>().is_err());
    }
}
