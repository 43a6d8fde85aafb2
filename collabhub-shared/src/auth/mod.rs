/// Authentication and authorization
///
/// # Modules
///
/// - [`assertion`]: signed identity assertions from the external sign-in collaborator
/// - [`identity`]: projects authentication contexts onto a canonical identity
/// - [`authorization`]: the per-project capability engine
/// - [`jwt`]: HS256 session tokens
/// - [`password`]: Argon2id password hashing
/// - [`signup`]: short-lived store for pending external signups
/// - [`tokens`]: random invitation and signup tokens

pub mod assertion;
pub mod authorization;
pub mod identity;
pub mod jwt;
pub mod password;
pub mod signup;
pub mod tokens;
