/// Random bearer tokens for invitations and pending signups
///
/// # Format
///
/// `{prefix}{32 base62 chars}`, e.g. `inv_3fZq9...`
///
/// - `inv_`: invitation redemption tokens
/// - `sgn_`: pending external-signup tokens
///
/// The random part is drawn from `rand::thread_rng()`, giving 62^32 (about
/// 2^190) possible values per prefix.
///
/// # Example
///
/// ```
/// use collabhub_shared::auth::tokens::{generate_token, validate_token_format, INVITATION_TOKEN_PREFIX};
///
/// let token = generate_token(INVITATION_TOKEN_PREFIX);
/// assert!(token.starts_with("inv_"));
/// assert!(validate_token_format(&token, INVITATION_TOKEN_PREFIX));
/// ```

use rand::Rng;

/// Length of the random part of a token
pub const TOKEN_RANDOM_LENGTH: usize = 32;

pub const INVITATION_TOKEN_PREFIX: &str = "inv_";

pub const SIGNUP_TOKEN_PREFIX: &str = "sgn_";

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generates a fresh token with the given prefix
pub fn generate_token(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let random_part: String = (0..TOKEN_RANDOM_LENGTH)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();

    format!("{}{}", prefix, random_part)
}

/// Checks prefix, length and alphabet without touching storage
///
/// Lets callers reject garbage before opening a transaction.
pub fn validate_token_format(token: &str, prefix: &str) -> bool {
    match token.strip_prefix(prefix) {
        Some(random_part) => {
            random_part.len() == TOKEN_RANDOM_LENGTH
                && random_part.bytes().all(|b| b.is_ascii_alphanumeric())
        }
        None => false,
    }
}
