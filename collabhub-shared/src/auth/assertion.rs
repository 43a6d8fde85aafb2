/// Signed identity assertions from the external sign-in collaborator
///
/// The OAuth2 handshake with Google, Naver or Kakao runs outside this crate.
/// Whatever completes it forwards the provider's attribute bag to
/// `POST /v1/auth/external` and signs the exact request body with a secret
/// shared with the API. Only a body whose signature verifies is trusted as a
/// verified external identity.
///
/// # Signature
///
/// Lowercase hex HMAC-SHA256 of the raw body, sent in
/// `X-Collabhub-Identity-Signature`. Comparison is constant time.
///
/// # Example
///
/// ```
/// use collabhub_shared::auth::assertion::{sign_assertion, verify_assertion};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let body = br#"{"provider":"google","attributes":{"email":"ann@x.com"}}"#;
/// let signature = sign_assertion(b"shared-secret", body)?;
///
/// verify_assertion(b"shared-secret", body, &signature)?;
/// assert!(verify_assertion(b"other-secret", body, &signature).is_err());
/// # Ok(())
/// # }
/// ```

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

pub const IDENTITY_SIGNATURE_HEADER: &str = "X-Collabhub-Identity-Signature";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssertionError {
    #[error("Identity assertion is not signed")]
    MissingSignature,

    #[error("Identity assertion signature is not valid hex")]
    MalformedSignature,

    #[error("Identity assertion signature does not match")]
    SignatureMismatch,

    #[error("Identity assertion key is unusable")]
    SigningKey,
}

fn mac(secret: &[u8], body: &[u8]) -> Result<Hmac<Sha256>, AssertionError> {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret).map_err(|_| AssertionError::SigningKey)?;
    mac.update(body);
    Ok(mac)
}

/// Hex HMAC-SHA256 of `body` under `secret`
pub fn sign_assertion(secret: &[u8], body: &[u8]) -> Result<String, AssertionError> {
    Ok(hex::encode(mac(secret, body)?.finalize().into_bytes()))
}

/// Checks `signature` against `body`
pub fn verify_assertion(secret: &[u8], body: &[u8], signature: &str) -> Result<(), AssertionError> {
    let signature = signature.trim();
    if signature.is_empty() {
        return Err(AssertionError::MissingSignature);
    }
    let expected = hex::decode(signature).map_err(|_| AssertionError::MalformedSignature)?;

    mac(secret, body)?
        .verify_slice(&expected)
        .map_err(|_| AssertionError::SignatureMismatch)
}
