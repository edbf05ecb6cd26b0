//! Keyed digest for the searchable shadow index.
//!
//! Shadow index values are HMAC-SHA256 digests of a field's canonical
//! plaintext, keyed with a secret pepper. The digest is deterministic for a
//! fixed `(plaintext, pepper)` pair, which is what makes equality search
//! possible, while the pepper keeps the index non-invertible by dictionary
//! attack.

use crate::error::Error;
use crate::key_provider::KeyProvider;
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Length of the rendered digest in hex characters (SHA-256 output).
pub const DIGEST_HEX_LEN: usize = 64;

/// Computes the shadow-index digest of a plaintext value.
///
/// The digest is `HMAC-SHA256(pepper, plaintext)` rendered as lowercase
/// hexadecimal. Text values are digested over their UTF-8 bytes.
///
/// # Arguments
///
/// * `provider` - Key provider that supplies the pepper
/// * `plaintext` - The canonical plaintext bytes to digest
///
/// # Errors
///
/// Returns `Error::MissingKeyMaterial` if the provider has no pepper or the
/// pepper is empty. An absent secret is a fatal misconfiguration, never
/// substituted with a default.
///
/// # Example
///
/// ```ignore
/// use kalkandb::digest::keyed_digest;
/// use kalkandb_key_env::EnvKeyProvider;
///
/// let provider = EnvKeyProvider::from_env()?;
/// let digest = keyed_digest(&provider, b"404-69-1337")?;
/// assert_eq!(digest.len(), 64);
/// ```
pub fn keyed_digest(provider: &dyn KeyProvider, plaintext: &[u8]) -> Result<String, Error> {
    let pepper = provider.get_pepper()?.ok_or(Error::MissingKeyMaterial)?;

    if pepper.expose_secret().is_empty() {
        return Err(Error::MissingKeyMaterial);
    }

    // HMAC accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(pepper.expose_secret())
        .map_err(|_| Error::MissingKeyMaterial)?;
    mac.update(plaintext);

    Ok(hex::encode(mac.finalize().into_bytes()))
}
