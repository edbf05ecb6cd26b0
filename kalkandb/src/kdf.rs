//! Key derivation using HKDF (HMAC-based Key Derivation Function).
//!
//! This module generates random Data Encryption Keys (DEKs) for envelope
//! encryption and derives labeled subkeys from a master secret with
//! HKDF-SHA256. Providers use the latter to split one configured secret into
//! independent keys.

use crate::error::Error;
use hkdf::Hkdf;
use secrecy::{ExposeSecret, SecretVec};
use sha2::Sha256;

/// Standard DEK size in bytes (256 bits).
pub const DEK_SIZE: usize = 32;

/// Derives a labeled subkey from a master secret using HKDF-SHA256.
///
/// The `label` is the HKDF `info` parameter; distinct labels yield
/// independent keys from the same master secret.
///
/// # Errors
///
/// Returns `Error::KeyDerivation` if the expansion fails.
///
/// # Example
///
/// ```
/// use kalkandb::kdf::derive_subkey;
/// use secrecy::SecretVec;
///
/// let master = SecretVec::new(vec![0u8; 32]);
/// let kek = derive_subkey(&master, "kalkandb/kek").expect("derivation failed");
/// ```
pub fn derive_subkey(master: &SecretVec<u8>, label: &str) -> Result<SecretVec<u8>, Error> {
    let hkdf = Hkdf::<Sha256>::new(None, master.expose_secret());

    let mut subkey = vec![0u8; DEK_SIZE];
    hkdf.expand(label.as_bytes(), &mut subkey).map_err(|_| Error::KeyDerivation)?;

    Ok(SecretVec::new(subkey))
}

/// Generates a random DEK for envelope encryption.
///
/// This DEK should be wrapped (encrypted) with a KEK before storage.
///
/// # Example
///
/// ```
/// use kalkandb::kdf::generate_dek;
/// use secrecy::ExposeSecret;
///
/// let dek = generate_dek();
/// assert_eq!(dek.expose_secret().len(), 32);
/// ```
#[must_use]
pub fn generate_dek() -> SecretVec<u8> {
    use chacha20poly1305::aead::{rand_core::RngCore, OsRng};

    let mut dek = vec![0u8; DEK_SIZE];
    OsRng.fill_bytes(&mut dek);
    SecretVec::new(dek)
}
