//! Environment-backed key provider for `KalkanDB`.
//!
//! Secrets come from external configuration, never from code:
//!
//! ```text
//! KALKANDB__MASTER_KEY        32-byte hex master secret (required)
//! KALKANDB__HASHING_SALT      shadow-index pepper (required only for querying)
//! ```
//!
//! Each variable also supports `_FILE` indirection in the docker-secrets
//! style: `KALKANDB__MASTER_KEY_FILE=/run/secrets/master` reads the trimmed
//! file contents instead. The KEK is derived from the master secret with
//! HKDF-SHA256, so the raw secret is never used as a cipher key directly.
//!
//! A missing hashing salt is not an error here: encryption proceeds without
//! it, and digest paths fail fast with `MissingKeyMaterial` on first use.

#![warn(clippy::pedantic, clippy::nursery)]

use chacha20poly1305::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    ChaCha20Poly1305, Nonce,
};
use kalkandb::error::KeyProviderError;
use kalkandb::kdf::derive_subkey;
use kalkandb::key_provider::KeyProvider;
use secrecy::{ExposeSecret, SecretVec};
use sha2::{Digest, Sha256};
use std::env;
use std::fs;
use zeroize::Zeroizing;

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "KALKANDB";

/// Required master-key length in bytes.
const MASTER_KEY_LEN: usize = 32;

/// Nonce size for DEK wrapping (96 bits).
const NONCE_SIZE: usize = 12;

/// HKDF label separating the KEK from other keys derived from the master.
const KEK_LABEL: &str = "kalkandb/kek";

/// Key provider backed by environment configuration.
///
/// # Example
///
/// ```ignore
/// use kalkandb_key_env::EnvKeyProvider;
///
/// // export KALKANDB__MASTER_KEY=<64 hex chars>
/// // export KALKANDB__HASHING_SALT=<random string>
/// let provider = EnvKeyProvider::from_env()?;
/// ```
pub struct EnvKeyProvider {
    kek_id: String,
    kek: SecretVec<u8>,
    pepper: Option<SecretVec<u8>>,
}

impl EnvKeyProvider {
    /// Creates a provider from the standard `KALKANDB__*` variables.
    ///
    /// # Errors
    ///
    /// Returns `KeyProviderError::NoActiveKek` if the master key is not
    /// configured, or `KeyProviderError::InvalidKeyMaterial` if it is
    /// malformed.
    pub fn from_env() -> Result<Self, KeyProviderError> {
        Self::from_env_prefixed(DEFAULT_ENV_PREFIX)
    }

    /// Creates a provider from `<prefix>__*` variables.
    ///
    /// Distinct prefixes let several isolated schemas (or tests) coexist in
    /// one process without sharing secrets.
    ///
    /// # Errors
    ///
    /// Same conditions as [`from_env`](Self::from_env).
    pub fn from_env_prefixed(prefix: &str) -> Result<Self, KeyProviderError> {
        let master_hex = read_secret(&format!("{prefix}__MASTER_KEY"))?
            .ok_or(KeyProviderError::NoActiveKek)?;

        let master = Zeroizing::new(hex::decode(master_hex.as_str()).map_err(|e| {
            KeyProviderError::InvalidKeyMaterial(format!("master key is not valid hex: {e}"))
        })?);

        let pepper = read_secret(&format!("{prefix}__HASHING_SALT"))?
            .map(|salt| SecretVec::new(salt.as_bytes().to_vec()));

        Self::new(SecretVec::new(master.to_vec()), pepper)
    }

    /// Creates a provider from key material directly.
    ///
    /// # Arguments
    ///
    /// * `master` - 32-byte master secret; the KEK is derived from it
    /// * `pepper` - Optional hashing secret for the shadow index
    ///
    /// # Errors
    ///
    /// Returns `KeyProviderError::InvalidKeyMaterial` if the master secret
    /// has the wrong length or KEK derivation fails.
    pub fn new(
        master: SecretVec<u8>,
        pepper: Option<SecretVec<u8>>,
    ) -> Result<Self, KeyProviderError> {
        if master.expose_secret().len() != MASTER_KEY_LEN {
            return Err(KeyProviderError::InvalidKeyMaterial(format!(
                "master key must be {MASTER_KEY_LEN} bytes, got {}",
                master.expose_secret().len()
            )));
        }

        let kek = derive_subkey(&master, KEK_LABEL).map_err(|_| {
            KeyProviderError::InvalidKeyMaterial("KEK derivation failed".to_string())
        })?;

        // The KEK id is a fingerprint of the master secret, so ciphertext
        // produced under a different secret names a KEK this provider does
        // not hold and fails with KekNotFound instead of garbage output.
        let fingerprint = Sha256::digest(master.expose_secret());
        let kek_id = format!("env-{}", hex::encode(&fingerprint[..4]));

        Ok(Self { kek_id, kek, pepper })
    }
}

impl KeyProvider for EnvKeyProvider {
    fn current_kek_id(&self) -> Result<String, KeyProviderError> {
        Ok(self.kek_id.clone())
    }

    fn wrap_dek(&self, kek_id: &str, dek: &[u8]) -> Result<Vec<u8>, KeyProviderError> {
        if kek_id != self.kek_id {
            return Err(KeyProviderError::KekNotFound(kek_id.to_string()));
        }

        let cipher = ChaCha20Poly1305::new_from_slice(self.kek.expose_secret())
            .map_err(|e| KeyProviderError::WrapFailed(format!("invalid KEK: {e}")))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from(nonce_bytes);

        let wrapped = cipher
            .encrypt(&nonce, dek)
            .map_err(|e| KeyProviderError::WrapFailed(format!("DEK encryption failed: {e}")))?;

        let mut result = Vec::with_capacity(NONCE_SIZE + wrapped.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&wrapped);
        Ok(result)
    }

    fn unwrap_dek(
        &self,
        kek_id: &str,
        wrapped_dek: &[u8],
    ) -> Result<SecretVec<u8>, KeyProviderError> {
        if kek_id != self.kek_id {
            return Err(KeyProviderError::KekNotFound(kek_id.to_string()));
        }

        if wrapped_dek.len() < NONCE_SIZE {
            return Err(KeyProviderError::UnwrapFailed("wrapped DEK too short".to_string()));
        }

        let cipher = ChaCha20Poly1305::new_from_slice(self.kek.expose_secret())
            .map_err(|e| KeyProviderError::UnwrapFailed(format!("invalid KEK: {e}")))?;

        let nonce_bytes: [u8; NONCE_SIZE] = wrapped_dek[..NONCE_SIZE]
            .try_into()
            .map_err(|_| KeyProviderError::UnwrapFailed("invalid nonce".to_string()))?;
        let nonce = Nonce::from(nonce_bytes);

        let dek = cipher
            .decrypt(&nonce, &wrapped_dek[NONCE_SIZE..])
            .map_err(|e| KeyProviderError::UnwrapFailed(format!("DEK decryption failed: {e}")))?;

        Ok(SecretVec::new(dek))
    }

    fn get_pepper(&self) -> Result<Option<SecretVec<u8>>, KeyProviderError> {
        Ok(self.pepper.as_ref().map(|p| SecretVec::new(p.expose_secret().clone())))
    }
}

/// Reads a secret from `var`, falling back to `var_FILE` indirection.
///
/// Empty values count as absent, so a blank variable is never silently
/// promoted to a usable secret.
fn read_secret(var: &str) -> Result<Option<Zeroizing<String>>, KeyProviderError> {
    if let Ok(value) = env::var(var) {
        let value = Zeroizing::new(value);
        if !value.trim().is_empty() {
            return Ok(Some(Zeroizing::new(value.trim().to_string())));
        }
    }

    if let Ok(path) = env::var(format!("{var}_FILE")) {
        if !path.trim().is_empty() {
            let contents = Zeroizing::new(fs::read_to_string(path.trim())?);
            if !contents.trim().is_empty() {
                return Ok(Some(Zeroizing::new(contents.trim().to_string())));
            }
        }
    }

    Ok(None)
}
