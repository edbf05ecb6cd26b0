//! Vault for sealing and opening field values.
//!
//! The Vault provides the authenticated-encryption half of the conversion
//! pipeline using envelope encryption with AEAD ciphers. Encryption is
//! deliberately non-deterministic (fresh DEK and nonce per call); equality
//! search therefore never touches ciphertext and goes through the shadow
//! hash index instead.

use crate::context::FieldContext;
use crate::error::Error;
use crate::header::{EncryptionHeader, HeaderFlags};
use crate::kdf::generate_dek;
use crate::key_provider::KeyProvider;
use aes_gcm::Aes256Gcm;
use chacha20poly1305::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng, Payload},
    ChaCha20Poly1305,
};
use secrecy::ExposeSecret;
use std::sync::Arc;

/// Nonce size for both supported AEAD ciphers (96 bits).
const NONCE_SIZE: usize = 12;

/// Cipher mode for encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherMode {
    /// ChaCha20-Poly1305 AEAD cipher (default).
    ChaCha20Poly1305,
    /// AES-256-GCM AEAD cipher.
    Aes256Gcm,
}

impl Default for CipherMode {
    fn default() -> Self {
        Self::ChaCha20Poly1305
    }
}

/// Vault for encryption and decryption of field values.
///
/// The Vault uses envelope encryption:
/// 1. Generate a random DEK (Data Encryption Key)
/// 2. Encrypt data with the DEK using AEAD, binding the field context as
///    associated data
/// 3. Wrap (encrypt) the DEK with a KEK (Key Encryption Key) from the provider
/// 4. Store the wrapped DEK in the ciphertext header
///
/// The cipher used is recorded in the header, so previously stored values
/// decrypt correctly after the default mode changes.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use kalkandb::vault::{Vault, CipherMode};
/// use kalkandb::context::FieldContext;
/// use kalkandb_key_env::EnvKeyProvider;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = Arc::new(EnvKeyProvider::from_env()?);
/// let vault = Vault::new(provider, CipherMode::default());
///
/// let context = FieldContext::new("users", "email");
/// let plaintext = b"alice@example.com";
///
/// let ciphertext = vault.encrypt(plaintext, &context)?;
/// let decrypted = vault.decrypt(&ciphertext, &context)?;
///
/// assert_eq!(plaintext, &decrypted[..]);
/// # Ok(())
/// # }
/// ```
pub struct Vault {
    provider: Arc<dyn KeyProvider>,
    cipher_mode: CipherMode,
}

impl Vault {
    /// Creates a new Vault with the specified key provider and cipher mode.
    ///
    /// # Arguments
    ///
    /// * `provider` - Key provider for KEK management
    /// * `cipher_mode` - Cipher mode to use for new encryptions
    #[must_use]
    pub fn new(provider: Arc<dyn KeyProvider>, cipher_mode: CipherMode) -> Self {
        Self { provider, cipher_mode }
    }

    /// Returns the key provider backing this vault.
    #[must_use]
    pub fn provider(&self) -> &Arc<dyn KeyProvider> {
        &self.provider
    }

    /// Encrypts plaintext using envelope encryption.
    ///
    /// # Arguments
    ///
    /// * `plaintext` - Data to encrypt
    /// * `context` - Field context bound as associated data
    ///
    /// # Returns
    ///
    /// Ciphertext with embedded header: `[header][encrypted_data]`
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Key provider operations fail
    /// - Encryption fails
    /// - Header serialization fails
    pub fn encrypt(&self, plaintext: &[u8], context: &FieldContext) -> Result<Vec<u8>, Error> {
        // Generate a random DEK for this encryption operation
        let dek = generate_dek();

        // Get the current KEK ID
        let kek_id = self.provider.current_kek_id()?;

        // Wrap the DEK with the KEK
        let wrapped_dek = self.provider.wrap_dek(&kek_id, dek.expose_secret())?;

        // Generate a random nonce
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);

        // Bind the owning field as associated data
        let aad = context.to_string();
        let payload = Payload { msg: plaintext, aad: aad.as_bytes() };

        let (ciphertext, flags) = match self.cipher_mode {
            CipherMode::ChaCha20Poly1305 => {
                let cipher = ChaCha20Poly1305::new_from_slice(dek.expose_secret())
                    .map_err(|e| Error::EncryptionFailed(format!("Invalid DEK: {e}")))?;

                let nonce = chacha20poly1305::Nonce::from(nonce_bytes);
                let ciphertext = cipher.encrypt(&nonce, payload).map_err(|e| {
                    Error::EncryptionFailed(format!("ChaCha20-Poly1305 encryption failed: {e}"))
                })?;

                (ciphertext, HeaderFlags::empty())
            }
            CipherMode::Aes256Gcm => {
                let cipher = Aes256Gcm::new_from_slice(dek.expose_secret())
                    .map_err(|e| Error::EncryptionFailed(format!("Invalid DEK: {e}")))?;

                let nonce = aes_gcm::Nonce::from(nonce_bytes);
                let ciphertext = cipher.encrypt(&nonce, payload).map_err(|e| {
                    Error::EncryptionFailed(format!("AES-256-GCM encryption failed: {e}"))
                })?;

                (ciphertext, HeaderFlags::empty().with_aes_gcm())
            }
        };

        // Create and serialize the header
        let header = EncryptionHeader::new(kek_id, wrapped_dek, flags, nonce_bytes.to_vec());
        let header_bytes = header.to_bytes()?;

        // Combine header and ciphertext
        let mut result = Vec::with_capacity(header_bytes.len() + ciphertext.len());
        result.extend_from_slice(&header_bytes);
        result.extend_from_slice(&ciphertext);

        Ok(result)
    }

    /// Decrypts ciphertext using envelope encryption.
    ///
    /// # Arguments
    ///
    /// * `ciphertext` - Encrypted data with header
    /// * `context` - Field context (must match the one used for encryption)
    ///
    /// # Returns
    ///
    /// The original plaintext.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Header parsing fails
    /// - Key provider operations fail
    /// - Authentication fails (tampered data or wrong context)
    pub fn decrypt(&self, ciphertext: &[u8], context: &FieldContext) -> Result<Vec<u8>, Error> {
        // Parse header
        let (header, header_len) = EncryptionHeader::from_bytes(ciphertext)?;

        // Extract the encrypted data
        let encrypted_data = &ciphertext[header_len..];

        // Unwrap the DEK
        let dek = self.provider.unwrap_dek(header.kek_id(), header.wrapped_dek())?;

        let nonce_bytes: [u8; NONCE_SIZE] = header
            .nonce()
            .try_into()
            .map_err(|_| Error::DecryptionFailed("Invalid nonce size".to_string()))?;

        // Bind the same associated data used during encryption
        let aad = context.to_string();
        let payload = Payload { msg: encrypted_data, aad: aad.as_bytes() };

        // The cipher is recorded in the header, not taken from this vault's mode
        let plaintext = if header.flags().is_aes_gcm() {
            let cipher = Aes256Gcm::new_from_slice(dek.expose_secret())
                .map_err(|e| Error::DecryptionFailed(format!("Invalid DEK: {e}")))?;

            let nonce = aes_gcm::Nonce::from(nonce_bytes);
            cipher.decrypt(&nonce, payload).map_err(|_| Error::AuthenticationFailed)?
        } else {
            let cipher = ChaCha20Poly1305::new_from_slice(dek.expose_secret())
                .map_err(|e| Error::DecryptionFailed(format!("Invalid DEK: {e}")))?;

            let nonce = chacha20poly1305::Nonce::from(nonce_bytes);
            cipher.decrypt(&nonce, payload).map_err(|_| Error::AuthenticationFailed)?
        };

        Ok(plaintext)
    }
}

impl Clone for Vault {
    fn clone(&self) -> Self {
        Self { provider: Arc::clone(&self.provider), cipher_mode: self.cipher_mode }
    }
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault").field("cipher_mode", &self.cipher_mode).finish_non_exhaustive()
    }
}
