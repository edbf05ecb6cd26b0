//! Key provider abstraction for the external key-protection seam.
//!
//! Key creation and rotation are deliberately outside this trait: the engine
//! only consumes key material, it never manages its lifecycle.

use crate::error::KeyProviderError;
use secrecy::SecretVec;

/// Provides key-protection operations for encryption and shadow indexing.
///
/// Implementations must be thread-safe (`Send + Sync`); a single provider is
/// shared by every commit in flight via `Arc<dyn KeyProvider>`.
pub trait KeyProvider: Send + Sync {
    /// Returns the identifier of the current (active) KEK.
    ///
    /// # Errors
    ///
    /// Returns `KeyProviderError::NoActiveKek` if no KEK is configured.
    fn current_kek_id(&self) -> Result<String, KeyProviderError>;

    /// Wraps (encrypts) a Data Encryption Key (DEK) with the specified KEK.
    ///
    /// # Arguments
    ///
    /// * `kek_id` - Identifier of the KEK to use for wrapping
    /// * `dek` - The plaintext DEK to wrap (typically 32 bytes)
    ///
    /// # Errors
    ///
    /// Returns `KeyProviderError::WrapFailed` if wrapping fails.
    fn wrap_dek(&self, kek_id: &str, dek: &[u8]) -> Result<Vec<u8>, KeyProviderError>;

    /// Unwraps (decrypts) a Data Encryption Key (DEK) using the specified KEK.
    ///
    /// # Returns
    ///
    /// Returns the plaintext DEK in a `SecretVec` for memory safety.
    ///
    /// # Errors
    ///
    /// Returns `KeyProviderError::UnwrapFailed` if unwrapping fails, or
    /// `KeyProviderError::KekNotFound` if the ciphertext names a KEK this
    /// provider does not hold.
    fn unwrap_dek(
        &self,
        kek_id: &str,
        wrapped_dek: &[u8],
    ) -> Result<SecretVec<u8>, KeyProviderError>;

    /// Returns the pepper value keying the shadow-index digest.
    ///
    /// # Returns
    ///
    /// Returns `None` if the provider has no hashing secret configured;
    /// encryption still works, but every digest path fails fast.
    ///
    /// # Errors
    ///
    /// Returns `KeyProviderError::PepperUnavailable` if pepper retrieval fails.
    fn get_pepper(&self) -> Result<Option<SecretVec<u8>>, KeyProviderError> {
        Ok(None)
    }
}
