//! Error types for `KalkanDB` operations.

use std::fmt;

use crate::model::FieldKind;

/// Main error type for `KalkanDB` operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Encryption operation failed
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption operation failed
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// Authentication tag verification failed (data may be corrupted or tampered)
    #[error("authentication failed: ciphertext may be corrupted or tampered")]
    AuthenticationFailed,

    /// A field marked as encrypted has no canonical text or byte form
    #[error(
        "unsupported field type for {entity}.{field}: {kind:?} has no canonical form; \
         register an intermediary converter or use a text/byte field"
    )]
    UnsupportedFieldType {
        /// Entity owning the field
        entity: String,
        /// Field name
        field: String,
        /// The field's declared kind
        kind: FieldKind,
    },

    /// The hashing secret is absent or empty
    #[error("missing key material: the hashing salt is not configured; shadow indexes are unavailable")]
    MissingKeyMaterial,

    /// Query rewrite requested on a field that is not queryable
    #[error("field {entity}.{field} is not queryable: mark it encrypted and queryable before filtering on it")]
    FieldNotQueryable {
        /// Entity owning the field
        entity: String,
        /// Field name
        field: String,
    },

    /// Key provider operation failed
    #[error("key provider error: {0}")]
    KeyProvider(#[from] KeyProviderError),

    /// Encryption header parsing failed
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Key derivation failed
    #[error("key derivation failed")]
    KeyDerivation,

    /// Unsupported protocol version
    #[error("unsupported version: {version} (supported: {supported})")]
    UnsupportedVersion {
        /// The version found in the ciphertext
        version: u8,
        /// Supported versions
        supported: String,
    },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors specific to key provider operations.
#[derive(Debug)]
pub enum KeyProviderError {
    /// KEK not found
    KekNotFound(String),

    /// No active KEK configured
    NoActiveKek,

    /// DEK wrapping failed
    WrapFailed(String),

    /// DEK unwrapping failed
    UnwrapFailed(String),

    /// Pepper not available
    PepperUnavailable(String),

    /// Key material is malformed (wrong length, bad encoding)
    InvalidKeyMaterial(String),

    /// I/O operation failed
    Io(std::io::Error),
}

impl fmt::Display for KeyProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KekNotFound(id) => write!(f, "KEK not found: {id}"),
            Self::NoActiveKek => write!(f, "no active KEK configured"),
            Self::WrapFailed(msg) => write!(f, "DEK wrap failed: {msg}"),
            Self::UnwrapFailed(msg) => write!(f, "DEK unwrap failed: {msg}"),
            Self::PepperUnavailable(msg) => write!(f, "pepper not available: {msg}"),
            Self::InvalidKeyMaterial(msg) => write!(f, "invalid key material: {msg}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for KeyProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for KeyProviderError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
