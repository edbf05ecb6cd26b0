//! Conversion pipeline between native field values and their stored form.
//!
//! Every encrypted field reduces to one of two canonical forms before
//! sealing: text or a byte sequence. Fields of other kinds must register an
//! intermediary converter supplying that reduction; encryption then sits
//! between the native value and storage, with the intermediary as the
//! in-between canonical step:
//!
//! ```text
//! encode: native -> (intermediary) -> canonical -> seal -> stored
//! decode: stored -> open -> canonical -> (intermediary) -> native
//! ```
//!
//! Canonical text ciphertext is stored as base64 text so the stored value
//! stays a string; canonical byte ciphertext is stored raw.

use crate::context::FieldContext;
use crate::error::Error;
use crate::record::Value;
use crate::vault::Vault;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroizing;

/// The closed set of storage forms a field reduces to before encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalKind {
    /// UTF-8 text; ciphertext stored as base64 text.
    Text,
    /// Byte sequence; ciphertext stored as raw bytes.
    Bytes,
}

impl fmt::Display for CanonicalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Bytes => write!(f, "bytes"),
        }
    }
}

/// A field's canonical plaintext, after any intermediary conversion.
enum CanonicalValue {
    Text(String),
    Bytes(Vec<u8>),
}

type ToCanonical = Box<dyn Fn(&Value) -> Result<Value, Error> + Send + Sync>;
type FromCanonical = Box<dyn Fn(Value) -> Result<Value, Error> + Send + Sync>;

/// Host-supplied conversion between a field's native representation and its
/// canonical form.
///
/// The declared output kind is part of the converter, so the canonical type
/// of an intermediary-composed field is known at schema-build time.
///
/// # Example
///
/// ```
/// use kalkandb::codec::IntermediaryConverter;
/// use kalkandb::record::Value;
/// use kalkandb::error::Error;
///
/// // A zip-code field held as an integer, canonicalized to decimal text.
/// let converter = IntermediaryConverter::text(
///     |value| match value {
///         Value::Integer(zip) => Ok(Value::Text(zip.to_string())),
///         other => Err(Error::EncryptionFailed(format!(
///             "expected integer, got {}",
///             other.kind_name()
///         ))),
///     },
///     |value| match value {
///         Value::Text(text) => text
///             .parse()
///             .map(Value::Integer)
///             .map_err(|e| Error::DecryptionFailed(format!("invalid zip code: {e}"))),
///         other => Err(Error::DecryptionFailed(format!(
///             "expected text, got {}",
///             other.kind_name()
///         ))),
///     },
/// );
/// ```
pub struct IntermediaryConverter {
    output: CanonicalKind,
    to_canonical: ToCanonical,
    from_canonical: FromCanonical,
}

impl IntermediaryConverter {
    /// Creates a converter whose canonical form is text.
    pub fn text(
        to_canonical: impl Fn(&Value) -> Result<Value, Error> + Send + Sync + 'static,
        from_canonical: impl Fn(Value) -> Result<Value, Error> + Send + Sync + 'static,
    ) -> Self {
        Self {
            output: CanonicalKind::Text,
            to_canonical: Box::new(to_canonical),
            from_canonical: Box::new(from_canonical),
        }
    }

    /// Creates a converter whose canonical form is a byte sequence.
    pub fn bytes(
        to_canonical: impl Fn(&Value) -> Result<Value, Error> + Send + Sync + 'static,
        from_canonical: impl Fn(Value) -> Result<Value, Error> + Send + Sync + 'static,
    ) -> Self {
        Self {
            output: CanonicalKind::Bytes,
            to_canonical: Box::new(to_canonical),
            from_canonical: Box::new(from_canonical),
        }
    }

    /// Returns the declared canonical output kind.
    #[must_use]
    pub const fn output(&self) -> CanonicalKind {
        self.output
    }

    fn apply_to_canonical(&self, value: &Value) -> Result<Value, Error> {
        (self.to_canonical)(value)
    }

    fn apply_from_canonical(&self, value: Value) -> Result<Value, Error> {
        (self.from_canonical)(value)
    }
}

impl fmt::Debug for IntermediaryConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntermediaryConverter").field("output", &self.output).finish_non_exhaustive()
    }
}

/// The runtime codec installed into the schema for one encrypted field.
///
/// Exactly one `EncodedField` exists per encrypted logical field. It pairs
/// the field with its encode/decode pipeline and, for queryable fields, the
/// name of the companion shadow index field.
#[derive(Debug, Clone)]
pub struct EncodedField {
    context: FieldContext,
    canonical: CanonicalKind,
    intermediary: Option<Arc<IntermediaryConverter>>,
    shadow_field: Option<String>,
    vault: Vault,
}

impl EncodedField {
    pub(crate) fn new(
        context: FieldContext,
        canonical: CanonicalKind,
        intermediary: Option<Arc<IntermediaryConverter>>,
        shadow_field: Option<String>,
        vault: Vault,
    ) -> Self {
        Self { context, canonical, intermediary, shadow_field, vault }
    }

    /// Returns the field context this codec is bound to.
    #[must_use]
    pub fn context(&self) -> &FieldContext {
        &self.context
    }

    /// Returns the canonical storage form of the field.
    #[must_use]
    pub const fn canonical(&self) -> CanonicalKind {
        self.canonical
    }

    /// Returns the name of the companion shadow index field, if the field
    /// is queryable.
    #[must_use]
    pub fn shadow_field(&self) -> Option<&str> {
        self.shadow_field.as_deref()
    }

    /// Reduces a native value to its canonical form, enforcing the kind
    /// declared at schema build.
    fn canonicalize(&self, value: &Value) -> Result<CanonicalValue, Error> {
        let canonical = match &self.intermediary {
            Some(converter) => converter.apply_to_canonical(value)?,
            None => value.clone(),
        };

        match (self.canonical, canonical) {
            (CanonicalKind::Text, Value::Text(text)) => Ok(CanonicalValue::Text(text)),
            (CanonicalKind::Bytes, Value::Bytes(bytes)) => Ok(CanonicalValue::Bytes(bytes)),
            (expected, other) => Err(Error::EncryptionFailed(format!(
                "expected {expected} plaintext for {}, got {}",
                self.context,
                other.kind_name()
            ))),
        }
    }

    /// Encodes a native value into its stored (ciphertext) form.
    ///
    /// `Null` passes through untouched; nullability is the schema's concern.
    ///
    /// # Errors
    ///
    /// Returns error if the intermediary rejects the value, the value's kind
    /// does not match the canonical form, or sealing fails.
    pub fn encode(&self, value: &Value) -> Result<Value, Error> {
        if matches!(value, Value::Null) {
            return Ok(Value::Null);
        }

        match self.canonicalize(value)? {
            CanonicalValue::Text(text) => {
                let plaintext = Zeroizing::new(text.into_bytes());
                let sealed = self.vault.encrypt(&plaintext, &self.context)?;
                Ok(Value::Text(BASE64.encode(sealed)))
            }
            CanonicalValue::Bytes(bytes) => {
                let plaintext = Zeroizing::new(bytes);
                let sealed = self.vault.encrypt(&plaintext, &self.context)?;
                Ok(Value::Bytes(sealed))
            }
        }
    }

    /// Decodes a stored (ciphertext) value back to its native form.
    ///
    /// # Errors
    ///
    /// Returns error if the stored value is malformed, authentication fails
    /// (tampered data, foreign key, wrong column), or the intermediary
    /// rejects the canonical value. Failures always propagate; a tampered
    /// value never decodes to plaintext-shaped garbage.
    pub fn decode(&self, stored: &Value) -> Result<Value, Error> {
        if matches!(stored, Value::Null) {
            return Ok(Value::Null);
        }

        let canonical = match (self.canonical, stored) {
            (CanonicalKind::Text, Value::Text(encoded)) => {
                let sealed = BASE64
                    .decode(encoded)
                    .map_err(|e| Error::DecryptionFailed(format!("invalid base64: {e}")))?;
                let plaintext = self.vault.decrypt(&sealed, &self.context)?;
                let text = String::from_utf8(plaintext)
                    .map_err(|e| Error::DecryptionFailed(format!("invalid UTF-8: {e}")))?;
                Value::Text(text)
            }
            (CanonicalKind::Bytes, Value::Bytes(sealed)) => {
                Value::Bytes(self.vault.decrypt(sealed, &self.context)?)
            }
            (expected, other) => {
                return Err(Error::DecryptionFailed(format!(
                    "expected {expected} ciphertext for {}, got {}",
                    self.context,
                    other.kind_name()
                )))
            }
        };

        match &self.intermediary {
            Some(converter) => converter.apply_from_canonical(canonical),
            None => Ok(canonical),
        }
    }

    /// Returns the canonical plaintext bytes to digest for the shadow index,
    /// or `None` for empty/absent values (which never receive a hash).
    pub(crate) fn canonical_plaintext(
        &self,
        value: &Value,
    ) -> Result<Option<Zeroizing<Vec<u8>>>, Error> {
        if value.is_empty() {
            return Ok(None);
        }

        let bytes = match self.canonicalize(value)? {
            CanonicalValue::Text(text) => {
                if text.trim().is_empty() {
                    return Ok(None);
                }
                text.into_bytes()
            }
            CanonicalValue::Bytes(bytes) => {
                if bytes.is_empty() {
                    return Ok(None);
                }
                bytes
            }
        };

        Ok(Some(Zeroizing::new(bytes)))
    }
}
