//! Per-field protection policy and its resolution.
//!
//! A field can be marked confidential from two places: a declarative
//! annotation carried on the field descriptor itself, or a fluent
//! registration made while building the schema. Resolution takes both
//! sources as explicit arguments and merges them with a documented rule,
//! once per field at schema-build time.

/// Declarative protection marker for a field.
///
/// The same shape is used for fluent registrations; presence of either
/// source marks the field as encrypted.
///
/// # Example
///
/// ```
/// use kalkandb::policy::EncryptAnnotation;
///
/// // Encrypted, equality-queryable, unique shadow index
/// let ssn = EncryptAnnotation::new(true, true);
///
/// // Encrypted only, never queried
/// let photo = EncryptAnnotation::new(false, false);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptAnnotation {
    queryable: bool,
    unique_index: bool,
}

impl EncryptAnnotation {
    /// Creates an annotation marking a field as encrypted.
    ///
    /// # Arguments
    ///
    /// * `queryable` - Whether equality lookup through the shadow index is
    ///   supported
    /// * `unique_index` - Whether the shadow index enforces uniqueness
    #[must_use]
    pub const fn new(queryable: bool, unique_index: bool) -> Self {
        Self { queryable, unique_index }
    }

    /// Creates an annotation for a queryable field with a unique shadow
    /// index, the common case for identifiers like SSNs and emails.
    #[must_use]
    pub const fn queryable() -> Self {
        Self::new(true, true)
    }

    /// Returns whether the annotation marks the field queryable.
    #[must_use]
    pub const fn is_queryable(self) -> bool {
        self.queryable
    }

    /// Returns whether the annotation requests a unique shadow index.
    #[must_use]
    pub const fn is_unique_index(self) -> bool {
        self.unique_index
    }
}

/// Resolved protection policy for a single field.
///
/// Resolved once at schema build and cached for the schema's lifetime.
/// Invariant: `supports_querying` implies `supports_encryption`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPolicy {
    /// The field is stored only in encrypted form.
    pub supports_encryption: bool,
    /// Equality lookup through the shadow index is supported.
    pub supports_querying: bool,
    /// The shadow index enforces uniqueness.
    pub requires_unique_index: bool,
}

impl FieldPolicy {
    /// Policy of an unprotected field.
    #[must_use]
    pub const fn unprotected() -> Self {
        Self { supports_encryption: false, supports_querying: false, requires_unique_index: false }
    }
}

/// Resolves a field's protection policy from its two possible sources.
///
/// A pure function of the schema's static metadata:
/// - `supports_encryption` is true if either source is present
/// - `supports_querying` and `requires_unique_index` are the OR of the two
///   sources
///
/// `supports_querying ⇒ supports_encryption` holds by construction, since a
/// querying flag can only come from a present source.
#[must_use]
pub fn resolve_policy(
    declarative: Option<&EncryptAnnotation>,
    fluent: Option<&EncryptAnnotation>,
) -> FieldPolicy {
    let supports_encryption = declarative.is_some() || fluent.is_some();

    let supports_querying = declarative.is_some_and(|a| a.is_queryable())
        || fluent.is_some_and(|a| a.is_queryable());

    let requires_unique_index = declarative.is_some_and(|a| a.is_unique_index())
        || fluent.is_some_and(|a| a.is_unique_index());

    FieldPolicy { supports_encryption, supports_querying, requires_unique_index }
}
