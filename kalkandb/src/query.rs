//! Equality-query rewriting for encrypted fields.
//!
//! Ciphertext is non-deterministic, so `field == literal` can never be
//! answered against the stored value. The rewriter turns that predicate into
//! an equality comparison on the field's companion shadow index: the literal
//! runs through the same canonicalization and keyed digest the synchronizer
//! used at write time, and the resulting predicate is handed back to the
//! host's query layer. No I/O happens here.

use crate::digest::keyed_digest;
use crate::error::Error;
use crate::key_provider::KeyProvider;
use crate::model::Model;
use crate::record::{Record, Value};

/// An equality predicate against a shadow index field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashPredicate {
    shadow_field: String,
    digest: String,
}

impl HashPredicate {
    /// Returns the shadow field the predicate compares against.
    #[must_use]
    pub fn shadow_field(&self) -> &str {
        &self.shadow_field
    }

    /// Returns the digest the shadow field is compared to.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Evaluates the predicate against a record.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        match record.get(&self.shadow_field) {
            Some(Value::Text(stored)) => *stored == self.digest,
            _ => false,
        }
    }

    /// Filters a collection of records down to those matching the predicate.
    pub fn filter<'a, I>(&self, records: I) -> Vec<&'a Record>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        records.into_iter().filter(|record| self.matches(record)).collect()
    }
}

/// Rewrites `entity.field == literal` into a shadow-index equality predicate.
///
/// The literal is given in the field's native representation and runs
/// through the field's intermediary (if any) before digesting, mirroring the
/// write path exactly.
///
/// # Errors
///
/// Returns `Error::FieldNotQueryable` if the field does not exist or its
/// policy does not support querying, raised eagerly instead of producing a
/// predicate against a nonexistent column. Returns
/// `Error::MissingKeyMaterial` if the hashing secret is not configured.
///
/// # Example
///
/// ```ignore
/// let predicate = protected_eq(&model, provider.as_ref(), "users", "ssn", &"404-69-1337".into())?;
/// let hits = predicate.filter(&stored_records);
/// ```
pub fn protected_eq(
    model: &Model,
    provider: &dyn KeyProvider,
    entity_name: &str,
    field_name: &str,
    literal: &Value,
) -> Result<HashPredicate, Error> {
    let not_queryable = || Error::FieldNotQueryable {
        entity: entity_name.to_string(),
        field: field_name.to_string(),
    };

    let codec = model
        .entity(entity_name)
        .and_then(|entity| entity.field(field_name))
        .and_then(|field| field.codec())
        .ok_or_else(not_queryable)?;

    let shadow_field = codec.shadow_field().ok_or_else(not_queryable)?.to_string();

    // An empty literal digests to a value no shadow field ever stores, so
    // the predicate simply matches nothing.
    let digest = match codec.canonical_plaintext(literal)? {
        Some(plaintext) => keyed_digest(provider, &plaintext)?,
        None => keyed_digest(provider, b"")?,
    };

    Ok(HashPredicate { shadow_field, digest })
}
