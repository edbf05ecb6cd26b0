//! Shadow hash synchronization on the write path.
//!
//! Before the host flushes a batch of pending changes, the synchronizer
//! recomputes the shadow index digest of every queryable encrypted field
//! from the record's current in-memory plaintext. Ciphertext and shadow
//! hash therefore always land in the same durability unit; there is no
//! window where a write can be dispatched with a stale digest.

use crate::digest::keyed_digest;
use crate::error::Error;
use crate::key_provider::KeyProvider;
use crate::model::Model;
use crate::record::{ChangeSet, ChangeState, Value};
use std::sync::Arc;

/// The write-path hook keeping shadow index fields in sync.
///
/// A stateless function object: it holds only the key-protection handle and
/// is passed explicitly into the host's commit pipeline, so several isolated
/// schemas can coexist in one process. The host must invoke
/// [`before_commit`](Self::before_commit) exactly once per commit attempt,
/// synchronously, before dispatching the underlying write; if the hook
/// fails, the whole commit must abort.
///
/// # Example
///
/// ```ignore
/// let synchronizer = ShadowHashSynchronizer::new(Arc::clone(&provider));
///
/// let mut changes = ChangeSet::new();
/// changes.push_added(user);
/// synchronizer.before_commit(&model, &mut changes)?;
/// // ... host flushes `changes` ...
/// ```
pub struct ShadowHashSynchronizer {
    provider: Arc<dyn KeyProvider>,
}

impl ShadowHashSynchronizer {
    /// Creates a synchronizer using the given key-protection handle.
    #[must_use]
    pub fn new(provider: Arc<dyn KeyProvider>) -> Self {
        Self { provider }
    }

    /// Recomputes shadow hashes for every pending added or modified record.
    ///
    /// For each such record, every field whose policy is encrypted and
    /// queryable has its current plaintext canonicalized and digested into
    /// the companion `<field>ShadowHash` value. Empty or absent plaintext
    /// leaves the shadow value untouched, so a unique shadow index never
    /// collects a bucket of "empty" digests. Deleted and unchanged records
    /// are skipped, as are records of entities this model does not know.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingKeyMaterial` if the hashing secret is not
    /// configured, or any canonicalization error. Errors must abort the
    /// surrounding commit: the host discards the whole batch instead of
    /// flushing a partially synchronized one.
    pub fn before_commit(&self, model: &Model, changes: &mut ChangeSet) -> Result<(), Error> {
        for entry in changes.iter_mut() {
            if !matches!(entry.state(), ChangeState::Added | ChangeState::Modified) {
                continue;
            }

            let Some(entity) = model.entity(entry.record().entity_name()) else {
                continue;
            };

            for field in entity.fields() {
                let Some(codec) = field.codec() else { continue };
                let Some(shadow_field) = codec.shadow_field() else { continue };

                let digest = {
                    let Some(value) = entry.record().get(field.name()) else { continue };
                    let Some(plaintext) = codec.canonical_plaintext(value)? else { continue };
                    keyed_digest(self.provider.as_ref(), &plaintext)?
                };

                let shadow_field = shadow_field.to_string();
                entry.record_mut().set(shadow_field, Value::Text(digest));
            }
        }

        Ok(())
    }
}
