//! # `KalkanDB`
//!
//! Transparent field-level encryption with searchable shadow hash indexes.
//!
//! Applications mark selected fields of their persistent records as
//! confidential; those fields are stored only in encrypted form. A field may
//! additionally support equality lookup without ever storing or transmitting
//! plaintext: a companion shadow field holds a keyed digest of the value,
//! kept in sync on every write and targeted by rewritten equality queries.
//!
//! ## Features
//!
//! - AEAD envelope encryption (ChaCha20-Poly1305, AES-256-GCM)
//! - Per-field protection policies from declarative or fluent configuration
//! - Intermediary converters composing encryption with existing
//!   canonicalization
//! - Shadow hash indexes (HMAC-SHA256) for equality search on ciphertext
//! - Write-path synchronization hook and equality-query rewriting
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kalkandb::prelude::*;
//! use kalkandb_key_env::EnvKeyProvider;
//!
//! let provider: Arc<dyn KeyProvider> = Arc::new(EnvKeyProvider::from_env()?);
//!
//! let mut model = Model::new();
//! model
//!     .add_entity("users")
//!     .add_field(FieldDef::new("id", FieldKind::Text))
//!     .add_field(
//!         FieldDef::new("ssn", FieldKind::Text)
//!             .with_annotation(EncryptAnnotation::new(true, true)),
//!     );
//! model.apply_data_protection(Arc::clone(&provider), CipherMode::default())?;
//!
//! let synchronizer = ShadowHashSynchronizer::new(Arc::clone(&provider));
//! let mut changes = ChangeSet::new();
//! changes.push_added(Record::new("users").with("id", "u-1").with("ssn", "404-69-1337"));
//! synchronizer.before_commit(&model, &mut changes)?;
//!
//! let predicate = protected_eq(&model, provider.as_ref(), "users", "ssn", &"404-69-1337".into())?;
//! ```

#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod context;
pub mod digest;
pub mod error;
pub mod header;
pub mod kdf;
pub mod key_provider;
pub mod model;
pub mod policy;
pub mod query;
pub mod record;
pub mod sync;
pub mod vault;

pub mod prelude {
    //! Convenience re-exports for common use.
    pub use crate::codec::{CanonicalKind, EncodedField, IntermediaryConverter};
    pub use crate::context::FieldContext;
    pub use crate::digest::keyed_digest;
    pub use crate::error::{Error, KeyProviderError};
    pub use crate::key_provider::KeyProvider;
    pub use crate::model::{shadow_field_name, EntityDef, FieldDef, FieldKind, IndexDef, Model};
    pub use crate::policy::{resolve_policy, EncryptAnnotation, FieldPolicy};
    pub use crate::query::{protected_eq, HashPredicate};
    pub use crate::record::{ChangeEntry, ChangeSet, ChangeState, Record, Value};
    pub use crate::sync::ShadowHashSynchronizer;
    pub use crate::vault::{CipherMode, Vault};
}
