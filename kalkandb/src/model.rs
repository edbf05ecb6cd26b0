//! Minimal schema model and the data-protection registration surface.
//!
//! The host owns its real schema machinery; this module models the slice of
//! it the engine needs: entities, field descriptors with their protection
//! metadata, and `apply_data_protection`, the one-shot call that resolves
//! policies, installs codecs, and adds shadow index fields.

use crate::codec::{CanonicalKind, EncodedField, IntermediaryConverter};
use crate::context::FieldContext;
use crate::error::Error;
use crate::key_provider::KeyProvider;
use crate::policy::{resolve_policy, EncryptAnnotation, FieldPolicy};
use crate::vault::{CipherMode, Vault};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Suffix appended to a field name to derive its shadow index field.
pub const SHADOW_HASH_SUFFIX: &str = "ShadowHash";

/// Derives the deterministic shadow index field name for a field.
///
/// # Example
///
/// ```
/// use kalkandb::model::shadow_field_name;
///
/// assert_eq!(shadow_field_name("email"), "emailShadowHash");
/// ```
#[must_use]
pub fn shadow_field_name(field: &str) -> String {
    format!("{field}{SHADOW_HASH_SUFFIX}")
}

/// Native kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// UTF-8 text; canonical as-is.
    Text,
    /// Byte sequence; canonical as-is.
    Bytes,
    /// Signed integer; encryptable only through an intermediary converter.
    Integer,
}

/// An index the host should create on a shadow field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    field_name: String,
    unique: bool,
}

impl IndexDef {
    /// Returns the indexed field name.
    #[must_use]
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Returns whether the index enforces uniqueness.
    #[must_use]
    pub const fn is_unique(&self) -> bool {
        self.unique
    }
}

/// Descriptor of a single field.
#[derive(Debug)]
pub struct FieldDef {
    name: String,
    kind: FieldKind,
    nullable: bool,
    shadow: bool,
    annotation: Option<EncryptAnnotation>,
    registration: Option<EncryptAnnotation>,
    intermediary: Option<Arc<IntermediaryConverter>>,
    policy: Option<FieldPolicy>,
    codec: Option<EncodedField>,
}

impl FieldDef {
    /// Creates a plain field descriptor.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
            shadow: false,
            annotation: None,
            registration: None,
            intermediary: None,
            policy: None,
            codec: None,
        }
    }

    fn new_shadow(name: String, nullable: bool) -> Self {
        let mut field = Self::new(name, FieldKind::Text);
        field.nullable = nullable;
        field.shadow = true;
        field
    }

    /// Marks the field as nullable.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Attaches the declarative protection annotation.
    #[must_use]
    pub const fn with_annotation(mut self, annotation: EncryptAnnotation) -> Self {
        self.annotation = Some(annotation);
        self
    }

    /// Fluently marks the field as encrypted (not queryable).
    #[must_use]
    pub const fn encrypted(mut self) -> Self {
        self.registration = Some(EncryptAnnotation::new(false, false));
        self
    }

    /// Fluently marks the field as encrypted and equality-queryable through
    /// a shadow index (unique if `unique` is true).
    #[must_use]
    pub const fn encrypted_queryable(mut self, unique: bool) -> Self {
        self.registration = Some(EncryptAnnotation::new(true, unique));
        self
    }

    /// Registers the intermediary converter supplying the field's canonical
    /// form.
    #[must_use]
    pub fn with_intermediary(mut self, converter: IntermediaryConverter) -> Self {
        self.intermediary = Some(Arc::new(converter));
        self
    }

    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the field's native kind.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Returns whether the field is nullable.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Returns whether this is a shadow index field added by
    /// [`Model::apply_data_protection`].
    #[must_use]
    pub const fn is_shadow(&self) -> bool {
        self.shadow
    }

    /// Returns the resolved protection policy, available after schema build.
    #[must_use]
    pub const fn policy(&self) -> Option<FieldPolicy> {
        self.policy
    }

    /// Returns the installed codec, available after schema build for
    /// encrypted fields.
    #[must_use]
    pub const fn codec(&self) -> Option<&EncodedField> {
        self.codec.as_ref()
    }
}

/// Descriptor of an entity (table) and its fields.
#[derive(Debug, Default)]
pub struct EntityDef {
    name: String,
    fields: BTreeMap<String, FieldDef>,
    indexes: Vec<IndexDef>,
}

impl EntityDef {
    fn new(name: String) -> Self {
        Self { name, fields: BTreeMap::new(), indexes: Vec::new() }
    }

    /// Returns the entity name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a field, replacing any previous descriptor of the same name.
    pub fn add_field(&mut self, field: FieldDef) -> &mut Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    /// Returns a field descriptor by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    /// Iterates over the entity's fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.values()
    }

    /// Returns the index definitions added during schema build.
    #[must_use]
    pub fn indexes(&self) -> &[IndexDef] {
        &self.indexes
    }
}

/// The schema model: a set of entities with protection metadata.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use kalkandb::model::{FieldDef, FieldKind, Model};
/// use kalkandb::policy::EncryptAnnotation;
/// use kalkandb::vault::CipherMode;
///
/// let mut model = Model::new();
/// model
///     .add_entity("users")
///     .add_field(FieldDef::new("id", FieldKind::Text))
///     .add_field(
///         FieldDef::new("ssn", FieldKind::Text)
///             .with_annotation(EncryptAnnotation::new(true, true)),
///     );
///
/// model.apply_data_protection(provider, CipherMode::default())?;
/// ```
#[derive(Debug, Default)]
pub struct Model {
    entities: BTreeMap<String, EntityDef>,
}

impl Model {
    /// Creates an empty model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entity (or returns the existing one) for configuration.
    pub fn add_entity(&mut self, name: impl Into<String>) -> &mut EntityDef {
        let name = name.into();
        self.entities.entry(name.clone()).or_insert_with(|| EntityDef::new(name))
    }

    /// Returns an entity by name.
    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.get(name)
    }

    /// Iterates over the model's entities in name order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityDef> {
        self.entities.values()
    }

    /// Installs data protection on every field marked encrypted.
    ///
    /// Call this once during schema construction, after all field
    /// configurations are loaded and before any custom global transforms.
    /// For each encrypted field it resolves and caches the protection
    /// policy, installs the conversion codec, and, for queryable fields,
    /// adds the `<field>ShadowHash` companion field (same nullability,
    /// indexed, unique iff the policy requires it).
    ///
    /// Idempotent: a shadow field that already exists is left alone, so
    /// applying twice never duplicates schema objects.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedFieldType` if an encrypted field has no
    /// canonical text or byte form and no intermediary converter. The check
    /// runs before any schema mutation, so a misconfigured model blocks
    /// startup instead of failing at write time.
    pub fn apply_data_protection(
        &mut self,
        provider: Arc<dyn KeyProvider>,
        cipher_mode: CipherMode,
    ) -> Result<(), Error> {
        for entity in self.entities.values_mut() {
            let entity_name = entity.name.clone();

            // Pass 1: resolve policies and canonical kinds without mutating,
            // so a configuration error leaves the schema untouched.
            struct Planned {
                field_name: String,
                policy: FieldPolicy,
                canonical: CanonicalKind,
                intermediary: Option<Arc<IntermediaryConverter>>,
                nullable: bool,
            }

            let mut planned: Vec<Planned> = Vec::new();
            for field in entity.fields.values() {
                if field.shadow {
                    continue;
                }

                let policy = resolve_policy(field.annotation.as_ref(), field.registration.as_ref());
                if !policy.supports_encryption {
                    continue;
                }

                let canonical = match (field.kind, &field.intermediary) {
                    (_, Some(converter)) => converter.output(),
                    (FieldKind::Text, None) => CanonicalKind::Text,
                    (FieldKind::Bytes, None) => CanonicalKind::Bytes,
                    (kind, None) => {
                        return Err(Error::UnsupportedFieldType {
                            entity: entity_name,
                            field: field.name.clone(),
                            kind,
                        })
                    }
                };

                planned.push(Planned {
                    field_name: field.name.clone(),
                    policy,
                    canonical,
                    intermediary: field.intermediary.clone(),
                    nullable: field.nullable,
                });
            }

            // Pass 2: install codecs and shadow fields.
            for plan in planned {
                let shadow_name = shadow_field_name(&plan.field_name);

                let codec = EncodedField::new(
                    FieldContext::new(entity_name.clone(), plan.field_name.clone()),
                    plan.canonical,
                    plan.intermediary,
                    plan.policy.supports_querying.then(|| shadow_name.clone()),
                    Vault::new(Arc::clone(&provider), cipher_mode),
                );

                if plan.policy.supports_querying && !entity.fields.contains_key(&shadow_name) {
                    entity
                        .fields
                        .insert(shadow_name.clone(), FieldDef::new_shadow(shadow_name.clone(), plan.nullable));
                    entity.indexes.push(IndexDef {
                        field_name: shadow_name,
                        unique: plan.policy.requires_unique_index,
                    });
                }

                if let Some(field) = entity.fields.get_mut(&plan.field_name) {
                    field.policy = Some(plan.policy);
                    field.codec = Some(codec);
                }
            }
        }

        Ok(())
    }
}
