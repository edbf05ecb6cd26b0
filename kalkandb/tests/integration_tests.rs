//! Integration tests for kalkandb with the environment-backed key provider.
//!
//! These drive the whole engine the way a host would: build a schema, apply
//! data protection, run the write hook, encode for storage, and query
//! through the rewritten predicate.

use kalkandb::prelude::*;
use kalkandb_key_env::EnvKeyProvider;
use secrecy::SecretVec;
use std::sync::Arc;

fn provider_with_salt() -> Arc<dyn KeyProvider> {
    Arc::new(
        EnvKeyProvider::new(
            SecretVec::new(vec![7u8; 32]),
            Some(SecretVec::new(b"integration-salt".to_vec())),
        )
        .expect("provider creation failed"),
    )
}

fn provider_without_salt() -> Arc<dyn KeyProvider> {
    Arc::new(
        EnvKeyProvider::new(SecretVec::new(vec![7u8; 32]), None)
            .expect("provider creation failed"),
    )
}

fn foreign_provider() -> Arc<dyn KeyProvider> {
    Arc::new(
        EnvKeyProvider::new(SecretVec::new(vec![9u8; 32]), None)
            .expect("provider creation failed"),
    )
}

fn zip_converter() -> IntermediaryConverter {
    IntermediaryConverter::text(
        |value| match value {
            Value::Integer(zip) => Ok(Value::Text(zip.to_string())),
            other => Err(Error::EncryptionFailed(format!(
                "expected integer, got {}",
                other.kind_name()
            ))),
        },
        |value| match value {
            Value::Text(text) => text
                .parse()
                .map(Value::Integer)
                .map_err(|e| Error::DecryptionFailed(format!("invalid zip code: {e}"))),
            other => {
                Err(Error::DecryptionFailed(format!("expected text, got {}", other.kind_name())))
            }
        },
    )
}

fn user_model(provider: &Arc<dyn KeyProvider>) -> Model {
    let mut model = Model::new();
    model
        .add_entity("users")
        .add_field(FieldDef::new("id", FieldKind::Text))
        .add_field(FieldDef::new("name", FieldKind::Text))
        .add_field(
            FieldDef::new("ssn", FieldKind::Text).with_annotation(EncryptAnnotation::new(true, true)),
        )
        .add_field(FieldDef::new("email", FieldKind::Text).nullable().encrypted_queryable(false))
        .add_field(
            FieldDef::new("zip_code", FieldKind::Integer)
                .encrypted()
                .with_intermediary(zip_converter()),
        )
        .add_field(
            FieldDef::new("id_picture", FieldKind::Bytes)
                .with_annotation(EncryptAnnotation::new(false, false)),
        );
    model
        .apply_data_protection(Arc::clone(provider), CipherMode::default())
        .expect("schema build failed");
    model
}

fn sample_user() -> Record {
    Record::new("users")
        .with("id", "u-1")
        .with("name", "Alice")
        .with("ssn", "404-69-1337")
        .with("email", "alice@example.com")
        .with("zip_code", 42069i64)
        .with("id_picture", vec![0xAB; 256])
}

/// Simulates the host flushing a record: every encrypted field goes through
/// its codec, everything else is stored as-is.
fn encode_record(model: &Model, record: &Record) -> Record {
    let entity = model.entity(record.entity_name()).expect("entity in model");
    let mut stored = Record::new(record.entity_name());

    for (field_name, value) in record.values() {
        let encoded = entity
            .field(field_name)
            .and_then(FieldDef::codec)
            .map_or_else(|| Ok(value.clone()), |codec| codec.encode(value))
            .expect("encode failed");
        stored.set(field_name, encoded);
    }

    stored
}

fn decode_record(model: &Model, stored: &Record) -> Record {
    let entity = model.entity(stored.entity_name()).expect("entity in model");
    let mut decoded = Record::new(stored.entity_name());

    for (field_name, value) in stored.values() {
        let plain = entity
            .field(field_name)
            .and_then(FieldDef::codec)
            .map_or_else(|| Ok(value.clone()), |codec| codec.decode(value))
            .expect("decode failed");
        decoded.set(field_name, plain);
    }

    decoded
}

#[test]
fn test_full_write_path_round_trip() {
    let provider = provider_with_salt();
    let model = user_model(&provider);
    let synchronizer = ShadowHashSynchronizer::new(Arc::clone(&provider));

    let mut changes = ChangeSet::new();
    changes.push_added(sample_user());
    synchronizer.before_commit(&model, &mut changes).expect("sync failed");

    let pending = changes.iter().next().unwrap().record().clone();

    // The hook populated shadow hashes for both queryable fields
    assert!(matches!(pending.get("ssnShadowHash"), Some(Value::Text(h)) if h.len() == 64));
    assert!(matches!(pending.get("emailShadowHash"), Some(Value::Text(h)) if h.len() == 64));

    let stored = encode_record(&model, &pending);

    // Encrypted fields no longer hold their plaintext
    assert_ne!(stored.get("ssn"), pending.get("ssn"));
    assert_ne!(stored.get("email"), pending.get("email"));
    assert_ne!(stored.get("zip_code"), pending.get("zip_code"));
    assert_ne!(stored.get("id_picture"), pending.get("id_picture"));

    // The intermediary-composed field stores text, not an integer
    assert!(matches!(stored.get("zip_code"), Some(Value::Text(_))));

    // Unprotected fields and shadow hashes are stored untouched
    assert_eq!(stored.get("name"), pending.get("name"));
    assert_eq!(stored.get("ssnShadowHash"), pending.get("ssnShadowHash"));

    let decoded = decode_record(&model, &stored);
    assert_eq!(decoded, pending);
}

#[test]
fn test_shadow_hash_tracks_modifications() {
    let provider = provider_with_salt();
    let model = user_model(&provider);
    let synchronizer = ShadowHashSynchronizer::new(Arc::clone(&provider));

    let mut changes = ChangeSet::new();
    changes.push_added(sample_user());
    synchronizer.before_commit(&model, &mut changes).expect("sync failed");
    let first_hash = changes.iter().next().unwrap().record().get("ssnShadowHash").cloned();

    let mut modified = changes.iter().next().unwrap().record().clone();
    modified.set("ssn", "500-00-0001");
    let mut changes = ChangeSet::new();
    changes.push_modified(modified);
    synchronizer.before_commit(&model, &mut changes).expect("sync failed");
    let second_hash = changes.iter().next().unwrap().record().get("ssnShadowHash").cloned();

    assert!(first_hash.is_some());
    assert_ne!(first_hash, second_hash);

    // The digest is deterministic: reverting the plaintext restores the hash
    let mut reverted = changes.iter().next().unwrap().record().clone();
    reverted.set("ssn", "404-69-1337");
    let mut changes = ChangeSet::new();
    changes.push_modified(reverted);
    synchronizer.before_commit(&model, &mut changes).expect("sync failed");
    let third_hash = changes.iter().next().unwrap().record().get("ssnShadowHash").cloned();

    assert_eq!(first_hash, third_hash);
}

#[test]
fn test_query_returns_exactly_the_matching_record() {
    let provider = provider_with_salt();
    let model = user_model(&provider);
    let synchronizer = ShadowHashSynchronizer::new(Arc::clone(&provider));

    let mut changes = ChangeSet::new();
    changes.push_added(sample_user());
    changes.push_added(
        Record::new("users").with("id", "u-2").with("ssn", "500-00-0001").with("name", "Bob"),
    );
    synchronizer.before_commit(&model, &mut changes).expect("sync failed");

    // Flush: the stored rows hold ciphertext plus plaintext shadow digests
    let stored: Vec<Record> =
        changes.iter().map(|entry| encode_record(&model, entry.record())).collect();

    let predicate =
        protected_eq(&model, provider.as_ref(), "users", "ssn", &"404-69-1337".into())
            .expect("rewrite failed");

    let hits = predicate.filter(&stored);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].get("name"), Some(&Value::Text("Alice".to_string())));

    // The matching row still never exposes the plaintext SSN
    assert_ne!(hits[0].get("ssn"), Some(&Value::Text("404-69-1337".to_string())));
}

#[test]
fn test_double_registration_is_idempotent() {
    let provider = provider_with_salt();
    let mut model = user_model(&provider);
    model
        .apply_data_protection(Arc::clone(&provider), CipherMode::default())
        .expect("second apply failed");

    let users = model.entity("users").unwrap();
    assert_eq!(users.fields().filter(|f| f.is_shadow()).count(), 2);
    assert_eq!(users.indexes().len(), 2);
    assert!(users.field("ssnShadowHashShadowHash").is_none());
}

#[test]
fn test_unsupported_field_type_blocks_schema_build() {
    let provider = provider_with_salt();

    let mut model = Model::new();
    model
        .add_entity("accounts")
        .add_field(FieldDef::new("balance", FieldKind::Integer).encrypted());

    let result = model.apply_data_protection(provider, CipherMode::default());
    assert!(matches!(result, Err(Error::UnsupportedFieldType { .. })));
}

#[test]
fn test_encryption_proceeds_without_salt_but_digest_paths_fail() {
    let provider = provider_without_salt();
    let model = user_model(&provider);

    // Encryption itself needs no pepper
    let codec = model.entity("users").unwrap().field("ssn").unwrap().codec().unwrap();
    let stored = codec.encode(&"404-69-1337".into()).expect("encode failed");
    assert_eq!(codec.decode(&stored).expect("decode failed"), "404-69-1337".into());

    // But synchronization of a queryable field fails fast
    let synchronizer = ShadowHashSynchronizer::new(Arc::clone(&provider));
    let mut changes = ChangeSet::new();
    changes.push_added(sample_user());
    assert!(matches!(
        synchronizer.before_commit(&model, &mut changes),
        Err(Error::MissingKeyMaterial)
    ));

    // And so does query rewriting
    assert!(matches!(
        protected_eq(&model, provider.as_ref(), "users", "ssn", &"404-69-1337".into()),
        Err(Error::MissingKeyMaterial)
    ));
}

#[test]
fn test_decode_under_foreign_key_fails() {
    let provider = provider_with_salt();
    let model = user_model(&provider);

    let codec = model.entity("users").unwrap().field("ssn").unwrap().codec().unwrap();
    let stored = codec.encode(&"404-69-1337".into()).expect("encode failed");

    let foreign = foreign_provider();
    let foreign_model = user_model(&foreign);
    let foreign_codec =
        foreign_model.entity("users").unwrap().field("ssn").unwrap().codec().unwrap();

    let result = foreign_codec.decode(&stored);
    assert!(result.is_err(), "foreign-key ciphertext must not decode");
}

#[test]
fn test_ciphertext_is_bound_to_its_field() {
    let provider = provider_with_salt();
    let model = user_model(&provider);
    let users = model.entity("users").unwrap();

    let ssn_codec = users.field("ssn").unwrap().codec().unwrap();
    let email_codec = users.field("email").unwrap().codec().unwrap();

    let stored = ssn_codec.encode(&"404-69-1337".into()).expect("encode failed");

    // Lifting the ciphertext into another column fails authentication
    let result = email_codec.decode(&stored);
    assert!(matches!(result, Err(Error::AuthenticationFailed)));
}

#[test]
fn test_empty_value_leaves_shadow_unset() {
    let provider = provider_with_salt();
    let model = user_model(&provider);
    let synchronizer = ShadowHashSynchronizer::new(Arc::clone(&provider));

    let mut changes = ChangeSet::new();
    changes.push_added(Record::new("users").with("id", "u-1").with("ssn", ""));
    synchronizer.before_commit(&model, &mut changes).expect("sync failed");

    assert_eq!(changes.iter().next().unwrap().record().get("ssnShadowHash"), None);
}

#[test]
fn test_rewrite_on_non_queryable_field_is_rejected() {
    let provider = provider_with_salt();
    let model = user_model(&provider);

    let result =
        protected_eq(&model, provider.as_ref(), "users", "id_picture", &Value::Bytes(vec![1]));
    assert!(matches!(result, Err(Error::FieldNotQueryable { .. })));
}
