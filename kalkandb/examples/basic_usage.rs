//! Basic usage example for `KalkanDB`.

use kalkandb::prelude::*;
use kalkandb_key_env::EnvKeyProvider;
use secrecy::SecretVec;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("KalkanDB Basic Usage Example");
    println!("============================\n");

    // Setup: key material would normally come from the environment
    // (EnvKeyProvider::from_env), hardcoded here for a self-contained run.
    let provider: Arc<dyn KeyProvider> = Arc::new(EnvKeyProvider::new(
        SecretVec::new(vec![42u8; 32]),
        Some(SecretVec::new(b"example-salt".to_vec())),
    )?);
    println!("✓ EnvKeyProvider created\n");

    // Describe the schema: the SSN is encrypted and equality-queryable
    // through a unique shadow index, the photo is encrypted only.
    let mut model = Model::new();
    model
        .add_entity("users")
        .add_field(FieldDef::new("id", FieldKind::Text))
        .add_field(FieldDef::new("name", FieldKind::Text))
        .add_field(
            FieldDef::new("ssn", FieldKind::Text)
                .with_annotation(EncryptAnnotation::new(true, true)),
        )
        .add_field(
            FieldDef::new("photo", FieldKind::Bytes)
                .with_annotation(EncryptAnnotation::new(false, false)),
        );

    model.apply_data_protection(Arc::clone(&provider), CipherMode::default())?;
    println!("✓ Data protection applied");

    let users = model.entity("users").expect("users entity");
    for index in users.indexes() {
        println!("  - index on {} (unique: {})", index.field_name(), index.is_unique());
    }
    println!();

    // Write path: the synchronizer fills in shadow hashes before the flush
    let synchronizer = ShadowHashSynchronizer::new(Arc::clone(&provider));

    let mut changes = ChangeSet::new();
    changes.push_added(
        Record::new("users")
            .with("id", "u-1")
            .with("name", "Alice")
            .with("ssn", "404-69-1337")
            .with("photo", vec![0xAB; 64]),
    );
    synchronizer.before_commit(&model, &mut changes)?;
    println!("✓ Shadow hashes synchronized");

    let pending = changes.iter().next().expect("one pending record").record().clone();
    if let Some(Value::Text(hash)) = pending.get("ssnShadowHash") {
        println!("  ssnShadowHash = {hash}\n");
    }

    // Flush: every encrypted field goes through its codec
    let mut stored = Record::new("users");
    for (field_name, value) in pending.values() {
        let encoded = match users.field(field_name).and_then(FieldDef::codec) {
            Some(codec) => codec.encode(value)?,
            None => value.clone(),
        };
        stored.set(field_name, encoded);
    }
    println!("✓ Record encoded for storage (SSN is ciphertext now)");

    // Read path: decoding restores the plaintext
    let ssn_codec = users.field("ssn").and_then(FieldDef::codec).expect("ssn codec");
    let decoded = ssn_codec.decode(stored.get("ssn").expect("stored ssn"))?;
    assert_eq!(decoded, Value::Text("404-69-1337".to_string()));
    println!("✓ Decryption round-trip verified\n");

    // Query path: equality against the encrypted field becomes a
    // hash-equality predicate on the shadow index.
    let predicate = protected_eq(&model, provider.as_ref(), "users", "ssn", &"404-69-1337".into())?;
    println!("Query rewritten to: {} == {}", predicate.shadow_field(), predicate.digest());

    let store = [stored];
    let hits = predicate.filter(&store);
    assert_eq!(hits.len(), 1);
    println!("✓ Query returned exactly the matching record\n");

    println!("============================");
    println!("All operations successful!");

    Ok(())
}
