//! Property tests for the conversion pipeline and keyed digest.

use kalkandb::prelude::*;
use kalkandb_key_env::EnvKeyProvider;
use proptest::prelude::*;
use secrecy::SecretVec;
use std::sync::Arc;

fn text_model() -> (Model, Arc<dyn KeyProvider>) {
    let provider: Arc<dyn KeyProvider> = Arc::new(
        EnvKeyProvider::new(
            SecretVec::new(vec![11u8; 32]),
            Some(SecretVec::new(b"property-salt".to_vec())),
        )
        .expect("provider creation failed"),
    );

    let mut model = Model::new();
    model
        .add_entity("notes")
        .add_field(
            FieldDef::new("body", FieldKind::Text)
                .with_annotation(EncryptAnnotation::new(true, true)),
        )
        .add_field(FieldDef::new("blob", FieldKind::Bytes).encrypted());
    model
        .apply_data_protection(Arc::clone(&provider), CipherMode::default())
        .expect("schema build failed");

    (model, provider)
}

proptest! {
    #[test]
    fn prop_text_round_trip(body in ".*") {
        let (model, _provider) = text_model();
        let codec = model.entity("notes").unwrap().field("body").unwrap().codec().unwrap();

        let plaintext = Value::Text(body);
        let stored = codec.encode(&plaintext).unwrap();
        prop_assert_eq!(codec.decode(&stored).unwrap(), plaintext);
    }

    #[test]
    fn prop_bytes_round_trip(blob in proptest::collection::vec(any::<u8>(), 0..512)) {
        let (model, _provider) = text_model();
        let codec = model.entity("notes").unwrap().field("blob").unwrap().codec().unwrap();

        let plaintext = Value::Bytes(blob);
        let stored = codec.encode(&plaintext).unwrap();
        prop_assert_eq!(codec.decode(&stored).unwrap(), plaintext);
    }

    #[test]
    fn prop_ciphertext_never_equals_plaintext(body in ".+") {
        let (model, _provider) = text_model();
        let codec = model.entity("notes").unwrap().field("body").unwrap().codec().unwrap();

        let plaintext = Value::Text(body);
        let stored = codec.encode(&plaintext).unwrap();
        prop_assert_ne!(stored, plaintext);
    }

    #[test]
    fn prop_digest_deterministic(value in ".*") {
        let (_model, provider) = text_model();

        let digest1 = keyed_digest(provider.as_ref(), value.as_bytes()).unwrap();
        let digest2 = keyed_digest(provider.as_ref(), value.as_bytes()).unwrap();

        prop_assert_eq!(&digest1, &digest2);
        prop_assert_eq!(digest1.len(), 64);
    }

    #[test]
    fn prop_digest_distinct_for_distinct_values(a in ".*", b in ".*") {
        prop_assume!(a != b);
        let (_model, provider) = text_model();

        let digest_a = keyed_digest(provider.as_ref(), a.as_bytes()).unwrap();
        let digest_b = keyed_digest(provider.as_ref(), b.as_bytes()).unwrap();

        prop_assert_ne!(digest_a, digest_b);
    }
}
