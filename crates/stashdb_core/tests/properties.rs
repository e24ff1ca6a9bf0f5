//! Property tests over whole storages.

use proptest::prelude::*;
use serde_json::Value;
use stashdb_codec::{chunk, decode_value, encode_value, Codec, KeyCodec};
use stashdb_core::{Storage, StorageConfig, StorageKind};
use stashdb_storage::InMemoryBackend;
use stashdb_testkit::{dotted_path_strategy, json_value_strategy, key_strategy};
use std::sync::Arc;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn set_then_get(key in key_strategy(), value in json_value_strategy()) {
        let storage = Storage::new(
            "p",
            StorageKind::Sqlite,
            Arc::new(InMemoryBackend::new()),
            StorageConfig::default(),
        );
        storage.set(key.clone(), value.clone());
        prop_assert_eq!(storage.get(&key), Some(value));
    }

    #[test]
    fn codec_chunk_round_trip(
        value in json_value_strategy(),
        max in 1usize..48,
        compress in any::<bool>(),
    ) {
        let codec = if compress { Codec::Compress } else { Codec::Identity };
        let encoded = encode_value(&value, &codec).unwrap();
        let chunks = chunk::split(&KeyCodec::fingerprint("k"), &encoded, max);
        let decoded = decode_value(&chunk::reassemble(chunks).unwrap(), &codec).unwrap();
        prop_assert_eq!(decoded, value);
    }

    #[test]
    fn save_then_load_through_backend(
        key in key_strategy(),
        value in json_value_strategy(),
        max in 1usize..32,
    ) {
        let result: Option<Value> = runtime().block_on(async {
            let backend = Arc::new(InMemoryBackend::with_max_chunk_len(max));
            let storage = Storage::new("p", StorageKind::Sqlite, backend, StorageConfig::default());
            storage.set(key.clone(), value.clone());
            storage.save().await;
            storage.clear_data();
            storage.get_async(&key).await.unwrap()
        });
        prop_assert_eq!(result, Some(value));
    }

    #[test]
    fn nested_set_then_get(path in dotted_path_strategy(), n in any::<i64>()) {
        let storage = Storage::new(
            "p",
            StorageKind::Sqlite,
            Arc::new(InMemoryBackend::new()),
            StorageConfig::default(),
        );
        storage.set_nested(&path, Value::from(n));
        prop_assert_eq!(storage.get_nested(&path), Some(Value::from(n)));
    }
}
