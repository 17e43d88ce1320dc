//! Key/value store tests.

use kindred::store::{JsonFileStore, KeyValueStore, MemoryStore};
use serde_json::json;

#[test]
fn memory_store_returns_default_for_missing_key() {
    let store = MemoryStore::new();
    assert_eq!(store.get("missing", json!({"a": 1})), json!({"a": 1}));
}

#[test]
fn get_is_idempotent_without_set() {
    let store = MemoryStore::new();
    store.set("k", json!([1, 2, 3])).expect("set succeeds");
    assert_eq!(store.get("k", json!(null)), store.get("k", json!(null)));
}

#[test]
fn file_store_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("state.json");

    let store = JsonFileStore::open(&path);
    store.set("botPersona", json!("Calm")).expect("set succeeds");
    drop(store);

    let reopened = JsonFileStore::open(&path);
    assert_eq!(reopened.get("botPersona", json!(null)), json!("Calm"));
    assert_eq!(reopened.path(), path.as_path());
}

#[test]
fn corrupt_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("state.json");
    std::fs::write(&path, "{ not json").expect("write corrupt file");

    let store = JsonFileStore::open(&path);
    assert_eq!(store.get("userProfile", json!("default")), json!("default"));

    store.set("userProfile", json!({"mood": "Sad"})).expect("overwrite");
    let raw = std::fs::read_to_string(&path).expect("read back");
    let parsed: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(parsed["userProfile"]["mood"], "Sad");
}
