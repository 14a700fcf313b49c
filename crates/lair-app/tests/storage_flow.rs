//! 파일 저장소 통합 테스트.
//!
//! 레거시 파일 마이그레이션 → 프로필 관리 → 프로세스 간 수렴(파일 감시자).

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use lair_core::config::StorageConfig;
use lair_core::models::settings::ColorBlindMode;
use lair_core::ports::storage::KeyValueStorage;
use lair_settings::{SettingsStore, StorageSync, StoreEvent};
use lair_storage::envelope::PersistedEnvelope;
use lair_storage::file_storage::FileStorage;
use lair_storage::migration::SETTINGS_SCHEMA_VERSION;
use serde_json::Value;
use tempfile::TempDir;

fn read_envelope(storage: &FileStorage, key: &str) -> PersistedEnvelope {
    let raw = fs::read_to_string(storage.path_for(key)).unwrap();
    PersistedEnvelope::parse(&raw).unwrap()
}

#[test]
fn legacy_flat_file_is_migrated_on_open() {
    let tmp = TempDir::new().unwrap();
    let storage = FileStorage::open(tmp.path()).unwrap();
    fs::write(
        storage.path_for("settings-storage"),
        r#"{"state":{"colorBlindMode":"deuteranopia","textSize":18,"discoveredNodes":["a","a@x"]},"version":2}"#,
    )
    .unwrap();

    let store = SettingsStore::open(Arc::new(storage.clone()));
    let live = store.current_profile_settings();
    assert_eq!(live.color_blind_mode, ColorBlindMode::Deuteranopia);
    assert_eq!(live.text_size, 18.0);
    assert!(store.is_discovered_node("a@y"));

    let envelope = read_envelope(&storage, "settings-storage");
    assert_eq!(envelope.version, SETTINGS_SCHEMA_VERSION);
    assert!(envelope.state.get("textSize").is_none());
    let profiles = envelope.state["profiles"].as_array().unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0]["id"], Value::from("default"));
}

#[test]
fn embedded_app_imports_shared_key_once() {
    let tmp = TempDir::new().unwrap();
    let storage = FileStorage::open(tmp.path()).unwrap();
    storage
        .set_item(
            "settings-storage",
            r#"{"state":{"textSize":26},"version":2}"#,
            lair_core::ports::storage::InstanceId::new(),
        )
        .unwrap();
    storage
        .set_item(
            "thgl-settings-palworld",
            r#"{"state":{"showTraceLine":false},"version":2}"#,
            lair_core::ports::storage::InstanceId::new(),
        )
        .unwrap();

    let store = SettingsStore::builder(Arc::new(storage.clone()))
        .for_app(&StorageConfig::default(), Some("/apps/palworld/map"))
        .open();
    assert_eq!(store.storage_key(), "thgl-settings-palworld");
    assert_eq!(store.text_size(), 26.0);
    assert!(!store.show_trace_line());

    let envelope = read_envelope(&storage, "thgl-settings-palworld");
    assert_eq!(envelope.version, SETTINGS_SCHEMA_VERSION);
}

#[test]
fn profile_lifecycle_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    let storage = Arc::new(FileStorage::open(tmp.path()).unwrap());

    let store = SettingsStore::open(storage.clone());
    let raid = store.create_profile("Raid");
    store.set_text_size(30.0);
    store.switch_profile("default").unwrap();
    store.set_text_size(12.0);
    store.switch_profile(&raid).unwrap();
    drop(store);

    let reopened = SettingsStore::open(storage);
    assert_eq!(reopened.current_profile_id(), raid);
    assert_eq!(reopened.text_size(), 30.0);
    reopened.switch_profile("default").unwrap();
    assert_eq!(reopened.text_size(), 12.0);
}

#[tokio::test]
async fn second_process_converges_through_watcher() {
    let tmp = TempDir::new().unwrap();
    // 프로세스 두 개를 흉내: 같은 디렉토리의 독립 저장소
    let storage_a = FileStorage::open(tmp.path()).unwrap();
    let storage_b = FileStorage::open(tmp.path()).unwrap();

    let store_a = SettingsStore::open(Arc::new(storage_a.clone()));
    let store_b = SettingsStore::open(Arc::new(storage_b.clone()));
    let _sync_b = StorageSync::attach(store_b.clone());
    let watcher = storage_b.spawn_watcher(Duration::from_millis(20));
    let mut events = store_b.subscribe();

    store_a.set_color_blind_mode(ColorBlindMode::Protanopia);
    let raid = store_a.create_profile("Raid");

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        let event = tokio::time::timeout(remaining, events.recv())
            .await
            .expect("수렴 대기 시간 초과")
            .unwrap();
        assert_eq!(event, StoreEvent::Rehydrated);
        if store_b.current_profile_id() == raid {
            break;
        }
    }

    assert_eq!(store_b.profiles().len(), 2);
    store_b.switch_profile("default").unwrap();
    assert_eq!(store_b.color_blind_mode(), ColorBlindMode::Protanopia);
    watcher.abort();
}

#[tokio::test]
async fn deleting_the_file_does_not_reset_other_instance() {
    let tmp = TempDir::new().unwrap();
    let storage = FileStorage::open(tmp.path()).unwrap();
    let store = SettingsStore::open(Arc::new(storage.clone()));
    store.set_text_size(33.0);

    fs::remove_file(storage.path_for("settings-storage")).unwrap();
    let changed = storage.poll_changes();
    assert_eq!(changed, vec!["settings-storage".to_string()]);

    store.rehydrate(None);
    assert_eq!(store.text_size(), 33.0);
}
