//! 설정 및 와이어링 통합 테스트.
//!
//! ConfigManager → 저장소/스토어/어댑터 생성 검증.

use std::fs;
use std::sync::Arc;

use lair_core::config::AppConfig;
use lair_core::config_manager::ConfigManager;
use lair_network::entitlement::HttpEntitlementClient;
use lair_network::filter_share::HttpFilterPublisher;
use lair_settings::{AccountStore, SettingsStore};
use lair_storage::file_storage::FileStorage;
use tempfile::TempDir;

#[test]
fn config_defaults_are_valid() {
    let config = AppConfig::default_config();

    assert!(config.server.base_url.starts_with("https://"));
    assert!(config.server.request_timeout_ms > 0);
    assert!(config.sync.enabled);
    assert!(config.sync.poll_interval_ms > 0);
    assert_eq!(config.storage.default_key, "settings-storage");
    assert_eq!(config.storage.account_key, "account-storage");
    assert!(config.storage.data_dir.is_none());
}

#[test]
fn edited_config_file_drives_wiring() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("config.json");
    let data_dir = tmp.path().join("data");
    fs::write(
        &config_path,
        serde_json::json!({
            "storage": {
                "data_dir": data_dir,
                "app_key_prefix": "custom-",
                "account_key": "acct"
            },
            "server": { "base_url": "http://localhost:4000/sub" }
        })
        .to_string(),
    )
    .unwrap();

    let manager = ConfigManager::with_path(config_path).unwrap();
    let config = manager.get();
    assert_eq!(config.storage.data_dir.as_deref(), Some(data_dir.as_path()));
    assert_eq!(config.storage.default_key, "settings-storage");
    assert_eq!(config.sync.poll_interval_ms, 500);

    let storage = Arc::new(FileStorage::open(data_dir.clone()).unwrap());
    let publisher =
        HttpFilterPublisher::new(&config.server.base_url, config.request_timeout()).unwrap();
    let settings = SettingsStore::builder(storage.clone())
        .for_app(&config.storage, Some("/apps/once-human"))
        .publisher(Arc::new(publisher))
        .open();
    let account = AccountStore::open_with_key(storage, config.storage.account_key.clone());
    let _client =
        HttpEntitlementClient::new(&config.server.base_url, config.request_timeout()).unwrap();

    assert_eq!(settings.storage_key(), "custom-once-human");
    assert_eq!(account.storage_key(), "acct");

    settings.set_text_size(22.0);
    assert!(data_dir.join("custom-once-human.json").exists());
}

#[test]
fn config_update_round_trips_through_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("nested").join("config.json");
    let manager = ConfigManager::with_path(path.clone()).unwrap();
    assert!(path.exists());

    manager
        .update_with(|config| {
            config.sync.enabled = false;
            config.server.request_timeout_ms = 1_000;
        })
        .unwrap();

    let other = ConfigManager::with_path(path).unwrap();
    let config = other.get();
    assert!(!config.sync.enabled);
    assert_eq!(config.request_timeout().as_millis(), 1_000);
}

#[test]
fn invalid_server_url_is_rejected_at_wiring() {
    let result = HttpFilterPublisher::new("not a url", std::time::Duration::from_secs(1));
    assert!(result.is_err());
}
