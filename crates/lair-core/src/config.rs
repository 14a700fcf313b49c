//! 애플리케이션 설정 구조체.
//!
//! 저장소 경로/키, 인스턴스 간 동기화 주기, 협력자 서버 주소 등
//! 런타임 설정을 정의한다. `ConfigManager`를 통해 JSON 파일에서 로드.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 저장소 설정
    #[serde(default)]
    pub storage: StorageConfig,
    /// 인스턴스 간 동기화 설정
    #[serde(default)]
    pub sync: SyncConfig,
    /// 협력자 서버 설정 (필터 공유, 권한 조회)
    #[serde(default)]
    pub server: ServerConfig,
}

// ============================================================
// 저장소 설정
// ============================================================

/// 저장소 설정: 데이터 디렉토리와 저장 키 이름
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 데이터 디렉토리 (None이면 플랫폼 기본 경로)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// 단독 실행 시 설정 저장 키
    #[serde(default = "default_settings_key")]
    pub default_key: String,
    /// 멀티 앱 셸에 임베드될 때의 앱별 키 접두사
    #[serde(default = "default_app_key_prefix")]
    pub app_key_prefix: String,
    /// 계정 캐시 저장 키
    #[serde(default = "default_account_key")]
    pub account_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            default_key: default_settings_key(),
            app_key_prefix: default_app_key_prefix(),
            account_key: default_account_key(),
        }
    }
}

impl StorageConfig {
    /// 설정 저장 키 결정
    ///
    /// `/apps/<appId>/...` 경로에 임베드된 경우 앱별 키를 사용하여
    /// 형제 앱끼리 설정을 공유하지 않도록 한다.
    pub fn settings_key(&self, app_path: Option<&str>) -> String {
        app_path
            .and_then(|path| path.strip_prefix("/apps/"))
            .and_then(|rest| rest.split('/').next())
            .filter(|app_id| !app_id.is_empty())
            .map(|app_id| format!("{}{app_id}", self.app_key_prefix))
            .unwrap_or_else(|| self.default_key.clone())
    }
}

// ============================================================
// 동기화 설정
// ============================================================

/// 인스턴스 간 동기화 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// 다른 인스턴스의 변경 반영 여부
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 파일 감시자를 쓸 수 없을 때의 폴링 주기 (밀리초)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

// ============================================================
// 서버 설정
// ============================================================

/// 협력자 서버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// API 서버 기본 URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// 요청 타임아웃 (밀리초)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

// ============================================================
// AppConfig impl
// ============================================================

impl AppConfig {
    /// 기본 설정값 반환
    pub fn default_config() -> Self {
        Self {
            storage: StorageConfig::default(),
            sync: SyncConfig::default(),
            server: ServerConfig::default(),
        }
    }

    /// 서버 요청 타임아웃을 Duration으로 반환
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout_ms)
    }

    /// 파일 저장소 폴링 주기를 Duration으로 반환
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.sync.poll_interval_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_true() -> bool {
    true
}

fn default_settings_key() -> String {
    "settings-storage".to_string()
}
fn default_app_key_prefix() -> String {
    "thgl-settings-".to_string()
}
fn default_account_key() -> String {
    "account-storage".to_string()
}
fn default_poll_interval_ms() -> u64 {
    500
}
fn default_base_url() -> String {
    "https://www.th.gl".to_string()
}
fn default_request_timeout_ms() -> u64 {
    15_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_key_for_standalone_and_embedded() {
        let storage = StorageConfig::default();
        assert_eq!(storage.settings_key(None), "settings-storage");
        assert_eq!(storage.settings_key(Some("/")), "settings-storage");
        assert_eq!(storage.settings_key(Some("/map/world")), "settings-storage");
        assert_eq!(
            storage.settings_key(Some("/apps/palworld/map")),
            "thgl-settings-palworld"
        );
        assert_eq!(
            storage.settings_key(Some("/apps/once-human")),
            "thgl-settings-once-human"
        );
        assert_eq!(storage.settings_key(Some("/apps/")), "settings-storage");
    }

    #[test]
    fn partial_config_file_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "sync": { "poll_interval_ms": 250 } }"#).unwrap();
        assert_eq!(config.sync.poll_interval_ms, 250);
        assert!(config.sync.enabled);
        assert_eq!(config.storage.account_key, "account-storage");
        assert_eq!(config.request_timeout(), Duration::from_millis(15_000));
    }
}
