//! 어댑터 와이어링.
//!
//! 설정 파일 → 파일 저장소 → 스토어 생성. 서버 어댑터는 여기서만 만든다.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use lair_core::config::AppConfig;
use lair_core::config_manager::ConfigManager;
use lair_network::entitlement::HttpEntitlementClient;
use lair_network::filter_share::HttpFilterPublisher;
use lair_settings::{AccountStore, SettingsStore};
use lair_storage::file_storage::FileStorage;
use tracing::{debug, info};

/// 실행 중 공유되는 구성 요소
pub struct AppContext {
    pub config: AppConfig,
    pub storage: FileStorage,
    pub settings: SettingsStore,
    pub account: AccountStore,
}

impl AppContext {
    /// 설정 로드 후 스토어 구성
    ///
    /// `data_dir` 인자가 설정 파일 값보다 우선한다.
    pub fn build(
        config_path: Option<&Path>,
        data_dir: Option<&Path>,
        app_path: Option<&str>,
    ) -> Result<Self> {
        let manager = match config_path {
            Some(path) => ConfigManager::with_path(path.to_path_buf()),
            None => ConfigManager::new(),
        }
        .context("설정 로드 실패")?;
        debug!("설정 파일: {}", manager.config_path().display());

        Self::from_config(manager.get(), data_dir, app_path)
    }

    pub fn from_config(
        config: AppConfig,
        data_dir: Option<&Path>,
        app_path: Option<&str>,
    ) -> Result<Self> {
        let dir = resolve_data_dir(&config, data_dir)?;
        let storage = FileStorage::open(&dir)
            .with_context(|| format!("저장소 열기 실패: {}", dir.display()))?;
        info!("저장소: {}", dir.display());

        let publisher = HttpFilterPublisher::new(&config.server.base_url, config.request_timeout())
            .context("필터 게시자 생성 실패")?;

        let shared: Arc<FileStorage> = Arc::new(storage.clone());
        let settings = SettingsStore::builder(shared.clone())
            .for_app(&config.storage, app_path)
            .publisher(Arc::new(publisher))
            .open();
        let account = AccountStore::open_with_key(shared, config.storage.account_key.clone());

        Ok(Self {
            config,
            storage,
            settings,
            account,
        })
    }

    /// 권한 조회 클라이언트
    pub fn entitlement_client(&self) -> Result<HttpEntitlementClient> {
        HttpEntitlementClient::new(&self.config.server.base_url, self.config.request_timeout())
            .context("권한 클라이언트 생성 실패")
    }
}

/// 데이터 디렉토리 결정 (CLI 인자 > 설정 파일 > 플랫폼 기본 경로)
fn resolve_data_dir(config: &AppConfig, data_dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = data_dir {
        return Ok(dir.to_path_buf());
    }
    if let Some(dir) = &config.storage.data_dir {
        return Ok(dir.clone());
    }
    ConfigManager::data_dir().context("데이터 디렉토리 결정 실패")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_data_dir_wins_over_config() {
        let mut config = AppConfig::default_config();
        config.storage.data_dir = Some(PathBuf::from("/from/config"));
        let dir = resolve_data_dir(&config, Some(Path::new("/from/cli"))).unwrap();
        assert_eq!(dir, PathBuf::from("/from/cli"));

        let dir = resolve_data_dir(&config, None).unwrap();
        assert_eq!(dir, PathBuf::from("/from/config"));
    }

    #[test]
    fn embedded_app_uses_its_own_key() {
        let tmp = tempfile::TempDir::new().unwrap();
        let ctx = AppContext::from_config(
            AppConfig::default_config(),
            Some(tmp.path()),
            Some("/apps/palworld/map"),
        )
        .unwrap();
        assert_eq!(ctx.settings.storage_key(), "thgl-settings-palworld");
        assert_eq!(ctx.account.storage_key(), "account-storage");
    }

    #[test]
    fn build_creates_default_config_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config_path = tmp.path().join("cfg").join("config.json");
        let data_dir = tmp.path().join("data");

        let ctx = AppContext::build(Some(config_path.as_path()), Some(data_dir.as_path()), None).unwrap();
        assert!(config_path.exists());
        assert_eq!(ctx.storage.dir(), data_dir.as_path());
        assert_eq!(ctx.settings.storage_key(), "settings-storage");
    }
}
