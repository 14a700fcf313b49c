//! 인스턴스 간 동기화.
//!
//! 저장소 변경 알림을 구독하여 같은 키에 대한 다른 인스턴스의 쓰기를
//! 재수화로 반영한다. 자기 자신의 쓰기는 출처 ID로 걸러낸다.

use std::sync::Arc;

use lair_core::ports::storage::{InstanceId, KeyValueStorage};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::account::AccountStore;
use crate::store::SettingsStore;

/// 저장소 값으로 상태를 교체할 수 있는 스토어
pub trait Rehydrate: Send + Sync + 'static {
    fn storage_key(&self) -> &str;
    fn instance_id(&self) -> InstanceId;
    fn storage(&self) -> Arc<dyn KeyValueStorage>;
    fn rehydrate(&self, raw: Option<&str>);
}

impl Rehydrate for SettingsStore {
    fn storage_key(&self) -> &str {
        SettingsStore::storage_key(self)
    }

    fn instance_id(&self) -> InstanceId {
        SettingsStore::instance_id(self)
    }

    fn storage(&self) -> Arc<dyn KeyValueStorage> {
        SettingsStore::storage(self)
    }

    fn rehydrate(&self, raw: Option<&str>) {
        SettingsStore::rehydrate(self, raw)
    }
}

impl Rehydrate for AccountStore {
    fn storage_key(&self) -> &str {
        AccountStore::storage_key(self)
    }

    fn instance_id(&self) -> InstanceId {
        AccountStore::instance_id(self)
    }

    fn storage(&self) -> Arc<dyn KeyValueStorage> {
        AccountStore::storage(self)
    }

    fn rehydrate(&self, raw: Option<&str>) {
        AccountStore::rehydrate(self, raw)
    }
}

/// 저장소 변경 → 재수화 태스크 핸들
///
/// 드롭하면 구독을 중단한다.
pub struct StorageSync {
    handle: JoinHandle<()>,
}

impl StorageSync {
    /// 스토어를 저장소 변경 알림에 연결
    ///
    /// 구독은 태스크 생성 전에 이루어지므로 반환 직후의 쓰기도 놓치지 않는다.
    /// 알림이 밀려 유실되면 저장소에서 현재 값을 다시 읽는다.
    pub fn attach<S>(store: S) -> Self
    where
        S: Rehydrate + Clone,
    {
        let storage = store.storage();
        let mut rx = storage.subscribe();

        let handle = tokio::spawn(async move {
            let key = store.storage_key().to_string();
            let instance = store.instance_id();
            debug!("저장소 동기화 시작: {key} ({instance})");

            loop {
                match rx.recv().await {
                    Ok(change) => {
                        if change.concerns(&key, instance) {
                            store.rehydrate(change.new_value.as_deref());
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("저장소 알림 {skipped}개 유실, 현재 값 다시 읽기: {key}");
                        match storage.get_item(&key) {
                            Ok(raw) => store.rehydrate(raw.as_deref()),
                            Err(e) => warn!("동기화 재읽기 실패: {e}"),
                        }
                    }
                    Err(RecvError::Closed) => {
                        debug!("저장소 알림 채널 닫힘: {key}");
                        break;
                    }
                }
            }
        });

        Self { handle }
    }

    /// 동기화 중단
    pub fn detach(self) {
        self.handle.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for StorageSync {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
