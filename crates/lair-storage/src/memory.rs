//! 메모리 키-값 저장소.
//!
//! 한 프로세스 안에서 여러 스토어 인스턴스가 공유하는 저장소.
//! 브라우저 탭들이 같은 localStorage를 공유하는 모델과 같다.

use std::collections::HashMap;

use lair_core::error::CoreError;
use lair_core::ports::storage::{InstanceId, KeyValueStorage, StorageChange};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::trace;

/// 변경 알림 채널 용량
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// 메모리 저장소
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    changes: broadcast::Sender<StorageChange>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            items: Mutex::new(HashMap::new()),
            changes,
        }
    }

    /// 외부(다른 프로세스) 쓰기 시뮬레이션: 출처 없이 알림
    pub fn set_external(&self, key: &str, value: &str) {
        let mut items = self.items.lock();
        items.insert(key.to_string(), value.to_string());
        self.notify(key, Some(value.to_string()), None);
    }

    /// 저장된 키 목록
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.items.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// 변경 알림 발행
    ///
    /// `items` 잠금을 쥔 채로 호출해야 쓰기 순서와 알림 순서가 같다.
    fn notify(&self, key: &str, new_value: Option<String>, origin: Option<InstanceId>) {
        // 구독자가 없으면 전송 실패는 무시
        let _ = self.changes.send(StorageChange {
            key: key.to_string(),
            new_value,
            origin,
        });
        trace!("메모리 저장소 변경 알림: {key}");
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str, origin: InstanceId) -> Result<(), CoreError> {
        let mut items = self.items.lock();
        if items.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        items.insert(key.to_string(), value.to_string());
        self.notify(key, Some(value.to_string()), Some(origin));
        Ok(())
    }

    fn remove_item(&self, key: &str, origin: InstanceId) -> Result<(), CoreError> {
        let mut items = self.items.lock();
        if items.remove(key).is_some() {
            self.notify(key, None, Some(origin));
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let storage = MemoryStorage::new();
        let me = InstanceId::new();

        assert_eq!(storage.get_item("k").unwrap(), None);
        storage.set_item("k", "v1", me).unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("v1"));
        storage.remove_item("k", me).unwrap();
        assert_eq!(storage.get_item("k").unwrap(), None);
    }

    #[test]
    fn writes_are_broadcast_with_origin() {
        let storage = MemoryStorage::new();
        let me = InstanceId::new();
        let mut rx = storage.subscribe();

        storage.set_item("k", "v1", me).unwrap();
        let change = rx.try_recv().unwrap();
        assert_eq!(change.key, "k");
        assert_eq!(change.new_value.as_deref(), Some("v1"));
        assert_eq!(change.origin, Some(me));

        storage.set_external("k", "v2");
        let change = rx.try_recv().unwrap();
        assert_eq!(change.origin, None);
    }

    #[test]
    fn identical_write_is_not_broadcast() {
        let storage = MemoryStorage::new();
        let me = InstanceId::new();
        storage.set_item("k", "same", me).unwrap();

        let mut rx = storage.subscribe();
        storage.set_item("k", "same", me).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn last_broadcast_matches_stored_value_under_contention() {
        use std::sync::Arc;

        for _ in 0..50 {
            let storage = Arc::new(MemoryStorage::new());
            let mut rx = storage.subscribe();
            let writers: Vec<_> = (0..4)
                .map(|n| {
                    let storage = storage.clone();
                    std::thread::spawn(move || {
                        for i in 0..20 {
                            storage
                                .set_item("k", &format!("{n}-{i}"), InstanceId::new())
                                .unwrap();
                        }
                    })
                })
                .collect();
            for writer in writers {
                writer.join().unwrap();
            }

            let mut last = None;
            while let Ok(change) = rx.try_recv() {
                last = change.new_value;
            }
            assert_eq!(last, storage.get_item("k").unwrap());
        }
    }
}
