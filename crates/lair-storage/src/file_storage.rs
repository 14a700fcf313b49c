//! 파일 키-값 저장소.
//!
//! 키 하나당 JSON 파일 하나를 데이터 디렉토리에 둔다.
//! 구조: `<data_dir>/<정규화된 키>.json`
//!
//! 다른 프로세스의 쓰기는 `notify` 감시자가 감지하여 출처 없는
//! (`origin: None`) 변경 알림으로 발행한다. 감시자 초기화에 실패하면
//! 주기적 폴링으로 대체한다.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use lair_core::error::CoreError;
use lair_core::ports::storage::{InstanceId, KeyValueStorage, StorageChange};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 변경 알림 채널 용량
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// 파일 저장소
///
/// 복제본은 같은 디렉토리/알림 채널을 공유한다.
#[derive(Clone)]
pub struct FileStorage {
    inner: Arc<Inner>,
}

struct Inner {
    dir: PathBuf,
    /// 이 프로세스가 마지막으로 보거나 쓴 키별 내용
    ///
    /// 알림 발행도 이 잠금 안에서 하여 쓰기 순서와 알림 순서를 맞춘다.
    last_seen: Mutex<HashMap<String, Option<String>>>,
    changes: broadcast::Sender<StorageChange>,
}

impl FileStorage {
    /// 데이터 디렉토리로 저장소 생성 (없으면 생성)
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            CoreError::Storage(format!("데이터 디렉토리 생성 실패: {}: {e}", dir.display()))
        })?;
        info!("파일 저장소 초기화: {}", dir.display());

        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self {
            inner: Arc::new(Inner {
                dir,
                last_seen: Mutex::new(HashMap::new()),
                changes,
            }),
        })
    }

    /// 데이터 디렉토리
    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// 키에 해당하는 파일 경로
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.inner.dir.join(format!("{}.json", sanitize_key(key)))
    }

    /// 감시 중인 키들의 외부 변경 확인
    ///
    /// 이 인스턴스가 한 번이라도 읽거나 쓴 키만 감시한다.
    /// 변경된 키 목록을 반환하고 각 변경을 알림으로 발행한다.
    pub fn poll_changes(&self) -> Vec<String> {
        let mut detected = Vec::new();
        let mut last_seen = self.inner.last_seen.lock();
        for (key, seen) in last_seen.iter_mut() {
            let current = match read_file(&self.path_for(key)) {
                Ok(current) => current,
                Err(e) => {
                    warn!("감시 중 파일 읽기 실패: {key}: {e}");
                    continue;
                }
            };
            if current != *seen {
                debug!("외부 변경 감지: {key}");
                *seen = current.clone();
                let _ = self.inner.changes.send(StorageChange {
                    key: key.clone(),
                    new_value: current,
                    origin: None,
                });
                detected.push(key.clone());
            }
        }
        detected
    }

    /// 감시자 태스크 시작
    ///
    /// 데이터 디렉토리를 OS 파일 이벤트로 감시한다. 감시자를 만들 수 없으면
    /// `fallback_interval` 주기의 폴링으로 대체한다.
    /// 반환된 핸들을 abort하면 감시가 멈춘다. tokio 런타임 안에서 호출해야 한다.
    pub fn spawn_watcher(&self, fallback_interval: Duration) -> JoinHandle<()> {
        match self.start_native_watcher() {
            Ok((watcher, events)) => {
                info!("파일 감시 시작: {}", self.inner.dir.display());
                tokio::spawn(run_native_watcher(self.clone(), watcher, events))
            }
            Err(e) => {
                warn!(
                    "파일 감시자 초기화 실패, 폴링으로 대체 (주기 {}ms): {e}",
                    fallback_interval.as_millis()
                );
                self.spawn_poller(fallback_interval)
            }
        }
    }

    /// 폴링 감시자 태스크 시작
    pub fn spawn_poller(&self, interval: Duration) -> JoinHandle<()> {
        let storage = self.clone();
        info!("폴링 감시 시작: 주기 {}ms", interval.as_millis());
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                storage.poll_changes();
            }
        })
    }

    /// 디렉토리 감시 등록
    ///
    /// 반환 전에 등록을 마치므로 이후의 쓰기는 놓치지 않는다.
    fn start_native_watcher(
        &self,
    ) -> notify::Result<(RecommendedWatcher, mpsc::UnboundedReceiver<notify::Result<Event>>)> {
        let (tx, rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
            let _ = tx.send(event);
        })?;
        watcher.watch(&self.inner.dir, RecursiveMode::NonRecursive)?;
        Ok((watcher, rx))
    }

    fn write_atomic(&self, path: &Path, value: &str) -> Result<(), CoreError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CoreError::Internal(format!("잘못된 파일 경로: {}", path.display())))?;
        let tmp = path.with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4().simple()));

        fs::write(&tmp, value).map_err(|e| {
            CoreError::Storage(format!("임시 파일 쓰기 실패: {}: {e}", tmp.display()))
        })?;
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(CoreError::Storage(format!(
                "파일 교체 실패: {}: {e}",
                path.display()
            )));
        }
        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, CoreError> {
        let path = self.path_for(key);
        let mut last_seen = self.inner.last_seen.lock();
        let value = read_file(&path).map_err(|e| {
            CoreError::Storage(format!("파일 읽기 실패: {}: {e}", path.display()))
        })?;
        last_seen.insert(key.to_string(), value.clone());
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str, origin: InstanceId) -> Result<(), CoreError> {
        let path = self.path_for(key);
        // 감시자가 자기 쓰기를 외부 변경으로 오인하지 않도록 잠금 안에서 기록
        let mut last_seen = self.inner.last_seen.lock();
        self.write_atomic(&path, value)?;
        last_seen.insert(key.to_string(), Some(value.to_string()));
        debug!("파일 저장: {}", path.display());

        let _ = self.inner.changes.send(StorageChange {
            key: key.to_string(),
            new_value: Some(value.to_string()),
            origin: Some(origin),
        });
        Ok(())
    }

    fn remove_item(&self, key: &str, origin: InstanceId) -> Result<(), CoreError> {
        let path = self.path_for(key);
        let mut last_seen = self.inner.last_seen.lock();
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                last_seen.insert(key.to_string(), None);
                return Ok(());
            }
            Err(e) => {
                return Err(CoreError::Storage(format!(
                    "파일 삭제 실패: {}: {e}",
                    path.display()
                )))
            }
        }
        last_seen.insert(key.to_string(), None);

        let _ = self.inner.changes.send(StorageChange {
            key: key.to_string(),
            new_value: None,
            origin: Some(origin),
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.inner.changes.subscribe()
    }
}

/// OS 이벤트를 받아 변경 확인 (감시자는 태스크가 소유)
async fn run_native_watcher(
    storage: FileStorage,
    _watcher: RecommendedWatcher,
    mut events: mpsc::UnboundedReceiver<notify::Result<Event>>,
) {
    while let Some(event) = events.recv().await {
        let mut relevant = event_is_relevant(event);
        // 연속된 이벤트는 한 번의 확인으로 묶는다
        while let Ok(event) = events.try_recv() {
            relevant |= event_is_relevant(event);
        }
        if relevant {
            storage.poll_changes();
        }
    }
    debug!("파일 감시 채널 종료");
}

/// 저장 파일에 영향을 주는 이벤트인지 (임시 파일 제외)
fn event_is_relevant(event: notify::Result<Event>) -> bool {
    let event = match event {
        Ok(event) => event,
        Err(e) => {
            warn!("파일 감시 오류: {e}");
            return false;
        }
    };
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Any
    ) {
        return false;
    }
    event.paths.iter().any(|path| is_storage_file(path))
}

fn is_storage_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    !name.starts_with('.') && name.ends_with(".json")
}

/// 파일 내용 읽기 (없으면 None)
fn read_file(path: &Path) -> std::io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// 키를 파일 이름으로 쓸 수 있게 정규화
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn key_sanitizing() {
        assert_eq!(sanitize_key("settings-storage"), "settings-storage");
        assert_eq!(sanitize_key("thgl-settings-palworld"), "thgl-settings-palworld");
        assert_eq!(sanitize_key("a/b:c"), "a_b_c");
    }

    #[test]
    fn set_get_remove_roundtrip() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(dir.path().join("data")).unwrap();
        let me = InstanceId::new();

        assert_eq!(storage.get_item("settings-storage").unwrap(), None);
        storage.set_item("settings-storage", "{\"v\":1}", me).unwrap();
        assert!(storage.path_for("settings-storage").exists());
        assert_eq!(
            storage.get_item("settings-storage").unwrap().as_deref(),
            Some("{\"v\":1}")
        );

        storage.remove_item("settings-storage", me).unwrap();
        assert_eq!(storage.get_item("settings-storage").unwrap(), None);
        // 없는 키 삭제는 성공
        storage.remove_item("settings-storage", me).unwrap();
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        let me = InstanceId::new();
        storage.set_item("k", "1", me).unwrap();
        storage.set_item("k", "2", me).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["k.json".to_string()]);
    }

    #[test]
    fn own_writes_are_not_reported_by_poll() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        storage.set_item("k", "1", InstanceId::new()).unwrap();

        assert!(storage.poll_changes().is_empty());
    }

    #[test]
    fn foreign_process_write_is_detected() {
        let dir = TempDir::new().unwrap();
        let ours = FileStorage::open(dir.path()).unwrap();
        let theirs = FileStorage::open(dir.path()).unwrap();

        assert_eq!(ours.get_item("k").unwrap(), None);
        let mut rx = ours.subscribe();

        theirs.set_item("k", "from-other", InstanceId::new()).unwrap();
        assert_eq!(ours.poll_changes(), vec!["k".to_string()]);

        let change = rx.try_recv().unwrap();
        assert_eq!(change.key, "k");
        assert_eq!(change.new_value.as_deref(), Some("from-other"));
        assert_eq!(change.origin, None);

        // 같은 내용은 다시 보고되지 않음
        assert!(ours.poll_changes().is_empty());
    }

    #[test]
    fn unknown_keys_are_not_watched() {
        let dir = TempDir::new().unwrap();
        let ours = FileStorage::open(dir.path()).unwrap();
        let theirs = FileStorage::open(dir.path()).unwrap();

        theirs.set_item("other", "x", InstanceId::new()).unwrap();
        assert!(ours.poll_changes().is_empty());
    }

    #[test]
    fn last_broadcast_matches_file_under_contention() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        let mut rx = storage.subscribe();

        let writers: Vec<_> = (0..4)
            .map(|n| {
                let storage = storage.clone();
                std::thread::spawn(move || {
                    for i in 0..10 {
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
        assert_eq!(last, read_file(&storage.path_for("k")).unwrap());
    }

    #[test]
    fn temp_files_are_not_storage_files() {
        assert!(is_storage_file(Path::new("/d/settings-storage.json")));
        assert!(!is_storage_file(Path::new("/d/.settings-storage.json.abc.tmp")));
        assert!(!is_storage_file(Path::new("/d/notes.txt")));
    }

    #[test]
    fn only_storage_file_events_are_relevant() {
        let event = Event::new(EventKind::Modify(notify::event::ModifyKind::Any))
            .add_path(PathBuf::from("/d/k.json"));
        assert!(event_is_relevant(Ok(event)));

        let tmp = Event::new(EventKind::Create(notify::event::CreateKind::File))
            .add_path(PathBuf::from("/d/.k.json.1234.tmp"));
        assert!(!event_is_relevant(Ok(tmp)));

        let access = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(PathBuf::from("/d/k.json"));
        assert!(!event_is_relevant(Ok(access)));
    }

    #[tokio::test]
    async fn native_watcher_emits_external_changes() {
        let dir = TempDir::new().unwrap();
        let ours = FileStorage::open(dir.path()).unwrap();
        let theirs = FileStorage::open(dir.path()).unwrap();
        ours.get_item("k").unwrap();
        let mut rx = ours.subscribe();

        // 긴 폴링 주기: 제때 도착하면 OS 이벤트 경로로 감지된 것
        let handle = ours.spawn_watcher(Duration::from_secs(3600));
        theirs.set_item("k", "later", InstanceId::new()).unwrap();

        let change = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(change.new_value.as_deref(), Some("later"));
        assert_eq!(change.origin, None);
        handle.abort();
    }

    #[tokio::test]
    async fn poller_emits_external_changes() {
        let dir = TempDir::new().unwrap();
        let ours = FileStorage::open(dir.path()).unwrap();
        let theirs = FileStorage::open(dir.path()).unwrap();
        ours.get_item("k").unwrap();
        let mut rx = ours.subscribe();

        let handle = ours.spawn_poller(Duration::from_millis(10));
        theirs.set_item("k", "later", InstanceId::new()).unwrap();

        let change = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(change.new_value.as_deref(), Some("later"));
        handle.abort();
    }
}
