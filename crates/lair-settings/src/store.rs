//! 설정 스토어 본체.
//!
//! 라이브 뷰(활성 프로필 설정의 평탄화 사본), 프로필 목록, 활성 프로필 ID를
//! 하나의 잠금 아래 관리한다. 잠금은 계산 → 적용 → 저장 전체를 덮어
//! 쓰기 순서를 보장하며 `.await`를 가로질러 유지되지 않는다.

use std::sync::Arc;

use lair_core::config::StorageConfig;
use lair_core::error::CoreError;
use lair_core::models::profile::Profile;
use lair_core::models::settings::ProfileSettings;
use lair_core::now_millis;
use lair_core::ports::filter_share::FilterPublisher;
use lair_core::ports::storage::{InstanceId, KeyValueStorage};
use lair_storage::envelope::PersistedEnvelope;
use lair_storage::migration::{migrate_settings, MigrationContext, SETTINGS_SCHEMA_VERSION};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::event::StoreEvent;

/// 이벤트 채널 용량
const EVENT_CHANNEL_CAPACITY: usize = 128;

/// 기본(공유) 설정 저장 키
pub const DEFAULT_SETTINGS_KEY: &str = "settings-storage";

/// 영속 상태 모양: `{profiles, currentProfileId}`
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PersistedSettingsRef<'a> {
    profiles: &'a [Profile],
    current_profile_id: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedSettings {
    profiles: Vec<Profile>,
    current_profile_id: String,
}

/// 잠금 아래의 스토어 상태
#[derive(Debug, Clone)]
pub(crate) struct StoreState {
    /// 활성 프로필 설정의 평탄화 사본
    pub(crate) live: ProfileSettings,
    pub(crate) profiles: Vec<Profile>,
    pub(crate) current_profile_id: String,
}

impl StoreState {
    /// 기본 프로필 하나로 시작하는 상태
    fn seeded(now: i64) -> Self {
        let profile = Profile::seed_default(now);
        Self {
            live: profile.settings.clone(),
            current_profile_id: profile.id.clone(),
            profiles: vec![profile],
        }
    }

    /// 마이그레이션된 상태 객체 해석
    fn decode(state: Map<String, Value>, now: i64) -> Self {
        let persisted: PersistedSettings = match serde_json::from_value(Value::Object(state)) {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!("설정 상태 해석 실패, 기본값 사용: {e}");
                return Self::seeded(now);
            }
        };
        if persisted.profiles.is_empty() {
            return Self::seeded(now);
        }

        let mut state = Self {
            live: ProfileSettings::default(),
            profiles: persisted.profiles,
            current_profile_id: persisted.current_profile_id,
        };
        let current = state.current_profile_id.clone();
        if !state.activate(&current) {
            let first = state.profiles[0].id.clone();
            state.activate(&first);
        }
        state
    }

    pub(crate) fn find(&self, id: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    pub(crate) fn active(&self) -> Option<&Profile> {
        self.find(&self.current_profile_id)
    }

    pub(crate) fn active_mut(&mut self) -> Option<&mut Profile> {
        let id = self.current_profile_id.clone();
        self.profiles.iter_mut().find(|p| p.id == id)
    }

    /// 프로필 활성화 및 라이브 뷰 평탄화
    pub(crate) fn activate(&mut self, id: &str) -> bool {
        let Some((settings, id)) = self.find(id).map(|p| (p.settings.clone(), p.id.clone()))
        else {
            return false;
        };
        self.live = settings;
        self.current_profile_id = id;
        true
    }

    fn to_envelope(&self) -> Result<PersistedEnvelope, CoreError> {
        PersistedEnvelope::from_state(
            &PersistedSettingsRef {
                profiles: &self.profiles,
                current_profile_id: &self.current_profile_id,
            },
            SETTINGS_SCHEMA_VERSION,
        )
    }
}

/// 설정 스토어
///
/// 복제본은 같은 상태를 공유한다. 탭/창 하나가 인스턴스 하나에 해당하며,
/// 같은 저장소를 공유하는 인스턴스끼리는 [`crate::StorageSync`]로 수렴한다.
#[derive(Clone)]
pub struct SettingsStore {
    pub(crate) inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) state: Mutex<StoreState>,
    pub(crate) storage: Arc<dyn KeyValueStorage>,
    pub(crate) key: String,
    pub(crate) instance_id: InstanceId,
    pub(crate) publisher: Option<Arc<dyn FilterPublisher>>,
    pub(crate) events: broadcast::Sender<StoreEvent>,
}

/// 스토어 생성기
pub struct SettingsStoreBuilder {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
    legacy_key: Option<String>,
    publisher: Option<Arc<dyn FilterPublisher>>,
}

impl SettingsStoreBuilder {
    /// 저장 키 지정
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// 예전 공유 키 지정 (버전 3 미만 데이터 가져오기용)
    pub fn legacy_key(mut self, legacy_key: Option<String>) -> Self {
        self.legacy_key = legacy_key;
        self
    }

    /// 앱 경로로 저장 키 결정
    ///
    /// 앱별 키를 쓰게 되면 기본 키를 예전 공유 키로 함께 지정한다.
    pub fn for_app(self, config: &StorageConfig, app_path: Option<&str>) -> Self {
        let key = config.settings_key(app_path);
        let legacy = (key != config.default_key).then(|| config.default_key.clone());
        self.key(key).legacy_key(legacy)
    }

    /// 공유 필터 게시자 주입
    pub fn publisher(mut self, publisher: Arc<dyn FilterPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// 저장소에서 상태를 읽어 스토어 생성
    ///
    /// 손상된 데이터나 읽기 실패는 기본값으로 복구한다.
    /// 마이그레이션으로 버전이 바뀌면 즉시 다시 기록한다.
    pub fn open(self) -> SettingsStore {
        let now = now_millis();
        let (state, write_back) =
            load_state(self.storage.as_ref(), &self.key, self.legacy_key.as_deref(), now);

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let store = SettingsStore {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                storage: self.storage,
                key: self.key,
                instance_id: InstanceId::new(),
                publisher: self.publisher,
                events,
            }),
        };

        if write_back {
            if let Err(e) = store.persist() {
                warn!("마이그레이션 결과 저장 실패: {e}");
            }
        }
        info!(
            "설정 스토어 열림: key={}, 프로필 {}개",
            store.inner.key,
            store.inner.state.lock().profiles.len()
        );
        store
    }
}

/// 저장소에서 상태 로드. (상태, 다시 기록 필요 여부)
fn load_state(
    storage: &dyn KeyValueStorage,
    key: &str,
    legacy_key: Option<&str>,
    now: i64,
) -> (StoreState, bool) {
    let raw = match storage.get_item(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!("저장된 설정 없음, 기본 프로필로 시작: {key}");
            return (StoreState::seeded(now), false);
        }
        Err(e) => {
            warn!("설정 읽기 실패, 기본값 사용: {e}");
            return (StoreState::seeded(now), false);
        }
    };

    let envelope = match PersistedEnvelope::parse(&raw) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("손상된 설정 데이터, 기본값 사용: {e}");
            return (StoreState::seeded(now), false);
        }
    };

    let legacy = if envelope.version < 3 {
        legacy_key
            .filter(|legacy| *legacy != key)
            .and_then(|legacy| read_legacy_state(storage, legacy))
    } else {
        None
    };

    let ctx = MigrationContext::new(now).with_legacy_state(legacy.as_ref());
    let migrated = migrate_settings(envelope.state, envelope.version, &ctx);
    if envelope.version != SETTINGS_SCHEMA_VERSION {
        info!(
            "설정 마이그레이션 완료: v{} → v{SETTINGS_SCHEMA_VERSION}",
            envelope.version
        );
    }
    (
        StoreState::decode(migrated, now),
        envelope.version != SETTINGS_SCHEMA_VERSION,
    )
}

fn read_legacy_state(storage: &dyn KeyValueStorage, legacy_key: &str) -> Option<Map<String, Value>> {
    match storage.get_item(legacy_key) {
        Ok(Some(raw)) => match PersistedEnvelope::parse(&raw) {
            Ok(envelope) => {
                debug!("공유 키 상태 발견: {legacy_key}");
                Some(envelope.state)
            }
            Err(e) => {
                warn!("공유 키 상태 손상, 무시: {e}");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!("공유 키 읽기 실패: {e}");
            None
        }
    }
}

impl SettingsStore {
    /// 생성기 시작 (기본 키 `settings-storage`)
    pub fn builder(storage: Arc<dyn KeyValueStorage>) -> SettingsStoreBuilder {
        SettingsStoreBuilder {
            storage,
            key: DEFAULT_SETTINGS_KEY.to_string(),
            legacy_key: None,
            publisher: None,
        }
    }

    /// 기본 키로 스토어 열기
    pub fn open(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::builder(storage).open()
    }

    /// 저장 키
    pub fn storage_key(&self) -> &str {
        &self.inner.key
    }

    /// 이 인스턴스의 식별자
    pub fn instance_id(&self) -> InstanceId {
        self.inner.instance_id
    }

    /// 공유 저장소 핸들
    pub fn storage(&self) -> Arc<dyn KeyValueStorage> {
        self.inner.storage.clone()
    }

    /// 이벤트 구독
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.events.subscribe()
    }

    /// 활성 프로필의 전체 설정
    pub fn current_profile_settings(&self) -> ProfileSettings {
        self.inner.state.lock().live.clone()
    }

    pub(crate) fn read_settings<R>(&self, f: impl FnOnce(&ProfileSettings) -> R) -> R {
        f(&self.inner.state.lock().live)
    }

    /// 변경 퍼널
    ///
    /// 라이브 뷰의 사본에 `f`를 적용하고, `f`가 true를 반환하며 실제로 값이
    /// 달라졌을 때만 활성 프로필 스냅샷과 라이브 뷰를 함께 교체하고
    /// `updatedAt`을 갱신한 뒤 저장한다. 변경 여부를 반환한다.
    pub fn try_update_settings<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut ProfileSettings) -> bool,
    {
        let profile_id = {
            let mut state = self.inner.state.lock();
            let mut next = state.live.clone();
            if !f(&mut next) || next == state.live {
                return false;
            }

            let now = now_millis();
            let Some(profile) = state.active_mut() else {
                warn!("활성 프로필 없음, 설정 변경 무시: {}", state.current_profile_id);
                return false;
            };
            profile.settings = next.clone();
            profile.updated_at = now;
            let profile_id = profile.id.clone();
            state.live = next;

            self.persist_locked(&state);
            profile_id
        };

        self.emit(StoreEvent::SettingsChanged { profile_id });
        true
    }

    /// 설정 일괄 변경 (퍼널 경유)
    pub fn update_settings<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut ProfileSettings),
    {
        self.try_update_settings(|settings| {
            f(settings);
            true
        })
    }

    /// 잠금 아래에서 상태 변경 후 저장, 잠금 해제 뒤 이벤트 발행
    pub(crate) fn commit<R>(&self, f: impl FnOnce(&mut StoreState) -> (R, Vec<StoreEvent>)) -> R {
        let (result, events) = {
            let mut state = self.inner.state.lock();
            let (result, events) = f(&mut state);
            self.persist_locked(&state);
            (result, events)
        };
        for event in events {
            self.emit(event);
        }
        result
    }

    /// 검증이 필요한 상태 변경. 에러면 상태를 건드리지 않는다.
    pub(crate) fn try_commit<R>(
        &self,
        f: impl FnOnce(&mut StoreState) -> Result<(R, Vec<StoreEvent>), CoreError>,
    ) -> Result<R, CoreError> {
        let (result, events) = {
            let mut state = self.inner.state.lock();
            let (result, events) = f(&mut state)?;
            self.persist_locked(&state);
            (result, events)
        };
        for event in events {
            self.emit(event);
        }
        Ok(result)
    }

    pub(crate) fn read_state<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        f(&self.inner.state.lock())
    }

    /// 현재 상태를 저장소에 기록
    pub fn persist(&self) -> Result<(), CoreError> {
        let state = self.inner.state.lock();
        self.write_state(&state)
    }

    /// 저장 실패는 기록만 하고 상태는 유지한다
    fn persist_locked(&self, state: &StoreState) {
        if let Err(e) = self.write_state(state) {
            warn!("설정 저장 실패: {e}");
        }
    }

    fn write_state(&self, state: &StoreState) -> Result<(), CoreError> {
        let raw = state.to_envelope()?.to_json()?;
        self.inner
            .storage
            .set_item(&self.inner.key, &raw, self.inner.instance_id)
    }

    /// 다른 인스턴스가 기록한 값으로 상태 교체
    ///
    /// 마이그레이션과 평탄화를 다시 수행한다. 값이 삭제된 경우(None)와
    /// 손상된 값은 무시한다. 다시 기록하지 않는다.
    pub fn rehydrate(&self, raw: Option<&str>) {
        let Some(raw) = raw else {
            debug!("설정 키 삭제 알림 무시: {}", self.inner.key);
            return;
        };

        let envelope = match PersistedEnvelope::parse(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("재수화 데이터 손상, 무시: {e}");
                return;
            }
        };

        let now = now_millis();
        let ctx = MigrationContext::new(now);
        let migrated = migrate_settings(envelope.state, envelope.version, &ctx);
        let next = StoreState::decode(migrated, now);

        *self.inner.state.lock() = next;
        debug!("설정 재수화 완료: {}", self.inner.key);
        self.emit(StoreEvent::Rehydrated);
    }

    pub(crate) fn emit(&self, event: StoreEvent) {
        // 구독자가 없으면 전송 실패는 무시
        let _ = self.inner.events.send(event);
    }
}

impl std::fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsStore")
            .field("key", &self.inner.key)
            .field("instance_id", &self.inner.instance_id)
            .finish_non_exhaustive()
    }
}
