//! 스키마 마이그레이션.
//!
//! 버전 기반 영속 상태 업그레이드. 각 단계는 JSON 객체에 대한 순수 함수이며
//! 가드 조건으로 보호되어 여러 번 실행해도 결과가 같다.
//! 예상과 다른 모양은 에러 대신 안전한 기본값으로 대체한다.

use std::collections::HashSet;

use lair_core::models::profile::{Profile, DEFAULT_PROFILE_ID, DEFAULT_PROFILE_NAME};
use lair_core::models::settings::ProfileSettings;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// 현재 설정 스키마 버전
pub const SETTINGS_SCHEMA_VERSION: u32 = 5;

/// 현재 계정 스키마 버전
pub const ACCOUNT_SCHEMA_VERSION: u32 = 2;

/// 설정 상태에 영속되는 키
const PROFILES_KEY: &str = "profiles";
const CURRENT_PROFILE_ID_KEY: &str = "currentProfileId";
/// v4 이전 일부 빌드가 남긴 중첩 현재 프로필
const NESTED_CURRENT_PROFILE_KEY: &str = "currentProfile";

/// 마이그레이션 입력 외 환경 정보
#[derive(Debug, Clone, Copy)]
pub struct MigrationContext<'a> {
    /// 앱별 키 사용 시, 공유 키(`settings-storage`)에 남아 있는 예전 상태
    pub legacy_state: Option<&'a Map<String, Value>>,
    /// 누락된 타임스탬프/ID 생성용 현재 시각 (epoch 밀리초)
    pub now_millis: i64,
}

impl<'a> MigrationContext<'a> {
    pub fn new(now_millis: i64) -> Self {
        Self {
            legacy_state: None,
            now_millis,
        }
    }

    pub fn with_legacy_state(mut self, legacy_state: Option<&'a Map<String, Value>>) -> Self {
        self.legacy_state = legacy_state;
        self
    }
}

/// 설정 상태 마이그레이션 실행
///
/// 결과는 항상 `{profiles, currentProfileId}`만 담은 검증된 객체다.
pub fn migrate_settings(
    mut state: Map<String, Value>,
    version: u32,
    ctx: &MigrationContext<'_>,
) -> Map<String, Value> {
    if version < SETTINGS_SCHEMA_VERSION {
        info!("설정 스키마 버전: {version}, 목표: {SETTINGS_SCHEMA_VERSION}");
    }

    if version < 3 {
        migrate_settings_v3(&mut state, ctx);
    }

    if version < 4 {
        migrate_settings_v4(&mut state, ctx);
    }

    if version < 5 {
        migrate_settings_v5(&mut state);
    }

    // 최신 버전이어도 모양 검증은 항상 수행
    normalize_settings(state, ctx.now_millis)
}

/// V3: 앱별 키로 분리되기 전 공유 키의 상태 가져오기
fn migrate_settings_v3(state: &mut Map<String, Value>, ctx: &MigrationContext<'_>) {
    let Some(legacy) = ctx.legacy_state else {
        return;
    };
    debug!("마이그레이션 V3 실행: 공유 키 상태 {}개 필드 병합", legacy.len());
    for (key, value) in legacy {
        state.insert(key.clone(), value.clone());
    }
}

/// V4: 플랫 설정을 기본 프로필로 감싸기
fn migrate_settings_v4(state: &mut Map<String, Value>, ctx: &MigrationContext<'_>) {
    let has_profiles = state
        .get(PROFILES_KEY)
        .and_then(Value::as_array)
        .is_some_and(|profiles| !profiles.is_empty());
    if has_profiles {
        return;
    }

    debug!("마이그레이션 V4 실행: 플랫 설정 → 기본 프로필");
    let flat = take_flat_settings(state);
    let mut profile = Profile::seed_default(ctx.now_millis);
    profile.settings = ProfileSettings::from_value_lenient(&Value::Object(flat));

    match serde_json::to_value(&profile) {
        Ok(value) => {
            state.insert(PROFILES_KEY.to_string(), Value::Array(vec![value]));
            state.insert(
                CURRENT_PROFILE_ID_KEY.to_string(),
                Value::String(DEFAULT_PROFILE_ID.to_string()),
            );
        }
        Err(e) => warn!("기본 프로필 직렬화 실패: {e}"),
    }
}

/// V5: 중첩된 현재 프로필을 프로필 배열로 합치고 루트의 플랫 설정 제거
fn migrate_settings_v5(state: &mut Map<String, Value>) {
    if let Some(nested) = state.remove(NESTED_CURRENT_PROFILE_KEY) {
        debug!("마이그레이션 V5 실행: 중첩 현재 프로필 병합");
        fold_nested_profile(state, nested);
    }

    let flat = take_flat_settings(state);
    if !flat.is_empty() {
        debug!("마이그레이션 V5: 루트 플랫 설정 {}개 제거", flat.len());
    }
}

fn fold_nested_profile(state: &mut Map<String, Value>, nested: Value) {
    let Value::Object(nested) = nested else {
        warn!("중첩 현재 프로필이 객체가 아님, 무시");
        return;
    };
    let Some(id) = nested.get("id").and_then(Value::as_str).map(str::to_string) else {
        warn!("중첩 현재 프로필에 id 없음, 무시");
        return;
    };

    let profiles = state
        .entry(PROFILES_KEY.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if !profiles.is_array() {
        *profiles = Value::Array(Vec::new());
    }
    if let Value::Array(list) = profiles {
        let existing = list
            .iter_mut()
            .find(|p| p.get("id").and_then(Value::as_str) == Some(id.as_str()));
        match existing {
            Some(Value::Object(target)) => {
                for key in ["name", "settings"] {
                    if let Some(value) = nested.get(key) {
                        target.insert(key.to_string(), value.clone());
                    }
                }
            }
            _ => list.push(Value::Object(nested)),
        }
    }

    let has_current = state
        .get(CURRENT_PROFILE_ID_KEY)
        .and_then(Value::as_str)
        .is_some();
    if !has_current {
        state.insert(CURRENT_PROFILE_ID_KEY.to_string(), Value::String(id));
    }
}

/// 루트에서 프로필 설정 필드를 떼어내 반환
fn take_flat_settings(state: &mut Map<String, Value>) -> Map<String, Value> {
    let mut flat = Map::new();
    for name in ProfileSettings::field_names() {
        if let Some(value) = state.remove(&name) {
            flat.insert(name, value);
        }
    }
    flat
}

/// 프로필 목록/현재 ID 검증 및 기본값 보충
fn normalize_settings(state: Map<String, Value>, now_millis: i64) -> Map<String, Value> {
    let raw_profiles = match state.get(PROFILES_KEY) {
        Some(Value::Array(list)) => list.clone(),
        Some(_) => {
            warn!("profiles가 배열이 아님, 기본 프로필로 대체");
            Vec::new()
        }
        None => Vec::new(),
    };

    let mut seen = HashSet::new();
    let mut profiles = Vec::with_capacity(raw_profiles.len());
    for (index, raw) in raw_profiles.iter().enumerate() {
        let Some(profile) = normalize_profile(raw, index, now_millis) else {
            continue;
        };
        if !seen.insert(profile.id.clone()) {
            warn!("중복 프로필 ID 제거: {}", profile.id);
            continue;
        }
        profiles.push(profile);
    }

    if profiles.is_empty() {
        info!("프로필 없음, 기본 프로필 생성");
        profiles.push(Profile::seed_default(now_millis));
    }

    let current_id = state
        .get(CURRENT_PROFILE_ID_KEY)
        .and_then(Value::as_str)
        .filter(|id| profiles.iter().any(|p| p.id == *id))
        .map(str::to_string)
        .unwrap_or_else(|| profiles[0].id.clone());

    let mut out = Map::new();
    out.insert(
        PROFILES_KEY.to_string(),
        Value::Array(
            profiles
                .iter()
                .filter_map(|p| serde_json::to_value(p).ok())
                .collect(),
        ),
    );
    out.insert(CURRENT_PROFILE_ID_KEY.to_string(), Value::String(current_id));
    out
}

/// 프로필 하나 검증. 객체가 아니면 버린다.
fn normalize_profile(raw: &Value, index: usize, now_millis: i64) -> Option<Profile> {
    let Value::Object(fields) = raw else {
        warn!("프로필 항목 #{index}이 객체가 아님, 제거");
        return None;
    };

    let id = fields
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            warn!("프로필 #{index} id 누락, 새 id 부여");
            format!("profile-{now_millis}-{index}")
        });

    let name = fields
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            if id == DEFAULT_PROFILE_ID {
                DEFAULT_PROFILE_NAME.to_string()
            } else {
                format!("Profile {}", index + 1)
            }
        });

    let settings = fields
        .get("settings")
        .map(ProfileSettings::from_value_lenient)
        .unwrap_or_default();

    let created_at = fields
        .get("createdAt")
        .and_then(Value::as_i64)
        .unwrap_or(now_millis);
    let updated_at = fields
        .get("updatedAt")
        .and_then(Value::as_i64)
        .unwrap_or(created_at);

    Some(Profile {
        id,
        name,
        settings,
        created_at,
        updated_at,
    })
}

/// 계정 상태 마이그레이션 실행
pub fn migrate_account(mut state: Map<String, Value>, version: u32) -> Map<String, Value> {
    if version < ACCOUNT_SCHEMA_VERSION {
        info!("계정 스키마 버전: {version}, 목표: {ACCOUNT_SCHEMA_VERSION}");
    }

    if version < 1 {
        migrate_account_v1(&mut state);
    }

    if version < 2 {
        migrate_account_v2(&mut state);
    }

    state
}

/// V1: 플랫 권한 플래그를 `perks`로 중첩
///
/// 새 플래그(`comments`, `premiumFeatures`)는 기존 `adRemoval` 값을 물려받는다.
fn migrate_account_v1(state: &mut Map<String, Value>) {
    let ad_removal = state.remove("adRemoval");
    let preview = state.remove("previewReleaseAccess");
    if state.get("perks").is_some_and(Value::is_object) {
        return;
    }

    debug!("계정 마이그레이션 V1 실행: 권한 플래그 중첩");
    let flag = |v: Option<Value>| Value::Bool(v.and_then(|v| v.as_bool()).unwrap_or(false));
    let supporter = flag(ad_removal);
    let mut perks = Map::new();
    perks.insert("adRemoval".to_string(), supporter.clone());
    perks.insert("previewReleaseAccess".to_string(), flag(preview));
    perks.insert("comments".to_string(), supporter.clone());
    perks.insert("premiumFeatures".to_string(), supporter);
    state.insert("perks".to_string(), Value::Object(perks));
}

/// V2: email 필드 추가
fn migrate_account_v2(state: &mut Map<String, Value>) {
    if !state.contains_key("email") {
        debug!("계정 마이그레이션 V2 실행: email 필드 추가");
        state.insert("email".to_string(), Value::Null);
    }
}
