//! 프로필 관리.
//!
//! 생성/전환/이름변경/삭제/내보내기/가져오기/복제.
//! 잘못된 요청(없는 ID, 마지막/기본 프로필 삭제)은 상태를 건드리지 않고
//! 에러를 반환한다. 이름 중복은 거부하지 않으며 호출자가
//! [`SettingsStore::validate_profile_name`]으로 검증한다.

use lair_core::error::CoreError;
use lair_core::models::profile::{generate_profile_id, Profile, DEFAULT_PROFILE_ID};
use lair_core::models::settings::ProfileSettings;
use lair_core::now_millis;
use serde_json::Value;
use tracing::info;

use crate::event::StoreEvent;
use crate::store::{SettingsStore, StoreState};

impl SettingsStore {
    /// 활성 프로필 ID
    pub fn current_profile_id(&self) -> String {
        self.read_state(|s| s.current_profile_id.clone())
    }

    /// 활성 프로필 (항상 존재)
    pub fn current_profile(&self) -> Profile {
        self.read_state(|s| match s.active() {
            Some(profile) => profile.clone(),
            None => Profile {
                id: s.current_profile_id.clone(),
                name: String::new(),
                settings: s.live.clone(),
                created_at: 0,
                updated_at: 0,
            },
        })
    }

    /// 전체 프로필 목록 (저장 순서)
    pub fn profiles(&self) -> Vec<Profile> {
        self.read_state(|s| s.profiles.clone())
    }

    /// 다른 프로필이 이미 같은 이름을 쓰는지
    pub fn is_profile_name_taken(&self, name: &str, except_id: Option<&str>) -> bool {
        let name = name.trim();
        self.read_state(|s| {
            s.profiles
                .iter()
                .any(|p| p.name.trim() == name && Some(p.id.as_str()) != except_id)
        })
    }

    /// 프로필 이름 검증 (비어 있지 않고 고유할 것)
    pub fn validate_profile_name(&self, name: &str, except_id: Option<&str>) -> Result<(), CoreError> {
        if name.trim().is_empty() {
            return Err(CoreError::Validation {
                field: "name".to_string(),
                message: "프로필 이름이 비어 있음".to_string(),
            });
        }
        if self.is_profile_name_taken(name, except_id) {
            return Err(CoreError::Validation {
                field: "name".to_string(),
                message: format!("이미 사용 중인 프로필 이름: {}", name.trim()),
            });
        }
        Ok(())
    }

    /// 기본 설정으로 새 프로필 생성 후 활성화
    pub fn create_profile(&self, name: &str) -> String {
        let now = now_millis();
        let profile = Profile::new(generate_profile_id(now), name.to_string(), now);
        let id = profile.id.clone();

        self.commit(|state| {
            state.profiles.push(profile);
            state.activate(&id);
            info!("프로필 생성: {id}");
            (
                id.clone(),
                vec![
                    StoreEvent::ProfilesChanged,
                    StoreEvent::ProfileSwitched {
                        profile_id: id.clone(),
                    },
                ],
            )
        })
    }

    /// 활성 프로필 전환. 라이브 뷰는 대상 스냅샷으로 교체된다.
    pub fn switch_profile(&self, id: &str) -> Result<(), CoreError> {
        self.try_commit(|state| {
            if !state.activate(id) {
                return Err(CoreError::profile_not_found(id));
            }
            info!("프로필 전환: {id}");
            Ok((
                (),
                vec![StoreEvent::ProfileSwitched {
                    profile_id: id.to_string(),
                }],
            ))
        })
    }

    /// 프로필 이름 변경
    pub fn rename_profile(&self, id: &str, name: &str) -> Result<(), CoreError> {
        let now = now_millis();
        self.try_commit(|state| {
            let profile = state
                .profiles
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or_else(|| CoreError::profile_not_found(id))?;
            profile.name = name.to_string();
            profile.updated_at = now;
            info!("프로필 이름 변경: {id}");
            Ok(((), vec![StoreEvent::ProfilesChanged]))
        })
    }

    /// 프로필 삭제
    ///
    /// 기본 프로필과 마지막 남은 프로필은 삭제할 수 없다. 활성 프로필을 지우면
    /// 남은 첫 프로필이 활성화된다.
    pub fn delete_profile(&self, id: &str) -> Result<(), CoreError> {
        self.try_commit(|state| {
            let index = state
                .profiles
                .iter()
                .position(|p| p.id == id)
                .ok_or_else(|| CoreError::profile_not_found(id))?;
            if id == DEFAULT_PROFILE_ID {
                return Err(CoreError::NotPermitted("기본 프로필은 삭제할 수 없음".to_string()));
            }
            if state.profiles.len() <= 1 {
                return Err(CoreError::NotPermitted(
                    "마지막 프로필은 삭제할 수 없음".to_string(),
                ));
            }

            state.profiles.remove(index);
            info!("프로필 삭제: {id}");

            let mut events = vec![StoreEvent::ProfilesChanged];
            if state.current_profile_id == id {
                let next = state.profiles[0].id.clone();
                state.activate(&next);
                events.push(StoreEvent::ProfileSwitched { profile_id: next });
            }
            Ok(((), events))
        })
    }

    /// 프로필 스냅샷 내보내기 (독립 복제본)
    pub fn export_profile(&self, id: &str) -> Option<Profile> {
        self.read_state(|s| s.find(id).cloned())
    }

    /// 프로필을 JSON 문자열로 내보내기
    pub fn export_profile_json(&self, id: &str) -> Result<String, CoreError> {
        let profile = self
            .export_profile(id)
            .ok_or_else(|| CoreError::profile_not_found(id))?;
        Ok(serde_json::to_string_pretty(&profile)?)
    }

    /// 프로필 가져오기
    ///
    /// 목록 끝에 추가되며 활성화되지 않는다. ID가 겹치거나 비어 있으면 새 ID를
    /// 부여한다. 부여된 ID를 반환한다.
    pub fn import_profile(&self, mut profile: Profile) -> String {
        let now = now_millis();
        self.commit(|state| {
            if profile.id.is_empty() || state.find(&profile.id).is_some() {
                let fresh = unique_profile_id(state, now);
                info!("가져온 프로필 ID 충돌, 새 ID 부여: {} → {fresh}", profile.id);
                profile.id = fresh;
            }
            let id = profile.id.clone();
            state.profiles.push(profile);
            info!("프로필 가져오기: {id}");
            (id, vec![StoreEvent::ProfilesChanged])
        })
    }

    /// JSON 문자열에서 프로필 가져오기
    ///
    /// `id`, `name`, `settings`, 숫자 `createdAt`/`updatedAt`이 모두 있어야 한다.
    /// 설정 안의 개별 필드 오류는 기본값으로 복구된다.
    pub fn import_profile_json(&self, raw: &str) -> Result<String, CoreError> {
        let value: Value = serde_json::from_str(raw)?;
        let profile = parse_exported_profile(&value)?;
        Ok(self.import_profile(profile))
    }

    /// 프로필 복제 후 활성화
    pub fn duplicate_profile(&self, id: &str, new_name: &str) -> Result<String, CoreError> {
        let now = now_millis();
        self.try_commit(|state| {
            let source = state
                .find(id)
                .ok_or_else(|| CoreError::profile_not_found(id))?;
            let copy = Profile {
                id: unique_profile_id(state, now),
                name: new_name.to_string(),
                settings: source.settings.clone(),
                created_at: now,
                updated_at: now,
            };
            let new_id = copy.id.clone();
            state.profiles.push(copy);
            state.activate(&new_id);
            info!("프로필 복제: {id} → {new_id}");
            Ok((
                new_id.clone(),
                vec![
                    StoreEvent::ProfilesChanged,
                    StoreEvent::ProfileSwitched { profile_id: new_id },
                ],
            ))
        })
    }
}

fn unique_profile_id(state: &StoreState, now: i64) -> String {
    loop {
        let id = generate_profile_id(now);
        if state.find(&id).is_none() {
            return id;
        }
    }
}

fn parse_exported_profile(value: &Value) -> Result<Profile, CoreError> {
    let invalid = |field: &str, message: &str| CoreError::Validation {
        field: field.to_string(),
        message: message.to_string(),
    };

    let fields = value
        .as_object()
        .ok_or_else(|| invalid("profile", "객체가 아님"))?;
    let id = fields
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("id", "문자열 필요"))?;
    let name = fields
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("name", "문자열 필요"))?;
    let settings = fields
        .get("settings")
        .filter(|v| v.is_object())
        .ok_or_else(|| invalid("settings", "객체 필요"))?;
    let created_at = fields
        .get("createdAt")
        .and_then(Value::as_f64)
        .ok_or_else(|| invalid("createdAt", "숫자 필요"))?;
    let updated_at = fields
        .get("updatedAt")
        .and_then(Value::as_f64)
        .ok_or_else(|| invalid("updatedAt", "숫자 필요"))?;

    Ok(Profile {
        id: id.to_string(),
        name: name.to_string(),
        settings: ProfileSettings::from_value_lenient(settings),
        created_at: created_at as i64,
        updated_at: updated_at as i64,
    })
}
