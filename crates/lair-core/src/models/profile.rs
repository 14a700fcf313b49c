//! 프로필 모델.

use serde::{Deserialize, Serialize};

use super::settings::ProfileSettings;

/// 예약된 기본 프로필 ID
pub const DEFAULT_PROFILE_ID: &str = "default";

/// 기본 프로필 표시 이름
pub const DEFAULT_PROFILE_NAME: &str = "Default";

/// 이름 붙은 설정 번들
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// 고유 ID (`"default"`는 시드 프로필 전용)
    pub id: String,
    /// 표시 이름 (프로필 간 고유)
    pub name: String,
    /// 설정 스냅샷
    pub settings: ProfileSettings,
    /// 생성 시각 (epoch 밀리초)
    pub created_at: i64,
    /// 마지막 수정 시각 (epoch 밀리초)
    pub updated_at: i64,
}

impl Profile {
    /// 기본 설정으로 새 프로필 생성
    pub fn new(id: String, name: String, now: i64) -> Self {
        Self {
            id,
            name,
            settings: ProfileSettings::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 첫 실행 시 생성되는 시드 프로필
    pub fn seed_default(now: i64) -> Self {
        Self::new(
            DEFAULT_PROFILE_ID.to_string(),
            DEFAULT_PROFILE_NAME.to_string(),
            now,
        )
    }

    /// 예약된 기본 프로필 여부
    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_PROFILE_ID
    }
}

/// 충돌 방지 프로필 ID 생성 (시각 + 무작위 접미사)
pub fn generate_profile_id(now: i64) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("profile-{now}-{}", &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_within_same_millisecond() {
        let a = generate_profile_id(42);
        let b = generate_profile_id(42);
        assert!(a.starts_with("profile-42-"));
        assert_ne!(a, b);
    }

    #[test]
    fn seed_profile_is_default() {
        let profile = Profile::seed_default(10);
        assert!(profile.is_default());
        assert_eq!(profile.name, DEFAULT_PROFILE_NAME);
        assert_eq!(profile.created_at, profile.updated_at);
        assert_eq!(profile.settings, ProfileSettings::default());
    }
}
