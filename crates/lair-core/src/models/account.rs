//! 계정/권한(perks) 모델.

use serde::{Deserialize, Serialize};

/// 수익화 기능 게이트용 권한 플래그
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Perks {
    pub ad_removal: bool,
    pub preview_release_access: bool,
    pub comments: bool,
    pub premium_features: bool,
}

impl Perks {
    /// 하나라도 활성화된 권한이 있는지
    pub fn any(&self) -> bool {
        self.ad_removal || self.preview_release_access || self.comments || self.premium_features
    }
}

/// 캐시된 계정 레코드: 갱신 시 통째로 교체된다
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Account {
    pub user_id: Option<String>,
    pub decrypted_user_id: Option<String>,
    pub email: Option<String>,
    pub perks: Perks,
}

impl Account {
    /// 사용자 ID만 유지하고 권한은 모두 해제한 계정
    pub fn without_perks(user_id: Option<String>) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }

    /// 로그인 상태 또는 활성 권한이 남아 있는지
    pub fn is_signed_in_or_entitled(&self) -> bool {
        self.user_id.is_some() || self.perks.any()
    }
}
