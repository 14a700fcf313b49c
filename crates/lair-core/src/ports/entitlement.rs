//! 계정 권한 조회 포트.
//!
//! 구현: `lair-network` crate (reqwest)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::account::Perks;

/// 권한 조회 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitlementGrant {
    pub decrypted_user_id: Option<String>,
    pub email: Option<String>,
    pub perks: Perks,
}

/// 권한 협력자
///
/// 에러 매핑 규약:
/// - `CoreError::Auth`: 사용자는 유효하나 권한 없음 (403)
/// - `CoreError::NotFound` / `CoreError::InvalidArguments`: 사용자 무효 (404/400)
/// - 그 외: 일시적 실패
#[async_trait]
pub trait EntitlementClient: Send + Sync {
    /// 사용자 권한 조회
    async fn fetch_entitlements(&self, user_id: &str) -> Result<EntitlementGrant, CoreError>;
}
