//! Lair 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 자체 실패를 `CoreError`로 매핑한다.

use thiserror::Error;

/// 코어 레이어 에러.
/// 직렬화, 설정, 저장소, 유효성 검증 등 도메인 공통 에러를 정의한다.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패: {field}: {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 리소스를 찾을 수 없음
    #[error("{resource_type} 미발견: {id}")]
    NotFound {
        /// 리소스 종류 (예: "Profile", "MyFilter")
        resource_type: String,
        /// 리소스 식별자
        id: String,
    },

    /// 정책상 허용되지 않는 작업 (마지막/기본 프로필 삭제 등)
    #[error("허용되지 않는 작업: {0}")]
    NotPermitted(String),

    /// 저장소 읽기/쓰기 실패
    #[error("저장소 에러: {0}")]
    Storage(String),

    /// 인증 실패 (권한 없음, 만료된 사용자 등)
    #[error("인증 에러: {0}")]
    Auth(String),

    /// 잘못된 인자
    #[error("잘못된 인자: {0}")]
    InvalidArguments(String),

    /// 네트워크 에러 (연결 실패, 타임아웃)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// 프로필 미발견 에러 생성
    pub fn profile_not_found(id: &str) -> Self {
        Self::NotFound {
            resource_type: "Profile".to_string(),
            id: id.to_string(),
        }
    }
}
