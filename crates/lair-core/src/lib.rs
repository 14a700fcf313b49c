//! # lair-core
//!
//! Lair 설정 저장소의 도메인 모델, 포트(trait) 정의, 에러 타입.
//! 모든 크레이트가 공유하는 핵심 타입과 인터페이스를 제공한다.
//!
//! ## 구조
//!
//! - [`models`]: 프로필/설정/계정 데이터 구조체 (serde Serialize/Deserialize)
//! - [`ports`]: 저장소, 필터 공유, 권한 조회 포트 인터페이스
//! - [`error`]: 핵심 에러 타입 (thiserror)
//! - [`config`]: 애플리케이션 설정 구조체
//! - [`config_manager`]: 설정 파일 관리 (로드/저장)

pub mod config;
pub mod config_manager;
pub mod error;
pub mod models;
pub mod ports;

/// 현재 시각 (epoch 밀리초)
///
/// 프로필 `createdAt`/`updatedAt` 타임스탬프 형식과 동일하다.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
