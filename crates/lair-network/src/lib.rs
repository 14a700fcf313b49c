//! # lair-network
//!
//! 네트워크 어댑터.
//! `lair-core` 포트의 HTTP 구현을 제공한다.
//!
//! ## 모듈
//! - `http`: 공통 HTTP 클라이언트 생성, 응답 상태 → `CoreError` 매핑
//! - `filter_share`: 공유 필터 게시 (`FilterPublisher` 구현)
//! - `entitlement`: 계정 권한 조회 (`EntitlementClient` 구현)

pub mod entitlement;
pub mod filter_share;
pub mod http;
