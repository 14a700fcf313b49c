//! 포트 인터페이스 (trait).
//!
//! Hexagonal Architecture의 포트 레이어.
//! 어댑터 crate(`lair-storage`, `lair-network`)가 이 trait들을 구현하며,
//! `lair-settings`의 스토어는 `Arc<dyn T>`로 주입받는다.
//!
//! 네트워크 포트는 `async_trait` 매크로로 object safety를 보장한다.
//! 저장소 포트는 변경 퍼널이 동기식이므로 동기 trait이다.

pub mod entitlement;
pub mod filter_share;
pub mod storage;
