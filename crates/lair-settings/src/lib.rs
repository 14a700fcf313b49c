//! # lair-settings
//!
//! 설정/프로필 스토어.
//!
//! 모든 설정 변경은 단일 퍼널(`SettingsStore::try_update_settings`)을 거쳐
//! 라이브 뷰와 활성 프로필 스냅샷에 동시에 반영되고 저장소에 기록된다.
//!
//! ## 모듈
//! - `store`: 스토어 본체, 변경 퍼널, 로드/재수화
//! - `accessors`: 필드별 getter/setter/toggle
//! - `discovered`: 발견 노드 `@` 변형 규칙
//! - `profiles`: 프로필 생성/전환/이름변경/삭제/내보내기/가져오기/복제
//! - `my_filters`: 내 필터 관리 및 공유 게시
//! - `account`: 계정/권한 캐시 스토어
//! - `sync`: 저장소 변경 구독 → 재수화
//! - `event`: 스토어 이벤트

pub mod account;
mod accessors;
pub mod discovered;
pub mod event;
mod my_filters;
mod profiles;
pub mod store;
pub mod sync;

pub use account::AccountStore;
pub use event::StoreEvent;
pub use store::{SettingsStore, SettingsStoreBuilder};
pub use sync::{Rehydrate, StorageSync};
