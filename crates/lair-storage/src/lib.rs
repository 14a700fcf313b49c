//! # lair-storage
//!
//! 로컬 저장소 어댑터.
//! 키-값 저장소 포트 구현과 영속 데이터의 버전 관리를 담당한다.
//!
//! ## 모듈
//! - `memory`: 프로세스 내 공유 저장소 (여러 스토어 인스턴스 = 여러 탭)
//! - `file_storage`: 키당 JSON 파일 저장소 + 폴링 감시자 (프로세스 간)
//! - `envelope`: `{state, version}` 영속 봉투
//! - `migration`: 스키마 마이그레이션 체인

pub mod envelope;
pub mod file_storage;
pub mod memory;
pub mod migration;
