//! 도메인 모델.
//!
//! 영속 JSON과 호환되도록 모든 필드는 camelCase로 직렬화된다.

pub mod account;
pub mod drawing;
pub mod profile;
pub mod settings;
