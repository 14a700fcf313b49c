//! 키-값 저장소 포트.
//!
//! 구현: `lair-storage` crate (메모리, 파일)
//!
//! 같은 저장소를 공유하는 여러 스토어 인스턴스(탭/창/프로세스)가 서로의
//! 쓰기를 감지할 수 있도록 변경 알림 채널을 제공한다.

use std::fmt;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::CoreError;

/// 스토어 인스턴스 식별자
///
/// 쓰기 출처를 표시하여 자기 자신의 변경 알림을 걸러내는 데 사용한다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// 새 인스턴스 ID 발급
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 저장소 변경 알림
#[derive(Debug, Clone, PartialEq)]
pub struct StorageChange {
    /// 변경된 키
    pub key: String,
    /// 새 값 (삭제 시 None)
    pub new_value: Option<String>,
    /// 쓰기 출처 (다른 프로세스의 쓰기는 None)
    pub origin: Option<InstanceId>,
}

impl StorageChange {
    /// 해당 인스턴스가 반응해야 하는 변경인지
    ///
    /// 키가 같고 출처가 자기 자신이 아닐 때만 true.
    pub fn concerns(&self, key: &str, instance: InstanceId) -> bool {
        self.key == key && self.origin != Some(instance)
    }
}

/// 키-값 문자열 저장소
pub trait KeyValueStorage: Send + Sync {
    /// 값 조회
    fn get_item(&self, key: &str) -> Result<Option<String>, CoreError>;

    /// 값 저장 후 변경 알림 발행
    fn set_item(&self, key: &str, value: &str, origin: InstanceId) -> Result<(), CoreError>;

    /// 값 삭제 후 변경 알림 발행
    fn remove_item(&self, key: &str, origin: InstanceId) -> Result<(), CoreError>;

    /// 변경 알림 구독
    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}
