//! 필터 공유 포트.
//!
//! 구현: `lair-network` crate (reqwest)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::drawing::MyFilter;

/// 내 필터 번들을 원격에 게시하는 협력자
#[async_trait]
pub trait FilterPublisher: Send + Sync {
    /// 필터 번들 게시 후 원격 URL 반환
    ///
    /// 이미 URL이 있는 필터는 같은 위치에 다시 게시된다.
    async fn publish(&self, name: &str, filter: &MyFilter) -> Result<String, CoreError>;
}
