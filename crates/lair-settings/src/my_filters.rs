//! 내 필터 관리.
//!
//! 공유 필터는 원격 게시 후 받은 URL로 식별된다. 게시는 비동기이며
//! 변경 퍼널의 잠금 밖에서 수행된다. 로컬 변경은 먼저 적용되고,
//! 재게시 실패는 기록만 한다 (롤백/재시도 없음).

use lair_core::error::CoreError;
use lair_core::models::drawing::{MyFilter, MyFilterPatch};
use tracing::{debug, info, warn};

use crate::store::SettingsStore;

impl SettingsStore {
    /// 내 필터 목록
    pub fn my_filters(&self) -> Vec<MyFilter> {
        self.read_settings(|s| s.my_filters.clone())
    }

    /// 내 필터 목록 교체
    pub fn set_my_filters(&self, filters: Vec<MyFilter>) {
        self.update_settings(move |s| s.my_filters = filters);
    }

    /// 내 필터 추가
    ///
    /// URL 없는 공유 필터는 먼저 게시하여 URL을 받는다. 게시에 실패하면 추가하지
    /// 않고 에러를 반환한다. 같은 URL의 공유 필터가 이미 있으면 추가하지 않는다.
    /// 실제로 추가되었는지 반환한다.
    pub async fn add_my_filter(&self, mut filter: MyFilter) -> Result<bool, CoreError> {
        if filter.is_shared && filter.url.is_none() {
            let publisher = self.inner.publisher.clone().ok_or_else(|| {
                CoreError::Config("필터 게시자가 설정되지 않아 공유 필터를 추가할 수 없음".to_string())
            })?;
            match publisher.publish(&filter.name, &filter).await {
                Ok(url) => {
                    debug!("공유 필터 게시 완료: {} → {url}", filter.name);
                    filter.url = Some(url);
                }
                Err(e) => {
                    warn!("공유 필터 게시 실패: {}: {e}", filter.name);
                    return Err(e);
                }
            }
        }

        let name = filter.name.clone();
        let added = self.try_update_settings(move |s| {
            let duplicate = filter.is_shared
                && filter.url.is_some()
                && s
                    .my_filters
                    .iter()
                    .any(|existing| existing.is_shared && existing.url == filter.url);
            if duplicate {
                return false;
            }
            s.my_filters.push(filter);
            true
        });

        if added {
            info!("내 필터 추가: {name}");
        } else {
            debug!("같은 URL의 공유 필터가 이미 있음: {name}");
        }
        Ok(added)
    }

    /// 내 필터 부분 수정
    ///
    /// URL이 있는 필터는 수정 후 재게시한다.
    pub async fn set_my_filter(&self, name: &str, patch: MyFilterPatch) -> Result<(), CoreError> {
        let mut updated = None;
        self.try_update_settings(|s| match s.my_filters.iter_mut().find(|f| f.name == name) {
            Some(filter) => {
                filter.apply(patch);
                updated = Some(filter.clone());
                true
            }
            None => false,
        });

        let updated = updated.ok_or_else(|| CoreError::NotFound {
            resource_type: "MyFilter".to_string(),
            id: name.to_string(),
        })?;
        if updated.url.is_some() {
            self.republish(&updated).await;
        }
        Ok(())
    }

    /// 이름으로 내 필터 제거. 제거되었는지 반환한다.
    pub fn remove_my_filter(&self, name: &str) -> bool {
        self.try_update_settings(|s| {
            let before = s.my_filters.len();
            s.my_filters.retain(|f| f.name != name);
            s.my_filters.len() != before
        })
    }

    /// 노드를 포함한 필터에서 노드 제거
    ///
    /// 해당 필터에 URL이 있으면 재게시한다. 노드를 가진 필터가 없으면 아무것도
    /// 하지 않는다. 제거되었는지 반환한다.
    pub async fn remove_my_node(&self, node_id: &str) -> bool {
        let mut updated = None;
        self.try_update_settings(|s| {
            let Some(filter) = s.my_filters.iter_mut().find(|f| f.contains_node(node_id)) else {
                return false;
            };
            if let Some(nodes) = filter.nodes.as_mut() {
                nodes.retain(|node| node.id != node_id);
            }
            updated = Some(filter.clone());
            true
        });

        let Some(updated) = updated else {
            return false;
        };
        debug!("내 노드 제거: {node_id} ({})", updated.name);
        if updated.url.is_some() {
            self.republish(&updated).await;
        }
        true
    }

    /// 공유 필터 재게시. 실패는 기록만 한다.
    async fn republish(&self, filter: &MyFilter) {
        let Some(publisher) = self.inner.publisher.clone() else {
            warn!("필터 게시자 없음, 재게시 생략: {}", filter.name);
            return;
        };
        match publisher.publish(&filter.name, filter).await {
            Ok(_) => debug!("공유 필터 재게시 완료: {}", filter.name),
            Err(e) => warn!("공유 필터 재게시 실패 (로컬 변경 유지): {}: {e}", filter.name),
        }
    }
}
