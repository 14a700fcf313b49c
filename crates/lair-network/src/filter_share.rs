//! 공유 필터 게시 클라이언트.
//!
//! `FilterPublisher` 포트 구현. 새 필터는 컬렉션에 POST로 생성하고,
//! 이미 URL이 있는 필터는 그 URL에 PUT으로 덮어쓴다.

use std::time::Duration;

use async_trait::async_trait;
use lair_core::error::CoreError;
use lair_core::models::drawing::MyFilter;
use lair_core::ports::filter_share::FilterPublisher;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::http::{build_client, check_response, endpoint, parse_base_url};

/// 공유 필터 컬렉션 경로
const SHARED_FILTERS_PATH: &str = "api/shared-filters";

#[derive(Serialize)]
struct PublishRequest<'a> {
    name: &'a str,
    filter: &'a MyFilter,
}

#[derive(Deserialize)]
struct PublishResponse {
    url: Option<String>,
}

/// HTTP 필터 게시자
pub struct HttpFilterPublisher {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpFilterPublisher {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CoreError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: parse_base_url(base_url)?,
        })
    }
}

#[async_trait]
impl FilterPublisher for HttpFilterPublisher {
    async fn publish(&self, name: &str, filter: &MyFilter) -> Result<String, CoreError> {
        let body = PublishRequest { name, filter };

        let request = match filter.url.as_deref() {
            Some(existing) => {
                let target = Url::parse(existing).map_err(|e| {
                    CoreError::InvalidArguments(format!("잘못된 공유 URL: {existing}: {e}"))
                })?;
                debug!("공유 필터 재게시: {name} → {target}");
                self.client.put(target)
            }
            None => {
                let target = endpoint(&self.base_url, SHARED_FILTERS_PATH)?;
                debug!("공유 필터 게시: {name} → {target}");
                self.client.post(target)
            }
        };

        let resp = request
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("필터 게시 요청 실패: {e}")))?;
        let resp = check_response(resp).await?;

        let parsed: PublishResponse = resp
            .json()
            .await
            .map_err(|e| CoreError::Internal(format!("필터 게시 응답 파싱 실패: {e}")))?;

        parsed
            .url
            .or_else(|| filter.url.clone())
            .ok_or_else(|| CoreError::Internal("필터 게시 응답에 url 없음".to_string()))
    }
}
