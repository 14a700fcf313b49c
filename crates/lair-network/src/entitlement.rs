//! 계정 권한 조회 클라이언트.
//!
//! `EntitlementClient` 포트 구현. 사용자 ID 쿠키와 함께
//! `GET /api/patreon`을 호출하고 플랫 응답을 `EntitlementGrant`로 변환한다.

use std::time::Duration;

use async_trait::async_trait;
use lair_core::error::CoreError;
use lair_core::models::account::Perks;
use lair_core::ports::entitlement::{EntitlementClient, EntitlementGrant};
use reqwest::header::COOKIE;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::http::{build_client, check_response, endpoint, parse_base_url};

/// 권한 조회 경로
const ENTITLEMENT_PATH: &str = "api/patreon";

/// 서버 응답 (권한 플래그가 루트에 평탄하게 온다)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntitlementResponse {
    #[serde(default)]
    decrypted_user_id: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    ad_removal: bool,
    #[serde(default)]
    preview_release_access: bool,
    #[serde(default)]
    comments: bool,
    #[serde(default)]
    premium_features: bool,
}

impl From<EntitlementResponse> for EntitlementGrant {
    fn from(resp: EntitlementResponse) -> Self {
        Self {
            decrypted_user_id: resp.decrypted_user_id,
            email: resp.email,
            perks: Perks {
                ad_removal: resp.ad_removal,
                preview_release_access: resp.preview_release_access,
                comments: resp.comments,
                premium_features: resp.premium_features,
            },
        }
    }
}

/// HTTP 권한 조회 클라이언트
pub struct HttpEntitlementClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpEntitlementClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CoreError> {
        let base = parse_base_url(base_url)?;
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: endpoint(&base, ENTITLEMENT_PATH)?,
        })
    }
}

#[async_trait]
impl EntitlementClient for HttpEntitlementClient {
    async fn fetch_entitlements(&self, user_id: &str) -> Result<EntitlementGrant, CoreError> {
        debug!("권한 조회 요청");

        let resp = self
            .client
            .get(self.endpoint.clone())
            .header(COOKIE, format!("userId={user_id}"))
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("권한 조회 요청 실패: {e}")))?;
        let resp = check_response(resp).await?;

        let body: EntitlementResponse = resp
            .json()
            .await
            .map_err(|e| CoreError::Internal(format!("권한 응답 파싱 실패: {e}")))?;

        debug!("권한 조회 성공");
        Ok(body.into())
    }
}
