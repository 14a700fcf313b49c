//! 공통 HTTP 유틸리티.
//!
//! 클라이언트 생성, 엔드포인트 URL 조립, 응답 상태 코드 매핑.

use std::time::Duration;

use lair_core::error::CoreError;
use tracing::warn;
use url::Url;

/// 타임아웃이 설정된 HTTP 클라이언트 생성
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, CoreError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))
}

/// 기본 URL 정규화 (끝에 `/`를 붙여 상대 경로 결합이 하위 경로를 유지하도록)
pub fn parse_base_url(base_url: &str) -> Result<Url, CoreError> {
    let trimmed = base_url.trim_end_matches('/');
    Url::parse(&format!("{trimmed}/"))
        .map_err(|e| CoreError::Config(format!("잘못된 서버 URL: {base_url}: {e}")))
}

/// 기본 URL 아래 엔드포인트 조립
pub fn endpoint(base: &Url, path: &str) -> Result<Url, CoreError> {
    base.join(path.trim_start_matches('/'))
        .map_err(|e| CoreError::Internal(format!("엔드포인트 URL 조립 실패: {path}: {e}")))
}

/// 응답 상태 코드 확인 및 에러 매핑
///
/// - 400 → `InvalidArguments`
/// - 401/403 → `Auth`
/// - 404 → `NotFound`
/// - 5xx → `Network` (일시적 실패)
/// - 그 외 → `Internal`
pub async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, CoreError> {
    let status = resp.status();

    if status.is_success() {
        return Ok(resp);
    }

    let text = resp.text().await.unwrap_or_else(|e| {
        warn!("응답 본문 읽기 실패: {e}");
        String::new()
    });

    match status.as_u16() {
        400 => Err(CoreError::InvalidArguments(format!("잘못된 요청: {text}"))),
        401 | 403 => Err(CoreError::Auth(format!("권한 없음 ({status}): {text}"))),
        404 => Err(CoreError::NotFound {
            resource_type: "API".to_string(),
            id: text,
        }),
        500..=599 => Err(CoreError::Network(format!("서버 에러 ({status}): {text}"))),
        _ => Err(CoreError::Internal(format!("API 에러 ({status}): {text}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn base_url_keeps_sub_path() {
        let base = parse_base_url("https://example.com/lair").unwrap();
        let url = endpoint(&base, "/api/patreon").unwrap();
        assert_eq!(url.as_str(), "https://example.com/lair/api/patreon");

        let base = parse_base_url("https://example.com/").unwrap();
        let url = endpoint(&base, "api/patreon").unwrap();
        assert_eq!(url.as_str(), "https://example.com/api/patreon");
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        assert_matches!(parse_base_url("not a url"), Err(CoreError::Config(_)));
    }

    #[tokio::test]
    async fn status_codes_map_to_errors() {
        let mut server = mockito::Server::new_async().await;
        let client = build_client(Duration::from_secs(5)).unwrap();

        let cases: [(usize, fn(&CoreError) -> bool); 5] = [
            (400, |e| matches!(e, CoreError::InvalidArguments(_))),
            (403, |e| matches!(e, CoreError::Auth(_))),
            (404, |e| matches!(e, CoreError::NotFound { .. })),
            (503, |e| matches!(e, CoreError::Network(_))),
            (418, |e| matches!(e, CoreError::Internal(_))),
        ];

        for (status, is_expected) in cases {
            let path = format!("/status/{status}");
            let mock = server
                .mock("GET", path.as_str())
                .with_status(status)
                .with_body("nope")
                .create_async()
                .await;

            let resp = client
                .get(format!("{}{}", server.url(), path))
                .send()
                .await
                .unwrap();
            let err = check_response(resp).await.unwrap_err();
            assert!(is_expected(&err), "status {status}: {err:?}");
            mock.assert_async().await;
        }
    }
}
