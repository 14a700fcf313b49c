//! 영속 봉투.
//!
//! 저장소 키 하나에 `{"state": {...}, "version": N}` 형태로 저장된다.
//! 버전은 마이그레이션 체인의 시작점을 결정한다.

use lair_core::error::CoreError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// 버전이 붙은 영속 상태
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedEnvelope {
    /// 스토어 상태 (JSON 객체)
    pub state: Map<String, Value>,
    /// 스키마 버전 (없으면 0)
    pub version: u32,
}

impl PersistedEnvelope {
    pub fn new(state: Map<String, Value>, version: u32) -> Self {
        Self { state, version }
    }

    /// 직렬화 가능한 상태로부터 봉투 생성
    pub fn from_state<T: Serialize>(state: &T, version: u32) -> Result<Self, CoreError> {
        match serde_json::to_value(state)? {
            Value::Object(map) => Ok(Self::new(map, version)),
            other => Err(CoreError::Internal(format!(
                "영속 상태는 객체여야 함: {}",
                type_name(&other)
            ))),
        }
    }

    /// 저장된 문자열 파싱
    ///
    /// JSON 자체가 깨진 경우만 에러. 봉투 모양이 예상과 다르면
    /// 빈 상태/버전 0으로 복구한다.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let value: Value = serde_json::from_str(raw)?;
        let Value::Object(mut root) = value else {
            warn!("영속 봉투가 객체가 아님, 빈 상태로 복구");
            return Ok(Self::default());
        };

        let version = match root.get("version") {
            None | Some(Value::Null) => 0,
            Some(v) => v
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or_else(|| {
                    warn!("영속 봉투 버전 해석 불가: {v}, 0으로 간주");
                    0
                }),
        };

        let state = match root.remove("state") {
            Some(Value::Object(map)) => map,
            None | Some(Value::Null) => Map::new(),
            Some(other) => {
                warn!("영속 상태가 객체가 아님 ({}), 빈 상태로 복구", type_name(&other));
                Map::new()
            }
        };

        Ok(Self { state, version })
    }

    /// 저장용 JSON 문자열
    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
