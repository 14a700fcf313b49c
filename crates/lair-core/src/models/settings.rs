//! 프로필 설정 모델.
//!
//! 프로필 하나가 묶는 독립 설정 필드 전체. 모든 필드는 기본값을 가지므로
//! 영속 데이터에 필드가 빠져 있어도 항상 완전한 객체가 만들어진다.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

use super::drawing::{MyFilter, TempDrawing, TempPrivateNode};

/// 색각 보정 모드
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorBlindMode {
    #[default]
    None,
    Protanopia,
    Deuteranopia,
    Tritanopia,
}

/// 지도 컨테이너 변형 상태
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapTransform {
    pub border_radius: String,
    pub transform: String,
    pub width: String,
    pub height: String,
}

/// 프로필 설정: 플랫 구조, 필드별 독립 변경
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileSettings {
    // ── 단축키 ──
    /// 액션 이름 → 키 조합
    pub hotkeys: BTreeMap<String, String>,
    pub group_name: String,

    // ── 화면/상호작용 ──
    pub live_mode: bool,
    /// 미설정(None) / 켜짐 / 꺼짐
    pub overlay_mode: Option<bool>,
    pub overlay_fullscreen: bool,
    pub locked_window: bool,
    /// 0.0 ~ 1.0
    pub window_opacity: f64,

    // ── 접근성 ──
    pub color_blind_mode: ColorBlindMode,
    /// 0.0 ~ 1.0
    pub color_blind_severity: f64,

    // ── 지도 변형 ──
    /// 요소 id → CSS transform 문자열
    pub transforms: BTreeMap<String, String>,
    pub map_transform: Option<MapTransform>,
    pub map_filter: String,

    // ── 발견 추적 ──
    pub discovered_nodes: Vec<String>,
    pub hide_discovered_nodes: bool,

    // ── 라이브 추적 ──
    /// 밀리초 (소수 허용)
    pub actors_polling_rate: f64,
    pub show_trace_line: bool,
    pub trace_line_length: f64,
    pub trace_line_rate: f64,
    pub trace_line_color: String,
    pub display_discord_activity_status: bool,

    // ── 프리셋 ──
    /// 프리셋 이름 → 필터 id 목록 (순서 유지)
    pub presets: BTreeMap<String, Vec<String>>,

    // ── 작성 중 임시 상태 ──
    pub temp_private_node: Option<TempPrivateNode>,
    pub temp_private_drawing: Option<TempDrawing>,

    // ── 드로잉/표시 ──
    pub drawing_color: String,
    pub drawing_size: f64,
    pub text_color: String,
    pub text_size: f64,
    pub base_icon_size: f64,
    pub player_icon_size: f64,
    pub icon_size_by_group: BTreeMap<String, f64>,
    pub icon_size_by_filter: BTreeMap<String, f64>,
    pub fit_bounds_on_change: bool,
    pub my_filters: Vec<MyFilter>,
    pub show_grid: bool,
    pub show_filters: bool,
    pub expanded_filters: bool,

    // ── 피어 세션 ──
    pub peer_code: String,
    pub last_me_sender_id: String,
    pub player_name: String,
    pub auto_join_peer: bool,
    pub auto_live_mode_with_me: bool,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            hotkeys: BTreeMap::new(),
            group_name: String::new(),
            live_mode: true,
            overlay_mode: None,
            overlay_fullscreen: false,
            locked_window: false,
            window_opacity: 1.0,
            color_blind_mode: ColorBlindMode::None,
            color_blind_severity: 1.0,
            transforms: BTreeMap::new(),
            map_transform: None,
            map_filter: "none".to_string(),
            discovered_nodes: Vec::new(),
            hide_discovered_nodes: false,
            actors_polling_rate: 100.0,
            show_trace_line: true,
            trace_line_length: 100.0,
            trace_line_rate: 5.0,
            trace_line_color: "#1ccdd1B3".to_string(),
            display_discord_activity_status: true,
            presets: BTreeMap::new(),
            temp_private_node: None,
            temp_private_drawing: None,
            drawing_color: "#FFFFFFAA".to_string(),
            drawing_size: 4.0,
            text_color: "#1ccdd1".to_string(),
            text_size: 20.0,
            base_icon_size: 1.0,
            player_icon_size: 1.0,
            icon_size_by_group: BTreeMap::new(),
            icon_size_by_filter: BTreeMap::new(),
            fit_bounds_on_change: false,
            my_filters: Vec::new(),
            show_grid: false,
            show_filters: true,
            expanded_filters: false,
            peer_code: String::new(),
            last_me_sender_id: String::new(),
            player_name: String::new(),
            auto_join_peer: false,
            auto_live_mode_with_me: true,
        }
    }
}

impl ProfileSettings {
    /// 직렬화된 필드 이름 목록 (camelCase)
    pub fn field_names() -> Vec<String> {
        default_object().into_iter().map(|(key, _)| key).collect()
    }

    /// 관용적 역직렬화
    ///
    /// 필드 단위로 검증하여 손상된 필드만 기본값으로 되돌린다.
    /// `myFilters`는 항목 단위로 복구하여 손상된 필터/노드만 버린다.
    /// 알 수 없는 필드(폐기된 필드 포함)는 무시한다.
    pub fn from_value_lenient(value: &Value) -> Self {
        let Some(stored) = value.as_object() else {
            if !value.is_null() {
                warn!("설정 객체가 아님, 기본값 사용");
            }
            return Self::default();
        };

        // 전체가 유효하면 바로 사용
        if let Ok(settings) = serde_json::from_value::<Self>(value.clone()) {
            return settings;
        }

        let defaults = default_object();
        let mut merged = defaults.clone();
        for (key, field) in stored {
            if key == MY_FILTERS_KEY || !defaults.contains_key(key) {
                continue;
            }
            let mut candidate = defaults.clone();
            candidate.insert(key.clone(), field.clone());
            if serde_json::from_value::<Self>(Value::Object(candidate)).is_ok() {
                merged.insert(key.clone(), field.clone());
            } else {
                warn!("손상된 설정 필드 기본값으로 복구: {key}");
            }
        }

        let mut settings: Self = serde_json::from_value(Value::Object(merged)).unwrap_or_default();
        if let Some(filters) = stored.get(MY_FILTERS_KEY) {
            settings.my_filters = decode_my_filters(filters);
        }
        settings
    }
}

const MY_FILTERS_KEY: &str = "myFilters";

/// 내 필터 목록을 항목 단위로 복구
fn decode_my_filters(value: &Value) -> Vec<MyFilter> {
    let Some(items) = value.as_array() else {
        if !value.is_null() {
            warn!("손상된 설정 필드 기본값으로 복구: {MY_FILTERS_KEY}");
        }
        return Vec::new();
    };
    items.iter().filter_map(MyFilter::from_value_lenient).collect()
}

fn default_object() -> Map<String, Value> {
    match serde_json::to_value(ProfileSettings::default()) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// 0.0 ~ 1.0 범위로 제한 (NaN은 None)
pub fn clamp_unit(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value.clamp(0.0, 1.0))
    }
}
