//! 필드별 getter/setter/toggle.
//!
//! 단순 대입 필드는 매크로로 생성하고, 범위 제한·부분 병합·맵 단일 항목
//! 갱신이 필요한 필드는 직접 구현한다. 모든 setter는 변경 퍼널을 거친다.

use std::collections::BTreeMap;

use lair_core::models::drawing::{TempDrawing, TempPrivateNode};
use lair_core::models::settings::{clamp_unit, ColorBlindMode, MapTransform};

use crate::store::SettingsStore;

/// getter + 대입 setter 생성
macro_rules! value_accessors {
    ($($field:ident: $ty:ty => $setter:ident;)*) => {
        impl SettingsStore {
            $(
                #[doc = concat!("`", stringify!($field), "` 조회")]
                pub fn $field(&self) -> $ty {
                    self.read_settings(|s| s.$field.clone())
                }

                #[doc = concat!("`", stringify!($field), "` 설정")]
                pub fn $setter(&self, value: $ty) {
                    self.update_settings(move |s| s.$field = value);
                }
            )*
        }
    };
}

/// getter만 생성 (setter는 별도 구현)
macro_rules! getters {
    ($($field:ident: $ty:ty;)*) => {
        impl SettingsStore {
            $(
                #[doc = concat!("`", stringify!($field), "` 조회")]
                pub fn $field(&self) -> $ty {
                    self.read_settings(|s| s.$field.clone())
                }
            )*
        }
    };
}

/// bool 필드 반전
macro_rules! toggles {
    ($($field:ident => $toggle:ident;)*) => {
        impl SettingsStore {
            $(
                #[doc = concat!("`", stringify!($field), "` 반전")]
                pub fn $toggle(&self) {
                    self.update_settings(|s| s.$field = !s.$field);
                }
            )*
        }
    };
}

value_accessors! {
    hotkeys: BTreeMap<String, String> => set_hotkeys;
    group_name: String => set_group_name;
    live_mode: bool => set_live_mode;
    overlay_mode: Option<bool> => set_overlay_mode;
    overlay_fullscreen: bool => set_overlay_fullscreen;
    locked_window: bool => set_locked_window;
    color_blind_mode: ColorBlindMode => set_color_blind_mode;
    transforms: BTreeMap<String, String> => set_transforms;
    map_transform: Option<MapTransform> => set_map_transform;
    map_filter: String => set_map_filter;
    hide_discovered_nodes: bool => set_hide_discovered_nodes;
    actors_polling_rate: f64 => set_actors_polling_rate;
    show_trace_line: bool => set_show_trace_line;
    trace_line_length: f64 => set_trace_line_length;
    trace_line_rate: f64 => set_trace_line_rate;
    trace_line_color: String => set_trace_line_color;
    display_discord_activity_status: bool => set_display_discord_activity_status;
    presets: BTreeMap<String, Vec<String>> => set_presets;
    drawing_color: String => set_drawing_color;
    drawing_size: f64 => set_drawing_size;
    text_color: String => set_text_color;
    text_size: f64 => set_text_size;
    base_icon_size: f64 => set_base_icon_size;
    player_icon_size: f64 => set_player_icon_size;
    fit_bounds_on_change: bool => set_fit_bounds_on_change;
    show_grid: bool => set_show_grid;
    show_filters: bool => set_show_filters;
    expanded_filters: bool => set_expanded_filters;
    peer_code: String => set_peer_code;
    last_me_sender_id: String => set_last_me_sender_id;
    player_name: String => set_player_name;
    auto_join_peer: bool => set_auto_join_peer;
    auto_live_mode_with_me: bool => set_auto_live_mode_with_me;
}

getters! {
    window_opacity: f64;
    color_blind_severity: f64;
    discovered_nodes: Vec<String>;
    temp_private_node: Option<TempPrivateNode>;
    temp_private_drawing: Option<TempDrawing>;
    icon_size_by_group: BTreeMap<String, f64>;
    icon_size_by_filter: BTreeMap<String, f64>;
}

toggles! {
    live_mode => toggle_live_mode;
    overlay_fullscreen => toggle_overlay_fullscreen;
    locked_window => toggle_locked_window;
    hide_discovered_nodes => toggle_hide_discovered_nodes;
    show_trace_line => toggle_show_trace_line;
    display_discord_activity_status => toggle_display_discord_activity_status;
    fit_bounds_on_change => toggle_fit_bounds_on_change;
    show_grid => toggle_show_grid;
    show_filters => toggle_show_filters;
    expanded_filters => toggle_expanded_filters;
}

impl SettingsStore {
    /// 단축키 하나 지정
    pub fn set_hotkey(&self, action: &str, combo: &str) {
        let (action, combo) = (action.to_string(), combo.to_string());
        self.update_settings(move |s| {
            s.hotkeys.insert(action, combo);
        });
    }

    /// 창 불투명도 (0~1로 제한, NaN 무시)
    pub fn set_window_opacity(&self, opacity: f64) {
        self.try_update_settings(|s| match clamp_unit(opacity) {
            Some(value) => {
                s.window_opacity = value;
                true
            }
            None => false,
        });
    }

    /// 색각 보정 강도 (0~1로 제한, NaN 무시)
    pub fn set_color_blind_severity(&self, severity: f64) {
        self.try_update_settings(|s| match clamp_unit(severity) {
            Some(value) => {
                s.color_blind_severity = value;
                true
            }
            None => false,
        });
    }

    /// 요소 하나의 CSS transform 지정
    pub fn set_transform(&self, element_id: &str, transform: &str) {
        let (element_id, transform) = (element_id.to_string(), transform.to_string());
        self.update_settings(move |s| {
            s.transforms.insert(element_id, transform);
        });
    }

    /// 지도 변형/아이콘 크기 초기화
    pub fn reset_transform(&self) {
        self.update_settings(|s| {
            s.transforms.clear();
            s.map_transform = None;
            s.base_icon_size = 1.0;
            s.player_icon_size = 1.0;
            s.icon_size_by_group.clear();
            s.icon_size_by_filter.clear();
        });
    }

    /// 프리셋 추가 (같은 이름은 덮어씀)
    pub fn add_preset(&self, name: &str, filters: Vec<String>) {
        let name = name.to_string();
        self.update_settings(move |s| {
            s.presets.insert(name, filters);
        });
    }

    pub fn remove_preset(&self, name: &str) {
        self.update_settings(|s| {
            s.presets.remove(name);
        });
    }

    /// 임시 노드 부분 병합 (None이면 비움)
    pub fn set_temp_private_node(&self, patch: Option<TempPrivateNode>) {
        self.update_settings(move |s| match patch {
            Some(patch) => s.temp_private_node.get_or_insert_with(Default::default).merge(patch),
            None => s.temp_private_node = None,
        });
    }

    /// 임시 드로잉 부분 병합 (None이면 비움)
    pub fn set_temp_private_drawing(&self, patch: Option<TempDrawing>) {
        self.update_settings(move |s| match patch {
            Some(patch) => s
                .temp_private_drawing
                .get_or_insert_with(Default::default)
                .merge(patch),
            None => s.temp_private_drawing = None,
        });
    }

    pub fn set_icon_size_by_group(&self, group: &str, size: f64) {
        let group = group.to_string();
        self.update_settings(move |s| {
            s.icon_size_by_group.insert(group, size);
        });
    }

    pub fn set_icon_size_by_filter(&self, filter_id: &str, size: f64) {
        let filter_id = filter_id.to_string();
        self.update_settings(move |s| {
            s.icon_size_by_filter.insert(filter_id, size);
        });
    }
}
