//! 사용자 노드/드로잉 모델.
//!
//! 사용자가 지도 위에 직접 배치한 노드와 자유 드로잉, 그리고 이를 묶은
//! "내 필터"(MyFilter) 번들을 정의한다.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// 지도 좌표 `[x, y]`
pub type Point = [f64; 2];

/// 사용자 노드 아이콘
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeIcon {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

/// 사용자가 배치한 지도 노드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<NodeIcon>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub radius: f64,
    /// 지도 좌표
    pub p: Point,
    pub map_name: String,
}

/// 작성 중인 노드 (모든 필드 선택) + 대상 필터 이름
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TempPrivateNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<NodeIcon>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl TempPrivateNode {
    /// 값이 있는 필드만 덮어쓴다
    pub fn merge(&mut self, patch: TempPrivateNode) {
        merge_field(&mut self.id, patch.id);
        merge_field(&mut self.name, patch.name);
        merge_field(&mut self.description, patch.description);
        merge_field(&mut self.icon, patch.icon);
        merge_field(&mut self.color, patch.color);
        merge_field(&mut self.radius, patch.radius);
        merge_field(&mut self.p, patch.p);
        merge_field(&mut self.map_name, patch.map_name);
        merge_field(&mut self.filter, patch.filter);
    }
}

/// 폴리라인/사각형/다각형 공통 도형
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathShape {
    pub positions: Vec<Point>,
    pub size: f64,
    pub color: String,
    pub map_name: String,
}

/// 원
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleShape {
    pub center: Point,
    pub radius: f64,
    pub size: f64,
    pub color: String,
    pub map_name: String,
}

/// 텍스트 주석
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAnnotation {
    pub position: Point,
    pub text: String,
    pub size: f64,
    pub color: String,
    pub map_name: String,
}

/// 자유 드로잉
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drawing {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub polylines: Vec<PathShape>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rectangles: Vec<PathShape>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub polygons: Vec<PathShape>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub circles: Vec<CircleShape>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub texts: Vec<TextAnnotation>,
}

/// 작성 중인 드로잉 (모든 필드 선택) + 이름
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TempDrawing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polylines: Option<Vec<PathShape>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rectangles: Option<Vec<PathShape>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polygons: Option<Vec<PathShape>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circles: Option<Vec<CircleShape>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texts: Option<Vec<TextAnnotation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl TempDrawing {
    /// 값이 있는 필드만 덮어쓴다
    pub fn merge(&mut self, patch: TempDrawing) {
        merge_field(&mut self.id, patch.id);
        merge_field(&mut self.polylines, patch.polylines);
        merge_field(&mut self.rectangles, patch.rectangles);
        merge_field(&mut self.polygons, patch.polygons);
        merge_field(&mut self.circles, patch.circles);
        merge_field(&mut self.texts, patch.texts);
        merge_field(&mut self.name, patch.name);
    }
}

/// 내 필터: 이름 붙은 노드/드로잉 번들, 원격 URL로 공유 가능
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyFilter {
    pub name: String,
    #[serde(default)]
    pub is_shared: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<PrivateNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawing: Option<Drawing>,
}

impl MyFilter {
    /// 해당 노드를 포함하는지 여부
    pub fn contains_node(&self, node_id: &str) -> bool {
        self.nodes
            .as_ref()
            .is_some_and(|nodes| nodes.iter().any(|node| node.id == node_id))
    }

    /// 관용적 역직렬화
    ///
    /// 이름이 없으면 필터 전체를 버린다. 손상된 노드는 하나씩 버리고
    /// 손상된 드로잉이나 URL은 비운다.
    pub fn from_value_lenient(value: &Value) -> Option<Self> {
        if let Ok(filter) = serde_json::from_value::<Self>(value.clone()) {
            return Some(filter);
        }
        let Some(name) = value.get("name").and_then(Value::as_str) else {
            warn!("이름 없는 내 필터 제외");
            return None;
        };

        let nodes = value.get("nodes").and_then(|nodes| match nodes.as_array() {
            Some(items) => Some(
                items
                    .iter()
                    .filter_map(|item| match serde_json::from_value::<PrivateNode>(item.clone()) {
                        Ok(node) => Some(node),
                        Err(e) => {
                            warn!("손상된 노드 제외: 필터 {name}: {e}");
                            None
                        }
                    })
                    .collect(),
            ),
            None => {
                if !nodes.is_null() {
                    warn!("손상된 노드 목록 제외: 필터 {name}");
                }
                None
            }
        });

        Some(Self {
            name: name.to_string(),
            is_shared: value.get("isShared").and_then(Value::as_bool).unwrap_or(false),
            url: value.get("url").and_then(Value::as_str).map(str::to_string),
            nodes,
            drawing: lenient_field(value, "drawing", name),
        })
    }

    /// 부분 패치 적용
    pub fn apply(&mut self, patch: MyFilterPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(is_shared) = patch.is_shared {
            self.is_shared = is_shared;
        }
        merge_field(&mut self.url, patch.url);
        merge_field(&mut self.nodes, patch.nodes);
        merge_field(&mut self.drawing, patch.drawing);
    }
}

/// 내 필터 부분 업데이트
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MyFilterPatch {
    pub name: Option<String>,
    pub is_shared: Option<bool>,
    pub url: Option<String>,
    pub nodes: Option<Vec<PrivateNode>>,
    pub drawing: Option<Drawing>,
}

fn lenient_field<T: serde::de::DeserializeOwned>(value: &Value, key: &str, filter: &str) -> Option<T> {
    let field = value.get(key).filter(|field| !field.is_null())?;
    match serde_json::from_value(field.clone()) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!("손상된 필드 제외: 필터 {filter}.{key}: {e}");
            None
        }
    }
}

fn merge_field<T>(target: &mut Option<T>, patch: Option<T>) {
    if patch.is_some() {
        *target = patch;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> PrivateNode {
        PrivateNode {
            id: id.to_string(),
            name: Some("Stash".to_string()),
            description: None,
            icon: None,
            color: Some("#ff0000".to_string()),
            radius: 6.0,
            p: [120.5, -40.0],
            map_name: "default".to_string(),
        }
    }

    #[test]
    fn temp_node_merge_keeps_existing_fields() {
        let mut temp = TempPrivateNode {
            name: Some("Cave".to_string()),
            radius: Some(4.0),
            ..Default::default()
        };
        temp.merge(TempPrivateNode {
            p: Some([1.0, 2.0]),
            filter: Some("my_pins".to_string()),
            ..Default::default()
        });

        assert_eq!(temp.name.as_deref(), Some("Cave"));
        assert_eq!(temp.radius, Some(4.0));
        assert_eq!(temp.p, Some([1.0, 2.0]));
        assert_eq!(temp.filter.as_deref(), Some("my_pins"));
    }

    #[test]
    fn my_filter_contains_node() {
        let filter = MyFilter {
            name: "pins".to_string(),
            nodes: Some(vec![node("a"), node("b")]),
            ..Default::default()
        };
        assert!(filter.contains_node("b"));
        assert!(!filter.contains_node("c"));
        assert!(!MyFilter::default().contains_node("a"));
    }

    #[test]
    fn drawing_omits_empty_shape_lists() {
        let drawing = Drawing {
            id: "d1".to_string(),
            texts: vec![TextAnnotation {
                position: [0.0, 0.0],
                text: "boss".to_string(),
                size: 20.0,
                color: "#1ccdd1".to_string(),
                map_name: "default".to_string(),
            }],
            ..Default::default()
        };
        let json = serde_json::to_value(&drawing).unwrap();
        assert!(json.get("polylines").is_none());
        assert_eq!(json["texts"][0]["mapName"], "default");

        let back: Drawing = serde_json::from_value(json).unwrap();
        assert_eq!(back, drawing);
    }

    #[test]
    fn filter_patch_overrides_only_given_fields() {
        let mut filter = MyFilter {
            name: "pins".to_string(),
            is_shared: true,
            url: Some("https://blob.example/pins.json".to_string()),
            nodes: Some(vec![node("a")]),
            drawing: None,
        };
        filter.apply(MyFilterPatch {
            nodes: Some(vec![node("a"), node("b")]),
            ..Default::default()
        });
        assert_eq!(filter.nodes.as_ref().map(Vec::len), Some(2));
        assert_eq!(filter.url.as_deref(), Some("https://blob.example/pins.json"));
        assert!(filter.is_shared);
    }

    #[test]
    fn lenient_filter_keeps_valid_nodes() {
        let value = serde_json::json!({
            "name": "pins",
            "isShared": true,
            "url": "https://blob.example/pins.json",
            "nodes": [
                serde_json::to_value(node("a")).unwrap(),
                { "id": "broken", "p": [0, 0] }
            ],
            "drawing": { "polylines": 3 }
        });

        let filter = MyFilter::from_value_lenient(&value).unwrap();
        assert_eq!(filter.name, "pins");
        assert!(filter.is_shared);
        assert_eq!(filter.url.as_deref(), Some("https://blob.example/pins.json"));
        assert_eq!(filter.nodes, Some(vec![node("a")]));
        assert_eq!(filter.drawing, None);
    }

    #[test]
    fn lenient_filter_without_name_is_dropped() {
        assert_eq!(MyFilter::from_value_lenient(&serde_json::json!({ "nodes": [] })), None);
        assert_eq!(MyFilter::from_value_lenient(&serde_json::json!("pins")), None);
    }
}
