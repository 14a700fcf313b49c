//! 발견 노드 추적.
//!
//! 노드 ID는 `base@variant` 형태의 변형 접미사를 가질 수 있다.
//! - 접미사 없는 ID는 자신의 모든 변형과 일치한다.
//! - 접미사 있는 ID는 자신의 기본 ID와 일치한다.
//!
//! 해제 시에는 질의와 일치하는 모든 항목을 함께 제거한다.

use crate::store::SettingsStore;

/// 변형 접미사를 뗀 기본 ID
pub fn node_base(id: &str) -> &str {
    id.split_once('@').map_or(id, |(base, _)| base)
}

/// 저장된 항목이 질의 ID와 같은 노드를 가리키는지
pub fn matches_node(entry: &str, query: &str) -> bool {
    if entry == query {
        return true;
    }
    if query.contains('@') {
        entry == node_base(query)
    } else {
        node_base(entry) == query
    }
}

/// 목록에 질의 노드가 발견 처리되어 있는지
pub fn is_node_discovered(nodes: &[String], query: &str) -> bool {
    nodes.iter().any(|entry| matches_node(entry, query))
}

/// 순서를 유지하며 중복 제거
pub fn dedupe_nodes(nodes: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if !out.contains(&node) {
            out.push(node);
        }
    }
    out
}

fn mark(nodes: &mut Vec<String>, node_id: &str) -> bool {
    if nodes.iter().any(|entry| entry == node_id) {
        return false;
    }
    nodes.push(node_id.to_string());
    true
}

fn unmark(nodes: &mut Vec<String>, node_id: &str) -> bool {
    let before = nodes.len();
    nodes.retain(|entry| !matches_node(entry, node_id));
    nodes.len() != before
}

impl SettingsStore {
    /// 노드 발견 여부 (`@` 변형 규칙 적용)
    pub fn is_discovered_node(&self, node_id: &str) -> bool {
        self.read_settings(|s| is_node_discovered(&s.discovered_nodes, node_id))
    }

    /// 발견 상태 반전
    pub fn toggle_discovered_node(&self, node_id: &str) {
        self.try_update_settings(|s| {
            if is_node_discovered(&s.discovered_nodes, node_id) {
                unmark(&mut s.discovered_nodes, node_id)
            } else {
                mark(&mut s.discovered_nodes, node_id)
            }
        });
    }

    /// 발견 상태 지정
    pub fn set_discover_node(&self, node_id: &str, discovered: bool) {
        self.try_update_settings(|s| {
            if discovered {
                mark(&mut s.discovered_nodes, node_id)
            } else {
                unmark(&mut s.discovered_nodes, node_id)
            }
        });
    }

    /// 발견 목록 교체 (중복 제거)
    pub fn set_discovered_nodes(&self, nodes: Vec<String>) {
        let nodes = dedupe_nodes(nodes);
        self.update_settings(move |s| s.discovered_nodes = nodes);
    }
}
