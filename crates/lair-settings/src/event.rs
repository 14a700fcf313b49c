//! 스토어 이벤트.
//!
//! `subscribe()`로 받는 broadcast 알림. UI나 CLI가 재렌더링/로그 용도로 구독한다.

/// 스토어 상태 변경 알림
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// 활성 프로필의 설정이 변경됨
    SettingsChanged { profile_id: String },
    /// 활성 프로필이 바뀜 (라이브 뷰 교체)
    ProfileSwitched { profile_id: String },
    /// 프로필 목록이 변경됨 (생성/삭제/이름변경/가져오기)
    ProfilesChanged,
    /// 다른 인스턴스의 변경을 받아 상태를 교체함
    Rehydrated,
    /// 계정 레코드가 교체됨
    AccountChanged,
}
