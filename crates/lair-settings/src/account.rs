//! 계정/권한 캐시 스토어.
//!
//! 설정 스토어와 같은 저장소를 쓰는 별도 키(`account-storage`)의 스토어.
//! 계정 레코드는 갱신마다 통째로 교체된다.

use std::sync::Arc;

use lair_core::error::CoreError;
use lair_core::models::account::{Account, Perks};
use lair_core::ports::entitlement::EntitlementClient;
use lair_core::ports::storage::{InstanceId, KeyValueStorage};
use lair_storage::envelope::PersistedEnvelope;
use lair_storage::migration::{migrate_account, ACCOUNT_SCHEMA_VERSION};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::event::StoreEvent;

/// 기본 계정 저장 키
pub const DEFAULT_ACCOUNT_KEY: &str = "account-storage";

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// 계정 스토어
#[derive(Clone)]
pub struct AccountStore {
    inner: Arc<AccountInner>,
}

struct AccountInner {
    account: Mutex<Account>,
    storage: Arc<dyn KeyValueStorage>,
    key: String,
    instance_id: InstanceId,
    events: broadcast::Sender<StoreEvent>,
}

impl AccountStore {
    /// 기본 키로 열기
    pub fn open(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::open_with_key(storage, DEFAULT_ACCOUNT_KEY)
    }

    /// 지정 키로 열기. 손상된 데이터는 로그아웃 상태로 복구한다.
    pub fn open_with_key(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        let key = key.into();
        let (account, write_back) = match storage.get_item(&key) {
            Ok(Some(raw)) => match PersistedEnvelope::parse(&raw) {
                Ok(envelope) => {
                    let write_back = envelope.version != ACCOUNT_SCHEMA_VERSION;
                    let migrated = migrate_account(envelope.state, envelope.version);
                    (decode_account(migrated), write_back)
                }
                Err(e) => {
                    warn!("손상된 계정 데이터, 로그아웃 상태 사용: {e}");
                    (Account::default(), false)
                }
            },
            Ok(None) => (Account::default(), false),
            Err(e) => {
                warn!("계정 읽기 실패: {e}");
                (Account::default(), false)
            }
        };

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let store = Self {
            inner: Arc::new(AccountInner {
                account: Mutex::new(account),
                storage,
                key,
                instance_id: InstanceId::new(),
                events,
            }),
        };
        if write_back {
            let account = store.account();
            store.persist(&account);
        }
        store
    }

    pub fn storage_key(&self) -> &str {
        &self.inner.key
    }

    pub fn instance_id(&self) -> InstanceId {
        self.inner.instance_id
    }

    pub fn storage(&self) -> Arc<dyn KeyValueStorage> {
        self.inner.storage.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.events.subscribe()
    }

    /// 현재 계정 레코드
    pub fn account(&self) -> Account {
        self.inner.account.lock().clone()
    }

    pub fn perks(&self) -> Perks {
        self.inner.account.lock().perks
    }

    /// 활성 권한이 하나라도 있는지
    pub fn has_any_perk(&self) -> bool {
        self.perks().any()
    }

    /// 계정 레코드 교체
    pub fn set_account(&self, account: Account) {
        {
            let mut current = self.inner.account.lock();
            if *current == account {
                return;
            }
            *current = account.clone();
            self.persist(&account);
        }
        let _ = self.inner.events.send(StoreEvent::AccountChanged);
    }

    /// 로그아웃 (모든 필드 초기화)
    pub fn sign_out(&self) {
        info!("계정 로그아웃");
        self.set_account(Account::default());
    }

    /// 권한 갱신
    ///
    /// - 사용자 ID 없음: 남은 계정/권한이 있으면 초기화
    /// - 성공: 응답으로 통째로 교체
    /// - 권한 없음(Auth): 사용자 ID 유지, 권한 해제
    /// - 사용자 무효(NotFound/InvalidArguments): 로그아웃
    /// - 그 외 실패: 사용자 ID 유지, 권한 해제
    pub async fn refresh(&self, client: &dyn EntitlementClient, user_id: Option<&str>) -> Account {
        let Some(user_id) = user_id else {
            if self.account().is_signed_in_or_entitled() {
                debug!("사용자 ID 없음, 계정 초기화");
                self.sign_out();
            }
            return self.account();
        };

        let next = match client.fetch_entitlements(user_id).await {
            Ok(grant) => {
                info!("권한 갱신 성공");
                Account {
                    user_id: Some(user_id.to_string()),
                    decrypted_user_id: grant.decrypted_user_id,
                    email: grant.email,
                    perks: grant.perks,
                }
            }
            Err(CoreError::Auth(e)) => {
                info!("활성 권한 없음: {e}");
                Account::without_perks(Some(user_id.to_string()))
            }
            Err(e @ (CoreError::NotFound { .. } | CoreError::InvalidArguments(_))) => {
                warn!("사용자 무효, 로그아웃: {e}");
                Account::default()
            }
            Err(e) => {
                warn!("권한 갱신 실패: {e}");
                Account::without_perks(Some(user_id.to_string()))
            }
        };

        self.set_account(next);
        self.account()
    }

    /// 다른 인스턴스가 기록한 값으로 교체. 삭제 알림은 무시한다.
    pub fn rehydrate(&self, raw: Option<&str>) {
        let Some(raw) = raw else {
            debug!("계정 키 삭제 알림 무시");
            return;
        };
        let envelope = match PersistedEnvelope::parse(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("계정 재수화 데이터 손상, 무시: {e}");
                return;
            }
        };
        let account = decode_account(migrate_account(envelope.state, envelope.version));
        *self.inner.account.lock() = account;
        let _ = self.inner.events.send(StoreEvent::Rehydrated);
    }

    fn persist(&self, account: &Account) {
        let result = PersistedEnvelope::from_state(account, ACCOUNT_SCHEMA_VERSION)
            .and_then(|envelope| envelope.to_json())
            .and_then(|raw| {
                self.inner
                    .storage
                    .set_item(&self.inner.key, &raw, self.inner.instance_id)
            });
        if let Err(e) = result {
            warn!("계정 저장 실패: {e}");
        }
    }
}

fn decode_account(state: Map<String, Value>) -> Account {
    serde_json::from_value(Value::Object(state)).unwrap_or_else(|e| {
        warn!("계정 상태 해석 실패, 로그아웃 상태 사용: {e}");
        Account::default()
    })
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use lair_core::ports::entitlement::EntitlementGrant;
    use lair_storage::memory::MemoryStorage;

    use super::*;

    /// 정해진 결과를 돌려주는 가짜 권한 클라이언트
    struct FakeClient {
        result: fn() -> Result<EntitlementGrant, CoreError>,
    }

    #[async_trait]
    impl EntitlementClient for FakeClient {
        async fn fetch_entitlements(&self, _user_id: &str) -> Result<EntitlementGrant, CoreError> {
            (self.result)()
        }
    }

    fn granted() -> Result<EntitlementGrant, CoreError> {
        Ok(EntitlementGrant {
            decrypted_user_id: Some("42".to_string()),
            email: Some("p@example.com".to_string()),
            perks: Perks {
                ad_removal: true,
                comments: true,
                ..Perks::default()
            },
        })
    }

    fn entitled_store() -> (Arc<MemoryStorage>, AccountStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = AccountStore::open(storage.clone());
        store.set_account(Account {
            user_id: Some("enc".to_string()),
            decrypted_user_id: Some("42".to_string()),
            email: None,
            perks: Perks {
                premium_features: true,
                ..Perks::default()
            },
        });
        (storage, store)
    }

    #[tokio::test]
    async fn successful_refresh_replaces_account_wholesale() {
        let (_, store) = entitled_store();
        let account = store
            .refresh(&FakeClient { result: granted }, Some("enc"))
            .await;
        assert_eq!(account.email.as_deref(), Some("p@example.com"));
        assert!(account.perks.ad_removal);
        assert!(!account.perks.premium_features);
        assert!(store.has_any_perk());
    }

    #[tokio::test]
    async fn forbidden_keeps_user_id_and_drops_perks() {
        let (_, store) = entitled_store();
        let client = FakeClient {
            result: || Err(CoreError::Auth("403".to_string())),
        };
        let account = store.refresh(&client, Some("enc")).await;
        assert_eq!(account.user_id.as_deref(), Some("enc"));
        assert_eq!(account.decrypted_user_id, None);
        assert!(!store.has_any_perk());
    }

    #[tokio::test]
    async fn unknown_user_signs_out() {
        for result in [
            (|| {
                Err(CoreError::NotFound {
                    resource_type: "API".to_string(),
                    id: String::new(),
                })
            }) as fn() -> Result<EntitlementGrant, CoreError>,
            || Err(CoreError::InvalidArguments("bad".to_string())),
        ] {
            let (_, store) = entitled_store();
            let account = store.refresh(&FakeClient { result }, Some("enc")).await;
            assert_eq!(account, Account::default());
        }
    }

    #[tokio::test]
    async fn transient_failure_keeps_user_id_only() {
        let (_, store) = entitled_store();
        let client = FakeClient {
            result: || Err(CoreError::Network("timeout".to_string())),
        };
        let account = store.refresh(&client, Some("enc")).await;
        assert_eq!(account, Account::without_perks(Some("enc".to_string())));
    }

    #[tokio::test]
    async fn missing_user_id_clears_account() {
        let (_, store) = entitled_store();
        let account = store.refresh(&FakeClient { result: granted }, None).await;
        assert_eq!(account, Account::default());
    }

    #[test]
    fn account_persists_across_reopen() {
        let (storage, store) = entitled_store();
        let reopened = AccountStore::open(storage);
        assert_eq!(reopened.account(), store.account());
    }

    #[test]
    fn legacy_v0_account_is_migrated_on_open() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_external(
            DEFAULT_ACCOUNT_KEY,
            r#"{"state":{"userId":"enc","adRemoval":true,"previewReleaseAccess":true},"version":0}"#,
        );
        let store = AccountStore::open(storage.clone());
        let perks = store.perks();
        assert!(perks.ad_removal && perks.preview_release_access);
        assert!(perks.comments && perks.premium_features);

        let raw = storage.get_item(DEFAULT_ACCOUNT_KEY).unwrap().unwrap();
        let envelope = PersistedEnvelope::parse(&raw).unwrap();
        assert_eq!(envelope.version, ACCOUNT_SCHEMA_VERSION);
        assert_eq!(envelope.state["email"], Value::Null);
    }

    #[test]
    fn rehydrate_adopts_foreign_record() {
        let (storage, writer) = entitled_store();
        let reader = AccountStore::open(storage.clone());
        writer.sign_out();

        let raw = storage.get_item(DEFAULT_ACCOUNT_KEY).unwrap();
        reader.rehydrate(raw.as_deref());
        assert_eq!(reader.account(), Account::default());
    }
}
