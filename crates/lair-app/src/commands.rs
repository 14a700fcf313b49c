//! CLI 명령 구현.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use lair_settings::{StorageSync, StoreEvent};
use lair_storage::migration::{ACCOUNT_SCHEMA_VERSION, SETTINGS_SCHEMA_VERSION};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::wiring::AppContext;

/// 프로필 목록 출력 (활성 프로필은 `*` 표시)
pub fn list_profiles(ctx: &AppContext) -> Result<()> {
    let current = ctx.settings.current_profile_id();
    for profile in ctx.settings.profiles() {
        let marker = if profile.id == current { "*" } else { " " };
        println!("{marker} {:<32} {}", profile.id, profile.name);
    }
    Ok(())
}

pub fn show(ctx: &AppContext, profile_id: Option<&str>) -> Result<()> {
    let settings = match profile_id {
        Some(id) => {
            ctx.settings
                .export_profile(id)
                .with_context(|| format!("프로필 없음: {id}"))?
                .settings
        }
        None => ctx.settings.current_profile_settings(),
    };
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

pub fn export(ctx: &AppContext, id: &str, out: Option<&Path>) -> Result<()> {
    let json = ctx.settings.export_profile_json(id)?;
    match out {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("파일 쓰기 실패: {}", path.display()))?;
            println!("내보내기 완료: {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub fn import(ctx: &AppContext, file: &Path) -> Result<()> {
    let raw = fs::read_to_string(file)
        .with_context(|| format!("파일 읽기 실패: {}", file.display()))?;
    let id = ctx.settings.import_profile_json(&raw)?;
    println!("가져오기 완료: {id}");
    Ok(())
}

pub fn switch(ctx: &AppContext, id: &str) -> Result<()> {
    ctx.settings.switch_profile(id)?;
    println!("활성 프로필: {id}");
    Ok(())
}

pub fn create(ctx: &AppContext, name: &str, from: Option<&str>) -> Result<()> {
    if ctx.settings.is_profile_name_taken(name, None) {
        warn!("같은 이름의 프로필이 이미 있음: {name}");
    }
    let id = match from {
        Some(source) => ctx.settings.duplicate_profile(source, name)?,
        None => ctx.settings.create_profile(name),
    };
    println!("프로필 생성: {id}");
    Ok(())
}

pub fn rename(ctx: &AppContext, id: &str, name: &str) -> Result<()> {
    ctx.settings.validate_profile_name(name, Some(id))?;
    ctx.settings.rename_profile(id, name)?;
    println!("이름 변경: {id} → {name}");
    Ok(())
}

pub fn delete(ctx: &AppContext, id: &str) -> Result<()> {
    ctx.settings.delete_profile(id)?;
    println!("프로필 삭제: {id} (활성: {})", ctx.settings.current_profile_id());
    Ok(())
}

/// 스토어를 열면서 마이그레이션이 이미 수행되므로 결과를 명시적으로 기록만 한다
pub fn migrate(ctx: &AppContext) -> Result<()> {
    ctx.settings.persist()?;
    println!(
        "설정 v{SETTINGS_SCHEMA_VERSION}: 프로필 {}개 ({})",
        ctx.settings.profiles().len(),
        ctx.storage.path_for(ctx.settings.storage_key()).display()
    );
    println!(
        "계정 v{ACCOUNT_SCHEMA_VERSION}: {}",
        if ctx.account.account().user_id.is_some() {
            "로그인됨"
        } else {
            "로그아웃"
        }
    );
    Ok(())
}

pub async fn account(ctx: &AppContext, refresh: bool, user_id: Option<&str>) -> Result<()> {
    let account = if refresh {
        let cached = ctx.account.account().user_id;
        let user_id = user_id.or(cached.as_deref());
        let client = ctx.entitlement_client()?;
        ctx.account.refresh(&client, user_id).await
    } else {
        ctx.account.account()
    };
    println!("{}", serde_json::to_string_pretty(&account)?);
    Ok(())
}

/// 다른 인스턴스의 변경을 따라간다
pub async fn watch(ctx: &AppContext) -> Result<()> {
    if !ctx.config.sync.enabled {
        bail!("동기화가 설정에서 비활성화됨 (sync.enabled = false)");
    }

    let mut events = ctx.settings.subscribe();
    let mut account_events = ctx.account.subscribe();
    let settings_sync = StorageSync::attach(ctx.settings.clone());
    let account_sync = StorageSync::attach(ctx.account.clone());
    let watcher = ctx.storage.spawn_watcher(ctx.config.poll_interval());
    println!("감시 중: {} (Ctrl+C로 종료)", ctx.storage.dir().display());

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(StoreEvent::Rehydrated) => {
                    let profile = ctx.settings.current_profile();
                    println!("설정 변경 반영: 활성 프로필 {} ({})", profile.name, profile.id);
                }
                Ok(other) => debug!("스토어 이벤트: {other:?}"),
                Err(RecvError::Lagged(skipped)) => warn!("이벤트 {skipped}개 유실"),
                Err(RecvError::Closed) => break,
            },
            event = account_events.recv() => match event {
                Ok(StoreEvent::Rehydrated) => {
                    println!("계정 변경 반영: 권한 {}", if ctx.account.has_any_perk() { "있음" } else { "없음" });
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!("계정 이벤트 {skipped}개 유실"),
                Err(RecvError::Closed) => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("Ctrl+C 핸들러 등록 실패")?;
                info!("Ctrl+C 수신");
                break;
            }
        }
    }

    watcher.abort();
    settings_sync.detach();
    account_sync.detach();
    Ok(())
}
