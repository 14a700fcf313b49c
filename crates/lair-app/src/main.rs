//! # lair-app
//!
//! Lair 설정 저장소 CLI 진입점.
//! 설정 로드, 어댑터 와이어링, 프로필 관리 명령 디스패치.

mod commands;
mod wiring;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::wiring::AppContext;

/// Lair 설정/프로필 저장소 관리 도구
#[derive(Parser, Debug)]
#[command(name = "lair")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리의 config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 데이터 저장 경로 (설정 파일 값보다 우선)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// 임베드된 앱 경로 (예: /apps/palworld/map). 앱별 저장 키를 사용한다.
    #[arg(long, global = true)]
    app_path: Option<String>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 프로필 목록
    Profiles,
    /// 프로필 설정 출력 (기본: 활성 프로필)
    Show {
        #[arg(long)]
        profile: Option<String>,
    },
    /// 프로필을 JSON으로 내보내기
    Export {
        id: String,
        /// 출력 파일 (기본: 표준 출력)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },
    /// JSON 파일에서 프로필 가져오기
    Import { file: PathBuf },
    /// 활성 프로필 전환
    Switch { id: String },
    /// 새 프로필 생성 후 활성화
    Create {
        name: String,
        /// 기존 프로필을 복제
        #[arg(long)]
        from: Option<String>,
    },
    /// 프로필 이름 변경
    Rename { id: String, name: String },
    /// 프로필 삭제
    Delete { id: String },
    /// 저장된 데이터를 최신 스키마로 마이그레이션
    Migrate,
    /// 계정 캐시 조회/갱신
    Account {
        /// 서버에서 권한 다시 조회
        #[arg(long)]
        refresh: bool,
        /// 조회할 사용자 ID (기본: 캐시된 ID)
        #[arg(long)]
        user_id: Option<String>,
    },
    /// 다른 인스턴스의 변경을 따라가며 로그 출력 (Ctrl+C로 종료)
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = format!(
        "lair={level},lair_app={level},lair_core={level},lair_storage={level},lair_network={level},lair_settings={level}",
        level = args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let ctx = AppContext::build(
        args.config.as_deref(),
        args.data_dir.as_deref(),
        args.app_path.as_deref(),
    )?;
    info!("저장 키: {}", ctx.settings.storage_key());

    match args.command {
        Command::Profiles => commands::list_profiles(&ctx),
        Command::Show { profile } => commands::show(&ctx, profile.as_deref()),
        Command::Export { id, out } => commands::export(&ctx, &id, out.as_deref()),
        Command::Import { file } => commands::import(&ctx, &file),
        Command::Switch { id } => commands::switch(&ctx, &id),
        Command::Create { name, from } => commands::create(&ctx, &name, from.as_deref()),
        Command::Rename { id, name } => commands::rename(&ctx, &id, &name),
        Command::Delete { id } => commands::delete(&ctx, &id),
        Command::Migrate => commands::migrate(&ctx),
        Command::Account { refresh, user_id } => {
            commands::account(&ctx, refresh, user_id.as_deref()).await
        }
        Command::Watch => commands::watch(&ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_parse_after_subcommand() {
        let args = Args::try_parse_from([
            "lair",
            "create",
            "Raid",
            "--from",
            "default",
            "--data-dir",
            "/tmp/lair",
            "--app-path",
            "/apps/palworld",
        ])
        .unwrap();
        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/lair")));
        assert_eq!(args.app_path.as_deref(), Some("/apps/palworld"));
        assert!(matches!(
            args.command,
            Command::Create { ref name, from: Some(ref from) } if name == "Raid" && from == "default"
        ));
    }

    #[test]
    fn log_level_defaults_to_warn() {
        let args = Args::try_parse_from(["lair", "profiles"]).unwrap();
        assert_eq!(args.log_level, "warn");
        assert!(args.config.is_none());
    }
}
