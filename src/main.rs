//! oc-kit CLI
//!
//! Agent 会话伴侣：空闲/错误播报与会话 handoff

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use oc_kit::cli::{self, HandoffArgs, ToggleAction, Topic};
use oc_kit::{Journal, KitConfig};

#[derive(Parser)]
#[command(name = "oc-kit")]
#[command(about = "Agent 会话伴侣 - 空闲/错误播报与会话 handoff")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 响铃开关
    Bells {
        #[arg(value_enum)]
        action: ToggleAction,
    },
    /// 语音播报开关
    Speech {
        #[arg(value_enum)]
        action: ToggleAction,
    },
    /// 查看当前配置状态
    Status,
    /// 接入宿主事件流（stdin JSONL）
    Run,
    /// 摘要指定会话并引导新会话
    Handoff(HandoffArgs),
    /// 查看最近的诊断日志
    Log {
        /// 显示最近 N 条记录
        #[arg(long, short, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("oc_kit=info"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Bells { action } => cli::toggle::run(Topic::Bells, action),
        Commands::Speech { action } => cli::toggle::run(Topic::Speech, action),
        Commands::Status => {
            let config = KitConfig::load();
            println!("{}", cli::status_line(&config));
            println!("config={}", KitConfig::path().display());
            println!("log={}", Journal::default_path().display());
            Ok(())
        }
        Commands::Run => cli::run::run().await,
        Commands::Handoff(args) => cli::handoff::run(args).await,
        Commands::Log { limit } => {
            let journal = Journal::open_default();
            for record in journal.read_recent(limit) {
                let context = record
                    .context
                    .map(|c| format!(" {}", c))
                    .unwrap_or_default();
                println!(
                    "{} [{:?}] {} {}{}",
                    record.ts.to_rfc3339(),
                    record.level,
                    record.event,
                    record.message,
                    context
                );
            }
            Ok(())
        }
    }
}
