//! handoff 子命令 - 摘要当前会话并引导新会话

use anyhow::Result;
use clap::Args;
use std::sync::Arc;
use tracing::{error, info};

use crate::handoff::HandoffOrchestrator;
use crate::host::{HostClient, HttpHostClient, Toast, ToastVariant};
use crate::journal::Journal;

const DEFAULT_SERVER: &str = "http://127.0.0.1:4096";

/// handoff 命令参数
#[derive(Debug, Args)]
pub struct HandoffArgs {
    /// 源会话 ID
    pub session_id: String,
    /// 新会话的继续指令（可为空，使用默认文案）
    pub prompt: Vec<String>,
    /// 宿主服务器地址
    #[arg(long, default_value = DEFAULT_SERVER)]
    pub server: String,
    /// 工作目录（传给宿主 API）
    #[arg(long)]
    pub directory: Option<String>,
}

/// 执行 handoff：成功打印新会话 ID，致命失败时弹 toast 并退出非零
pub async fn run(args: HandoffArgs) -> Result<()> {
    let journal = Arc::new(Journal::open_default());
    let client = HttpHostClient::new(&args.server, args.directory.clone());
    let next_prompt = args.prompt.join(" ");

    journal.info(
        "handoff.command",
        "Received handoff command",
        Some(serde_json::json!({
            "sessionID": args.session_id,
            "promptLength": next_prompt.trim().chars().count(),
        })),
    );

    let orchestrator = HandoffOrchestrator::new(&client, Arc::clone(&journal));
    match orchestrator.run(&args.session_id, &next_prompt).await {
        Ok(result) => {
            info!(
                source = %result.source_session_id,
                new = ?result.new_session_id,
                "Handoff completed"
            );
            journal.info(
                "handoff.complete",
                "Handoff completed",
                Some(serde_json::json!({
                    "sourceSessionID": result.source_session_id,
                    "newSessionID": result.new_session_id,
                    "promptLength": result.seeded_prompt.chars().count(),
                })),
            );
            if let Some(new_session_id) = &result.new_session_id {
                println!("handoff complete: {} -> {}", result.source_session_id, new_session_id);
            }
            Ok(())
        }
        Err(e) => {
            error!(session = %args.session_id, error = %e, "Handoff failed");
            journal.error(
                "handoff.error",
                "Handoff failed",
                Some(serde_json::json!({
                    "sessionID": args.session_id,
                    "error": e.to_string(),
                })),
            );

            // 失败提示是尽力而为的，弹不出来也无妨
            let toast = Toast::new(
                "oc-kit handoff",
                "Handoff failed. Check oc-kit.log for details.",
                ToastVariant::Error,
                2800,
            );
            let _ = client.show_toast(&toast).await;

            Err(e.into())
        }
    }
}
