//! 平台能力探测与外部命令执行
//!
//! 响铃和语音依赖平台设施（macOS 的 afplay/say，其他平台退回终端铃声）。
//! 能力在每次分发时探测一次，外部命令 spawn 后立即返回，退出结果只记日志。

use std::io::Write;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::journal::Journal;

/// macOS 内置错误提示音文件
pub const FUNK_SOUND_PATH: &str = "/System/Library/Sounds/Funk.aiff";

/// 告警能力
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertCapability {
    /// 系统提示音（afplay）
    SystemSound,
    /// 终端铃声字符
    TerminalBell,
}

/// 语音能力
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechCapability {
    /// macOS say 命令
    Say,
    /// 当前平台无语音设施
    Unavailable,
}

/// 探测告警能力
pub fn alert_capability() -> AlertCapability {
    if cfg!(target_os = "macos") {
        AlertCapability::SystemSound
    } else {
        AlertCapability::TerminalBell
    }
}

/// 探测语音能力
///
/// say 只在 macOS 上存在，但仍用 which 确认一次，避免精简系统上 spawn 报错。
pub fn speech_capability() -> SpeechCapability {
    if cfg!(target_os = "macos") && which::which("say").is_ok() {
        SpeechCapability::Say
    } else {
        SpeechCapability::Unavailable
    }
}

/// 向终端写入铃声字符
///
/// 写失败只记日志，不上抛。
pub fn write_terminal_bell(journal: &Journal) {
    let mut stdout = std::io::stdout();
    if let Err(e) = stdout.write_all(b"\x07").and_then(|_| stdout.flush()) {
        warn!(error = %e, "Failed to write terminal bell");
        journal.warn(
            "bell.error",
            "Failed to write terminal bell",
            Some(serde_json::json!({"error": e.to_string()})),
        );
    }
}

/// 启动外部命令并立即返回
///
/// 命令在后台任务中等待退出：启动失败和非零退出都记 warn 级日志，
/// 调用方永远不会被阻塞或收到错误。
pub fn spawn_fire_and_forget(program: &str, args: &[String], journal: &Arc<Journal>) {
    let program = program.to_string();
    let args = args.to_vec();
    let journal = Arc::clone(journal);

    tokio::spawn(async move {
        let spawned = Command::new(&program)
            .args(&args)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .await;

        match spawned {
            Ok(status) if status.success() => {
                debug!(command = %program, "External command completed");
            }
            Ok(status) => {
                warn!(command = %program, code = ?status.code(), "Command exited non-zero");
                journal.warn(
                    "command.nonzero",
                    "Command exited non-zero",
                    Some(serde_json::json!({
                        "command": program,
                        "args": args,
                        "code": status.code(),
                    })),
                );
            }
            Err(e) => {
                warn!(command = %program, error = %e, "Command failed to launch");
                journal.warn(
                    "command.error",
                    "Command failed to launch",
                    Some(serde_json::json!({
                        "command": program,
                        "args": args,
                        "error": e.to_string(),
                    })),
                );
            }
        }
    });
}
