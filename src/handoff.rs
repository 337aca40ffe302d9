//! 会话 handoff - 摘要旧会话并引导新会话
//!
//! 五步线性协议：摘要 → 拼提示词 → 建会话 → toast/选择器 → 注入提示。
//! 建会话和注入是致命步骤，失败中止整个工作流；toast 和选择器是
//! 尽力而为，失败只记日志。没有重试，没有超时——需要超时的调用方
//! 自行包裹单步。

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::host::{HostClient, Toast, ToastVariant};
use crate::journal::Journal;

const SUMMARY_FALLBACK: &str =
    "Prior session context is available via the source session reference.";
const DEFAULT_NEXT_PROMPT: &str = "Continue from this handoff context.";
const MAX_SUMMARY_CHARS: usize = 1400;
const MAX_SNIPPETS: usize = 4;
const FETCH_LIMIT: usize = 20;
const TOAST_TITLE: &str = "oc-kit handoff";

/// handoff 工作流失败信号
///
/// 两个致命步骤各自可区分：注入失败时新会话已经存在但未完成初始化，
/// 调用方可以从 `new_session_id` 观察到这一部分状态。
#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("handoff failed during session create")]
    SessionCreate(#[source] anyhow::Error),
    #[error("handoff failed while seeding session {new_session_id}")]
    SeedPrompt {
        new_session_id: String,
        #[source]
        source: anyhow::Error,
    },
}

/// handoff 工作流的结果
#[derive(Debug, Clone)]
pub struct HandoffResult {
    pub source_session_id: String,
    pub new_session_id: Option<String>,
    pub summary: String,
    pub seeded_prompt: String,
}

/// handoff 编排器
pub struct HandoffOrchestrator<'a, C: HostClient> {
    client: &'a C,
    journal: Arc<Journal>,
}

impl<'a, C: HostClient> HandoffOrchestrator<'a, C> {
    pub fn new(client: &'a C, journal: Arc<Journal>) -> Self {
        Self { client, journal }
    }

    /// 运行完整的 handoff 协议
    pub async fn run(
        &self,
        session_id: &str,
        next_prompt: &str,
    ) -> Result<HandoffResult, HandoffError> {
        info!(session = %session_id, "Starting handoff");
        self.journal.info(
            "handoff.start",
            "Starting handoff",
            Some(serde_json::json!({"sessionID": session_id})),
        );

        let summary = self.build_summary(session_id).await;
        self.journal.info(
            "handoff.summary_ready",
            "Prepared handoff summary",
            Some(serde_json::json!({
                "sessionID": session_id,
                "summaryLength": summary.chars().count(),
            })),
        );

        let mut result = HandoffResult {
            source_session_id: session_id.to_string(),
            new_session_id: None,
            summary,
            seeded_prompt: String::new(),
        };
        result.seeded_prompt = compose_bootstrap_prompt(&result, next_prompt);

        // 致命步骤：建会话失败中止一切，不留下半初始化的新会话
        let new_session_id = self
            .client
            .create_session()
            .await
            .map_err(HandoffError::SessionCreate)?;
        result.new_session_id = Some(new_session_id.clone());

        // 尽力而为：toast 和会话选择器失败都不影响工作流
        let toast = Toast::new(
            TOAST_TITLE,
            &format!("Created handoff session ({}).", new_session_id),
            ToastVariant::Info,
            2200,
        );
        if self.client.show_toast(&toast).await.is_err() {
            self.journal.debug(
                "handoff.toast_skip",
                "Could not display handoff toast",
                Some(serde_json::json!({"newSessionID": new_session_id})),
            );
        }

        if self.client.open_session_selector().await.is_err() {
            warn!(session = %new_session_id, "Could not open session selector");
            self.journal.warn(
                "handoff.open_sessions_warn",
                "Could not open session selector",
                Some(serde_json::json!({
                    "sourceSessionID": result.source_session_id,
                    "newSessionID": new_session_id,
                })),
            );
        }

        // 致命步骤：注入失败时新会话已存在，错误携带其 ID
        self.client
            .send_prompt(&new_session_id, &result.seeded_prompt)
            .await
            .map_err(|e| HandoffError::SeedPrompt {
                new_session_id: new_session_id.clone(),
                source: e,
            })?;

        info!(
            source = %result.source_session_id,
            new = %new_session_id,
            "Created and seeded new session, opened selector"
        );
        self.journal.info(
            "handoff.transitioned",
            "Created and seeded new session, opened selector",
            Some(serde_json::json!({
                "sourceSessionID": result.source_session_id,
                "newSessionID": new_session_id,
            })),
        );

        Ok(result)
    }

    /// 第 1 步：拉取最近消息并压缩成摘要
    ///
    /// 从最新往回最多收集 4 段非空文本，再反转回时间顺序拼接。
    /// 拉取失败或没有可用文本时回退到固定占位摘要。
    async fn build_summary(&self, session_id: &str) -> String {
        let messages = match self
            .client
            .fetch_recent_messages(session_id, FETCH_LIMIT)
            .await
        {
            Ok(messages) => messages,
            Err(e) => {
                warn!(session = %session_id, error = %e, "Could not read session messages for summary");
                self.journal.warn(
                    "handoff.summary_fallback",
                    "Could not read session messages for summary",
                    Some(serde_json::json!({"sessionID": session_id})),
                );
                return SUMMARY_FALLBACK.to_string();
            }
        };

        let mut snippets: Vec<String> = Vec::new();
        for message in messages.iter().rev() {
            let text = message.extract_text();
            if text.is_empty() {
                continue;
            }
            snippets.push(text);
            if snippets.len() >= MAX_SNIPPETS {
                break;
            }
        }

        if snippets.is_empty() {
            return SUMMARY_FALLBACK.to_string();
        }

        // 收集时是新→旧，输出要恢复成旧→新
        snippets.reverse();
        let joined = snippets.join("\n\n").trim().to_string();
        crate::notification::truncate_chars(&joined, MAX_SUMMARY_CHARS)
    }
}

/// 第 2 步：拼接引导提示词
fn compose_bootstrap_prompt(result: &HandoffResult, next_prompt: &str) -> String {
    let next = next_prompt.trim();
    let next = if next.is_empty() {
        DEFAULT_NEXT_PROMPT
    } else {
        next
    };

    let source_line = format!("Source session ID: {}", result.source_session_id);
    [
        next,
        "",
        "---",
        "",
        "Handoff context from prior session:",
        "",
        result.summary.as_str(),
        "",
        source_line.as_str(),
        "",
        "Use this source session ID to retrieve prior session context if needed.",
    ]
    .join("\n")
}
