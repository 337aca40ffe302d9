//! 宿主运行时客户端 - 会话 / 消息 / TUI 操作
//!
//! handoff 工作流通过 [`HostClient`] trait 调用宿主，测试里用脚本化 mock 替换。
//! [`HttpHostClient`] 是对宿主 HTTP API 的真实实现。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// 消息分片种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    Text,
    Reasoning,
    Other,
}

/// 宿主消息的一个分片
#[derive(Debug, Clone)]
pub struct MessagePart {
    pub kind: PartKind,
    pub text: String,
}

/// 宿主会话里的一条消息
#[derive(Debug, Clone)]
pub struct HostMessage {
    pub id: String,
    pub role: String,
    pub parts: Vec<MessagePart>,
}

impl HostMessage {
    /// 抽取消息的可读文本：text/reasoning 分片按空格拼接，空白折叠
    pub fn extract_text(&self) -> String {
        let joined = self
            .parts
            .iter()
            .filter(|part| matches!(part.kind, PartKind::Text | PartKind::Reasoning))
            .map(|part| part.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        joined.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// Toast 样式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastVariant {
    Info,
    Success,
    Warning,
    Error,
}

/// TUI toast 请求
#[derive(Debug, Clone, Serialize)]
pub struct Toast {
    pub title: String,
    pub message: String,
    pub variant: ToastVariant,
    pub duration: u64,
}

impl Toast {
    pub fn new(title: &str, message: &str, variant: ToastVariant, duration_ms: u64) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
            variant,
            duration: duration_ms,
        }
    }
}

/// 宿主运行时操作集
///
/// 约定：`show_toast` 和 `open_session_selector` 是尽力而为的，
/// 调用方只记日志；其余操作的失败语义由调用方决定。
#[allow(async_fn_in_trait)]
pub trait HostClient {
    /// 读取会话最近的消息（老→新排列）
    async fn fetch_recent_messages(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<HostMessage>>;

    /// 创建新会话，返回会话 ID
    async fn create_session(&self) -> Result<String>;

    /// 向会话发送一条文本提示
    async fn send_prompt(&self, session_id: &str, text: &str) -> Result<()>;

    /// 显示 TUI toast
    async fn show_toast(&self, toast: &Toast) -> Result<()>;

    /// 打开会话选择器
    async fn open_session_selector(&self) -> Result<()>;
}

/// 宿主 HTTP API 客户端
pub struct HttpHostClient {
    client: reqwest::Client,
    base_url: String,
    directory: Option<String>,
}

/// 消息列表响应里的一项
#[derive(Debug, Deserialize)]
struct MessageEnvelope {
    info: MessageInfoPayload,
    #[serde(default)]
    parts: Vec<PartPayload>,
}

#[derive(Debug, Deserialize)]
struct MessageInfoPayload {
    id: String,
    role: String,
}

#[derive(Debug, Deserialize)]
struct PartPayload {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedSession {
    id: String,
}

impl HttpHostClient {
    pub fn new(base_url: &str, directory: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            directory,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 所有请求都带上可选的 directory 查询参数
    fn directory_query(&self) -> Vec<(&'static str, String)> {
        match &self.directory {
            Some(dir) => vec![("directory", dir.clone())],
            None => Vec::new(),
        }
    }
}

impl HostClient for HttpHostClient {
    async fn fetch_recent_messages(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<HostMessage>> {
        let mut query = self.directory_query();
        query.push(("limit", limit.to_string()));

        let envelopes: Vec<MessageEnvelope> = self
            .client
            .get(self.url(&format!("/session/{}/message", session_id)))
            .query(&query)
            .send()
            .await
            .context("请求会话消息失败")?
            .error_for_status()
            .context("会话消息接口返回错误状态")?
            .json()
            .await
            .context("解析会话消息响应失败")?;

        let messages = envelopes
            .into_iter()
            .map(|envelope| HostMessage {
                id: envelope.info.id,
                role: envelope.info.role,
                parts: envelope
                    .parts
                    .into_iter()
                    .map(|part| MessagePart {
                        kind: match part.kind.as_str() {
                            "text" => PartKind::Text,
                            "reasoning" => PartKind::Reasoning,
                            _ => PartKind::Other,
                        },
                        text: part.text.unwrap_or_default(),
                    })
                    .collect(),
            })
            .collect();

        Ok(messages)
    }

    async fn create_session(&self) -> Result<String> {
        let created: CreatedSession = self
            .client
            .post(self.url("/session"))
            .query(&self.directory_query())
            .send()
            .await
            .context("创建会话请求失败")?
            .error_for_status()
            .context("创建会话接口返回错误状态")?
            .json()
            .await
            .context("解析创建会话响应失败")?;

        Ok(created.id)
    }

    async fn send_prompt(&self, session_id: &str, text: &str) -> Result<()> {
        self.client
            .post(self.url(&format!("/session/{}/message", session_id)))
            .query(&self.directory_query())
            .json(&serde_json::json!({
                "parts": [{"type": "text", "text": text}],
            }))
            .send()
            .await
            .context("发送提示请求失败")?
            .error_for_status()
            .context("发送提示接口返回错误状态")?;

        Ok(())
    }

    async fn show_toast(&self, toast: &Toast) -> Result<()> {
        self.client
            .post(self.url("/tui/show-toast"))
            .query(&self.directory_query())
            .json(toast)
            .send()
            .await
            .context("toast 请求失败")?
            .error_for_status()
            .context("toast 接口返回错误状态")?;

        Ok(())
    }

    async fn open_session_selector(&self) -> Result<()> {
        self.client
            .post(self.url("/tui/open-sessions"))
            .query(&self.directory_query())
            .send()
            .await
            .context("打开会话选择器请求失败")?
            .error_for_status()
            .context("会话选择器接口返回错误状态")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_joins_text_and_reasoning_parts() {
        let message = HostMessage {
            id: "msg-1".to_string(),
            role: "assistant".to_string(),
            parts: vec![
                MessagePart {
                    kind: PartKind::Reasoning,
                    text: "thinking  about it".to_string(),
                },
                MessagePart {
                    kind: PartKind::Other,
                    text: "tool output".to_string(),
                },
                MessagePart {
                    kind: PartKind::Text,
                    text: "  the answer ".to_string(),
                },
            ],
        };

        assert_eq!(message.extract_text(), "thinking about it the answer");
    }

    #[test]
    fn test_extract_text_empty_when_no_textual_parts() {
        let message = HostMessage {
            id: "msg-1".to_string(),
            role: "assistant".to_string(),
            parts: vec![MessagePart {
                kind: PartKind::Other,
                text: "ignored".to_string(),
            }],
        };

        assert_eq!(message.extract_text(), "");
    }

    #[test]
    fn test_base_url_trailing_slash_normalized() {
        let client = HttpHostClient::new("http://127.0.0.1:4096/", None);
        assert_eq!(client.url("/session"), "http://127.0.0.1:4096/session");
    }

    #[test]
    fn test_toast_serializes_variant_lowercase() {
        let toast = Toast::new("oc-kit", "hello", ToastVariant::Error, 2800);
        let json = serde_json::to_string(&toast).unwrap();
        assert!(json.contains("\"variant\":\"error\""));
        assert!(json.contains("\"duration\":2800"));
    }
}
