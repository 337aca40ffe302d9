//! 宿主事件类型 - 事件流的封闭联合类型
//!
//! 宿主以 `{"type": "...", "properties": {...}}` 的形式投递事件。
//! 未知事件类型落入 [`HostEvent::Other`]，由 correlator 显式忽略，
//! 这是前向兼容策略而不是错误。

use serde::Deserialize;

/// 宿主事件
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "properties")]
pub enum HostEvent {
    /// 消息元数据更新（携带角色和所属会话）
    #[serde(rename = "message.updated")]
    MessageUpdated { info: MessageInfo },
    /// 消息分片更新（流式文本）
    #[serde(rename = "message.part.updated")]
    PartUpdated { part: PartInfo },
    /// 会话空闲：助手当前没有进一步的输出
    #[serde(rename = "session.idle")]
    SessionIdle {
        #[serde(rename = "sessionID")]
        session_id: String,
    },
    /// 会话错误
    #[serde(rename = "session.error")]
    SessionError {
        #[serde(rename = "sessionID", default)]
        session_id: Option<String>,
        #[serde(default)]
        error: Option<ErrorInfo>,
    },
    /// 其他事件类型（忽略）
    #[serde(other, deserialize_with = "ignore_any")]
    Other,
}

/// `#[serde(other)]` 的单元变体无法直接吞掉 `properties` 载荷，
/// 这里显式忽略任意内容。
fn ignore_any<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<(), D::Error> {
    serde::de::IgnoredAny::deserialize(deserializer).map(|_| ())
}

/// 消息元数据
#[derive(Debug, Clone, Deserialize)]
pub struct MessageInfo {
    pub id: String,
    #[serde(rename = "sessionID")]
    pub session_id: String,
    pub role: String,
}

/// 消息分片
///
/// 宿主可能发送非文本分片或字段缺失的分片，这里全部宽松接收，
/// 由 correlator 决定是否采纳。
#[derive(Debug, Clone, Deserialize)]
pub struct PartInfo {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "messageID", default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl PartInfo {
    /// 文本分片且字段齐全时返回 (messageID, text)
    pub fn as_text_update(&self) -> Option<(&str, &str)> {
        if self.kind != "text" {
            return None;
        }
        match (&self.message_id, &self.text) {
            (Some(id), Some(text)) => Some((id, text)),
            _ => None,
        }
    }
}

/// 会话错误载荷
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

const ERROR_FALLBACK: &str = "Agent encountered an error.";

/// 从错误载荷推导人类可读消息
///
/// 优先级：data.message（非空字符串）> name（非空）> 固定兜底文案。
pub fn describe_error(error: Option<&ErrorInfo>) -> String {
    let Some(error) = error else {
        return ERROR_FALLBACK.to_string();
    };

    if let Some(data) = &error.data {
        if let Some(message) = data.get("message").and_then(|m| m.as_str()) {
            if !message.trim().is_empty() {
                return format!("Agent encountered an error: {}", message.trim());
            }
        }
    }

    if let Some(name) = &error.name {
        if !name.trim().is_empty() {
            return format!("Agent encountered an error: {}", name.trim());
        }
    }

    ERROR_FALLBACK.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_updated() {
        let json = r#"{"type":"message.updated","properties":{"info":{"id":"msg-1","sessionID":"ses-1","role":"assistant"}}}"#;
        let event: HostEvent = serde_json::from_str(json).unwrap();
        match event {
            HostEvent::MessageUpdated { info } => {
                assert_eq!(info.id, "msg-1");
                assert_eq!(info.session_id, "ses-1");
                assert_eq!(info.role, "assistant");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_part_updated() {
        let json = r#"{"type":"message.part.updated","properties":{"part":{"type":"text","messageID":"msg-1","text":"hello"}}}"#;
        let event: HostEvent = serde_json::from_str(json).unwrap();
        match event {
            HostEvent::PartUpdated { part } => {
                assert_eq!(part.as_text_update(), Some(("msg-1", "hello")));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_non_text_part_is_not_a_text_update() {
        let part = PartInfo {
            kind: "tool".to_string(),
            message_id: Some("msg-1".to_string()),
            text: Some("x".to_string()),
        };
        assert!(part.as_text_update().is_none());
    }

    #[test]
    fn test_part_missing_fields_is_not_a_text_update() {
        let json = r#"{"type":"message.part.updated","properties":{"part":{"type":"text"}}}"#;
        let event: HostEvent = serde_json::from_str(json).unwrap();
        match event {
            HostEvent::PartUpdated { part } => assert!(part.as_text_update().is_none()),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_session_idle() {
        let json = r#"{"type":"session.idle","properties":{"sessionID":"ses-9"}}"#;
        let event: HostEvent = serde_json::from_str(json).unwrap();
        match event {
            HostEvent::SessionIdle { session_id } => assert_eq!(session_id, "ses-9"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_type_falls_through_to_other() {
        let json = r#"{"type":"session.compacted","properties":{"sessionID":"ses-1"}}"#;
        let event: HostEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, HostEvent::Other));
    }

    #[test]
    fn test_describe_error_prefers_data_message() {
        let error = ErrorInfo {
            name: Some("ProviderAuthError".to_string()),
            data: Some(serde_json::json!({"message": "token expired"})),
        };
        assert_eq!(
            describe_error(Some(&error)),
            "Agent encountered an error: token expired"
        );
    }

    #[test]
    fn test_describe_error_falls_back_to_name() {
        let error = ErrorInfo {
            name: Some("ProviderAuthError".to_string()),
            data: Some(serde_json::json!({"message": "   "})),
        };
        assert_eq!(
            describe_error(Some(&error)),
            "Agent encountered an error: ProviderAuthError"
        );
    }

    #[test]
    fn test_describe_error_fixed_fallback() {
        assert_eq!(describe_error(None), "Agent encountered an error.");
        let empty = ErrorInfo::default();
        assert_eq!(describe_error(Some(&empty)), "Agent encountered an error.");
    }

    #[test]
    fn test_parse_session_error_without_session_id() {
        let json = r#"{"type":"session.error","properties":{"error":{"name":"UnknownError"}}}"#;
        let event: HostEvent = serde_json::from_str(json).unwrap();
        match event {
            HostEvent::SessionError { session_id, error } => {
                assert!(session_id.is_none());
                assert_eq!(error.unwrap().name.as_deref(), Some("UnknownError"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
