//! 事件关联器 - 维护"每个会话助手最后说了什么"并决定是否播报
//!
//! 三张映射表都是进程生命周期的内存状态，重启后从零重建：
//! - 会话 → 最新助手消息 ID
//! - 消息 ID → 最新文本内容
//! - 会话 → 已播报消息 ID（去重标记）
//!
//! 去重契约：同一条消息对同一会话最多播报一次。标记记录的是
//! "决定播报"而不是"成功送达"——外部命令失败不会回滚标记。

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::KitConfig;
use crate::events::{describe_error, HostEvent};
use crate::journal::Journal;
use crate::notification::Announcer;

/// 配置快照来源。生产环境接 [`KitConfig::load`]，测试里注入固定快照。
pub type ConfigSource = Box<dyn Fn() -> KitConfig + Send + Sync>;

/// 事件关联器
///
/// 单实例、单入口：宿主保证事件串行投递，`handle` 同步处理到底。
/// 三张表不对外暴露任何可变路径。
pub struct EventCorrelator<A: Announcer> {
    /// 会话 → 最新助手消息 ID（仅 assistant 角色更新，整体覆盖）
    latest_assistant_message: HashMap<String, String>,
    /// 消息 ID → 最新文本（last-write-wins）
    latest_text: HashMap<String, String>,
    /// 会话 → 已播报消息 ID
    announced: HashMap<String, String>,
    announcer: A,
    config_source: ConfigSource,
    journal: Arc<Journal>,
}

impl<A: Announcer> EventCorrelator<A> {
    /// 创建关联器，配置从默认路径读取
    pub fn new(announcer: A, journal: Arc<Journal>) -> Self {
        Self::with_config_source(announcer, journal, Box::new(KitConfig::load))
    }

    /// 创建关联器并注入配置来源（测试用）
    pub fn with_config_source(
        announcer: A,
        journal: Arc<Journal>,
        config_source: ConfigSource,
    ) -> Self {
        Self {
            latest_assistant_message: HashMap::new(),
            latest_text: HashMap::new(),
            announced: HashMap::new(),
            announcer,
            config_source,
            journal,
        }
    }

    /// 处理一个宿主事件
    ///
    /// 对 idle/error 终端事件会重新读取配置快照，保证配置改动立即生效。
    pub fn handle(&mut self, event: HostEvent) {
        match event {
            HostEvent::MessageUpdated { info } => {
                if info.role == "assistant" {
                    debug!(session = %info.session_id, message = %info.id, "Assistant message updated");
                    self.latest_assistant_message
                        .insert(info.session_id, info.id);
                }
            }
            HostEvent::PartUpdated { part } => {
                if let Some((message_id, text)) = part.as_text_update() {
                    self.latest_text
                        .insert(message_id.to_string(), text.to_string());
                }
            }
            HostEvent::SessionIdle { session_id } => {
                let config = self.fresh_config();
                self.on_idle(&session_id, &config);
            }
            HostEvent::SessionError { session_id, error } => {
                let config = self.fresh_config();
                let message = describe_error(error.as_ref());
                warn!(session = ?session_id, "{}", message);
                self.journal.warn(
                    "error.detected",
                    &message,
                    Some(serde_json::json!({"sessionID": session_id})),
                );
                // 错误通知永不去重
                self.announcer.notify_error(&config);
            }
            // 其他事件类型：显式忽略，前向兼容
            HostEvent::Other => {}
        }
    }

    /// 处理会话空闲事件
    fn on_idle(&mut self, session_id: &str, config: &KitConfig) {
        let latest_message_id = self.latest_assistant_message.get(session_id).cloned();

        if let Some(message_id) = &latest_message_id {
            if self.announced.get(session_id) == Some(message_id) {
                // 完全的 no-op：不分发、不更新标记
                debug!(session = %session_id, message = %message_id, "Skipping duplicate idle announcement");
                self.journal.debug(
                    "idle.skip_duplicate",
                    "Skipping duplicate idle announcement",
                    Some(serde_json::json!({
                        "sessionID": session_id,
                        "messageID": message_id,
                    })),
                );
                return;
            }
        }

        let text = latest_message_id
            .as_ref()
            .and_then(|id| self.latest_text.get(id))
            .cloned()
            .unwrap_or_default();

        match latest_message_id {
            Some(message_id) if !text.is_empty() => {
                // 先记标记再分发：慢速或失败的外部命令不影响后续事件的去重判断
                self.announced.insert(session_id.to_string(), message_id);
                self.announcer.notify_idle(&text, config);
            }
            has_message => {
                // 没有实质内容：降级为仅响铃，标记不动，
                // 之后带内容的 idle 仍有播报资格
                self.journal.warn(
                    "idle.no_summary",
                    "No cached assistant text for idle event",
                    Some(serde_json::json!({
                        "sessionID": session_id,
                        "hasMessageID": has_message.is_some(),
                        "hasText": !text.is_empty(),
                    })),
                );
                self.announcer.notify_idle("", config);
            }
        }
    }

    /// 读取最新配置快照并同步 journal 级别
    fn fresh_config(&self) -> KitConfig {
        let config = (self.config_source)();
        self.journal.set_level(config.debug.log_level);
        config
    }

    /// 某会话当前的去重标记（测试用）
    pub fn announced_message(&self, session_id: &str) -> Option<&str> {
        self.announced.get(session_id).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ErrorInfo, MessageInfo, PartInfo};
    use std::sync::Mutex;

    /// 记录型 Announcer：只记调用，不产生副作用
    #[derive(Default)]
    struct RecordingAnnouncer {
        idle_calls: Mutex<Vec<String>>,
        error_calls: Mutex<usize>,
    }

    impl Announcer for &RecordingAnnouncer {
        fn notify_idle(&self, text: &str, _config: &KitConfig) {
            self.idle_calls.lock().unwrap().push(text.to_string());
        }

        fn notify_error(&self, _config: &KitConfig) {
            *self.error_calls.lock().unwrap() += 1;
        }
    }

    fn correlator<'a>(
        announcer: &'a RecordingAnnouncer,
        dir: &tempfile::TempDir,
    ) -> EventCorrelator<&'a RecordingAnnouncer> {
        let journal = Arc::new(Journal::at(dir.path().join("oc-kit.log")));
        EventCorrelator::with_config_source(announcer, journal, Box::new(KitConfig::default))
    }

    fn assistant_message(session: &str, message: &str) -> HostEvent {
        HostEvent::MessageUpdated {
            info: MessageInfo {
                id: message.to_string(),
                session_id: session.to_string(),
                role: "assistant".to_string(),
            },
        }
    }

    fn text_part(message: &str, text: &str) -> HostEvent {
        HostEvent::PartUpdated {
            part: PartInfo {
                kind: "text".to_string(),
                message_id: Some(message.to_string()),
                text: Some(text.to_string()),
            },
        }
    }

    fn idle(session: &str) -> HostEvent {
        HostEvent::SessionIdle {
            session_id: session.to_string(),
        }
    }

    #[test]
    fn test_idle_announces_latest_assistant_text() {
        let announcer = RecordingAnnouncer::default();
        let dir = tempfile::tempdir().unwrap();
        let mut correlator = correlator(&announcer, &dir);

        correlator.handle(assistant_message("ses-1", "msg-1"));
        correlator.handle(text_part("msg-1", "hello world"));
        correlator.handle(idle("ses-1"));

        assert_eq!(
            *announcer.idle_calls.lock().unwrap(),
            vec!["hello world".to_string()]
        );
        assert_eq!(correlator.announced_message("ses-1"), Some("msg-1"));
    }

    #[test]
    fn test_second_idle_for_same_message_is_noop() {
        let announcer = RecordingAnnouncer::default();
        let dir = tempfile::tempdir().unwrap();
        let mut correlator = correlator(&announcer, &dir);

        correlator.handle(assistant_message("ses-1", "msg-1"));
        correlator.handle(text_part("msg-1", "hello"));
        correlator.handle(idle("ses-1"));
        correlator.handle(idle("ses-1"));

        // 第二个 idle 完全 no-op，连降级响铃都没有
        assert_eq!(announcer.idle_calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_idle_without_message_degrades_and_leaves_marker_unset() {
        let announcer = RecordingAnnouncer::default();
        let dir = tempfile::tempdir().unwrap();
        let mut correlator = correlator(&announcer, &dir);

        correlator.handle(idle("ses-1"));

        assert_eq!(*announcer.idle_calls.lock().unwrap(), vec!["".to_string()]);
        assert_eq!(correlator.announced_message("ses-1"), None);
    }

    #[test]
    fn test_idle_with_empty_text_keeps_future_eligibility() {
        let announcer = RecordingAnnouncer::default();
        let dir = tempfile::tempdir().unwrap();
        let mut correlator = correlator(&announcer, &dir);

        // 消息已知但文本还没到：降级播报，标记不动
        correlator.handle(assistant_message("ses-1", "msg-1"));
        correlator.handle(idle("ses-1"));
        assert_eq!(correlator.announced_message("ses-1"), None);

        // 文本到达后，同一条消息的 idle 仍有资格完整播报
        correlator.handle(text_part("msg-1", "late text"));
        correlator.handle(idle("ses-1"));

        let calls = announcer.idle_calls.lock().unwrap();
        assert_eq!(*calls, vec!["".to_string(), "late text".to_string()]);
        drop(calls);
        assert_eq!(correlator.announced_message("ses-1"), Some("msg-1"));
    }

    #[test]
    fn test_new_message_resets_dedup() {
        let announcer = RecordingAnnouncer::default();
        let dir = tempfile::tempdir().unwrap();
        let mut correlator = correlator(&announcer, &dir);

        correlator.handle(assistant_message("ses-1", "msg-1"));
        correlator.handle(text_part("msg-1", "first"));
        correlator.handle(idle("ses-1"));

        correlator.handle(assistant_message("ses-1", "msg-2"));
        correlator.handle(text_part("msg-2", "second"));
        correlator.handle(idle("ses-1"));

        assert_eq!(
            *announcer.idle_calls.lock().unwrap(),
            vec!["first".to_string(), "second".to_string()]
        );
        assert_eq!(correlator.announced_message("ses-1"), Some("msg-2"));
    }

    #[test]
    fn test_non_assistant_roles_ignored() {
        let announcer = RecordingAnnouncer::default();
        let dir = tempfile::tempdir().unwrap();
        let mut correlator = correlator(&announcer, &dir);

        correlator.handle(HostEvent::MessageUpdated {
            info: MessageInfo {
                id: "msg-u".to_string(),
                session_id: "ses-1".to_string(),
                role: "user".to_string(),
            },
        });
        correlator.handle(text_part("msg-u", "user text"));
        correlator.handle(idle("ses-1"));

        // 用户消息不算助手指针，idle 走降级路径
        assert_eq!(*announcer.idle_calls.lock().unwrap(), vec!["".to_string()]);
    }

    #[test]
    fn test_error_always_dispatches_even_after_idle() {
        let announcer = RecordingAnnouncer::default();
        let dir = tempfile::tempdir().unwrap();
        let mut correlator = correlator(&announcer, &dir);

        correlator.handle(assistant_message("ses-1", "msg-1"));
        correlator.handle(text_part("msg-1", "done"));
        correlator.handle(idle("ses-1"));

        correlator.handle(HostEvent::SessionError {
            session_id: Some("ses-1".to_string()),
            error: Some(ErrorInfo {
                name: Some("ProviderError".to_string()),
                data: None,
            }),
        });
        correlator.handle(HostEvent::SessionError {
            session_id: Some("ses-1".to_string()),
            error: None,
        });

        assert_eq!(*announcer.error_calls.lock().unwrap(), 2);
    }

    #[test]
    fn test_other_events_are_ignored() {
        let announcer = RecordingAnnouncer::default();
        let dir = tempfile::tempdir().unwrap();
        let mut correlator = correlator(&announcer, &dir);

        correlator.handle(HostEvent::Other);

        assert!(announcer.idle_calls.lock().unwrap().is_empty());
        assert_eq!(*announcer.error_calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_sessions_are_independent() {
        let announcer = RecordingAnnouncer::default();
        let dir = tempfile::tempdir().unwrap();
        let mut correlator = correlator(&announcer, &dir);

        correlator.handle(assistant_message("ses-1", "msg-1"));
        correlator.handle(text_part("msg-1", "for one"));
        correlator.handle(assistant_message("ses-2", "msg-2"));
        correlator.handle(text_part("msg-2", "for two"));

        correlator.handle(idle("ses-1"));
        correlator.handle(idle("ses-2"));
        correlator.handle(idle("ses-1"));

        assert_eq!(
            *announcer.idle_calls.lock().unwrap(),
            vec!["for one".to_string(), "for two".to_string()]
        );
    }
}
