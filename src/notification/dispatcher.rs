//! 通知分发器 - 把播报决策变成响铃/语音副作用
//!
//! 所有副作用都是尽力而为：外部命令 spawn 后立即返回，失败只记日志。
//! correlator 通过 [`Announcer`] trait 依赖这里，测试里用记录型 mock 替换。

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{KitConfig, SUPPORTED_ERROR_SOUND};
use crate::journal::Journal;

use super::platform::{self, AlertCapability, SpeechCapability, FUNK_SOUND_PATH};
use super::speech::clip_for_speech;

/// 播报接口 - correlator 与副作用之间的接缝
///
/// 两个方法都是同步的 fire-and-forget：实现内部自行 spawn，
/// 调用方只承担同步准备的开销。
pub trait Announcer: Send + Sync {
    /// 会话空闲通知。`text` 为空表示降级为仅响铃。
    fn notify_idle(&self, text: &str, config: &KitConfig);

    /// 会话错误通知。不播报语音，不参与去重。
    fn notify_error(&self, config: &KitConfig);
}

/// 通知分发器
pub struct NotificationDispatcher {
    journal: Arc<Journal>,
}

impl NotificationDispatcher {
    pub fn new(journal: Arc<Journal>) -> Self {
        Self { journal }
    }

    /// 语音播报（平台不支持时降级记录）
    fn speak(&self, text: &str, config: &KitConfig) {
        match platform::speech_capability() {
            SpeechCapability::Unavailable => {
                // 设计契约：能力降级，不是错误
                info!("Speech skipped: platform unsupported");
                self.journal.info(
                    "speech.unsupported",
                    "Speech skipped: platform unsupported",
                    Some(serde_json::json!({"os": std::env::consts::OS})),
                );
            }
            SpeechCapability::Say => {
                let clipped = clip_for_speech(text, config.speech.max_chars as usize);
                if clipped.is_empty() {
                    return;
                }

                let mut args = Vec::new();
                if let Some(voice) = &config.speech.voice {
                    args.push("-v".to_string());
                    args.push(voice.clone());
                }
                args.push(clipped);

                platform::spawn_fire_and_forget("say", &args, &self.journal);
            }
        }
    }

    /// 播放错误提示音
    fn play_error_sound(&self, config: &KitConfig) {
        match platform::alert_capability() {
            AlertCapability::TerminalBell => {
                platform::write_terminal_bell(&self.journal);
            }
            AlertCapability::SystemSound => {
                if config.bells.error_sound == SUPPORTED_ERROR_SOUND {
                    platform::spawn_fire_and_forget(
                        "afplay",
                        &[FUNK_SOUND_PATH.to_string()],
                        &self.journal,
                    );
                } else {
                    // 不认识的提示音标识按"无声音"降级处理
                    warn!(sound = %config.bells.error_sound, "Unsupported error sound, skipping");
                    self.journal.warn(
                        "error_sound.unsupported",
                        "Unsupported error sound, skipping",
                        Some(serde_json::json!({"sound": config.bells.error_sound})),
                    );
                }
            }
        }
    }
}

impl Announcer for NotificationDispatcher {
    fn notify_idle(&self, text: &str, config: &KitConfig) {
        if config.bells.enabled {
            platform::write_terminal_bell(&self.journal);
        }

        if config.speech.enabled && !text.trim().is_empty() {
            self.speak(text, config);
        }

        debug!(
            bell = config.bells.enabled,
            speech = config.speech.enabled,
            "Idle notification processed"
        );
        self.journal.debug(
            "idle.notify",
            "Idle notification processed",
            Some(serde_json::json!({
                "bell": config.bells.enabled,
                "speech": config.speech.enabled,
            })),
        );
    }

    fn notify_error(&self, config: &KitConfig) {
        if config.bells.enabled {
            self.play_error_sound(config);
        }

        self.journal.warn(
            "error.notify",
            "Error notification processed",
            Some(serde_json::json!({
                "bell": config.bells.enabled,
                "speech": false,
            })),
        );
    }
}
