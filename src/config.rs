//! 配置模块 - 读取和更新 kit.json
//!
//! 配置文件位于 `~/.config/opencode/kit.json`，JSON 格式（camelCase 字段）。
//! 读取时逐字段清洗：非法值回退到 schema 默认值，文件缺失或损坏时返回完整默认配置。
//! 写入采用临时文件 + 原子 rename，避免并发读到半截文件。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// 唯一支持的错误提示音标识。其他配置值视为"无声音"降级。
pub const SUPPORTED_ERROR_SOUND: &str = "Funk";

const MAX_CHARS_MIN: u32 = 20;
const MAX_CHARS_MAX: u32 = 2000;

/// 日志级别（与 journal 的级别门限共用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// 级别权重，数值越大越严重
    pub fn weight(self) -> u8 {
        match self {
            LogLevel::Debug => 10,
            LogLevel::Info => 20,
            LogLevel::Warn => 30,
            LogLevel::Error => 40,
        }
    }

    pub fn from_weight(weight: u8) -> Self {
        match weight {
            w if w <= 10 => LogLevel::Debug,
            w if w <= 20 => LogLevel::Info,
            w if w <= 30 => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

/// 响铃配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BellsConfig {
    /// 是否启用响铃
    pub enabled: bool,
    /// 错误提示音标识（仅支持 "Funk"）
    pub error_sound: String,
}

impl Default for BellsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            error_sound: SUPPORTED_ERROR_SOUND.to_string(),
        }
    }
}

/// 语音播报配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpeechConfig {
    /// 是否启用语音播报
    pub enabled: bool,
    /// 播报文本的最大字符数（20..=2000）
    pub max_chars: u32,
    /// 语音名称（传给 say -v），空串视为未设置
    pub voice: Option<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_chars: 220,
            voice: None,
        }
    }
}

/// 调试配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DebugConfig {
    /// 是否显示调试 toast
    pub toasts: bool,
    /// 诊断日志级别
    pub log_level: LogLevel,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            toasts: true,
            log_level: LogLevel::Info,
        }
    }
}

/// oc-kit 配置快照
///
/// 每次 idle/error 事件处理时重新读取，配置改动无需重启即可生效。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KitConfig {
    pub bells: BellsConfig,
    pub speech: SpeechConfig,
    pub debug: DebugConfig,
}

impl KitConfig {
    /// 配置文件路径
    pub fn path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("opencode")
            .join("kit.json")
    }

    /// 读取配置，任何失败都回退到默认值
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// 从指定路径读取配置（测试用）
    pub fn load_from(path: &std::path::Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str::<serde_json::Value>(&content).ok())
            .map(|value| Self::from_value(&value))
            .unwrap_or_default()
    }

    /// 从松散 JSON 逐字段恢复配置
    ///
    /// 单个非法字段（类型不对、取值越界）只回退该字段的默认值，
    /// 其余用户设置原样保留。整个文件解析失败才回退完整默认配置。
    pub fn from_value(value: &serde_json::Value) -> Self {
        let defaults = Self::default();
        let bells = value.get("bells");
        let speech = value.get("speech");
        let debug = value.get("debug");

        Self {
            bells: BellsConfig {
                enabled: bool_field(bells, "enabled", defaults.bells.enabled),
                error_sound: error_sound_field(bells),
            },
            speech: SpeechConfig {
                enabled: bool_field(speech, "enabled", defaults.speech.enabled),
                max_chars: int_field_in_range(
                    speech,
                    "maxChars",
                    defaults.speech.max_chars,
                    MAX_CHARS_MIN,
                    MAX_CHARS_MAX,
                ),
                voice: voice_field(speech),
            },
            debug: DebugConfig {
                toasts: bool_field(debug, "toasts", defaults.debug.toasts),
                log_level: log_level_field(debug, defaults.debug.log_level),
            },
        }
    }

    /// 逐字段清洗，非法值回退到默认
    pub fn sanitized(mut self) -> Self {
        if self.bells.error_sound != SUPPORTED_ERROR_SOUND {
            self.bells.error_sound = SUPPORTED_ERROR_SOUND.to_string();
        }
        if self.speech.max_chars < MAX_CHARS_MIN || self.speech.max_chars > MAX_CHARS_MAX {
            self.speech.max_chars = SpeechConfig::default().max_chars;
        }
        if let Some(voice) = &self.speech.voice {
            if voice.trim().is_empty() {
                self.speech.voice = None;
            }
        }
        self
    }

    /// 原子写入配置
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path())
    }

    /// 原子写入到指定路径（测试用）
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        let safe = self.clone().sanitized();
        let serialized = serde_json::to_string_pretty(&safe)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("创建配置目录失败: {}", parent.display()))?;
        }

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, format!("{}\n", serialized))
            .with_context(|| format!("写入临时配置失败: {}", temp_path.display()))?;
        fs::rename(&temp_path, path)
            .with_context(|| format!("替换配置文件失败: {}", path.display()))?;

        Ok(())
    }

    /// 读取-修改-写回
    pub fn update<F>(mutator: F) -> Result<Self>
    where
        F: FnOnce(Self) -> Self,
    {
        let current = Self::load();
        let next = mutator(current).sanitized();
        next.save()?;
        Ok(next)
    }
}

fn bool_field(section: Option<&serde_json::Value>, key: &str, fallback: bool) -> bool {
    section
        .and_then(|s| s.get(key))
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(fallback)
}

fn int_field_in_range(
    section: Option<&serde_json::Value>,
    key: &str,
    fallback: u32,
    min: u32,
    max: u32,
) -> u32 {
    section
        .and_then(|s| s.get(key))
        .and_then(serde_json::Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| (min..=max).contains(n))
        .unwrap_or(fallback)
}

// 唯一支持的取值与默认值相同，任何输入都归一到它
fn error_sound_field(_section: Option<&serde_json::Value>) -> String {
    SUPPORTED_ERROR_SOUND.to_string()
}

fn voice_field(section: Option<&serde_json::Value>) -> Option<String> {
    section
        .and_then(|s| s.get("voice"))
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn log_level_field(section: Option<&serde_json::Value>, fallback: LogLevel) -> LogLevel {
    match section
        .and_then(|s| s.get("logLevel"))
        .and_then(serde_json::Value::as_str)
    {
        Some("debug") => LogLevel::Debug,
        Some("info") => LogLevel::Info,
        Some("warn") => LogLevel::Warn,
        Some("error") => LogLevel::Error,
        _ => fallback,
    }
}
