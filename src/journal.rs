//! 诊断日志 - 本地 JSONL 文件追加写入
//!
//! 所有通知决策和 handoff 步骤都会在这里留下一条结构化记录，
//! 供 `oc-kit log` 查看。写入是尽力而为的：任何 IO 失败都被吞掉，
//! 绝不影响调用方。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use crate::config::LogLevel;

/// 诊断记录（JSONL 格式）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalRecord {
    /// ISO8601 时间戳
    pub ts: DateTime<Utc>,
    /// 日志级别
    pub level: LogLevel,
    /// 事件标识（如 idle.notify / handoff.start）
    pub event: String,
    /// 人类可读消息
    pub message: String,
    /// 结构化上下文
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

const MAX_RECORDS: usize = 500;
const KEEP_AFTER_CLEANUP: usize = 250;
const CLEANUP_CHECK_INTERVAL: usize = 20;

/// 诊断日志
///
/// 级别门限存放在原子变量里，correlator 在每个终端事件上用
/// 最新配置快照刷新它。
pub struct Journal {
    path: PathBuf,
    min_level: AtomicU8,
    write_count: AtomicUsize,
}

impl Journal {
    /// 默认日志文件路径
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("opencode")
            .join("logs")
            .join("oc-kit.log")
    }

    /// 打开默认位置的日志
    pub fn open_default() -> Self {
        Self::at(Self::default_path())
    }

    /// 打开指定路径的日志（测试用）
    pub fn at(path: PathBuf) -> Self {
        Self {
            path,
            min_level: AtomicU8::new(LogLevel::Info.weight()),
            write_count: AtomicUsize::new(0),
        }
    }

    /// 更新级别门限
    pub fn set_level(&self, level: LogLevel) {
        self.min_level.store(level.weight(), Ordering::Relaxed);
    }

    /// 当前级别门限
    pub fn level(&self) -> LogLevel {
        LogLevel::from_weight(self.min_level.load(Ordering::Relaxed))
    }

    pub fn debug(&self, event: &str, message: &str, context: Option<serde_json::Value>) {
        self.append(LogLevel::Debug, event, message, context);
    }

    pub fn info(&self, event: &str, message: &str, context: Option<serde_json::Value>) {
        self.append(LogLevel::Info, event, message, context);
    }

    pub fn warn(&self, event: &str, message: &str, context: Option<serde_json::Value>) {
        self.append(LogLevel::Warn, event, message, context);
    }

    pub fn error(&self, event: &str, message: &str, context: Option<serde_json::Value>) {
        self.append(LogLevel::Error, event, message, context);
    }

    /// 追加一条记录（带文件锁，失败静默）
    pub fn append(
        &self,
        level: LogLevel,
        event: &str,
        message: &str,
        context: Option<serde_json::Value>,
    ) {
        if level.weight() < self.min_level.load(Ordering::Relaxed) {
            return;
        }

        let record = JournalRecord {
            ts: Utc::now(),
            level,
            event: event.to_string(),
            message: message.to_string(),
            context,
        };

        // 尽力而为：任何失败都不上抛
        let _ = self.write_record(&record);
        self.maybe_cleanup();
    }

    fn write_record(&self, record: &JournalRecord) -> std::io::Result<()> {
        use fs2::FileExt;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;
        let line = serde_json::to_string(record).unwrap_or_default();
        let result = writeln!(file, "{}", line);
        let _ = file.unlock();
        result
    }

    /// 读取最近 N 条记录
    pub fn read_recent(&self, n: usize) -> Vec<JournalRecord> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };

        let reader = BufReader::new(file);
        let records: Vec<JournalRecord> = reader
            .lines()
            .filter_map(|line| line.ok())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect();

        let start = records.len().saturating_sub(n);
        records[start..].to_vec()
    }

    /// 定期检查文件是否需要裁剪
    fn maybe_cleanup(&self) {
        let count = self.write_count.fetch_add(1, Ordering::Relaxed);
        if count % CLEANUP_CHECK_INTERVAL != 0 {
            return;
        }

        if let Ok(metadata) = fs::metadata(&self.path) {
            // 估算行数：平均每行约 180 字节
            let estimated_lines = metadata.len() as usize / 180;
            if estimated_lines > MAX_RECORDS {
                let _ = self.cleanup();
            }
        }
    }

    /// 只保留最近的记录，原子替换文件
    fn cleanup(&self) -> std::io::Result<()> {
        use fs2::FileExt;

        let file = File::open(&self.path)?;
        file.lock_exclusive()?;

        let reader = BufReader::new(&file);
        let records: Vec<JournalRecord> = reader
            .lines()
            .filter_map(|line| line.ok())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect();

        if records.len() <= MAX_RECORDS {
            let _ = file.unlock();
            return Ok(());
        }

        let start = records.len().saturating_sub(KEEP_AFTER_CLEANUP);
        let temp_path = self.path.with_extension("tmp");
        {
            let mut temp_file = File::create(&temp_path)?;
            for record in &records[start..] {
                writeln!(
                    temp_file,
                    "{}",
                    serde_json::to_string(record).unwrap_or_default()
                )?;
            }
        }
        fs::rename(&temp_path, &self.path)?;

        let _ = file.unlock();
        Ok(())
    }
}
