//! 通知抽象层 - 响铃、语音与平台降级
//!
//! # 设计目标
//! 1. correlator 只依赖 [`Announcer`] trait，副作用实现可替换
//! 2. 所有外部命令 spawn 后立即返回，失败只记诊断日志
//! 3. 平台能力在分发时探测，缺失设施时优雅降级而不是报错

pub mod dispatcher;
pub mod platform;
pub mod speech;

pub use dispatcher::{Announcer, NotificationDispatcher};
pub use platform::{AlertCapability, SpeechCapability};
pub use speech::{clean_for_speech, clip_for_speech, truncate_chars};
