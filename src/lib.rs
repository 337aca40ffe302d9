//! oc-kit - Agent 会话伴侣：空闲/错误播报与会话 handoff

pub mod cli;
pub mod config;
pub mod correlator;
pub mod events;
pub mod handoff;
pub mod host;
pub mod journal;
pub mod notification;

pub use config::{KitConfig, LogLevel};
pub use correlator::EventCorrelator;
pub use events::{describe_error, ErrorInfo, HostEvent, MessageInfo, PartInfo};
pub use handoff::{HandoffError, HandoffOrchestrator, HandoffResult};
pub use host::{HostClient, HostMessage, HttpHostClient, MessagePart, PartKind, Toast, ToastVariant};
pub use journal::{Journal, JournalRecord};
pub use notification::{Announcer, NotificationDispatcher};
