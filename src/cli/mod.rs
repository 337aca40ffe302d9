//! CLI 子命令实现

pub mod handoff;
pub mod run;
pub mod toggle;

pub use handoff::HandoffArgs;
pub use toggle::{status_line, ToggleAction, Topic};
