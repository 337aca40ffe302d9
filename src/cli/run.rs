//! run 子命令 - 接入宿主事件流
//!
//! 从 stdin 逐行读取宿主的 JSON 事件并喂给 correlator。
//! 解析失败的行按前向兼容处理：debug 记一笔后跳过，不算错误。

use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::correlator::EventCorrelator;
use crate::events::HostEvent;
use crate::journal::Journal;
use crate::notification::NotificationDispatcher;

/// 事件循环：一次处理一个事件，处理完才读下一行
pub async fn run() -> Result<()> {
    let journal = Arc::new(Journal::open_default());
    let dispatcher = NotificationDispatcher::new(Arc::clone(&journal));
    let mut correlator = EventCorrelator::new(dispatcher, Arc::clone(&journal));

    info!("oc-kit event loop started");
    journal.info("run.start", "Event loop started", None);

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<HostEvent>(trimmed) {
            Ok(event) => correlator.handle(event),
            Err(e) => {
                // 陌生的事件形状不是缺陷
                debug!(error = %e, "Skipping unparseable event line");
            }
        }
    }

    info!("oc-kit event loop stopped (stdin closed)");
    journal.info("run.stop", "Event loop stopped", None);
    Ok(())
}
