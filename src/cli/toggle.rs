//! 开关子命令 - bells / speech 的 on|off|toggle|status

use anyhow::Result;
use clap::ValueEnum;

use crate::config::KitConfig;

/// 开关动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ToggleAction {
    On,
    Off,
    Toggle,
    Status,
}

/// 开关主题
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Bells,
    Speech,
}

impl Topic {
    fn name(self) -> &'static str {
        match self {
            Topic::Bells => "bells",
            Topic::Speech => "speech",
        }
    }

    fn enabled(self, config: &KitConfig) -> bool {
        match self {
            Topic::Bells => config.bells.enabled,
            Topic::Speech => config.speech.enabled,
        }
    }
}

/// 状态行：`bells=on speech=off`
pub fn status_line(config: &KitConfig) -> String {
    format!(
        "bells={} speech={}",
        on_off(config.bells.enabled),
        on_off(config.speech.enabled)
    )
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

/// 执行开关子命令
pub fn run(topic: Topic, action: ToggleAction) -> Result<()> {
    if action == ToggleAction::Status {
        let config = KitConfig::load();
        println!("{}", status_line(&config));
        println!("config={}", KitConfig::path().display());
        return Ok(());
    }

    let updated = KitConfig::update(|mut current| {
        let enabled = topic.enabled(&current);
        let next_enabled = match action {
            ToggleAction::On => true,
            ToggleAction::Off => false,
            ToggleAction::Toggle => !enabled,
            ToggleAction::Status => unreachable!("handled above"),
        };

        match topic {
            Topic::Bells => current.bells.enabled = next_enabled,
            Topic::Speech => current.speech.enabled = next_enabled,
        }
        current
    })?;

    println!(
        "updated {}.enabled={}",
        topic.name(),
        topic.enabled(&updated)
    );
    println!("status {}", status_line(&updated));
    println!("config={}", KitConfig::path().display());

    Ok(())
}
