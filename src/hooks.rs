use std::path::Path;
use std::process::{Child, Command, Stdio};

use anyhow::{Context, Result};
use colored::Colorize;
use log::info;

/// Events that can run a user-provided executable
///
/// Hooks live in the configured hooks directory and receive the slot
/// number as their only argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hook {
    TimerStart,
    TimerWarning,
    TimerExpired,
}

impl Hook {
    pub fn file_name(&self) -> &'static str {
        match *self {
            Self::TimerStart => "timer-start",
            Self::TimerWarning => "timer-warning",
            Self::TimerExpired => "timer-expired",
        }
    }

    /// Start the hook for a slot without waiting for it to finish
    ///
    /// Returns `Ok(None)` when no such hook is installed. The hook's standard
    /// streams are not connected to the terminal.
    pub fn spawn(&self, hooks_directory: &Path, slot: u32) -> Result<Option<Child>> {
        let hook_path = hooks_directory.join(self.file_name());

        if !hook_path.exists() {
            return Ok(None);
        }

        info!(
            "Executing hook at {} for timer {}",
            hook_path.display().to_string().cyan(),
            slot
        );

        let child = Command::new(&hook_path)
            .arg(slot.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to execute hook {}", hook_path.display()))?;

        Ok(Some(child))
    }
}
