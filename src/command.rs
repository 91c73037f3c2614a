//! Console commands typed by the operator

use anyhow::{bail, Context, Result};
use regex::Regex;

const COMMAND_PATTERN: &str =
    r"(?i)^\s*(?P<verb>[a-z?]+)(?:\s+(?P<slot>\d+))?(?:\s+(?P<arg>\S+))?\s*$";

/// One line of operator input
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start or pause a timer
    StartStop(u32),
    /// Return a timer to the reset duration
    Reset(u32),
    /// Give a timer a new duration in seconds
    ///
    /// `None` means the value was missing or not an integer, which is
    /// treated like a cancelled prompt.
    SetDuration(u32, Option<i64>),
    /// Acknowledge a timer's warning
    Acknowledge(u32),
    /// Write the snapshot now
    Save,
    /// Redraw the board
    Show,
    Help,
    Quit,
}

impl Command {
    /// Parse a line of input
    ///
    /// Returns `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        if line.trim().is_empty() {
            return Ok(None);
        }

        let re = Regex::new(COMMAND_PATTERN).with_context(|| "Invalid command pattern")?;
        let Some(caps) = re.captures(line) else {
            bail!("Unrecognized input \"{}\", type \"help\" for commands", line.trim());
        };

        let verb = caps["verb"].to_lowercase();
        let slot = caps.name("slot").map(|m| m.as_str());
        let arg = caps.name("arg").map(|m| m.as_str());

        let command = match verb.as_str() {
            "start" | "stop" | "toggle" | "s" => Command::StartStop(Self::slot(&verb, slot)?),
            "reset" | "r" => Command::Reset(Self::slot(&verb, slot)?),
            "set" | "d" => Command::SetDuration(
                Self::slot(&verb, slot)?,
                arg.and_then(|a| a.parse::<i64>().ok()),
            ),
            "ack" | "a" => Command::Acknowledge(Self::slot(&verb, slot)?),
            "save" => Command::Save,
            "show" => Command::Show,
            "help" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            _ => bail!("Unknown command \"{}\", type \"help\" for commands", verb),
        };

        Ok(Some(command))
    }

    fn slot(verb: &str, slot: Option<&str>) -> Result<u32> {
        slot.with_context(|| format!("\"{}\" needs a timer number", verb))?
            .parse()
            .with_context(|| format!("\"{}\" needs a timer number", verb))
    }

    /// Usage text for every command
    pub fn usage() -> &'static str {
        "start|s <n>          start or pause timer n\n\
         reset|r <n>          reset timer n\n\
         set|d <n> <seconds>  set the duration of timer n\n\
         ack|a <n>            acknowledge the warning on timer n\n\
         save                 save all timers now\n\
         show                 redraw the board\n\
         quit|q               save and exit"
    }
}
