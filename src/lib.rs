//! A board of independent countdown timers for time-limited slots
//!
//! Each [`Timer`] counts down once per second while running. The
//! [`TimerBoard`] owns a fixed set of them, publishes aggregate counts every
//! second and writes a [`Snapshot`] to disk every few minutes so the board
//! survives restarts.

pub mod board;
pub mod command;
pub mod config;
pub mod display;
pub mod hooks;
pub mod scheduler;
pub mod snapshot;
pub mod time;
pub mod timer;

pub use board::{StatusSummary, Thresholds, TimerBoard};
pub use command::Command;
pub use config::{default_config_path, Config};
pub use snapshot::{Snapshot, TimerRecord};
pub use timer::{State, Timer, Urgency};
