//! Text rendering of the board for the terminal

use colored::Colorize;
use prettytable::{color, format, Attr, Cell, Row, Table};

use crate::board::{StatusSummary, TimerBoard};
use crate::time::{clock, delta, TimeDeltaExt};
use crate::timer::{State, Timer, Urgency};

/// Terminal display surface for a board
///
/// The last notice (help text, an error, a confirmation) stays on screen
/// below the status line until it is replaced or cleared.
pub struct Terminal {
    columns: usize,
    notice: Option<String>,
}

impl Terminal {
    pub fn new(columns: usize) -> Self {
        Self {
            columns: columns.max(1),
            notice: None,
        }
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn notify(&mut self, text: impl Into<String>) {
        self.notice = Some(text.into());
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    pub fn error(&mut self, err: &anyhow::Error) {
        self.notify(format!("{} {:#}", "error:".red().bold(), err));
    }

    pub fn help(&mut self) {
        self.notify(crate::Command::usage());
    }

    /// Every timer, the status line and the current notice as one block of text
    pub fn screen(&self, board: &TimerBoard, summary: &StatusSummary) -> String {
        let mut out = grid(board, self.columns).to_string();

        out.push('\n');
        out.push_str(&status_line(summary, board.thresholds().near_expiry).bold().to_string());
        out.push('\n');

        match &self.notice {
            Some(notice) => out.push_str(notice),
            None => out.push_str(&"(type \"help\" for commands)".dimmed().to_string()),
        }
        out.push('\n');

        out
    }

    /// Clear the screen and draw it again
    pub fn render(&self, board: &TimerBoard, summary: &StatusSummary) {
        print!("\x1b[2J\x1b[H{}", self.screen(board, summary));
    }
}

/// Confirmation shown when a timer is started for the first time
pub fn started_notice(timer: &Timer) -> Option<String> {
    if !timer.is_running() {
        return None;
    }

    timer
        .start_time()
        .map(|started| format!("Timer {} started at {}", timer.slot(), started.format("%H:%M:%S")))
}

/// The board laid out as a table with `columns` timers per row
pub fn grid(board: &TimerBoard, columns: usize) -> Table {
    let warning = board.thresholds().warning;
    let mut table = Table::new();

    for chunk in board.timers().chunks(columns.max(1)) {
        let cells = chunk
            .iter()
            .map(|timer| {
                let cell = Cell::new(&cell_text(timer, warning)).style_spec("c");

                match cell_color(timer, warning) {
                    Some(c) => cell.with_style(Attr::ForegroundColor(c)),
                    None => cell,
                }
            })
            .collect();

        table.add_row(Row::new(cells));
    }

    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table
}

/// Everything shown for one timer, one item per line
pub fn cell_text(timer: &Timer, warning_threshold: u64) -> String {
    let state = match timer.state() {
        State::Idle => "idle",
        State::Running => "running",
        State::Paused => "paused",
        State::Expired => "expired",
    };

    let mut lines = vec![
        format!("{} {}", timer.slot(), state),
        clock(timer.remaining()),
    ];

    if let Some(started) = timer.start_time() {
        lines.push(format!("Started at {}", started.format("%H:%M:%S")));
    }

    match timer.ack_marker(warning_threshold) {
        Some(true) => lines.push("✔ ok".to_string()),
        Some(false) => lines.push("✔ ack?".to_string()),
        None => {}
    }

    lines.join("\n")
}

fn cell_color(timer: &Timer, warning_threshold: u64) -> Option<color::Color> {
    match timer.urgency(warning_threshold) {
        Urgency::Expired => Some(color::RED),
        Urgency::Warning => Some(color::YELLOW),
        Urgency::Normal if timer.state() == State::Idle => Some(color::GREEN),
        Urgency::Normal => None,
    }
}

/// The aggregate counts as a single line of text
pub fn status_line(summary: &StatusSummary, near_expiry_threshold: u64) -> String {
    format!(
        "Available: {}, Active: {}, ≤{}: {}",
        summary.available,
        summary.active,
        delta(near_expiry_threshold).to_human(),
        summary.near_expiry
    )
}
