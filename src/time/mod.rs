#[doc(hidden)]
pub mod duration;

use chrono::TimeDelta;

/// Extensions to `TimeDelta`
pub trait TimeDeltaExt {
    /// Formats the delta as a countdown clock, `H:MM:SS`.
    ///
    /// Minutes and seconds are zero-padded, hours are not and keep counting
    /// past a full day. Negative deltas are shown as `0:00:00`.
    fn to_clock(&self) -> String;

    /// Formats the delta in a humanized way, for example `1h30m5s`.
    fn to_human(&self) -> String;
}

impl TimeDeltaExt for TimeDelta {
    fn to_clock(&self) -> String {
        let total = self.num_seconds().max(0);

        format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
    }

    fn to_human(&self) -> String {
        let total = self.num_seconds().max(0);

        if total == 0 {
            return "0s".to_string();
        }

        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        let seconds = total % 60;

        let mut acc = String::new();

        if hours > 0 {
            acc.push_str(&format!("{}h", hours));
        }

        if minutes > 0 {
            acc.push_str(&format!("{}m", minutes));
        }

        if seconds > 0 {
            acc.push_str(&format!("{}s", seconds));
        }

        acc
    }
}

/// Format a count of seconds as `H:MM:SS`
pub fn clock(seconds: u64) -> String {
    delta(seconds).to_clock()
}

/// Convert a count of seconds into a `TimeDelta`, saturating at its maximum
pub fn delta(seconds: u64) -> TimeDelta {
    i64::try_from(seconds)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}
