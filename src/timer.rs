//! One countdown slot and its state machine

use chrono::{DateTime, Local};
use log::debug;

use crate::snapshot::TimerRecord;

/// Where a timer is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// Not started since it was last reset or restored
    Idle,
    Running,
    /// Started at least once and currently not counting down
    Paused,
    /// Counted all the way down to zero
    Expired,
}

/// How urgently a timer needs attention
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Urgency {
    Normal,
    Warning,
    Expired,
}

/// The result of a single tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tick {
    /// Another tick must be scheduled one second from now
    pub reschedule: bool,
    /// This tick moved the timer into the warning window
    pub entered_warning: bool,
    /// This tick ran the timer down to zero
    pub expired: bool,
}

/// A countdown timer for one slot
#[derive(Clone, Debug)]
pub struct Timer {
    slot: u32,
    original_duration: u64,
    duration: u64,
    remaining: u64,
    running: bool,
    start_time: Option<DateTime<Local>>,
    acknowledged: bool,
    tick_pending: bool,
}

impl Timer {
    /// Create an idle timer
    pub fn new(slot: u32, duration: u64) -> Self {
        let duration = duration.max(1);

        Self {
            slot,
            original_duration: duration,
            duration,
            remaining: duration,
            running: false,
            start_time: None,
            acknowledged: false,
            tick_pending: false,
        }
    }

    /// Rebuild a timer from its persisted record
    ///
    /// Missing fields fall back to `default_duration`, an idle countdown and
    /// no start time. Out-of-range values are clamped.
    pub fn restore(slot: u32, record: &TimerRecord, default_duration: u64) -> Self {
        let mut timer = Self::new(slot, record.duration.filter(|d| *d > 0).unwrap_or(default_duration));

        timer.remaining = record.remaining.unwrap_or(timer.duration).min(timer.duration);
        timer.running = record.running.unwrap_or(false) && timer.remaining > 0;
        timer.start_time = record.start_time;

        timer
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn original_duration(&self) -> u64 {
        self.original_duration
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start_time(&self) -> Option<DateTime<Local>> {
        self.start_time
    }

    pub fn tick_pending(&self) -> bool {
        self.tick_pending
    }

    /// Whether the timer has counted down since it was last configured
    pub fn is_used(&self) -> bool {
        self.remaining != self.duration
    }

    pub fn state(&self) -> State {
        if self.remaining == 0 {
            State::Expired
        } else if self.running {
            State::Running
        } else if self.start_time.is_none() && !self.is_used() {
            State::Idle
        } else {
            State::Paused
        }
    }

    pub fn urgency(&self, warning_threshold: u64) -> Urgency {
        if self.remaining == 0 {
            Urgency::Expired
        } else if self.remaining <= warning_threshold && self.is_used() {
            Urgency::Warning
        } else {
            Urgency::Normal
        }
    }

    /// The acknowledgment marker, visible only inside the warning window
    pub fn ack_marker(&self, warning_threshold: u64) -> Option<bool> {
        (self.urgency(warning_threshold) == Urgency::Warning).then_some(self.acknowledged)
    }

    /// Claim the single pending tick slot if the timer is running
    ///
    /// Returns `true` if the caller must schedule a tick.
    pub fn arm(&mut self) -> bool {
        if self.running && !self.tick_pending {
            self.tick_pending = true;
            true
        } else {
            false
        }
    }

    /// Toggle between running and paused
    ///
    /// The first start records `now` as the start time, which stays until
    /// the next reset. An expired timer cannot be started again without a
    /// reset or a new duration.
    ///
    /// Returns `true` if the caller must schedule a tick.
    pub fn start_stop(&mut self, now: DateTime<Local>) -> bool {
        if self.remaining == 0 {
            debug!("Timer {} has expired, ignoring start/stop", self.slot);
            self.running = false;
            return false;
        }

        if !self.running && self.start_time.is_none() {
            self.start_time = Some(now);
        }

        self.running = !self.running;

        self.arm()
    }

    /// Count down by one second
    pub fn tick(&mut self, warning_threshold: u64) -> Tick {
        self.tick_pending = false;

        if !self.running {
            return Tick::default();
        }

        if self.remaining == 0 {
            self.running = false;
            return Tick::default();
        }

        let was_warning = self.urgency(warning_threshold) == Urgency::Warning;

        self.remaining -= 1;

        let mut tick = Tick {
            entered_warning: !was_warning && self.urgency(warning_threshold) == Urgency::Warning,
            ..Tick::default()
        };

        if self.remaining == 0 {
            self.running = false;
            tick.expired = true;
        } else {
            tick.reschedule = self.arm();
        }

        tick
    }

    /// Stop the timer and return it to `duration` seconds with no start time
    pub fn reset(&mut self, duration: u64) {
        let duration = duration.max(1);

        self.running = false;
        self.original_duration = duration;
        self.duration = duration;
        self.remaining = duration;
        self.start_time = None;
        self.acknowledged = false;
    }

    /// Replace the duration and remaining time without touching the run state
    ///
    /// Non-positive values are ignored. Returns `true` if the timer changed.
    pub fn set_duration(&mut self, seconds: i64) -> bool {
        let Some(seconds) = u64::try_from(seconds).ok().filter(|s| *s > 0) else {
            debug!("Timer {} ignoring invalid duration {}", self.slot, seconds);
            return false;
        };

        self.original_duration = seconds;
        self.duration = seconds;
        self.remaining = seconds;
        self.acknowledged = false;

        true
    }

    /// Mark the current warning as seen
    ///
    /// Returns `true` if the marker was visible and is now acknowledged.
    pub fn acknowledge(&mut self, warning_threshold: u64) -> bool {
        if self.urgency(warning_threshold) != Urgency::Warning {
            return false;
        }

        self.acknowledged = true;
        true
    }

    /// The persisted form of this timer
    pub fn record(&self) -> TimerRecord {
        TimerRecord {
            timer_number: Some(self.slot),
            duration: Some(self.duration),
            remaining: Some(self.remaining),
            running: Some(self.running),
            start_time: self.start_time,
        }
    }
}
