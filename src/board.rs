//! The board of timers: construction, user actions, status and persistence

use std::path::PathBuf;
use std::process::Child;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use log::{debug, error, info, warn};

use crate::config::Config;
use crate::hooks::Hook;
use crate::scheduler::Scheduler;
use crate::snapshot::Snapshot;
use crate::time::clock;
use crate::timer::Timer;

/// Remaining-time limits that change how a timer is shown and counted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Thresholds {
    /// A used timer at or below this many seconds shows a warning
    pub warning: u64,
    /// A timer at or below this many seconds counts as near expiry
    pub near_expiry: u64,
}

/// Aggregate counts over every timer on the board
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusSummary {
    /// Timers that are not running
    pub available: usize,
    /// Timers that have counted down since they were last configured
    pub active: usize,
    /// Timers at or below the near-expiry threshold, running or not
    pub near_expiry: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Job {
    Tick(u32),
    Status,
    Persist,
}

/// A fixed set of timers numbered from 1, with their periodic jobs
#[derive(Debug)]
pub struct TimerBoard {
    timers: Vec<Timer>,
    scheduler: Scheduler<Job>,
    thresholds: Thresholds,
    reset_duration: u64,
    save_interval: u64,
    state_file_path: PathBuf,
    hooks_directory: PathBuf,
    snapshot: Snapshot,
    summary: StatusSummary,
    hook_processes: Vec<Child>,
}

impl TimerBoard {
    /// Build the board from the snapshot file named in the config
    ///
    /// A missing, unreadable or corrupt snapshot starts every timer from
    /// the defaults.
    pub fn load(config: &Config) -> Self {
        let path = &config.state_file_path;

        let snapshot = match Snapshot::load(path) {
            Ok(Some(snapshot)) => {
                info!("Restored {} timers from {}", snapshot.len(), path.display());
                snapshot
            }
            Ok(None) => {
                info!("No snapshot at {}, starting with default timers", path.display());
                Snapshot::default()
            }
            Err(e) => {
                warn!("Ignoring unreadable snapshot: {:#}", e);
                Snapshot::default()
            }
        };

        Self::new(config, snapshot)
    }

    /// Build the board from an already loaded snapshot
    ///
    /// Timers that were running when the snapshot was taken carry on
    /// counting down from their saved remaining time.
    pub fn new(config: &Config, snapshot: Snapshot) -> Self {
        let initial_duration = config.initial_duration.as_secs();
        let mut scheduler = Scheduler::new();

        let timers: Vec<Timer> = (1..=config.slot_count)
            .map(|slot| {
                let mut timer = match snapshot.get(slot) {
                    Some(record) => Timer::restore(slot, record, initial_duration),
                    None => Timer::new(slot, initial_duration),
                };

                if timer.arm() {
                    debug!("Timer {} resumes with {} remaining", slot, clock(timer.remaining()));
                    scheduler.schedule(1, Job::Tick(slot));
                }

                timer
            })
            .collect();

        for slot in snapshot.slots().filter(|s| *s == 0 || *s > config.slot_count) {
            debug!("Ignoring snapshot record for unknown timer {}", slot);
        }

        scheduler.schedule(0, Job::Status);
        scheduler.schedule(0, Job::Persist);

        let mut board = Self {
            timers,
            scheduler,
            thresholds: Thresholds {
                warning: config.warning_threshold.as_secs(),
                near_expiry: config.near_expiry_threshold.as_secs(),
            },
            reset_duration: config.reset_duration.as_secs(),
            save_interval: config.save_interval.as_secs().max(1),
            state_file_path: config.state_file_path.clone(),
            hooks_directory: config.hooks_directory.clone(),
            snapshot,
            summary: StatusSummary::default(),
            hook_processes: Vec::new(),
        };
        board.summary = board.status();

        board
    }

    pub fn timers(&self) -> &[Timer] {
        &self.timers
    }

    pub fn timer(&self, slot: u32) -> Option<&Timer> {
        let index = usize::try_from(slot).ok()?.checked_sub(1)?;
        self.timers.get(index)
    }

    fn timer_mut(&mut self, slot: u32) -> Result<&mut Timer> {
        let count = self.timers.len();

        usize::try_from(slot)
            .ok()
            .and_then(|s| s.checked_sub(1))
            .and_then(|index| self.timers.get_mut(index))
            .ok_or_else(|| anyhow!("No timer {}, timers are numbered 1 to {}", slot, count))
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// The most recently published status
    pub fn summary(&self) -> StatusSummary {
        self.summary
    }

    /// The snapshot most recently loaded or saved
    pub fn last_snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Count available, active and near-expiry timers
    pub fn status(&self) -> StatusSummary {
        let near_expiry = self.thresholds.near_expiry;

        StatusSummary {
            available: self.timers.iter().filter(|t| !t.is_running()).count(),
            active: self.timers.iter().filter(|t| t.is_used()).count(),
            near_expiry: self.timers.iter().filter(|t| t.remaining() <= near_expiry).count(),
        }
    }

    fn refresh_status(&mut self) -> StatusSummary {
        self.summary = self.status();
        self.summary
    }

    /// Run every job due at the current second
    ///
    /// Returns the freshly published status if the status pass ran.
    /// The status and persistence passes always run after the ticks of the
    /// same round.
    pub fn poll(&mut self) -> Option<StatusSummary> {
        let mut status_due = false;
        let mut persist_due = false;

        while let Some(job) = self.scheduler.pop_due() {
            match job {
                Job::Tick(slot) => self.run_tick(slot),
                Job::Status => status_due = true,
                Job::Persist => persist_due = true,
            }
        }

        if persist_due {
            if let Err(e) = self.save() {
                error!("Failed to save timers: {:#}", e);
            }
            self.scheduler.schedule(self.save_interval, Job::Persist);
        }

        if !status_due {
            return None;
        }

        self.scheduler.schedule(1, Job::Status);
        self.reap_hooks();

        Some(self.refresh_status())
    }

    /// Move the board forward by one second and run the jobs that fall due
    pub fn advance(&mut self) -> Option<StatusSummary> {
        self.scheduler.advance();
        self.poll()
    }

    fn run_tick(&mut self, slot: u32) {
        let warning = self.thresholds.warning;

        let Ok(timer) = self.timer_mut(slot) else {
            return;
        };
        let tick = timer.tick(warning);
        let remaining = timer.remaining();

        if tick.reschedule {
            self.scheduler.schedule(1, Job::Tick(slot));
        }

        if tick.entered_warning {
            info!("Timer {} has {} remaining", slot, clock(remaining));
            self.run_hook(Hook::TimerWarning, slot);
        }

        if tick.expired {
            info!("Timer {} expired", slot);
            self.run_hook(Hook::TimerExpired, slot);
        }
    }

    /// Start or pause a timer
    pub fn start_stop(&mut self, slot: u32) -> Result<StatusSummary> {
        self.start_stop_at(slot, Local::now())
    }

    /// Start or pause a timer, recording `now` as its start time if it has none
    pub fn start_stop_at(&mut self, slot: u32, now: DateTime<Local>) -> Result<StatusSummary> {
        let timer = self.timer_mut(slot)?;
        let first_start = timer.start_time().is_none();

        let needs_tick = timer.start_stop(now);
        let running = timer.is_running();
        let start_time = timer.start_time();

        if needs_tick {
            self.scheduler.schedule(1, Job::Tick(slot));
        }

        match (running, start_time) {
            (true, Some(started)) if first_start => {
                info!("Timer {} started at {}", slot, started.format("%H:%M:%S"));
                self.run_hook(Hook::TimerStart, slot);
            }
            (true, _) => info!("Timer {} resumed", slot),
            (false, _) => info!("Timer {} paused", slot),
        }

        Ok(self.refresh_status())
    }

    /// Stop a timer and return it to the reset duration
    pub fn reset(&mut self, slot: u32) -> Result<StatusSummary> {
        let reset_duration = self.reset_duration;
        self.timer_mut(slot)?.reset(reset_duration);

        info!("Timer {} reset to {}", slot, clock(reset_duration));

        Ok(self.refresh_status())
    }

    /// Give a timer a new duration
    ///
    /// `None` stands for a cancelled prompt. Like non-positive values it
    /// leaves the timer untouched.
    pub fn set_duration(&mut self, slot: u32, seconds: Option<i64>) -> Result<StatusSummary> {
        let timer = self.timer_mut(slot)?;

        match seconds {
            Some(seconds) => {
                if timer.set_duration(seconds) {
                    info!("Timer {} set to {}", slot, clock(timer.duration()));
                }
            }
            None => debug!("Duration entry for timer {} cancelled", slot),
        }

        Ok(self.refresh_status())
    }

    /// Acknowledge a timer's warning
    pub fn acknowledge(&mut self, slot: u32) -> Result<StatusSummary> {
        let warning = self.thresholds.warning;

        if self.timer_mut(slot)?.acknowledge(warning) {
            info!("Timer {} warning acknowledged", slot);
        } else {
            debug!("Timer {} has no warning to acknowledge", slot);
        }

        Ok(self.refresh_status())
    }

    /// The current state of every timer in persisted form
    pub fn snapshot(&self) -> Snapshot {
        self.timers.iter().map(|t| (t.slot(), t.record())).collect()
    }

    /// Write every timer to the state file
    pub fn save(&mut self) -> Result<()> {
        let snapshot = self.snapshot();
        snapshot.save(&self.state_file_path)?;
        self.snapshot = snapshot;

        Ok(())
    }

    fn run_hook(&mut self, hook: Hook, slot: u32) {
        match hook.spawn(&self.hooks_directory, slot) {
            Ok(Some(child)) => self.hook_processes.push(child),
            Ok(None) => {}
            Err(e) => warn!("{:#}", e),
        }
    }

    fn reap_hooks(&mut self) {
        self.hook_processes.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                debug!("Hook process {} exited with {}", child.id(), status);
                false
            }
            Ok(None) => true,
            Err(e) => {
                warn!("Unable to check hook process {}: {}", child.id(), e);
                false
            }
        });
    }
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use chrono::{DateTime, Local};

    use crate::board::{StatusSummary, TimerBoard};
    use crate::config::Config;
    use crate::snapshot::{Snapshot, TimerRecord};
    use crate::timer::{State, Urgency};

    fn config(dir: &Path) -> Config {
        Config {
            state_file_path: dir.join("board.json"),
            hooks_directory: dir.join("hooks"),
            ..Config::default()
        }
    }

    fn t0() -> DateTime<Local> {
        "2024-03-27T12:00:00-06:00".parse().unwrap()
    }

    fn advance(board: &mut TimerBoard, seconds: u64) -> Option<StatusSummary> {
        let mut last = None;
        for _ in 0..seconds {
            last = board.advance();
        }
        last
    }

    #[test]
    fn fresh_board_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut board = TimerBoard::load(&config(dir.path()));

        assert_eq!(board.timers().len(), 50);
        assert!(board.timers().iter().all(|t| t.duration() == 5405 && t.remaining() == 5405));
        assert_eq!(board.timer(1).unwrap().slot(), 1);
        assert_eq!(board.timer(50).unwrap().slot(), 50);
        assert!(board.timer(0).is_none());
        assert!(board.timer(51).is_none());

        let summary = board.poll().unwrap();

        assert_eq!(
            summary,
            StatusSummary {
                available: 50,
                active: 0,
                near_expiry: 0
            }
        );
        assert!(dir.path().join("board.json").exists());
    }

    #[test]
    fn countdown_reaches_warning_then_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let mut board = TimerBoard::load(&config(dir.path()));
        board.poll();

        board.start_stop_at(3, t0()).unwrap();
        advance(&mut board, 4205);

        let warning = board.thresholds().warning;
        let timer = board.timer(3).unwrap();
        assert_eq!(timer.remaining(), 1200);
        assert_eq!(timer.urgency(warning), Urgency::Warning);

        advance(&mut board, 1200);

        let timer = board.timer(3).unwrap();
        assert_eq!(timer.remaining(), 0);
        assert!(!timer.is_running());
        assert_eq!(timer.urgency(warning), Urgency::Expired);
    }

    #[test]
    fn short_timer_stays_active_after_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let mut board = TimerBoard::load(&config(dir.path()));
        board.poll();

        board.set_duration(7, Some(30)).unwrap();
        let summary = board.start_stop_at(7, t0()).unwrap();
        assert_eq!(summary.available, 49);
        assert_eq!(summary.near_expiry, 1);

        let summary = advance(&mut board, 29).unwrap();
        assert_eq!(board.timer(7).unwrap().remaining(), 1);
        assert_eq!(summary.active, 1);
        assert_eq!(summary.available, 49);

        let summary = board.advance().unwrap();
        assert_eq!(board.timer(7).unwrap().remaining(), 0);
        assert_eq!(board.timer(7).unwrap().state(), State::Expired);
        assert_eq!(summary.active, 1);
        assert_eq!(summary.available, 50);
        assert_eq!(summary.near_expiry, 1);

        let summary = board.reset(7).unwrap();
        assert_eq!(summary.active, 0);
        assert_eq!(summary.near_expiry, 0);
    }

    #[test]
    fn near_expiry_ignores_running() {
        let dir = tempfile::tempdir().unwrap();
        let mut board = TimerBoard::load(&config(dir.path()));

        board.set_duration(1, Some(600)).unwrap();
        board.set_duration(2, Some(601)).unwrap();
        board.set_duration(3, Some(10)).unwrap();
        board.start_stop_at(3, t0()).unwrap();

        assert_eq!(board.status().near_expiry, 2);
    }

    #[test]
    fn pause_and_resume_keep_a_single_tick() {
        let dir = tempfile::tempdir().unwrap();
        let mut board = TimerBoard::load(&config(dir.path()));
        board.poll();

        board.start_stop_at(5, t0()).unwrap();
        board.start_stop_at(5, t0()).unwrap();
        board.start_stop_at(5, t0()).unwrap();
        board.advance();

        assert_eq!(board.timer(5).unwrap().remaining(), 5404);

        advance(&mut board, 10);

        assert_eq!(board.timer(5).unwrap().remaining(), 5394);
    }

    #[test]
    fn reset_while_running_stops_countdown() {
        let dir = tempfile::tempdir().unwrap();
        let mut board = TimerBoard::load(&config(dir.path()));
        board.poll();

        board.start_stop_at(2, t0()).unwrap();
        advance(&mut board, 3);
        board.reset(2).unwrap();
        advance(&mut board, 3);

        let timer = board.timer(2).unwrap();
        assert_eq!(timer.remaining(), 5400);
        assert_eq!(timer.duration(), 5400);
        assert!(!timer.is_running());
        assert_eq!(timer.start_time(), None);
    }

    #[test]
    fn cancelled_or_invalid_duration_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut board = TimerBoard::load(&config(dir.path()));

        board.set_duration(4, None).unwrap();
        board.set_duration(4, Some(0)).unwrap();
        board.set_duration(4, Some(-5)).unwrap();

        assert_eq!(board.timer(4).unwrap().duration(), 5405);
    }

    #[test]
    fn unknown_slot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut board = TimerBoard::load(&config(dir.path()));

        assert!(board.start_stop(0).is_err());
        assert!(board.reset(51).is_err());
        assert!(board.set_duration(99, Some(30)).is_err());
        assert!(board.acknowledge(51).is_err());
    }

    #[test]
    fn acknowledge_through_board() {
        let dir = tempfile::tempdir().unwrap();
        let mut board = TimerBoard::load(&config(dir.path()));
        board.poll();

        board.set_duration(6, Some(1201)).unwrap();
        board.start_stop_at(6, t0()).unwrap();
        board.advance();

        let warning = board.thresholds().warning;
        assert_eq!(board.timer(6).unwrap().ack_marker(warning), Some(false));

        board.acknowledge(6).unwrap();

        assert_eq!(board.timer(6).unwrap().ack_marker(warning), Some(true));
    }

    #[test]
    fn running_timer_resumes_after_restore() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot: Snapshot = [(
            2,
            TimerRecord {
                timer_number: Some(2),
                duration: Some(5405),
                remaining: Some(100),
                running: Some(true),
                start_time: Some(t0()),
            },
        )]
        .into_iter()
        .collect();

        let mut board = TimerBoard::new(&config(dir.path()), snapshot);
        board.poll();
        board.advance();

        let timer = board.timer(2).unwrap();
        assert_eq!(timer.remaining(), 99);
        assert!(timer.is_running());
        assert_eq!(timer.start_time(), Some(t0()));
        assert_eq!(board.timer(1).unwrap().remaining(), 5405);
    }

    #[test]
    fn restore_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let conf = config(dir.path());

        let mut board = TimerBoard::load(&conf);
        board.poll();
        board.set_duration(7, Some(30)).unwrap();
        board.start_stop_at(7, t0()).unwrap();
        board.start_stop_at(9, t0()).unwrap();
        advance(&mut board, 5);
        board.start_stop_at(9, t0()).unwrap();
        board.save().unwrap();

        let restored = TimerBoard::load(&conf);

        for (before, after) in board.timers().iter().zip(restored.timers()) {
            assert_eq!(before.duration(), after.duration());
            assert_eq!(before.remaining(), after.remaining());
            assert_eq!(before.is_running(), after.is_running());
            assert_eq!(before.start_time(), after.start_time());
        }
        assert_eq!(restored.last_snapshot(), board.last_snapshot());
    }

    #[test]
    fn corrupt_snapshot_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let conf = config(dir.path());
        std::fs::write(&conf.state_file_path, "{not json").unwrap();

        let board = TimerBoard::load(&conf);

        assert_eq!(board.timers().len(), 50);
        assert!(board.timers().iter().all(|t| t.remaining() == 5405 && !t.is_running()));
    }

    #[test]
    fn snapshot_is_saved_every_five_minutes() {
        let dir = tempfile::tempdir().unwrap();
        let conf = config(dir.path());
        let mut board = TimerBoard::load(&conf);

        board.poll();
        assert!(conf.state_file_path.exists());

        board.start_stop_at(1, t0()).unwrap();
        std::fs::remove_file(&conf.state_file_path).unwrap();

        advance(&mut board, 299);
        assert!(!conf.state_file_path.exists());

        board.advance();
        let saved = Snapshot::load(&conf.state_file_path).unwrap().unwrap();
        assert_eq!(saved.get(1).unwrap().remaining, Some(5105));
        assert_eq!(saved.len(), 50);
    }

    #[test]
    fn failed_save_keeps_board_running() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let conf = Config {
            state_file_path: blocker.join("board.json"),
            ..config(dir.path())
        };
        let mut board = TimerBoard::load(&conf);

        assert!(board.poll().is_some());
        assert!(board.save().is_err());

        board.start_stop_at(1, t0()).unwrap();
        advance(&mut board, 300);

        assert_eq!(board.timer(1).unwrap().remaining(), 5105);
    }

    #[test]
    fn failed_save_is_retried_next_cadence() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = dir.path().join("state");
        std::fs::write(&state_dir, "").unwrap();

        let conf = Config {
            state_file_path: state_dir.join("board.json"),
            ..config(dir.path())
        };
        let mut board = TimerBoard::load(&conf);

        board.poll();
        assert!(!conf.state_file_path.exists());

        std::fs::remove_file(&state_dir).unwrap();
        std::fs::create_dir(&state_dir).unwrap();

        advance(&mut board, 299);
        assert!(!conf.state_file_path.exists());

        board.advance();
        assert!(conf.state_file_path.exists());
        assert_eq!(Snapshot::load(&conf.state_file_path).unwrap().unwrap().len(), 50);
    }
}
