//! Persisted state of the whole board

use std::collections::BTreeMap;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::debug;
use serde::{Deserialize, Serialize};

/// The persisted state of one timer
///
/// Every field is optional so that older or hand-edited files still load.
/// Missing values are filled in by [`crate::Timer::restore`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimerRecord {
    pub timer_number: Option<u32>,
    pub duration: Option<u64>,
    pub remaining: Option<u64>,
    pub running: Option<bool>,
    pub start_time: Option<DateTime<Local>>,
}

/// A mapping from slot number to the persisted state of that slot's timer
///
/// Serialized as a JSON object keyed by slot number.
/// Snapshots are always written and read whole.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Snapshot {
    timers: BTreeMap<u32, TimerRecord>,
}

impl Snapshot {
    /// Load a snapshot from a JSON file
    ///
    /// Returns `Ok(None)` if the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.try_exists()? {
            return Ok(None);
        }

        let snapshot_str = read_to_string(path)
            .with_context(|| format!("Failed to read snapshot file {}", path.display()))?;
        let snapshot = serde_json::from_str(&snapshot_str)
            .with_context(|| format!("Failed to parse snapshot file {}", path.display()))?;

        Ok(Some(snapshot))
    }

    /// Write this snapshot to a JSON file
    ///
    /// The snapshot goes to a sibling temporary file first, which then
    /// replaces the target, so the target never holds a partial snapshot.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self)
            .with_context(|| "Unable to format snapshot as JSON")?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Unable to create state directory {}", parent.display()))?;
        }

        let tmp_path = temp_path(path);

        std::fs::write(&tmp_path, json)
            .with_context(|| format!("Unable to write snapshot to {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("Unable to replace snapshot at {}", path.display()))?;

        debug!("Saved {} timers to {}", self.timers.len(), path.display());

        Ok(())
    }

    /// Get the record for a slot
    pub fn get(&self, slot: u32) -> Option<&TimerRecord> {
        self.timers.get(&slot)
    }

    /// Set the record for a slot
    pub fn insert(&mut self, slot: u32, record: TimerRecord) {
        self.timers.insert(slot, record);
    }

    /// Iterate over the slot numbers that have a record
    pub fn slots(&self) -> impl Iterator<Item = u32> + '_ {
        self.timers.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

impl FromIterator<(u32, TimerRecord)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (u32, TimerRecord)>>(iter: I) -> Self {
        Self {
            timers: iter.into_iter().collect(),
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");

    path.with_file_name(name)
}
