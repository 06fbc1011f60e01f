//! User training state persistence with file locking.
//!
//! This module holds the user's durable profile (experience, goals,
//! schedule, tested 1RMs) and per-exercise progression bookkeeping, saved
//! as JSON with proper locking and atomic replacement so concurrent
//! processes cannot corrupt it.

use crate::error::{Error, Result};
use crate::types::*;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Per-exercise progression bookkeeping.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct ExerciseProgressionState {
    pub level: u32,
    pub consecutive_shortfalls: u32,
    pub last_weight: f64,
    pub last_leveled_at: Option<DateTime<Utc>>,
}

/// The user's persistent state across sessions.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserTrainingState {
    pub experience: ExperienceLevel,
    #[serde(default)]
    pub goals: GoalWeights,
    #[serde(default)]
    pub split_preference: SplitPreference,
    #[serde(default)]
    pub selected_weekdays: Vec<Weekday>,
    #[serde(default)]
    pub known_one_rep_maxes: BTreeMap<String, f64>,
    #[serde(default)]
    pub exercise_progress: BTreeMap<String, ExerciseProgressionState>,
}

impl Default for UserTrainingState {
    fn default() -> Self {
        Self {
            experience: ExperienceLevel::Beginner,
            goals: GoalWeights::default(),
            split_preference: SplitPreference::Auto,
            selected_weekdays: Vec::new(),
            known_one_rep_maxes: BTreeMap::new(),
            exercise_progress: BTreeMap::new(),
        }
    }
}

impl UserTrainingState {
    /// The snapshot the plan builder embeds in a session plan.
    pub fn snapshot(&self) -> UserSnapshot {
        UserSnapshot {
            experience: self.experience,
            known_one_rep_maxes: self.known_one_rep_maxes.clone(),
        }
    }

    /// The profile the program planner consumes.
    pub fn planner_profile(&self) -> PlannerProfile {
        PlannerProfile {
            experience: self.experience,
            goals: self.goals.clone(),
            split_preference: self.split_preference,
        }
    }

    /// Current levels per exercise, for previous-bests assembly.
    pub fn exercise_levels(&self) -> BTreeMap<String, u32> {
        self.exercise_progress
            .iter()
            .map(|(id, p)| (id.clone(), p.level))
            .collect()
    }

    /// Apply a level-up event from a session result.
    pub fn record_level_up(&mut self, event: &LevelUpEvent, at: DateTime<Utc>) {
        let progress = self
            .exercise_progress
            .entry(event.exercise_id.clone())
            .or_default();
        progress.level = event.to_level;
        progress.last_leveled_at = Some(at);
        tracing::info!(
            "Level up for {}: {} -> {}",
            event.exercise_id,
            event.from_level,
            event.to_level
        );
    }

    /// Load user state from a file with shared locking
    ///
    /// Returns default state if file doesn't exist.
    /// If file is corrupted, logs a warning and returns default state.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No state file found, using default state");
            return Ok(Self::default());
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(
                    "Unable to open state file {:?}: {}. Using defaults.",
                    path,
                    e
                );
                return Ok(Self::default());
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!(
                "Unable to lock state file {:?}: {}. Using defaults.",
                path,
                e
            );
            return Ok(Self::default());
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!(
                "Failed to read state file {:?}: {}. Using defaults.",
                path,
                e
            );
            return Ok(Self::default());
        }

        file.unlock()?;

        match serde_json::from_str::<UserTrainingState>(&contents) {
            Ok(state) => {
                tracing::debug!("Loaded user state from {:?}", path);
                Ok(state)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to parse state file {:?}: {}. Using defaults.",
                    path,
                    e
                );
                Ok(Self::default())
            }
        }
    }

    /// Save user state to a file with exclusive locking
    ///
    /// Atomically writes state by:
    /// 1. Writing to a temp file
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let temp = NamedTempFile::new_in(path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "state path missing parent")
        })?)?;

        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved user state to {:?}", path);
        Ok(())
    }

    /// Load state, modify it, and save it back atomically
    pub fn update<F>(path: &Path, f: F) -> Result<Self>
    where
        F: FnOnce(&mut UserTrainingState) -> Result<()>,
    {
        let mut state = Self::load(path)?;
        f(&mut state)?;
        state.save(path)?;
        Ok(state)
    }
}
