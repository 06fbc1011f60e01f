//! Set-log history loading and previous-bests aggregation.
//!
//! Reads the CSV set-log archive the store appends to, windows it by day,
//! and shapes it for the two consumers: the plan builder (per-exercise
//! session history, newest first) and PR detection (previous bests).

use crate::builder::ExerciseHistory;
use crate::error::Result;
use crate::progression::estimate_1rm;
use crate::types::*;
use chrono::{DateTime, Duration, Utc};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

/// CSV row format for reading the set-log archive.
#[derive(Debug, Deserialize)]
struct CsvRow {
    id: String,
    session_id: String,
    item_id: String,
    exercise_id: String,
    set_index: u32,
    weight: f64,
    reps: u32,
    rpe: Option<f64>,
    planned_weight: f64,
    planned_reps: u32,
    adjustment_applied: Option<String>,
    logged_at: String,
}

impl TryFrom<CsvRow> for SetLogEntry {
    type Error = crate::Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let session_id = Uuid::parse_str(&row.session_id)
            .map(SessionId)
            .map_err(|e| crate::Error::Other(format!("Invalid session UUID: {}", e)))?;
        let item_id = Uuid::parse_str(&row.item_id)
            .map(ItemId)
            .map_err(|e| crate::Error::Other(format!("Invalid item UUID: {}", e)))?;
        let logged_at = DateTime::parse_from_rfc3339(&row.logged_at)
            .map_err(|e| crate::Error::Other(format!("Invalid date: {}", e)))?
            .with_timezone(&Utc);

        Ok(SetLogEntry {
            id: SetLogId(row.id),
            session_id,
            item_id,
            exercise_id: row.exercise_id,
            set_index: row.set_index,
            weight: row.weight,
            reps: row.reps,
            rpe: row.rpe,
            planned_weight: row.planned_weight,
            planned_reps: row.planned_reps,
            adjustment_applied: row.adjustment_applied,
            logged_at,
        })
    }
}

/// Load set logs from the last N days, newest first.
///
/// Unreadable rows are skipped with a warning rather than failing the load.
pub fn load_recent_set_logs(
    csv_path: &Path,
    days: i64,
    now: DateTime<Utc>,
) -> Result<Vec<SetLogEntry>> {
    if !csv_path.exists() {
        return Ok(Vec::new());
    }

    let cutoff = now - Duration::days(days);
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(csv_path)?;

    let mut entries = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        match result {
            Ok(row) => match SetLogEntry::try_from(row) {
                Ok(entry) => {
                    if entry.logged_at >= cutoff {
                        entries.push(entry);
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to parse set-log row: {}", e);
                }
            },
            Err(e) => {
                tracing::warn!("Failed to deserialize set-log row: {}", e);
            }
        }
    }

    entries.sort_by(|a, b| b.logged_at.cmp(&a.logged_at));
    tracing::debug!(
        "Loaded {} set logs from the last {} days",
        entries.len(),
        days
    );
    Ok(entries)
}

/// Group set logs into the shape the plan builder consumes: per exercise,
/// sessions newest first, sets within a session in logged order.
pub fn group_history(entries: &[SetLogEntry]) -> ExerciseHistory {
    // exercise -> session -> sets
    let mut by_exercise: BTreeMap<String, BTreeMap<SessionId, Vec<SetLogEntry>>> =
        BTreeMap::new();
    for entry in entries {
        by_exercise
            .entry(entry.exercise_id.clone())
            .or_default()
            .entry(entry.session_id)
            .or_default()
            .push(entry.clone());
    }

    let mut history = ExerciseHistory::new();
    for (exercise_id, sessions) in by_exercise {
        let mut ordered: Vec<Vec<SetLogEntry>> = sessions.into_values().collect();
        for session in &mut ordered {
            session.sort_by_key(|s| s.set_index);
        }
        // Newest session first, by the latest set it logged
        ordered.sort_by_key(|session| {
            std::cmp::Reverse(session.iter().map(|s| s.logged_at).max())
        });
        history.insert(exercise_id, ordered);
    }
    history
}

/// Aggregate previous bests per exercise for PR detection.
///
/// `levels` carries each exercise's current level from user state; missing
/// entries default to level 0.
pub fn compute_previous_bests(
    entries: &[SetLogEntry],
    levels: &BTreeMap<String, u32>,
) -> BTreeMap<String, PreviousBests> {
    let history = group_history(entries);
    let mut bests = BTreeMap::new();

    for (exercise_id, sessions) in history {
        let all_sets: Vec<&SetLogEntry> = sessions.iter().flatten().collect();
        let max_weight = all_sets.iter().map(|s| s.weight).fold(0.0, f64::max);
        let reps_at_near_max = if max_weight > 0.0 {
            all_sets
                .iter()
                .filter(|s| s.weight >= max_weight * 0.9)
                .map(|s| s.reps)
                .max()
                .unwrap_or(0)
        } else {
            0
        };
        let best_e1rm = all_sets
            .iter()
            .map(|s| estimate_1rm(s.weight, s.reps))
            .fold(0.0, f64::max);
        let best_session_volume = sessions
            .iter()
            .map(|session| session.iter().map(|s| s.weight * s.reps as f64).sum())
            .fold(0.0, f64::max);

        bests.insert(
            exercise_id.clone(),
            PreviousBests {
                max_weight,
                reps_at_near_max,
                best_e1rm,
                best_session_volume,
                level: levels.get(&exercise_id).copied().unwrap_or(0),
            },
        );
    }
    bests
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 18, 0, 0).unwrap()
    }

    fn entry(
        session_id: SessionId,
        item_id: ItemId,
        set_index: u32,
        weight: f64,
        reps: u32,
        days_ago: i64,
    ) -> SetLogEntry {
        SetLogEntry {
            id: SetLogId::derive(item_id, set_index),
            session_id,
            item_id,
            exercise_id: "bench_press".into(),
            set_index,
            weight,
            reps,
            rpe: Some(7.0),
            planned_weight: weight,
            planned_reps: reps,
            adjustment_applied: None,
            logged_at: fixed_now() - Duration::days(days_ago),
        }
    }

    fn write_csv(dir: &Path, entries: &[SetLogEntry]) -> std::path::PathBuf {
        // Reuse the store's writer so the formats cannot drift apart
        use crate::sync::PersistenceStore;
        let mut store = crate::store::FileStore::open(dir).unwrap();
        for e in entries {
            store.insert_set_log(e).unwrap();
        }
        store.set_log_path().to_path_buf()
    }

    #[test]
    fn test_roundtrip_through_csv() {
        let dir = tempfile::tempdir().unwrap();
        let session_id = SessionId::new();
        let item_id = ItemId::new();
        let entries = vec![
            entry(session_id, item_id, 1, 60.0, 5, 1),
            entry(session_id, item_id, 2, 62.5, 4, 1),
        ];
        let csv_path = write_csv(dir.path(), &entries);

        let loaded = load_recent_set_logs(&csv_path, 7, fixed_now()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.iter().any(|e| e.weight == 62.5 && e.reps == 4));
        assert!(loaded.iter().all(|e| e.session_id == session_id));
    }

    #[test]
    fn test_day_window_excludes_old_entries() {
        let dir = tempfile::tempdir().unwrap();
        let s1 = SessionId::new();
        let s2 = SessionId::new();
        let entries = vec![
            entry(s1, ItemId::new(), 1, 60.0, 5, 2),
            entry(s2, ItemId::new(), 1, 55.0, 5, 30),
        ];
        let csv_path = write_csv(dir.path(), &entries);

        let loaded = load_recent_set_logs(&csv_path, 7, fixed_now()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].weight, 60.0);
    }

    #[test]
    fn test_missing_csv_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded =
            load_recent_set_logs(&dir.path().join("missing.csv"), 7, fixed_now()).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_group_history_orders_sessions_newest_first() {
        let old_session = SessionId::new();
        let new_session = SessionId::new();
        let old_item = ItemId::new();
        let new_item = ItemId::new();
        let entries = vec![
            entry(old_session, old_item, 1, 50.0, 8, 5),
            entry(new_session, new_item, 1, 60.0, 5, 1),
            entry(new_session, new_item, 2, 60.0, 5, 1),
        ];

        let history = group_history(&entries);
        let sessions = &history["bench_press"];
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].len(), 2);
        assert_eq!(sessions[0][0].weight, 60.0);
        assert_eq!(sessions[1][0].weight, 50.0);
    }

    #[test]
    fn test_sets_within_session_ordered_by_index() {
        let session_id = SessionId::new();
        let item_id = ItemId::new();
        let entries = vec![
            entry(session_id, item_id, 3, 60.0, 3, 1),
            entry(session_id, item_id, 1, 60.0, 5, 1),
            entry(session_id, item_id, 2, 60.0, 4, 1),
        ];
        let history = group_history(&entries);
        let indices: Vec<u32> = history["bench_press"][0].iter().map(|s| s.set_index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_previous_bests_aggregation() {
        let s1 = SessionId::new();
        let s2 = SessionId::new();
        let i1 = ItemId::new();
        let i2 = ItemId::new();
        let entries = vec![
            // Older session: heavier single
            entry(s1, i1, 1, 100.0, 2, 5),
            entry(s1, i1, 2, 90.0, 5, 5),
            // Newer session: more volume
            entry(s2, i2, 1, 80.0, 8, 1),
            entry(s2, i2, 2, 80.0, 8, 1),
        ];

        let bests = compute_previous_bests(&entries, &BTreeMap::new());
        let bench = &bests["bench_press"];
        assert_eq!(bench.max_weight, 100.0);
        // Sets at >= 90 kg: 100x2 and 90x5
        assert_eq!(bench.reps_at_near_max, 5);
        // 90x5 -> 105, 100x2 -> 106.7, 80x8 -> 101.3
        assert!((bench.best_e1rm - 106.666).abs() < 0.01);
        // Session volumes: 650 vs 1280
        assert_eq!(bench.best_session_volume, 1280.0);
        assert_eq!(bench.level, 0);
    }

    #[test]
    fn test_previous_bests_use_supplied_levels() {
        let entries = vec![entry(SessionId::new(), ItemId::new(), 1, 60.0, 5, 1)];
        let mut levels = BTreeMap::new();
        levels.insert("bench_press".to_string(), 7);
        let bests = compute_previous_bests(&entries, &levels);
        assert_eq!(bests["bench_press"].level, 7);
    }
}
