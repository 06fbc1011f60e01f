//! Session runtime state machine.
//!
//! Executes a `SessionPlan` interactively: logging sets, consulting the
//! autoregulation engine, skipping and advancing exercises, adapting the
//! remainder of the session under time pressure or fatigue, and ending the
//! session with PR detection.
//!
//! Every transition is a pure function: it takes a state (plus the caller's
//! clock) and returns a new state. Nothing here mutates shared data or
//! reads the wall clock itself.

use crate::autoregulation::{
    self, apply_autoregulation, detect_session_fatigue, AutoregulationInput,
};
use crate::error::{Error, Result};
use crate::types::*;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Trace rule ids for runtime-level (non-autoregulation) decisions.
const RULE_EXERCISE_SKIPPED: &str = "EXERCISE_SKIPPED";
const RULE_TIME_PRESSURE: &str = "TIME_PRESSURE";
const RULE_FATIGUE_TRUNCATION: &str = "FATIGUE_TRUNCATION";

/// Cross-cutting triggers handled outside normal set logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdaptTrigger {
    TimePressure,
    Fatigue,
}

/// Seed runtime state from a plan.
///
/// Each planned exercise gets a fresh `ItemId`. These are the real
/// persistence keys: the client generates them once and every downstream
/// payload (offline operations, store writes) carries them verbatim.
pub fn initialize_runtime(
    plan: &SessionPlan,
    session_id: SessionId,
    started_at: DateTime<Utc>,
) -> SessionRuntimeState {
    let mut exercises = BTreeMap::new();
    let mut exercise_order = Vec::new();

    for planned in &plan.exercises {
        exercise_order.push(planned.exercise_id.clone());
        exercises.insert(
            planned.exercise_id.clone(),
            ExerciseRuntimeState {
                exercise_id: planned.exercise_id.clone(),
                item_id: ItemId::new(),
                status: ExerciseStatus::Pending,
                tier: planned.tier,
                bodyweight_only: planned.sets.iter().all(|s| s.suggested_weight == 0.0),
                planned_sets: planned.sets.clone(),
                completed_sets: 0,
                next_set_index: 1,
                pending_adjustments: BTreeMap::new(),
                skip_reason: None,
            },
        );
    }

    tracing::info!(
        "Initialized session {} with {} exercises",
        session_id,
        exercise_order.len()
    );

    SessionRuntimeState {
        session_id,
        template_id: plan.template_id.clone(),
        grouping_style: plan.grouping_style,
        started_at,
        status: SessionStatus::Active,
        cursor: 0,
        exercise_order,
        exercises,
        set_log: Vec::new(),
        adaptation_trace: Vec::new(),
        time_budget_minutes: plan.constraints.time_budget_minutes,
    }
}

/// Restore a previously serialized runtime state and make it active again.
pub fn resume_runtime(snapshot: SessionRuntimeState) -> Result<SessionRuntimeState> {
    match snapshot.status {
        SessionStatus::Completed => Err(Error::State(
            "Cannot resume a completed session".to_string(),
        )),
        _ => Ok(SessionRuntimeState {
            status: SessionStatus::Active,
            ..snapshot
        }),
    }
}

/// Pause an active session.
pub fn pause_session(state: &SessionRuntimeState) -> SessionRuntimeState {
    SessionRuntimeState {
        status: SessionStatus::Paused,
        ..state.clone()
    }
}

/// Log one completed set for an exercise.
///
/// Returns the new state and, when more sets remain and an RPE was
/// supplied, the autoregulation adjustment computed for the next set.
pub fn log_set(
    state: &SessionRuntimeState,
    exercise_id: &str,
    record: &SetRecord,
    at: DateTime<Utc>,
) -> Result<(SessionRuntimeState, Option<AutoregulationAdjustment>)> {
    if state.status != SessionStatus::Active {
        return Err(Error::State(format!(
            "Cannot log sets while session is {:?}",
            state.status
        )));
    }

    let exercise = state
        .exercises
        .get(exercise_id)
        .ok_or_else(|| Error::State(format!("Unknown exercise '{}'", exercise_id)))?;

    if matches!(
        exercise.status,
        ExerciseStatus::Skipped | ExerciseStatus::Completed
    ) {
        return Err(Error::State(format!(
            "Exercise '{}' is already {:?}",
            exercise_id, exercise.status
        )));
    }

    let planned = exercise
        .planned_sets
        .get(record.set_index as usize - 1)
        .cloned();
    let (planned_weight, planned_reps) = planned
        .as_ref()
        .map(|p| (p.suggested_weight, p.target_reps))
        .unwrap_or((record.weight, record.reps));

    let applied_rule = exercise
        .pending_adjustments
        .get(&record.set_index)
        .map(|a| a.rule_id.clone());

    let entry = SetLogEntry {
        id: SetLogId::derive(exercise.item_id, record.set_index),
        session_id: state.session_id,
        item_id: exercise.item_id,
        exercise_id: exercise_id.to_string(),
        set_index: record.set_index,
        weight: record.weight.max(0.0),
        reps: record.reps,
        rpe: record.rpe,
        planned_weight,
        planned_reps,
        adjustment_applied: applied_rule,
        logged_at: at,
    };

    let mut new_state = state.clone();
    let prior_sets: Vec<SetLogEntry> = new_state
        .set_log
        .iter()
        .filter(|s| s.exercise_id == exercise_id)
        .cloned()
        .collect();
    new_state.set_log.push(entry);

    let planned_count = exercise.planned_sets.len() as u32;
    let completed = exercise.completed_sets + 1;
    let more_sets_remain = completed < planned_count;

    let mut adjustment_out = None;
    {
        let ex = new_state
            .exercises
            .get_mut(exercise_id)
            .ok_or_else(|| Error::State(format!("Unknown exercise '{}'", exercise_id)))?;
        ex.completed_sets = completed;
        ex.next_set_index = record.set_index + 1;
        ex.status = if more_sets_remain {
            ExerciseStatus::InProgress
        } else {
            ExerciseStatus::Completed
        };

        if more_sets_remain && record.rpe.is_some() {
            let input = AutoregulationInput {
                set_index: record.set_index,
                actual_weight: record.weight,
                actual_reps: record.reps,
                target_reps: planned_reps,
                rpe: record.rpe,
                prior_sets: &prior_sets,
                bodyweight_only: ex.bodyweight_only,
            };
            let outcome = apply_autoregulation(&input);
            if let Some(adjustment) = outcome.adjustment {
                let next_index = record.set_index + 1;
                tracing::debug!(
                    "Autoregulation {} for {} set {}: {}",
                    adjustment.rule_id,
                    exercise_id,
                    next_index,
                    adjustment.message
                );
                ex.pending_adjustments
                    .insert(next_index, adjustment.clone());
                new_state.adaptation_trace.push(AdaptationTraceEntry {
                    at,
                    exercise_id: Some(exercise_id.to_string()),
                    set_index: Some(next_index),
                    rule_id: adjustment.rule_id.clone(),
                    message: adjustment.message.clone(),
                    confidence: adjustment.confidence,
                });
                adjustment_out = Some(adjustment);
            }
        }
    }

    Ok((new_state, adjustment_out))
}

/// Move the cursor to the next exercise, marking the outgoing one completed
/// if it logged any sets.
pub fn advance_exercise(state: &SessionRuntimeState) -> SessionRuntimeState {
    let mut new_state = state.clone();
    if let Some(current_id) = state.exercise_order.get(state.cursor) {
        if let Some(ex) = new_state.exercises.get_mut(current_id) {
            if ex.status == ExerciseStatus::InProgress && ex.completed_sets > 0 {
                ex.status = ExerciseStatus::Completed;
            }
        }
    }
    new_state.cursor = (state.cursor + 1).min(state.exercise_order.len());
    new_state
}

/// Skip an exercise with a reason. Terminal for that exercise.
pub fn skip_exercise(
    state: &SessionRuntimeState,
    exercise_id: &str,
    reason: &str,
    at: DateTime<Utc>,
) -> Result<SessionRuntimeState> {
    let mut new_state = state.clone();
    let ex = new_state
        .exercises
        .get_mut(exercise_id)
        .ok_or_else(|| Error::State(format!("Unknown exercise '{}'", exercise_id)))?;

    if ex.status == ExerciseStatus::Completed {
        return Err(Error::State(format!(
            "Cannot skip completed exercise '{}'",
            exercise_id
        )));
    }

    ex.status = ExerciseStatus::Skipped;
    ex.skip_reason = Some(reason.to_string());

    new_state.adaptation_trace.push(AdaptationTraceEntry {
        at,
        exercise_id: Some(exercise_id.to_string()),
        set_index: None,
        rule_id: RULE_EXERCISE_SKIPPED.to_string(),
        message: format!("Skipped: {}", reason),
        confidence: 1.0,
    });

    // If the skipped exercise is the current one, move on
    if state.exercise_order.get(state.cursor).map(String::as_str) == Some(exercise_id) {
        new_state.cursor = (state.cursor + 1).min(state.exercise_order.len());
    }

    tracing::info!("Skipped exercise '{}': {}", exercise_id, reason);
    Ok(new_state)
}

/// Apply any pending adjustment to a planned set.
///
/// Weight: multiplier first, then additive delta, rounded to 0.5 and
/// clamped at 0. Target reps: delta clamped so at least 1 rep remains.
/// Returns the adjusted parameters and whether an adjustment was applied.
pub fn get_adjusted_set_params(
    exercise: &ExerciseRuntimeState,
    set: &PlannedSet,
) -> (PlannedSet, bool) {
    let Some(adjustment) = exercise.pending_adjustments.get(&set.index) else {
        return (set.clone(), false);
    };

    let mut weight = set.suggested_weight;
    if let Some(multiplier) = adjustment.weight_multiplier {
        weight *= multiplier;
    }
    if let Some(delta) = adjustment.weight_delta {
        weight += delta;
    }
    let weight = ((weight * 2.0).round() / 2.0).max(0.0);

    let reps = match adjustment.target_rep_delta {
        Some(delta) => (set.target_reps as i64 + i64::from(delta)).max(1) as u32,
        None => set.target_reps,
    };

    let rest_seconds = set.rest_seconds;
    (
        PlannedSet {
            index: set.index,
            target_reps: reps,
            suggested_weight: weight,
            rest_seconds,
        },
        true,
    )
}

/// Minutes an exercise still needs, scaled by its remaining sets.
fn remaining_minutes(ex: &ExerciseRuntimeState) -> u32 {
    let planned = ex.planned_sets.len() as u32;
    if planned == 0 {
        return 0;
    }
    let remaining = planned.saturating_sub(ex.completed_sets);
    // Round up so partially done exercises still count
    (ex.tier.estimated_minutes() * remaining).div_ceil(planned)
}

fn estimate_remaining_minutes(state: &SessionRuntimeState) -> u32 {
    state
        .exercises
        .values()
        .filter(|ex| {
            matches!(
                ex.status,
                ExerciseStatus::Pending | ExerciseStatus::InProgress
            )
        })
        .map(remaining_minutes)
        .sum()
}

/// Adapt the remainder of the session to a cross-cutting trigger.
///
/// Time pressure drops the lowest-priority pending exercises until the
/// remaining estimate fits the budget, then trims isolation work to 1 set
/// and accessory work to 2. Fatigue proportionally truncates remaining
/// sets: above 0.7 fatigue half of the remaining sets are kept, between
/// 0.5 and 0.7 seventy percent are kept.
pub fn adapt_session(
    state: &SessionRuntimeState,
    trigger: AdaptTrigger,
    at: DateTime<Utc>,
) -> SessionRuntimeState {
    match trigger {
        AdaptTrigger::TimePressure => adapt_time_pressure(state, at),
        AdaptTrigger::Fatigue => adapt_fatigue(state, at),
    }
}

fn adapt_time_pressure(state: &SessionRuntimeState, at: DateTime<Utc>) -> SessionRuntimeState {
    let elapsed_minutes = (at - state.started_at).num_minutes().max(0) as u32;
    let budget = state.time_budget_minutes.saturating_sub(elapsed_minutes);

    let mut new_state = state.clone();

    // Drop lowest-priority pending exercises until the estimate fits
    while estimate_remaining_minutes(&new_state) > budget {
        let victim = new_state
            .exercises
            .values()
            .filter(|ex| ex.status == ExerciseStatus::Pending)
            .max_by_key(|ex| {
                let order = new_state
                    .exercise_order
                    .iter()
                    .position(|id| id == &ex.exercise_id)
                    .unwrap_or(0);
                (ex.tier, order)
            })
            .map(|ex| ex.exercise_id.clone());
        let Some(victim_id) = victim else { break };

        if let Some(ex) = new_state.exercises.get_mut(&victim_id) {
            ex.status = ExerciseStatus::Skipped;
            ex.skip_reason = Some("time pressure".to_string());
        }
        new_state.adaptation_trace.push(AdaptationTraceEntry {
            at,
            exercise_id: Some(victim_id.clone()),
            set_index: None,
            rule_id: RULE_TIME_PRESSURE.to_string(),
            message: "Dropped to fit the remaining time budget".to_string(),
            confidence: 0.9,
        });
        tracing::info!("Time pressure: dropped '{}'", victim_id);
    }

    // Still over: trim set counts on what remains
    if estimate_remaining_minutes(&new_state) > budget {
        let trims: Vec<(String, usize)> = new_state
            .exercises
            .values()
            .filter(|ex| {
                matches!(
                    ex.status,
                    ExerciseStatus::Pending | ExerciseStatus::InProgress
                )
            })
            .filter_map(|ex| {
                let cap = match ex.tier {
                    PriorityTier::Isolation => 1,
                    PriorityTier::Accessory => 2,
                    PriorityTier::Primary => return None,
                };
                let keep = cap.max(ex.completed_sets as usize);
                (ex.planned_sets.len() > keep).then(|| (ex.exercise_id.clone(), keep))
            })
            .collect();

        for (exercise_id, keep) in trims {
            if let Some(ex) = new_state.exercises.get_mut(&exercise_id) {
                ex.planned_sets.truncate(keep);
                if ex.completed_sets >= ex.planned_sets.len() as u32 {
                    ex.status = ExerciseStatus::Completed;
                }
            }
            new_state.adaptation_trace.push(AdaptationTraceEntry {
                at,
                exercise_id: Some(exercise_id),
                set_index: None,
                rule_id: RULE_TIME_PRESSURE.to_string(),
                message: format!("Trimmed to {} sets to fit the time budget", keep),
                confidence: 0.8,
            });
        }
    }

    new_state
}

fn adapt_fatigue(state: &SessionRuntimeState, at: DateTime<Utc>) -> SessionRuntimeState {
    let session_score = detect_session_fatigue(&state.set_log).score;
    let mut new_state = state.clone();

    let targets: Vec<(String, f64)> = state
        .exercises
        .values()
        .filter(|ex| {
            matches!(
                ex.status,
                ExerciseStatus::Pending | ExerciseStatus::InProgress
            )
        })
        .map(|ex| {
            let own_sets: Vec<SetLogEntry> = state
                .set_log
                .iter()
                .filter(|s| s.exercise_id == ex.exercise_id)
                .cloned()
                .collect();
            let own_score = detect_session_fatigue(&own_sets).score;
            (ex.exercise_id.clone(), own_score.max(session_score))
        })
        .filter(|(_, score)| *score > 0.5)
        .collect();

    for (exercise_id, score) in targets {
        let keep_fraction = if score > 0.7 { 0.5 } else { 0.7 };
        if let Some(ex) = new_state.exercises.get_mut(&exercise_id) {
            let planned = ex.planned_sets.len() as u32;
            let remaining = planned.saturating_sub(ex.completed_sets);
            if remaining == 0 {
                continue;
            }
            let keep = ((remaining as f64 * keep_fraction).ceil() as u32).max(1);
            let new_len = (ex.completed_sets + keep) as usize;
            if new_len < ex.planned_sets.len() {
                ex.planned_sets.truncate(new_len);
                new_state.adaptation_trace.push(AdaptationTraceEntry {
                    at,
                    exercise_id: Some(exercise_id.clone()),
                    set_index: None,
                    rule_id: RULE_FATIGUE_TRUNCATION.to_string(),
                    message: format!(
                        "Fatigue {:.2}: keeping {} of {} remaining sets",
                        score, keep, remaining
                    ),
                    confidence: 0.8,
                });
                tracing::info!(
                    "Fatigue adaptation for '{}': {} -> {} planned sets",
                    exercise_id,
                    planned,
                    new_len
                );
            }
        }
    }

    new_state
}

/// End the session: compute totals, detect PRs against supplied previous
/// bests (strict exceedance only), and return the full adaptation trace.
pub fn end_session(
    state: &SessionRuntimeState,
    previous_bests: &BTreeMap<String, PreviousBests>,
    ended_at: DateTime<Utc>,
) -> SessionRuntimeResult {
    let duration_seconds = (ended_at - state.started_at).num_seconds().max(0) as u64;

    let mut exercises_completed = 0;
    let mut exercises_skipped = 0;
    for ex in state.exercises.values() {
        match ex.status {
            ExerciseStatus::Completed => exercises_completed += 1,
            ExerciseStatus::InProgress if ex.completed_sets > 0 => exercises_completed += 1,
            ExerciseStatus::Skipped => exercises_skipped += 1,
            _ => {}
        }
    }

    let total_sets = state.set_log.len() as u32;
    let total_volume: f64 = state
        .set_log
        .iter()
        .map(|s| s.weight * s.reps as f64)
        .sum();

    let mut personal_records = Vec::new();
    let mut level_ups = Vec::new();

    for exercise_id in &state.exercise_order {
        let sets: Vec<&SetLogEntry> = state
            .set_log
            .iter()
            .filter(|s| &s.exercise_id == exercise_id)
            .collect();
        if sets.is_empty() {
            continue;
        }
        let bests = previous_bests.get(exercise_id).cloned().unwrap_or_default();
        let prs = detect_prs(exercise_id, &sets, &bests);
        if !prs.is_empty() {
            level_ups.push(LevelUpEvent {
                exercise_id: exercise_id.clone(),
                from_level: bests.level,
                to_level: bests.level + 1,
            });
            personal_records.extend(prs);
        }
    }

    tracing::info!(
        "Ended session {}: {} sets, {:.0} kg total volume, {} PRs",
        state.session_id,
        total_sets,
        total_volume,
        personal_records.len()
    );

    SessionRuntimeResult {
        session_id: state.session_id,
        started_at: state.started_at,
        ended_at,
        duration_seconds,
        exercises_completed,
        exercises_skipped,
        total_sets,
        total_volume,
        personal_records,
        level_ups,
        adaptation_trace: state.adaptation_trace.clone(),
    }
}

/// Weight fraction of the previous best that still counts as "near max".
const NEAR_MAX_FRACTION: f64 = 0.9;

fn detect_prs(
    exercise_id: &str,
    sets: &[&SetLogEntry],
    bests: &PreviousBests,
) -> Vec<PersonalRecord> {
    let mut out = Vec::new();

    let max_weight = sets.iter().map(|s| s.weight).fold(0.0, f64::max);
    if max_weight > bests.max_weight {
        out.push(PersonalRecord {
            exercise_id: exercise_id.to_string(),
            kind: PrKind::MaxWeight,
            previous: bests.max_weight,
            achieved: max_weight,
        });
    }

    if bests.max_weight > 0.0 {
        let reps_near_max = sets
            .iter()
            .filter(|s| s.weight >= bests.max_weight * NEAR_MAX_FRACTION)
            .map(|s| s.reps)
            .max()
            .unwrap_or(0);
        if reps_near_max > bests.reps_at_near_max {
            out.push(PersonalRecord {
                exercise_id: exercise_id.to_string(),
                kind: PrKind::RepsNearMaxWeight,
                previous: f64::from(bests.reps_at_near_max),
                achieved: f64::from(reps_near_max),
            });
        }
    }

    let best_e1rm = sets
        .iter()
        .map(|s| crate::progression::estimate_1rm(s.weight, s.reps))
        .fold(0.0, f64::max);
    if best_e1rm > bests.best_e1rm {
        out.push(PersonalRecord {
            exercise_id: exercise_id.to_string(),
            kind: PrKind::EstimatedOneRm,
            previous: bests.best_e1rm,
            achieved: best_e1rm,
        });
    }

    let volume: f64 = sets.iter().map(|s| s.weight * s.reps as f64).sum();
    if volume > bests.best_session_volume {
        out.push(PersonalRecord {
            exercise_id: exercise_id.to_string(),
            kind: PrKind::SessionVolume,
            previous: bests.best_session_volume,
            achieved: volume,
        });
    }

    out
}

/// Convenience: session fatigue assessment for the current log.
pub fn session_fatigue(state: &SessionRuntimeState) -> autoregulation::FatigueAssessment {
    detect_session_fatigue(&state.set_log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autoregulation::rule_ids;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 18, 0, 0).unwrap()
    }

    fn planned_sets(count: u32, reps: u32, weight: f64) -> Vec<PlannedSet> {
        (1..=count)
            .map(|index| PlannedSet {
                index,
                target_reps: reps,
                suggested_weight: weight,
                rest_seconds: 120,
            })
            .collect()
    }

    fn planned_exercise(
        id: &str,
        tier: PriorityTier,
        sets: u32,
        reps: u32,
        weight: f64,
    ) -> PlannedExercise {
        PlannedExercise {
            exercise_id: id.into(),
            name: id.into(),
            order: 0,
            tier,
            intents: vec![MovementIntent::HorizontalPress],
            rep_range: (reps.saturating_sub(2).max(1), reps),
            sets: planned_sets(sets, reps, weight),
            trace: DecisionTrace::default(),
        }
    }

    fn test_plan() -> SessionPlan {
        SessionPlan {
            template_id: "push_day".into(),
            label: None,
            goals: GoalWeights::single(Goal::BuildStrength),
            constraints: TrainingConstraints {
                time_budget_minutes: 45,
                ..Default::default()
            },
            user: UserSnapshot::default(),
            grouping_style: GroupingStyle::StraightSets,
            exercises: vec![
                planned_exercise("bench_press", PriorityTier::Primary, 3, 5, 60.0),
                planned_exercise("overhead_press", PriorityTier::Accessory, 3, 8, 40.0),
                planned_exercise("lateral_raise", PriorityTier::Isolation, 3, 12, 8.0),
            ],
            estimated_duration_minutes: 26,
            created_at: fixed_now(),
        }
    }

    fn active_state() -> SessionRuntimeState {
        initialize_runtime(&test_plan(), SessionId::new(), fixed_now())
    }

    fn record(set_index: u32, weight: f64, reps: u32, rpe: Option<f64>) -> SetRecord {
        SetRecord {
            set_index,
            weight,
            reps,
            rpe,
        }
    }

    #[test]
    fn test_initialize_seeds_pending_exercises() {
        let state = active_state();
        assert_eq!(state.status, SessionStatus::Active);
        assert_eq!(state.exercises.len(), 3);
        for ex in state.exercises.values() {
            assert_eq!(ex.status, ExerciseStatus::Pending);
            assert_eq!(ex.next_set_index, 1);
            assert_eq!(ex.completed_sets, 0);
        }
    }

    #[test]
    fn test_item_ids_are_unique_per_exercise() {
        let state = active_state();
        let ids: std::collections::HashSet<ItemId> =
            state.exercises.values().map(|e| e.item_id).collect();
        assert_eq!(ids.len(), state.exercises.len());
    }

    #[test]
    fn test_log_set_appends_and_marks_in_progress() {
        let state = active_state();
        let (state, _) = log_set(
            &state,
            "bench_press",
            &record(1, 60.0, 5, Some(7.0)),
            fixed_now(),
        )
        .unwrap();

        assert_eq!(state.set_log.len(), 1);
        let ex = &state.exercises["bench_press"];
        assert_eq!(ex.status, ExerciseStatus::InProgress);
        assert_eq!(ex.completed_sets, 1);
        assert_eq!(ex.next_set_index, 2);
        // The log entry carries the real item id and a derived set-log id
        assert_eq!(state.set_log[0].item_id, ex.item_id);
        assert_eq!(state.set_log[0].id, SetLogId::derive(ex.item_id, 1));
    }

    #[test]
    fn test_log_set_is_pure() {
        let state = active_state();
        let before = state.clone();
        let _ = log_set(
            &state,
            "bench_press",
            &record(1, 60.0, 5, Some(7.0)),
            fixed_now(),
        )
        .unwrap();
        assert_eq!(state, before);
    }

    #[test]
    fn test_exercise_completes_after_all_sets() {
        let mut state = active_state();
        for i in 1..=3 {
            let (next, _) = log_set(
                &state,
                "bench_press",
                &record(i, 60.0, 5, Some(7.0)),
                fixed_now(),
            )
            .unwrap();
            state = next;
        }
        assert_eq!(
            state.exercises["bench_press"].status,
            ExerciseStatus::Completed
        );
    }

    #[test]
    fn test_first_set_rpe_ten_schedules_adjustment() {
        let state = active_state();
        let (state, adjustment) = log_set(
            &state,
            "bench_press",
            &record(1, 60.0, 5, Some(10.0)),
            fixed_now(),
        )
        .unwrap();

        let adjustment = adjustment.unwrap();
        assert_eq!(adjustment.rule_id, rule_ids::FIRST_SET_VERY_HIGH_RPE);
        assert_eq!(adjustment.weight_multiplier, Some(0.9));

        let ex = &state.exercises["bench_press"];
        assert!(ex.pending_adjustments.contains_key(&2));
        assert_eq!(state.adaptation_trace.len(), 1);
        assert_eq!(
            state.adaptation_trace[0].rule_id,
            rule_ids::FIRST_SET_VERY_HIGH_RPE
        );
    }

    #[test]
    fn test_no_autoregulation_on_final_set() {
        let mut state = active_state();
        for i in 1..=2 {
            let (next, _) = log_set(
                &state,
                "bench_press",
                &record(i, 60.0, 5, Some(7.0)),
                fixed_now(),
            )
            .unwrap();
            state = next;
        }
        let (_, adjustment) = log_set(
            &state,
            "bench_press",
            &record(3, 60.0, 5, Some(10.0)),
            fixed_now(),
        )
        .unwrap();
        assert!(adjustment.is_none());
    }

    #[test]
    fn test_missing_rpe_never_schedules_adjustment() {
        let state = active_state();
        let (state, adjustment) = log_set(
            &state,
            "bench_press",
            &record(1, 60.0, 5, None),
            fixed_now(),
        )
        .unwrap();
        assert!(adjustment.is_none());
        assert!(state.adaptation_trace.is_empty());
    }

    #[test]
    fn test_adjusted_set_params_multiplier_then_delta() {
        let mut ex = active_state().exercises["bench_press"].clone();
        ex.pending_adjustments.insert(
            2,
            AutoregulationAdjustment {
                rule_id: rule_ids::HIGH_RPE.to_string(),
                weight_multiplier: Some(0.95),
                weight_delta: Some(-1.0),
                target_rep_delta: Some(-2),
                skip_remaining_sets: false,
                message: "test".into(),
                confidence: 0.8,
            },
        );
        let planned = PlannedSet {
            index: 2,
            target_reps: 5,
            suggested_weight: 60.0,
            rest_seconds: 120,
        };
        let (adjusted, applied) = get_adjusted_set_params(&ex, &planned);
        assert!(applied);
        // 60 * 0.95 - 1 = 56, rounded to 0.5
        assert_eq!(adjusted.suggested_weight, 56.0);
        assert_eq!(adjusted.target_reps, 3);
    }

    #[test]
    fn test_adjusted_params_clamp_weight_and_reps() {
        let mut ex = active_state().exercises["bench_press"].clone();
        ex.pending_adjustments.insert(
            1,
            AutoregulationAdjustment {
                rule_id: rule_ids::VERY_HIGH_RPE.to_string(),
                weight_multiplier: Some(0.5),
                weight_delta: Some(-100.0),
                target_rep_delta: Some(-20),
                skip_remaining_sets: false,
                message: "test".into(),
                confidence: 0.9,
            },
        );
        let planned = PlannedSet {
            index: 1,
            target_reps: 5,
            suggested_weight: 60.0,
            rest_seconds: 120,
        };
        let (adjusted, applied) = get_adjusted_set_params(&ex, &planned);
        assert!(applied);
        assert_eq!(adjusted.suggested_weight, 0.0);
        assert_eq!(adjusted.target_reps, 1);
    }

    #[test]
    fn test_no_pending_adjustment_returns_plan_unchanged() {
        let ex = active_state().exercises["bench_press"].clone();
        let planned = ex.planned_sets[0].clone();
        let (adjusted, applied) = get_adjusted_set_params(&ex, &planned);
        assert!(!applied);
        assert_eq!(adjusted, planned);
    }

    #[test]
    fn test_advance_marks_started_exercise_completed() {
        let state = active_state();
        let (state, _) = log_set(
            &state,
            "bench_press",
            &record(1, 60.0, 5, Some(7.0)),
            fixed_now(),
        )
        .unwrap();
        let state = advance_exercise(&state);
        assert_eq!(state.cursor, 1);
        assert_eq!(
            state.exercises["bench_press"].status,
            ExerciseStatus::Completed
        );
    }

    #[test]
    fn test_advance_leaves_untouched_exercise_pending() {
        let state = active_state();
        let state = advance_exercise(&state);
        assert_eq!(state.cursor, 1);
        assert_eq!(
            state.exercises["bench_press"].status,
            ExerciseStatus::Pending
        );
    }

    #[test]
    fn test_skip_records_reason_and_trace() {
        let state = active_state();
        let state = skip_exercise(&state, "overhead_press", "shoulder twinge", fixed_now())
            .unwrap();
        let ex = &state.exercises["overhead_press"];
        assert_eq!(ex.status, ExerciseStatus::Skipped);
        assert_eq!(ex.skip_reason.as_deref(), Some("shoulder twinge"));
        assert!(state
            .adaptation_trace
            .iter()
            .any(|t| t.rule_id == RULE_EXERCISE_SKIPPED));
    }

    #[test]
    fn test_cannot_log_into_skipped_exercise() {
        let state = active_state();
        let state = skip_exercise(&state, "bench_press", "not today", fixed_now()).unwrap();
        let err = log_set(
            &state,
            "bench_press",
            &record(1, 60.0, 5, None),
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::State(_)));
    }

    #[test]
    fn test_cannot_log_while_paused() {
        let state = pause_session(&active_state());
        let err = log_set(
            &state,
            "bench_press",
            &record(1, 60.0, 5, None),
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::State(_)));
    }

    #[test]
    fn test_resume_completed_session_fails() {
        let mut state = active_state();
        state.status = SessionStatus::Completed;
        assert!(resume_runtime(state).is_err());
    }

    #[test]
    fn test_time_pressure_drops_isolation_first() {
        let state = active_state();
        // 1 minute before the 45-minute budget expires
        let late = fixed_now() + chrono::Duration::minutes(44);
        let adapted = adapt_session(&state, AdaptTrigger::TimePressure, late);

        assert_eq!(
            adapted.exercises["lateral_raise"].status,
            ExerciseStatus::Skipped
        );
        assert!(adapted
            .adaptation_trace
            .iter()
            .any(|t| t.rule_id == RULE_TIME_PRESSURE));
    }

    #[test]
    fn test_time_pressure_with_room_changes_nothing() {
        let state = active_state();
        let adapted = adapt_session(&state, AdaptTrigger::TimePressure, fixed_now());
        assert_eq!(adapted.adaptation_trace.len(), 0);
        for (id, ex) in &state.exercises {
            assert_eq!(ex.status, adapted.exercises[id].status);
        }
    }

    #[test]
    fn test_fatigue_truncates_remaining_sets() {
        let mut state = active_state();
        // Grind through two brutal bench sets
        for i in 1..=2 {
            let (next, _) = log_set(
                &state,
                "bench_press",
                &record(i, 60.0, 3, Some(9.5)),
                fixed_now(),
            )
            .unwrap();
            state = next;
        }
        let adapted = adapt_session(&state, AdaptTrigger::Fatigue, fixed_now());
        // Pending exercises got their remaining sets cut back
        let ohp = &adapted.exercises["overhead_press"];
        assert!(ohp.planned_sets.len() < 3);
        assert!(adapted
            .adaptation_trace
            .iter()
            .any(|t| t.rule_id == RULE_FATIGUE_TRUNCATION));
    }

    #[test]
    fn test_end_session_totals() {
        let mut state = active_state();
        for i in 1..=3 {
            let (next, _) = log_set(
                &state,
                "bench_press",
                &record(i, 60.0, 5, Some(7.0)),
                fixed_now(),
            )
            .unwrap();
            state = next;
        }
        let state = skip_exercise(&state, "lateral_raise", "out of time", fixed_now()).unwrap();

        let ended_at = fixed_now() + chrono::Duration::minutes(40);
        let result = end_session(&state, &BTreeMap::new(), ended_at);

        assert_eq!(result.duration_seconds, 40 * 60);
        assert_eq!(result.exercises_completed, 1);
        assert_eq!(result.exercises_skipped, 1);
        assert_eq!(result.total_sets, 3);
        assert_eq!(result.total_volume, 3.0 * 60.0 * 5.0);
    }

    #[test]
    fn test_pr_detection_is_strict() {
        let mut state = active_state();
        let (next, _) = log_set(
            &state,
            "bench_press",
            &record(1, 60.0, 5, Some(7.0)),
            fixed_now(),
        )
        .unwrap();
        state = next;

        // Previous bests exactly equal to today's numbers: no PRs
        let mut bests = BTreeMap::new();
        bests.insert(
            "bench_press".to_string(),
            PreviousBests {
                max_weight: 60.0,
                reps_at_near_max: 5,
                best_e1rm: crate::progression::estimate_1rm(60.0, 5),
                best_session_volume: 300.0,
                level: 3,
            },
        );
        let result = end_session(&state, &bests, fixed_now());
        assert!(result.personal_records.is_empty());
        assert!(result.level_ups.is_empty());
    }

    #[test]
    fn test_pr_detection_fires_on_strict_exceedance() {
        let mut state = active_state();
        let (next, _) = log_set(
            &state,
            "bench_press",
            &record(1, 62.5, 5, Some(8.0)),
            fixed_now(),
        )
        .unwrap();
        state = next;

        let mut bests = BTreeMap::new();
        bests.insert(
            "bench_press".to_string(),
            PreviousBests {
                max_weight: 60.0,
                reps_at_near_max: 4,
                best_e1rm: 70.0,
                best_session_volume: 300.0,
                level: 3,
            },
        );
        let result = end_session(&state, &bests, fixed_now());

        let kinds: Vec<PrKind> = result.personal_records.iter().map(|p| p.kind).collect();
        assert!(kinds.contains(&PrKind::MaxWeight));
        assert!(kinds.contains(&PrKind::RepsNearMaxWeight));
        assert!(kinds.contains(&PrKind::EstimatedOneRm));
        assert!(kinds.contains(&PrKind::SessionVolume));

        assert_eq!(result.level_ups.len(), 1);
        assert_eq!(result.level_ups[0].from_level, 3);
        assert_eq!(result.level_ups[0].to_level, 4);
    }

    #[test]
    fn test_end_session_keeps_full_adaptation_trace() {
        let state = active_state();
        let (state, _) = log_set(
            &state,
            "bench_press",
            &record(1, 60.0, 5, Some(10.0)),
            fixed_now(),
        )
        .unwrap();
        let result = end_session(&state, &BTreeMap::new(), fixed_now());
        assert_eq!(result.adaptation_trace.len(), 1);
        assert_eq!(
            result.adaptation_trace[0].rule_id,
            rule_ids::FIRST_SET_VERY_HIGH_RPE
        );
    }
}
