//! Session plan builder.
//!
//! Composes a single session from a template: picks exercises per required
//! intent, blends goal weightings into set/rep/rest prescriptions, attaches
//! loading suggestions with a fixed precedence, fills remaining slots from
//! optional intents, and records a decision trace for every selection.
//!
//! The builder is pure: the caller supplies the clock and all history, so
//! identical inputs always produce identical plans. The dry-run preview
//! path goes through the same `build_session` entry point as production.

use crate::catalog::Catalog;
use crate::error::Result;
use crate::progression;
use crate::rules::Rules;
use crate::scoring::{self, ScoredCandidate, ScoringContext};
use crate::types::*;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// Maximum ranked alternatives kept in a decision trace.
const MAX_TRACE_ALTERNATIVES: usize = 3;
/// A primary muscle already used this often is avoided when filling
/// optional slots.
const MUSCLE_BALANCE_LIMIT: u32 = 2;

/// Per-exercise history handed to the builder: sessions newest first, each
/// holding that session's logged sets for the exercise.
pub type ExerciseHistory = BTreeMap<String, Vec<Vec<SetLogEntry>>>;

/// Everything `build_session` needs, gathered by the caller.
#[derive(Clone, Debug)]
pub struct SessionBuildRequest<'a> {
    pub template_id: &'a str,
    pub goals: GoalWeights,
    pub constraints: TrainingConstraints,
    pub user: UserSnapshot,
    pub label: Option<String>,
    pub now: DateTime<Utc>,
    pub history: &'a ExerciseHistory,
}

/// Build a complete session plan from a template.
///
/// Intents with zero viable candidates are skipped rather than failing, so
/// the plan may come out shorter than the template intended. An unknown
/// template id fails immediately.
pub fn build_session(
    catalog: &Catalog,
    rules: &Rules,
    request: &SessionBuildRequest<'_>,
) -> Result<SessionPlan> {
    let template = rules.template(request.template_id)?;

    // Required intents, user priorities first (stable otherwise)
    let mut required: Vec<MovementIntent> = Vec::new();
    for intent in &request.constraints.priority_intents {
        if template.required_intents.contains(intent) && !required.contains(intent) {
            required.push(*intent);
        }
    }
    for intent in &template.required_intents {
        if !required.contains(intent) {
            required.push(*intent);
        }
    }

    let grouping_style = grouping_style_for(&request.goals);
    let max_exercises = Rules::max_exercises(request.user.experience);

    let mut exercises: Vec<PlannedExercise> = Vec::new();
    let mut already_selected: BTreeSet<String> = BTreeSet::new();
    let mut muscle_use: BTreeMap<MuscleGroup, u32> = BTreeMap::new();

    for intent in &required {
        if exercises.len() >= max_exercises {
            break;
        }
        let ctx = ScoringContext {
            constraints: &request.constraints,
            experience: request.user.experience,
            already_selected: &already_selected,
        };
        let ranked = scoring::choose_exercise(catalog, *intent, &ctx);
        let Some(top) = ranked.first() else {
            tracing::warn!("No viable candidate for intent '{}'; skipping", intent);
            continue;
        };
        let Some(exercise) = catalog.get(&top.exercise_id) else {
            continue;
        };
        let planned = plan_exercise(
            exercise,
            request,
            *intent,
            top,
            &ranked[1..],
            exercises.len() as u32 + 1,
        );
        register_selection(&planned, catalog, &mut already_selected, &mut muscle_use);
        exercises.push(planned);
    }

    fill_optional_slots(
        catalog,
        request,
        &template.optional_intents,
        max_exercises,
        &mut exercises,
        &mut already_selected,
        &mut muscle_use,
    );

    let estimated_duration_minutes = rules.warmup_minutes
        + rules.cooldown_minutes
        + exercises
            .iter()
            .map(|e| e.tier.estimated_minutes())
            .sum::<u32>();

    let plan = SessionPlan {
        template_id: request.template_id.to_string(),
        label: request.label.clone(),
        goals: request.goals.clone(),
        constraints: request.constraints.clone(),
        user: request.user.clone(),
        grouping_style,
        exercises,
        estimated_duration_minutes,
        created_at: request.now,
    };

    tracing::info!(
        "Built session '{}': {} exercises, ~{} min",
        plan.template_id,
        plan.exercises.len(),
        plan.estimated_duration_minutes
    );

    Ok(plan)
}

/// Dry-run preview for the first scheduled day of a program's first week.
///
/// Uses a synthetic (history-free) profile and the same `build_session`
/// code path as production, so the two can never diverge.
pub fn preview_session(
    catalog: &Catalog,
    rules: &Rules,
    program: &FourWeekProgramPlan,
    goals: GoalWeights,
    constraints: TrainingConstraints,
    user: UserSnapshot,
    now: DateTime<Utc>,
) -> Result<SessionPlan> {
    let week = program
        .weeks
        .first()
        .ok_or_else(|| crate::error::Error::Planning("Program has no weeks".into()))?;
    let first_day = program
        .weekdays
        .first()
        .and_then(|d| week.days.get(d))
        .ok_or_else(|| crate::error::Error::Planning("Program has no scheduled days".into()))?;

    let empty_history = ExerciseHistory::new();
    let request = SessionBuildRequest {
        template_id: &first_day.template_id,
        goals,
        constraints,
        user,
        label: Some(format!("Preview: {}", first_day.label)),
        now,
        history: &empty_history,
    };
    build_session(catalog, rules, &request)
}

fn grouping_style_for(goals: &GoalWeights) -> GroupingStyle {
    match goals.dominant() {
        Goal::LoseFat | Goal::ImproveEndurance => GroupingStyle::Circuit,
        _ => GroupingStyle::StraightSets,
    }
}

/// Tier assignment from intent type and muscle breadth.
fn assign_tier(exercise: &Exercise, intent: MovementIntent) -> PriorityTier {
    if intent.is_compound() {
        let breadth = exercise.primary_muscles.len() + exercise.secondary_muscles.len();
        if breadth >= 3 {
            PriorityTier::Primary
        } else {
            PriorityTier::Accessory
        }
    } else {
        PriorityTier::Isolation
    }
}

/// Goal-weighted blend of the per-goal prescription tables for a tier.
///
/// Rep endpoints round independently, sets round to the nearest whole
/// number (at least 1), rest rounds to the nearest 5 seconds.
fn blend_prescription(goals: &GoalWeights, tier: PriorityTier) -> ((u32, u32), u32, u32) {
    let mut lo = 0.0_f64;
    let mut hi = 0.0_f64;
    let mut sets = 0.0_f64;
    let mut rest = 0.0_f64;
    for (goal, weight) in goals.normalized() {
        let row = Rules::prescription(goal, tier);
        lo += weight * row.rep_range.0 as f64;
        hi += weight * row.rep_range.1 as f64;
        sets += weight * row.sets as f64;
        rest += weight * row.rest_seconds as f64;
    }
    let rep_lo = (lo.round() as u32).max(1);
    let rep_hi = (hi.round() as u32).max(rep_lo);
    let set_count = (sets.round() as u32).max(1);
    let rest_seconds = ((rest / 5.0).round() * 5.0) as u32;
    ((rep_lo, rep_hi), set_count, rest_seconds)
}

struct LoadingSuggestion {
    weight: f64,
    note: String,
    progression_note: Option<String>,
}

/// Loading precedence, first applicable wins:
/// (a) e1RM from the most recent logged performance,
/// (b) an explicitly supplied 1RM,
/// (c) last-session best set plus progression/deload logic,
/// (d) conservative defaults by experience and equipment class.
/// Bodyweight-only movements always load at 0.
fn suggest_loading(
    exercise: &Exercise,
    target_reps: u32,
    request: &SessionBuildRequest<'_>,
) -> LoadingSuggestion {
    let class = exercise.equipment_class();
    let increment = class.weight_increment();

    if exercise.is_bodyweight_only() {
        return LoadingSuggestion {
            weight: 0.0,
            note: "bodyweight movement, no external load".to_string(),
            progression_note: None,
        };
    }

    let sessions = request.history.get(&exercise.id);

    // (a) e1RM derived from the most recent logged performance
    if let Some(sessions) = sessions {
        if let Some(newest) = sessions.first() {
            if let Some(best) = progression::best_set(newest) {
                let e1rm = progression::estimate_1rm(best.weight, best.reps);
                if e1rm > 0.0 {
                    let weight = progression::round_to_increment(
                        progression::weight_for_reps(e1rm, target_reps),
                        increment,
                    );
                    return LoadingSuggestion {
                        weight,
                        note: format!("from recent e1RM of {:.1} kg", e1rm),
                        progression_note: None,
                    };
                }
            }
        }
    }

    // (b) explicitly supplied 1RM
    if let Some(one_rm) = request.user.known_one_rep_maxes.get(&exercise.id) {
        if *one_rm > 0.0 {
            let weight = progression::round_to_increment(
                progression::weight_for_reps(*one_rm, target_reps),
                increment,
            );
            return LoadingSuggestion {
                weight,
                note: format!("from tested 1RM of {:.1} kg", one_rm),
                progression_note: None,
            };
        }
    }

    // (c) last-session best set plus progression/deload logic
    if let Some(sessions) = sessions {
        if let Some(best) = sessions.first().and_then(|s| progression::best_set(s)) {
            if best.weight > 0.0 {
                let decision = progression::evaluate_progression(sessions);
                let weight = progression::calculate_next_weight(best.weight, decision, class);
                let note = match decision {
                    progression::ProgressionDecision::Progress => {
                        format!("progressing from {:.1} kg after a full session", best.weight)
                    }
                    progression::ProgressionDecision::Deload => {
                        format!("deloading from {:.1} kg after repeated shortfalls", best.weight)
                    }
                    progression::ProgressionDecision::Hold => {
                        format!("holding at {:.1} kg", best.weight)
                    }
                };
                return LoadingSuggestion {
                    weight,
                    note: note.clone(),
                    progression_note: Some(note),
                };
            }
        }
    }

    // (d) conservative defaults table
    let weight = Rules::default_start_weight(request.user.experience, class);
    LoadingSuggestion {
        weight,
        note: format!("conservative {:?} default for {:?}", class, request.user.experience),
        progression_note: None,
    }
}

fn applied_constraint_strings(request: &SessionBuildRequest<'_>, intent: MovementIntent) -> Vec<String> {
    let mut out = vec![format!("required intent: {}", intent)];
    let equipment: Vec<String> = request
        .constraints
        .available_equipment
        .iter()
        .map(|e| format!("{:?}", e).to_lowercase())
        .collect();
    out.push(format!("available equipment: [{}]", equipment.join(", ")));
    if !request.constraints.injuries.is_empty() {
        let injuries: Vec<String> = request
            .constraints
            .injuries
            .iter()
            .map(|i| format!("{:?}", i))
            .collect();
        out.push(format!("avoiding injuries: [{}]", injuries.join(", ")));
    }
    if !request.constraints.forbidden_intents.is_empty() {
        let forbidden: Vec<String> = request
            .constraints
            .forbidden_intents
            .iter()
            .map(|i| i.to_string())
            .collect();
        out.push(format!("forbidden intents: [{}]", forbidden.join(", ")));
    }
    out.push(format!("experience: {:?}", request.user.experience));
    out
}

fn plan_exercise(
    exercise: &Exercise,
    request: &SessionBuildRequest<'_>,
    intent: MovementIntent,
    top: &ScoredCandidate,
    runners_up: &[ScoredCandidate],
    order: u32,
) -> PlannedExercise {
    let tier = assign_tier(exercise, intent);
    let (rep_range, set_count, rest_seconds) = blend_prescription(&request.goals, tier);
    let target_reps = rep_range.1;
    let loading = suggest_loading(exercise, target_reps, request);

    let sets = (1..=set_count)
        .map(|index| PlannedSet {
            index,
            target_reps,
            suggested_weight: loading.weight,
            rest_seconds,
        })
        .collect();

    let alternatives = runners_up
        .iter()
        .take(MAX_TRACE_ALTERNATIVES)
        .map(|c| RankedAlternative {
            exercise_id: c.exercise_id.clone(),
            score: c.score,
            reason: c.reason(),
        })
        .collect();

    let trace = DecisionTrace {
        applied_constraints: applied_constraint_strings(request, intent),
        rationale: format!(
            "{} ranked highest for {} ({}); load {}",
            exercise.name,
            intent,
            top.components.join(", "),
            loading.note
        ),
        alternatives,
        confidence: (top.score as f64 / 100.0).clamp(0.3, 0.95),
        progression_note: loading.progression_note,
    };

    PlannedExercise {
        exercise_id: exercise.id.clone(),
        name: exercise.name.clone(),
        order,
        tier,
        intents: vec![intent],
        rep_range,
        sets,
        trace,
    }
}

fn register_selection(
    planned: &PlannedExercise,
    catalog: &Catalog,
    already_selected: &mut BTreeSet<String>,
    muscle_use: &mut BTreeMap<MuscleGroup, u32>,
) {
    already_selected.insert(planned.exercise_id.clone());
    if let Some(exercise) = catalog.get(&planned.exercise_id) {
        for muscle in &exercise.primary_muscles {
            *muscle_use.entry(*muscle).or_insert(0) += 1;
        }
    }
}

/// Round-robin through optional intents until the slot budget is full or a
/// whole cycle adds nothing. Candidates whose primary muscles are already
/// well used are passed over for balance when a fresher option exists.
#[allow(clippy::too_many_arguments)]
fn fill_optional_slots(
    catalog: &Catalog,
    request: &SessionBuildRequest<'_>,
    optional_intents: &[MovementIntent],
    max_exercises: usize,
    exercises: &mut Vec<PlannedExercise>,
    already_selected: &mut BTreeSet<String>,
    muscle_use: &mut BTreeMap<MuscleGroup, u32>,
) {
    if optional_intents.is_empty() {
        return;
    }
    let mut exhausted: BTreeSet<MovementIntent> = BTreeSet::new();

    loop {
        let mut added_this_cycle = false;
        for intent in optional_intents {
            if exercises.len() >= max_exercises {
                return;
            }
            if exhausted.contains(intent) {
                continue;
            }
            let ctx = ScoringContext {
                constraints: &request.constraints,
                experience: request.user.experience,
                already_selected: &*already_selected,
            };
            let ranked: Vec<ScoredCandidate> = scoring::choose_exercise(catalog, *intent, &ctx)
                .into_iter()
                .filter(|c| !already_selected.contains(&c.exercise_id))
                .collect();
            if ranked.is_empty() {
                exhausted.insert(*intent);
                continue;
            }

            // Prefer candidates that hit muscles not already trained twice
            let pick_index = ranked
                .iter()
                .position(|c| {
                    catalog.get(&c.exercise_id).map_or(false, |e| {
                        e.primary_muscles
                            .iter()
                            .all(|m| muscle_use.get(m).copied().unwrap_or(0) < MUSCLE_BALANCE_LIMIT)
                    })
                })
                .unwrap_or(0);

            let top = &ranked[pick_index];
            let Some(exercise) = catalog.get(&top.exercise_id) else {
                continue;
            };
            let runners_up: Vec<ScoredCandidate> = ranked
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != pick_index)
                .map(|(_, c)| c.clone())
                .collect();

            let planned = plan_exercise(
                exercise,
                request,
                *intent,
                top,
                &runners_up,
                exercises.len() as u32 + 1,
            );
            register_selection(&planned, catalog, already_selected, muscle_use);
            exercises.push(planned);
            added_this_cycle = true;
        }
        if !added_this_cycle {
            return;
        }
    }
}
