//! Constraint filtering and exercise scoring.
//!
//! Given a required movement intent, this module filters the catalog against
//! hard constraints (equipment, injuries, forbidden intents) and ranks the
//! survivors with an additive score. Hard failures exclude a candidate
//! outright; soft signals add or subtract points.

use crate::catalog::Catalog;
use crate::types::*;
use std::collections::BTreeSet;

/// Score awarded when exercise difficulty matches experience exactly.
const EXACT_DIFFICULTY_BONUS: i32 = 40;
/// Score awarded when difficulty is one tier off.
const NEAR_DIFFICULTY_BONUS: i32 = 20;
/// Penalty when difficulty is two tiers off.
const FAR_DIFFICULTY_PENALTY: i32 = -20;
/// Bonus for matching the user's equipment-style preference.
const EQUIPMENT_BIAS_BONUS: i32 = 15;
/// Bonus for compound movements over pure isolation work.
const COMPOUND_BONUS: i32 = 25;
/// Bonus when the scored intent is one of the user's priority intents.
const PRIORITY_INTENT_BONUS: i32 = 10;
/// Penalty for an exercise already selected earlier in the session.
const DUPLICATE_SELECTION_PENALTY: i32 = -50;
/// Penalty for an exercise the user dislikes.
const DISLIKED_PENALTY: i32 = -30;

/// Inputs the scorer needs beyond the exercise and intent.
#[derive(Clone, Debug)]
pub struct ScoringContext<'a> {
    pub constraints: &'a TrainingConstraints,
    pub experience: ExperienceLevel,
    /// Exercise ids already selected earlier in this session.
    pub already_selected: &'a BTreeSet<String>,
}

/// A candidate that passed every hard constraint, with its score breakdown.
#[derive(Clone, Debug)]
pub struct ScoredCandidate {
    pub exercise_id: String,
    pub name: String,
    pub score: i32,
    /// Human-readable score components, e.g. "compound movement (+25)".
    pub components: Vec<String>,
}

impl ScoredCandidate {
    /// One-line summary used for ranked alternatives in decision traces.
    pub fn reason(&self) -> String {
        format!("score {}: {}", self.score, self.components.join(", "))
    }
}

/// Check whether an exercise's equipment requirement is satisfied.
///
/// If an all-required list is declared, every item must be present. If an
/// any-of list is declared, at least one must be present. Both declarations,
/// when present, must independently pass. With neither declared, the legacy
/// equipment list is treated as any-of; an empty legacy list is always
/// satisfied.
pub fn has_equipment(exercise: &Exercise, available: &BTreeSet<Equipment>) -> bool {
    let mut declared_explicit = false;

    if let Some(all) = &exercise.equipment_all {
        declared_explicit = true;
        if !all.iter().all(|e| available.contains(e)) {
            return false;
        }
    }

    if let Some(any) = &exercise.equipment_any {
        declared_explicit = true;
        if !any.iter().any(|e| available.contains(e)) {
            return false;
        }
    }

    if declared_explicit {
        return true;
    }

    // Legacy fallback: any-of, empty list always satisfied
    exercise.equipment.is_empty() || exercise.equipment.iter().any(|e| available.contains(e))
}

/// Score one exercise against a required intent. Returns None when a hard
/// constraint excludes it.
pub fn score_exercise(
    exercise: &Exercise,
    intent: MovementIntent,
    ctx: &ScoringContext<'_>,
) -> Option<ScoredCandidate> {
    // Hard gate: must train the required intent
    if !exercise.intents.contains(&intent) {
        return None;
    }

    // Hard gate: equipment must be satisfiable
    if !has_equipment(exercise, &ctx.constraints.available_equipment) {
        return None;
    }

    // Hard gate: no contraindicated injury
    if exercise
        .contraindications
        .iter()
        .any(|tag| ctx.constraints.injuries.contains(tag))
    {
        return None;
    }

    // Hard gate: none of the exercise's intents may be forbidden
    if exercise
        .intents
        .iter()
        .any(|i| ctx.constraints.forbidden_intents.contains(i))
    {
        return None;
    }

    let mut score = 0;
    let mut components = Vec::new();

    let diff = (exercise.difficulty.rank() - ctx.experience.rank()).abs();
    match diff {
        0 => {
            score += EXACT_DIFFICULTY_BONUS;
            components.push(format!("difficulty match (+{})", EXACT_DIFFICULTY_BONUS));
        }
        1 => {
            score += NEAR_DIFFICULTY_BONUS;
            components.push(format!("difficulty close (+{})", NEAR_DIFFICULTY_BONUS));
        }
        _ => {
            score += FAR_DIFFICULTY_PENALTY;
            components.push(format!("difficulty mismatch ({})", FAR_DIFFICULTY_PENALTY));
        }
    }

    if let Some(bias) = ctx.constraints.equipment_bias {
        let class = exercise.equipment_class();
        let matched = match bias {
            EquipmentBias::Machines => {
                matches!(class, EquipmentClass::Machine | EquipmentClass::Cable)
            }
            EquipmentBias::FreeWeights => matches!(
                class,
                EquipmentClass::Barbell | EquipmentClass::Dumbbell | EquipmentClass::Kettlebell
            ),
        };
        if matched {
            score += EQUIPMENT_BIAS_BONUS;
            components.push(format!("preferred equipment (+{})", EQUIPMENT_BIAS_BONUS));
        }
    }

    if exercise.intents.iter().any(|i| i.is_compound()) {
        score += COMPOUND_BONUS;
        components.push(format!("compound movement (+{})", COMPOUND_BONUS));
    }

    if ctx.constraints.priority_intents.contains(&intent) {
        score += PRIORITY_INTENT_BONUS;
        components.push(format!("priority intent (+{})", PRIORITY_INTENT_BONUS));
    }

    if ctx.already_selected.contains(&exercise.id) {
        score += DUPLICATE_SELECTION_PENALTY;
        components.push(format!(
            "already selected ({})",
            DUPLICATE_SELECTION_PENALTY
        ));
    }

    if ctx.constraints.disliked_exercises.contains(&exercise.id) {
        score += DISLIKED_PENALTY;
        components.push(format!("disliked ({})", DISLIKED_PENALTY));
    }

    Some(ScoredCandidate {
        exercise_id: exercise.id.clone(),
        name: exercise.name.clone(),
        score,
        components,
    })
}

/// Rank all viable candidates for an intent, best first.
///
/// Only positive-score candidates are returned. The sort is stable, so ties
/// keep catalog order.
pub fn choose_exercise(
    catalog: &Catalog,
    intent: MovementIntent,
    ctx: &ScoringContext<'_>,
) -> Vec<ScoredCandidate> {
    let mut candidates: Vec<ScoredCandidate> = catalog
        .iter()
        .filter_map(|exercise| score_exercise(exercise, intent, ctx))
        .filter(|c| c.score > 0)
        .collect();

    candidates.sort_by(|a, b| b.score.cmp(&a.score));

    tracing::debug!(
        "Intent '{}': {} viable candidates",
        intent,
        candidates.len()
    );

    candidates
}
