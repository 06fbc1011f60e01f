//! Autoregulation rules engine.
//!
//! A pure function bank consulted by the session runtime after each logged
//! set. Rules are evaluated in a fixed priority order and every branch
//! returns a rule id, a confidence, and a human-readable message so the
//! decision is fully explainable after the fact.

use crate::types::{AutoregulationAdjustment, SetLogEntry};

/// Stable rule identifiers surfaced in adjustments and adaptation traces.
pub mod rule_ids {
    pub const FIRST_SET_VERY_HIGH_RPE: &str = "FIRST_SET_VERY_HIGH_RPE";
    pub const FIRST_SET_HIGH_RPE: &str = "FIRST_SET_HIGH_RPE";
    pub const FIRST_SET_BASELINE: &str = "FIRST_SET_BASELINE";
    pub const FATIGUE_DETECTED: &str = "FATIGUE_DETECTED";
    pub const RISING_RPE_TREND: &str = "RISING_RPE_TREND";
    pub const VERY_HIGH_RPE: &str = "VERY_HIGH_RPE";
    pub const HIGH_RPE: &str = "HIGH_RPE";
    pub const LARGE_REP_SHORTFALL: &str = "LARGE_REP_SHORTFALL";
    pub const REP_SHORTFALL: &str = "REP_SHORTFALL";
    pub const READY_TO_PROGRESS: &str = "READY_TO_PROGRESS";
    pub const NO_ADJUSTMENT: &str = "NO_ADJUSTMENT";
}

/// Input for one autoregulation evaluation: the set just logged plus the
/// prior sets of the same exercise.
#[derive(Clone, Debug)]
pub struct AutoregulationInput<'a> {
    pub set_index: u32,
    pub actual_weight: f64,
    pub actual_reps: u32,
    pub target_reps: u32,
    pub rpe: Option<f64>,
    /// Sets logged before this one for the same exercise, oldest first.
    pub prior_sets: &'a [SetLogEntry],
    /// Bodyweight moves get rep-target reductions instead of weight cuts.
    pub bodyweight_only: bool,
}

/// Result of one evaluation. `adjustment` is None when no change is called
/// for; the rule id and message always explain the outcome.
#[derive(Clone, Debug)]
pub struct AutoregulationOutcome {
    pub adjustment: Option<AutoregulationAdjustment>,
    pub rule_id: String,
    pub message: String,
    pub confidence: f64,
}

impl AutoregulationOutcome {
    fn no_op(rule_id: &'static str, message: String, confidence: f64) -> Self {
        Self {
            adjustment: None,
            rule_id: rule_id.to_string(),
            message,
            confidence,
        }
    }

    fn with(adjustment: AutoregulationAdjustment) -> Self {
        let rule_id = adjustment.rule_id.clone();
        let message = adjustment.message.clone();
        let confidence = adjustment.confidence;
        Self {
            adjustment: Some(adjustment),
            rule_id,
            message,
            confidence,
        }
    }
}

fn adjustment(
    rule_id: &'static str,
    weight_multiplier: Option<f64>,
    target_rep_delta: Option<i32>,
    skip_remaining_sets: bool,
    message: String,
    confidence: f64,
) -> AutoregulationAdjustment {
    AutoregulationAdjustment {
        rule_id: rule_id.to_string(),
        weight_multiplier,
        weight_delta: None,
        target_rep_delta,
        skip_remaining_sets,
        message,
        confidence,
    }
}

/// A weight reduction, or the equivalent rep-target reduction for
/// bodyweight moves where there is no load to cut.
fn weight_cut(
    rule_id: &'static str,
    multiplier: f64,
    rep_delta: Option<i32>,
    bodyweight_only: bool,
    message: String,
    confidence: f64,
) -> AutoregulationAdjustment {
    if bodyweight_only {
        let bodyweight_rep_delta = if multiplier <= 0.9 { -2 } else { -1 };
        adjustment(
            rule_id,
            None,
            Some(rep_delta.unwrap_or(0).min(bodyweight_rep_delta)),
            false,
            message,
            confidence,
        )
    } else {
        adjustment(rule_id, Some(multiplier), rep_delta, false, message, confidence)
    }
}

/// Evaluate the autoregulation rule bank for one logged set.
///
/// Rule priority, first match wins:
/// 1. First-set rules (only RPE-based ones apply with no prior data)
/// 2. Accumulated fatigue, then rising RPE trend
/// 3. Very-high / high RPE reductions
/// 4. Rep shortfall reductions
/// 5. Ready-to-progress advisory
pub fn apply_autoregulation(input: &AutoregulationInput<'_>) -> AutoregulationOutcome {
    let first_set = input.prior_sets.is_empty();

    // Missing RPE degrades to the baseline no-op; never an error.
    let Some(rpe) = input.rpe else {
        return AutoregulationOutcome::no_op(
            rule_ids::FIRST_SET_BASELINE,
            "No RPE reported; keeping the plan as written".to_string(),
            0.5,
        );
    };

    if first_set {
        if rpe >= 10.0 {
            return AutoregulationOutcome::with(weight_cut(
                rule_ids::FIRST_SET_VERY_HIGH_RPE,
                0.9,
                None,
                input.bodyweight_only,
                "First set was maximal (RPE 10); reducing next-set load 10%".to_string(),
                0.9,
            ));
        }
        if rpe >= 9.0 {
            return AutoregulationOutcome::with(weight_cut(
                rule_ids::FIRST_SET_HIGH_RPE,
                0.95,
                None,
                input.bodyweight_only,
                "First set was very hard (RPE 9+); reducing next-set load 5%".to_string(),
                0.8,
            ));
        }
        return AutoregulationOutcome::no_op(
            rule_ids::FIRST_SET_BASELINE,
            "First set looks sustainable; no adjustment".to_string(),
            0.5,
        );
    }

    // Accumulated fatigue: 3+ sets at RPE >= 9, counting the current one
    let high_rpe_sets = input
        .prior_sets
        .iter()
        .filter(|s| s.rpe.map_or(false, |r| r >= 9.0))
        .count()
        + usize::from(rpe >= 9.0);
    if high_rpe_sets >= 3 {
        return AutoregulationOutcome::with(adjustment(
            rule_ids::FATIGUE_DETECTED,
            None,
            None,
            true,
            format!(
                "{} sets at RPE 9+; skipping remaining sets to cap fatigue",
                high_rpe_sets
            ),
            0.85,
        ));
    }

    // Rising RPE trend across the last two sets into this one
    if input.prior_sets.len() >= 2 && rpe >= 8.0 {
        let prev = &input.prior_sets[input.prior_sets.len() - 1];
        let before = &input.prior_sets[input.prior_sets.len() - 2];
        if let (Some(prev_rpe), Some(before_rpe)) = (prev.rpe, before.rpe) {
            if before_rpe < prev_rpe && prev_rpe < rpe {
                return AutoregulationOutcome::with(weight_cut(
                    rule_ids::RISING_RPE_TREND,
                    0.95,
                    None,
                    input.bodyweight_only,
                    format!(
                        "RPE climbing ({:.1} -> {:.1} -> {:.1}); easing load 5%",
                        before_rpe, prev_rpe, rpe
                    ),
                    0.7,
                ));
            }
        }
    }

    if rpe >= 10.0 {
        return AutoregulationOutcome::with(weight_cut(
            rule_ids::VERY_HIGH_RPE,
            0.9,
            Some(-2),
            input.bodyweight_only,
            "Maximal set (RPE 10); cutting load 10% and target reps by 2".to_string(),
            0.9,
        ));
    }
    if rpe >= 9.0 {
        return AutoregulationOutcome::with(weight_cut(
            rule_ids::HIGH_RPE,
            0.95,
            None,
            input.bodyweight_only,
            "Very hard set (RPE 9+); cutting load 5%".to_string(),
            0.8,
        ));
    }

    // Rep shortfall against target
    if input.target_reps > 0 && input.actual_reps < input.target_reps {
        let shortfall =
            (input.target_reps - input.actual_reps) as f64 / input.target_reps as f64;
        if shortfall >= 0.3 {
            return AutoregulationOutcome::with(weight_cut(
                rule_ids::LARGE_REP_SHORTFALL,
                0.9,
                Some(-1),
                input.bodyweight_only,
                format!(
                    "{} of {} target reps; cutting load 10% and target by 1",
                    input.actual_reps, input.target_reps
                ),
                0.85,
            ));
        }
        if shortfall >= 0.2 {
            return AutoregulationOutcome::with(weight_cut(
                rule_ids::REP_SHORTFALL,
                0.95,
                None,
                input.bodyweight_only,
                format!(
                    "{} of {} target reps; cutting load 5%",
                    input.actual_reps, input.target_reps
                ),
                0.75,
            ));
        }
    }

    // Ready to progress: comfortably exceeded the target
    if input.actual_reps >= input.target_reps
        && rpe <= 7.0
        && input.actual_reps >= input.target_reps + 2
        && rpe <= 6.0
    {
        let adj = if input.bodyweight_only {
            adjustment(
                rule_ids::READY_TO_PROGRESS,
                None,
                Some(1),
                false,
                "Target exceeded with ease; adding a rep next set".to_string(),
                0.5,
            )
        } else {
            adjustment(
                rule_ids::READY_TO_PROGRESS,
                Some(1.025),
                None,
                false,
                "Target exceeded with ease; consider +2.5% load".to_string(),
                0.5,
            )
        };
        return AutoregulationOutcome::with(adj);
    }

    AutoregulationOutcome::no_op(
        rule_ids::NO_ADJUSTMENT,
        "Performance on plan; no adjustment".to_string(),
        0.6,
    )
}

/// Fatigue banding for a whole-session score.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FatigueBand {
    Low,
    Moderate,
    High,
}

/// Aggregated session fatigue signal in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FatigueAssessment {
    pub score: f64,
    pub band: FatigueBand,
}

/// Aggregate RPE average, high-RPE ratio, and a rising-trend count over the
/// last five sets into a single 0-1 fatigue score.
pub fn detect_session_fatigue(sets: &[SetLogEntry]) -> FatigueAssessment {
    let rpes: Vec<f64> = sets.iter().filter_map(|s| s.rpe).collect();
    if rpes.is_empty() {
        return FatigueAssessment {
            score: 0.0,
            band: FatigueBand::Low,
        };
    }

    let avg: f64 = rpes.iter().sum::<f64>() / rpes.len() as f64;
    let avg_component = ((avg - 6.0) / 4.0).clamp(0.0, 1.0);

    let high_ratio = rpes.iter().filter(|r| **r >= 9.0).count() as f64 / rpes.len() as f64;

    let window = &rpes[rpes.len().saturating_sub(5)..];
    let rising = window.windows(2).filter(|w| w[1] > w[0]).count();
    let trend_component = (rising as f64 / 4.0).clamp(0.0, 1.0);

    let score = (0.4 * avg_component + 0.4 * high_ratio + 0.2 * trend_component).clamp(0.0, 1.0);
    let band = if score > 0.7 {
        FatigueBand::High
    } else if score > 0.4 {
        FatigueBand::Moderate
    } else {
        FatigueBand::Low
    };

    FatigueAssessment { score, band }
}

/// Floor applied when shortening rest after an easy set.
const MIN_REST_SECONDS: u32 = 45;

/// Stretch or shrink the planned rest based on the reported RPE.
pub fn get_adjusted_rest_time(base_rest_seconds: u32, rpe: Option<f64>) -> u32 {
    match rpe {
        Some(r) if r >= 10.0 => base_rest_seconds + 60,
        Some(r) if r >= 9.0 => base_rest_seconds + 30,
        Some(r) if r <= 6.0 => {
            if base_rest_seconds <= MIN_REST_SECONDS {
                base_rest_seconds
            } else {
                (base_rest_seconds - 30).max(MIN_REST_SECONDS)
            }
        }
        _ => base_rest_seconds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemId, SessionId, SetLogId};
    use chrono::Utc;

    fn logged(set_index: u32, weight: f64, reps: u32, rpe: Option<f64>) -> SetLogEntry {
        let item_id = ItemId::new();
        SetLogEntry {
            id: SetLogId::derive(item_id, set_index),
            session_id: SessionId::new(),
            item_id,
            exercise_id: "bench_press".into(),
            set_index,
            weight,
            reps,
            rpe,
            planned_weight: weight,
            planned_reps: reps,
            adjustment_applied: None,
            logged_at: Utc::now(),
        }
    }

    fn input<'a>(
        rpe: Option<f64>,
        actual_reps: u32,
        target_reps: u32,
        prior: &'a [SetLogEntry],
    ) -> AutoregulationInput<'a> {
        AutoregulationInput {
            set_index: prior.len() as u32 + 1,
            actual_weight: 60.0,
            actual_reps,
            target_reps,
            rpe,
            prior_sets: prior,
            bodyweight_only: false,
        }
    }

    #[test]
    fn test_first_set_rpe_ten() {
        let outcome = apply_autoregulation(&input(Some(10.0), 5, 5, &[]));
        assert_eq!(outcome.rule_id, rule_ids::FIRST_SET_VERY_HIGH_RPE);
        let adj = outcome.adjustment.unwrap();
        assert_eq!(adj.weight_multiplier, Some(0.9));
        assert!(!adj.skip_remaining_sets);
    }

    #[test]
    fn test_first_set_rpe_nine() {
        let outcome = apply_autoregulation(&input(Some(9.0), 5, 5, &[]));
        assert_eq!(outcome.rule_id, rule_ids::FIRST_SET_HIGH_RPE);
        assert_eq!(outcome.adjustment.unwrap().weight_multiplier, Some(0.95));
    }

    #[test]
    fn test_first_set_moderate_is_baseline() {
        let outcome = apply_autoregulation(&input(Some(7.0), 5, 5, &[]));
        assert_eq!(outcome.rule_id, rule_ids::FIRST_SET_BASELINE);
        assert!(outcome.adjustment.is_none());
    }

    #[test]
    fn test_missing_rpe_is_noop_baseline() {
        let prior = vec![logged(1, 60.0, 5, Some(8.0))];
        let outcome = apply_autoregulation(&input(None, 5, 5, &prior));
        assert_eq!(outcome.rule_id, rule_ids::FIRST_SET_BASELINE);
        assert!(outcome.adjustment.is_none());
    }

    #[test]
    fn test_accumulated_fatigue_requests_skip() {
        let prior = vec![
            logged(1, 60.0, 5, Some(9.0)),
            logged(2, 60.0, 5, Some(9.5)),
        ];
        let outcome = apply_autoregulation(&input(Some(9.0), 4, 5, &prior));
        assert_eq!(outcome.rule_id, rule_ids::FATIGUE_DETECTED);
        assert!(outcome.adjustment.unwrap().skip_remaining_sets);
    }

    #[test]
    fn test_rising_rpe_trend() {
        let prior = vec![
            logged(1, 60.0, 5, Some(6.0)),
            logged(2, 60.0, 5, Some(7.0)),
        ];
        let outcome = apply_autoregulation(&input(Some(8.0), 5, 5, &prior));
        assert_eq!(outcome.rule_id, rule_ids::RISING_RPE_TREND);
        assert_eq!(outcome.adjustment.unwrap().weight_multiplier, Some(0.95));
    }

    #[test]
    fn test_flat_rpe_is_not_a_trend() {
        let prior = vec![
            logged(1, 60.0, 5, Some(7.0)),
            logged(2, 60.0, 5, Some(7.0)),
        ];
        let outcome = apply_autoregulation(&input(Some(8.0), 5, 5, &prior));
        assert_ne!(outcome.rule_id, rule_ids::RISING_RPE_TREND);
    }

    #[test]
    fn test_rpe_ten_mid_exercise() {
        let prior = vec![logged(1, 60.0, 5, Some(7.0))];
        let outcome = apply_autoregulation(&input(Some(10.0), 5, 5, &prior));
        assert_eq!(outcome.rule_id, rule_ids::VERY_HIGH_RPE);
        let adj = outcome.adjustment.unwrap();
        assert_eq!(adj.weight_multiplier, Some(0.9));
        assert_eq!(adj.target_rep_delta, Some(-2));
    }

    #[test]
    fn test_large_rep_shortfall() {
        let prior = vec![logged(1, 60.0, 10, Some(7.0))];
        // 6 of 10 reps = 40% shortfall
        let outcome = apply_autoregulation(&input(Some(8.5), 6, 10, &prior));
        assert_eq!(outcome.rule_id, rule_ids::LARGE_REP_SHORTFALL);
        let adj = outcome.adjustment.unwrap();
        assert_eq!(adj.weight_multiplier, Some(0.9));
        assert_eq!(adj.target_rep_delta, Some(-1));
    }

    #[test]
    fn test_moderate_rep_shortfall() {
        let prior = vec![logged(1, 60.0, 10, Some(7.0))];
        // 8 of 10 reps = 20% shortfall
        let outcome = apply_autoregulation(&input(Some(8.0), 8, 10, &prior));
        assert_eq!(outcome.rule_id, rule_ids::REP_SHORTFALL);
        assert_eq!(outcome.adjustment.unwrap().weight_multiplier, Some(0.95));
    }

    #[test]
    fn test_ready_to_progress_advisory() {
        let prior = vec![logged(1, 60.0, 5, Some(6.0))];
        let outcome = apply_autoregulation(&input(Some(5.5), 8, 5, &prior));
        assert_eq!(outcome.rule_id, rule_ids::READY_TO_PROGRESS);
        let adj = outcome.adjustment.unwrap();
        assert_eq!(adj.weight_multiplier, Some(1.025));
        assert!(adj.confidence < 0.6);
    }

    #[test]
    fn test_on_plan_performance_no_adjustment() {
        let prior = vec![logged(1, 60.0, 5, Some(7.0))];
        let outcome = apply_autoregulation(&input(Some(7.5), 5, 5, &prior));
        assert_eq!(outcome.rule_id, rule_ids::NO_ADJUSTMENT);
        assert!(outcome.adjustment.is_none());
    }

    #[test]
    fn test_bodyweight_gets_rep_cut_instead_of_weight_cut() {
        let mut i = input(Some(10.0), 5, 5, &[]);
        i.bodyweight_only = true;
        let outcome = apply_autoregulation(&i);
        assert_eq!(outcome.rule_id, rule_ids::FIRST_SET_VERY_HIGH_RPE);
        let adj = outcome.adjustment.unwrap();
        assert_eq!(adj.weight_multiplier, None);
        assert_eq!(adj.target_rep_delta, Some(-2));
    }

    #[test]
    fn test_fatigue_score_bands() {
        let easy: Vec<SetLogEntry> = (1..=4).map(|i| logged(i, 60.0, 5, Some(6.0))).collect();
        assert_eq!(detect_session_fatigue(&easy).band, FatigueBand::Low);

        let brutal: Vec<SetLogEntry> =
            (1..=5).map(|i| logged(i, 60.0, 5, Some(9.5))).collect();
        let assessment = detect_session_fatigue(&brutal);
        assert_eq!(assessment.band, FatigueBand::High);
        assert!(assessment.score > 0.7);
    }

    #[test]
    fn test_fatigue_empty_sets_scores_zero() {
        let assessment = detect_session_fatigue(&[]);
        assert_eq!(assessment.score, 0.0);
        assert_eq!(assessment.band, FatigueBand::Low);
    }

    #[test]
    fn test_rest_time_adjustments() {
        assert_eq!(get_adjusted_rest_time(120, Some(10.0)), 180);
        assert_eq!(get_adjusted_rest_time(120, Some(9.0)), 150);
        assert_eq!(get_adjusted_rest_time(120, Some(5.0)), 90);
        assert_eq!(get_adjusted_rest_time(60, Some(5.0)), 45);
        assert_eq!(get_adjusted_rest_time(40, Some(5.0)), 40);
        assert_eq!(get_adjusted_rest_time(120, None), 120);
        assert_eq!(get_adjusted_rest_time(120, Some(7.5)), 120);
    }
}
