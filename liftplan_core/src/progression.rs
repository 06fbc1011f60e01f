//! Load progression helpers.
//!
//! Pure functions consulted by the plan builder when turning history into a
//! loading suggestion: estimated-1RM math, progress/hold/deload evaluation,
//! and increment rounding.

use crate::types::{EquipmentClass, SetLogEntry};

/// Estimate a one-rep max from a weight/rep pair (Epley).
///
/// A zero-rep or zero-weight set estimates 0.
pub fn estimate_1rm(weight: f64, reps: u32) -> f64 {
    if reps == 0 || weight <= 0.0 {
        return 0.0;
    }
    weight * (1.0 + reps as f64 / 30.0)
}

/// Invert the Epley estimate: the weight that makes `reps` a hard set given
/// an estimated 1RM.
pub fn weight_for_reps(e1rm: f64, reps: u32) -> f64 {
    if e1rm <= 0.0 {
        return 0.0;
    }
    e1rm / (1.0 + reps as f64 / 30.0)
}

/// Round a weight to the nearest equipment increment. A non-positive
/// increment (bodyweight, bands) always rounds to 0.
pub fn round_to_increment(weight: f64, increment: f64) -> f64 {
    if increment <= 0.0 {
        return 0.0;
    }
    ((weight / increment).round() * increment).max(0.0)
}

/// Round a weight up to the next equipment increment. Used for progression
/// so small percentage bumps still move the bar.
pub fn round_up_to_increment(weight: f64, increment: f64) -> f64 {
    if increment <= 0.0 {
        return 0.0;
    }
    ((weight / increment).ceil() * increment).max(0.0)
}

/// Outcome of evaluating recent performance for one exercise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressionDecision {
    Progress,
    Hold,
    Deload,
}

/// Fraction of planned reps below which a set counts as a shortfall.
const SHORTFALL_FRACTION: f64 = 0.8;
/// Highest RPE at which a fully-met session still earns a progression.
const PROGRESS_MAX_RPE: f64 = 8.0;

fn session_has_shortfall(session: &[SetLogEntry]) -> bool {
    session.iter().any(|set| {
        set.planned_reps > 0 && (set.reps as f64) < (set.planned_reps as f64) * SHORTFALL_FRACTION
    })
}

fn session_met_all_targets(session: &[SetLogEntry]) -> bool {
    !session.is_empty()
        && session.iter().all(|set| {
            set.reps >= set.planned_reps && set.rpe.map_or(true, |rpe| rpe <= PROGRESS_MAX_RPE)
        })
}

/// Evaluate recent sessions (newest first, one inner slice per session) for
/// one exercise.
///
/// Progress when the most recent session met every rep target at RPE <= 8.
/// Deload after two consecutive sessions with a >= 20% rep shortfall.
/// Hold otherwise, including when there is no history at all.
pub fn evaluate_progression(recent_sessions: &[Vec<SetLogEntry>]) -> ProgressionDecision {
    let Some(newest) = recent_sessions.first() else {
        return ProgressionDecision::Hold;
    };

    if session_met_all_targets(newest) {
        return ProgressionDecision::Progress;
    }

    if recent_sessions.len() >= 2
        && session_has_shortfall(newest)
        && session_has_shortfall(&recent_sessions[1])
    {
        return ProgressionDecision::Deload;
    }

    ProgressionDecision::Hold
}

/// Percentage bump applied on a Progress decision.
const PROGRESS_FACTOR: f64 = 1.025;
/// Percentage cut applied on a Deload decision.
const DELOAD_FACTOR: f64 = 0.9;

/// Turn a progression decision into the next working weight.
pub fn calculate_next_weight(
    last_weight: f64,
    decision: ProgressionDecision,
    class: EquipmentClass,
) -> f64 {
    let increment = class.weight_increment();
    match decision {
        ProgressionDecision::Progress => {
            round_up_to_increment(last_weight * PROGRESS_FACTOR, increment)
        }
        ProgressionDecision::Deload => round_to_increment(last_weight * DELOAD_FACTOR, increment),
        ProgressionDecision::Hold => round_to_increment(last_weight, increment),
    }
}

/// The best set of a session by estimated 1RM.
pub fn best_set(session: &[SetLogEntry]) -> Option<&SetLogEntry> {
    session.iter().max_by(|a, b| {
        estimate_1rm(a.weight, a.reps)
            .partial_cmp(&estimate_1rm(b.weight, b.reps))
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemId, SessionId, SetLogId};
    use chrono::Utc;

    fn set(weight: f64, reps: u32, planned_reps: u32, rpe: Option<f64>) -> SetLogEntry {
        let item_id = ItemId::new();
        SetLogEntry {
            id: SetLogId::derive(item_id, 1),
            session_id: SessionId::new(),
            item_id,
            exercise_id: "bench_press".into(),
            set_index: 1,
            weight,
            reps,
            rpe,
            planned_weight: weight,
            planned_reps,
            adjustment_applied: None,
            logged_at: Utc::now(),
        }
    }

    #[test]
    fn test_epley_roundtrip() {
        let e1rm = estimate_1rm(100.0, 5);
        assert!((e1rm - 116.666).abs() < 0.01);
        let back = weight_for_reps(e1rm, 5);
        assert!((back - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_reps_estimate_zero() {
        assert_eq!(estimate_1rm(100.0, 0), 0.0);
        assert_eq!(estimate_1rm(0.0, 5), 0.0);
    }

    #[test]
    fn test_rounding_to_increment() {
        assert_eq!(round_to_increment(61.3, 2.5), 62.5);
        assert_eq!(round_to_increment(61.2, 2.5), 62.5);
        assert_eq!(round_to_increment(61.0, 2.5), 60.0);
        assert_eq!(round_to_increment(50.0, 0.0), 0.0);
    }

    #[test]
    fn test_round_up_always_moves() {
        assert_eq!(round_up_to_increment(60.1, 2.5), 62.5);
        assert_eq!(round_up_to_increment(60.0, 2.5), 60.0);
    }

    #[test]
    fn test_progress_when_all_targets_met() {
        let sessions = vec![vec![
            set(60.0, 8, 8, Some(7.0)),
            set(60.0, 8, 8, Some(7.5)),
        ]];
        assert_eq!(evaluate_progression(&sessions), ProgressionDecision::Progress);
    }

    #[test]
    fn test_no_progress_at_high_rpe() {
        let sessions = vec![vec![set(60.0, 8, 8, Some(9.5))]];
        assert_eq!(evaluate_progression(&sessions), ProgressionDecision::Hold);
    }

    #[test]
    fn test_deload_after_two_shortfall_sessions() {
        let sessions = vec![
            vec![set(60.0, 5, 8, Some(9.0))],
            vec![set(60.0, 5, 8, Some(9.0))],
        ];
        assert_eq!(evaluate_progression(&sessions), ProgressionDecision::Deload);
    }

    #[test]
    fn test_single_shortfall_holds() {
        let sessions = vec![
            vec![set(60.0, 5, 8, Some(9.0))],
            vec![set(60.0, 8, 8, Some(7.0))],
        ];
        assert_eq!(evaluate_progression(&sessions), ProgressionDecision::Hold);
    }

    #[test]
    fn test_empty_history_holds() {
        assert_eq!(evaluate_progression(&[]), ProgressionDecision::Hold);
    }

    #[test]
    fn test_next_weight_progress_rounds_up() {
        let next = calculate_next_weight(
            60.0,
            ProgressionDecision::Progress,
            EquipmentClass::Barbell,
        );
        assert_eq!(next, 62.5);
        assert!(next > 60.0);
    }

    #[test]
    fn test_next_weight_deload_cuts_ten_percent() {
        let next =
            calculate_next_weight(100.0, ProgressionDecision::Deload, EquipmentClass::Barbell);
        assert_eq!(next, 90.0);
    }

    #[test]
    fn test_next_weight_bodyweight_stays_zero() {
        let next = calculate_next_weight(
            0.0,
            ProgressionDecision::Progress,
            EquipmentClass::Bodyweight,
        );
        assert_eq!(next, 0.0);
    }

    #[test]
    fn test_best_set_by_e1rm() {
        let session = vec![
            set(60.0, 5, 5, Some(7.0)),
            set(80.0, 2, 5, Some(8.0)),
            set(70.0, 6, 5, Some(8.0)),
        ];
        // 70x6 -> e1rm 84, 80x2 -> 85.3, 60x5 -> 70
        assert_eq!(best_set(&session).unwrap().weight, 80.0);
    }
}
