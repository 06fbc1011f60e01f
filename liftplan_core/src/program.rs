//! Four-week program planner.
//!
//! Picks a training split from the user's schedule and dominant goal,
//! cycles the split's day-plans across the selected weekdays, and freezes
//! the resulting weekday mapping across all four weeks of the block.
//! Progression across the block happens at session-generation time through
//! loading suggestions, never by mutating the block itself.

use crate::error::{Error, Result};
use crate::rules::Rules;
use crate::types::*;
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;

/// Number of weeks in a frozen block.
const BLOCK_WEEKS: u32 = 4;

/// Build the frozen four-week plan for a profile and weekday selection.
///
/// Selected weekdays are sorted and deduplicated; the chosen split's
/// day-plans are cycled across them in order. Infeasible muscle-frequency
/// preferences degrade to automatic selection with a recorded warning
/// rather than failing.
pub fn build_four_week_plan(
    rules: &Rules,
    profile: &PlannerProfile,
    selected_weekdays: &[Weekday],
) -> Result<FourWeekProgramPlan> {
    let mut weekdays: Vec<Weekday> = selected_weekdays.to_vec();
    weekdays.sort();
    weekdays.dedup();
    if weekdays.is_empty() {
        return Err(Error::Planning("No training weekdays selected".into()));
    }

    let dominant = profile.goals.dominant();
    let secondary = profile.goals.secondary();
    let (split, day_plans, warnings) = select_split(
        rules,
        weekdays.len(),
        dominant,
        secondary,
        profile.split_preference,
    )?;

    tracing::info!(
        "Selected split {:?} for {} days/week (dominant goal {:?})",
        split,
        weekdays.len(),
        dominant
    );

    let mut days: BTreeMap<Weekday, ProgramDayPlan> = BTreeMap::new();
    for (i, weekday) in weekdays.iter().enumerate() {
        days.insert(*weekday, day_plans[i % day_plans.len()].clone());
    }

    let weeks = (1..=BLOCK_WEEKS)
        .map(|week_index| WeekPlan {
            week_index,
            days: days.clone(),
        })
        .collect();

    Ok(FourWeekProgramPlan {
        weekdays,
        split,
        weeks,
        warnings,
    })
}

/// Expand the abstract block into concrete calendar dates.
///
/// The start date is normalized to the Monday of its week; each day is then
/// `monday + (week-1)*7 + (weekday-1)` days. Dates are plain calendar days
/// (no UTC normalization), so early-morning users east of UTC keep their
/// local weekday. A mismatch between the computed date's weekday and the
/// expected one fails fast.
pub fn generate_program_days(
    plan: &FourWeekProgramPlan,
    start_date: NaiveDate,
) -> Result<Vec<ProgramDay>> {
    let monday = start_date
        - Duration::days(i64::from(start_date.weekday().num_days_from_monday()));

    let mut out = Vec::new();
    for week in &plan.weeks {
        for (weekday, day_plan) in &week.days {
            let offset = i64::from(week.week_index - 1) * 7 + i64::from(weekday.number() - 1);
            let date = monday + Duration::days(offset);
            let actual = Weekday::from_chrono(date.weekday());
            if actual != *weekday {
                return Err(Error::Planning(format!(
                    "Date math produced {} for expected {} (week {}, {})",
                    actual, weekday, week.week_index, date
                )));
            }
            out.push(ProgramDay {
                week_index: week.week_index,
                weekday: *weekday,
                date,
                plan: day_plan.clone(),
            });
        }
    }
    Ok(out)
}

fn day_plan(rules: &Rules, template_id: &str) -> Result<ProgramDayPlan> {
    let template = rules.template(template_id)?;
    Ok(ProgramDayPlan {
        label: template.label.clone(),
        template_id: template.id.clone(),
        intents: template.required_intents.clone(),
    })
}

/// Whether a goal leans toward conditioning-style full-body work.
fn is_conditioning_goal(goal: Goal) -> bool {
    matches!(goal, Goal::LoseFat | Goal::ImproveEndurance)
}

/// Split table keyed by days per week, branching on the dominant (and, for
/// general-fitness profiles, secondary) goal where two split families
/// compete at the same day count.
fn select_split(
    rules: &Rules,
    days: usize,
    dominant: Goal,
    secondary: Option<Goal>,
    preference: SplitPreference,
) -> Result<(SplitKind, Vec<ProgramDayPlan>, Vec<String>)> {
    let mut warnings = Vec::new();

    // Twice-weekly muscle frequency is inherent to the 2/4/6-day splits;
    // at 3 or 5 days it cannot be honored and degrades to auto.
    if preference == SplitPreference::MuscleTwiceWeekly && matches!(days, 3 | 5) {
        let warning = format!(
            "Twice-weekly muscle frequency is not satisfiable at {} days/week; \
             falling back to automatic split selection",
            days
        );
        tracing::warn!("{}", warning);
        warnings.push(warning);
    }

    let (split, templates): (SplitKind, Vec<&str>) = match days {
        0 | 1 => (SplitKind::FullBodyAb, vec!["full_body_a"]),
        2 => (SplitKind::FullBodyAb, vec!["full_body_a", "full_body_b"]),
        3 => {
            // A general-fitness lead defers to the secondary goal's lean
            let conditioning = is_conditioning_goal(dominant)
                || (dominant == Goal::GeneralFitness
                    && secondary.map_or(false, is_conditioning_goal));
            if conditioning {
                (
                    SplitKind::FullBodyRotation,
                    vec!["full_body_a", "full_body_b", "full_body_c"],
                )
            } else {
                (
                    SplitKind::PushPullLegs,
                    vec!["push_day", "pull_day", "leg_day"],
                )
            }
        }
        4 => (
            SplitKind::UpperLower,
            vec!["upper_day", "lower_day", "upper_day", "lower_day"],
        ),
        5 => (
            SplitKind::PushPullLegsUpperLower,
            vec!["push_day", "pull_day", "leg_day", "upper_day", "lower_day"],
        ),
        _ => (
            SplitKind::DoublePushPullLegs,
            vec![
                "push_day", "pull_day", "leg_day", "push_day", "pull_day", "leg_day",
            ],
        ),
    };

    let day_plans = templates
        .into_iter()
        .map(|id| day_plan(rules, id))
        .collect::<Result<Vec<_>>>()?;

    Ok((split, day_plans, warnings))
}
