//! Core domain types for the Liftplan engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercises, movement intents, and equipment
//! - Goals, constraints, and user profiles
//! - Planned sessions and decision traces
//! - Program (four-week block) structure
//! - Session runtime state and results
//! - Persistence-layer identifiers and records

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Persistence-layer session identifier.
///
/// This is the real key the persistence collaborator stores sessions under.
/// It is generated once (a v4 UUID) when a session is created and propagated
/// verbatim through runtime state, offline operations, and store calls.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persistence-layer session-item identifier.
///
/// Every exercise slot in a running session is keyed by one of these. Like
/// `SessionId` it is a real upstream key, never a locally-synthesized
/// placeholder; payload builders must only ever see this type.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deterministic set-log identifier derived from real upstream ids.
///
/// `{item_id}#{set_index}` - stable across retries, which is what makes the
/// offline queue's existence prechecks possible.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SetLogId(pub String);

impl SetLogId {
    pub fn derive(item_id: ItemId, set_index: u32) -> Self {
        Self(format!("{}#{}", item_id, set_index))
    }
}

impl fmt::Display for SetLogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Movement Intents and Equipment
// ============================================================================

/// A named movement pattern an exercise trains.
#[derive(
    Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum MovementIntent {
    HorizontalPress,
    VerticalPress,
    HorizontalPull,
    VerticalPull,
    Squat,
    HipHinge,
    Lunge,
    Carry,
    CoreBrace,
    CoreRotation,
    ElbowFlexion,
    ElbowExtension,
    LateralRaise,
    CalfRaise,
}

impl MovementIntent {
    /// Whether this intent belongs to the fixed compound-movement set.
    pub fn is_compound(self) -> bool {
        matches!(
            self,
            MovementIntent::HorizontalPress
                | MovementIntent::VerticalPress
                | MovementIntent::HorizontalPull
                | MovementIntent::VerticalPull
                | MovementIntent::Squat
                | MovementIntent::HipHinge
                | MovementIntent::Lunge
                | MovementIntent::Carry
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            MovementIntent::HorizontalPress => "horizontal press",
            MovementIntent::VerticalPress => "vertical press",
            MovementIntent::HorizontalPull => "horizontal pull",
            MovementIntent::VerticalPull => "vertical pull",
            MovementIntent::Squat => "squat",
            MovementIntent::HipHinge => "hip hinge",
            MovementIntent::Lunge => "lunge",
            MovementIntent::Carry => "carry",
            MovementIntent::CoreBrace => "core brace",
            MovementIntent::CoreRotation => "core rotation",
            MovementIntent::ElbowFlexion => "elbow flexion",
            MovementIntent::ElbowExtension => "elbow extension",
            MovementIntent::LateralRaise => "lateral raise",
            MovementIntent::CalfRaise => "calf raise",
        }
    }
}

impl fmt::Display for MovementIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A piece of equipment an exercise may require.
#[derive(
    Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum Equipment {
    Barbell,
    Dumbbells,
    Kettlebell,
    Rack,
    Bench,
    Cables,
    Machine,
    PullupBar,
    DipStation,
    Bands,
    Bodyweight,
}

impl Equipment {
    /// Parse a config-file equipment name. Returns None for unknown names.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "barbell" => Some(Equipment::Barbell),
            "dumbbells" | "dumbbell" => Some(Equipment::Dumbbells),
            "kettlebell" => Some(Equipment::Kettlebell),
            "rack" | "squat_rack" => Some(Equipment::Rack),
            "bench" => Some(Equipment::Bench),
            "cables" | "cable" => Some(Equipment::Cables),
            "machine" | "machines" => Some(Equipment::Machine),
            "pullup_bar" | "pull_up_bar" => Some(Equipment::PullupBar),
            "dip_station" => Some(Equipment::DipStation),
            "bands" | "band" => Some(Equipment::Bands),
            "bodyweight" => Some(Equipment::Bodyweight),
            _ => None,
        }
    }

    /// Whether this equipment carries external load that gets a weight
    /// prescription (racks, benches and bars you hang from do not).
    pub fn is_loadable(self) -> bool {
        matches!(
            self,
            Equipment::Barbell
                | Equipment::Dumbbells
                | Equipment::Kettlebell
                | Equipment::Cables
                | Equipment::Machine
        )
    }
}

/// Equipment class used for weight increments and starting-load defaults.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentClass {
    Barbell,
    Dumbbell,
    Kettlebell,
    Cable,
    Machine,
    Band,
    Bodyweight,
}

impl EquipmentClass {
    /// Smallest practical load step for the class, in kg.
    pub fn weight_increment(self) -> f64 {
        match self {
            EquipmentClass::Barbell => 2.5,
            EquipmentClass::Dumbbell => 2.0,
            EquipmentClass::Kettlebell => 4.0,
            EquipmentClass::Cable => 2.5,
            EquipmentClass::Machine => 5.0,
            EquipmentClass::Band | EquipmentClass::Bodyweight => 0.0,
        }
    }
}

/// Preferred equipment style, used as a soft scoring signal.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentBias {
    Machines,
    FreeWeights,
}

// ============================================================================
// Muscles, Injuries, Experience, Goals
// ============================================================================

#[derive(
    Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum MuscleGroup {
    Chest,
    Back,
    Shoulders,
    Biceps,
    Triceps,
    Forearms,
    Quads,
    Hamstrings,
    Glutes,
    Calves,
    Core,
}

/// Injury tags that contraindicate exercises.
#[derive(
    Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum InjuryTag {
    ShoulderPain,
    ElbowPain,
    WristPain,
    LowerBackPain,
    HipPain,
    KneePain,
}

/// Exercise difficulty tier and user experience level share one scale.
#[derive(
    Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl ExperienceLevel {
    pub fn rank(self) -> i32 {
        match self {
            ExperienceLevel::Beginner => 0,
            ExperienceLevel::Intermediate => 1,
            ExperienceLevel::Advanced => 2,
        }
    }
}

/// Named training goals that can be blended by weight.
#[derive(
    Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    BuildStrength,
    BuildMuscle,
    LoseFat,
    ImproveEndurance,
    GeneralFitness,
}

/// Goal weighting map. Weights are non-negative and need not sum to 1;
/// the engine normalizes before blending.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct GoalWeights(pub BTreeMap<Goal, f64>);

impl GoalWeights {
    pub fn single(goal: Goal) -> Self {
        let mut m = BTreeMap::new();
        m.insert(goal, 1.0);
        Self(m)
    }

    /// Active goals with weights normalized to sum to 1.
    ///
    /// Zero and negative weights are dropped. If nothing remains,
    /// general_fitness at weight 1 is assumed.
    pub fn normalized(&self) -> Vec<(Goal, f64)> {
        let active: Vec<(Goal, f64)> = self
            .0
            .iter()
            .filter(|(_, w)| **w > 0.0)
            .map(|(g, w)| (*g, *w))
            .collect();
        let total: f64 = active.iter().map(|(_, w)| w).sum();
        if active.is_empty() || total <= 0.0 {
            return vec![(Goal::GeneralFitness, 1.0)];
        }
        active.into_iter().map(|(g, w)| (g, w / total)).collect()
    }

    /// Highest-weighted goal. Ties resolve by goal ordering for determinism.
    pub fn dominant(&self) -> Goal {
        self.normalized()
            .into_iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(g, _)| g)
            .unwrap_or(Goal::GeneralFitness)
    }

    /// Second-highest-weighted goal, if more than one is active.
    pub fn secondary(&self) -> Option<Goal> {
        let mut active = self.normalized();
        active.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        active.get(1).map(|(g, _)| *g)
    }
}

// ============================================================================
// Exercise Definition
// ============================================================================

/// A static exercise definition from the catalog. Immutable once built.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub intents: Vec<MovementIntent>,
    /// Legacy any-of equipment list, used when the explicit lists are absent.
    #[serde(default)]
    pub equipment: Vec<Equipment>,
    /// Every item here must be available for the exercise to be doable.
    #[serde(default)]
    pub equipment_all: Option<Vec<Equipment>>,
    /// At least one item here must be available.
    #[serde(default)]
    pub equipment_any: Option<Vec<Equipment>>,
    pub primary_muscles: Vec<MuscleGroup>,
    #[serde(default)]
    pub secondary_muscles: Vec<MuscleGroup>,
    pub difficulty: ExperienceLevel,
    #[serde(default)]
    pub contraindications: Vec<InjuryTag>,
    #[serde(default)]
    pub substitution_tags: Vec<String>,
    #[serde(default)]
    pub unilateral: bool,
}

impl Exercise {
    /// All equipment mentioned by any of the three declarations.
    fn declared_equipment(&self) -> Vec<Equipment> {
        let mut out = Vec::new();
        if let Some(all) = &self.equipment_all {
            out.extend(all.iter().copied());
        }
        if let Some(any) = &self.equipment_any {
            out.extend(any.iter().copied());
        }
        if self.equipment_all.is_none() && self.equipment_any.is_none() {
            out.extend(self.equipment.iter().copied());
        }
        out
    }

    /// Load-rounding class, derived from the declared equipment in a fixed
    /// precedence order.
    pub fn equipment_class(&self) -> EquipmentClass {
        let declared = self.declared_equipment();
        for (eq, class) in [
            (Equipment::Barbell, EquipmentClass::Barbell),
            (Equipment::Dumbbells, EquipmentClass::Dumbbell),
            (Equipment::Kettlebell, EquipmentClass::Kettlebell),
            (Equipment::Cables, EquipmentClass::Cable),
            (Equipment::Machine, EquipmentClass::Machine),
            (Equipment::Bands, EquipmentClass::Band),
        ] {
            if declared.contains(&eq) {
                return class;
            }
        }
        EquipmentClass::Bodyweight
    }

    /// True when no declared equipment carries external load. Such
    /// exercises always prescribe weight 0.
    pub fn is_bodyweight_only(&self) -> bool {
        !self.declared_equipment().iter().any(|e| e.is_loadable())
    }
}

// ============================================================================
// Constraints and User Snapshot
// ============================================================================

/// The user's hard and soft constraints for session generation.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct TrainingConstraints {
    pub available_equipment: BTreeSet<Equipment>,
    #[serde(default)]
    pub injuries: BTreeSet<InjuryTag>,
    #[serde(default)]
    pub forbidden_intents: BTreeSet<MovementIntent>,
    /// Total session time budget in minutes.
    pub time_budget_minutes: u32,
    /// Intents to satisfy first, in order.
    #[serde(default)]
    pub priority_intents: Vec<MovementIntent>,
    #[serde(default)]
    pub equipment_bias: Option<EquipmentBias>,
    #[serde(default)]
    pub disliked_exercises: BTreeSet<String>,
}

/// Snapshot of the user taken when a plan is generated.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserSnapshot {
    pub experience: ExperienceLevel,
    /// Explicitly supplied one-rep maxes by exercise id, if the user has
    /// tested any.
    #[serde(default)]
    pub known_one_rep_maxes: BTreeMap<String, f64>,
}

impl Default for UserSnapshot {
    fn default() -> Self {
        Self {
            experience: ExperienceLevel::Beginner,
            known_one_rep_maxes: BTreeMap::new(),
        }
    }
}

// ============================================================================
// Planned Session
// ============================================================================

/// Priority tier of a planned exercise within a session.
#[derive(
    Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    Primary,
    Accessory,
    Isolation,
}

impl PriorityTier {
    /// Estimated minutes one exercise of this tier takes.
    pub fn estimated_minutes(self) -> u32 {
        match self {
            PriorityTier::Primary => 8,
            PriorityTier::Accessory => 5,
            PriorityTier::Isolation => 3,
        }
    }
}

/// One prescribed set. Indices are 1-based and contiguous per exercise.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PlannedSet {
    pub index: u32,
    pub target_reps: u32,
    pub suggested_weight: f64,
    pub rest_seconds: u32,
}

/// A ranked alternative that was considered but not selected.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RankedAlternative {
    pub exercise_id: String,
    pub score: i32,
    pub reason: String,
}

/// Machine-checkable record of why an exercise was selected.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct DecisionTrace {
    pub applied_constraints: Vec<String>,
    pub rationale: String,
    /// Up to 3 runners-up with one-line reasons.
    pub alternatives: Vec<RankedAlternative>,
    pub confidence: f64,
    pub progression_note: Option<String>,
}

/// A fully prescribed exercise within a session plan.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PlannedExercise {
    pub exercise_id: String,
    pub name: String,
    pub order: u32,
    pub tier: PriorityTier,
    /// The intent(s) this selection satisfies.
    pub intents: Vec<MovementIntent>,
    /// Blended target rep range the set targets were drawn from.
    pub rep_range: (u32, u32),
    pub sets: Vec<PlannedSet>,
    pub trace: DecisionTrace,
}

/// How the session's sets are grouped for execution.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GroupingStyle {
    StraightSets,
    Circuit,
}

/// A complete, immutable session plan.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionPlan {
    pub template_id: String,
    pub label: Option<String>,
    pub goals: GoalWeights,
    pub constraints: TrainingConstraints,
    pub user: UserSnapshot,
    pub grouping_style: GroupingStyle,
    pub exercises: Vec<PlannedExercise>,
    pub estimated_duration_minutes: u32,
    pub created_at: DateTime<Utc>,
}

/// Comparison summary for preview/production equivalence checks.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PlanSummary {
    pub grouping_style: GroupingStyle,
    pub total_sets: u32,
    /// Target rep range across primary-tier exercises, if any.
    pub primary_rep_range: Option<(u32, u32)>,
}

impl SessionPlan {
    pub fn summary(&self) -> PlanSummary {
        let total_sets = self.exercises.iter().map(|e| e.sets.len() as u32).sum();
        let primary: Vec<&PlannedExercise> = self
            .exercises
            .iter()
            .filter(|e| e.tier == PriorityTier::Primary)
            .collect();
        let primary_rep_range = match (
            primary.iter().map(|e| e.rep_range.0).min(),
            primary.iter().map(|e| e.rep_range.1).max(),
        ) {
            (Some(lo), Some(hi)) => Some((lo, hi)),
            _ => None,
        };
        PlanSummary {
            grouping_style: self.grouping_style,
            total_sets,
            primary_rep_range,
        }
    }
}

// ============================================================================
// Program (Four-Week Block) Types
// ============================================================================

/// Canonical weekday, 1 = Monday .. 7 = Sunday.
#[derive(
    Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub fn number(self) -> u32 {
        match self {
            Weekday::Monday => 1,
            Weekday::Tuesday => 2,
            Weekday::Wednesday => 3,
            Weekday::Thursday => 4,
            Weekday::Friday => 5,
            Weekday::Saturday => 6,
            Weekday::Sunday => 7,
        }
    }

    pub fn from_number(n: u32) -> Option<Self> {
        match n {
            1 => Some(Weekday::Monday),
            2 => Some(Weekday::Tuesday),
            3 => Some(Weekday::Wednesday),
            4 => Some(Weekday::Thursday),
            5 => Some(Weekday::Friday),
            6 => Some(Weekday::Saturday),
            7 => Some(Weekday::Sunday),
            _ => None,
        }
    }

    pub fn from_chrono(day: chrono::Weekday) -> Self {
        // chrono numbers Monday as 0 here
        Self::from_number(day.num_days_from_monday() + 1)
            .unwrap_or(Weekday::Monday)
    }

    pub fn label(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Training split families the planner can choose from.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SplitKind {
    FullBodyAb,
    FullBodyRotation,
    PushPullLegs,
    UpperLower,
    PushPullLegsUpperLower,
    DoublePushPullLegs,
}

/// Muscle-frequency preference for split selection.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SplitPreference {
    #[default]
    Auto,
    MuscleTwiceWeekly,
}

/// Profile inputs the program planner needs.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PlannerProfile {
    pub experience: ExperienceLevel,
    pub goals: GoalWeights,
    #[serde(default)]
    pub split_preference: SplitPreference,
}

/// One abstract training day within the block (label + template).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProgramDayPlan {
    pub label: String,
    pub template_id: String,
    pub intents: Vec<MovementIntent>,
}

/// One week's weekday -> day-plan mapping.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WeekPlan {
    pub week_index: u32,
    pub days: BTreeMap<Weekday, ProgramDayPlan>,
}

/// The frozen four-week block. All four weeks share an identical
/// weekday -> day-plan mapping.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FourWeekProgramPlan {
    pub weekdays: Vec<Weekday>,
    pub split: SplitKind,
    pub weeks: Vec<WeekPlan>,
    /// Non-fatal degradations recorded during planning.
    pub warnings: Vec<String>,
}

/// A concrete dated training day expanded from the block.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProgramDay {
    pub week_index: u32,
    pub weekday: Weekday,
    pub date: NaiveDate,
    pub plan: ProgramDayPlan,
}

// ============================================================================
// Session Runtime Types
// ============================================================================

/// Session lifecycle status.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Paused,
    Completing,
    Completed,
}

/// Per-exercise lifecycle status.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseStatus {
    Pending,
    InProgress,
    Completed,
    Skipped,
}

/// Caller input when logging a completed set.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SetRecord {
    pub set_index: u32,
    pub weight: f64,
    pub reps: u32,
    pub rpe: Option<f64>,
}

/// A logged set, recording both what was planned and what happened.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SetLogEntry {
    pub id: SetLogId,
    pub session_id: SessionId,
    pub item_id: ItemId,
    pub exercise_id: String,
    pub set_index: u32,
    pub weight: f64,
    pub reps: u32,
    pub rpe: Option<f64>,
    pub planned_weight: f64,
    pub planned_reps: u32,
    /// Rule id of the pending adjustment that was applied to this set, if any.
    pub adjustment_applied: Option<String>,
    pub logged_at: DateTime<Utc>,
}

/// A weight/rep adjustment produced by the autoregulation engine.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AutoregulationAdjustment {
    pub rule_id: String,
    pub weight_multiplier: Option<f64>,
    pub weight_delta: Option<f64>,
    pub target_rep_delta: Option<i32>,
    #[serde(default)]
    pub skip_remaining_sets: bool,
    pub message: String,
    pub confidence: f64,
}

/// Append-only record of a mid-session adaptation decision.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AdaptationTraceEntry {
    pub at: DateTime<Utc>,
    pub exercise_id: Option<String>,
    pub set_index: Option<u32>,
    pub rule_id: String,
    pub message: String,
    pub confidence: f64,
}

/// Runtime state for one exercise within a running session.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseRuntimeState {
    pub exercise_id: String,
    /// Persistence-layer item key. Always an externally valid `ItemId`,
    /// never a synthetic placeholder.
    pub item_id: ItemId,
    pub status: ExerciseStatus,
    pub tier: PriorityTier,
    pub bodyweight_only: bool,
    pub planned_sets: Vec<PlannedSet>,
    pub completed_sets: u32,
    pub next_set_index: u32,
    /// Pending autoregulation adjustments keyed by the set index they
    /// apply to.
    pub pending_adjustments: BTreeMap<u32, AutoregulationAdjustment>,
    pub skip_reason: Option<String>,
}

/// Full state of a running session. Evolves only through pure transition
/// functions that return a new value.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionRuntimeState {
    pub session_id: SessionId,
    pub template_id: String,
    pub grouping_style: GroupingStyle,
    pub started_at: DateTime<Utc>,
    pub status: SessionStatus,
    /// Cursor into `exercise_order`.
    pub cursor: usize,
    pub exercise_order: Vec<String>,
    pub exercises: BTreeMap<String, ExerciseRuntimeState>,
    pub set_log: Vec<SetLogEntry>,
    pub adaptation_trace: Vec<AdaptationTraceEntry>,
    pub time_budget_minutes: u32,
}

/// Personal-record categories tracked per exercise.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PrKind {
    MaxWeight,
    RepsNearMaxWeight,
    EstimatedOneRm,
    SessionVolume,
}

/// A new personal record detected at session end.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PersonalRecord {
    pub exercise_id: String,
    pub kind: PrKind,
    pub previous: f64,
    pub achieved: f64,
}

/// Previous bests supplied to PR detection, per exercise.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct PreviousBests {
    pub max_weight: f64,
    /// Best reps achieved at >= 90% of max weight.
    pub reps_at_near_max: u32,
    pub best_e1rm: f64,
    pub best_session_volume: f64,
    pub level: u32,
}

/// Level-up emitted when an exercise sets at least one PR in a session.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LevelUpEvent {
    pub exercise_id: String,
    pub from_level: u32,
    pub to_level: u32,
}

/// The handoff artifact consumed by analytics/notification collaborators.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionRuntimeResult {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_seconds: u64,
    pub exercises_completed: u32,
    pub exercises_skipped: u32,
    pub total_sets: u32,
    /// Sum of weight x reps over every logged set.
    pub total_volume: f64,
    pub personal_records: Vec<PersonalRecord>,
    pub level_ups: Vec<LevelUpEvent>,
    pub adaptation_trace: Vec<AdaptationTraceEntry>,
}

// ============================================================================
// Persistence Records
// ============================================================================

/// Session row as the persistence collaborator stores it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub template_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finalized: bool,
}

/// Session-item row (one per planned exercise).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ItemRecord {
    pub item_id: ItemId,
    pub session_id: SessionId,
    pub exercise_id: String,
    pub status: ExerciseStatus,
    #[serde(default)]
    pub skip_reason: Option<String>,
}

/// Final session summary written at finalization.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionSummaryRecord {
    pub session_id: SessionId,
    pub ended_at: DateTime<Utc>,
    pub duration_seconds: u64,
    pub total_sets: u32,
    pub total_volume: f64,
}
