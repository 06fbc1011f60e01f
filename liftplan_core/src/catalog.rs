//! Built-in exercise catalog.
//!
//! The catalog is an immutable collection of exercise definitions loaded
//! once at process start. Exercises are stored in declaration order because
//! catalog order is the stable tie-break when scored candidates are ranked.

use crate::types::*;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
///
/// This function returns a reference to the pre-built catalog, avoiding
/// the overhead of rebuilding it on every operation.
pub fn default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

/// The complete catalog of exercise definitions.
#[derive(Clone, Debug)]
pub struct Catalog {
    exercises: Vec<Exercise>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog from a list of exercises, preserving order.
    pub fn new(exercises: Vec<Exercise>) -> Self {
        let index = exercises
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();
        Self { exercises, index }
    }

    pub fn get(&self, id: &str) -> Option<&Exercise> {
        self.index.get(id).map(|i| &self.exercises[*i])
    }

    /// Iterate exercises in catalog (declaration) order.
    pub fn iter(&self) -> impl Iterator<Item = &Exercise> {
        self.exercises.iter()
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    /// Validate the catalog for consistency and completeness
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for exercise in &self.exercises {
            if exercise.id.is_empty() {
                errors.push("Exercise has empty ID".to_string());
            }
            if !seen.insert(exercise.id.clone()) {
                errors.push(format!("Duplicate exercise ID '{}'", exercise.id));
            }
            if exercise.name.is_empty() {
                errors.push(format!("Exercise '{}' has empty name", exercise.id));
            }
            if exercise.intents.is_empty() {
                errors.push(format!("Exercise '{}' declares no intents", exercise.id));
            }
            if exercise.primary_muscles.is_empty() {
                errors.push(format!(
                    "Exercise '{}' declares no primary muscles",
                    exercise.id
                ));
            }
            if exercise.equipment.is_empty()
                && exercise.equipment_all.is_none()
                && exercise.equipment_any.is_none()
            {
                errors.push(format!(
                    "Exercise '{}' declares no equipment at all",
                    exercise.id
                ));
            }
            if let Some(all) = &exercise.equipment_all {
                if all.is_empty() {
                    errors.push(format!(
                        "Exercise '{}' has an empty all-required equipment list",
                        exercise.id
                    ));
                }
            }
            if let Some(any) = &exercise.equipment_any {
                if any.is_empty() {
                    errors.push(format!(
                        "Exercise '{}' has an empty any-of equipment list",
                        exercise.id
                    ));
                }
            }
        }

        // Every movement intent should be trainable with at least one exercise
        for intent in [
            MovementIntent::HorizontalPress,
            MovementIntent::VerticalPress,
            MovementIntent::HorizontalPull,
            MovementIntent::VerticalPull,
            MovementIntent::Squat,
            MovementIntent::HipHinge,
            MovementIntent::Lunge,
            MovementIntent::Carry,
            MovementIntent::CoreBrace,
            MovementIntent::CoreRotation,
            MovementIntent::ElbowFlexion,
            MovementIntent::ElbowExtension,
            MovementIntent::LateralRaise,
            MovementIntent::CalfRaise,
        ] {
            if !self.exercises.iter().any(|e| e.intents.contains(&intent)) {
                errors.push(format!("No exercise covers intent '{}'", intent));
            }
        }

        errors
    }
}

/// Builds the default catalog with the built-in exercise definitions
pub fn build_default_catalog() -> Catalog {
    let mut exercises = Vec::new();

    // ========================================================================
    // Squat pattern
    // ========================================================================

    exercises.push(Exercise {
        id: "squat".into(),
        name: "Barbell Back Squat".into(),
        aliases: vec!["back squat".into()],
        intents: vec![MovementIntent::Squat],
        equipment: vec![],
        equipment_all: Some(vec![Equipment::Barbell, Equipment::Rack]),
        equipment_any: None,
        primary_muscles: vec![MuscleGroup::Quads, MuscleGroup::Glutes],
        secondary_muscles: vec![MuscleGroup::Core, MuscleGroup::Hamstrings],
        difficulty: ExperienceLevel::Intermediate,
        contraindications: vec![InjuryTag::KneePain, InjuryTag::LowerBackPain],
        substitution_tags: vec!["squat_pattern".into()],
        unilateral: false,
    });

    exercises.push(Exercise {
        id: "goblet_squat".into(),
        name: "Goblet Squat".into(),
        aliases: vec![],
        intents: vec![MovementIntent::Squat],
        equipment: vec![],
        equipment_all: None,
        equipment_any: Some(vec![Equipment::Dumbbells, Equipment::Kettlebell]),
        primary_muscles: vec![MuscleGroup::Quads, MuscleGroup::Glutes],
        secondary_muscles: vec![MuscleGroup::Core],
        difficulty: ExperienceLevel::Beginner,
        contraindications: vec![InjuryTag::KneePain],
        substitution_tags: vec!["squat_pattern".into()],
        unilateral: false,
    });

    exercises.push(Exercise {
        id: "leg_press".into(),
        name: "Leg Press".into(),
        aliases: vec![],
        intents: vec![MovementIntent::Squat],
        equipment: vec![Equipment::Machine],
        equipment_all: None,
        equipment_any: None,
        primary_muscles: vec![MuscleGroup::Quads],
        secondary_muscles: vec![MuscleGroup::Glutes],
        difficulty: ExperienceLevel::Beginner,
        contraindications: vec![InjuryTag::KneePain],
        substitution_tags: vec!["squat_pattern".into()],
        unilateral: false,
    });

    // ========================================================================
    // Hip hinge pattern
    // ========================================================================

    exercises.push(Exercise {
        id: "deadlift".into(),
        name: "Conventional Deadlift".into(),
        aliases: vec![],
        intents: vec![MovementIntent::HipHinge],
        equipment: vec![Equipment::Barbell],
        equipment_all: None,
        equipment_any: None,
        primary_muscles: vec![MuscleGroup::Hamstrings, MuscleGroup::Glutes, MuscleGroup::Back],
        secondary_muscles: vec![MuscleGroup::Forearms, MuscleGroup::Core],
        difficulty: ExperienceLevel::Advanced,
        contraindications: vec![InjuryTag::LowerBackPain],
        substitution_tags: vec!["hinge_pattern".into()],
        unilateral: false,
    });

    exercises.push(Exercise {
        id: "romanian_deadlift".into(),
        name: "Romanian Deadlift".into(),
        aliases: vec!["rdl".into()],
        intents: vec![MovementIntent::HipHinge],
        equipment: vec![],
        equipment_all: None,
        equipment_any: Some(vec![Equipment::Barbell, Equipment::Dumbbells]),
        primary_muscles: vec![MuscleGroup::Hamstrings, MuscleGroup::Glutes],
        secondary_muscles: vec![MuscleGroup::Back],
        difficulty: ExperienceLevel::Intermediate,
        contraindications: vec![InjuryTag::LowerBackPain],
        substitution_tags: vec!["hinge_pattern".into()],
        unilateral: false,
    });

    exercises.push(Exercise {
        id: "kettlebell_swing".into(),
        name: "Kettlebell Swing".into(),
        aliases: vec![],
        intents: vec![MovementIntent::HipHinge],
        equipment: vec![Equipment::Kettlebell],
        equipment_all: None,
        equipment_any: None,
        primary_muscles: vec![MuscleGroup::Glutes, MuscleGroup::Hamstrings],
        secondary_muscles: vec![MuscleGroup::Core, MuscleGroup::Shoulders],
        difficulty: ExperienceLevel::Beginner,
        contraindications: vec![InjuryTag::LowerBackPain],
        substitution_tags: vec!["hinge_pattern".into()],
        unilateral: false,
    });

    // ========================================================================
    // Horizontal press pattern
    // ========================================================================

    exercises.push(Exercise {
        id: "bench_press".into(),
        name: "Barbell Bench Press".into(),
        aliases: vec!["flat bench".into()],
        intents: vec![MovementIntent::HorizontalPress],
        equipment: vec![],
        equipment_all: Some(vec![Equipment::Barbell, Equipment::Bench]),
        equipment_any: None,
        primary_muscles: vec![MuscleGroup::Chest],
        secondary_muscles: vec![MuscleGroup::Triceps, MuscleGroup::Shoulders],
        difficulty: ExperienceLevel::Intermediate,
        contraindications: vec![InjuryTag::ShoulderPain],
        substitution_tags: vec!["horizontal_press".into()],
        unilateral: false,
    });

    exercises.push(Exercise {
        id: "dumbbell_bench_press".into(),
        name: "Dumbbell Bench Press".into(),
        aliases: vec![],
        intents: vec![MovementIntent::HorizontalPress],
        equipment: vec![],
        equipment_all: Some(vec![Equipment::Dumbbells, Equipment::Bench]),
        equipment_any: None,
        primary_muscles: vec![MuscleGroup::Chest],
        secondary_muscles: vec![MuscleGroup::Triceps, MuscleGroup::Shoulders],
        difficulty: ExperienceLevel::Beginner,
        contraindications: vec![InjuryTag::ShoulderPain],
        substitution_tags: vec!["horizontal_press".into()],
        unilateral: false,
    });

    exercises.push(Exercise {
        id: "pushup".into(),
        name: "Push-up".into(),
        aliases: vec!["press-up".into()],
        intents: vec![MovementIntent::HorizontalPress],
        equipment: vec![Equipment::Bodyweight],
        equipment_all: None,
        equipment_any: None,
        primary_muscles: vec![MuscleGroup::Chest],
        secondary_muscles: vec![MuscleGroup::Triceps, MuscleGroup::Core],
        difficulty: ExperienceLevel::Beginner,
        contraindications: vec![InjuryTag::WristPain],
        substitution_tags: vec!["horizontal_press".into()],
        unilateral: false,
    });

    // ========================================================================
    // Vertical press pattern
    // ========================================================================

    exercises.push(Exercise {
        id: "overhead_press".into(),
        name: "Barbell Overhead Press".into(),
        aliases: vec!["ohp".into(), "military press".into()],
        intents: vec![MovementIntent::VerticalPress],
        equipment: vec![Equipment::Barbell],
        equipment_all: None,
        equipment_any: None,
        primary_muscles: vec![MuscleGroup::Shoulders],
        secondary_muscles: vec![MuscleGroup::Triceps, MuscleGroup::Core],
        difficulty: ExperienceLevel::Intermediate,
        contraindications: vec![InjuryTag::ShoulderPain],
        substitution_tags: vec!["vertical_press".into()],
        unilateral: false,
    });

    exercises.push(Exercise {
        id: "dumbbell_shoulder_press".into(),
        name: "Dumbbell Shoulder Press".into(),
        aliases: vec![],
        intents: vec![MovementIntent::VerticalPress],
        equipment: vec![Equipment::Dumbbells],
        equipment_all: None,
        equipment_any: None,
        primary_muscles: vec![MuscleGroup::Shoulders],
        secondary_muscles: vec![MuscleGroup::Triceps],
        difficulty: ExperienceLevel::Beginner,
        contraindications: vec![InjuryTag::ShoulderPain],
        substitution_tags: vec!["vertical_press".into()],
        unilateral: false,
    });

    // ========================================================================
    // Horizontal pull pattern
    // ========================================================================

    exercises.push(Exercise {
        id: "barbell_row".into(),
        name: "Barbell Bent-Over Row".into(),
        aliases: vec!["bent-over row".into()],
        intents: vec![MovementIntent::HorizontalPull],
        equipment: vec![Equipment::Barbell],
        equipment_all: None,
        equipment_any: None,
        primary_muscles: vec![MuscleGroup::Back],
        secondary_muscles: vec![MuscleGroup::Biceps, MuscleGroup::Forearms],
        difficulty: ExperienceLevel::Intermediate,
        contraindications: vec![InjuryTag::LowerBackPain],
        substitution_tags: vec!["horizontal_pull".into()],
        unilateral: false,
    });

    exercises.push(Exercise {
        id: "dumbbell_row".into(),
        name: "One-Arm Dumbbell Row".into(),
        aliases: vec![],
        intents: vec![MovementIntent::HorizontalPull],
        equipment: vec![Equipment::Dumbbells],
        equipment_all: None,
        equipment_any: None,
        primary_muscles: vec![MuscleGroup::Back],
        secondary_muscles: vec![MuscleGroup::Biceps],
        difficulty: ExperienceLevel::Beginner,
        contraindications: vec![],
        substitution_tags: vec!["horizontal_pull".into()],
        unilateral: true,
    });

    exercises.push(Exercise {
        id: "seated_cable_row".into(),
        name: "Seated Cable Row".into(),
        aliases: vec![],
        intents: vec![MovementIntent::HorizontalPull],
        equipment: vec![Equipment::Cables],
        equipment_all: None,
        equipment_any: None,
        primary_muscles: vec![MuscleGroup::Back],
        secondary_muscles: vec![MuscleGroup::Biceps],
        difficulty: ExperienceLevel::Beginner,
        contraindications: vec![],
        substitution_tags: vec!["horizontal_pull".into()],
        unilateral: false,
    });

    // ========================================================================
    // Vertical pull pattern
    // ========================================================================

    exercises.push(Exercise {
        id: "pullup".into(),
        name: "Pull-up".into(),
        aliases: vec![],
        intents: vec![MovementIntent::VerticalPull],
        equipment: vec![Equipment::PullupBar],
        equipment_all: None,
        equipment_any: None,
        primary_muscles: vec![MuscleGroup::Back],
        secondary_muscles: vec![MuscleGroup::Biceps, MuscleGroup::Forearms],
        difficulty: ExperienceLevel::Advanced,
        contraindications: vec![InjuryTag::ShoulderPain, InjuryTag::ElbowPain],
        substitution_tags: vec!["vertical_pull".into()],
        unilateral: false,
    });

    exercises.push(Exercise {
        id: "lat_pulldown".into(),
        name: "Lat Pulldown".into(),
        aliases: vec!["pulldown".into()],
        intents: vec![MovementIntent::VerticalPull],
        equipment: vec![],
        equipment_all: None,
        equipment_any: Some(vec![Equipment::Cables, Equipment::Machine]),
        primary_muscles: vec![MuscleGroup::Back],
        secondary_muscles: vec![MuscleGroup::Biceps],
        difficulty: ExperienceLevel::Beginner,
        contraindications: vec![],
        substitution_tags: vec!["vertical_pull".into()],
        unilateral: false,
    });

    // ========================================================================
    // Lunge pattern
    // ========================================================================

    exercises.push(Exercise {
        id: "walking_lunge".into(),
        name: "Walking Lunge".into(),
        aliases: vec![],
        intents: vec![MovementIntent::Lunge],
        equipment: vec![],
        equipment_all: None,
        equipment_any: Some(vec![Equipment::Bodyweight, Equipment::Dumbbells]),
        primary_muscles: vec![MuscleGroup::Quads, MuscleGroup::Glutes],
        secondary_muscles: vec![MuscleGroup::Hamstrings, MuscleGroup::Core],
        difficulty: ExperienceLevel::Beginner,
        contraindications: vec![InjuryTag::KneePain],
        substitution_tags: vec!["lunge_pattern".into()],
        unilateral: true,
    });

    exercises.push(Exercise {
        id: "bulgarian_split_squat".into(),
        name: "Bulgarian Split Squat".into(),
        aliases: vec!["rear-foot elevated split squat".into()],
        intents: vec![MovementIntent::Lunge],
        equipment: vec![],
        equipment_all: Some(vec![Equipment::Bench]),
        equipment_any: Some(vec![Equipment::Bodyweight, Equipment::Dumbbells]),
        primary_muscles: vec![MuscleGroup::Quads, MuscleGroup::Glutes],
        secondary_muscles: vec![MuscleGroup::Hamstrings],
        difficulty: ExperienceLevel::Intermediate,
        contraindications: vec![InjuryTag::KneePain],
        substitution_tags: vec!["lunge_pattern".into()],
        unilateral: true,
    });

    // ========================================================================
    // Carry pattern
    // ========================================================================

    exercises.push(Exercise {
        id: "farmers_carry".into(),
        name: "Farmer's Carry".into(),
        aliases: vec!["farmer's walk".into()],
        intents: vec![MovementIntent::Carry],
        equipment: vec![],
        equipment_all: None,
        equipment_any: Some(vec![Equipment::Dumbbells, Equipment::Kettlebell]),
        primary_muscles: vec![MuscleGroup::Forearms, MuscleGroup::Core],
        secondary_muscles: vec![MuscleGroup::Shoulders, MuscleGroup::Back],
        difficulty: ExperienceLevel::Beginner,
        contraindications: vec![],
        substitution_tags: vec!["carry_pattern".into()],
        unilateral: false,
    });

    // ========================================================================
    // Core
    // ========================================================================

    exercises.push(Exercise {
        id: "plank".into(),
        name: "Plank".into(),
        aliases: vec![],
        intents: vec![MovementIntent::CoreBrace],
        equipment: vec![Equipment::Bodyweight],
        equipment_all: None,
        equipment_any: None,
        primary_muscles: vec![MuscleGroup::Core],
        secondary_muscles: vec![MuscleGroup::Shoulders],
        difficulty: ExperienceLevel::Beginner,
        contraindications: vec![],
        substitution_tags: vec!["core_brace".into()],
        unilateral: false,
    });

    exercises.push(Exercise {
        id: "pallof_press".into(),
        name: "Pallof Press".into(),
        aliases: vec![],
        intents: vec![MovementIntent::CoreRotation, MovementIntent::CoreBrace],
        equipment: vec![],
        equipment_all: None,
        equipment_any: Some(vec![Equipment::Cables, Equipment::Bands]),
        primary_muscles: vec![MuscleGroup::Core],
        secondary_muscles: vec![],
        difficulty: ExperienceLevel::Intermediate,
        contraindications: vec![],
        substitution_tags: vec!["core_rotation".into()],
        unilateral: false,
    });

    exercises.push(Exercise {
        id: "russian_twist".into(),
        name: "Russian Twist".into(),
        aliases: vec![],
        intents: vec![MovementIntent::CoreRotation],
        equipment: vec![Equipment::Bodyweight],
        equipment_all: None,
        equipment_any: None,
        primary_muscles: vec![MuscleGroup::Core],
        secondary_muscles: vec![],
        difficulty: ExperienceLevel::Beginner,
        contraindications: vec![InjuryTag::LowerBackPain],
        substitution_tags: vec!["core_rotation".into()],
        unilateral: false,
    });

    // ========================================================================
    // Isolation
    // ========================================================================

    exercises.push(Exercise {
        id: "barbell_curl".into(),
        name: "Barbell Curl".into(),
        aliases: vec![],
        intents: vec![MovementIntent::ElbowFlexion],
        equipment: vec![Equipment::Barbell],
        equipment_all: None,
        equipment_any: None,
        primary_muscles: vec![MuscleGroup::Biceps],
        secondary_muscles: vec![MuscleGroup::Forearms],
        difficulty: ExperienceLevel::Beginner,
        contraindications: vec![InjuryTag::ElbowPain, InjuryTag::WristPain],
        substitution_tags: vec!["elbow_flexion".into()],
        unilateral: false,
    });

    exercises.push(Exercise {
        id: "dumbbell_curl".into(),
        name: "Dumbbell Curl".into(),
        aliases: vec![],
        intents: vec![MovementIntent::ElbowFlexion],
        equipment: vec![Equipment::Dumbbells],
        equipment_all: None,
        equipment_any: None,
        primary_muscles: vec![MuscleGroup::Biceps],
        secondary_muscles: vec![MuscleGroup::Forearms],
        difficulty: ExperienceLevel::Beginner,
        contraindications: vec![InjuryTag::ElbowPain],
        substitution_tags: vec!["elbow_flexion".into()],
        unilateral: false,
    });

    exercises.push(Exercise {
        id: "triceps_pushdown".into(),
        name: "Triceps Pushdown".into(),
        aliases: vec![],
        intents: vec![MovementIntent::ElbowExtension],
        equipment: vec![],
        equipment_all: None,
        equipment_any: Some(vec![Equipment::Cables, Equipment::Bands]),
        primary_muscles: vec![MuscleGroup::Triceps],
        secondary_muscles: vec![],
        difficulty: ExperienceLevel::Beginner,
        contraindications: vec![InjuryTag::ElbowPain],
        substitution_tags: vec!["elbow_extension".into()],
        unilateral: false,
    });

    exercises.push(Exercise {
        id: "overhead_triceps_extension".into(),
        name: "Overhead Triceps Extension".into(),
        aliases: vec![],
        intents: vec![MovementIntent::ElbowExtension],
        equipment: vec![Equipment::Dumbbells],
        equipment_all: None,
        equipment_any: None,
        primary_muscles: vec![MuscleGroup::Triceps],
        secondary_muscles: vec![],
        difficulty: ExperienceLevel::Beginner,
        contraindications: vec![InjuryTag::ElbowPain, InjuryTag::ShoulderPain],
        substitution_tags: vec!["elbow_extension".into()],
        unilateral: false,
    });

    exercises.push(Exercise {
        id: "lateral_raise".into(),
        name: "Dumbbell Lateral Raise".into(),
        aliases: vec!["side raise".into()],
        intents: vec![MovementIntent::LateralRaise],
        equipment: vec![Equipment::Dumbbells],
        equipment_all: None,
        equipment_any: None,
        primary_muscles: vec![MuscleGroup::Shoulders],
        secondary_muscles: vec![],
        difficulty: ExperienceLevel::Beginner,
        contraindications: vec![InjuryTag::ShoulderPain],
        substitution_tags: vec!["lateral_raise".into()],
        unilateral: false,
    });

    exercises.push(Exercise {
        id: "standing_calf_raise".into(),
        name: "Standing Calf Raise".into(),
        aliases: vec![],
        intents: vec![MovementIntent::CalfRaise],
        equipment: vec![],
        equipment_all: None,
        equipment_any: Some(vec![
            Equipment::Bodyweight,
            Equipment::Dumbbells,
            Equipment::Machine,
        ]),
        primary_muscles: vec![MuscleGroup::Calves],
        secondary_muscles: vec![],
        difficulty: ExperienceLevel::Beginner,
        contraindications: vec![],
        substitution_tags: vec!["calf_raise".into()],
        unilateral: false,
    });

    Catalog::new(exercises)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads() {
        let catalog = build_default_catalog();
        assert!(catalog.len() >= 20, "Catalog too small: {}", catalog.len());
    }

    #[test]
    fn test_default_catalog_validates() {
        let catalog = build_default_catalog();
        let errors = catalog.validate();
        assert!(
            errors.is_empty(),
            "Default catalog has validation errors: {:?}",
            errors
        );
    }

    #[test]
    fn test_lookup_by_id() {
        let catalog = build_default_catalog();
        let rdl = catalog.get("romanian_deadlift").unwrap();
        assert_eq!(rdl.name, "Romanian Deadlift");
        assert!(catalog.get("nonexistent").is_none());
    }

    #[test]
    fn test_squat_requires_barbell_and_rack() {
        let catalog = build_default_catalog();
        let squat = catalog.get("squat").unwrap();
        let all = squat.equipment_all.as_ref().unwrap();
        assert!(all.contains(&Equipment::Barbell));
        assert!(all.contains(&Equipment::Rack));
    }

    #[test]
    fn test_rdl_accepts_barbell_or_dumbbells() {
        let catalog = build_default_catalog();
        let rdl = catalog.get("romanian_deadlift").unwrap();
        let any = rdl.equipment_any.as_ref().unwrap();
        assert!(any.contains(&Equipment::Barbell));
        assert!(any.contains(&Equipment::Dumbbells));
    }

    #[test]
    fn test_catalog_order_is_stable() {
        let a = build_default_catalog();
        let b = build_default_catalog();
        let ids_a: Vec<&str> = a.iter().map(|e| e.id.as_str()).collect();
        let ids_b: Vec<&str> = b.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn test_bodyweight_exercises_detected() {
        let catalog = build_default_catalog();
        assert!(catalog.get("pushup").unwrap().is_bodyweight_only());
        assert!(catalog.get("pullup").unwrap().is_bodyweight_only());
        assert!(!catalog.get("bench_press").unwrap().is_bodyweight_only());
    }

    #[test]
    fn test_validate_catches_duplicate_ids() {
        let catalog = build_default_catalog();
        let mut exercises: Vec<Exercise> = catalog.iter().cloned().collect();
        let dup = exercises[0].clone();
        exercises.push(dup);
        let broken = Catalog::new(exercises);
        let errors = broken.validate();
        assert!(errors.iter().any(|e| e.contains("Duplicate exercise ID")));
    }
}
