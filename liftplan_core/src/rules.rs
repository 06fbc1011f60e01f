//! Built-in rules data: prescription tables, session templates, experience
//! caps, and conservative starting-weight defaults.
//!
//! Like the catalog, rules are constructed once at process start and never
//! mutated. Tables live here as plain match expressions so every lookup is
//! total and deterministic.

use crate::error::{Error, Result};
use crate::types::*;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Cached default rules - built once and reused across all operations
static DEFAULT_RULES: Lazy<Rules> = Lazy::new(build_default_rules);

/// Get a reference to the cached default rules
pub fn default_rules() -> &'static Rules {
    &DEFAULT_RULES
}

/// One row of a goal's prescription table for a priority tier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PrescriptionRow {
    pub rep_range: (u32, u32),
    pub sets: u32,
    pub rest_seconds: u32,
}

/// A session template: the intents a session of this kind must and may train.
#[derive(Clone, Debug)]
pub struct SessionTemplate {
    pub id: String,
    pub label: String,
    pub required_intents: Vec<MovementIntent>,
    pub optional_intents: Vec<MovementIntent>,
}

/// The complete rules data set.
#[derive(Clone, Debug)]
pub struct Rules {
    templates: Vec<SessionTemplate>,
    index: HashMap<String, usize>,
    pub warmup_minutes: u32,
    pub cooldown_minutes: u32,
}

impl Rules {
    pub fn new(templates: Vec<SessionTemplate>, warmup_minutes: u32, cooldown_minutes: u32) -> Self {
        let index = templates
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();
        Self {
            templates,
            index,
            warmup_minutes,
            cooldown_minutes,
        }
    }

    /// Look up a template by id. An unknown id is a programming error and
    /// fails immediately.
    pub fn template(&self, id: &str) -> Result<&SessionTemplate> {
        self.index
            .get(id)
            .map(|i| &self.templates[*i])
            .ok_or_else(|| Error::UnknownTemplate(id.to_string()))
    }

    pub fn templates(&self) -> impl Iterator<Item = &SessionTemplate> {
        self.templates.iter()
    }

    /// Per-goal prescription row for a priority tier.
    pub fn prescription(goal: Goal, tier: PriorityTier) -> PrescriptionRow {
        use Goal::*;
        use PriorityTier::*;
        let (rep_range, sets, rest_seconds) = match (goal, tier) {
            (BuildStrength, Primary) => ((3, 6), 5, 180),
            (BuildStrength, Accessory) => ((6, 8), 4, 150),
            (BuildStrength, Isolation) => ((8, 12), 3, 90),
            (BuildMuscle, Primary) => ((6, 10), 4, 120),
            (BuildMuscle, Accessory) => ((8, 12), 3, 90),
            (BuildMuscle, Isolation) => ((12, 15), 3, 60),
            (LoseFat, Primary) => ((8, 12), 3, 75),
            (LoseFat, Accessory) => ((10, 15), 3, 60),
            (LoseFat, Isolation) => ((15, 20), 2, 45),
            (ImproveEndurance, Primary) => ((12, 15), 3, 60),
            (ImproveEndurance, Accessory) => ((15, 20), 2, 45),
            (ImproveEndurance, Isolation) => ((15, 25), 2, 30),
            (GeneralFitness, Primary) => ((8, 10), 3, 90),
            (GeneralFitness, Accessory) => ((10, 12), 3, 75),
            (GeneralFitness, Isolation) => ((12, 15), 2, 60),
        };
        PrescriptionRow {
            rep_range,
            sets,
            rest_seconds,
        }
    }

    /// Maximum number of exercises per session for an experience level.
    pub fn max_exercises(experience: ExperienceLevel) -> usize {
        match experience {
            ExperienceLevel::Beginner => 4,
            ExperienceLevel::Intermediate => 6,
            ExperienceLevel::Advanced => 8,
        }
    }

    /// Conservative default starting weight (kg) by experience and
    /// equipment class, used when no history or 1RM is known.
    pub fn default_start_weight(experience: ExperienceLevel, class: EquipmentClass) -> f64 {
        use EquipmentClass::*;
        use ExperienceLevel::*;
        match (class, experience) {
            (Barbell, Beginner) => 20.0,
            (Barbell, Intermediate) => 40.0,
            (Barbell, Advanced) => 60.0,
            (Dumbbell, Beginner) => 8.0,
            (Dumbbell, Intermediate) => 12.0,
            (Dumbbell, Advanced) => 16.0,
            (Kettlebell, Beginner) => 12.0,
            (Kettlebell, Intermediate) => 16.0,
            (Kettlebell, Advanced) => 24.0,
            (Cable, Beginner) => 15.0,
            (Cable, Intermediate) => 25.0,
            (Cable, Advanced) => 35.0,
            (Machine, Beginner) => 20.0,
            (Machine, Intermediate) => 40.0,
            (Machine, Advanced) => 60.0,
            (Band | Bodyweight, _) => 0.0,
        }
    }

    /// Validate the rules data for consistency.
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for template in &self.templates {
            if template.id.is_empty() {
                errors.push("Template has empty ID".to_string());
            }
            if !seen.insert(template.id.clone()) {
                errors.push(format!("Duplicate template ID '{}'", template.id));
            }
            if template.required_intents.is_empty() {
                errors.push(format!(
                    "Template '{}' has no required intents",
                    template.id
                ));
            }
            for intent in &template.required_intents {
                if template.optional_intents.contains(intent) {
                    errors.push(format!(
                        "Template '{}' lists '{}' as both required and optional",
                        template.id, intent
                    ));
                }
            }
        }

        if self.templates.is_empty() {
            errors.push("Rules contain no session templates".to_string());
        }

        errors
    }
}

/// Builds the default rules data set.
pub fn build_default_rules() -> Rules {
    use MovementIntent::*;

    let templates = vec![
        SessionTemplate {
            id: "push_day".into(),
            label: "Push".into(),
            required_intents: vec![HorizontalPress, VerticalPress],
            optional_intents: vec![ElbowExtension, LateralRaise, CoreBrace],
        },
        SessionTemplate {
            id: "pull_day".into(),
            label: "Pull".into(),
            required_intents: vec![HorizontalPull, VerticalPull],
            optional_intents: vec![ElbowFlexion, CoreRotation, Carry],
        },
        SessionTemplate {
            id: "leg_day".into(),
            label: "Legs".into(),
            required_intents: vec![Squat, HipHinge],
            optional_intents: vec![Lunge, CalfRaise, CoreBrace],
        },
        SessionTemplate {
            id: "upper_day".into(),
            label: "Upper Body".into(),
            required_intents: vec![HorizontalPress, HorizontalPull, VerticalPress],
            optional_intents: vec![VerticalPull, ElbowFlexion, ElbowExtension, LateralRaise],
        },
        SessionTemplate {
            id: "lower_day".into(),
            label: "Lower Body".into(),
            required_intents: vec![Squat, HipHinge, Lunge],
            optional_intents: vec![CalfRaise, CoreBrace],
        },
        SessionTemplate {
            id: "full_body_a".into(),
            label: "Full Body A".into(),
            required_intents: vec![Squat, HorizontalPress, HorizontalPull],
            optional_intents: vec![CoreBrace, CalfRaise, ElbowFlexion],
        },
        SessionTemplate {
            id: "full_body_b".into(),
            label: "Full Body B".into(),
            required_intents: vec![HipHinge, VerticalPress, VerticalPull],
            optional_intents: vec![Lunge, CoreRotation, ElbowExtension],
        },
        SessionTemplate {
            id: "full_body_c".into(),
            label: "Full Body C".into(),
            required_intents: vec![Lunge, HorizontalPress, HorizontalPull],
            optional_intents: vec![Carry, CoreBrace, LateralRaise],
        },
    ];

    Rules::new(templates, 5, 5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_validate() {
        let rules = build_default_rules();
        let errors = rules.validate();
        assert!(errors.is_empty(), "Rules validation errors: {:?}", errors);
    }

    #[test]
    fn test_unknown_template_is_fatal() {
        let rules = build_default_rules();
        let err = rules.template("yoga_day").unwrap_err();
        assert!(matches!(err, Error::UnknownTemplate(_)));
    }

    #[test]
    fn test_known_templates_resolve() {
        let rules = build_default_rules();
        for id in [
            "push_day",
            "pull_day",
            "leg_day",
            "upper_day",
            "lower_day",
            "full_body_a",
            "full_body_b",
            "full_body_c",
        ] {
            assert!(rules.template(id).is_ok(), "missing template {}", id);
        }
    }

    #[test]
    fn test_strength_prescriptions_are_heavier_than_endurance() {
        let strength = Rules::prescription(Goal::BuildStrength, PriorityTier::Primary);
        let endurance = Rules::prescription(Goal::ImproveEndurance, PriorityTier::Primary);
        assert!(strength.rep_range.1 < endurance.rep_range.0);
        assert!(strength.rest_seconds > endurance.rest_seconds);
    }

    #[test]
    fn test_max_exercises_scale_with_experience() {
        assert!(
            Rules::max_exercises(ExperienceLevel::Beginner)
                < Rules::max_exercises(ExperienceLevel::Advanced)
        );
    }

    #[test]
    fn test_bodyweight_default_weight_is_zero() {
        for exp in [
            ExperienceLevel::Beginner,
            ExperienceLevel::Intermediate,
            ExperienceLevel::Advanced,
        ] {
            assert_eq!(
                Rules::default_start_weight(exp, EquipmentClass::Bodyweight),
                0.0
            );
            assert_eq!(Rules::default_start_weight(exp, EquipmentClass::Band), 0.0);
        }
    }
}
