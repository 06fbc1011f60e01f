use chrono::{Datelike, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use liftplan_core::*;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "liftplan")]
#[command(about = "Adaptive strength training planner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and print the frozen four-week program
    Plan {
        /// Training weekdays, comma separated (e.g. mon,wed,fri)
        #[arg(long)]
        days: String,

        /// Dominant training goal (build_strength, build_muscle, lose_fat,
        /// improve_endurance, general_fitness)
        #[arg(long, default_value = "general_fitness")]
        goal: String,

        /// Experience level (beginner, intermediate, advanced)
        #[arg(long, default_value = "beginner")]
        experience: String,

        /// Program start date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        start: Option<NaiveDate>,
    },

    /// Dry-run preview of the first scheduled session (no side effects)
    Preview,

    /// Simulate executing today's session and queue its events
    Session {
        /// Session template override (e.g. push_day)
        #[arg(long)]
        template: Option<String>,

        /// RPE reported for every simulated set
        #[arg(long)]
        rpe: Option<f64>,
    },

    /// Replay the offline queue into the local store
    Sync,
}

fn main() -> Result<()> {
    liftplan_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| config.data.data_dir.clone());

    match cli.command {
        Commands::Plan {
            days,
            goal,
            experience,
            start,
        } => cmd_plan(&data_dir, &days, &goal, &experience, start),
        Commands::Preview => cmd_preview(&data_dir, &config),
        Commands::Session { template, rpe } => cmd_session(&data_dir, &config, template, rpe),
        Commands::Sync => cmd_sync(&data_dir),
    }
}

fn validated_catalog() -> Result<&'static Catalog> {
    let catalog = default_catalog();
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation("Invalid catalog".into()));
    }
    Ok(catalog)
}

fn parse_weekdays(input: &str) -> Result<Vec<Weekday>> {
    let mut out = Vec::new();
    for part in input.split(',') {
        let day = match part.trim().to_lowercase().as_str() {
            "mon" | "monday" | "1" => Weekday::Monday,
            "tue" | "tuesday" | "2" => Weekday::Tuesday,
            "wed" | "wednesday" | "3" => Weekday::Wednesday,
            "thu" | "thursday" | "4" => Weekday::Thursday,
            "fri" | "friday" | "5" => Weekday::Friday,
            "sat" | "saturday" | "6" => Weekday::Saturday,
            "sun" | "sunday" | "7" => Weekday::Sunday,
            other => {
                return Err(Error::Config(format!("Unknown weekday '{}'", other)));
            }
        };
        out.push(day);
    }
    Ok(out)
}

fn parse_goal(name: &str) -> Result<Goal> {
    match name.to_lowercase().as_str() {
        "build_strength" | "strength" => Ok(Goal::BuildStrength),
        "build_muscle" | "muscle" | "hypertrophy" => Ok(Goal::BuildMuscle),
        "lose_fat" | "fat_loss" => Ok(Goal::LoseFat),
        "improve_endurance" | "endurance" => Ok(Goal::ImproveEndurance),
        "general_fitness" | "general" => Ok(Goal::GeneralFitness),
        other => Err(Error::Config(format!("Unknown goal '{}'", other))),
    }
}

fn parse_experience(name: &str) -> Result<ExperienceLevel> {
    match name.to_lowercase().as_str() {
        "beginner" => Ok(ExperienceLevel::Beginner),
        "intermediate" => Ok(ExperienceLevel::Intermediate),
        "advanced" => Ok(ExperienceLevel::Advanced),
        other => Err(Error::Config(format!("Unknown experience level '{}'", other))),
    }
}

fn constraints_from(config: &Config) -> TrainingConstraints {
    TrainingConstraints {
        available_equipment: config.equipment.parsed(),
        time_budget_minutes: config.planning.time_budget_minutes,
        ..Default::default()
    }
}

fn cmd_plan(
    data_dir: &PathBuf,
    days: &str,
    goal: &str,
    experience: &str,
    start: Option<NaiveDate>,
) -> Result<()> {
    let rules = default_rules();
    let weekdays = parse_weekdays(days)?;
    let goal = parse_goal(goal)?;
    let experience = parse_experience(experience)?;

    std::fs::create_dir_all(data_dir)?;
    let state_path = data_dir.join("state.json");
    let state = UserTrainingState::update(&state_path, |state| {
        state.experience = experience;
        state.goals = GoalWeights::single(goal);
        state.selected_weekdays = weekdays.clone();
        Ok(())
    })?;

    let plan = build_four_week_plan(rules, &state.planner_profile(), &weekdays)?;
    for warning in &plan.warnings {
        println!("note: {}", warning);
    }

    let start = start.unwrap_or_else(|| chrono::Local::now().date_naive());
    let program_days = generate_program_days(&plan, start)?;

    println!(
        "Four-week program ({:?}), {} sessions/week:",
        plan.split,
        plan.weekdays.len()
    );
    let mut current_week = 0;
    for day in &program_days {
        if day.week_index != current_week {
            current_week = day.week_index;
            println!("Week {}", current_week);
        }
        println!(
            "  {} {} - {} ({})",
            day.date, day.weekday, day.plan.label, day.plan.template_id
        );
    }
    Ok(())
}

fn load_program(state: &UserTrainingState) -> Result<FourWeekProgramPlan> {
    if state.selected_weekdays.is_empty() {
        return Err(Error::Planning(
            "No program configured. Run `liftplan plan --days ...` first".into(),
        ));
    }
    build_four_week_plan(
        default_rules(),
        &state.planner_profile(),
        &state.selected_weekdays,
    )
}

fn cmd_preview(data_dir: &PathBuf, config: &Config) -> Result<()> {
    let catalog = validated_catalog()?;
    let rules = default_rules();
    let state = UserTrainingState::load(&data_dir.join("state.json"))?;
    let program = load_program(&state)?;

    let plan = preview_session(
        catalog,
        rules,
        &program,
        state.goals.clone(),
        constraints_from(config),
        state.snapshot(),
        Utc::now(),
    )?;

    print_session_plan(&plan);
    Ok(())
}

fn print_session_plan(plan: &SessionPlan) {
    if let Some(label) = &plan.label {
        println!("{}", label);
    }
    let summary = plan.summary();
    println!(
        "Template {} | {:?} | {} exercises, {} sets, ~{} min",
        plan.template_id,
        summary.grouping_style,
        plan.exercises.len(),
        summary.total_sets,
        plan.estimated_duration_minutes
    );
    for exercise in &plan.exercises {
        let first = &exercise.sets[0];
        println!(
            "  {}. {} [{:?}] {}x{} @ {:.1} kg, rest {}s",
            exercise.order,
            exercise.name,
            exercise.tier,
            exercise.sets.len(),
            first.target_reps,
            first.suggested_weight,
            first.rest_seconds
        );
        println!("     why: {}", exercise.trace.rationale);
        for alternative in &exercise.trace.alternatives {
            println!("     alt: {} ({})", alternative.exercise_id, alternative.reason);
        }
    }
}

fn cmd_session(
    data_dir: &PathBuf,
    config: &Config,
    template: Option<String>,
    rpe: Option<f64>,
) -> Result<()> {
    let catalog = validated_catalog()?;
    let rules = default_rules();
    std::fs::create_dir_all(data_dir)?;

    let state_path = data_dir.join("state.json");
    let mut state = UserTrainingState::load(&state_path)?;
    let now = Utc::now();

    // Resolve the template: explicit flag, else today's scheduled day
    let template_id = match template {
        Some(id) => id,
        None => {
            let program = load_program(&state)?;
            let today = Weekday::from_chrono(chrono::Local::now().date_naive().weekday());
            match program.weeks[0].days.get(&today) {
                Some(day) => day.template_id.clone(),
                None => {
                    println!("No session scheduled today ({}).", today);
                    return Ok(());
                }
            }
        }
    };

    let csv_path = data_dir.join("set_logs.csv");
    let entries =
        load_recent_set_logs(&csv_path, config.planning.history_window_days, now)?;
    let history = group_history(&entries);

    let request = SessionBuildRequest {
        template_id: &template_id,
        goals: state.goals.clone(),
        constraints: constraints_from(config),
        user: state.snapshot(),
        label: None,
        now,
        history: &history,
    };
    let plan = build_session(catalog, rules, &request)?;
    print_session_plan(&plan);

    // Execute: log every planned set at the reported effort
    let session_id = SessionId::new();
    let mut runtime = initialize_runtime(&plan, session_id, now);
    for exercise_id in runtime.exercise_order.clone() {
        let exercise = runtime.exercises[&exercise_id].clone();
        for planned in &exercise.planned_sets {
            let current = runtime.exercises[&exercise_id].clone();
            let (params, adjusted) = get_adjusted_set_params(&current, planned);
            if adjusted {
                println!(
                    "  adjusted set {} of {}: {:.1} kg x {}",
                    params.index, exercise_id, params.suggested_weight, params.target_reps
                );
            }
            let record = SetRecord {
                set_index: params.index,
                weight: params.suggested_weight,
                reps: params.target_reps,
                rpe,
            };
            let (next, _) = log_set(&runtime, &exercise_id, &record, Utc::now())?;
            runtime = next;
        }
        runtime = advance_exercise(&runtime);
    }

    let bests = compute_previous_bests(&entries, &state.exercise_levels());
    let ended_at = Utc::now();
    let result = end_session(&runtime, &bests, ended_at);

    // Queue every persistence effect for the next sync pass
    let queue = OfflineQueue::new(data_dir.join("queue.jsonl"));
    let mut factory = OperationFactory::new(session_id);
    queue.append(&factory.create_session(
        SessionRecord {
            session_id,
            template_id: template_id.clone(),
            started_at: now,
            finalized: false,
        },
        now,
    ))?;
    for exercise_id in &runtime.exercise_order {
        let exercise = &runtime.exercises[exercise_id];
        queue.append(&factory.upsert_item(
            ItemRecord {
                item_id: exercise.item_id,
                session_id,
                exercise_id: exercise_id.clone(),
                status: exercise.status,
                skip_reason: exercise.skip_reason.clone(),
            },
            ended_at,
        ))?;
    }
    for entry in &runtime.set_log {
        queue.append(&factory.insert_set_log(entry.clone(), entry.logged_at))?;
    }
    queue.append(&factory.finalize_session(
        SessionSummaryRecord {
            session_id,
            ended_at,
            duration_seconds: result.duration_seconds,
            total_sets: result.total_sets,
            total_volume: result.total_volume,
        },
        ended_at,
    ))?;

    for event in &result.level_ups {
        state.record_level_up(event, ended_at);
    }
    state.save(&state_path)?;

    println!(
        "Session done: {} sets, {:.0} kg volume, {} PRs, {} queued operations",
        result.total_sets,
        result.total_volume,
        result.personal_records.len(),
        runtime.set_log.len() + runtime.exercise_order.len() + 2
    );
    for pr in &result.personal_records {
        println!(
            "  PR {:?} on {}: {:.1} (was {:.1})",
            pr.kind, pr.exercise_id, pr.achieved, pr.previous
        );
    }
    for trace in &result.adaptation_trace {
        println!("  note [{}]: {}", trace.rule_id, trace.message);
    }
    println!("Run `liftplan sync` to persist.");
    Ok(())
}

fn cmd_sync(data_dir: &PathBuf) -> Result<()> {
    std::fs::create_dir_all(data_dir)?;
    let queue = OfflineQueue::new(data_dir.join("queue.jsonl"));
    let mut store = FileStore::open(data_dir)?;

    let report = sync_offline_queue(&queue, &mut store, &AssumeOnline)?;
    println!(
        "Sync: {} written, {} already present, {} still queued",
        report.synced,
        report.already_present,
        report.failed.len()
    );
    for (operation_id, error) in &report.failed {
        println!("  failed {}: {}", operation_id, error);
    }
    Ok(())
}
