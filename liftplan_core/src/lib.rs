#![forbid(unsafe_code)]

//! Core domain model and business logic for the Liftplan training engine.
//!
//! This crate provides:
//! - Domain types (exercises, intents, plans, runtime state)
//! - The exercise catalog and rules data
//! - Constraint filtering and exercise scoring
//! - Session plan building and four-week program planning
//! - The session runtime state machine and autoregulation rules
//! - Persistence (offline queue, idempotent sync, file store, user state)

pub mod types;
pub mod error;
pub mod catalog;
pub mod rules;
pub mod config;
pub mod logging;
pub mod scoring;
pub mod progression;
pub mod builder;
pub mod program;
pub mod runtime;
pub mod autoregulation;
pub mod history;
pub mod state;
pub mod queue;
pub mod sync;
pub mod store;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, default_catalog, Catalog};
pub use rules::{build_default_rules, default_rules, Rules};
pub use config::Config;
pub use scoring::{choose_exercise, has_equipment, score_exercise};
pub use builder::{build_session, preview_session, ExerciseHistory, SessionBuildRequest};
pub use program::{build_four_week_plan, generate_program_days};
pub use runtime::{
    adapt_session, advance_exercise, end_session, get_adjusted_set_params, initialize_runtime,
    log_set, pause_session, resume_runtime, skip_exercise, AdaptTrigger,
};
pub use autoregulation::{
    apply_autoregulation, detect_session_fatigue, get_adjusted_rest_time,
};
pub use history::{compute_previous_bests, group_history, load_recent_set_logs};
pub use state::UserTrainingState;
pub use queue::{OfflineOperation, OfflineQueue, OperationFactory, OperationId};
pub use sync::{sync_offline_queue, AssumeOnline, ConnectivityProbe, PersistenceStore, SyncReport};
pub use store::FileStore;
