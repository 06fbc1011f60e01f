//! Error types for the liftplan_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for liftplan_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog validation error
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),

    /// Session template id that does not exist in the rules data.
    /// This is a programming error and is raised immediately.
    #[error("Unknown session template: {0}")]
    UnknownTemplate(String),

    /// State management error
    #[error("State error: {0}")]
    State(String),

    /// Plan or program generation error
    #[error("Planning error: {0}")]
    Planning(String),

    /// Offline queue / sync error
    #[error("Sync error: {0}")]
    Sync(String),

    /// Unique-constraint violation from a persistence write. The sync
    /// layer reclassifies this as success during replay.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
