//! Core error types for pourover-core.
//!
//! Schedule and recipe errors are raised synchronously before any timer
//! starts. Redundant timer commands are not errors; the manager treats them
//! as no-ops.

use std::path::PathBuf;
use thiserror::Error;

use crate::timer::Lifecycle;

/// Core error type for pourover-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed stage list
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// Invalid recipe parameter
    #[error("Recipe error: {0}")]
    Recipe(#[from] RecipeError),

    /// Timer command refused
    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Recipe or config file could not be parsed
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Errors raised while expanding a stage list into a timeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    /// No stages, nothing to run
    #[error("Recipe has no stages")]
    EmptyRecipe,

    /// Target times must strictly increase
    #[error("Stage {index} target time {target}s is not after the previous stage ({previous}s)")]
    InvalidStageOrder {
        index: usize,
        previous: u32,
        target: u32,
    },

    /// Explicit pour time longer than its stage segment
    #[error("Stage {index} pour time {pour_time}s exceeds its {segment}s segment")]
    InvalidPourTime {
        index: usize,
        pour_time: u32,
        segment: u32,
    },

    /// Target water string without a leading number
    #[error("Stage {index} has unparseable target water '{value}'")]
    InvalidWater { index: usize, value: String },

    /// Cumulative water went down
    #[error("Stage {index} target water is lower than the previous stage")]
    WaterDecreases { index: usize },
}

/// Recipe parameter errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecipeError {
    /// Coffee, water and ratio must be positive and finite
    #[error("Invalid value for '{field}': {value}")]
    InvalidRecipeParameter { field: &'static str, value: f64 },

    /// Rescaled stage list no longer expands
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// Timer command errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimerError {
    /// The timeline cannot change under a live or resumable schedule
    #[error("Schedule is locked while the timer is {lifecycle}")]
    ScheduleLocked { lifecycle: Lifecycle },

    /// The runtime actor has shut down
    #[error("Brew runtime is no longer running")]
    RuntimeClosed,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Key does not exist in the config tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
