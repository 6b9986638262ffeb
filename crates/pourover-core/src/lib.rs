//! # Pourover Core Library
//!
//! This library provides the cue engine behind the `pourover` brew timer. It
//! turns a recipe's cumulative pour checkpoints into a second-resolution
//! schedule, then drives sound and haptic cues, a pre-roll countdown and a
//! running "water poured so far" readout from it.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A caller-driven state machine. A [`Clock`] delivers
//!   tick handles; every transition is applied synchronously and stale
//!   handles are ignored
//! - **Runtime**: A tokio actor hosting the engine, with drift-free ticks and a
//!   broadcast channel of [`Event`]s
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`expand`]: Stage list to pour/wait timeline
//! - [`TimerManager`]: Countdown, main timer, pause/resume/skip/reset
//! - [`BrewRuntime`]: Async host for a brew session
//! - [`Recipe`]: Dose with proportional water rescaling
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod feedback;
pub mod recipe;
pub mod runtime;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, RecipeError, ScheduleError, TimerError};
pub use events::{Event, LifecycleEvent};
pub use feedback::{CuePlayer, HapticStrength, Haptics, Silent, TimerObserver};
pub use recipe::{Recipe, RecipeEdit};
pub use runtime::{BrewHandle, BrewRuntime, TokioClock};
pub use storage::Config;
pub use timer::{
    cues_at, expand, water_at, BrewSnapshot, Clock, Cue, CueKind, ExpandedStage, Lifecycle,
    ManualClock, Stage, StageKind, TickHandle, Timeline, TimerManager, TimerManagerState,
    TimerSettings,
};
