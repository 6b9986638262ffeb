use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{CueKind, StageChange};

/// One applied timer transition.
///
/// Emitted once per transition, never per tick. Collaborators outside the
/// direct callback chain (navigation, cross-screen sync) key off these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Fresh start; the pre-roll countdown is running.
    Started { countdown_secs: u32, at: DateTime<Utc> },
    /// Countdown finished, main timer running from zero.
    Running { at: DateTime<Utc> },
    Resumed { elapsed: u32, at: DateTime<Utc> },
    Paused { elapsed: u32, at: DateTime<Utc> },
    Reset { at: DateTime<Utc> },
    /// Jumped to the end; `Completed` follows after a short delay.
    Skipped { elapsed: u32, at: DateTime<Utc> },
    Completed { elapsed: u32, at: DateTime<Utc> },
}

impl LifecycleEvent {
    /// Coarse channel name, for consumers that route on strings.
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::Started { .. } => "timer:started",
            LifecycleEvent::Running { .. } => "timer:running",
            LifecycleEvent::Resumed { .. } => "timer:resumed",
            LifecycleEvent::Paused { .. } => "timer:paused",
            LifecycleEvent::Reset { .. } => "timer:reset",
            LifecycleEvent::Skipped { .. } => "timer:skipped",
            LifecycleEvent::Completed { .. } => "timer:completed",
        }
    }
}

/// Everything a brew session pushes outward.
/// The runtime broadcasts these; the CLI prints them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    Lifecycle {
        event: LifecycleEvent,
    },
    Tick {
        elapsed: u32,
        water: f64,
    },
    StageChanged {
        stage: StageChange,
    },
    Countdown {
        remaining: Option<u32>,
    },
    Cue {
        kind: CueKind,
        tick: u32,
    },
    BrewCompleted {
        total_elapsed: u32,
    },
}
