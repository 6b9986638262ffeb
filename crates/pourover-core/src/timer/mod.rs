mod clock;
mod countdown;
mod cues;
mod engine;
mod main_timer;
mod schedule;
mod water;

pub use clock::{Clock, ManualClock, Scheduled, TickHandle};
pub use countdown::{Countdown, CountdownStep, DEFAULT_COUNTDOWN_SECS};
pub use cues::{clamp_elapsed, cues_at, Cue, CueKind, CueSet};
pub use engine::{BrewSnapshot, Lifecycle, TimerManager, TimerManagerState, TimerSettings};
pub use main_timer::{MainTick, MainTimer, StageChange};
pub use schedule::{expand, pour_time_for, ExpandedStage, Stage, StageKind, Timeline, WaterAmount};
pub use water::water_at;
