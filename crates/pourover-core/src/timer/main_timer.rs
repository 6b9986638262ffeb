//! The 1 Hz tick loop over an expanded timeline.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::cues::{clamp_elapsed, cues_at, CueKind, CueSet};
use super::schedule::{StageKind, Timeline};

/// The active sub-stage moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageChange {
    pub index: usize,
    pub is_waiting: bool,
}

/// Result of one main-timer tick.
#[derive(Debug, Clone, PartialEq)]
pub struct MainTick {
    /// The tick that was evaluated, before any clamping.
    pub tick: u32,
    /// Elapsed seconds after this tick, already clamped on completion.
    pub elapsed: u32,
    pub cues: CueSet,
    pub stage_change: Option<StageChange>,
    /// `true` exactly once, on the tick that detected `Complete`.
    pub completed: bool,
}

#[derive(Debug, Clone)]
pub struct MainTimer {
    timeline: Arc<Timeline>,
    elapsed: u32,
    active_index: usize,
    finished: bool,
}

impl MainTimer {
    /// Start (or resume) at `initial_elapsed`.
    ///
    /// Cues belonging to ticks at or before `initial_elapsed` are never
    /// produced: the first tick evaluates `initial_elapsed + 1`.
    pub fn start(timeline: Arc<Timeline>, initial_elapsed: u32) -> Self {
        let active_index = timeline.substage_index_at(initial_elapsed);
        Self {
            timeline,
            elapsed: initial_elapsed,
            active_index,
            finished: false,
        }
    }

    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The sub-stage the timer currently sits in.
    pub fn current_stage(&self) -> StageChange {
        self.stage_at(self.active_index)
    }

    /// Advance one second. `None` once the schedule has completed.
    pub fn tick(&mut self) -> Option<MainTick> {
        if self.finished {
            return None;
        }

        let next = self.elapsed.saturating_add(1);
        let cues = cues_at(&self.timeline, next);
        let completed = cues.contains(&CueKind::Complete);
        self.elapsed = if completed {
            clamp_elapsed(&self.timeline, next)
        } else {
            next
        };
        self.finished = completed;

        let index = self.timeline.substage_index_at(self.elapsed);
        let stage_change = (index != self.active_index).then(|| {
            self.active_index = index;
            self.stage_at(index)
        });

        Some(MainTick {
            tick: next,
            elapsed: self.elapsed,
            cues,
            stage_change,
            completed,
        })
    }

    fn stage_at(&self, index: usize) -> StageChange {
        let is_waiting = self
            .timeline
            .get(index)
            .map(|s| s.kind == StageKind::Wait)
            .unwrap_or(false);
        StageChange { index, is_waiting }
    }
}
