//! Cue evaluation: which sounds/haptics belong to a given tick.
//!
//! Every rule is checked against every sub-stage independently, so a tick on
//! a boundary routinely yields several cues (the next stage's ding plus the
//! previous stage's pour-end ding, for instance).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::schedule::{StageKind, Timeline};

/// Seconds before a sub-stage ends at which warning taps sound.
const PRE_WARNING_OFFSETS: [u32; 2] = [2, 1];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CueKind {
    /// A sub-stage (pour or wait) begins.
    StageDing,
    /// One of the two taps before a sub-stage ends.
    PreWarning,
    /// A pour sub-stage ends; paired with a medium haptic pulse.
    PourEndDing,
    /// The schedule is over.
    Complete,
}

/// A cue that fired at a specific tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cue {
    pub kind: CueKind,
    pub tick: u32,
}

impl Cue {
    pub fn new(kind: CueKind, tick: u32) -> Self {
        Self { kind, tick }
    }
}

/// Distinct cue kinds due at one tick, in a stable order.
pub type CueSet = BTreeSet<CueKind>;

/// Cues that must fire exactly at `tick`.
pub fn cues_at(timeline: &Timeline, tick: u32) -> CueSet {
    let mut cues = CueSet::new();

    for stage in timeline.stages() {
        if tick == stage.start_time {
            cues.insert(CueKind::StageDing);
        }
        if PRE_WARNING_OFFSETS
            .iter()
            .any(|&offset| stage.end_time.checked_sub(offset) == Some(tick))
        {
            cues.insert(CueKind::PreWarning);
        }
        if tick == stage.end_time && stage.kind == StageKind::Pour {
            cues.insert(CueKind::PourEndDing);
        }
    }

    if tick > timeline.total_duration() {
        cues.insert(CueKind::Complete);
    }

    cues
}

/// Visible elapsed time never runs past the end of the schedule.
pub fn clamp_elapsed(timeline: &Timeline, elapsed: u32) -> u32 {
    elapsed.min(timeline.total_duration())
}
