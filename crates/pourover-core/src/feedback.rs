//! Collaborator seams: sound, haptics and progress observers.
//!
//! The engine calls these and never looks at the outcome. An implementation
//! that can fail (an audio device going away, a missing vibration motor) logs
//! and swallows the failure itself; a brew must never stall on feedback.

use serde::{Deserialize, Serialize};

use crate::events::LifecycleEvent;
use crate::timer::{Cue, CueKind};

/// Plays the sound for a cue. Fire-and-forget.
pub trait CuePlayer: Send {
    fn play(&self, cue: CueKind);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HapticStrength {
    /// Acknowledges a user action such as pause.
    Light,
    /// End of a pour.
    Medium,
    /// Destructive action such as reset.
    Warning,
}

/// Drives a vibration motor. Fire-and-forget.
pub trait Haptics: Send {
    fn pulse(&self, strength: HapticStrength);
}

/// Receives progress and lifecycle notifications from the timer manager.
///
/// Every hook defaults to a no-op so observers implement only what they
/// render.
pub trait TimerObserver: Send {
    /// Every main-timer second, after that second's cues.
    fn on_tick(&mut self, _elapsed: u32) {}

    /// The active sub-stage changed.
    fn on_stage_change(&mut self, _index: usize, _is_waiting: bool) {}

    /// Countdown value, or `None` when the countdown ends or is abandoned.
    fn on_countdown_change(&mut self, _remaining: Option<u32>) {}

    fn on_cue(&mut self, _cue: Cue) {}

    /// The schedule finished (naturally or through skip).
    fn on_complete(&mut self, _total_elapsed: u32) {}

    fn on_lifecycle(&mut self, _event: &LifecycleEvent) {}
}

/// Feedback sink that does nothing. Default for headless sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl CuePlayer for Silent {
    fn play(&self, _cue: CueKind) {}
}

impl Haptics for Silent {
    fn pulse(&self, _strength: HapticStrength) {}
}

impl<T: CuePlayer + ?Sized> CuePlayer for Box<T> {
    fn play(&self, cue: CueKind) {
        (**self).play(cue)
    }
}

impl<T: Haptics + ?Sized> Haptics for Box<T> {
    fn pulse(&self, strength: HapticStrength) {
        (**self).pulse(strength)
    }
}
