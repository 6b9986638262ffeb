//! Pre-roll countdown that runs before a fresh brew.
//!
//! ```text
//! start(3): 3 (warn) -> tick: 2 (warn) -> tick: 1 (warn) -> tick: 0 (ding, finished)
//! ```

use super::cues::CueKind;

pub const DEFAULT_COUNTDOWN_SECS: u32 = 3;

/// What one countdown step produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownStep {
    pub remaining: u32,
    pub cue: CueKind,
    /// Reached zero; the caller hands off to the main timer.
    pub finished: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Counting,
    Finished,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct Countdown {
    remaining: u32,
    phase: Phase,
}

impl Countdown {
    /// Begin counting down from `initial`.
    ///
    /// Returns the controller together with the opening step, which the
    /// caller delivers immediately (a warning tap at `initial`).
    pub fn start(initial: u32) -> (Self, CountdownStep) {
        let mut countdown = Self {
            remaining: initial,
            phase: Phase::Counting,
        };
        let step = countdown.step();
        (countdown, step)
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_active(&self) -> bool {
        self.phase == Phase::Counting
    }

    /// Advance one second. `None` once finished or cancelled.
    pub fn tick(&mut self) -> Option<CountdownStep> {
        if !self.is_active() {
            return None;
        }
        self.remaining = self.remaining.saturating_sub(1);
        Some(self.step())
    }

    /// Stop without finishing.
    pub fn cancel(&mut self) {
        if self.is_active() {
            self.phase = Phase::Cancelled;
        }
    }

    fn step(&mut self) -> CountdownStep {
        if self.remaining == 0 {
            self.phase = Phase::Finished;
            CountdownStep {
                remaining: 0,
                cue: CueKind::StageDing,
                finished: true,
            }
        } else {
            CountdownStep {
                remaining: self.remaining,
                cue: CueKind::PreWarning,
                finished: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_three_two_one_ding() {
        let (mut countdown, opening) = Countdown::start(DEFAULT_COUNTDOWN_SECS);
        assert_eq!(
            opening,
            CountdownStep { remaining: 3, cue: CueKind::PreWarning, finished: false }
        );

        let steps: Vec<_> = std::iter::from_fn(|| countdown.tick()).collect();
        assert_eq!(
            steps,
            vec![
                CountdownStep { remaining: 2, cue: CueKind::PreWarning, finished: false },
                CountdownStep { remaining: 1, cue: CueKind::PreWarning, finished: false },
                CountdownStep { remaining: 0, cue: CueKind::StageDing, finished: true },
            ]
        );
        assert!(!countdown.is_active());
    }

    #[test]
    fn cancel_stops_without_finishing() {
        let (mut countdown, _) = Countdown::start(3);
        countdown.tick();
        countdown.cancel();
        assert!(countdown.tick().is_none());
        assert_eq!(countdown.remaining(), 2);
    }

    #[test]
    fn zero_length_countdown_finishes_immediately() {
        let (mut countdown, opening) = Countdown::start(0);
        assert!(opening.finished);
        assert_eq!(opening.cue, CueKind::StageDing);
        assert!(countdown.tick().is_none());
    }
}
