//! Brew timer state machine.
//!
//! The manager owns the only mutable timer state. It never sleeps; a
//! [`Clock`] delivers tick handles back through [`TimerManager::on_tick`],
//! and every command method applies one transition synchronously.
//!
//! ## State Transitions
//!
//! ```text
//! Idle ──start──► CountingDown ──countdown done──► Running ──schedule done──► Completed
//!  ▲                  │  │                          │  ▲                         │
//!  │                  │  └────────skip──────────────┼──┼────────────────────────►│
//!  │                  └──pause──► Paused ◄──pause───┘  │                         │
//!  │                                │  └───start───────┘ (resume, no countdown)  │
//!  └────────────────────────────── reset (from any non-idle state) ◄─────────────┘
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut manager = TimerManager::new(expand(&recipe.stages)?, clock);
//! manager.start();
//! // whenever the clock fires:
//! manager.on_tick(handle);
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::clock::{Clock, TickHandle};
use super::countdown::{Countdown, CountdownStep, DEFAULT_COUNTDOWN_SECS};
use super::cues::{Cue, CueKind};
use super::main_timer::{MainTick, MainTimer, StageChange};
use super::schedule::Timeline;
use super::water::water_at;
use crate::error::TimerError;
use crate::events::LifecycleEvent;
use crate::feedback::{CuePlayer, HapticStrength, Haptics, Silent, TimerObserver};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    #[default]
    Idle,
    CountingDown,
    Running,
    Paused,
    Completed,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lifecycle::Idle => "idle",
            Lifecycle::CountingDown => "counting down",
            Lifecycle::Running => "running",
            Lifecycle::Paused => "paused",
            Lifecycle::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Timing knobs for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSettings {
    pub countdown_secs: u32,
    pub tick_interval: Duration,
    /// Pause between skip and the synthesized completion, so the final
    /// frame is visible before the view changes.
    pub skip_completion_delay: Duration,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            countdown_secs: DEFAULT_COUNTDOWN_SECS,
            tick_interval: Duration::from_secs(1),
            skip_completion_delay: Duration::from_millis(600),
        }
    }
}

/// The manager's mutable state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimerManagerState {
    pub lifecycle: Lifecycle,
    pub elapsed_seconds: u32,
    /// Set once the countdown has handed off; a resume skips the countdown.
    pub has_started_once: bool,
    pub countdown_remaining: Option<u32>,
    /// The single live tick source, if any.
    pub active_handle: Option<TickHandle>,
}

/// Point-in-time view for status output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrewSnapshot {
    pub state: TimerManagerState,
    pub total_duration: u32,
    pub water: f64,
    pub stage: StageChange,
    pub stage_label: String,
}

/// What the active tick source is driving.
#[derive(Debug)]
enum Driver {
    Idle,
    Countdown(Countdown),
    Main(MainTimer),
    /// Skip is waiting to deliver its synthesized completion.
    PendingCompletion,
}

enum DriverStep {
    Countdown(CountdownStep),
    Main(MainTick),
    SkippedCompletion,
}

pub struct TimerManager<C: Clock> {
    timeline: Arc<Timeline>,
    settings: TimerSettings,
    state: TimerManagerState,
    driver: Driver,
    clock: C,
    next_handle: u64,
    observers: Vec<Box<dyn TimerObserver>>,
    audio: Box<dyn CuePlayer>,
    haptics: Box<dyn Haptics>,
}

impl<C: Clock> TimerManager<C> {
    /// Create a manager in the `Idle` state with silent feedback.
    pub fn new(timeline: Timeline, clock: C) -> Self {
        Self {
            timeline: Arc::new(timeline),
            settings: TimerSettings::default(),
            state: TimerManagerState::default(),
            driver: Driver::Idle,
            clock,
            next_handle: 1,
            observers: Vec::new(),
            audio: Box::new(Silent),
            haptics: Box::new(Silent),
        }
    }

    pub fn with_settings(mut self, settings: TimerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_audio(mut self, audio: impl CuePlayer + 'static) -> Self {
        self.audio = Box::new(audio);
        self
    }

    pub fn with_haptics(mut self, haptics: impl Haptics + 'static) -> Self {
        self.haptics = Box::new(haptics);
        self
    }

    pub fn subscribe(&mut self, observer: impl TimerObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &TimerManagerState {
        &self.state
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.state.lifecycle
    }

    pub fn elapsed(&self) -> u32 {
        self.state.elapsed_seconds
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Water poured so far, for display.
    pub fn water(&self) -> f64 {
        water_at(&self.timeline, self.state.elapsed_seconds)
    }

    pub fn current_stage(&self) -> StageChange {
        let index = self.timeline.substage_index_at(self.state.elapsed_seconds);
        let is_waiting = self.timeline.get(index).map(|s| !s.is_pour()).unwrap_or(false);
        StageChange { index, is_waiting }
    }

    pub fn snapshot(&self) -> BrewSnapshot {
        let stage = self.current_stage();
        BrewSnapshot {
            state: self.state.clone(),
            total_duration: self.timeline.total_duration(),
            water: self.water(),
            stage,
            stage_label: self
                .timeline
                .get(stage.index)
                .map(|s| s.label.clone())
                .unwrap_or_default(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a fresh brew (with countdown) or resume a paused one.
    ///
    /// Returns `false` when there is nothing to start.
    pub fn start(&mut self) -> bool {
        match self.state.lifecycle {
            Lifecycle::Idle | Lifecycle::Paused => {
                // A pause during the countdown leaves `has_started_once` unset,
                // so only that pause replays it.
                let fresh = match self.state.lifecycle {
                    Lifecycle::Paused => !self.state.has_started_once,
                    _ => !self.state.has_started_once || self.state.elapsed_seconds == 0,
                };
                if fresh {
                    self.begin_countdown();
                } else {
                    let elapsed = self.state.elapsed_seconds;
                    self.enter_running(elapsed, LifecycleEvent::Resumed { elapsed, at: Utc::now() });
                }
                true
            }
            Lifecycle::CountingDown | Lifecycle::Running | Lifecycle::Completed => {
                debug!(lifecycle = %self.state.lifecycle, "start ignored");
                false
            }
        }
    }

    /// Freeze the brew. Pausing during the countdown abandons it; the next
    /// start replays it.
    pub fn pause(&mut self) -> bool {
        match self.state.lifecycle {
            Lifecycle::Running => {
                self.cancel_active();
                self.state.lifecycle = Lifecycle::Paused;
            }
            Lifecycle::CountingDown => {
                self.cancel_active();
                self.clear_countdown();
                self.state.lifecycle = Lifecycle::Paused;
                self.state.elapsed_seconds = 0;
            }
            _ => {
                debug!(lifecycle = %self.state.lifecycle, "pause ignored");
                return false;
            }
        }

        self.haptics.pulse(HapticStrength::Light);
        let elapsed = self.state.elapsed_seconds;
        self.emit_lifecycle(LifecycleEvent::Paused { elapsed, at: Utc::now() });
        true
    }

    /// Back to `Idle` from anywhere, dropping any pending tick or completion.
    pub fn reset(&mut self) -> bool {
        if self.state.lifecycle == Lifecycle::Idle {
            return false;
        }

        self.cancel_active();
        self.clear_countdown();
        self.state = TimerManagerState::default();
        self.haptics.pulse(HapticStrength::Warning);
        self.emit_lifecycle(LifecycleEvent::Reset { at: Utc::now() });
        true
    }

    /// Jump to the end of the schedule.
    ///
    /// The state is `Completed` immediately; the `Complete` cue and the
    /// completion callback follow after `skip_completion_delay`.
    pub fn skip(&mut self) -> bool {
        if !matches!(
            self.state.lifecycle,
            Lifecycle::CountingDown | Lifecycle::Running
        ) {
            debug!(lifecycle = %self.state.lifecycle, "skip ignored");
            return false;
        }

        self.cancel_active();
        self.clear_countdown();

        let total = self.timeline.total_duration();
        self.state.elapsed_seconds = total;
        self.state.has_started_once = true;
        self.state.lifecycle = Lifecycle::Completed;
        self.emit_lifecycle(LifecycleEvent::Skipped { elapsed: total, at: Utc::now() });

        let stage = self.current_stage();
        self.notify(|o| {
            o.on_stage_change(stage.index, stage.is_waiting);
            o.on_tick(total);
        });

        self.driver = Driver::PendingCompletion;
        let handle = self.allocate_handle();
        self.clock.fire_once(handle, self.settings.skip_completion_delay);
        self.state.active_handle = Some(handle);
        true
    }

    /// Swap in a recomputed timeline. Only allowed while `Idle`.
    pub fn replace_timeline(&mut self, timeline: Timeline) -> Result<(), TimerError> {
        if self.state.lifecycle != Lifecycle::Idle {
            warn!(lifecycle = %self.state.lifecycle, "refusing timeline change");
            return Err(TimerError::ScheduleLocked {
                lifecycle: self.state.lifecycle,
            });
        }
        self.timeline = Arc::new(timeline);
        Ok(())
    }

    /// Deliver a tick from the clock.
    ///
    /// Ticks from a handle that is no longer active are dropped. Returns
    /// whether the tick was applied.
    pub fn on_tick(&mut self, handle: TickHandle) -> bool {
        if self.state.active_handle != Some(handle) {
            debug!(handle = handle.id(), "dropping stale tick");
            return false;
        }

        let step = match &mut self.driver {
            Driver::Countdown(countdown) => countdown.tick().map(DriverStep::Countdown),
            Driver::Main(timer) => timer.tick().map(DriverStep::Main),
            Driver::PendingCompletion => Some(DriverStep::SkippedCompletion),
            Driver::Idle => None,
        };

        match step {
            Some(DriverStep::Countdown(step)) => self.deliver_countdown_step(step),
            Some(DriverStep::Main(tick)) => self.deliver_main_tick(tick),
            Some(DriverStep::SkippedCompletion) => self.deliver_skipped_completion(),
            None => return false,
        }
        true
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn begin_countdown(&mut self) {
        let countdown_secs = self.settings.countdown_secs;
        let (countdown, opening) = Countdown::start(countdown_secs);
        self.state.lifecycle = Lifecycle::CountingDown;
        self.state.elapsed_seconds = 0;
        self.emit_lifecycle(LifecycleEvent::Started { countdown_secs, at: Utc::now() });

        if !opening.finished {
            self.driver = Driver::Countdown(countdown);
            self.arm_ticks();
        }
        self.deliver_countdown_step(opening);
    }

    fn deliver_countdown_step(&mut self, step: CountdownStep) {
        self.play(Cue::new(step.cue, 0));

        if !step.finished {
            self.state.countdown_remaining = Some(step.remaining);
            self.notify(|o| o.on_countdown_change(Some(step.remaining)));
            return;
        }

        self.cancel_active();
        self.clear_countdown();
        self.state.has_started_once = true;
        self.enter_running(0, LifecycleEvent::Running { at: Utc::now() });
    }

    fn enter_running(&mut self, elapsed: u32, event: LifecycleEvent) {
        let timer = MainTimer::start(Arc::clone(&self.timeline), elapsed);
        let stage = timer.current_stage();
        self.state.lifecycle = Lifecycle::Running;
        self.state.elapsed_seconds = elapsed;
        self.driver = Driver::Main(timer);
        self.arm_ticks();
        self.emit_lifecycle(event);
        self.notify(|o| o.on_stage_change(stage.index, stage.is_waiting));
    }

    fn deliver_main_tick(&mut self, tick: MainTick) {
        self.state.elapsed_seconds = tick.elapsed;

        for &kind in &tick.cues {
            self.play(Cue::new(kind, tick.tick));
        }
        if let Some(stage) = tick.stage_change {
            self.notify(|o| o.on_stage_change(stage.index, stage.is_waiting));
        }
        let elapsed = tick.elapsed;
        self.notify(|o| o.on_tick(elapsed));

        if tick.completed {
            self.cancel_active();
            self.state.lifecycle = Lifecycle::Completed;
            self.notify(|o| o.on_complete(elapsed));
            self.emit_lifecycle(LifecycleEvent::Completed { elapsed, at: Utc::now() });
        }
    }

    fn deliver_skipped_completion(&mut self) {
        self.state.active_handle = None;
        self.driver = Driver::Idle;

        let total = self.state.elapsed_seconds;
        self.play(Cue::new(CueKind::Complete, total));
        self.notify(|o| o.on_complete(total));
        self.emit_lifecycle(LifecycleEvent::Completed { elapsed: total, at: Utc::now() });
    }

    /// Sound, haptics and observers for one cue.
    fn play(&mut self, cue: Cue) {
        self.audio.play(cue.kind);
        if cue.kind == CueKind::PourEndDing {
            self.haptics.pulse(HapticStrength::Medium);
        }
        self.notify(|o| o.on_cue(cue));
    }

    fn allocate_handle(&mut self) -> TickHandle {
        let handle = TickHandle::new(self.next_handle);
        self.next_handle += 1;
        handle
    }

    fn arm_ticks(&mut self) {
        let handle = self.allocate_handle();
        self.clock.start_ticks(handle, self.settings.tick_interval);
        self.state.active_handle = Some(handle);
        debug!(handle = handle.id(), "tick source armed");
    }

    /// Invalidate the live tick source before anything else changes.
    fn cancel_active(&mut self) {
        if let Some(handle) = self.state.active_handle.take() {
            self.clock.cancel(handle);
            debug!(handle = handle.id(), "tick source cancelled");
        }
        if let Driver::Countdown(countdown) = &mut self.driver {
            countdown.cancel();
        }
        self.driver = Driver::Idle;
    }

    fn clear_countdown(&mut self) {
        if self.state.countdown_remaining.take().is_some() {
            self.notify(|o| o.on_countdown_change(None));
        }
    }

    fn emit_lifecycle(&mut self, event: LifecycleEvent) {
        info!(
            event = event.name(),
            elapsed = self.state.elapsed_seconds,
            "timer transition"
        );
        self.notify(|o| o.on_lifecycle(&event));
    }

    fn notify(&mut self, mut f: impl FnMut(&mut dyn TimerObserver)) {
        for observer in &mut self.observers {
            f(observer.as_mut());
        }
    }
}
