//! Async host for a brew session.
//!
//! One actor task owns the [`TimerManager`] and the [`Recipe`]. Commands
//! arrive over an mpsc channel and ticks over another; both are handled by
//! the same `select!` loop, so every transition runs on one task and needs
//! no locking. Progress leaves through a broadcast channel of [`Event`]s.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::error::{CoreError, ScheduleError, TimerError};
use crate::events::{Event, LifecycleEvent};
use crate::feedback::{CuePlayer, Haptics, Silent, TimerObserver};
use crate::recipe::{Recipe, RecipeEdit};
use crate::timer::{
    water_at, BrewSnapshot, Clock, Cue, StageChange, TickHandle, Timeline, TimerManager,
    TimerSettings,
};

const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 1024;

/// A [`Clock`] backed by tokio timers.
///
/// Each tick source is its own task forwarding its handle into a channel.
/// Periodic sources use `interval_at`, so tick N lands at `start + N * period`
/// however long the handlers take.
#[derive(Debug)]
pub struct TokioClock {
    ticks: mpsc::UnboundedSender<TickHandle>,
    tasks: HashMap<TickHandle, JoinHandle<()>>,
}

impl TokioClock {
    /// Create a clock and the receiver its ticks arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TickHandle>) {
        let (ticks, rx) = mpsc::unbounded_channel();
        let clock = Self {
            ticks,
            tasks: HashMap::new(),
        };
        (clock, rx)
    }

    fn track(&mut self, handle: TickHandle, task: JoinHandle<()>) {
        self.tasks.retain(|_, running| !running.is_finished());
        self.tasks.insert(handle, task);
    }
}

impl Clock for TokioClock {
    fn start_ticks(&mut self, handle: TickHandle, period: Duration) {
        let tx = self.ticks.clone();
        let first = Instant::now() + period;
        let task = tokio::spawn(async move {
            let mut interval = time::interval_at(first, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                interval.tick().await;
                if tx.send(handle).is_err() {
                    break;
                }
            }
        });
        self.track(handle, task);
    }

    fn fire_once(&mut self, handle: TickHandle, delay: Duration) {
        let tx = self.ticks.clone();
        let task = tokio::spawn(async move {
            time::sleep(delay).await;
            let _ = tx.send(handle);
        });
        self.track(handle, task);
    }

    fn cancel(&mut self, handle: TickHandle) {
        if let Some(task) = self.tasks.remove(&handle) {
            task.abort();
        }
    }
}

impl Drop for TokioClock {
    fn drop(&mut self) {
        for task in self.tasks.values() {
            task.abort();
        }
    }
}

/// Forwards engine notifications onto the event broadcast.
struct BroadcastObserver {
    events: broadcast::Sender<Event>,
    timeline: watch::Receiver<Arc<Timeline>>,
}

impl BroadcastObserver {
    fn send(&self, event: Event) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl TimerObserver for BroadcastObserver {
    fn on_tick(&mut self, elapsed: u32) {
        let water = water_at(&self.timeline.borrow(), elapsed);
        self.send(Event::Tick { elapsed, water });
    }

    fn on_stage_change(&mut self, index: usize, is_waiting: bool) {
        self.send(Event::StageChanged {
            stage: StageChange { index, is_waiting },
        });
    }

    fn on_countdown_change(&mut self, remaining: Option<u32>) {
        self.send(Event::Countdown { remaining });
    }

    fn on_cue(&mut self, cue: Cue) {
        self.send(Event::Cue {
            kind: cue.kind,
            tick: cue.tick,
        });
    }

    fn on_complete(&mut self, total_elapsed: u32) {
        self.send(Event::BrewCompleted { total_elapsed });
    }

    fn on_lifecycle(&mut self, event: &LifecycleEvent) {
        self.send(Event::Lifecycle {
            event: event.clone(),
        });
    }
}

enum Command {
    Start(oneshot::Sender<bool>),
    Pause(oneshot::Sender<bool>),
    Reset(oneshot::Sender<bool>),
    Skip(oneshot::Sender<bool>),
    Edit(RecipeEdit, oneshot::Sender<Result<Recipe, CoreError>>),
    Snapshot(oneshot::Sender<BrewSnapshot>),
    Shutdown(oneshot::Sender<()>),
}

/// Builder for a brew session.
pub struct BrewRuntime {
    recipe: Recipe,
    settings: TimerSettings,
    audio: Box<dyn CuePlayer>,
    haptics: Box<dyn Haptics>,
}

impl BrewRuntime {
    pub fn new(recipe: Recipe) -> Self {
        Self {
            recipe,
            settings: TimerSettings::default(),
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

    /// Expand the recipe and spawn the session actor on the current tokio
    /// runtime. The session starts `Idle`.
    pub fn spawn(self) -> Result<BrewHandle, ScheduleError> {
        let timeline = self.recipe.timeline()?;
        let (clock, ticks) = TokioClock::new();
        let (commands_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (timeline_tx, timeline_rx) = watch::channel(Arc::new(timeline.clone()));

        let mut manager = TimerManager::new(timeline, clock)
            .with_settings(self.settings)
            .with_audio(self.audio)
            .with_haptics(self.haptics);
        manager.subscribe(BroadcastObserver {
            events: events.clone(),
            timeline: timeline_rx.clone(),
        });

        info!(recipe = %self.recipe.name, "brew session ready");
        let session = Session {
            manager,
            recipe: self.recipe,
            timeline: timeline_tx,
        };
        tokio::spawn(session.run(commands, ticks));

        Ok(BrewHandle {
            commands: commands_tx,
            events,
            timeline: timeline_rx,
        })
    }
}

/// The actor's state.
struct Session {
    manager: TimerManager<TokioClock>,
    recipe: Recipe,
    timeline: watch::Sender<Arc<Timeline>>,
}

impl Session {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut ticks: mpsc::UnboundedReceiver<TickHandle>,
    ) {
        loop {
            tokio::select! {
                Some(handle) = ticks.recv() => {
                    self.manager.on_tick(handle);
                }
                command = commands.recv() => match command {
                    Some(Command::Shutdown(reply)) => {
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle(command),
                    None => break,
                },
            }
        }
        debug!("brew session stopped");
    }

    fn handle(&mut self, command: Command) {
        // A dropped reply receiver means the caller stopped waiting.
        match command {
            Command::Start(reply) => {
                let _ = reply.send(self.manager.start());
            }
            Command::Pause(reply) => {
                let _ = reply.send(self.manager.pause());
            }
            Command::Reset(reply) => {
                let _ = reply.send(self.manager.reset());
            }
            Command::Skip(reply) => {
                let _ = reply.send(self.manager.skip());
            }
            Command::Edit(edit, reply) => {
                let _ = reply.send(self.edit(edit));
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.manager.snapshot());
            }
            Command::Shutdown(reply) => {
                let _ = reply.send(());
            }
        }
    }

    /// Rescale the recipe and swap the timeline. Refused unless idle.
    fn edit(&mut self, edit: RecipeEdit) -> Result<Recipe, CoreError> {
        let mut recipe = self.recipe.clone();
        recipe.apply(edit)?;
        let timeline = recipe.timeline()?;
        self.manager.replace_timeline(timeline.clone())?;

        self.timeline.send_replace(Arc::new(timeline));
        self.recipe = recipe;
        info!(
            coffee = self.recipe.coffee_grams,
            water = self.recipe.water_grams,
            "recipe rescaled"
        );
        Ok(self.recipe.clone())
    }
}

/// Cloneable handle to a running brew session.
#[derive(Clone)]
pub struct BrewHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<Event>,
    timeline: watch::Receiver<Arc<Timeline>>,
}

impl BrewHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, TimerError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .await
            .map_err(|_| TimerError::RuntimeClosed)?;
        rx.await.map_err(|_| TimerError::RuntimeClosed)
    }

    /// Fresh start with countdown, or resume. `false` if ignored.
    pub async fn start(&self) -> Result<bool, TimerError> {
        self.request(Command::Start).await
    }

    pub async fn pause(&self) -> Result<bool, TimerError> {
        self.request(Command::Pause).await
    }

    pub async fn reset(&self) -> Result<bool, TimerError> {
        self.request(Command::Reset).await
    }

    pub async fn skip(&self) -> Result<bool, TimerError> {
        self.request(Command::Skip).await
    }

    /// Apply a dose edit. Fails with [`TimerError::ScheduleLocked`] unless
    /// the session is idle; the recipe is unchanged on any error.
    pub async fn edit(&self, edit: RecipeEdit) -> Result<Recipe, CoreError> {
        self.request(|reply| Command::Edit(edit, reply)).await?
    }

    pub async fn snapshot(&self) -> Result<BrewSnapshot, TimerError> {
        self.request(Command::Snapshot).await
    }

    /// Stop the actor. Pending ticks are dropped.
    pub async fn shutdown(&self) -> Result<(), TimerError> {
        self.request(Command::Shutdown).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// The timeline currently driving the session.
    pub fn timeline(&self) -> Arc<Timeline> {
        Arc::clone(&self.timeline.borrow())
    }
}
