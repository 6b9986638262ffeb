//! Integration tests for a full brew through the public API.
//!
//! These drive the timer manager with a hand-cranked clock and check the
//! reference scenarios end to end: expansion, countdown, pause/resume and
//! dose edits.

use std::sync::{Arc, Mutex};

use pourover_core::{
    cues_at, expand, water_at, Cue, CueKind, Lifecycle, LifecycleEvent, ManualClock, Recipe,
    RecipeEdit, Stage, StageKind, TimerError, TimerManager, TimerObserver,
};

fn scenario_stages() -> Vec<Stage> {
    vec![Stage::new("Bloom", 30, "60g"), Stage::new("Main", 120, "150g")]
}

#[derive(Clone, Default)]
struct Log {
    cues: Arc<Mutex<Vec<Cue>>>,
    lifecycle: Arc<Mutex<Vec<&'static str>>>,
    completions: Arc<Mutex<Vec<u32>>>,
}

impl TimerObserver for Log {
    fn on_cue(&mut self, cue: Cue) {
        self.cues.lock().unwrap().push(cue);
    }

    fn on_complete(&mut self, total: u32) {
        self.completions.lock().unwrap().push(total);
    }

    fn on_lifecycle(&mut self, event: &LifecycleEvent) {
        self.lifecycle.lock().unwrap().push(event.name());
    }
}

fn crank(manager: &mut TimerManager<ManualClock>, ticks: u32) {
    for _ in 0..ticks {
        let handle = manager.state().active_handle.expect("no live tick source");
        assert!(manager.on_tick(handle));
    }
}

#[test]
fn test_scenario_a_expansion_and_cues() {
    let timeline = expand(&scenario_stages()).unwrap();

    let shape: Vec<_> = timeline
        .stages()
        .iter()
        .map(|s| (s.kind, s.start_time, s.end_time, s.target_water.amount))
        .collect();
    assert_eq!(
        shape,
        vec![
            (StageKind::Pour, 0, 10, 60.0),
            (StageKind::Wait, 10, 30, 60.0),
            (StageKind::Pour, 30, 60, 150.0),
            (StageKind::Wait, 60, 120, 150.0),
        ]
    );

    assert!(cues_at(&timeline, 0).contains(&CueKind::StageDing));
    assert!(cues_at(&timeline, 121).contains(&CueKind::Complete));
    assert_eq!(water_at(&timeline, 0), 0.0);
    assert_eq!(water_at(&timeline, 5), 30.0);
    assert_eq!(water_at(&timeline, 20), 60.0);
    assert_eq!(water_at(&timeline, 500), 150.0);
}

#[test]
fn test_scenario_b_fresh_start_counts_down() {
    let log = Log::default();
    let mut manager = TimerManager::new(expand(&scenario_stages()).unwrap(), ManualClock::new());
    manager.subscribe(log.clone());

    assert!(manager.start());
    assert_eq!(manager.lifecycle(), Lifecycle::CountingDown);
    crank(&mut manager, 3);

    assert_eq!(manager.lifecycle(), Lifecycle::Running);
    assert_eq!(manager.elapsed(), 0);

    let kinds: Vec<_> = log.cues.lock().unwrap().iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![
            CueKind::PreWarning,
            CueKind::PreWarning,
            CueKind::PreWarning,
            CueKind::StageDing,
        ]
    );
}

#[test]
fn test_scenario_c_pause_resume_without_countdown() {
    let log = Log::default();
    let mut manager = TimerManager::new(expand(&scenario_stages()).unwrap(), ManualClock::new());
    manager.subscribe(log.clone());

    manager.start();
    crank(&mut manager, 3 + 45);
    assert!(manager.pause());
    assert_eq!(manager.elapsed(), 45);

    assert!(manager.start());
    assert_eq!(manager.lifecycle(), Lifecycle::Running);
    assert_eq!(manager.state().countdown_remaining, None);

    crank(&mut manager, 75);
    assert_eq!(manager.lifecycle(), Lifecycle::Running);
    crank(&mut manager, 1);
    assert_eq!(manager.lifecycle(), Lifecycle::Completed);
    assert_eq!(manager.elapsed(), 120);
    assert_eq!(*log.completions.lock().unwrap(), vec![120]);

    // Every main-timer cue fired exactly once across the pause.
    let main_cues: Vec<_> = log
        .cues
        .lock()
        .unwrap()
        .iter()
        .filter(|c| c.tick > 0)
        .map(|c| (c.kind, c.tick))
        .collect();
    assert_eq!(
        main_cues,
        vec![
            (CueKind::PreWarning, 8),
            (CueKind::PreWarning, 9),
            (CueKind::StageDing, 10),
            (CueKind::PourEndDing, 10),
            (CueKind::PreWarning, 28),
            (CueKind::PreWarning, 29),
            (CueKind::StageDing, 30),
            (CueKind::PreWarning, 58),
            (CueKind::PreWarning, 59),
            (CueKind::StageDing, 60),
            (CueKind::PourEndDing, 60),
            (CueKind::PreWarning, 118),
            (CueKind::PreWarning, 119),
            (CueKind::Complete, 121),
        ]
    );

    assert_eq!(
        *log.lifecycle.lock().unwrap(),
        vec![
            "timer:started",
            "timer:running",
            "timer:paused",
            "timer:resumed",
            "timer:completed",
        ]
    );
}

#[test]
fn test_scenario_d_coffee_edit_rescales_water_only() {
    let mut recipe = Recipe {
        name: "Scenario D".into(),
        coffee_grams: 10.0,
        water_grams: 150.0,
        stages: scenario_stages(),
    };
    let before = recipe.timeline().unwrap();
    let mut manager = TimerManager::new(before.clone(), ManualClock::new());

    recipe.apply(RecipeEdit::Coffee(15.0)).unwrap();
    let after = recipe.timeline().unwrap();
    manager.replace_timeline(after.clone()).unwrap();

    for (old, new) in before.stages().iter().zip(after.stages()) {
        assert_eq!((old.start_time, old.end_time), (new.start_time, new.end_time));
        assert_eq!(new.target_water.amount, old.target_water.amount * 1.5);
    }
    assert_eq!(manager.timeline().final_water(), 225.0);

    manager.start();
    assert_eq!(
        manager.replace_timeline(before),
        Err(TimerError::ScheduleLocked {
            lifecycle: Lifecycle::CountingDown
        })
    );
}

#[test]
fn test_skip_from_running_reports_total() {
    let log = Log::default();
    let mut manager = TimerManager::new(expand(&scenario_stages()).unwrap(), ManualClock::new());
    manager.subscribe(log.clone());

    manager.start();
    crank(&mut manager, 3 + 12);
    assert!(manager.skip());
    assert_eq!(manager.lifecycle(), Lifecycle::Completed);
    assert_eq!(manager.elapsed(), 120);

    crank(&mut manager, 1);
    assert_eq!(*log.completions.lock().unwrap(), vec![120]);
    assert_eq!(manager.state().active_handle, None);
}
