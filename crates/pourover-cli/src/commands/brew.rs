use std::io::Write;
use std::sync::Arc;

use clap::Args;
use pourover_core::{
    BrewHandle, BrewRuntime, Config, CueKind, CuePlayer, Event, HapticStrength, Haptics,
    LifecycleEvent, Timeline,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use super::{format_clock, format_grams, RecipeArgs};

#[derive(Args)]
pub struct BrewArgs {
    #[command(flatten)]
    pub recipe: RecipeArgs,
    /// Print every event as a JSON line
    #[arg(long)]
    pub json: bool,
    /// Do not ring the terminal bell on cues
    #[arg(long)]
    pub quiet: bool,
}

/// Rings the terminal bell on stderr, more rings for bigger moments.
struct TerminalBell;

impl CuePlayer for TerminalBell {
    fn play(&self, cue: CueKind) {
        let rings = match cue {
            CueKind::PreWarning | CueKind::StageDing => 1,
            CueKind::PourEndDing => 2,
            CueKind::Complete => 3,
        };
        let mut stderr = std::io::stderr();
        let result = stderr
            .write_all(&b"\x07\x07\x07"[..rings])
            .and_then(|()| stderr.flush());
        if let Err(e) = result {
            warn!(?cue, "failed to ring bell: {e}");
        }
    }
}

/// Terminals have no vibration motor; pulses are only logged.
struct LoggedHaptics;

impl Haptics for LoggedHaptics {
    fn pulse(&self, strength: HapticStrength) {
        debug!(?strength, "haptic pulse");
    }
}

pub fn run(args: BrewArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let recipe = args.recipe.resolve(&config)?;

    let mut runtime = BrewRuntime::new(recipe).with_settings(config.timer_settings());
    if config.feedback.sound && !args.quiet {
        runtime = runtime.with_audio(TerminalBell);
    }
    if config.feedback.haptics {
        runtime = runtime.with_haptics(LoggedHaptics);
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(async move {
        let handle = runtime.spawn()?;
        let result = drive(&handle, args.json).await;
        handle.shutdown().await?;
        result
    })
}

async fn drive(handle: &BrewHandle, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut events = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    if !json {
        eprintln!("commands: p pause, s start/resume, k skip, r reset, q quit");
    }
    handle.start().await?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    print_event(&event, &handle.timeline(), json)?;
                    if matches!(event, Event::BrewCompleted { .. }) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event output fell behind"),
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => {
                    let applied = match line.trim() {
                        "p" => handle.pause().await?,
                        "s" => handle.start().await?,
                        "k" => handle.skip().await?,
                        "r" => handle.reset().await?,
                        "q" => break,
                        "" => continue,
                        other => {
                            eprintln!("unknown command '{other}' (p, s, k, r, q)");
                            continue;
                        }
                    };
                    if !applied {
                        debug!(command = line.trim(), "command had no effect");
                    }
                }
                None => stdin_open = false,
            },
        }
    }
    Ok(())
}

fn print_event(
    event: &Event,
    timeline: &Arc<Timeline>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }

    match event {
        Event::Lifecycle { event } => match event {
            LifecycleEvent::Paused { elapsed, .. } => {
                println!("paused at {}", format_clock(*elapsed))
            }
            LifecycleEvent::Resumed { elapsed, .. } => {
                println!("resumed at {}", format_clock(*elapsed))
            }
            LifecycleEvent::Reset { .. } => println!("reset, press s to start again"),
            LifecycleEvent::Skipped { .. } => println!("skipped to the end"),
            _ => {}
        },
        Event::Countdown {
            remaining: Some(remaining),
        } => println!("{remaining}..."),
        Event::StageChanged { stage } => {
            if let Some(sub) = timeline.get(stage.index) {
                if stage.is_waiting {
                    println!("{} wait  {}", format_clock(sub.start_time), sub.detail);
                } else {
                    println!(
                        "{} pour to {}  {}",
                        format_clock(sub.start_time),
                        sub.target_water,
                        sub.label
                    );
                }
            }
        }
        Event::Tick { elapsed, water } => {
            println!(
                "  {} / {}  {}",
                format_clock(*elapsed),
                format_clock(timeline.total_duration()),
                format_grams(*water)
            );
        }
        Event::BrewCompleted { total_elapsed } => {
            println!("done in {}", format_clock(*total_elapsed))
        }
        Event::Countdown { remaining: None } | Event::Cue { .. } => {}
    }
    Ok(())
}
