#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays Branch Hop headlessly with a scripted
//! press timing and reports the outcome.

mod settings;

use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use branch_hop_core::{Event, PlayState};
use branch_hop_simulation::{Autopilot, FrameInput, Simulation, SimulationConfig};
use branch_hop_world::query;
use clap::Parser;
use tracing::{debug, info, trace};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

use crate::settings::Settings;

/// Command-line arguments accepted by the runner.
#[derive(Debug, Parser)]
#[command(name = "branch-hop", about = "Headless Branch Hop runner")]
struct Args {
    /// TOML settings file layered over the built-in tuning.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed for the track pattern stream.
    #[arg(long)]
    seed: Option<u64>,
    /// Number of frames to simulate.
    #[arg(long, default_value_t = 3_600)]
    ticks: u32,
    /// Simulated frames per second.
    #[arg(long, default_value_t = 60)]
    fps: u32,
    /// Delay between each landing and the scripted press, in milliseconds.
    #[arg(long, default_value_t = 40)]
    press_offset_ms: u64,
    /// Length of the respawn fade, in milliseconds. The reload happens at
    /// its mid-point.
    #[arg(long, default_value_t = 400)]
    fade_ms: u64,
    /// Log filter directive; falls back to `RUST_LOG`, then `info`.
    #[arg(long)]
    log: Option<String>,
}

/// Entry point for the Branch Hop command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log.as_deref())?;

    if args.fps == 0 {
        bail!("--fps must be positive");
    }

    let mut config = match &args.config {
        Some(path) => Settings::load(path)
            .and_then(Settings::into_config)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.track.rng_seed = seed;
    }

    let mut simulation = Simulation::new(config);
    println!("{}", query::welcome_banner(simulation.world()));

    let summary = run(&mut simulation, &args);
    println!(
        "score {} | jumps {} | lives {} | state {:?} | branches {} | misses {}",
        summary.score,
        summary.jumps,
        summary.lives,
        summary.state,
        summary.branches,
        summary.misses
    );
    Ok(())
}

fn init_tracing(directive: Option<&str>) -> Result<()> {
    let filter = match directive {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid log filter `{directive}`"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let subscriber = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter);
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install tracing subscriber")
}

#[derive(Debug)]
struct Summary {
    score: u32,
    jumps: u32,
    lives: u32,
    state: PlayState,
    branches: usize,
    misses: u32,
}

fn run(simulation: &mut Simulation, args: &Args) -> Summary {
    let frame = Duration::from_secs(1) / args.fps;
    let fade_midpoint = Duration::from_millis(args.fade_ms) / 2;
    let mut autopilot = Autopilot::new(Duration::from_millis(args.press_offset_ms));
    let mut fade: Option<Duration> = None;
    let mut misses = 0;

    for _ in 0..args.ticks {
        let pressed = autopilot.wants_press(simulation.clock() + frame);
        let mut events = simulation.step(frame, FrameInput { pressed });

        if let Some(remaining) = fade.as_mut() {
            *remaining = remaining.saturating_sub(frame);
            if remaining.is_zero() {
                fade = None;
                events.extend(simulation.complete_fade());
            }
        }

        for event in &events {
            match event {
                Event::FadeRequested => fade = Some(fade_midpoint),
                Event::PlayerMissed { .. } => misses += 1,
                _ => {}
            }
            log_event(event);
        }
        autopilot.observe(&events);

        if simulation.play_state() == PlayState::Failed {
            info!("no lives left, stopping");
            break;
        }
    }

    let progress = simulation.progress();
    Summary {
        score: progress.score,
        jumps: progress.jumps,
        lives: progress.lives,
        state: progress.state,
        branches: simulation.track().len(),
        misses,
    }
}

fn log_event(event: &Event) {
    match event {
        Event::TimeAdvanced { .. } => {}
        Event::BranchSpawned { .. } | Event::BranchRecycled { .. } | Event::BranchLinked { .. } => {
            trace!(?event, "track");
        }
        Event::PlayerMissed { reason } => info!(?reason, "missed"),
        Event::LivesChanged { lives } => info!(lives, "lives changed"),
        Event::WinReached { jumps } => info!(jumps, "win threshold reached"),
        Event::CueRequested { cue } => {
            debug!(intensity = cue.intensity(), pitch = cue.pitch(), "cue");
        }
        _ => debug!(?event, "event"),
    }
}
