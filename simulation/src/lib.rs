#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frame driver that owns the Branch Hop world and its systems.
//!
//! Each frame the driver ticks the world, then routes the resulting events
//! through track generation and jump timing, applying their commands until
//! both systems fall silent.

mod autopilot;

use std::time::Duration;

use branch_hop_catalog::Catalog;
use branch_hop_core::{Command, Event, PlayState, PlayerSnapshot, ProgressSnapshot, TrackView};
use branch_hop_system_jump_timing::{self as jump_timing, JumpTiming};
use branch_hop_system_track_generation::{self as track_generation, TrackGeneration};
use branch_hop_world::{self as world, query, World};
use glam::Vec3;
use tracing::warn;

pub use autopilot::Autopilot;

/// Upper bound on command rounds within a single frame.
const MAX_PUMP_ROUNDS: usize = 64;

/// Input captured by an adapter for a single frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameInput {
    /// Whether the jump input went down during this frame.
    pub pressed: bool,
}

/// Lives, win threshold and points per grade.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressConfig {
    /// Lives at the start of a session.
    pub lives: u32,
    /// Jump count that triggers the win notification. Zero disables it.
    pub win_jumps: u32,
    /// Points for a perfect jump.
    pub perfect_points: u32,
    /// Points for a good jump.
    pub good_points: u32,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            lives: 10,
            win_jumps: 50,
            perfect_points: 2,
            good_points: 1,
        }
    }
}

/// Flight integration bounds and fall acceleration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlightConfig {
    /// Distance from the destination at which a ballistic flight lands.
    pub landing_tolerance: f32,
    /// Longest a flight may last before it is snapped to its destination.
    pub max_flight: Duration,
    /// Downward acceleration applied while falling after a miss.
    pub fall_gravity: f32,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            landing_tolerance: 0.35,
            max_flight: Duration::from_secs(2),
            fall_gravity: 40.0,
        }
    }
}

/// Delay between a miss and the level reload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RespawnConfig {
    /// Countdown on unscaled time before the reload.
    pub delay: Duration,
    /// Whether the reload waits for the fade collaborator.
    pub fade_gated: bool,
}

impl Default for RespawnConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(600),
            fade_gated: false,
        }
    }
}

/// Everything required to assemble a simulation.
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    /// Track streaming parameters.
    pub track: track_generation::Config,
    /// Timing windows and trajectory parameters.
    pub timing: jump_timing::Config,
    /// Patterns the track is assembled from.
    pub catalog: Catalog,
    /// Session counters.
    pub progress: ProgressConfig,
    /// Flight integration parameters.
    pub flight: FlightConfig,
    /// Respawn behaviour.
    pub respawn: RespawnConfig,
    /// Where the player waits for the first branch after each level load.
    pub spawn_point: Vec3,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            track: track_generation::Config::default(),
            timing: jump_timing::Config::default(),
            catalog: Catalog::builtin(),
            progress: ProgressConfig::default(),
            flight: FlightConfig::default(),
            respawn: RespawnConfig::default(),
            spawn_point: Vec3::new(0.0, 2.0, 0.0),
        }
    }
}

impl SimulationConfig {
    fn configure_commands(&self) -> Vec<Command> {
        vec![
            Command::ConfigureProgress {
                lives: self.progress.lives,
                win_jumps: self.progress.win_jumps,
                perfect_points: self.progress.perfect_points,
                good_points: self.progress.good_points,
            },
            Command::ConfigureFlight {
                landing_tolerance: self.flight.landing_tolerance,
                max_flight: self.flight.max_flight,
                fall_gravity: self.flight.fall_gravity,
            },
            Command::ConfigureRespawn {
                delay: self.respawn.delay,
                fade_gated: self.respawn.fade_gated,
            },
            Command::ConfigureSpawnPoint {
                position: self.spawn_point,
            },
        ]
    }
}

/// Owns the world and the systems that drive it.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    track_generation: TrackGeneration,
    jump_timing: JumpTiming,
}

impl Simulation {
    /// Builds a simulation, applies the configuration and streams the first
    /// track window so the player stands on its first branch.
    #[must_use]
    pub fn new(config: SimulationConfig) -> Self {
        let configure = config.configure_commands();
        let SimulationConfig {
            track,
            timing,
            catalog,
            ..
        } = config;

        let mut simulation = Self {
            world: World::new(),
            track_generation: TrackGeneration::new(track, catalog),
            jump_timing: JumpTiming::new(timing),
        };

        let mut events = Vec::new();
        for command in configure {
            world::apply(&mut simulation.world, command, &mut events);
        }
        let _ = simulation.pump(events, FrameInput::default());
        simulation
    }

    /// Advances the simulation by one frame and returns every event it
    /// produced.
    pub fn step(&mut self, dt: Duration, input: FrameInput) -> Vec<Event> {
        self.submit_with_input(Command::Tick { dt }, input)
    }

    /// Applies an adapter command such as a pause toggle, then lets the
    /// systems react to it.
    pub fn submit(&mut self, command: Command) -> Vec<Event> {
        self.submit_with_input(command, FrameInput::default())
    }

    /// Signals the fade collaborator reached its mid-point.
    pub fn complete_fade(&mut self) -> Vec<Event> {
        self.submit(Command::CompleteFade)
    }

    /// Starts a fresh session.
    pub fn restart(&mut self) -> Vec<Event> {
        self.submit(Command::Restart)
    }

    /// Pauses or resumes the game.
    pub fn set_paused(&mut self, paused: bool) -> Vec<Event> {
        self.submit(Command::SetPaused { paused })
    }

    /// Read-only access to the world for queries.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Current simulation clock.
    #[must_use]
    pub fn clock(&self) -> Duration {
        query::clock(&self.world)
    }

    /// Current game state.
    #[must_use]
    pub fn play_state(&self) -> PlayState {
        query::play_state(&self.world)
    }

    /// Player body snapshot.
    #[must_use]
    pub fn player(&self) -> PlayerSnapshot {
        query::player(&self.world)
    }

    /// Session counters.
    #[must_use]
    pub fn progress(&self) -> ProgressSnapshot {
        query::progress(&self.world)
    }

    /// Live track window.
    #[must_use]
    pub fn track(&self) -> TrackView {
        query::track_view(&self.world)
    }

    /// State of the jump timing machine.
    #[must_use]
    pub const fn jump_phase(&self) -> jump_timing::JumpPhase {
        self.jump_timing.phase()
    }

    fn submit_with_input(&mut self, command: Command, input: FrameInput) -> Vec<Event> {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);
        self.pump(events, input)
    }

    /// Routes events through the systems until they stop issuing commands.
    /// The press is offered to jump timing on the first round only.
    fn pump(&mut self, initial: Vec<Event>, input: FrameInput) -> Vec<Event> {
        let mut log = Vec::new();
        let mut events = initial;
        let mut pressed = input.pressed;

        for _ in 0..MAX_PUMP_ROUNDS {
            let track = query::track_view(&self.world);
            let player = query::player(&self.world);
            let mut commands = Vec::new();

            self.track_generation
                .handle(&events, &track, &player, &mut commands);
            self.jump_timing.handle(
                &events,
                pressed,
                query::play_state(&self.world),
                &track,
                query::clock(&self.world),
                &mut commands,
            );
            pressed = false;
            log.append(&mut events);

            if commands.is_empty() {
                return log;
            }
            for command in commands {
                world::apply(&mut self.world, command, &mut events);
            }
        }

        warn!(rounds = MAX_PUMP_ROUNDS, "systems kept issuing commands");
        log.append(&mut events);
        log
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}
