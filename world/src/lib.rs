#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Branch Hop.

mod motion;
mod session;
mod track;

use std::time::Duration;

use branch_hop_core::{
    BranchId, Command, Event, MissReason, PlayState, RejectionReason, TimingGrade, Trajectory,
    WELCOME_BANNER,
};
use glam::Vec3;
use tracing::{debug, info};

use self::{
    motion::{Fall, Flight, Motion, RespawnSequence, TaskStatus},
    session::Session,
    track::TrackWindow,
};

const DEFAULT_SPAWN_POINT: Vec3 = Vec3::new(0.0, 2.0, 0.0);
const DEFAULT_LANDING_TOLERANCE: f32 = 0.35;
const DEFAULT_MAX_FLIGHT: Duration = Duration::from_secs(2);
const DEFAULT_FALL_GRAVITY: f32 = 40.0;
const DEFAULT_RESPAWN_DELAY: Duration = Duration::from_millis(600);

#[derive(Clone, Copy, Debug)]
struct FlightTuning {
    landing_tolerance: f32,
    max_flight: Duration,
    fall_gravity: f32,
}

#[derive(Clone, Copy, Debug)]
struct RespawnTuning {
    delay: Duration,
    fade_gated: bool,
}

#[derive(Debug)]
struct Player {
    position: Vec3,
    branch: Option<BranchId>,
    motion: Option<Motion>,
    awaiting_placement: bool,
}

impl Player {
    fn at_spawn(position: Vec3) -> Self {
        Self {
            position,
            branch: None,
            motion: None,
            awaiting_placement: true,
        }
    }

    fn airborne(&self) -> bool {
        self.motion.is_some()
    }
}

/// Represents the authoritative Branch Hop world state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    clock: Duration,
    time_scale: f32,
    tick_index: u64,
    spawn_point: Vec3,
    flight: FlightTuning,
    respawn: RespawnTuning,
    track: TrackWindow,
    player: Player,
    respawn_sequence: Option<RespawnSequence>,
    session: Session,
}

impl World {
    /// Creates a new Branch Hop world with an empty track, ready for streaming.
    #[must_use]
    pub fn new() -> Self {
        Self {
            banner: WELCOME_BANNER,
            clock: Duration::ZERO,
            time_scale: 1.0,
            tick_index: 0,
            spawn_point: DEFAULT_SPAWN_POINT,
            flight: FlightTuning {
                landing_tolerance: DEFAULT_LANDING_TOLERANCE,
                max_flight: DEFAULT_MAX_FLIGHT,
                fall_gravity: DEFAULT_FALL_GRAVITY,
            },
            respawn: RespawnTuning {
                delay: DEFAULT_RESPAWN_DELAY,
                fade_gated: false,
            },
            track: TrackWindow::default(),
            player: Player::at_spawn(DEFAULT_SPAWN_POINT),
            respawn_sequence: None,
            session: Session::new(),
        }
    }

    fn scaled(&self, dt: Duration) -> Duration {
        if self.time_scale <= 0.0 {
            Duration::ZERO
        } else if (self.time_scale - 1.0).abs() < f32::EPSILON {
            dt
        } else {
            dt.mul_f32(self.time_scale)
        }
    }

    fn reject(reason: RejectionReason, out_events: &mut Vec<Event>) {
        debug!(?reason, "command rejected");
        out_events.push(Event::CommandRejected { reason });
    }

    fn advance_motion(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if dt.is_zero() {
            return;
        }
        let seconds = dt.as_secs_f32();

        let status = match self.player.motion.as_mut() {
            Some(Motion::Flight(flight)) => flight.update(&mut self.player.position, seconds),
            Some(Motion::Fall(fall)) => fall.update(&mut self.player.position, seconds),
            None => return,
        };

        if status == TaskStatus::Done {
            if let Some(Motion::Flight(flight)) = self.player.motion.take() {
                self.land(flight, out_events);
            }
        }
    }

    fn land(&mut self, flight: Flight, out_events: &mut Vec<Event>) {
        self.player.position = flight.destination;
        self.player.branch = Some(flight.to);
        debug!(branch = flight.to.get(), grade = ?flight.grade, "flight landed");

        self.session.record_jump(flight.grade, out_events);
        out_events.push(Event::PlayerLanded {
            branch: flight.to,
            at: self.clock,
            grace: self.session.take_grace(),
        });
    }

    fn advance_respawn(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if self.session.state() == PlayState::Paused {
            return;
        }
        let Some(sequence) = self.respawn_sequence.as_mut() else {
            return;
        };
        if sequence.update(dt) == TaskStatus::Continue {
            return;
        }

        if self.session.state() != PlayState::Playing {
            debug!("respawn skipped because the game is over");
            self.respawn_sequence = None;
            return;
        }

        if self.respawn.fade_gated {
            *sequence = RespawnSequence::AwaitingFade;
            out_events.push(Event::FadeRequested);
        } else {
            self.respawn_sequence = None;
            self.reload_level(true, out_events);
        }
    }

    fn reload_level(&mut self, grace: bool, out_events: &mut Vec<Event>) {
        self.track.clear();
        self.player = Player::at_spawn(self.spawn_point);
        if grace {
            self.session.arm_grace();
        }
        info!(grace, "level reloaded");
        out_events.push(Event::LevelReloaded {
            grace_armed: self.session.grace_armed(),
        });
    }

    fn spawn_branch(&mut self, position: Vec3, focus: Option<Vec3>, out_events: &mut Vec<Event>) {
        let branch = match self.track.push(position, focus) {
            Ok(branch) => branch,
            Err(reason) => return Self::reject(reason, out_events),
        };
        out_events.push(Event::BranchSpawned { branch, position });

        if self.player.awaiting_placement && !self.player.airborne() {
            self.player.awaiting_placement = false;
            self.player.position = position;
            self.player.branch = Some(branch);
            out_events.push(Event::PlayerLanded {
                branch,
                at: self.clock,
                grace: self.session.take_grace(),
            });
        }
    }

    fn recycle_branch(&mut self, branch: BranchId, out_events: &mut Vec<Event>) {
        let occupied = self.player.branch == Some(branch)
            || matches!(&self.player.motion, Some(Motion::Flight(flight)) if flight.to == branch);
        if occupied && self.track.oldest().map(|oldest| oldest.id) == Some(branch) {
            return Self::reject(RejectionReason::BranchOccupied, out_events);
        }

        match self.track.pop_oldest(branch) {
            Ok(()) => out_events.push(Event::BranchRecycled { branch }),
            Err(reason) => Self::reject(reason, out_events),
        }
    }

    fn launch(
        &mut self,
        from: BranchId,
        to: BranchId,
        grade: TimingGrade,
        trajectory: Trajectory,
        out_events: &mut Vec<Event>,
    ) {
        if self.session.state() != PlayState::Playing {
            return Self::reject(RejectionReason::NotPlaying, out_events);
        }
        if self.player.airborne() {
            return Self::reject(RejectionReason::Reentrancy, out_events);
        }
        if self.player.branch != Some(from) {
            return Self::reject(RejectionReason::NotGrounded, out_events);
        }
        let (Some(source), Some(target)) = (self.track.get(from), self.track.get(to)) else {
            return Self::reject(RejectionReason::UnknownBranch, out_events);
        };
        if target.position.z <= source.position.z {
            return Self::reject(RejectionReason::BackwardLink, out_events);
        }

        let destination = target.position;
        self.player.branch = None;
        self.player.motion = Some(Motion::Flight(Flight::new(
            to,
            grade,
            self.player.position,
            destination,
            trajectory,
            self.flight.landing_tolerance,
            self.flight.max_flight,
        )));

        debug!(from = from.get(), to = to.get(), ?grade, "jump committed");
        out_events.push(Event::JumpCommitted { from, to, grade });
        out_events.push(Event::CueRequested { cue: grade.cue() });
    }

    fn fall(&mut self, reason: MissReason, out_events: &mut Vec<Event>) {
        if self.session.state() != PlayState::Playing {
            return Self::reject(RejectionReason::NotPlaying, out_events);
        }
        if self.player.airborne() {
            return Self::reject(RejectionReason::Reentrancy, out_events);
        }
        if self.player.branch.is_none() {
            return Self::reject(RejectionReason::NotGrounded, out_events);
        }

        self.player.branch = None;
        self.player.motion = Some(Motion::Fall(Fall::new(self.flight.fall_gravity)));
        debug!(?reason, "player missed");
        out_events.push(Event::PlayerMissed { reason });
        out_events.push(Event::CueRequested { cue: reason.cue() });

        self.session.miss(out_events);
        if self.session.state() == PlayState::Failed {
            self.time_scale = 0.0;
        }
        self.respawn_sequence = Some(RespawnSequence::Countdown {
            remaining: self.respawn.delay,
        });
    }

    fn set_paused(&mut self, paused: bool, out_events: &mut Vec<Event>) {
        match (self.session.state(), paused) {
            (PlayState::Playing, true) => {
                self.time_scale = 0.0;
                self.session.set_state(PlayState::Paused, out_events);
            }
            (PlayState::Paused, false) => {
                self.time_scale = 1.0;
                self.session.set_state(PlayState::Playing, out_events);
            }
            (PlayState::Failed, _) => Self::reject(RejectionReason::NotPlaying, out_events),
            _ => {}
        }
    }

    fn configure_progress(
        &mut self,
        lives: u32,
        win_jumps: u32,
        perfect_points: u32,
        good_points: u32,
        out_events: &mut Vec<Event>,
    ) {
        let previous = self.session.state();
        let mid_game = previous != PlayState::Playing
            || self.respawn_sequence.is_some()
            || self.player.airborne();
        self.session
            .configure(lives, win_jumps, perfect_points, good_points);

        if mid_game {
            self.begin_session(previous, out_events);
        } else {
            self.time_scale = 1.0;
            out_events.push(Event::LivesChanged { lives });
        }
    }

    fn restart(&mut self, out_events: &mut Vec<Event>) {
        let previous = self.session.state();
        self.session.reset();
        self.begin_session(previous, out_events);
    }

    /// Clears every leftover of the previous session and reloads the level.
    fn begin_session(&mut self, previous: PlayState, out_events: &mut Vec<Event>) {
        self.time_scale = 1.0;
        self.respawn_sequence = None;
        if previous != PlayState::Playing {
            out_events.push(Event::PlayStateChanged {
                state: PlayState::Playing,
            });
        }

        let progress = self.session.snapshot();
        out_events.push(Event::LivesChanged {
            lives: progress.lives,
        });
        out_events.push(Event::ScoreChanged {
            score: progress.score,
            jumps: progress.jumps,
        });
        self.reload_level(false, out_events);
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureProgress {
            lives,
            win_jumps,
            perfect_points,
            good_points,
        } => world.configure_progress(lives, win_jumps, perfect_points, good_points, out_events),
        Command::ConfigureFlight {
            landing_tolerance,
            max_flight,
            fall_gravity,
        } => {
            world.flight = FlightTuning {
                landing_tolerance,
                max_flight,
                fall_gravity,
            };
        }
        Command::ConfigureRespawn { delay, fade_gated } => {
            world.respawn = RespawnTuning { delay, fade_gated };
        }
        Command::ConfigureSpawnPoint { position } => {
            world.spawn_point = position;
            if world.player.awaiting_placement {
                world.player.position = position;
            }
        }
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            let scaled = world.scaled(dt);
            world.clock = world.clock.saturating_add(scaled);
            out_events.push(Event::TimeAdvanced {
                dt: scaled,
                now: world.clock,
            });

            world.advance_motion(scaled, out_events);
            world.advance_respawn(dt, out_events);
        }
        Command::SpawnBranch { position, focus } => {
            world.spawn_branch(position, focus, out_events);
        }
        Command::RecycleBranch { branch } => world.recycle_branch(branch, out_events),
        Command::LinkBranch { from, to } => match world.track.link(from, to) {
            Ok(()) => out_events.push(Event::BranchLinked { from, to }),
            Err(reason) => World::reject(reason, out_events),
        },
        Command::Launch {
            from,
            to,
            grade,
            trajectory,
        } => world.launch(from, to, grade, trajectory, out_events),
        Command::Fall { reason } => world.fall(reason, out_events),
        Command::CompleteFade => {
            if world.respawn_sequence == Some(RespawnSequence::AwaitingFade) {
                world.respawn_sequence = None;
                if world.session.state() == PlayState::Playing {
                    world.reload_level(true, out_events);
                }
            } else {
                World::reject(RejectionReason::NoFadePending, out_events);
            }
        }
        Command::SetPaused { paused } => world.set_paused(paused, out_events),
        Command::Restart => world.restart(out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use branch_hop_core::{PlayState, PlayerSnapshot, ProgressSnapshot, TrackView};

    use super::{
        motion::{Motion, RespawnSequence},
        World,
    };

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Current simulation clock. The clock stops while the game is paused or failed.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.clock
    }

    /// Number of ticks processed since the world was created.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Multiplier applied to tick durations before they reach the simulation clock.
    #[must_use]
    pub fn time_scale(world: &World) -> f32 {
        world.time_scale
    }

    /// Current game state.
    #[must_use]
    pub fn play_state(world: &World) -> PlayState {
        world.session.state()
    }

    /// Captures a read-only view of the live track window.
    #[must_use]
    pub fn track_view(world: &World) -> TrackView {
        world.track.view()
    }

    /// Number of live branches.
    #[must_use]
    pub fn branch_count(world: &World) -> usize {
        world.track.len()
    }

    /// Captures the player body state.
    #[must_use]
    pub fn player(world: &World) -> PlayerSnapshot {
        PlayerSnapshot {
            position: world.player.position,
            branch: world.player.branch,
            airborne: world.player.airborne(),
            destination: match &world.player.motion {
                Some(Motion::Flight(flight)) => Some(flight.to),
                _ => None,
            },
        }
    }

    /// Captures the session counters.
    #[must_use]
    pub fn progress(world: &World) -> ProgressSnapshot {
        world.session.snapshot()
    }

    /// Reports whether a level reload is waiting for the fade collaborator.
    #[must_use]
    pub fn fade_pending(world: &World) -> bool {
        world.respawn_sequence == Some(RespawnSequence::AwaitingFade)
    }

    /// Reports whether a respawn countdown or fade is in progress.
    #[must_use]
    pub fn respawn_pending(world: &World) -> bool {
        world.respawn_sequence.is_some()
    }
}
