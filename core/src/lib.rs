#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Branch Hop engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to deterministically. Systems consume event streams,
//! query immutable snapshots such as [`TrackView`], and respond exclusively
//! with new command batches.

use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Branch Hop.";

/// Describes the high-level state of the running game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayState {
    /// Simulation advances and the jump system accepts input.
    Playing,
    /// Terminal state entered once every life was spent. Simulation time is frozen.
    Failed,
    /// Simulation time is frozen until play resumes.
    Paused,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Configures the session counters used by the progress tracker.
    ConfigureProgress {
        /// Lives granted to a fresh session.
        lives: u32,
        /// Jump count that triggers the win notification.
        win_jumps: u32,
        /// Points awarded for a landing that followed a perfect press.
        perfect_points: u32,
        /// Points awarded for a landing that followed a good press.
        good_points: u32,
    },
    /// Configures how flights and falls are integrated.
    ConfigureFlight {
        /// Distance from the destination at which a descending flight lands.
        landing_tolerance: f32,
        /// Upper bound on the duration of any single flight.
        max_flight: Duration,
        /// Downward acceleration applied while falling after a miss.
        fall_gravity: f32,
    },
    /// Configures the respawn sequence that follows a miss.
    ConfigureRespawn {
        /// Unscaled delay between the miss and the level reload.
        delay: Duration,
        /// Whether the reload waits for [`Command::CompleteFade`].
        fade_gated: bool,
    },
    /// Moves the point the player occupies while a freshly loaded level streams in.
    ConfigureSpawnPoint {
        /// World position of the spawn point.
        position: Vec3,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of real time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that a new branch be appended to the track window.
    SpawnBranch {
        /// Landing point of the new branch.
        position: Vec3,
        /// Point collaborators should look toward while the player stands on the branch.
        focus: Option<Vec3>,
    },
    /// Requests removal of the oldest branch in the track window.
    RecycleBranch {
        /// Identifier of the branch to remove.
        branch: BranchId,
    },
    /// Requests that a branch without a successor adopt the provided successor.
    LinkBranch {
        /// Branch whose successor is being assigned.
        from: BranchId,
        /// Branch that becomes the successor.
        to: BranchId,
    },
    /// Requests that the grounded player begin a flight toward another branch.
    Launch {
        /// Branch the player is leaving.
        from: BranchId,
        /// Branch the flight lands on.
        to: BranchId,
        /// Timing grade that earned the jump.
        grade: TimingGrade,
        /// Motion the world integrates until the flight lands.
        trajectory: Trajectory,
    },
    /// Requests that the grounded player fall after a missed jump.
    Fall {
        /// Reason the jump was missed.
        reason: MissReason,
    },
    /// Signals that the fade collaborator reached the point where the level may reload.
    CompleteFade,
    /// Requests that play be paused or resumed.
    SetPaused {
        /// Whether play should be paused.
        paused: bool,
    },
    /// Resets the session and reloads the level.
    Restart,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Scaled duration of simulated time that elapsed in the tick.
        dt: Duration,
        /// Simulation clock after the tick.
        now: Duration,
    },
    /// Confirms that a branch joined the track window.
    BranchSpawned {
        /// Identifier assigned to the branch.
        branch: BranchId,
        /// Landing point of the branch.
        position: Vec3,
    },
    /// Confirms that a branch left the track window.
    BranchRecycled {
        /// Identifier of the removed branch.
        branch: BranchId,
    },
    /// Confirms that a branch adopted a successor.
    BranchLinked {
        /// Branch whose successor was assigned.
        from: BranchId,
        /// Successor branch.
        to: BranchId,
    },
    /// Reports that the player is standing on a branch and awaits input.
    PlayerLanded {
        /// Branch the player occupies.
        branch: BranchId,
        /// Simulation time of the landing.
        at: Duration,
        /// Whether timing is relaxed for this landing.
        grace: bool,
    },
    /// Confirms that a flight started.
    JumpCommitted {
        /// Branch the player left.
        from: BranchId,
        /// Branch the flight lands on.
        to: BranchId,
        /// Timing grade that earned the jump.
        grade: TimingGrade,
    },
    /// Reports that the player missed and started falling.
    PlayerMissed {
        /// Reason the jump was missed.
        reason: MissReason,
    },
    /// Requests that the audio collaborator play a cue.
    CueRequested {
        /// Loudness and pitch of the cue.
        cue: Cue,
    },
    /// Reports the remaining lives after a change.
    LivesChanged {
        /// Lives left in the session.
        lives: u32,
    },
    /// Reports the score after a successful landing.
    ScoreChanged {
        /// Accumulated points.
        score: u32,
        /// Successful landings in the session.
        jumps: u32,
    },
    /// Announces that the game entered a new state.
    PlayStateChanged {
        /// State that became active.
        state: PlayState,
    },
    /// Announces that the session reached the winning jump count.
    WinReached {
        /// Jump count at the time of the win.
        jumps: u32,
    },
    /// Requests that the fade collaborator run and answer with [`Command::CompleteFade`].
    FadeRequested,
    /// Announces that the track was cleared and the player returned to the spawn point.
    LevelReloaded {
        /// Whether the next landing is relaxed.
        grace_armed: bool,
    },
    /// Reports that a command was ignored.
    CommandRejected {
        /// Reason the command was ignored.
        reason: RejectionReason,
    },
}

/// Unique identifier assigned to a branch. Identifiers are never reused.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BranchId(u32);

impl BranchId {
    /// Creates a new branch identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Quality of a press that earned a jump.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimingGrade {
    /// Press landed inside the perfect window.
    Perfect,
    /// Press landed after the perfect window but inside the good window, or a
    /// late press during grace.
    Good,
}

impl TimingGrade {
    /// Audio cue that accompanies a jump of this grade.
    #[must_use]
    pub const fn cue(self) -> Cue {
        match self {
            Self::Perfect => Cue::new(1.0, 1.2),
            Self::Good => Cue::new(0.8, 1.0),
        }
    }
}

/// Reasons the player may miss a jump.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissReason {
    /// Press arrived before the early-reject threshold.
    TooEarly,
    /// Press arrived after the good window closed.
    TooLate,
    /// No press arrived before the good window closed.
    Timeout,
    /// The occupied branch had no successor and nothing lay ahead.
    UnresolvedDestination,
}

impl MissReason {
    /// Audio cue that accompanies a miss.
    #[must_use]
    pub const fn cue(self) -> Cue {
        match self {
            Self::TooEarly | Self::TooLate => Cue::new(0.6, 0.7),
            Self::Timeout | Self::UnresolvedDestination => Cue::new(0.5, 0.6),
        }
    }
}

/// One-shot audio cue parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    intensity: f32,
    pitch: f32,
}

impl Cue {
    /// Creates a cue with the provided volume scale and pitch multiplier.
    #[must_use]
    pub const fn new(intensity: f32, pitch: f32) -> Self {
        Self { intensity, pitch }
    }

    /// Volume scale in the range 0.0..=1.0.
    #[must_use]
    pub const fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Pitch multiplier where 1.0 plays the clip unchanged.
    #[must_use]
    pub const fn pitch(&self) -> f32 {
        self.pitch
    }
}

/// Reasons the world may ignore a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionReason {
    /// A flight or fall is already in progress.
    Reentrancy,
    /// The player is not grounded on the branch named by the command.
    NotGrounded,
    /// The command referenced a branch that is not in the track window.
    UnknownBranch,
    /// Recycling must remove the oldest branch first.
    NotOldestBranch,
    /// The player still stands on the branch.
    BranchOccupied,
    /// Successors must lie strictly ahead of their predecessor.
    BackwardLink,
    /// The branch already has a successor.
    AlreadyLinked,
    /// The game is not in the state the command requires.
    NotPlaying,
    /// No fade is awaiting completion.
    NoFadePending,
    /// Every branch identifier has been handed out.
    IdentifiersExhausted,
}

/// Motion the world integrates while the player is in flight.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Trajectory {
    /// Projectile launched with an initial velocity under constant downward acceleration.
    Ballistic {
        /// Initial velocity in world units per second.
        velocity: Vec3,
        /// Downward acceleration in world units per second squared.
        gravity: f32,
        /// Time the arc needs to reach the destination.
        air_time: Duration,
    },
    /// Straight interpolation between both landing points lifted by a parabolic bump.
    Parabolic {
        /// Peak height of the bump above the straight line.
        arc_height: f32,
        /// Time the interpolation takes to complete.
        air_time: Duration,
    },
}

impl Trajectory {
    /// Time the trajectory needs to reach its destination.
    #[must_use]
    pub const fn air_time(&self) -> Duration {
        match self {
            Self::Ballistic { air_time, .. } | Self::Parabolic { air_time, .. } => *air_time,
        }
    }
}

/// Immutable representation of a single branch used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BranchSnapshot {
    /// Unique identifier assigned to the branch.
    pub id: BranchId,
    /// Landing point of the branch.
    pub position: Vec3,
    /// Point collaborators look toward while the player stands on the branch.
    pub focus: Option<Vec3>,
    /// Successor a correctly timed jump lands on.
    pub next: Option<BranchId>,
}

/// Read-only snapshot of the live track window in spawn order.
#[derive(Clone, Debug, Default)]
pub struct TrackView {
    snapshots: Vec<BranchSnapshot>,
}

impl TrackView {
    /// Creates a new track view from the provided snapshots.
    ///
    /// Identifiers grow monotonically with spawn order, so sorting by
    /// identifier restores the window order regardless of the input order.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<BranchSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured branches from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &BranchSnapshot> {
        self.snapshots.iter()
    }

    /// Number of live branches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the window holds no branches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Oldest live branch, the next candidate for recycling.
    #[must_use]
    pub fn oldest(&self) -> Option<&BranchSnapshot> {
        self.snapshots.first()
    }

    /// Most recently spawned branch.
    #[must_use]
    pub fn newest(&self) -> Option<&BranchSnapshot> {
        self.snapshots.last()
    }

    /// Looks up a live branch by identifier.
    #[must_use]
    pub fn get(&self, branch: BranchId) -> Option<&BranchSnapshot> {
        self.snapshots
            .binary_search_by_key(&branch, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Nearest live branch lying strictly ahead of the provided z coordinate.
    #[must_use]
    pub fn nearest_ahead(&self, z: f32) -> Option<&BranchSnapshot> {
        self.snapshots
            .iter()
            .filter(|snapshot| snapshot.position.z > z)
            .min_by(|left, right| left.position.z.total_cmp(&right.position.z))
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<BranchSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of the player body.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Current world position, suitable for camera following.
    pub position: Vec3,
    /// Branch the player stands on, if grounded.
    pub branch: Option<BranchId>,
    /// Whether a flight or fall is in progress.
    pub airborne: bool,
    /// Branch the current flight is headed for.
    pub destination: Option<BranchId>,
}

/// Immutable representation of the session counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Lives left in the session.
    pub lives: u32,
    /// Accumulated points.
    pub score: u32,
    /// Successful landings in the session.
    pub jumps: u32,
    /// Current game state.
    pub state: PlayState,
}
