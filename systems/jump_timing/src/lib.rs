#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Jump timing state machine.
//!
//! The system learns about landings from [`Event::PlayerLanded`], grades the
//! single press input against the timing windows, and answers with either a
//! [`Command::Launch`] toward the resolved destination or a [`Command::Fall`].
//! Flights themselves are integrated by the world.

use std::time::Duration;

use branch_hop_core::{
    BranchId, BranchSnapshot, Command, Event, MissReason, PlayState, TimingGrade, TrackView,
    Trajectory,
};
use glam::Vec3;
use tracing::debug;

/// Shortest horizontal distance used when deriving the flight time.
const MIN_HORIZONTAL_DISTANCE: f32 = 0.1;

/// Shape of the arc flown between two branches.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ArcModel {
    /// Closed-form launch velocity under constant gravity.
    Ballistic,
    /// Normalised-time interpolation lifted by a fixed bump.
    Parabolic {
        /// Peak height of the bump above the straight line.
        arc_height: f32,
    },
}

/// Configuration parameters required to construct the jump timing system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Presses up to this long after landing are perfect. Inclusive.
    pub perfect_window: Duration,
    /// Presses up to this long after landing are good. Inclusive.
    pub good_window: Duration,
    /// Presses sooner than this after landing are punished as too early.
    /// Zero disables the check.
    pub early_reject: Duration,
    /// Horizontal speed used to derive flight time from distance.
    pub max_horizontal_speed: f32,
    /// Shortest allowed flight.
    pub min_air_time: Duration,
    /// Longest allowed flight.
    pub max_air_time: Duration,
    /// Downward acceleration used by ballistic arcs.
    pub gravity: f32,
    /// Arc model used for every jump.
    pub arc: ArcModel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            perfect_window: Duration::from_millis(80),
            good_window: Duration::from_millis(160),
            early_reject: Duration::ZERO,
            max_horizontal_speed: 10.0,
            min_air_time: Duration::from_millis(350),
            max_air_time: Duration::from_millis(650),
            gravity: 25.0,
            arc: ArcModel::Ballistic,
        }
    }
}

/// Observable state of the jump timing machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JumpPhase {
    /// No landing has been reported since the level loaded or the last miss.
    Idle,
    /// Standing on a branch, waiting for a press inside the timing windows.
    Waiting {
        /// Branch the player stands on.
        branch: BranchId,
        /// Simulation time of the landing.
        landed_at: Duration,
    },
    /// Standing on a branch after a respawn; any press jumps and nothing times out.
    Grace {
        /// Branch the player stands on.
        branch: BranchId,
        /// Simulation time of the landing.
        landed_at: Duration,
    },
    /// Launch or fall requested, awaiting the world's confirmation.
    Committing {
        /// Phase to return to if the world refuses the request.
        branch: BranchId,
        /// Landing time of the phase being left.
        landed_at: Duration,
        /// Whether the phase being left was a grace landing.
        grace: bool,
    },
    /// A flight or fall is in progress.
    Airborne,
}

/// Pure system that grades presses and commits jumps.
#[derive(Debug)]
pub struct JumpTiming {
    config: Config,
    phase: JumpPhase,
}

impl JumpTiming {
    /// Creates a new jump timing system.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            phase: JumpPhase::Idle,
        }
    }

    /// Configuration the system was built with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Current phase of the state machine.
    #[must_use]
    pub const fn phase(&self) -> JumpPhase {
        self.phase
    }

    /// Consumes world events, the press input of the current tick and the
    /// track view to emit launch or fall commands.
    ///
    /// Nothing is emitted unless the game is playing.
    pub fn handle(
        &mut self,
        events: &[Event],
        pressed: bool,
        play_state: PlayState,
        track: &TrackView,
        now: Duration,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            self.observe(event);
        }

        if play_state != PlayState::Playing {
            return;
        }

        match self.phase {
            JumpPhase::Waiting { branch, landed_at } => {
                let elapsed = now.saturating_sub(landed_at);
                if pressed {
                    match self.classify(elapsed) {
                        Ok(grade) => self.commit(branch, landed_at, false, grade, track, out),
                        Err(reason) => self.miss(branch, landed_at, false, reason, out),
                    }
                } else if elapsed > self.config.good_window {
                    self.miss(branch, landed_at, false, MissReason::Timeout, out);
                }
            }
            JumpPhase::Grace { branch, landed_at } => {
                if pressed {
                    let elapsed = now.saturating_sub(landed_at);
                    let grade = self.classify(elapsed).unwrap_or(TimingGrade::Good);
                    self.commit(branch, landed_at, true, grade, track, out);
                }
            }
            JumpPhase::Idle | JumpPhase::Committing { .. } | JumpPhase::Airborne => {}
        }
    }

    /// Grades the delay between a landing and a press.
    ///
    /// Both window bounds are inclusive.
    pub fn classify(&self, elapsed: Duration) -> Result<TimingGrade, MissReason> {
        if elapsed < self.config.early_reject {
            Err(MissReason::TooEarly)
        } else if elapsed <= self.config.perfect_window {
            Ok(TimingGrade::Perfect)
        } else if elapsed <= self.config.good_window {
            Ok(TimingGrade::Good)
        } else {
            Err(MissReason::TooLate)
        }
    }

    /// Computes the trajectory between two landing points.
    ///
    /// Flight time is the horizontal distance over the maximum horizontal
    /// speed, clamped to the configured air-time range.
    #[must_use]
    pub fn solve_trajectory(&self, start: Vec3, end: Vec3) -> Trajectory {
        let displacement = end - start;
        let horizontal = Vec3::new(displacement.x, 0.0, displacement.z)
            .length()
            .max(MIN_HORIZONTAL_DISTANCE);
        let speed = self.config.max_horizontal_speed.max(f32::EPSILON);
        let min = self.config.min_air_time.as_secs_f32();
        let max = self.config.max_air_time.as_secs_f32().max(min);
        let air_time = (horizontal / speed).clamp(min, max).max(f32::EPSILON);

        match self.config.arc {
            ArcModel::Ballistic => {
                let gravity = self.config.gravity;
                Trajectory::Ballistic {
                    velocity: Vec3::new(
                        displacement.x / air_time,
                        (displacement.y + 0.5 * gravity * air_time * air_time) / air_time,
                        displacement.z / air_time,
                    ),
                    gravity,
                    air_time: Duration::from_secs_f32(air_time),
                }
            }
            ArcModel::Parabolic { arc_height } => Trajectory::Parabolic {
                arc_height,
                air_time: Duration::from_secs_f32(air_time),
            },
        }
    }

    fn observe(&mut self, event: &Event) {
        match *event {
            Event::PlayerLanded {
                branch,
                at,
                grace,
            } => {
                self.phase = if grace {
                    JumpPhase::Grace {
                        branch,
                        landed_at: at,
                    }
                } else {
                    JumpPhase::Waiting {
                        branch,
                        landed_at: at,
                    }
                };
            }
            Event::JumpCommitted { .. } | Event::PlayerMissed { .. } => {
                self.phase = JumpPhase::Airborne;
            }
            Event::LevelReloaded { .. } => self.phase = JumpPhase::Idle,
            Event::CommandRejected { reason } => {
                if let JumpPhase::Committing {
                    branch,
                    landed_at,
                    grace,
                } = self.phase
                {
                    debug!(?reason, "commitment refused, resuming wait");
                    self.phase = if grace {
                        JumpPhase::Grace { branch, landed_at }
                    } else {
                        JumpPhase::Waiting { branch, landed_at }
                    };
                }
            }
            _ => {}
        }
    }

    fn commit(
        &mut self,
        branch: BranchId,
        landed_at: Duration,
        grace: bool,
        grade: TimingGrade,
        track: &TrackView,
        out: &mut Vec<Command>,
    ) {
        let Some(current) = track.get(branch) else {
            return self.miss(
                branch,
                landed_at,
                grace,
                MissReason::UnresolvedDestination,
                out,
            );
        };

        let Some(destination) = resolve_destination(current, track, out) else {
            debug!(branch = branch.get(), "no branch ahead to jump to");
            return self.miss(
                branch,
                landed_at,
                grace,
                MissReason::UnresolvedDestination,
                out,
            );
        };

        debug!(
            from = branch.get(),
            to = destination.id.get(),
            ?grade,
            grace,
            "committing jump"
        );
        out.push(Command::Launch {
            from: branch,
            to: destination.id,
            grade,
            trajectory: self.solve_trajectory(current.position, destination.position),
        });
        self.phase = JumpPhase::Committing {
            branch,
            landed_at,
            grace,
        };
    }

    fn miss(
        &mut self,
        branch: BranchId,
        landed_at: Duration,
        grace: bool,
        reason: MissReason,
        out: &mut Vec<Command>,
    ) {
        debug!(?reason, "jump missed");
        out.push(Command::Fall { reason });
        self.phase = JumpPhase::Committing {
            branch,
            landed_at,
            grace,
        };
    }
}

/// Follows the successor link, falling back to the nearest branch ahead.
/// Adopting a fallback emits a link command so later queries agree with it.
fn resolve_destination<'track>(
    current: &BranchSnapshot,
    track: &'track TrackView,
    out: &mut Vec<Command>,
) -> Option<&'track BranchSnapshot> {
    if let Some(next) = current.next.and_then(|next| track.get(next)) {
        return Some(next);
    }

    let fallback = track.nearest_ahead(current.position.z)?;
    if current.next.is_none() {
        out.push(Command::LinkBranch {
            from: current.id,
            to: fallback.id,
        });
    }
    Some(fallback)
}
