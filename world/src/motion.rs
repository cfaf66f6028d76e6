use std::time::Duration;

use branch_hop_core::{BranchId, TimingGrade, Trajectory};
use glam::Vec3;

/// Outcome of advancing a resumable task by one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TaskStatus {
    Continue,
    Done,
}

/// Occupant of the player's motion slot. Storing a new value replaces any
/// motion in progress, so the slot holds at most one trajectory.
#[derive(Clone, Debug)]
pub(crate) enum Motion {
    Flight(Flight),
    Fall(Fall),
}

#[derive(Clone, Debug)]
pub(crate) struct Flight {
    pub(crate) to: BranchId,
    pub(crate) grade: TimingGrade,
    pub(crate) destination: Vec3,
    start: Vec3,
    trajectory: Trajectory,
    velocity: Vec3,
    elapsed: f32,
    landing_tolerance: f32,
    max_flight: f32,
}

impl Flight {
    pub(crate) fn new(
        to: BranchId,
        grade: TimingGrade,
        start: Vec3,
        destination: Vec3,
        trajectory: Trajectory,
        landing_tolerance: f32,
        max_flight: Duration,
    ) -> Self {
        let velocity = match trajectory {
            Trajectory::Ballistic { velocity, .. } => velocity,
            Trajectory::Parabolic { .. } => Vec3::ZERO,
        };

        Self {
            to,
            grade,
            destination,
            start,
            trajectory,
            velocity,
            elapsed: 0.0,
            landing_tolerance,
            max_flight: max_flight.as_secs_f32(),
        }
    }

    /// Moves `position` along the trajectory. Reports [`TaskStatus::Done`]
    /// once the destination is reached, a descending ballistic arc has used
    /// up its air time, or the flight-time bound elapses;
    /// the caller snaps the body onto the destination afterwards.
    pub(crate) fn update(&mut self, position: &mut Vec3, dt: f32) -> TaskStatus {
        self.elapsed += dt;

        let arrived = match self.trajectory {
            Trajectory::Ballistic {
                gravity, air_time, ..
            } => {
                self.velocity.y -= gravity * dt;
                *position += self.velocity * dt;
                let descending = self.velocity.y <= 0.0;
                let near = position.distance(self.destination) < self.landing_tolerance;
                descending && (near || self.elapsed >= air_time.as_secs_f32())
            }
            Trajectory::Parabolic {
                arc_height,
                air_time,
            } => {
                let air_time = air_time.as_secs_f32();
                let progress = if air_time > 0.0 {
                    (self.elapsed / air_time).min(1.0)
                } else {
                    1.0
                };
                let lift = 4.0 * arc_height * progress * (1.0 - progress);
                *position = self.start.lerp(self.destination, progress) + Vec3::Y * lift;
                progress >= 1.0
            }
        };

        if arrived || self.elapsed >= self.max_flight {
            TaskStatus::Done
        } else {
            TaskStatus::Continue
        }
    }
}

/// Uncontrolled drop after a miss. It never completes on its own; the level
/// reload that follows the miss clears it.
#[derive(Clone, Debug)]
pub(crate) struct Fall {
    velocity: Vec3,
    gravity: f32,
}

impl Fall {
    pub(crate) fn new(gravity: f32) -> Self {
        Self {
            velocity: Vec3::NEG_Y * 0.1,
            gravity,
        }
    }

    pub(crate) fn update(&mut self, position: &mut Vec3, dt: f32) -> TaskStatus {
        self.velocity.y -= self.gravity * dt;
        *position += self.velocity * dt;
        TaskStatus::Continue
    }
}

/// Delayed level reload that follows a miss.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RespawnSequence {
    Countdown { remaining: Duration },
    AwaitingFade,
}

impl RespawnSequence {
    /// Counts down on unscaled time. The countdown reports completion once;
    /// awaiting a fade never completes here.
    pub(crate) fn update(&mut self, dt: Duration) -> TaskStatus {
        match self {
            Self::Countdown { remaining } => {
                *remaining = remaining.saturating_sub(dt);
                if remaining.is_zero() {
                    TaskStatus::Done
                } else {
                    TaskStatus::Continue
                }
            }
            Self::AwaitingFade => TaskStatus::Continue,
        }
    }
}
