use std::time::Duration;

use branch_hop_core::Event;

/// Scripted player that presses a fixed delay after every landing.
#[derive(Clone, Copy, Debug)]
pub struct Autopilot {
    offset: Duration,
    landed_at: Option<Duration>,
}

impl Autopilot {
    /// Creates an autopilot pressing `offset` after each landing.
    #[must_use]
    pub const fn new(offset: Duration) -> Self {
        Self {
            offset,
            landed_at: None,
        }
    }

    /// Delay between a landing and the press.
    #[must_use]
    pub const fn offset(&self) -> Duration {
        self.offset
    }

    /// Tracks landings and the commitments that end them.
    pub fn observe(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::PlayerLanded { at, .. } => self.landed_at = Some(*at),
                Event::JumpCommitted { .. }
                | Event::PlayerMissed { .. }
                | Event::LevelReloaded { .. } => self.landed_at = None,
                _ => {}
            }
        }
    }

    /// Reports whether the press should be held at simulation time `now`.
    ///
    /// The press repeats every frame until the world reports the outcome.
    #[must_use]
    pub fn wants_press(&self, now: Duration) -> bool {
        self.landed_at
            .is_some_and(|landed_at| now.saturating_sub(landed_at) >= self.offset)
    }
}

#[cfg(test)]
mod tests {
    use branch_hop_core::{BranchId, TimingGrade};

    use super::*;

    #[test]
    fn presses_after_offset_until_committed() {
        let mut autopilot = Autopilot::new(Duration::from_millis(40));
        autopilot.observe(&[Event::PlayerLanded {
            branch: BranchId::new(0),
            at: Duration::from_millis(100),
            grace: false,
        }]);

        assert!(!autopilot.wants_press(Duration::from_millis(139)));
        assert!(autopilot.wants_press(Duration::from_millis(140)));
        assert!(autopilot.wants_press(Duration::from_millis(156)));

        autopilot.observe(&[Event::JumpCommitted {
            from: BranchId::new(0),
            to: BranchId::new(1),
            grade: TimingGrade::Perfect,
        }]);
        assert!(!autopilot.wants_press(Duration::from_millis(200)));
    }
}
