use branch_hop_core::{Event, PlayState, ProgressSnapshot, TimingGrade};
use tracing::info;

pub(crate) const DEFAULT_LIVES: u32 = 10;
pub(crate) const DEFAULT_WIN_JUMPS: u32 = 50;
pub(crate) const DEFAULT_PERFECT_POINTS: u32 = 2;
pub(crate) const DEFAULT_GOOD_POINTS: u32 = 1;

/// Progress that survives level reloads. Only a restart resets it.
#[derive(Debug)]
pub(crate) struct Session {
    starting_lives: u32,
    win_jumps: u32,
    perfect_points: u32,
    good_points: u32,
    lives: u32,
    score: u32,
    jumps: u32,
    state: PlayState,
    pending_grace: bool,
    win_announced: bool,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self {
            starting_lives: DEFAULT_LIVES,
            win_jumps: DEFAULT_WIN_JUMPS,
            perfect_points: DEFAULT_PERFECT_POINTS,
            good_points: DEFAULT_GOOD_POINTS,
            lives: DEFAULT_LIVES,
            score: 0,
            jumps: 0,
            state: PlayState::Playing,
            pending_grace: false,
            win_announced: false,
        }
    }

    pub(crate) fn configure(
        &mut self,
        lives: u32,
        win_jumps: u32,
        perfect_points: u32,
        good_points: u32,
    ) {
        self.starting_lives = lives;
        self.win_jumps = win_jumps;
        self.perfect_points = perfect_points;
        self.good_points = good_points;
        self.reset();
    }

    /// Returns every counter to the values of a fresh session.
    pub(crate) fn reset(&mut self) {
        self.lives = self.starting_lives;
        self.score = 0;
        self.jumps = 0;
        self.state = PlayState::Playing;
        self.pending_grace = false;
        self.win_announced = false;
    }

    pub(crate) const fn state(&self) -> PlayState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: PlayState, out_events: &mut Vec<Event>) {
        if self.state == state {
            return;
        }
        info!(from = ?self.state, to = ?state, "play state changed");
        self.state = state;
        out_events.push(Event::PlayStateChanged { state });
    }

    /// Adds points to the score. Ignored unless playing.
    pub(crate) fn add_score(&mut self, points: u32) -> bool {
        if self.state != PlayState::Playing {
            return false;
        }
        self.score = self.score.saturating_add(points);
        true
    }

    /// Counts a successful landing and awards the points for its grade.
    pub(crate) fn record_jump(&mut self, grade: TimingGrade, out_events: &mut Vec<Event>) {
        let points = match grade {
            TimingGrade::Perfect => self.perfect_points,
            TimingGrade::Good => self.good_points,
        };
        if !self.add_score(points) {
            return;
        }

        self.jumps = self.jumps.saturating_add(1);
        out_events.push(Event::ScoreChanged {
            score: self.score,
            jumps: self.jumps,
        });

        if !self.win_announced && self.win_jumps > 0 && self.jumps >= self.win_jumps {
            self.win_announced = true;
            info!(jumps = self.jumps, "win threshold reached");
            out_events.push(Event::WinReached { jumps: self.jumps });
        }
    }

    /// Spends a life. Ignored unless playing. Spending the last life fails the game.
    pub(crate) fn miss(&mut self, out_events: &mut Vec<Event>) {
        if self.state != PlayState::Playing {
            return;
        }

        self.lives = self.lives.saturating_sub(1);
        out_events.push(Event::LivesChanged { lives: self.lives });

        if self.lives == 0 {
            self.set_state(PlayState::Failed, out_events);
        }
    }

    pub(crate) fn arm_grace(&mut self) {
        self.pending_grace = true;
    }

    pub(crate) const fn grace_armed(&self) -> bool {
        self.pending_grace
    }

    /// Consumes the one-shot grace flag.
    pub(crate) fn take_grace(&mut self) -> bool {
        std::mem::replace(&mut self.pending_grace, false)
    }

    pub(crate) const fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            lives: self.lives,
            score: self.score,
            jumps: self.jumps,
            state: self.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn third_miss_of_three_fails_the_game() {
        let mut session = Session::new();
        session.configure(3, 50, 2, 1);
        let mut events = Vec::new();

        session.miss(&mut events);
        session.miss(&mut events);
        assert_eq!(session.state(), PlayState::Playing);
        session.miss(&mut events);
        assert_eq!(session.state(), PlayState::Failed);
        assert_eq!(
            events.last(),
            Some(&Event::PlayStateChanged {
                state: PlayState::Failed
            })
        );

        events.clear();
        session.miss(&mut events);
        assert!(events.is_empty(), "misses after failing are ignored");
    }

    #[test]
    fn score_is_frozen_outside_play() {
        let mut session = Session::new();
        let mut events = Vec::new();
        session.set_state(PlayState::Paused, &mut events);
        assert!(!session.add_score(5));
        session.record_jump(TimingGrade::Perfect, &mut events);
        assert_eq!(session.snapshot().score, 0);
        assert_eq!(session.snapshot().jumps, 0);
    }

    #[test]
    fn win_is_announced_once() {
        let mut session = Session::new();
        session.configure(3, 2, 2, 1);
        let mut events = Vec::new();
        for _ in 0..4 {
            session.record_jump(TimingGrade::Good, &mut events);
        }
        let wins = events
            .iter()
            .filter(|event| matches!(event, Event::WinReached { .. }))
            .count();
        assert_eq!(wins, 1);
        assert_eq!(session.snapshot().score, 4);
    }
}
