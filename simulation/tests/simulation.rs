use std::time::Duration;

use branch_hop_core::{Event, MissReason, PlayState, RejectionReason, TimingGrade};
use branch_hop_simulation::{
    Autopilot, FrameInput, ProgressConfig, RespawnConfig, Simulation, SimulationConfig,
};
use branch_hop_system_jump_timing::JumpPhase;
use branch_hop_system_track_generation::Config as TrackConfig;
use branch_hop_world::query;

const FRAME: Duration = Duration::from_millis(16);

fn idle(simulation: &mut Simulation, frames: usize, log: &mut Vec<Event>) {
    for _ in 0..frames {
        log.extend(simulation.step(FRAME, FrameInput::default()));
    }
}

fn autopilot_run(simulation: &mut Simulation, frames: usize) -> Vec<Event> {
    let mut autopilot = Autopilot::new(Duration::from_millis(40));
    let mut log = Vec::new();
    for _ in 0..frames {
        let pressed = autopilot.wants_press(simulation.clock() + FRAME);
        let events = simulation.step(FRAME, FrameInput { pressed });
        autopilot.observe(&events);
        log.extend(events);
    }
    log
}

fn count(log: &[Event], predicate: impl Fn(&Event) -> bool) -> usize {
    log.iter().filter(|event| predicate(event)).count()
}

#[test]
fn session_starts_on_the_first_branch() {
    let simulation = Simulation::default();
    let track = simulation.track();
    assert_eq!(track.len(), 30);
    assert_eq!(simulation.player().branch, track.oldest().map(|b| b.id));
    assert!(matches!(
        simulation.jump_phase(),
        JumpPhase::Waiting { landed_at, .. } if landed_at == Duration::ZERO
    ));
}

#[test]
fn third_consecutive_miss_fails_the_game() {
    let mut simulation = Simulation::new(SimulationConfig {
        progress: ProgressConfig {
            lives: 3,
            ..ProgressConfig::default()
        },
        ..SimulationConfig::default()
    });

    let mut misses = 0;
    let mut failed_on = None;
    for _ in 0..2_000 {
        let pressed = matches!(simulation.jump_phase(), JumpPhase::Grace { .. });
        let events = simulation.step(FRAME, FrameInput { pressed });
        for event in &events {
            match event {
                Event::PlayerMissed { reason } => {
                    assert_eq!(*reason, MissReason::Timeout);
                    misses += 1;
                }
                Event::PlayStateChanged {
                    state: PlayState::Failed,
                } => failed_on = Some(misses),
                _ => {}
            }
        }
        if failed_on.is_some() {
            break;
        }
    }

    assert_eq!(failed_on, Some(3));
    assert_eq!(simulation.progress().lives, 0);
    assert_eq!(query::time_scale(simulation.world()), 0.0);
}

#[test]
fn failed_game_freezes_and_never_respawns() {
    let mut simulation = Simulation::new(SimulationConfig {
        progress: ProgressConfig {
            lives: 1,
            ..ProgressConfig::default()
        },
        ..SimulationConfig::default()
    });

    let mut log = Vec::new();
    idle(&mut simulation, 12, &mut log);
    assert_eq!(simulation.play_state(), PlayState::Failed);

    let frozen = simulation.clock();
    idle(&mut simulation, 100, &mut log);
    assert_eq!(simulation.clock(), frozen);
    assert_eq!(
        count(&log, |event| matches!(event, Event::LevelReloaded { .. })),
        0
    );
    assert!(!query::respawn_pending(simulation.world()));
}

#[test]
fn autopilot_reaches_the_win_threshold_once() {
    let mut simulation = Simulation::new(SimulationConfig {
        progress: ProgressConfig {
            win_jumps: 5,
            ..ProgressConfig::default()
        },
        ..SimulationConfig::default()
    });

    let log = autopilot_run(&mut simulation, 600);
    let wins: Vec<u32> = log
        .iter()
        .filter_map(|event| match event {
            Event::WinReached { jumps } => Some(*jumps),
            _ => None,
        })
        .collect();
    assert_eq!(wins, vec![5]);

    let progress = simulation.progress();
    assert!(progress.jumps > 5);
    assert_eq!(progress.state, PlayState::Playing);
    assert_eq!(progress.lives, 10);
}

#[test]
fn perfect_presses_score_double() {
    let mut simulation = Simulation::default();
    let log = autopilot_run(&mut simulation, 300);

    assert!(log.iter().all(|event| !matches!(
        event,
        Event::JumpCommitted {
            grade: TimingGrade::Good,
            ..
        } | Event::PlayerMissed { .. }
    )));
    let progress = simulation.progress();
    assert!(progress.jumps > 0);
    assert_eq!(progress.score, progress.jumps * 2);
}

#[test]
fn long_run_recycles_trailing_branches() {
    let mut simulation = Simulation::default();
    let log = autopilot_run(&mut simulation, 1_500);

    assert!(simulation.progress().jumps >= 30);
    assert!(count(&log, |event| matches!(event, Event::BranchRecycled { .. })) > 0);
    assert!(
        !log.iter().any(|event| matches!(
            event,
            Event::CommandRejected {
                reason: RejectionReason::Reentrancy
            }
        )),
        "no second trajectory may start while one is active"
    );

    let track = simulation.track();
    assert_eq!(track.len(), 30);
    let player_z = simulation.player().position.z;
    let oldest = track.oldest().expect("track populated");
    assert!(player_z - oldest.position.z <= 4.0 * 10.0 + 6.0);
}

#[test]
fn fade_gated_respawn_waits_for_completion() {
    let mut simulation = Simulation::new(SimulationConfig {
        respawn: RespawnConfig {
            delay: Duration::from_millis(200),
            fade_gated: true,
        },
        ..SimulationConfig::default()
    });

    let mut log = Vec::new();
    idle(&mut simulation, 30, &mut log);
    assert_eq!(
        count(&log, |event| matches!(event, Event::FadeRequested)),
        1
    );
    assert_eq!(
        count(&log, |event| matches!(event, Event::LevelReloaded { .. })),
        0
    );
    assert!(query::fade_pending(simulation.world()));

    let events = simulation.complete_fade();
    assert!(events.contains(&Event::LevelReloaded { grace_armed: true }));
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::PlayerLanded { grace: true, .. })));
    assert!(matches!(simulation.jump_phase(), JumpPhase::Grace { .. }));
    assert_eq!(simulation.progress().lives, 9);

    let again = simulation.complete_fade();
    assert_eq!(
        again,
        vec![Event::CommandRejected {
            reason: RejectionReason::NoFadePending
        }]
    );
}

#[test]
fn pause_suspends_the_timing_window() {
    let mut simulation = Simulation::default();
    let mut log = Vec::new();

    log.extend(simulation.step(Duration::from_millis(100), FrameInput::default()));
    let _ = simulation.set_paused(true);
    for _ in 0..50 {
        log.extend(simulation.step(FRAME, FrameInput { pressed: true }));
    }
    assert_eq!(simulation.clock(), Duration::from_millis(100));
    assert_eq!(count(&log, |event| matches!(event, Event::PlayerMissed { .. })), 0);
    assert_eq!(
        count(&log, |event| matches!(event, Event::JumpCommitted { .. })),
        0
    );

    let _ = simulation.set_paused(false);
    log.extend(simulation.step(Duration::from_millis(50), FrameInput::default()));
    assert_eq!(count(&log, |event| matches!(event, Event::PlayerMissed { .. })), 0);
    log.extend(simulation.step(Duration::from_millis(30), FrameInput::default()));
    assert_eq!(count(&log, |event| matches!(event, Event::PlayerMissed { .. })), 1);
}

#[test]
fn restart_resets_the_session() {
    let mut simulation = Simulation::new(SimulationConfig {
        progress: ProgressConfig {
            lives: 1,
            ..ProgressConfig::default()
        },
        ..SimulationConfig::default()
    });
    let mut log = Vec::new();
    idle(&mut simulation, 12, &mut log);
    assert_eq!(simulation.play_state(), PlayState::Failed);

    let events = simulation.restart();
    assert!(events.contains(&Event::PlayStateChanged {
        state: PlayState::Playing
    }));
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::PlayerLanded { grace: false, .. })));

    let progress = simulation.progress();
    assert_eq!(progress.lives, 1);
    assert_eq!(progress.score, 0);
    assert_eq!(progress.jumps, 0);
    assert_eq!(query::time_scale(simulation.world()), 1.0);
    assert_eq!(simulation.track().len(), 30);
}

#[test]
fn identical_inputs_replay_identically() {
    let first = autopilot_run(&mut Simulation::default(), 400);
    let second = autopilot_run(&mut Simulation::default(), 400);
    assert_eq!(first, second, "replay diverged between runs");
}

#[test]
fn coarse_frames_keep_the_window_bounded() {
    let frame = Duration::from_millis(100);
    let mut simulation = Simulation::new(SimulationConfig {
        track: TrackConfig {
            keep_ahead: 6,
            keep_behind: 1,
            ..TrackConfig::default()
        },
        ..SimulationConfig::default()
    });
    let mut autopilot = Autopilot::new(Duration::from_millis(40));
    let mut log = Vec::new();

    for _ in 0..200 {
        let pressed = autopilot.wants_press(simulation.clock() + frame);
        let events = simulation.step(frame, FrameInput { pressed });
        autopilot.observe(&events);
        log.extend(events);
        assert!(simulation.track().len() <= 6, "window grew to {}", simulation.track().len());
    }

    assert!(simulation.progress().jumps > 0);
    assert_eq!(
        count(&log, |event| matches!(
            event,
            Event::CommandRejected {
                reason: RejectionReason::BranchOccupied
            }
        )),
        0
    );
}
