//! TOML settings file for the headless runner.
//!
//! Every table and field is optional; anything left out keeps the built-in
//! tuning.

use std::{fs, path::Path, time::Duration};

use branch_hop_catalog::{Catalog, PatternSpec};
use branch_hop_simulation::SimulationConfig;
use branch_hop_system_jump_timing::ArcModel;
use glam::Vec3;
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub(crate) enum SettingsError {
    #[error("failed to read settings from {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed settings document")]
    Parse(#[from] toml::de::Error),
    #[error("invalid `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Settings {
    timing: TimingSettings,
    motion: MotionSettings,
    track: TrackSettings,
    progress: ProgressSettings,
    respawn: RespawnSettings,
    #[serde(rename = "pattern")]
    patterns: Vec<PatternSpec>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TimingSettings {
    perfect_window_ms: Option<u64>,
    good_window_ms: Option<u64>,
    early_reject_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct MotionSettings {
    max_horizontal_speed: Option<f32>,
    min_air_time: Option<f32>,
    max_air_time: Option<f32>,
    gravity: Option<f32>,
    /// Switches to the parabolic arc model when present.
    arc_height: Option<f32>,
    landing_tolerance: Option<f32>,
    max_flight: Option<f32>,
    fall_gravity: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TrackSettings {
    lane_x: Option<f32>,
    base_y: Option<f32>,
    z_stride: Option<f32>,
    keep_ahead: Option<usize>,
    keep_behind: Option<usize>,
    seed_lead: Option<f32>,
    seed: Option<u64>,
    spawn_point: Option<[f32; 3]>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ProgressSettings {
    lives: Option<u32>,
    win_jumps: Option<u32>,
    perfect_points: Option<u32>,
    good_points: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RespawnSettings {
    delay_ms: Option<u64>,
    fade_gated: Option<bool>,
}

impl Settings {
    pub(crate) fn load(path: &Path) -> Result<Self, SettingsError> {
        let source = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&source)
    }

    pub(crate) fn parse(source: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(source)?)
    }

    /// Layers the settings over the default configuration.
    pub(crate) fn into_config(self) -> Result<SimulationConfig, SettingsError> {
        let mut config = SimulationConfig::default();

        let timing = &mut config.timing;
        override_millis(&mut timing.perfect_window, self.timing.perfect_window_ms);
        override_millis(&mut timing.good_window, self.timing.good_window_ms);
        override_millis(&mut timing.early_reject, self.timing.early_reject_ms);
        if timing.good_window < timing.perfect_window {
            return Err(SettingsError::Invalid {
                field: "timing.good_window_ms",
                reason: "must not be shorter than the perfect window",
            });
        }

        let motion = self.motion;
        override_value(&mut timing.max_horizontal_speed, motion.max_horizontal_speed);
        override_value(&mut timing.gravity, motion.gravity);
        override_seconds(&mut timing.min_air_time, "motion.min_air_time", motion.min_air_time)?;
        override_seconds(&mut timing.max_air_time, "motion.max_air_time", motion.max_air_time)?;
        if timing.max_horizontal_speed <= 0.0 {
            return Err(SettingsError::Invalid {
                field: "motion.max_horizontal_speed",
                reason: "must be positive",
            });
        }
        if timing.max_air_time < timing.min_air_time {
            return Err(SettingsError::Invalid {
                field: "motion.max_air_time",
                reason: "must not be shorter than min_air_time",
            });
        }
        if let Some(arc_height) = motion.arc_height {
            timing.arc = ArcModel::Parabolic { arc_height };
        }
        override_value(&mut config.flight.landing_tolerance, motion.landing_tolerance);
        override_value(&mut config.flight.fall_gravity, motion.fall_gravity);
        override_seconds(&mut config.flight.max_flight, "motion.max_flight", motion.max_flight)?;

        let track = &mut config.track;
        override_value(&mut track.lane_x, self.track.lane_x);
        override_value(&mut track.base_y, self.track.base_y);
        override_value(&mut track.z_stride, self.track.z_stride);
        override_value(&mut track.keep_ahead, self.track.keep_ahead);
        override_value(&mut track.keep_behind, self.track.keep_behind);
        override_value(&mut track.seed_lead, self.track.seed_lead);
        override_value(&mut track.rng_seed, self.track.seed);
        if track.z_stride <= 0.0 {
            return Err(SettingsError::Invalid {
                field: "track.z_stride",
                reason: "must be positive",
            });
        }
        if track.keep_ahead == 0 {
            return Err(SettingsError::Invalid {
                field: "track.keep_ahead",
                reason: "must hold at least one branch",
            });
        }
        if let Some(spawn_point) = self.track.spawn_point {
            config.spawn_point = Vec3::from_array(spawn_point);
        }

        let progress = &mut config.progress;
        override_value(&mut progress.lives, self.progress.lives);
        override_value(&mut progress.win_jumps, self.progress.win_jumps);
        override_value(&mut progress.perfect_points, self.progress.perfect_points);
        override_value(&mut progress.good_points, self.progress.good_points);

        override_millis(&mut config.respawn.delay, self.respawn.delay_ms);
        override_value(&mut config.respawn.fade_gated, self.respawn.fade_gated);

        if !self.patterns.is_empty() {
            config.catalog = Catalog::from_specs(self.patterns);
        }

        Ok(config)
    }
}

fn override_value<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn override_millis(target: &mut Duration, millis: Option<u64>) {
    override_value(target, millis.map(Duration::from_millis));
}

fn override_seconds(
    target: &mut Duration,
    field: &'static str,
    seconds: Option<f32>,
) -> Result<(), SettingsError> {
    let Some(seconds) = seconds else {
        return Ok(());
    };
    *target = Duration::try_from_secs_f32(seconds).map_err(|_| SettingsError::Invalid {
        field,
        reason: "must be a finite, non-negative number of seconds",
    })?;
    Ok(())
}
