#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic track streaming system that keeps branches ahead of the
//! player and recycles the ones left behind.

use std::collections::VecDeque;

use branch_hop_catalog::{Catalog, PatternTemplate};
use branch_hop_core::{Command, Event, PlayerSnapshot, TrackView};
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{trace, warn};

/// Smallest z advance between consecutive branches.
pub const MIN_Z_STEP: f32 = 0.5;

/// Upper bound on pattern draws per call, reached only by degenerate catalogs.
const MAX_DRAWS_PER_CALL: usize = 1_024;

/// Configuration parameters required to construct the track generation system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Lateral position of the seed branch.
    pub lane_x: f32,
    /// Height of the seed branch.
    pub base_y: f32,
    /// Nominal z spacing between branches; also the minimum z of every offset.
    pub z_stride: f32,
    /// Number of live branches the window is filled up to.
    pub keep_ahead: usize,
    /// Number of strides a branch may trail the player before it is recycled.
    pub keep_behind: usize,
    /// Distance ahead of the player at which an empty track is seeded.
    pub seed_lead: f32,
    /// Seed for the pattern selection stream.
    pub rng_seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lane_x: 0.0,
            base_y: 2.0,
            z_stride: 4.0,
            keep_ahead: 30,
            keep_behind: 10,
            seed_lead: 6.0,
            rng_seed: 0x9e37_79b9_7f4a_7c15,
        }
    }
}

/// Remainder of a pattern that did not fit in the window on the previous call.
#[derive(Clone, Debug)]
struct PendingBatch {
    anchor: Vec3,
    offsets: VecDeque<Vec3>,
}

/// Pure system that emits spawn and recycle commands for the track window.
#[derive(Debug)]
pub struct TrackGeneration {
    config: Config,
    catalog: Catalog,
    rng: ChaCha8Rng,
    pending: Option<PendingBatch>,
}

impl TrackGeneration {
    /// Creates a new track generation system drawing from the provided catalog.
    #[must_use]
    pub fn new(config: Config, catalog: Catalog) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            config,
            catalog,
            pending: None,
        }
    }

    /// Configuration the system was built with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Consumes events and the current track to emit streaming commands.
    ///
    /// Spawning is planned against the live window before any recycling, so
    /// the window holds at most `keep_ahead` branches even when the world
    /// refuses a recycle.
    pub fn handle(
        &mut self,
        events: &[Event],
        track: &TrackView,
        player: &PlayerSnapshot,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            if let Event::LevelReloaded { .. } = event {
                self.pending = None;
            }
        }

        self.ensure_ahead(track, player, out);
        let _ = self.recycle_behind(track, player, out);
    }

    /// Spawns branches until the window holds `keep_ahead` of them.
    pub fn ensure_ahead(
        &mut self,
        track: &TrackView,
        player: &PlayerSnapshot,
        out: &mut Vec<Command>,
    ) {
        self.fill_ahead(track, track.len(), player.position.z, out);
    }

    /// Emits recycle commands for the oldest branches trailing the player by
    /// more than `z_stride * keep_behind`. Stops at the first branch that is
    /// close enough, stood on, or targeted by the flight in progress.
    /// Returns the number of commands emitted.
    pub fn recycle_behind(
        &self,
        track: &TrackView,
        player: &PlayerSnapshot,
        out: &mut Vec<Command>,
    ) -> usize {
        let limit = self.config.z_stride * self.config.keep_behind as f32;
        let mut recycled = 0;
        for branch in track.iter() {
            let occupied =
                player.branch == Some(branch.id) || player.destination == Some(branch.id);
            if occupied || player.position.z - branch.position.z <= limit {
                break;
            }
            out.push(Command::RecycleBranch { branch: branch.id });
            recycled += 1;
        }
        recycled
    }

    /// Draws the next pattern from the catalog.
    pub fn pick_pattern(&mut self) -> &PatternTemplate {
        let roll: f64 = self.rng.gen();
        self.catalog.select(roll)
    }

    fn fill_ahead(
        &mut self,
        track: &TrackView,
        mut live: usize,
        player_z: f32,
        out: &mut Vec<Command>,
    ) {
        let mut last = track.newest().map(|branch| branch.position);
        let mut draws = 0;

        while live < self.config.keep_ahead {
            let mut batch = match self.pending.take() {
                Some(batch) => batch,
                None => {
                    if draws >= MAX_DRAWS_PER_CALL {
                        warn!(draws, "pattern draws exhausted before the window filled");
                        break;
                    }
                    draws += 1;

                    let anchor = last.unwrap_or_else(|| self.seed_position(player_z));
                    let template = self.pick_pattern();
                    if template.offsets().is_empty() {
                        warn!(pattern = template.name(), "skipping empty pattern");
                        continue;
                    }
                    trace!(pattern = template.name(), "pattern selected");
                    PendingBatch {
                        anchor,
                        offsets: template.offsets().iter().copied().collect(),
                    }
                }
            };

            while live < self.config.keep_ahead {
                let Some(offset) = batch.offsets.pop_front() else {
                    break;
                };
                let position = self.place(batch.anchor, offset, last);
                out.push(Command::SpawnBranch {
                    position,
                    focus: Some(position + Vec3::Z * self.config.z_stride),
                });
                last = Some(position);
                live += 1;
            }

            if !batch.offsets.is_empty() {
                self.pending = Some(batch);
            }
        }
    }

    fn seed_position(&self, player_z: f32) -> Vec3 {
        Vec3::new(
            self.config.lane_x,
            self.config.base_y,
            player_z + self.config.seed_lead,
        )
    }

    /// Places an offset relative to the batch anchor, keeping z strictly
    /// ahead of the previously placed branch.
    fn place(&self, anchor: Vec3, offset: Vec3, previous: Option<Vec3>) -> Vec3 {
        let mut position =
            anchor + Vec3::new(offset.x, offset.y, offset.z.max(self.config.z_stride));
        if let Some(previous) = previous {
            position.z = position.z.max(previous.z + MIN_Z_STEP);
        }
        position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use branch_hop_catalog::PatternSpec;

    fn generator(offsets: Vec<[f32; 3]>, keep_ahead: usize) -> TrackGeneration {
        let catalog = Catalog::from_specs(vec![PatternSpec {
            name: Some(String::from("fixture")),
            offsets,
            weight: 1.0,
            difficulty: 1,
        }]);
        TrackGeneration::new(
            Config {
                keep_ahead,
                ..Config::default()
            },
            catalog,
        )
    }

    #[test]
    fn equal_depth_offsets_are_pushed_forward() {
        let generation = generator(vec![[0.0, 0.0, 4.0]], 1);
        let previous = Vec3::new(0.0, 2.0, 10.0);
        let placed = generation.place(previous, Vec3::new(0.0, 0.0, 0.0), Some(previous));
        assert_eq!(placed.z, 14.0);

        let crowded = generation.place(
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, 4.0),
            Some(Vec3::new(0.0, 0.0, 4.0)),
        );
        assert_eq!(crowded.z, 4.0 + MIN_Z_STEP);
    }

    #[test]
    fn partial_batch_is_carried_to_next_call() {
        let mut generation =
            generator(vec![[0.0, 0.0, 4.0], [0.0, 0.0, 8.0], [0.0, 0.0, 12.0]], 2);
        let mut out = Vec::new();
        let player = PlayerSnapshot {
            position: Vec3::ZERO,
            branch: None,
            airborne: false,
            destination: None,
        };
        generation.ensure_ahead(&TrackView::default(), &player, &mut out);
        assert_eq!(out.len(), 2);
        let pending = generation.pending.as_ref().expect("remainder kept");
        assert_eq!(pending.offsets.len(), 1);
    }
}
