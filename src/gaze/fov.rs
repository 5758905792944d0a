use super::noise::normalize_angle_diff;
use crate::cohort::Cohort;
use crate::trace::{EntityId, TickSample, TraceStore};
use serde::Serialize;
use std::collections::BTreeMap;

/// Opponents of `subject` inside its view cone at the subject's tick
///
/// Only alive, active entities on the opposing side count. The bearing is
/// measured in the horizontal plane.
pub fn count_opponents_in_fov(store: &TraceStore, subject: &TickSample, half_angle: f64) -> usize {
    store
        .alive_at(subject.tick)
        .filter(|other| {
            other.entity != subject.entity
                && other.active
                && subject.team.is_opponent_of(other.team)
        })
        .filter(|other| {
            let dx = other.position.x - subject.position.x;
            let dy = other.position.y - subject.position.y;
            let bearing = dy.atan2(dx).to_degrees();
            normalize_angle_diff(subject.yaw, bearing) <= half_angle
        })
        .count()
}

/// Averages for one time bin of a player's rounds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FovBin {
    pub bin_index: usize,
    /// Seconds from round start
    pub time_bin_start: f64,
    pub avg_opponents_in_fov: f64,
    pub avg_noise_factor: f64,
}

/// Per-player time-binned FOV / noise series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerHeatmap {
    /// Replay the player was observed in
    pub replay: String,
    pub entity: EntityId,
    pub display_name: String,
    pub cohort: Cohort,
    /// Ascending by bin index
    pub bins: Vec<FovBin>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct BinAccumulator {
    opponents: f64,
    noise: f64,
    ticks: usize,
}

/// Sums per bin index, mergeable across rounds
#[derive(Debug, Clone, Default)]
pub struct BinSeries {
    bins: BTreeMap<usize, BinAccumulator>,
}

impl BinSeries {
    pub fn add(&mut self, bin_index: usize, opponents_in_fov: usize, noise_factor: f64) {
        let acc = self.bins.entry(bin_index).or_default();
        acc.opponents += opponents_in_fov as f64;
        acc.noise += noise_factor;
        acc.ticks += 1;
    }

    /// Pool another series' tick-level sums into this one
    pub fn absorb(&mut self, other: BinSeries) {
        for (index, acc) in other.bins {
            let mine = self.bins.entry(index).or_default();
            mine.opponents += acc.opponents;
            mine.noise += acc.noise;
            mine.ticks += acc.ticks;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Averaged bins; with `fill_until` set, bins `0..fill_until` are always present
    ///
    /// Filled bins carry 0 opponents and a clean 1.0 noise factor.
    pub fn finish(&self, bin_seconds: f64, fill_until: Option<usize>) -> Vec<FovBin> {
        let mut indices: Vec<usize> = self.bins.keys().copied().collect();
        if let Some(n) = fill_until {
            indices.extend(0..n);
            indices.sort_unstable();
            indices.dedup();
        }

        indices
            .into_iter()
            .map(|index| {
                let (opponents, noise) = match self.bins.get(&index) {
                    Some(acc) if acc.ticks > 0 => {
                        let n = acc.ticks as f64;
                        (acc.opponents / n, acc.noise / n)
                    }
                    _ => (0.0, 1.0),
                };
                FovBin {
                    bin_index: index,
                    time_bin_start: index as f64 * bin_seconds,
                    avg_opponents_in_fov: opponents,
                    avg_noise_factor: noise,
                }
            })
            .collect()
    }
}

/// Number of bins covering `[0, max_round_time)`
pub fn timeline_bins(max_round_time: f64, bin_seconds: f64) -> usize {
    (max_round_time / bin_seconds).ceil().max(0.0) as usize
}
