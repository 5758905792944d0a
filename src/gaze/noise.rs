use crate::trace::{EntityId, Tick, TickSample};
use serde::Serialize;

/// Noise factor below which a tick is considered low quality
pub const LOW_QUALITY_NOISE: f64 = 0.5;

/// Shortest-arc distance between two angles in degrees, in `[0, 180]`
///
/// Order of the arguments does not change the result.
pub fn normalize_angle_diff(a1: f64, a2: f64) -> f64 {
    ((a2 - a1 + 180.0).rem_euclid(360.0) - 180.0).abs()
}

/// Map a per-tick yaw change to a `[0, 1]` smoothness score
///
/// Turns up to `180 * (1 - sensitivity)` degrees score 1.0; larger turns fall
/// linearly to 0.0 at a full 180 degree flick.
pub fn noise_factor(yaw_delta: f64, sensitivity: f64) -> f64 {
    let max_normal = 180.0 * (1.0 - sensitivity);
    if yaw_delta <= max_normal {
        return 1.0;
    }
    let excess = yaw_delta - max_normal;
    let max_excess = 180.0 - max_normal;
    (1.0 - excess / max_excess).max(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GazeSample {
    pub tick: Tick,
    pub entity: EntityId,
    pub yaw_delta: f64,
    pub noise_factor: f64,
}

/// One gaze sample per input sample, for consecutive samples of one round
///
/// The first sample has no predecessor and scores a clean 1.0.
pub fn gaze_samples(round: &[&TickSample], sensitivity: f64) -> Vec<GazeSample> {
    let mut out = Vec::with_capacity(round.len());
    let mut prev_yaw: Option<f64> = None;
    for s in round {
        let yaw_delta = prev_yaw.map_or(0.0, |prev| normalize_angle_diff(prev, s.yaw));
        out.push(GazeSample {
            tick: s.tick,
            entity: s.entity,
            yaw_delta,
            noise_factor: noise_factor(yaw_delta, sensitivity),
        });
        prev_yaw = Some(s.yaw);
    }
    out
}

/// Replay-wide aim quality overview
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NoiseSummary {
    pub samples: usize,
    pub mean_noise_factor: f64,
    /// Share of samples with noise factor below [`LOW_QUALITY_NOISE`]
    pub low_quality_fraction: f64,
}

impl NoiseSummary {
    /// `None` for an empty sample set
    pub fn from_samples(samples: &[GazeSample]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as f64;
        let mean = samples.iter().map(|g| g.noise_factor).sum::<f64>() / n;
        let low = samples
            .iter()
            .filter(|g| g.noise_factor < LOW_QUALITY_NOISE)
            .count() as f64;
        Some(Self {
            samples: samples.len(),
            mean_noise_factor: mean,
            low_quality_fraction: low / n,
        })
    }
}
