// Gaze-noise and field-of-view heatmaps
//
// Scores frame-to-frame yaw changes (large flicks lower the noise factor) and
// counts opponents inside each player's view cone, averaged into fixed time
// bins measured from round start.

mod analyzer;
mod fov;
mod noise;

pub use analyzer::{GazeAnalyzer, GazeReport};
pub use fov::{count_opponents_in_fov, timeline_bins, BinSeries, FovBin, PlayerHeatmap};
pub use noise::{
    gaze_samples, noise_factor, normalize_angle_diff, GazeSample, NoiseSummary, LOW_QUALITY_NOISE,
};
