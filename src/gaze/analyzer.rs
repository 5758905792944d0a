use super::fov::{count_opponents_in_fov, timeline_bins, BinSeries, PlayerHeatmap};
use super::noise::{gaze_samples, GazeSample, NoiseSummary};
use crate::cohort::TrackedSet;
use crate::config::AnalysisConfig;
use crate::trace::{EntityId, TickSample, TraceStore};

/// Gaze analysis output for one replay
#[derive(Debug, Clone, Default)]
pub struct GazeReport {
    pub heatmaps: Vec<PlayerHeatmap>,
    /// Over every active sample of the replay; `None` when there were none
    pub noise: Option<NoiseSummary>,
}

/// Per player, per round aim-noise scoring and FOV opponent counting
pub struct GazeAnalyzer<'a> {
    store: &'a TraceStore,
    config: &'a AnalysisConfig,
    tracked: &'a TrackedSet,
}

impl<'a> GazeAnalyzer<'a> {
    pub fn new(store: &'a TraceStore, config: &'a AnalysisConfig, tracked: &'a TrackedSet) -> Self {
        Self {
            store,
            config,
            tracked,
        }
    }

    /// Analyze every entity of the replay
    pub fn analyze(&self, replay: &str) -> GazeReport {
        let mut heatmaps = Vec::new();
        let mut all_gaze: Vec<GazeSample> = Vec::new();

        for entity in self.store.entities() {
            let mut series = BinSeries::default();
            for round in self.store.rounds_of(entity) {
                let samples = self.active_round_samples(entity, round);
                let gaze = gaze_samples(&samples, self.config.noise_sensitivity);
                if samples.len() >= self.config.min_round_samples {
                    series.absorb(self.bin_round(&samples, &gaze));
                }
                all_gaze.extend(gaze);
            }

            if series.is_empty() {
                continue;
            }

            let fill = self
                .config
                .fill_missing_bins
                .then(|| timeline_bins(self.config.max_round_time, self.config.time_bin_seconds));
            heatmaps.push(PlayerHeatmap {
                replay: replay.to_string(),
                entity,
                display_name: self.store.display_name(entity).unwrap_or_default().to_string(),
                cohort: self.tracked.cohort_of(entity),
                bins: series.finish(self.config.time_bin_seconds, fill),
            });
        }

        tracing::debug!(
            replay,
            players = heatmaps.len(),
            gaze_samples = all_gaze.len(),
            "gaze analysis finished"
        );

        GazeReport {
            heatmaps,
            noise: NoiseSummary::from_samples(&all_gaze),
        }
    }

    /// Alive samples of one round outside warmup/freeze/timeouts, by tick
    fn active_round_samples(&self, entity: EntityId, round: u32) -> Vec<&'a TickSample> {
        self.store
            .round_samples(entity, round)
            .into_iter()
            .filter(|s| s.active)
            .collect()
    }

    /// Bin one round's ticks by time since the round's first sample
    fn bin_round(&self, samples: &[&TickSample], gaze: &[GazeSample]) -> BinSeries {
        let mut series = BinSeries::default();
        let Some(first) = samples.first() else {
            return series;
        };
        let round_start = first.tick;

        for (sample, g) in samples.iter().zip(gaze) {
            let seconds = (sample.tick - round_start) as f64 / self.config.tick_rate;
            let bin_index = (seconds / self.config.time_bin_seconds).floor() as usize;
            let in_fov = count_opponents_in_fov(self.store, sample, self.config.fov_half_angle);
            series.add(bin_index, in_fov, g.noise_factor);
        }
        series
    }
}
