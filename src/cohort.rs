//! Cohort grouping and summary statistics
//!
//! Timing samples and per-player heatmaps from every replay land here once
//! their replay has finished. Summaries are computed on demand; an empty group
//! is reported as [`GroupSummary::Absent`] rather than a zero or NaN row.

use crate::gaze::PlayerHeatmap;
use crate::trace::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Sample partition by attacker identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cohort {
    Tracked,
    Other,
}

impl Cohort {
    pub const ALL: [Cohort; 2] = [Cohort::Tracked, Cohort::Other];

    pub fn as_str(self) -> &'static str {
        match self {
            Cohort::Tracked => "tracked",
            Cohort::Other => "other",
        }
    }
}

/// Which latency a timing sample measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingKind {
    /// Spotted tick to kill tick
    KillSpeed,
    /// Spotted tick to first shot
    Reaction,
}

impl TimingKind {
    pub const ALL: [TimingKind; 2] = [TimingKind::KillSpeed, TimingKind::Reaction];

    pub fn as_str(self) -> &'static str {
        match self {
            TimingKind::KillSpeed => "kill_speed",
            TimingKind::Reaction => "reaction",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimingSample {
    pub value_ms: f64,
    pub value_ticks: i64,
    pub cohort: Cohort,
    pub kind: TimingKind,
}

/// Externally supplied set of tracked identities
#[derive(Debug, Clone, Default)]
pub struct TrackedSet {
    ids: HashSet<EntityId>,
}

impl TrackedSet {
    pub fn new(ids: impl IntoIterator<Item = EntityId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, id: EntityId) -> bool {
        self.ids.insert(id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.ids.contains(&id)
    }

    /// Cohort of a sample depends only on who fired
    pub fn cohort_of(&self, attacker: EntityId) -> Cohort {
        if self.contains(attacker) {
            Cohort::Tracked
        } else {
            Cohort::Other
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Standard deviation flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Deviation {
    /// Bessel-corrected (n - 1)
    #[default]
    Sample,
    /// Divide by n
    Population,
}

/// Descriptive statistics of one cohort × kind group, rounded for reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub count: usize,
    pub mean_ms: f64,
    pub median_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    /// `None` when undefined (sample deviation of a single value)
    pub std_ms: Option<f64>,
    pub mean_ticks: f64,
}

/// Summary of a group, or an explicit marker that the group has no samples
#[derive(Debug, Clone, PartialEq)]
pub enum GroupSummary {
    Absent,
    Present(SummaryStats),
}

impl GroupSummary {
    pub fn as_option(&self) -> Option<&SummaryStats> {
        match self {
            GroupSummary::Absent => None,
            GroupSummary::Present(stats) => Some(stats),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, GroupSummary::Absent)
    }
}

/// Tracked minus other, for groups present on both sides
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CohortDifference {
    pub mean_ms: f64,
    pub median_ms: f64,
}

/// One time bin of a cohort's averaged heatmap
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FovProfileRow {
    pub time_bin_start: f64,
    pub players: usize,
    pub avg_opponents_in_fov: f64,
    pub avg_noise_factor: f64,
}

/// Round to `precision` decimal places
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

/// Linear-interpolated percentile of sorted data
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let index = (pct / 100.0) * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let weight = index - lower as f64;
        sorted[lower] * (1.0 - weight) + sorted[upper] * weight
    }
}

/// Summarize one group of samples
pub fn summarize(samples: &[TimingSample], deviation: Deviation, precision: u32) -> GroupSummary {
    if samples.is_empty() {
        return GroupSummary::Absent;
    }

    let values: Vec<f64> = samples.iter().map(|s| s.value_ms).collect();
    let as_f32: Vec<f32> = values.iter().map(|&v| v as f32).collect();
    let v = trueno::Vector::from_slice(&as_f32);
    let mean = v.mean().unwrap_or(0.0) as f64;
    let min = v.min().unwrap_or(0.0) as f64;
    let max = v.max().unwrap_or(0.0) as f64;

    let mut sorted = values.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = percentile(&sorted, 50.0);

    let n = values.len();
    let divisor = match deviation {
        Deviation::Sample => n.checked_sub(1).filter(|&d| d > 0),
        Deviation::Population => Some(n),
    };
    let std_ms = divisor.map(|d| {
        let sum_sq: f64 = values.iter().map(|&x| (x - mean).powi(2)).sum();
        round_to((sum_sq / d as f64).sqrt(), precision)
    });

    let mean_ticks = samples.iter().map(|s| s.value_ticks as f64).sum::<f64>() / n as f64;

    GroupSummary::Present(SummaryStats {
        count: n,
        mean_ms: round_to(mean, precision),
        median_ms: round_to(median, precision),
        min_ms: round_to(min, precision),
        max_ms: round_to(max, precision),
        std_ms,
        mean_ticks: round_to(mean_ticks, precision),
    })
}

/// Global accumulator fed one complete replay batch at a time
#[derive(Debug, Clone, Default)]
pub struct CohortAggregator {
    deviation: Deviation,
    precision: u32,
    timing: HashMap<(Cohort, TimingKind), Vec<TimingSample>>,
    heatmaps: Vec<PlayerHeatmap>,
}

impl CohortAggregator {
    pub fn new(deviation: Deviation, precision: u32) -> Self {
        Self {
            deviation,
            precision,
            ..Self::default()
        }
    }

    /// Add a finished replay's samples and heatmaps
    pub fn merge(&mut self, timing: Vec<TimingSample>, heatmaps: Vec<PlayerHeatmap>) {
        for sample in timing {
            self.timing
                .entry((sample.cohort, sample.kind))
                .or_default()
                .push(sample);
        }
        self.heatmaps.extend(heatmaps);
    }

    pub fn samples(&self, cohort: Cohort, kind: TimingKind) -> &[TimingSample] {
        self.timing
            .get(&(cohort, kind))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn count(&self, cohort: Cohort, kind: TimingKind) -> usize {
        self.samples(cohort, kind).len()
    }

    pub fn total_samples(&self) -> usize {
        self.timing.values().map(Vec::len).sum()
    }

    pub fn heatmaps(&self) -> &[PlayerHeatmap] {
        &self.heatmaps
    }

    /// True when no replay contributed anything
    pub fn is_empty(&self) -> bool {
        self.total_samples() == 0 && self.heatmaps.is_empty()
    }

    pub fn summary(&self, cohort: Cohort, kind: TimingKind) -> GroupSummary {
        summarize(self.samples(cohort, kind), self.deviation, self.precision)
    }

    /// Tracked minus other for mean and median
    pub fn difference(&self, kind: TimingKind) -> Option<CohortDifference> {
        let tracked = self.summary(Cohort::Tracked, kind);
        let other = self.summary(Cohort::Other, kind);
        let (t, o) = (tracked.as_option()?, other.as_option()?);
        Some(CohortDifference {
            mean_ms: round_to(t.mean_ms - o.mean_ms, self.precision),
            median_ms: round_to(t.median_ms - o.median_ms, self.precision),
        })
    }

    /// Per time bin averages over the cohort's player heatmaps
    pub fn fov_profile(&self, cohort: Cohort) -> Vec<FovProfileRow> {
        // bin index -> (bin start, players, opponents sum, noise sum)
        let mut rows: BTreeMap<usize, (f64, usize, f64, f64)> = BTreeMap::new();
        for heatmap in self.heatmaps.iter().filter(|h| h.cohort == cohort) {
            for bin in &heatmap.bins {
                let row = rows
                    .entry(bin.bin_index)
                    .or_insert((bin.time_bin_start, 0, 0.0, 0.0));
                row.1 += 1;
                row.2 += bin.avg_opponents_in_fov;
                row.3 += bin.avg_noise_factor;
            }
        }

        rows.into_values()
            .map(|(start, players, fov, noise)| FovProfileRow {
                time_bin_start: start,
                players,
                avg_opponents_in_fov: round_to(fov / players as f64, self.precision),
                avg_noise_factor: round_to(noise / players as f64, self.precision),
            })
            .collect()
    }
}
