//! Run configuration
//!
//! Every knob has a default so an empty file (or no file at all) is a valid
//! configuration. The CLI overlays its flags on top of whatever was loaded.

use crate::cohort::{Deviation, TimingKind};
use crate::gaze::timeline_bins;
use crate::trace::{EntityId, Tick};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Upper bound on heatmap bins per player (`max_round_time / time_bin_seconds`)
pub const MAX_TIMELINE_BINS: usize = 100_000;

/// Analysis parameters shared by every replay of a run
///
/// # Example
/// ```
/// use sightline::config::AnalysisConfig;
///
/// let config = AnalysisConfig::default();
/// assert_eq!(config.lookback_ticks(), 192);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Simulation ticks per second
    pub tick_rate: f64,

    /// Seconds searched backward from each kill for the visibility transition
    pub lookback_seconds: f64,

    /// Kill-speed samples above this many ticks are resolver misses, not slow kills
    pub max_kill_speed_ticks: Tick,

    /// Reaction samples above this many ticks are discarded
    pub max_reaction_ticks: Tick,

    /// Half-angle of the view cone used for opponent counting (degrees)
    pub fov_half_angle: f64,

    /// Width of heatmap time bins (seconds from round start)
    pub time_bin_seconds: f64,

    /// 0.0 treats every turn as normal, 1.0 penalizes any turn
    pub noise_sensitivity: f64,

    /// Emit every bin up to `max_round_time`, filling empty ones
    pub fill_missing_bins: bool,

    /// Round length used for the complete timeline (seconds)
    pub max_round_time: f64,

    /// Vertical offset added to positions before line-of-sight queries
    pub eye_height: f64,

    /// Rounds with fewer active samples are left out of the heatmap
    pub min_round_samples: usize,

    /// Decimal places kept in summaries
    pub precision: u32,

    pub deviation: Deviation,

    /// Timing samples to extract per kill
    pub modes: Vec<TimingKind>,

    /// Run the gaze-noise / FOV heatmap analysis
    pub gaze: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            tick_rate: 64.0,
            lookback_seconds: 3.0,
            max_kill_speed_ticks: 150,
            max_reaction_ticks: 200,
            fov_half_angle: 45.0,
            time_bin_seconds: 5.0,
            noise_sensitivity: 0.5,
            fill_missing_bins: true,
            max_round_time: 120.0,
            eye_height: 64.0,
            min_round_samples: 10,
            precision: 2,
            deviation: Deviation::Sample,
            modes: TimingKind::ALL.to_vec(),
            gaze: true,
        }
    }
}

impl AnalysisConfig {
    /// Lookback window length in whole ticks
    pub fn lookback_ticks(&self) -> Tick {
        (self.lookback_seconds * self.tick_rate).floor() as Tick
    }

    pub fn mode_enabled(&self, kind: TimingKind) -> bool {
        self.modes.contains(&kind)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(self.tick_rate > 0.0 && self.tick_rate.is_finite()) {
            return Err(format!(
                "tick_rate must be finite and > 0, got {}",
                self.tick_rate
            ));
        }
        if !(self.lookback_seconds >= 0.0 && self.lookback_seconds.is_finite()) {
            return Err(format!(
                "lookback_seconds must be finite and >= 0, got {}",
                self.lookback_seconds
            ));
        }
        if !self.eye_height.is_finite() {
            return Err(format!("eye_height must be finite, got {}", self.eye_height));
        }
        if self.max_kill_speed_ticks < 0 || self.max_reaction_ticks < 0 {
            return Err("tick ceilings must be >= 0".to_string());
        }
        if !(self.fov_half_angle > 0.0 && self.fov_half_angle <= 180.0) {
            return Err(format!(
                "fov_half_angle must be in (0, 180], got {}",
                self.fov_half_angle
            ));
        }
        if !(self.time_bin_seconds > 0.0) {
            return Err(format!(
                "time_bin_seconds must be > 0, got {}",
                self.time_bin_seconds
            ));
        }
        if !(0.0..=1.0).contains(&self.noise_sensitivity) {
            return Err(format!(
                "noise_sensitivity must be in [0, 1], got {}",
                self.noise_sensitivity
            ));
        }
        if !(self.max_round_time >= 0.0 && self.max_round_time.is_finite()) {
            return Err(format!(
                "max_round_time must be finite and >= 0, got {}",
                self.max_round_time
            ));
        }
        let bins = timeline_bins(self.max_round_time, self.time_bin_seconds);
        if bins > MAX_TIMELINE_BINS {
            return Err(format!(
                "max_round_time / time_bin_seconds gives {} bins, limit is {}",
                bins, MAX_TIMELINE_BINS
            ));
        }
        Ok(())
    }
}

/// One replay to process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayEntry {
    pub path: PathBuf,
    /// Identity this replay was collected for
    #[serde(default)]
    pub tracked_id: Option<EntityId>,
    /// Display label, defaults to the file name
    #[serde(default)]
    pub label: Option<String>,
}

fn default_workers() -> usize {
    4
}

/// Complete run description loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Identities whose kills form the tracked cohort
    #[serde(default)]
    pub tracked_ids: Vec<EntityId>,

    /// Directory of `<map>.toml` geometry files
    #[serde(default)]
    pub maps_dir: Option<PathBuf>,

    /// Replays processed concurrently
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default, rename = "replay")]
    pub replays: Vec<ReplayEntry>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tracked_ids: Vec::new(),
            maps_dir: None,
            workers: default_workers(),
            analysis: AnalysisConfig::default(),
            replays: Vec::new(),
        }
    }
}

impl RunConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse run configuration")
    }

    /// Load run configuration from a TOML file
    ///
    /// Relative replay paths and `maps_dir` are resolved against the file's directory.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config = Self::from_toml_str(&content)
            .with_context(|| format!("In {}", path.display()))?;

        if let Some(base) = path.parent() {
            config.maps_dir = config.maps_dir.map(|dir| base.join(dir));
            for replay in &mut config.replays {
                replay.path = base.join(&replay.path);
            }
        }
        Ok(config)
    }

    /// Every identity that counts as tracked: the global list plus each replay's own
    pub fn all_tracked_ids(&self) -> Vec<EntityId> {
        let mut ids = self.tracked_ids.clone();
        ids.extend(self.replays.iter().filter_map(|r| r.tracked_id));
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("workers must be >= 1".to_string());
        }
        self.analysis.validate()
    }
}
