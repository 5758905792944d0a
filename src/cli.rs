//! CLI argument parsing for sightline

use crate::config::{ReplayEntry, RunConfig};
use crate::trace::EntityId;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary (default)
    Text,
    /// JSON document for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "sightline")]
#[command(version)]
#[command(
    about = "Visibility-gated engagement timing and gaze-noise analysis for shooter match replays",
    long_about = None
)]
pub struct Cli {
    /// Run configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory of <map>.toml occluder geometry files
    #[arg(short, long = "maps-dir", value_name = "DIR")]
    pub maps_dir: Option<PathBuf>,

    /// Identity whose kills form the tracked cohort (repeatable)
    #[arg(short, long = "tracked", value_name = "ID")]
    pub tracked: Vec<EntityId>,

    /// Replays analyzed concurrently
    #[arg(short = 'j', long, value_name = "N")]
    pub workers: Option<usize>,

    /// Simulation ticks per second
    #[arg(long = "tick-rate", value_name = "HZ")]
    pub tick_rate: Option<f64>,

    /// Seconds searched backward from each kill
    #[arg(long = "lookback-seconds", value_name = "SECS")]
    pub lookback_seconds: Option<f64>,

    /// Kill-speed ceiling in ticks
    #[arg(long = "max-kill-speed-ticks", value_name = "TICKS")]
    pub max_kill_speed_ticks: Option<i64>,

    /// Reaction ceiling in ticks
    #[arg(long = "max-reaction-ticks", value_name = "TICKS")]
    pub max_reaction_ticks: Option<i64>,

    /// View cone half-angle for opponent counting
    #[arg(long = "fov-half-angle", value_name = "DEG")]
    pub fov_half_angle: Option<f64>,

    /// Heatmap time bin width
    #[arg(long = "time-bin", value_name = "SECS")]
    pub time_bin: Option<f64>,

    /// Aim noise sensitivity in [0, 1]
    #[arg(long = "noise-sensitivity", value_name = "S")]
    pub noise_sensitivity: Option<f64>,

    /// Emit every time bin up to the max round time (true/false)
    #[arg(long = "fill-missing-bins", value_name = "BOOL")]
    pub fill_missing_bins: Option<bool>,

    /// Round length for the complete heatmap timeline
    #[arg(long = "max-round-time", value_name = "SECS")]
    pub max_round_time: Option<f64>,

    /// Eye offset added to positions for line-of-sight checks
    #[arg(long = "eye-height", value_name = "UNITS")]
    pub eye_height: Option<f64>,

    /// Skip the gaze-noise / FOV heatmap analysis
    #[arg(long = "no-gaze")]
    pub no_gaze: bool,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Enable debug tracing output to stderr
    #[arg(long)]
    pub debug: bool,

    /// Replay trace files (JSON)
    #[arg(value_name = "REPLAY")]
    pub replays: Vec<PathBuf>,
}

impl Cli {
    /// Overlay command-line values on a loaded configuration
    pub fn apply_to(&self, config: &mut RunConfig) {
        if let Some(dir) = &self.maps_dir {
            config.maps_dir = Some(dir.clone());
        }
        config.tracked_ids.extend(self.tracked.iter().copied());
        if let Some(workers) = self.workers {
            config.workers = workers;
        }

        let analysis = &mut config.analysis;
        if let Some(v) = self.tick_rate {
            analysis.tick_rate = v;
        }
        if let Some(v) = self.lookback_seconds {
            analysis.lookback_seconds = v;
        }
        if let Some(v) = self.max_kill_speed_ticks {
            analysis.max_kill_speed_ticks = v;
        }
        if let Some(v) = self.max_reaction_ticks {
            analysis.max_reaction_ticks = v;
        }
        if let Some(v) = self.fov_half_angle {
            analysis.fov_half_angle = v;
        }
        if let Some(v) = self.time_bin {
            analysis.time_bin_seconds = v;
        }
        if let Some(v) = self.noise_sensitivity {
            analysis.noise_sensitivity = v;
        }
        if let Some(v) = self.fill_missing_bins {
            analysis.fill_missing_bins = v;
        }
        if let Some(v) = self.max_round_time {
            analysis.max_round_time = v;
        }
        if let Some(v) = self.eye_height {
            analysis.eye_height = v;
        }
        if self.no_gaze {
            analysis.gaze = false;
        }

        config
            .replays
            .extend(self.replays.iter().map(|path| ReplayEntry {
                path: path.clone(),
                tracked_id: None,
                label: None,
            }));
    }
}
