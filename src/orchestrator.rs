//! Replay orchestration
//!
//! Each replay is an independent job: load the trace, load the map's
//! oracle, resolve every kill, extract timing samples and run the gaze
//! analysis. Jobs run on a bounded pool of scoped worker threads fed by a
//! crossbeam channel. Workers never touch shared mutable state; they send
//! one finished batch per replay back to the calling thread, which is the
//! only writer of the [`CohortAggregator`].
//!
//! ```text
//! jobs ──► [job channel] ──► worker 1..N ──► [result channel] ──► merge (caller)
//! ```
//!
//! A replay that fails, panics, or is missing never affects the others.

use crate::cohort::{CohortAggregator, TimingKind, TimingSample, TrackedSet};
use crate::config::{AnalysisConfig, ReplayEntry};
use crate::engagement::{EngagementResolver, GapCounts, TimingExtractor};
use crate::gaze::{GazeAnalyzer, NoiseSummary, PlayerHeatmap};
use crate::trace::{EntityId, IngestError, TraceStore};
use crate::visibility::{OracleProvider, UnsupportedMapError};
use crossbeam::channel;
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::thread;
use thiserror::Error;

/// One replay file to analyze
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayJob {
    pub path: PathBuf,
    pub tracked_id: Option<EntityId>,
    pub label: String,
}

impl ReplayJob {
    /// Job labelled by the file stem, without a tracked identity
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = default_label(&path);
        Self {
            path,
            tracked_id: None,
            label,
        }
    }

    pub fn from_entry(entry: &ReplayEntry) -> Self {
        Self {
            path: entry.path.clone(),
            tracked_id: entry.tracked_id,
            label: entry
                .label
                .clone()
                .unwrap_or_else(|| default_label(&entry.path)),
        }
    }
}

fn default_label(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Lifecycle of one replay
///
/// `Pending → Loaded → Resolved → Aggregated → Done`, or a terminal
/// `Skipped` / `Failed` with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ReplayState {
    Pending,
    Loaded,
    Resolved,
    Aggregated,
    Done,
    Skipped(String),
    Failed(String),
}

impl ReplayState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplayState::Pending => "pending",
            ReplayState::Loaded => "loaded",
            ReplayState::Resolved => "resolved",
            ReplayState::Aggregated => "aggregated",
            ReplayState::Done => "done",
            ReplayState::Skipped(_) => "skipped",
            ReplayState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReplayState::Done | ReplayState::Skipped(_) | ReplayState::Failed(_)
        )
    }
}

/// Why a replay produced no batch
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("replay file not found: {}", .0.display())]
    Missing(PathBuf),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    UnsupportedMap(#[from] UnsupportedMapError),

    #[error("replay worker panicked: {0}")]
    Panicked(String),
}

impl ReplayError {
    /// Terminal state for this error: missing inputs skip, everything else fails
    pub fn into_state(self) -> ReplayState {
        match self {
            ReplayError::Missing(_) | ReplayError::UnsupportedMap(_) => {
                ReplayState::Skipped(self.to_string())
            }
            ReplayError::Ingest(_) | ReplayError::Panicked(_) => {
                ReplayState::Failed(self.to_string())
            }
        }
    }
}

/// Per-replay counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplayDiagnostics {
    pub kills_seen: usize,
    pub kills_resolved: usize,
    /// Resolutions where the victim stayed visible across the whole window
    pub saturated: usize,
    pub kill_speed_samples: usize,
    pub reaction_samples: usize,
    pub gaps: GapCounts,
}

impl ReplayDiagnostics {
    fn count_sample(&mut self, kind: TimingKind) {
        match kind {
            TimingKind::KillSpeed => self.kill_speed_samples += 1,
            TimingKind::Reaction => self.reaction_samples += 1,
        }
    }

    pub fn samples(&self) -> usize {
        self.kill_speed_samples + self.reaction_samples
    }
}

/// Everything one replay contributes to the run
#[derive(Debug, Clone, Default)]
pub struct ReplayBatch {
    pub timing: Vec<TimingSample>,
    pub heatmaps: Vec<PlayerHeatmap>,
    pub noise: Option<NoiseSummary>,
    pub diagnostics: ReplayDiagnostics,
}

/// Final record of one replay
#[derive(Debug, Clone, Serialize)]
pub struct ReplayOutcome {
    pub label: String,
    pub path: PathBuf,
    pub status: ReplayState,
    pub diagnostics: ReplayDiagnostics,
    pub noise: Option<NoiseSummary>,
}

/// Shared, read-only inputs of a run
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub config: AnalysisConfig,
    pub tracked: TrackedSet,
    pub workers: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            config: AnalysisConfig::default(),
            tracked: TrackedSet::default(),
            workers: 4,
        }
    }
}

/// Result of [`run_replays`]
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// In job order
    pub outcomes: Vec<ReplayOutcome>,
    pub aggregator: CohortAggregator,
}

impl RunReport {
    pub fn heatmaps(&self) -> &[PlayerHeatmap] {
        self.aggregator.heatmaps()
    }

    /// Noise summary of every replay that had gaze samples
    pub fn noise_summaries(&self) -> impl Iterator<Item = (&str, &NoiseSummary)> + '_ {
        self.outcomes
            .iter()
            .filter_map(|o| o.noise.as_ref().map(|n| (o.label.as_str(), n)))
    }

    pub fn completed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == ReplayState::Done)
            .count()
    }

    /// False when no replay produced a timing sample or heatmap
    pub fn has_data(&self) -> bool {
        !self.aggregator.is_empty()
    }
}

fn log_transition(label: &str, state: &ReplayState) {
    tracing::debug!(replay = label, state = state.as_str(), "replay state");
}

/// Run the full per-replay pipeline on the current thread
pub fn process_replay<P>(
    job: &ReplayJob,
    config: &AnalysisConfig,
    tracked: &TrackedSet,
    provider: &P,
) -> Result<ReplayBatch, ReplayError>
where
    P: OracleProvider + ?Sized,
{
    log_transition(&job.label, &ReplayState::Pending);
    if !job.path.exists() {
        return Err(ReplayError::Missing(job.path.clone()));
    }

    let store = TraceStore::from_path(&job.path)?;
    let oracle = provider.load(store.map_name())?;
    log_transition(&job.label, &ReplayState::Loaded);
    tracing::debug!(
        replay = job.label.as_str(),
        map = store.map_name(),
        kills = store.kills().len(),
        shots = store.shot_count(),
        "replay loaded"
    );

    let mut batch = ReplayBatch::default();
    let resolver = EngagementResolver::new(&store, oracle.as_ref(), config);
    let extractor = TimingExtractor::new(&store, config, tracked);

    for kill in store.kills() {
        batch.diagnostics.kills_seen += 1;
        let resolution = match resolver.resolve(kill) {
            Ok(resolution) => resolution,
            Err(gap) => {
                batch.diagnostics.gaps.record(gap);
                continue;
            }
        };
        batch.diagnostics.kills_resolved += 1;
        if resolution.saturated {
            batch.diagnostics.saturated += 1;
        }

        for &kind in &config.modes {
            match extractor.extract(&resolution, kind) {
                Ok(sample) => {
                    batch.diagnostics.count_sample(kind);
                    batch.timing.push(sample);
                }
                Err(gap) => batch.diagnostics.gaps.record(gap),
            }
        }
    }
    log_transition(&job.label, &ReplayState::Resolved);

    if config.gaze {
        let gaze = GazeAnalyzer::new(&store, config, tracked).analyze(&job.label);
        batch.heatmaps = gaze.heatmaps;
        batch.noise = gaze.noise;
    }

    Ok(batch)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Analyze every job on a bounded worker pool and merge the results
///
/// The tracked set is the union of `settings.tracked` and each job's own
/// tracked identity. Outcomes are reported in job order regardless of
/// completion order.
pub fn run_replays<P>(jobs: Vec<ReplayJob>, settings: &RunSettings, provider: &P) -> RunReport
where
    P: OracleProvider + ?Sized,
{
    let mut tracked = settings.tracked.clone();
    for id in jobs.iter().filter_map(|j| j.tracked_id) {
        tracked.insert(id);
    }

    let config = &settings.config;
    let total = jobs.len();
    let mut aggregator = CohortAggregator::new(config.deviation, config.precision);
    let mut outcomes: Vec<Option<ReplayOutcome>> = vec![None; total];

    let (job_tx, job_rx) = channel::unbounded::<(usize, ReplayJob)>();
    let (result_tx, result_rx) =
        channel::unbounded::<(usize, ReplayJob, Result<ReplayBatch, ReplayError>)>();

    for entry in jobs.into_iter().enumerate() {
        if job_tx.send(entry).is_err() {
            break;
        }
    }
    drop(job_tx);

    let workers = settings.workers.clamp(1, total.max(1));
    tracing::debug!(replays = total, workers, "starting replay workers");

    thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let tracked = &tracked;
            scope.spawn(move || {
                for (index, job) in job_rx.iter() {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| {
                        process_replay(&job, config, tracked, provider)
                    }))
                    .unwrap_or_else(|payload| {
                        Err(ReplayError::Panicked(panic_message(payload.as_ref())))
                    });
                    if result_tx.send((index, job, result)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        let mut finished = 0;
        for (index, job, result) in result_rx.iter() {
            finished += 1;
            let outcome = match result {
                Ok(batch) => {
                    let ReplayBatch {
                        timing,
                        heatmaps,
                        noise,
                        diagnostics,
                    } = batch;
                    aggregator.merge(timing, heatmaps);
                    log_transition(&job.label, &ReplayState::Aggregated);
                    tracing::info!(
                        replay = %job.label,
                        kills = diagnostics.kills_seen,
                        resolved = diagnostics.kills_resolved,
                        samples = diagnostics.samples(),
                        gaps = diagnostics.gaps.total(),
                        "replay done ({}/{})",
                        finished,
                        total
                    );
                    ReplayOutcome {
                        label: job.label,
                        path: job.path,
                        status: ReplayState::Done,
                        diagnostics,
                        noise,
                    }
                }
                Err(err) => {
                    let state = err.into_state();
                    tracing::warn!(
                        replay = %job.label,
                        state = state.as_str(),
                        "replay not analyzed ({}/{}): {:?}",
                        finished,
                        total,
                        state
                    );
                    ReplayOutcome {
                        label: job.label,
                        path: job.path,
                        status: state,
                        diagnostics: ReplayDiagnostics::default(),
                        noise: None,
                    }
                }
            };
            log_transition(&outcome.label, &outcome.status);
            outcomes[index] = Some(outcome);
        }
    });

    RunReport {
        outcomes: outcomes.into_iter().flatten().collect(),
        aggregator,
    }
}
