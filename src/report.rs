//! Run report output: JSON document and plain-text summary

use crate::cohort::{Cohort, CohortDifference, FovProfileRow, SummaryStats, TimingKind};
use crate::gaze::{NoiseSummary, PlayerHeatmap};
use crate::orchestrator::{ReplayOutcome, ReplayState, RunReport};
use serde::Serialize;
use std::io::{self, Write};

/// Summary of one cohort × kind group; `summary` is `null` when the group is empty
#[derive(Debug, Clone, Serialize)]
pub struct JsonTimingGroup {
    pub cohort: Cohort,
    pub kind: TimingKind,
    pub summary: Option<SummaryStats>,
}

/// Tracked minus other for one kind, `null` unless both groups have data
#[derive(Debug, Clone, Serialize)]
pub struct JsonDifference {
    pub kind: TimingKind,
    pub difference: Option<CohortDifference>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonFovProfile {
    pub cohort: Cohort,
    pub bins: Vec<FovProfileRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonNoise<'a> {
    pub replay: &'a str,
    #[serde(flatten)]
    pub summary: &'a NoiseSummary,
}

/// Complete machine-readable run report
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport<'a> {
    pub has_data: bool,
    pub replays: &'a [ReplayOutcome],
    pub timing: Vec<JsonTimingGroup>,
    pub differences: Vec<JsonDifference>,
    pub fov_profiles: Vec<JsonFovProfile>,
    pub heatmaps: &'a [PlayerHeatmap],
    pub noise: Vec<JsonNoise<'a>>,
}

impl<'a> JsonReport<'a> {
    pub fn from_run(run: &'a RunReport) -> Self {
        let agg = &run.aggregator;
        let timing = TimingKind::ALL
            .into_iter()
            .flat_map(|kind| {
                Cohort::ALL.into_iter().map(move |cohort| JsonTimingGroup {
                    cohort,
                    kind,
                    summary: agg.summary(cohort, kind).as_option().cloned(),
                })
            })
            .collect();

        Self {
            has_data: run.has_data(),
            replays: &run.outcomes,
            timing,
            differences: TimingKind::ALL
                .into_iter()
                .map(|kind| JsonDifference {
                    kind,
                    difference: agg.difference(kind),
                })
                .collect(),
            fov_profiles: Cohort::ALL
                .into_iter()
                .map(|cohort| JsonFovProfile {
                    cohort,
                    bins: agg.fov_profile(cohort),
                })
                .collect(),
            heatmaps: run.heatmaps(),
            noise: run
                .noise_summaries()
                .map(|(replay, summary)| JsonNoise { replay, summary })
                .collect(),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn kind_title(kind: TimingKind) -> &'static str {
    match kind {
        TimingKind::KillSpeed => "Kill speed (spotted -> kill)",
        TimingKind::Reaction => "Reaction speed (spotted -> first shot)",
    }
}

fn write_replays<W: Write>(out: &mut W, outcomes: &[ReplayOutcome]) -> io::Result<()> {
    writeln!(out, "=== Replays ===")?;
    for outcome in outcomes {
        match &outcome.status {
            ReplayState::Done => {
                let d = &outcome.diagnostics;
                writeln!(
                    out,
                    "  {:<24} done     kills={} resolved={} samples={} gaps={} saturated={}",
                    outcome.label,
                    d.kills_seen,
                    d.kills_resolved,
                    d.samples(),
                    d.gaps.total(),
                    d.saturated
                )?;
                for (gap, count) in d.gaps.iter() {
                    writeln!(out, "      {:<28} {}", gap.as_str(), count)?;
                }
            }
            ReplayState::Skipped(reason) => {
                writeln!(out, "  {:<24} skipped  {}", outcome.label, reason)?;
            }
            ReplayState::Failed(reason) => {
                writeln!(out, "  {:<24} failed   {}", outcome.label, reason)?;
            }
            other => {
                writeln!(out, "  {:<24} {}", outcome.label, other.as_str())?;
            }
        }
    }
    writeln!(out)
}

fn write_timing<W: Write>(out: &mut W, run: &RunReport) -> io::Result<()> {
    let agg = &run.aggregator;
    for kind in TimingKind::ALL {
        writeln!(out, "=== {} ===", kind_title(kind))?;
        for cohort in Cohort::ALL {
            match agg.summary(cohort, kind).as_option() {
                None => writeln!(out, "  {:<8} no data", cohort.as_str())?,
                Some(s) => {
                    let std = s
                        .std_ms
                        .map(|v| format!("{:.2}", v))
                        .unwrap_or_else(|| "n/a".to_string());
                    writeln!(
                        out,
                        "  {:<8} n={:<5} mean={:.2}ms median={:.2}ms min={:.2}ms max={:.2}ms std={} mean_ticks={:.2}",
                        cohort.as_str(),
                        s.count,
                        s.mean_ms,
                        s.median_ms,
                        s.min_ms,
                        s.max_ms,
                        std,
                        s.mean_ticks
                    )?;
                }
            }
        }
        if let Some(diff) = agg.difference(kind) {
            writeln!(
                out,
                "  tracked - other: mean {:+.2}ms, median {:+.2}ms",
                diff.mean_ms, diff.median_ms
            )?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_gaze<W: Write>(out: &mut W, run: &RunReport) -> io::Result<()> {
    let mut noise = run.noise_summaries().peekable();
    if noise.peek().is_none() && run.heatmaps().is_empty() {
        return Ok(());
    }

    writeln!(out, "=== Gaze noise ===")?;
    for (label, summary) in noise {
        writeln!(
            out,
            "  {:<24} samples={} mean_noise={:.3} low_quality={:.1}%",
            label,
            summary.samples,
            summary.mean_noise_factor,
            summary.low_quality_fraction * 100.0
        )?;
    }
    writeln!(out)?;

    writeln!(out, "=== FOV profile (avg opponents in FOV / avg noise) ===")?;
    for cohort in Cohort::ALL {
        let rows = run.aggregator.fov_profile(cohort);
        if rows.is_empty() {
            writeln!(out, "  {:<8} no data", cohort.as_str())?;
            continue;
        }
        writeln!(out, "  {}:", cohort.as_str())?;
        for row in rows {
            writeln!(
                out,
                "    {:>6.1}s  players={:<3} fov={:.2} noise={:.2}",
                row.time_bin_start, row.players, row.avg_opponents_in_fov, row.avg_noise_factor
            )?;
        }
    }
    writeln!(out)
}

/// Human-readable summary of a run
pub fn write_text_summary<W: Write>(out: &mut W, run: &RunReport) -> io::Result<()> {
    write_replays(out, &run.outcomes)?;
    if !run.has_data() {
        writeln!(out, "No data: no replay produced timing samples or heatmaps.")?;
        return Ok(());
    }
    write_timing(out, run)?;
    write_gaze(out, run)
}
