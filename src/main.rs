use anyhow::{Context, Result};
use clap::Parser;
use sightline::cli::{Cli, OutputFormat};
use sightline::cohort::TrackedSet;
use sightline::config::RunConfig;
use sightline::orchestrator::{run_replays, ReplayJob, RunReport, RunSettings};
use sightline::report::{write_text_summary, JsonReport};
use sightline::visibility::MapRegistry;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` forces TRACE, otherwise `RUST_LOG` (default warn)
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the config file (if any), overlay CLI flags and validate
fn load_config(cli: &Cli) -> Result<RunConfig> {
    let mut config = match &cli.config {
        Some(path) => RunConfig::from_path(path)?,
        None => RunConfig::default(),
    };
    cli.apply_to(&mut config);
    config
        .validate()
        .map_err(|msg| anyhow::anyhow!("Invalid configuration: {}", msg))?;
    Ok(config)
}

fn load_maps(config: &RunConfig) -> Result<MapRegistry> {
    match &config.maps_dir {
        Some(dir) => MapRegistry::from_dir(dir),
        None => {
            tracing::warn!("no maps directory configured; every replay will be skipped");
            Ok(MapRegistry::new())
        }
    }
}

fn write_report<W: Write>(out: &mut W, format: OutputFormat, report: &RunReport) -> Result<()> {
    match format {
        OutputFormat::Text => write_text_summary(out, report)?,
        OutputFormat::Json => {
            let json = JsonReport::from_run(report).to_json_pretty()?;
            writeln!(out, "{}", json)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = load_config(&cli)?;
    let registry = load_maps(&config)?;
    tracing::debug!(maps = ?registry.maps(), "map registry ready");

    let settings = RunSettings {
        config: config.analysis.clone(),
        tracked: TrackedSet::new(config.all_tracked_ids()),
        workers: config.workers,
    };
    let jobs: Vec<ReplayJob> = config.replays.iter().map(ReplayJob::from_entry).collect();
    let report = run_replays(jobs, &settings, &registry);

    match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            write_report(&mut BufWriter::new(file), cli.format, &report)
        }
        None => write_report(&mut io::stdout().lock(), cli.format, &report),
    }
}
