//! End-to-end engagement timing through JSON ingestion and occluder geometry

mod utils;

use sightline::cohort::{Cohort, TimingKind, TrackedSet};
use sightline::config::AnalysisConfig;
use sightline::engagement::{CoverageGap, EngagementResolver, TimingExtractor};
use sightline::orchestrator::{run_replays, ReplayJob, ReplayState, RunSettings};
use sightline::trace::{EntityId, TraceStore};
use sightline::visibility::{MapRegistry, OracleProvider};
use utils::{duel_trace, Workspace, ATTACKER};

#[test]
fn test_spotted_tick_follows_wall_geometry() {
    let ws = Workspace::new();
    let path = ws.write_json("duel.json", &duel_trace("de_wall"));
    let store = TraceStore::from_path(&path).unwrap();
    let registry = MapRegistry::from_dir(ws.maps_dir()).unwrap();
    let oracle = registry.load(store.map_name()).unwrap();
    let config = AnalysisConfig::default();
    let tracked = TrackedSet::new([EntityId(ATTACKER)]);

    let resolver = EngagementResolver::new(&store, oracle.as_ref(), &config);
    let resolution = resolver.resolve(&store.kills()[0]).unwrap();
    assert_eq!(resolution.spotted_tick, 1005);
    assert!(!resolution.saturated);

    let extractor = TimingExtractor::new(&store, &config, &tracked);
    let kill_speed = extractor.extract(&resolution, TimingKind::KillSpeed).unwrap();
    assert_eq!(kill_speed.value_ticks, 35);
    assert_eq!(kill_speed.value_ms, 546.875);
    assert_eq!(kill_speed.cohort, Cohort::Tracked);

    let reaction = extractor.extract(&resolution, TimingKind::Reaction).unwrap();
    assert_eq!(reaction.value_ticks, 5);
    assert_eq!(reaction.value_ms, 78.125);
}

#[test]
fn test_run_reports_duel_timings() {
    let ws = Workspace::new();
    let path = ws.write_json("duel.json", &duel_trace("de_wall"));
    let registry = MapRegistry::from_dir(ws.maps_dir()).unwrap();
    let settings = RunSettings {
        tracked: TrackedSet::new([EntityId(ATTACKER)]),
        ..RunSettings::default()
    };

    let report = run_replays(vec![ReplayJob::new(path)], &settings, &registry);

    assert_eq!(report.outcomes[0].status, ReplayState::Done);
    let agg = &report.aggregator;
    let reaction = agg.summary(Cohort::Tracked, TimingKind::Reaction);
    let stats = reaction.as_option().unwrap();
    assert_eq!(stats.count, 1);
    assert_eq!(stats.mean_ms, 78.13);
    assert_eq!(stats.std_ms, None);
    assert!(agg.summary(Cohort::Other, TimingKind::Reaction).is_absent());
}

#[test]
fn test_tight_reaction_ceiling_counts_gap() {
    let ws = Workspace::new();
    let path = ws.write_json("duel.json", &duel_trace("de_wall"));
    let registry = MapRegistry::from_dir(ws.maps_dir()).unwrap();
    let settings = RunSettings {
        config: AnalysisConfig {
            max_reaction_ticks: 4,
            ..AnalysisConfig::default()
        },
        ..RunSettings::default()
    };

    let report = run_replays(vec![ReplayJob::new(path)], &settings, &registry);

    let diagnostics = &report.outcomes[0].diagnostics;
    assert_eq!(diagnostics.kill_speed_samples, 1);
    assert_eq!(diagnostics.reaction_samples, 0);
    assert_eq!(diagnostics.gaps.get(CoverageGap::ReactionOutOfRange), 1);
}

#[test]
fn test_short_lookback_saturates() {
    // 0.5s window starts at 1008, after the victim cleared the wall
    let ws = Workspace::new();
    let path = ws.write_json("duel.json", &duel_trace("de_wall"));
    let store = TraceStore::from_path(&path).unwrap();
    let registry = MapRegistry::from_dir(ws.maps_dir()).unwrap();
    let oracle = registry.load("de_wall").unwrap();
    let config = AnalysisConfig {
        lookback_seconds: 0.5,
        ..AnalysisConfig::default()
    };

    let resolution = EngagementResolver::new(&store, oracle.as_ref(), &config)
        .resolve(&store.kills()[0])
        .unwrap();
    assert_eq!(resolution.spotted_tick, 1008);
    assert!(resolution.saturated);
}
