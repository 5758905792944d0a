//! Backward-scan benchmark
//!
//! Measures spotted-tick resolution for kills with a full lookback window of
//! joined samples, and gaze analysis over a full round.
//!
//! ```bash
//! cargo bench --bench engagement_resolution
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sightline::cohort::TrackedSet;
use sightline::config::AnalysisConfig;
use sightline::engagement::EngagementResolver;
use sightline::gaze::GazeAnalyzer;
use sightline::trace::{EntityId, KillEvent, Point3, Team, TickSample, TraceStore};
use std::collections::HashMap;

fn sample(tick: i64, entity: u64, team: Team) -> TickSample {
    TickSample {
        tick,
        entity: EntityId(entity),
        position: Point3::new(tick as f64, entity as f64 * 10.0, 0.0),
        yaw: (tick as f64 * 3.0) % 360.0,
        pitch: None,
        team,
        is_alive: true,
        round: 1,
        active: true,
    }
}

/// Ten players over `ticks` ticks with one kill per second
fn build_store(ticks: i64) -> TraceStore {
    let mut samples = Vec::new();
    for tick in 0..ticks {
        for entity in 1..=10u64 {
            let team = if entity <= 5 {
                Team::Terrorist
            } else {
                Team::CounterTerrorist
            };
            samples.push(sample(tick, entity, team));
        }
    }
    let kills = (256..ticks)
        .step_by(64)
        .map(|tick| KillEvent {
            tick,
            attacker: EntityId(1 + (tick as u64 % 5)),
            victim: EntityId(6 + (tick as u64 % 5)),
        })
        .collect();
    TraceStore::from_parts("de_bench", samples, HashMap::new(), kills, Vec::new())
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("engagement_resolution");
    let config = AnalysisConfig::default();

    for onset_back in [8i64, 64, 256] {
        let store = build_store(64 * 60);
        let oracle = move |from: Point3, _to: Point3| (from.x as i64) % 512 >= onset_back;
        group.bench_with_input(
            BenchmarkId::new("resolve_all_kills", onset_back),
            &store,
            |b, store| {
                let resolver = EngagementResolver::new(store, &oracle, &config);
                b.iter(|| {
                    for kill in store.kills() {
                        let _ = black_box(resolver.resolve(kill));
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_gaze(c: &mut Criterion) {
    let store = build_store(64 * 120);
    let config = AnalysisConfig::default();
    let tracked = TrackedSet::new([EntityId(1)]);

    c.bench_function("gaze_analysis_full_round", |b| {
        b.iter(|| black_box(GazeAnalyzer::new(&store, &config, &tracked).analyze("bench")));
    });
}

criterion_group!(benches, bench_resolution, bench_gaze);
criterion_main!(benches);
