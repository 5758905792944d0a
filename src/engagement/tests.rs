// Engagement resolution and timing extraction tests
//
// Synthetic traces place the attacker at x = tick so the scripted oracle can
// decide visibility per tick from the eye position alone.

use super::*;
use crate::cohort::{Cohort, TimingKind, TrackedSet};
use crate::config::AnalysisConfig;
use crate::trace::{EntityId, KillEvent, Point3, ShotEvent, Team, Tick, TickSample, TraceStore};
use std::collections::HashMap;

const ATTACKER: EntityId = EntityId(1);
const VICTIM: EntityId = EntityId(2);

fn sample(entity: EntityId, tick: Tick) -> TickSample {
    TickSample {
        tick,
        entity,
        position: Point3::new(tick as f64, 0.0, 0.0),
        yaw: 0.0,
        pitch: None,
        team: if entity == ATTACKER {
            Team::CounterTerrorist
        } else {
            Team::Terrorist
        },
        is_alive: true,
        round: 0,
        active: true,
    }
}

/// Attacker and victim both sampled on every tick of `[from, to]`
fn duel_store(from: Tick, to: Tick, kill_tick: Tick, shots: &[Tick]) -> TraceStore {
    let mut samples = Vec::new();
    for tick in from..=to {
        samples.push(sample(ATTACKER, tick));
        samples.push(sample(VICTIM, tick));
    }
    let shots = shots
        .iter()
        .map(|&tick| ShotEvent {
            tick,
            shooter: ATTACKER,
            weapon: "ak47".to_string(),
        })
        .collect();
    let kills = vec![KillEvent {
        tick: kill_tick,
        attacker: ATTACKER,
        victim: VICTIM,
    }];
    TraceStore::from_parts("de_test", samples, HashMap::new(), kills, shots)
}

/// Visible iff the attacker's tick (its x coordinate) is at least `t0`
fn visible_from(t0: Tick) -> impl Fn(Point3, Point3) -> bool + Send + Sync {
    move |from: Point3, _to: Point3| from.x as Tick >= t0
}

fn kill(tick: Tick) -> KillEvent {
    KillEvent {
        tick,
        attacker: ATTACKER,
        victim: VICTIM,
    }
}

#[test]
fn test_end_to_end_scenario() {
    // Not visible at 1000, visible from 1005 on, kill at 1040, first shot at 1010
    let store = duel_store(990, 1040, 1040, &[1010, 1012]);
    let oracle = visible_from(1005);
    let config = AnalysisConfig::default();
    let tracked = TrackedSet::new([ATTACKER]);

    let resolution = EngagementResolver::new(&store, &oracle, &config)
        .resolve(&kill(1040))
        .unwrap();
    assert_eq!(resolution.spotted_tick, 1005);
    assert!(!resolution.saturated);

    let extractor = TimingExtractor::new(&store, &config, &tracked);
    let kill_speed = extractor.kill_speed(&resolution).unwrap();
    assert_eq!(kill_speed.value_ticks, 35);
    assert_eq!(kill_speed.kind, TimingKind::KillSpeed);

    let reaction = extractor.reaction(&resolution).unwrap();
    assert_eq!(reaction.value_ticks, 5);
    assert_eq!(reaction.value_ms, 78.125);
    assert_eq!(reaction.cohort, Cohort::Tracked);
}

#[test]
fn test_backward_scan_finds_start_of_visible_run() {
    let config = AnalysisConfig::default();
    let kill_tick = 2000;
    let start = window_start(kill_tick, &config);
    let store = duel_store(start - 50, kill_tick, kill_tick, &[]);

    for t0 in [start + 1, start + 17, kill_tick - 100, kill_tick - 1, kill_tick] {
        let oracle = visible_from(t0);
        let resolution = EngagementResolver::new(&store, &oracle, &config)
            .resolve(&kill(kill_tick))
            .unwrap();
        assert_eq!(resolution.spotted_tick, t0, "t0 = {}", t0);
        assert!(resolution.spotted_tick <= resolution.kill_tick);
    }
}

#[test]
fn test_saturated_window_spots_at_window_start() {
    let config = AnalysisConfig::default();
    let kill_tick = 500;
    let store = duel_store(0, kill_tick, kill_tick, &[]);
    let always = |_: Point3, _: Point3| true;

    let resolution = EngagementResolver::new(&store, &always, &config)
        .resolve(&kill(kill_tick))
        .unwrap();
    assert_eq!(resolution.spotted_tick, window_start(kill_tick, &config));
    assert_eq!(resolution.spotted_tick, 308);
    assert!(resolution.saturated);

    // t0 exactly at the window start is indistinguishable from saturation
    let oracle = visible_from(308);
    let resolution = EngagementResolver::new(&store, &oracle, &config)
        .resolve(&kill(kill_tick))
        .unwrap();
    assert_eq!(resolution.spotted_tick, 308);
}

#[test]
fn test_saturation_uses_earliest_available_tick() {
    // Trace only starts 20 ticks before the kill
    let config = AnalysisConfig::default();
    let store = duel_store(480, 500, 500, &[]);
    let always = |_: Point3, _: Point3| true;

    let resolution = EngagementResolver::new(&store, &always, &config)
        .resolve(&kill(500))
        .unwrap();
    assert_eq!(resolution.spotted_tick, 480);
    assert!(resolution.saturated);
}

#[test]
fn test_visibility_break_inside_window_restarts_run() {
    let config = AnalysisConfig::default();
    let store = duel_store(900, 1040, 1040, &[]);
    let oracle = |from: Point3, _: Point3| {
        let tick = from.x as Tick;
        tick >= 1005 && tick != 1020
    };

    let resolution = EngagementResolver::new(&store, &oracle, &config)
        .resolve(&kill(1040))
        .unwrap();
    assert_eq!(resolution.spotted_tick, 1021);
}

#[test]
fn test_missing_kill_tick_sample_scans_from_latest_joined_tick() {
    // Victim is already dead (unsampled) on the kill tick
    let config = AnalysisConfig::default();
    let mut samples: Vec<TickSample> = (950..=1040).map(|t| sample(ATTACKER, t)).collect();
    samples.extend((950..1040).map(|t| sample(VICTIM, t)));
    let store = TraceStore::from_parts("m", samples, HashMap::new(), vec![kill(1040)], Vec::new());

    let resolution = EngagementResolver::new(&store, &visible_from(1000), &config)
        .resolve(&kill(1040))
        .unwrap();
    assert_eq!(resolution.spotted_tick, 1000);
    assert_eq!(resolution.kill_speed_ticks(), 40);
    assert!(!resolution.saturated);
}

#[test]
fn test_not_visible_on_latest_joined_tick_is_a_gap() {
    // Same shape as above, but the victim was hidden on the last shared tick
    let config = AnalysisConfig::default();
    let mut samples: Vec<TickSample> = (950..=1040).map(|t| sample(ATTACKER, t)).collect();
    samples.extend((950..1040).map(|t| sample(VICTIM, t)));
    let store = TraceStore::from_parts("m", samples, HashMap::new(), vec![kill(1040)], Vec::new());

    let never = |_: Point3, _: Point3| false;
    let result = EngagementResolver::new(&store, &never, &config).resolve(&kill(1040));
    assert_eq!(result, Err(CoverageGap::NotVisibleWhenLastSeen));
    assert_eq!(
        CoverageGap::NotVisibleWhenLastSeen.as_str(),
        "not_visible_when_last_seen"
    );
}

#[test]
fn test_not_visible_on_kill_tick_is_a_gap() {
    let config = AnalysisConfig::default();
    let store = duel_store(950, 1040, 1040, &[]);
    let never = |_: Point3, _: Point3| false;

    let result = EngagementResolver::new(&store, &never, &config).resolve(&kill(1040));
    assert_eq!(result, Err(CoverageGap::NotVisibleAtKill));
}

#[test]
fn test_non_finite_position_counts_as_not_visible() {
    let config = AnalysisConfig::default();
    let mut samples = Vec::new();
    for tick in 990..=1040 {
        let mut att = sample(ATTACKER, tick);
        if tick == 1030 {
            att.position.y = f64::NAN;
        }
        samples.push(att);
        samples.push(sample(VICTIM, tick));
    }
    let store = TraceStore::from_parts("m", samples, HashMap::new(), vec![kill(1040)], Vec::new());
    let always = |_: Point3, _: Point3| true;

    let resolution = EngagementResolver::new(&store, &always, &config)
        .resolve(&kill(1040))
        .unwrap();
    assert_eq!(resolution.spotted_tick, 1031);
}

#[test]
fn test_unresolvable_kills() {
    let config = AnalysisConfig::default();
    let store = duel_store(990, 1040, 1040, &[]);
    let always = |_: Point3, _: Point3| true;
    let resolver = EngagementResolver::new(&store, &always, &config);

    let self_kill = KillEvent {
        tick: 1040,
        attacker: ATTACKER,
        victim: ATTACKER,
    };
    assert_eq!(resolver.resolve(&self_kill), Err(CoverageGap::InvalidParticipants));

    let world_kill = KillEvent {
        tick: 1040,
        attacker: EntityId::NONE,
        victim: VICTIM,
    };
    assert_eq!(resolver.resolve(&world_kill), Err(CoverageGap::InvalidParticipants));

    let unknown_victim = KillEvent {
        tick: 1040,
        attacker: ATTACKER,
        victim: EntityId(77),
    };
    assert_eq!(resolver.resolve(&unknown_victim), Err(CoverageGap::NoOverlappingTrace));

    // Kill long after both traces ended: nothing inside the window
    assert_eq!(resolver.resolve(&kill(5000)), Err(CoverageGap::NoOverlappingTrace));
}

#[test]
fn test_disjoint_ticks_do_not_join() {
    let config = AnalysisConfig::default();
    let mut samples: Vec<TickSample> = (1000..1040).step_by(2).map(|t| sample(ATTACKER, t)).collect();
    samples.extend((1001..1040).step_by(2).map(|t| sample(VICTIM, t)));
    let store = TraceStore::from_parts("m", samples, HashMap::new(), Vec::new(), Vec::new());
    let always = |_: Point3, _: Point3| true;

    let result = EngagementResolver::new(&store, &always, &config).resolve(&kill(1040));
    assert_eq!(result, Err(CoverageGap::NoOverlappingTrace));
}

fn resolution(spotted: Tick, kill_tick: Tick) -> EngagementResolution {
    EngagementResolution {
        kill_tick,
        spotted_tick: spotted,
        attacker: ATTACKER,
        victim: VICTIM,
        saturated: false,
    }
}

#[test]
fn test_kill_speed_ceiling_is_inclusive() {
    let config = AnalysisConfig::default();
    let store = duel_store(0, 0, 0, &[]);
    let tracked = TrackedSet::default();
    let extractor = TimingExtractor::new(&store, &config, &tracked);

    let at_ceiling = extractor.kill_speed(&resolution(1000, 1150)).unwrap();
    assert_eq!(at_ceiling.value_ticks, 150);

    assert_eq!(
        extractor.kill_speed(&resolution(1000, 1151)),
        Err(CoverageGap::KillSpeedAboveCeiling)
    );
}

#[test]
fn test_reaction_requires_shot_inside_engagement() {
    let config = AnalysisConfig::default();
    let tracked = TrackedSet::default();

    // Shots only before the spotted tick and after the kill
    let store = duel_store(990, 1040, 1040, &[1000, 1004, 1041]);
    let extractor = TimingExtractor::new(&store, &config, &tracked);
    assert_eq!(
        extractor.reaction(&resolution(1005, 1040)),
        Err(CoverageGap::NoQualifyingShot)
    );

    // A shot on the spotted tick itself is a zero-tick reaction
    let store = duel_store(990, 1040, 1040, &[1004, 1005]);
    let extractor = TimingExtractor::new(&store, &config, &tracked);
    assert_eq!(extractor.reaction(&resolution(1005, 1040)).unwrap().value_ticks, 0);

    // Shot on the kill tick is still inside the range
    let store = duel_store(990, 1040, 1040, &[1040]);
    let extractor = TimingExtractor::new(&store, &config, &tracked);
    assert_eq!(extractor.reaction(&resolution(1005, 1040)).unwrap().value_ticks, 35);
}

#[test]
fn test_reaction_ceiling() {
    let config = AnalysisConfig {
        max_reaction_ticks: 3,
        ..AnalysisConfig::default()
    };
    let tracked = TrackedSet::default();
    let store = duel_store(990, 1040, 1040, &[1009]);
    let extractor = TimingExtractor::new(&store, &config, &tracked);

    assert_eq!(
        extractor.reaction(&resolution(1005, 1040)),
        Err(CoverageGap::ReactionOutOfRange)
    );
    assert_eq!(
        extractor.extract(&resolution(1006, 1040), TimingKind::Reaction).unwrap().value_ticks,
        3
    );
}

#[test]
fn test_cohort_follows_attacker_not_victim() {
    let config = AnalysisConfig::default();
    let store = duel_store(990, 1040, 1040, &[1010]);

    let victim_tracked = TrackedSet::new([VICTIM]);
    let extractor = TimingExtractor::new(&store, &config, &victim_tracked);
    let sample = extractor.extract(&resolution(1005, 1040), TimingKind::KillSpeed).unwrap();
    assert_eq!(sample.cohort, Cohort::Other);

    let attacker_tracked = TrackedSet::new([ATTACKER]);
    let extractor = TimingExtractor::new(&store, &config, &attacker_tracked);
    let sample = extractor.extract(&resolution(1005, 1040), TimingKind::KillSpeed).unwrap();
    assert_eq!(sample.cohort, Cohort::Tracked);
}

#[test]
fn test_ticks_to_ms() {
    assert_eq!(ticks_to_ms(64, 64.0), 1000.0);
    assert_eq!(ticks_to_ms(35, 64.0), 546.875);
    assert_eq!(ticks_to_ms(0, 128.0), 0.0);
}

#[test]
fn test_gap_counts() {
    let mut gaps = GapCounts::default();
    gaps.record(CoverageGap::NoQualifyingShot);
    gaps.record(CoverageGap::NoQualifyingShot);
    gaps.record(CoverageGap::NotVisibleAtKill);
    assert_eq!(gaps.get(CoverageGap::NoQualifyingShot), 2);
    assert_eq!(gaps.get(CoverageGap::InvalidParticipants), 0);
    assert_eq!(gaps.total(), 3);
    assert_eq!(CoverageGap::NotVisibleAtKill.as_str(), "not_visible_at_kill");
}
