use super::types::{EntityId, KillEvent, ShotEvent, Tick, TickSample};
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

/// Indexed, read-only time series for one replay
///
/// Only alive samples are retained: a missing `(entity, tick)` pair means the
/// entity was not observed (dead, disconnected, culled by the extractor) and
/// callers must treat it as unknown state.
#[derive(Debug, Default)]
pub struct TraceStore {
    map_name: String,
    /// Sorted by (entity, tick), unique per pair
    samples: Vec<TickSample>,
    /// Entity → contiguous slice of `samples`
    by_entity: HashMap<EntityId, Range<usize>>,
    /// Tick → indices into `samples`
    by_tick: BTreeMap<Tick, Vec<usize>>,
    /// Sorted by tick
    kills: Vec<KillEvent>,
    /// Shooter → shots sorted by tick
    shots: HashMap<EntityId, Vec<ShotEvent>>,
    names: HashMap<EntityId, String>,
}

impl TraceStore {
    /// Build the indices from already-validated records
    ///
    /// Dead samples are dropped and duplicate `(entity, tick)` samples keep the
    /// first occurrence in input order.
    pub fn from_parts(
        map_name: impl Into<String>,
        samples: Vec<TickSample>,
        names: HashMap<EntityId, String>,
        mut kills: Vec<KillEvent>,
        shots: Vec<ShotEvent>,
    ) -> Self {
        let mut samples: Vec<TickSample> = samples.into_iter().filter(|s| s.is_alive).collect();
        // Stable sort keeps input order among duplicates so dedup keeps the first one
        samples.sort_by_key(|s| (s.entity, s.tick));
        let before = samples.len();
        samples.dedup_by(|later, earlier| later.entity == earlier.entity && later.tick == earlier.tick);
        if samples.len() != before {
            tracing::debug!(
                dropped = before - samples.len(),
                "dropped duplicate (entity, tick) samples"
            );
        }

        let mut by_entity: HashMap<EntityId, Range<usize>> = HashMap::new();
        let mut by_tick: BTreeMap<Tick, Vec<usize>> = BTreeMap::new();
        for (idx, sample) in samples.iter().enumerate() {
            by_entity
                .entry(sample.entity)
                .and_modify(|r| r.end = idx + 1)
                .or_insert(idx..idx + 1);
            by_tick.entry(sample.tick).or_default().push(idx);
        }

        kills.sort_by_key(|k| k.tick);

        let mut shot_index: HashMap<EntityId, Vec<ShotEvent>> = HashMap::new();
        for shot in shots {
            shot_index.entry(shot.shooter).or_default().push(shot);
        }
        for shots in shot_index.values_mut() {
            shots.sort_by_key(|s| s.tick);
        }

        Self {
            map_name: map_name.into(),
            samples,
            by_entity,
            by_tick,
            kills,
            shots: shot_index,
            names,
        }
    }

    pub fn map_name(&self) -> &str {
        &self.map_name
    }

    /// Number of retained (alive) samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// All entities with at least one retained sample, ascending
    pub fn entities(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.by_entity.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn display_name(&self, entity: EntityId) -> Option<&str> {
        self.names.get(&entity).map(|s| s.as_str())
    }

    /// Every sample of one entity, ordered by tick
    pub fn entity_samples(&self, entity: EntityId) -> &[TickSample] {
        self.by_entity
            .get(&entity)
            .map(|r| &self.samples[r.clone()])
            .unwrap_or(&[])
    }

    /// Samples of `entity` with `lo <= tick <= hi`, ordered by tick
    ///
    /// Two binary searches over the entity's slice: O(log n + k).
    pub fn samples_in_range(&self, entity: EntityId, lo: Tick, hi: Tick) -> &[TickSample] {
        if lo > hi {
            return &[];
        }
        let slice = self.entity_samples(entity);
        let start = slice.partition_point(|s| s.tick < lo);
        let end = slice.partition_point(|s| s.tick <= hi);
        &slice[start..end.max(start)]
    }

    /// Every alive entity's sample at `tick`
    pub fn alive_at(&self, tick: Tick) -> impl Iterator<Item = &TickSample> + '_ {
        self.by_tick
            .get(&tick)
            .into_iter()
            .flat_map(move |indices| indices.iter().map(move |&i| &self.samples[i]))
    }

    /// Distinct round indices in which `entity` was observed, ascending
    pub fn rounds_of(&self, entity: EntityId) -> Vec<u32> {
        let mut rounds: Vec<u32> = self.entity_samples(entity).iter().map(|s| s.round).collect();
        rounds.sort_unstable();
        rounds.dedup();
        rounds
    }

    /// Samples of `entity` in `round`, ordered by tick
    pub fn round_samples(&self, entity: EntityId, round: u32) -> Vec<&TickSample> {
        self.entity_samples(entity)
            .iter()
            .filter(|s| s.round == round)
            .collect()
    }

    /// Kill events ordered by tick
    pub fn kills(&self) -> &[KillEvent] {
        &self.kills
    }

    /// Earliest shot by `shooter` with `lo <= tick <= hi`
    pub fn first_shot_between(&self, shooter: EntityId, lo: Tick, hi: Tick) -> Option<Tick> {
        if lo > hi {
            return None;
        }
        let shots = self.shots_by(shooter);
        let idx = shots.partition_point(|s| s.tick < lo);
        shots.get(idx).map(|s| s.tick).filter(|&t| t <= hi)
    }

    /// Shots fired by `shooter`, ordered by tick
    pub fn shots_by(&self, shooter: EntityId) -> &[ShotEvent] {
        self.shots.get(&shooter).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Total number of shot events
    pub fn shot_count(&self) -> usize {
        self.shots.values().map(Vec::len).sum()
    }
}
