//! Replay trace ingestion
//!
//! Parses the JSON document produced by the demo extractor into a
//! [`TraceStore`]. Field presence is checked record by record so a malformed
//! trace fails with the exact record and field instead of silently producing
//! default positions.

use super::store::TraceStore;
use super::types::{EntityId, KillEvent, Point3, ShotEvent, Team, Tick, TickSample};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while turning a replay trace into a [`TraceStore`]
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("failed to read replay trace {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed replay trace: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{record} #{index} is missing required field `{field}`")]
    MissingField {
        record: &'static str,
        index: usize,
        field: &'static str,
    },

    #[error("{record} #{index} has non-numeric entity id {value} in `{field}`")]
    InvalidEntityId {
        record: &'static str,
        index: usize,
        field: &'static str,
        value: String,
    },
}

#[derive(Debug, Deserialize)]
struct RawReplay {
    map_name: Option<String>,
    #[serde(default)]
    ticks: Vec<RawTick>,
    #[serde(default)]
    kills: Vec<RawKill>,
    #[serde(default)]
    shots: Vec<RawShot>,
}

#[derive(Debug, Deserialize)]
struct RawTick {
    tick: Option<Tick>,
    entity_id: Option<Value>,
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
    yaw: Option<f64>,
    pitch: Option<f64>,
    team: Option<i64>,
    is_alive: Option<bool>,
    round: Option<u32>,
    name: Option<String>,
    active: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawKill {
    tick: Option<Tick>,
    attacker_id: Option<Value>,
    victim_id: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawShot {
    tick: Option<Tick>,
    shooter_id: Option<Value>,
    weapon: Option<String>,
}

fn required<T>(
    value: Option<T>,
    record: &'static str,
    index: usize,
    field: &'static str,
) -> Result<T, IngestError> {
    value.ok_or(IngestError::MissingField {
        record,
        index,
        field,
    })
}

/// Parse an identity that must be an unsigned 64-bit integer
///
/// JSON numbers and decimal strings are accepted; floats, negatives and
/// anything else are rejected rather than coerced.
fn parse_entity_id(
    value: &Value,
    record: &'static str,
    index: usize,
    field: &'static str,
) -> Result<EntityId, IngestError> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().map(EntityId),
        Value::String(s) => s.parse::<EntityId>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| IngestError::InvalidEntityId {
        record,
        index,
        field,
        value: value.to_string(),
    })
}

/// Missing participant ids on kills mean "no player" (world damage)
fn optional_entity_id(
    value: Option<&Value>,
    record: &'static str,
    index: usize,
    field: &'static str,
) -> Result<EntityId, IngestError> {
    match value {
        None | Some(Value::Null) => Ok(EntityId::NONE),
        Some(v) => parse_entity_id(v, record, index, field),
    }
}

impl TraceStore {
    /// Load a replay trace from a JSON file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, IngestError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_reader(BufReader::new(file))
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, IngestError> {
        let raw: RawReplay = serde_json::from_reader(reader)?;
        Self::from_raw(raw)
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, IngestError> {
        let raw: RawReplay = serde_json::from_slice(bytes)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawReplay) -> Result<Self, IngestError> {
        let map_name = required(raw.map_name, "replay", 0, "map_name")?;

        let mut samples = Vec::with_capacity(raw.ticks.len());
        let mut names: HashMap<EntityId, String> = HashMap::new();
        for (index, t) in raw.ticks.into_iter().enumerate() {
            let tick = required(t.tick, "tick", index, "tick")?;
            let id_value = required(t.entity_id.as_ref(), "tick", index, "entity_id")?;
            let entity = parse_entity_id(id_value, "tick", index, "entity_id")?;
            let position = Point3::new(
                required(t.x, "tick", index, "x")?,
                required(t.y, "tick", index, "y")?,
                required(t.z, "tick", index, "z")?,
            );
            let yaw = required(t.yaw, "tick", index, "yaw")?;

            if let Some(name) = t.name.filter(|n| !n.is_empty()) {
                names.entry(entity).or_insert(name);
            }

            samples.push(TickSample {
                tick,
                entity,
                position,
                yaw,
                pitch: t.pitch,
                team: t.team.map(Team::from_team_num).unwrap_or(Team::Unassigned),
                is_alive: t.is_alive.unwrap_or(true),
                round: t.round.unwrap_or(0),
                active: t.active.unwrap_or(true),
            });
        }

        let mut kills = Vec::with_capacity(raw.kills.len());
        for (index, k) in raw.kills.into_iter().enumerate() {
            kills.push(KillEvent {
                tick: required(k.tick, "kill", index, "tick")?,
                attacker: optional_entity_id(k.attacker_id.as_ref(), "kill", index, "attacker_id")?,
                victim: optional_entity_id(k.victim_id.as_ref(), "kill", index, "victim_id")?,
            });
        }

        let mut shots = Vec::with_capacity(raw.shots.len());
        for (index, s) in raw.shots.into_iter().enumerate() {
            let id_value = required(s.shooter_id.as_ref(), "shot", index, "shooter_id")?;
            shots.push(ShotEvent {
                tick: required(s.tick, "shot", index, "tick")?,
                shooter: parse_entity_id(id_value, "shot", index, "shooter_id")?,
                weapon: s.weapon.unwrap_or_default(),
            });
        }

        tracing::debug!(
            map = %map_name,
            samples = samples.len(),
            kills = kills.len(),
            shots = shots.len(),
            "ingested replay trace"
        );

        Ok(TraceStore::from_parts(map_name, samples, names, kills, shots))
    }
}
