use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Simulation frame index
///
/// Signed so that lookback arithmetic near the start of a replay never wraps.
pub type Tick = i64;

/// Typed player identity shared by every stream of a replay
///
/// `0` is reserved for "no entity" (world damage, bomb, fall damage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Sentinel used by extractors for kills without a player attacker
    pub const NONE: EntityId = EntityId(0);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Accepts an integer or a decimal string; anything else is an error
impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Num(u64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Num(n) => Ok(EntityId(n)),
            Repr::Text(s) => s
                .parse()
                .map_err(|_| D::Error::custom(format!("invalid entity id '{s}'"))),
        }
    }
}

impl std::str::FromStr for EntityId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(EntityId)
    }
}

/// World-space position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Same point raised by `offset` units (eye height)
    pub fn raised(self, offset: f64) -> Self {
        Self {
            z: self.z + offset,
            ..self
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Playing side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Terrorist,
    CounterTerrorist,
    Unassigned,
}

impl Team {
    /// Map the engine's numeric team number (2 = T, 3 = CT)
    pub fn from_team_num(num: i64) -> Self {
        match num {
            2 => Team::Terrorist,
            3 => Team::CounterTerrorist,
            _ => Team::Unassigned,
        }
    }

    /// Unassigned entities (spectators, observers) are nobody's opponent
    pub fn is_opponent_of(self, other: Team) -> bool {
        match (self, other) {
            (Team::Unassigned, _) | (_, Team::Unassigned) => false,
            (a, b) => a != b,
        }
    }
}

/// One entity's state at one tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickSample {
    pub tick: Tick,
    pub entity: EntityId,
    pub position: Point3,
    /// Aim yaw in degrees
    pub yaw: f64,
    /// Aim pitch in degrees, when the extractor provides it
    pub pitch: Option<f64>,
    pub team: Team,
    pub is_alive: bool,
    pub round: u32,
    /// False for warmup, freeze time and timeouts
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KillEvent {
    pub tick: Tick,
    pub attacker: EntityId,
    pub victim: EntityId,
}

impl KillEvent {
    /// Attacker and victim are distinct real players
    pub fn has_valid_participants(&self) -> bool {
        !self.attacker.is_none() && !self.victim.is_none() && self.attacker != self.victim
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShotEvent {
    pub tick: Tick,
    pub shooter: EntityId,
    pub weapon: String,
}
