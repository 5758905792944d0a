// Replay fixture helpers shared by the integration tests
#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const ATTACKER: u64 = 1;
pub const VICTIM: u64 = 2;

/// Box between the origin and a victim at (100, 50), clear of a victim at (100, 0)
pub const WALL_TOML: &str = r#"
[[occluder]]
min = [40.0, 20.0, -100.0]
max = [60.0, 80.0, 300.0]
"#;

pub fn tick_record(tick: i64, entity: u64, x: f64, y: f64, yaw: f64, team: i64) -> Value {
    json!({
        "tick": tick,
        "entity_id": entity.to_string(),
        "x": x,
        "y": y,
        "z": 0.0,
        "yaw": yaw,
        "pitch": 0.0,
        "team": team,
        "is_alive": true,
        "round": 1,
        "name": format!("player{}", entity),
        "active": true,
    })
}

/// Duel on `map`: attacker at the origin, victim hidden behind the wall until
/// tick 1005, shot at 1010, kill at 1040.
pub fn duel_trace(map: &str) -> Value {
    let mut ticks = Vec::new();
    for tick in 1000..=1040 {
        ticks.push(tick_record(tick, ATTACKER, 0.0, 0.0, 0.0, 2));
        let y = if tick < 1005 { 50.0 } else { 0.0 };
        ticks.push(tick_record(tick, VICTIM, 100.0, y, 180.0, 3));
    }
    json!({
        "map_name": map,
        "ticks": ticks,
        "kills": [{"tick": 1040, "attacker_id": ATTACKER, "victim_id": VICTIM}],
        "shots": [
            {"tick": 1010, "shooter_id": ATTACKER, "weapon": "ak47"},
            {"tick": 1012, "shooter_id": ATTACKER, "weapon": "ak47"}
        ],
    })
}

/// Temp workspace with a `maps/` directory holding `de_wall.toml`
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("maps")).unwrap();
        fs::write(dir.path().join("maps").join("de_wall.toml"), WALL_TOML).unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn maps_dir(&self) -> PathBuf {
        self.dir.path().join("maps")
    }

    pub fn write_json(&self, name: &str, value: &Value) -> PathBuf {
        self.write(name, &serde_json::to_string(value).unwrap())
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }
}
