//! Line-of-sight oracle adapter
//!
//! The engagement resolver only needs a pure `(eye, eye) -> bool` answer for
//! a map's static geometry. Production geometry (triangle meshes, BSP) stays
//! behind [`VisibilityOracle`]; [`OccluderGeometry`] is a box-based
//! implementation loaded from TOML so replays can be analyzed without one.

use crate::trace::Point3;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Pure line-of-sight query between two world-space points
///
/// Both points already include the eye-height offset.
pub trait VisibilityOracle: Send + Sync {
    fn is_visible(&self, from: Point3, to: Point3) -> bool;
}

impl<F> VisibilityOracle for F
where
    F: Fn(Point3, Point3) -> bool + Send + Sync,
{
    fn is_visible(&self, from: Point3, to: Point3) -> bool {
        self(from, to)
    }
}

/// Map has no registered geometry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no visibility geometry registered for map '{map}'")]
pub struct UnsupportedMapError {
    pub map: String,
}

/// Loads an oracle for a map by name
pub trait OracleProvider: Sync {
    fn load(&self, map: &str) -> Result<Arc<dyn VisibilityOracle>, UnsupportedMapError>;
}

/// Axis-aligned box that blocks sight
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Occluder {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Occluder {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Self { min, max }
    }

    /// Slab test of segment `from -> to` against the box
    fn intersects_segment(&self, from: Point3, to: Point3) -> bool {
        let origin = [from.x, from.y, from.z];
        let dir = [to.x - from.x, to.y - from.y, to.z - from.z];
        let mut t_enter = 0.0_f64;
        let mut t_exit = 1.0_f64;

        for axis in 0..3 {
            if dir[axis].abs() < f64::EPSILON {
                if origin[axis] < self.min[axis] || origin[axis] > self.max[axis] {
                    return false;
                }
                continue;
            }
            let inv = 1.0 / dir[axis];
            let mut t0 = (self.min[axis] - origin[axis]) * inv;
            let mut t1 = (self.max[axis] - origin[axis]) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_enter = t_enter.max(t0);
            t_exit = t_exit.min(t1);
            if t_enter > t_exit {
                return false;
            }
        }
        true
    }
}

/// Static map geometry made of occluder boxes
///
/// # Example TOML
/// ```toml
/// [[occluder]]
/// min = [0.0, -50.0, 0.0]
/// max = [10.0, 50.0, 300.0]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OccluderGeometry {
    #[serde(default, rename = "occluder")]
    occluders: Vec<Occluder>,
}

impl OccluderGeometry {
    pub fn new(occluders: Vec<Occluder>) -> Self {
        Self { occluders }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse occluder geometry")
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read map geometry: {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("In {}", path.display()))
    }

    pub fn occluders(&self) -> &[Occluder] {
        &self.occluders
    }
}

impl VisibilityOracle for OccluderGeometry {
    fn is_visible(&self, from: Point3, to: Point3) -> bool {
        if !from.is_finite() || !to.is_finite() {
            return false;
        }
        !self.occluders.iter().any(|o| o.intersects_segment(from, to))
    }
}

/// Map name → loaded oracle
#[derive(Default)]
pub struct MapRegistry {
    maps: HashMap<String, Arc<dyn VisibilityOracle>>,
}

impl MapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, map: impl Into<String>, oracle: Arc<dyn VisibilityOracle>) {
        self.maps.insert(map.into(), oracle);
    }

    /// Register every `<map>.toml` geometry file found in `dir`
    ///
    /// # Errors
    /// Returns error if the directory can't be read or a geometry file is invalid.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut registry = Self::new();
        let entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to read maps directory: {}", dir.display()))?;

        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            let Some(map) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let geometry = OccluderGeometry::from_path(&path)?;
            tracing::debug!(
                map,
                occluders = geometry.occluders().len(),
                "registered map geometry"
            );
            registry.register(map.to_string(), Arc::new(geometry));
        }

        Ok(registry)
    }

    /// Registered map names, sorted
    pub fn maps(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.maps.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl OracleProvider for MapRegistry {
    fn load(&self, map: &str) -> Result<Arc<dyn VisibilityOracle>, UnsupportedMapError> {
        self.maps.get(map).cloned().ok_or_else(|| UnsupportedMapError {
            map: map.to_string(),
        })
    }
}
