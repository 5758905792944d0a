// Trace Store: per-replay entity state and event streams
//
// A replay reaches the engine as an extracted JSON trace (positions, aim and
// liveness per tick, plus kill and shot events). This module validates that
// trace once and exposes the range and point lookups the engagement resolver
// and gaze analyzer need.

mod ingest;
mod store;
mod types;

pub use ingest::IngestError;
pub use store::TraceStore;
pub use types::{EntityId, KillEvent, Point3, ShotEvent, Team, Tick, TickSample};
