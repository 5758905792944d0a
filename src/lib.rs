//! Sightline - visibility-gated engagement timing for shooter match replays
//!
//! For every kill in a replay trace, the engine walks backward from the kill
//! to find when the victim first became continuously visible to the attacker,
//! and derives kill speed (spotted to kill) and reaction speed (spotted to
//! first shot). Samples are grouped into a tracked cohort and everyone else.
//! A separate gaze analysis scores aim volatility per tick and counts
//! opponents inside each player's field of view per time bin.

pub mod cli;
pub mod cohort;
pub mod config;
pub mod engagement;
pub mod gaze;
pub mod orchestrator;
pub mod report;
pub mod trace;
pub mod visibility;
