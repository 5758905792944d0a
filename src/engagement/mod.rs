// Visibility-gated engagement timing
//
// For every kill, walk backward from the kill tick through the joined
// attacker/victim trace to find the first tick of the unbroken line-of-sight
// run ending at the kill (the spotted tick), then derive kill speed and
// reaction speed from it. Kills that cannot produce a sample are counted as
// coverage gaps, never raised as errors.

mod gap;
mod resolver;
mod timing;

pub use gap::{CoverageGap, GapCounts};
pub use resolver::{window_start, EngagementResolution, EngagementResolver};
pub use timing::{ticks_to_ms, TimingExtractor};

#[cfg(test)]
mod tests;
