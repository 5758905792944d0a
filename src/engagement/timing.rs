use super::gap::CoverageGap;
use super::resolver::EngagementResolution;
use crate::cohort::{TimingKind, TimingSample, TrackedSet};
use crate::config::AnalysisConfig;
use crate::trace::{Tick, TraceStore};

/// Convert a tick delta to milliseconds
pub fn ticks_to_ms(ticks: Tick, tick_rate: f64) -> f64 {
    ticks as f64 / tick_rate * 1000.0
}

/// Derives kill-speed and reaction-speed samples from resolved engagements
pub struct TimingExtractor<'a> {
    store: &'a TraceStore,
    config: &'a AnalysisConfig,
    tracked: &'a TrackedSet,
}

impl<'a> TimingExtractor<'a> {
    pub fn new(store: &'a TraceStore, config: &'a AnalysisConfig, tracked: &'a TrackedSet) -> Self {
        Self {
            store,
            config,
            tracked,
        }
    }

    pub fn extract(
        &self,
        resolution: &EngagementResolution,
        kind: TimingKind,
    ) -> Result<TimingSample, CoverageGap> {
        match kind {
            TimingKind::KillSpeed => self.kill_speed(resolution),
            TimingKind::Reaction => self.reaction(resolution),
        }
    }

    /// Spotted tick to kill tick
    ///
    /// Values above `max_kill_speed_ticks` mean the victim was visible long
    /// before any plausible reactive kill; they are dropped as resolver misses.
    pub fn kill_speed(&self, resolution: &EngagementResolution) -> Result<TimingSample, CoverageGap> {
        let ticks = resolution.kill_speed_ticks();
        if ticks > self.config.max_kill_speed_ticks {
            return Err(CoverageGap::KillSpeedAboveCeiling);
        }
        Ok(self.sample(resolution, ticks, TimingKind::KillSpeed))
    }

    /// Spotted tick to the attacker's first shot in `[spotted, kill]`
    pub fn reaction(&self, resolution: &EngagementResolution) -> Result<TimingSample, CoverageGap> {
        let first_shot = self
            .store
            .first_shot_between(resolution.attacker, resolution.spotted_tick, resolution.kill_tick)
            .ok_or(CoverageGap::NoQualifyingShot)?;

        let ticks = first_shot - resolution.spotted_tick;
        if ticks < 0 || ticks > self.config.max_reaction_ticks {
            return Err(CoverageGap::ReactionOutOfRange);
        }
        Ok(self.sample(resolution, ticks, TimingKind::Reaction))
    }

    fn sample(&self, resolution: &EngagementResolution, ticks: Tick, kind: TimingKind) -> TimingSample {
        TimingSample {
            value_ms: ticks_to_ms(ticks, self.config.tick_rate),
            value_ticks: ticks,
            cohort: self.tracked.cohort_of(resolution.attacker),
            kind,
        }
    }
}
