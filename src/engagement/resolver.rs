use super::gap::CoverageGap;
use crate::config::AnalysisConfig;
use crate::trace::{EntityId, KillEvent, Tick, TickSample, TraceStore};
use crate::visibility::VisibilityOracle;

/// Spotted tick found for one kill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngagementResolution {
    pub kill_tick: Tick,
    /// First tick of the unbroken visible run ending at the kill; never after `kill_tick`
    pub spotted_tick: Tick,
    pub attacker: EntityId,
    pub victim: EntityId,
    /// Victim was visible for the whole joined window, so `spotted_tick` is
    /// only the window's earliest tick
    pub saturated: bool,
}

impl EngagementResolution {
    pub fn kill_speed_ticks(&self) -> Tick {
        self.kill_tick - self.spotted_tick
    }
}

/// First tick of the lookback window ending at `kill_tick`
pub fn window_start(kill_tick: Tick, config: &AnalysisConfig) -> Tick {
    kill_tick - config.lookback_ticks()
}

/// Inner join of two tick-ordered slices on tick
fn join_on_tick<'s>(
    attacker: &'s [TickSample],
    victim: &'s [TickSample],
) -> Vec<(&'s TickSample, &'s TickSample)> {
    let mut joined = Vec::with_capacity(attacker.len().min(victim.len()));
    let (mut i, mut j) = (0, 0);
    while i < attacker.len() && j < victim.len() {
        match attacker[i].tick.cmp(&victim[j].tick) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                joined.push((&attacker[i], &victim[j]));
                i += 1;
                j += 1;
            }
        }
    }
    joined
}

/// Walks backward from each kill to find when the victim was spotted
pub struct EngagementResolver<'a> {
    store: &'a TraceStore,
    oracle: &'a dyn VisibilityOracle,
    config: &'a AnalysisConfig,
}

impl<'a> EngagementResolver<'a> {
    pub fn new(
        store: &'a TraceStore,
        oracle: &'a dyn VisibilityOracle,
        config: &'a AnalysisConfig,
    ) -> Self {
        Self {
            store,
            oracle,
            config,
        }
    }

    /// Line of sight between the two eyes; unusable positions count as not visible
    fn eyes_see(&self, attacker: &TickSample, victim: &TickSample) -> bool {
        let from = attacker.position.raised(self.config.eye_height);
        let to = victim.position.raised(self.config.eye_height);
        if !from.is_finite() || !to.is_finite() {
            return false;
        }
        self.oracle.is_visible(from, to)
    }

    /// Resolve the spotted tick for one kill
    ///
    /// Scans the joined attacker/victim ticks of `[window_start, kill_tick]`
    /// from newest to oldest. The first not-visible tick ends the scan and the
    /// spotted tick becomes the tick after it. If the victim stays visible for
    /// the whole join, the earliest joined tick is used and the resolution is
    /// marked saturated.
    pub fn resolve(&self, kill: &KillEvent) -> Result<EngagementResolution, CoverageGap> {
        if !kill.has_valid_participants() {
            return Err(CoverageGap::InvalidParticipants);
        }

        let lo = window_start(kill.tick, self.config);
        let attacker = self.store.samples_in_range(kill.attacker, lo, kill.tick);
        let victim = self.store.samples_in_range(kill.victim, lo, kill.tick);
        if attacker.is_empty() || victim.is_empty() {
            return Err(CoverageGap::NoOverlappingTrace);
        }

        let mut joined = join_on_tick(attacker, victim);
        // Newest first, regardless of how the store handed the samples over
        joined.sort_unstable_by(|x, y| y.0.tick.cmp(&x.0.tick));

        let mut spotted: Option<Tick> = None;
        let mut saturated = true;
        for (att, vic) in joined {
            if self.eyes_see(att, vic) {
                spotted = Some(att.tick);
                continue;
            }
            if spotted.is_none() {
                // Not visible on the newest shared tick: no onset to measure
                return Err(if att.tick == kill.tick {
                    CoverageGap::NotVisibleAtKill
                } else {
                    CoverageGap::NotVisibleWhenLastSeen
                });
            }
            spotted = Some(att.tick + 1);
            saturated = false;
            break;
        }

        let Some(spotted_tick) = spotted else {
            return Err(CoverageGap::NoOverlappingTrace);
        };

        Ok(EngagementResolution {
            kill_tick: kill.tick,
            spotted_tick,
            attacker: kill.attacker,
            victim: kill.victim,
            saturated,
        })
    }
}
