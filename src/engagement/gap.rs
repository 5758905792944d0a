use serde::Serialize;
use std::collections::BTreeMap;

/// Why a kill produced no sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageGap {
    /// Self-kill, world kill or missing participant
    InvalidParticipants,
    /// Attacker or victim has no alive sample in the lookback window, or their ticks never overlap
    NoOverlappingTrace,
    /// Victim not visible on the kill tick itself
    NotVisibleAtKill,
    /// Kill tick unsampled and the victim not visible on the latest tick both share
    NotVisibleWhenLastSeen,
    /// Kill speed above the configured ceiling
    KillSpeedAboveCeiling,
    /// Attacker fired no shot between spotting and killing
    NoQualifyingShot,
    /// Reaction ticks negative or above the configured ceiling
    ReactionOutOfRange,
}

impl CoverageGap {
    pub fn as_str(self) -> &'static str {
        match self {
            CoverageGap::InvalidParticipants => "invalid_participants",
            CoverageGap::NoOverlappingTrace => "no_overlapping_trace",
            CoverageGap::NotVisibleAtKill => "not_visible_at_kill",
            CoverageGap::NotVisibleWhenLastSeen => "not_visible_when_last_seen",
            CoverageGap::KillSpeedAboveCeiling => "kill_speed_above_ceiling",
            CoverageGap::NoQualifyingShot => "no_qualifying_shot",
            CoverageGap::ReactionOutOfRange => "reaction_out_of_range",
        }
    }
}

/// Gap tallies for diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GapCounts(BTreeMap<CoverageGap, usize>);

impl GapCounts {
    pub fn record(&mut self, gap: CoverageGap) {
        *self.0.entry(gap).or_insert(0) += 1;
    }

    pub fn get(&self, gap: CoverageGap) -> usize {
        self.0.get(&gap).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CoverageGap, usize)> + '_ {
        self.0.iter().map(|(&gap, &count)| (gap, count))
    }
}
