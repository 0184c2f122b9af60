use std::time::Duration;

use log::debug;
use strum::Display;
use tokio::time::Instant;

use crate::{AvoidanceSettings, geometry::Bounds, geometry::Point};

/// Why bounds are excluded from selection.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
pub enum AvoidReason {
    /// The mob there was just killed and its name plate may linger.
    Killed,
    /// The mob there is already fought by someone else.
    Engaged,
    /// Clicking there did not select anything.
    FailedSelection,
    /// The mob there could not be damaged.
    Unreachable,
}

impl AvoidReason {
    fn duration(self, settings: &AvoidanceSettings) -> Duration {
        Duration::from_millis(match self {
            AvoidReason::Killed => settings.killed_millis,
            AvoidReason::Engaged => settings.engaged_millis,
            AvoidReason::FailedSelection => settings.failed_selection_millis,
            AvoidReason::Unreachable => settings.unreachable_millis,
        })
    }
}

#[derive(Clone, Copy, Debug)]
struct Avoided {
    bounds: Bounds,
    reason: AvoidReason,
    until: Instant,
}

/// Screen areas temporarily excluded from mob selection.
///
/// Entries expire independently and are pruned lazily when queried.
#[derive(Debug, Default)]
pub struct AvoidList {
    entries: Vec<Avoided>,
}

impl AvoidList {
    /// Excludes `bounds`, grown by the configured padding, for the duration of `reason`.
    pub fn add(&mut self, bounds: Bounds, reason: AvoidReason, settings: &AvoidanceSettings) {
        let bounds = bounds.grow_by(settings.grow_px);
        debug!(target: "farming", "avoiding {bounds:?} because {reason}");
        self.entries.push(Avoided {
            bounds,
            reason,
            until: Instant::now() + reason.duration(settings),
        });
    }

    /// Whether `point` lies inside any unexpired entry.
    pub fn contains(&mut self, point: Point) -> bool {
        self.prune();
        self.entries.iter().any(|entry| entry.bounds.contains(point))
    }

    /// Number of unexpired entries with `reason`.
    pub fn count(&mut self, reason: AvoidReason) -> usize {
        self.prune();
        self.entries
            .iter()
            .filter(|entry| entry.reason == reason)
            .count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn prune(&mut self) {
        let now = Instant::now();
        self.entries.retain(|entry| entry.until > now);
    }
}
