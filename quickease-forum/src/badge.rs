use std::collections::BTreeSet;

use chrono::Duration;

use crate::api::{BadgeId, BadgeStats, Time, BADGE_TABLE};

/// Default minimal delay between two badge evaluations for one user
pub fn default_check_interval() -> Duration {
    Duration::minutes(10)
}

/// Badges `stats` qualifies for that are not in `held` yet, in `BADGE_TABLE` order
pub fn newly_qualified(stats: &BadgeStats, held: &BTreeSet<BadgeId>) -> Vec<BadgeId> {
    BADGE_TABLE
        .iter()
        .filter(|(badge, stat, threshold)| !held.contains(badge) && stats.get(*stat) >= *threshold)
        .map(|(badge, _, _)| *badge)
        .collect()
}

/// Whether a badge check last run at `last` may run again at `now`
///
/// Callers must claim the check atomically: read `last`, and only if this
/// returns true store `now` in place of `last`, failing if `last` changed
/// in-between.
pub fn check_is_stale(last: Option<Time>, now: Time, interval: Duration) -> bool {
    match last {
        None => true,
        Some(last) => last + interval <= now,
    }
}
