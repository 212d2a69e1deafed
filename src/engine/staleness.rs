//! Freshness evaluation for provider data.
//!
//! A provider's figures are shown only while its own update timestamp is
//! recent enough. The window is configured per provider and per context
//! (single-team card vs. league table). Stale providers are dropped from
//! the snapshot, never zero-filled.

use chrono::{DateTime, FixedOffset, Utc};
use tracing::debug;

use crate::config::FreshnessConfig;
use crate::types::ProviderOdds;

const SECONDS_PER_DAY: i64 = 86_400;

/// Which kind of post the data is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshnessContext {
    Team,
    League,
}

/// Whole days elapsed since `timestamp`, rounded down.
pub fn age_in_days(timestamp: &DateTime<FixedOffset>, now: DateTime<Utc>) -> i64 {
    let age = now.signed_duration_since(timestamp.with_timezone(&Utc));
    age.num_seconds().div_euclid(SECONDS_PER_DAY)
}

pub fn is_fresh(timestamp: &DateTime<FixedOffset>, now: DateTime<Utc>, threshold_days: i64) -> bool {
    age_in_days(timestamp, now) < threshold_days
}

/// Keep only the providers whose data is fresh for `context`.
pub fn fresh_providers<'a>(
    fetched: &'a [ProviderOdds],
    context: FreshnessContext,
    freshness: &FreshnessConfig,
    now: DateTime<Utc>,
) -> Vec<&'a ProviderOdds> {
    fetched
        .iter()
        .filter(|odds| {
            let window = freshness.window(odds.provider);
            let threshold = match context {
                FreshnessContext::Team => window.team_days,
                FreshnessContext::League => window.league_days,
            };
            let fresh = is_fresh(&odds.last_update, now, threshold);
            if !fresh {
                debug!(
                    provider = %odds.provider,
                    age_days = age_in_days(&odds.last_update, now),
                    threshold,
                    context = ?context,
                    "Provider data is stale"
                );
            }
            fresh
        })
        .collect()
}
