//! Subscription activity evaluation and the grant ledger.
//!
//! Activity is always computed at read time from `is_active` and
//! `expires_at`; nothing ever flips a grant inactive when it expires.

mod ledger;

pub use ledger::{MAX_GRANT_DAYS, SubscriptionLedger};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::SubscriptionGrant;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Display tier for a subscription. Never an authorization input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Healthy,
    Warning,
    Critical,
}

/// A grant is active iff it is flagged active and has not yet expired.
#[must_use]
pub fn is_active(grant: &SubscriptionGrant, now: DateTime<Utc>) -> bool {
    grant.is_active && grant.expires_at > now
}

/// Activity of an optional grant; no grant means no access.
#[must_use]
pub fn has_active(grant: Option<&SubscriptionGrant>, now: DateTime<Utc>) -> bool {
    grant.is_some_and(|g| is_active(g, now))
}

/// Whole days until expiry, rounded up. Negative once expired.
#[must_use]
pub fn days_remaining(grant: &SubscriptionGrant, now: DateTime<Utc>) -> i64 {
    let millis = (grant.expires_at - now).num_milliseconds();
    (millis as f64 / MILLIS_PER_DAY).ceil() as i64
}

#[must_use]
pub fn tier(grant: &SubscriptionGrant, now: DateTime<Utc>) -> SubscriptionTier {
    if !is_active(grant, now) {
        return SubscriptionTier::Critical;
    }
    match days_remaining(grant, now) {
        d if d > 7 => SubscriptionTier::Healthy,
        d if d > 3 => SubscriptionTier::Warning,
        _ => SubscriptionTier::Critical,
    }
}
