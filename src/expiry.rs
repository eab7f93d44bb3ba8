//! Coarse "time until expiry" buckets.

use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

pub const HOURS_PER_DAY: i64 = 24;
pub const HOURS_PER_WEEK: i64 = HOURS_PER_DAY * 7;
pub const HOURS_PER_YEAR: i64 = HOURS_PER_WEEK * 52;

/// How long until a certificate expires, rounded down to a whole unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeToExpiry {
    Expired,
    UnderAnHour,
    Hours(i64),
    Days(i64),
    Weeks(i64),
    Years(i64),
}

impl fmt::Display for TimeToExpiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeToExpiry::Expired => write!(f, "expired"),
            TimeToExpiry::UnderAnHour => write!(f, "<1h"),
            TimeToExpiry::Hours(n) => write!(f, "{}h", n),
            TimeToExpiry::Days(n) => write!(f, "{}d", n),
            TimeToExpiry::Weeks(n) => write!(f, "{}w", n),
            TimeToExpiry::Years(n) => write!(f, "{}y", n),
        }
    }
}

impl Serialize for TimeToExpiry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Whole hours from `now` to `expiry`, rounded towards negative infinity.
pub fn hours_remaining(expiry: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let remaining = expiry - now;
    // num_hours truncates towards zero
    let hours = remaining.num_hours();
    if remaining < Duration::hours(hours) {
        hours - 1
    } else {
        hours
    }
}

/// Buckets the distance from `now` to `expiry`.
///
/// Boundaries are inclusive at the top: exactly 24 hours is `24h`, 25 hours
/// is `1d`, exactly one week is `7d`.
pub fn classify(expiry: DateTime<Utc>, now: DateTime<Utc>) -> TimeToExpiry {
    let hours = hours_remaining(expiry, now);
    match hours {
        h if h < 0 => TimeToExpiry::Expired,
        0 => TimeToExpiry::UnderAnHour,
        h if h <= HOURS_PER_DAY => TimeToExpiry::Hours(h),
        h if h <= HOURS_PER_WEEK => TimeToExpiry::Days(h / HOURS_PER_DAY),
        h if h <= HOURS_PER_YEAR => TimeToExpiry::Weeks(h / HOURS_PER_WEEK),
        h => TimeToExpiry::Years(h / HOURS_PER_YEAR),
    }
}
