//! Minute-granular scheduling instant.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};

/// Instant a scheduling cycle evaluates against: UTC, truncated to the minute.
///
/// Two cycles within the same minute share a tick, so the processed marker
/// written by the first one suppresses the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tick(DateTime<Utc>);

impl Tick {
    /// ## Summary
    /// Normalizes any wall-clock instant into a tick.
    #[must_use]
    pub fn from_instant<Tz: TimeZone>(instant: &DateTime<Tz>) -> Self {
        let utc = instant.with_timezone(&Utc);
        let truncated = utc
            .with_second(0)
            .and_then(|dt| dt.with_nanosecond(0))
            .unwrap_or(utc);
        Self(truncated)
    }

    #[must_use]
    pub fn now() -> Self {
        Self::from_instant(&Utc::now())
    }

    #[must_use]
    pub const fn instant(self) -> DateTime<Utc> {
        self.0
    }

    /// Calendar day of the tick in UTC.
    #[must_use]
    pub fn date(self) -> NaiveDate {
        self.0.date_naive()
    }

    #[must_use]
    pub fn time_of_day(self) -> NaiveTime {
        self.0.time()
    }

    /// Whether `instant` is exactly this tick.
    #[must_use]
    pub fn is(self, instant: DateTime<Utc>) -> bool {
        self.0 == instant
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<Tick> for DateTime<Utc> {
    fn from(tick: Tick) -> Self {
        tick.0
    }
}
