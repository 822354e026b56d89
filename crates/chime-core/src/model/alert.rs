//! Alert offsets an event owner can choose from.

use std::fmt;
use std::str::FromStr;

use chrono::TimeDelta;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// Offset-before-start category for an event alert.
///
/// Stored as its wire string (`""` for no alert).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AlertKind {
    #[default]
    None,
    AtStart,
    FiveMinutesBefore,
    TenMinutesBefore,
    FifteenMinutesBefore,
    ThirtyMinutesBefore,
    OneHourBefore,
    TwoHoursBefore,
    OneDayBefore,
    TwoDaysBefore,
    OneWeekBefore,
}

impl AlertKind {
    pub const ALL: [Self; 11] = [
        Self::None,
        Self::AtStart,
        Self::FiveMinutesBefore,
        Self::TenMinutesBefore,
        Self::FifteenMinutesBefore,
        Self::ThirtyMinutesBefore,
        Self::OneHourBefore,
        Self::TwoHoursBefore,
        Self::OneDayBefore,
        Self::TwoDaysBefore,
        Self::OneWeekBefore,
    ];

    /// Returns the database string representation of this alert kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "",
            Self::AtStart => "at_start",
            Self::FiveMinutesBefore => "5_minutes_before",
            Self::TenMinutesBefore => "10_minutes_before",
            Self::FifteenMinutesBefore => "15_minutes_before",
            Self::ThirtyMinutesBefore => "30_minutes_before",
            Self::OneHourBefore => "1_hour_before",
            Self::TwoHoursBefore => "2_hours_before",
            Self::OneDayBefore => "1_day_before",
            Self::TwoDaysBefore => "2_days_before",
            Self::OneWeekBefore => "1_week_before",
        }
    }

    /// Label shown in the alarm header of a notification.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::None => "",
            Self::AtStart => "At the time of event",
            Self::FiveMinutesBefore => "5 minutes before",
            Self::TenMinutesBefore => "10 minutes before",
            Self::FifteenMinutesBefore => "15 minutes before",
            Self::ThirtyMinutesBefore => "30 minutes before",
            Self::OneHourBefore => "1 hour before",
            Self::TwoHoursBefore => "2 hours before",
            Self::OneDayBefore => "1 day before",
            Self::TwoDaysBefore => "2 days before",
            Self::OneWeekBefore => "1 week before",
        }
    }

    /// ## Summary
    /// Returns how long before the start the alert fires, or `None` when the
    /// event has no alert.
    #[must_use]
    pub fn offset(self) -> Option<TimeDelta> {
        let minutes = match self {
            Self::None => return None,
            Self::AtStart => 0,
            Self::FiveMinutesBefore => 5,
            Self::TenMinutesBefore => 10,
            Self::FifteenMinutesBefore => 15,
            Self::ThirtyMinutesBefore => 30,
            Self::OneHourBefore => 60,
            Self::TwoHoursBefore => 120,
            Self::OneDayBefore => 1_440,
            Self::TwoDaysBefore => 2_880,
            Self::OneWeekBefore => 10_080,
        };
        Some(TimeDelta::minutes(minutes))
    }

    /// ## Summary
    /// Computes the alert instant for an occurrence starting at `start`.
    #[must_use]
    pub fn alert_time<Tz: chrono::TimeZone>(
        self,
        start: &chrono::DateTime<Tz>,
    ) -> Option<chrono::DateTime<Tz>> {
        self.offset().map(|offset| start.clone() - offset)
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::ParseError(format!("unknown alert kind '{s}'")))
    }
}

impl Serialize for AlertKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AlertKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
