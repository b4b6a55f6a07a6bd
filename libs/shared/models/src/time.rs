use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid time label: {0}")]
pub struct TimeLabelError(pub String);

/// A half-hour-grid time of day. Appointments are stored with a 12-hour
/// display label ("2:30 PM"); the label is parsed once at the boundary and
/// kept only for formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotTime(NaiveTime);

impl SlotTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(SlotTime)
    }

    pub fn as_time(&self) -> NaiveTime {
        self.0
    }
}

impl FromStr for SlotTime {
    type Err = TimeLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split_whitespace();
        let clock = parts.next().ok_or_else(|| TimeLabelError(s.to_string()))?;
        // A missing meridiem reads as AM, matching the stored source format.
        let meridiem = parts.next().unwrap_or("AM").to_ascii_uppercase();
        if parts.next().is_some() {
            return Err(TimeLabelError(s.to_string()));
        }

        let (hour_str, minute_str) = clock
            .split_once(':')
            .ok_or_else(|| TimeLabelError(s.to_string()))?;
        let hour: u32 = hour_str.parse().map_err(|_| TimeLabelError(s.to_string()))?;
        let minute: u32 = minute_str.parse().map_err(|_| TimeLabelError(s.to_string()))?;

        if !(1..=12).contains(&hour) || minute >= 60 {
            return Err(TimeLabelError(s.to_string()));
        }

        let hour24 = match meridiem.as_str() {
            "AM" => {
                if hour == 12 {
                    0
                } else {
                    hour
                }
            }
            "PM" => {
                if hour == 12 {
                    12
                } else {
                    hour + 12
                }
            }
            _ => return Err(TimeLabelError(s.to_string())),
        };

        NaiveTime::from_hms_opt(hour24, minute, 0)
            .map(SlotTime)
            .ok_or_else(|| TimeLabelError(s.to_string()))
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hour = self.0.hour();
        let meridiem = if hour < 12 { "AM" } else { "PM" };
        let hour12 = match hour % 12 {
            0 => 12,
            h => h,
        };
        write!(f, "{}:{:02} {}", hour12, self.0.minute(), meridiem)
    }
}

impl Serialize for SlotTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(de::Error::custom)
    }
}
