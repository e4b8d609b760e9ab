//! Argument value types shared by the booking actions.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated latitude/longitude pair.
///
/// Deserializes from `{"latitude": .., "longitude": ..}` where each value
/// is a JSON number or a numeric string (the model sends both).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinates")]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, String> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(format!("latitude {latitude} is outside [-90, 90]"));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(format!("longitude {longitude} is outside [-180, 180]"));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCoordinates {
    latitude: NumberOrText,
    longitude: NumberOrText,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    fn value(self, field: &str) -> Result<f64, String> {
        match self {
            Self::Number(n) => Ok(n),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| format!("{field} '{s}' is not a number")),
        }
    }
}

impl TryFrom<RawCoordinates> for Coordinates {
    type Error = String;

    fn try_from(raw: RawCoordinates) -> Result<Self, Self::Error> {
        Coordinates::new(raw.latitude.value("latitude")?, raw.longitude.value("longitude")?)
    }
}

/// A pickup moment that includes a time of day.
///
/// Accepts RFC 3339 (`2024-01-01T09:00:00-05:00`) or a local timestamp
/// (`2024-01-01T09:00:00`, `2024-01-01T09:00`, space separator allowed).
/// A bare date is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PickupTime {
    /// Carries an explicit UTC offset
    Zoned(DateTime<FixedOffset>),
    /// Passenger's local time
    Local(NaiveDateTime),
}

const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
];

impl PickupTime {
    pub fn parse(input: &str) -> Result<Self, String> {
        let input = input.trim();
        if let Ok(zoned) = DateTime::parse_from_rfc3339(input) {
            return Ok(Self::Zoned(zoned));
        }
        for format in LOCAL_FORMATS {
            if let Ok(local) = NaiveDateTime::parse_from_str(input, format) {
                return Ok(Self::Local(local));
            }
        }
        if chrono::NaiveDate::parse_from_str(input, "%Y-%m-%d").is_ok() {
            return Err(format!("pickup time '{input}' has a date but no time of day"));
        }
        Err(format!("pickup time '{input}' is not a date and time"))
    }
}

impl TryFrom<String> for PickupTime {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PickupTime> for String {
    fn from(value: PickupTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for PickupTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zoned(t) => write!(f, "{}", t.to_rfc3339()),
            Self::Local(t) => write!(f, "{}", t.format("%Y-%m-%dT%H:%M:%S")),
        }
    }
}
