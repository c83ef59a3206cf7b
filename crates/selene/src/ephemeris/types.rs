use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Unix epoch expressed as a Julian Day.
const UNIX_EPOCH_JD: f64 = 2_440_587.5;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Geographic location coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoLocation {
    pub lat: f64,
    pub lon: f64,
}

impl GeoLocation {
    /// Used when only Sun/Moon longitudes are needed.
    pub const ORIGIN: GeoLocation = GeoLocation { lat: 0.0, lon: 0.0 };

    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Immutable result of one oracle call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSnapshot {
    /// Instant the oracle computed, truncated to its one-minute resolution
    pub instant: DateTime<Utc>,
    pub sun_lon: f64,
    pub moon_lon: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ascendant: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mc: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub houses: Option<Vec<f64>>,
    pub julian_day: f64,
    /// Every planet longitude the oracle returned, sun and moon included
    #[serde(default)]
    pub planets: BTreeMap<String, f64>,
}

/// Cache key: instant at minute resolution plus the location rounded to
/// 1e-4 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChartKey {
    pub minute: i64,
    pub lat_e4: i64,
    pub lon_e4: i64,
}

impl ChartKey {
    pub fn new(instant: DateTime<Utc>, location: GeoLocation) -> Self {
        Self {
            minute: instant.timestamp().div_euclid(60),
            lat_e4: (location.lat * 1e4).round() as i64,
            lon_e4: (location.lon * 1e4).round() as i64,
        }
    }
}

/// Drop seconds and sub-seconds, matching what the oracle is sent.
pub fn truncate_to_minute(instant: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(instant.timestamp().div_euclid(60) * 60, 0).unwrap_or(instant)
}

/// Convert a UTC instant to a Julian Day number.
pub fn julian_day(instant: DateTime<Utc>) -> f64 {
    instant.timestamp_millis() as f64 / 1000.0 / SECONDS_PER_DAY + UNIX_EPOCH_JD
}

/// Body POSTed to the oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleRequest {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub latitude: f64,
    pub longitude: f64,
}

impl OracleRequest {
    pub fn new(instant: DateTime<Utc>, location: GeoLocation) -> Self {
        Self {
            year: instant.year(),
            month: instant.month(),
            day: instant.day(),
            hour: instant.hour(),
            minute: instant.minute(),
            latitude: location.lat,
            longitude: location.lon,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OracleResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub data: Option<OracleData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OracleData {
    #[serde(default)]
    pub julian_day: Option<f64>,
    #[serde(default)]
    pub planets: HashMap<String, OraclePlanet>,
    #[serde(default)]
    pub houses: Option<Vec<f64>>,
    #[serde(default)]
    pub ascendant: Option<f64>,
    #[serde(default)]
    pub mc: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OraclePlanet {
    #[serde(default)]
    pub lon: Option<f64>,
}
