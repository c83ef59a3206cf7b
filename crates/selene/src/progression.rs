//! Secondary ("day-for-year") progression.
//!
//! Each year lived after birth maps to one day of ephemeris time after birth.

use crate::ephemeris::{ChartOracle, GeoLocation};
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const MS_PER_DAY: f64 = 86_400_000.0;
pub const DAYS_PER_YEAR: f64 = 365.2425;

/// Progressed instant for `as_of`: birth plus one day per year of age.
pub fn progressed_instant(birth: DateTime<Utc>, as_of: DateTime<Utc>) -> DateTime<Utc> {
    let age_days = (as_of - birth).num_milliseconds() as f64 / MS_PER_DAY;
    let age_years = age_days / DAYS_PER_YEAR;
    birth + Duration::milliseconds((age_years * MS_PER_DAY).round() as i64)
}

/// Angles read from the oracle at a progressed instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressedAngles {
    pub progressed_instant: DateTime<Utc>,
    pub sun_lon: f64,
    pub moon_lon: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ascendant: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mc: Option<f64>,
}

/// Progress `as_of` and read the chart there. Oracle errors pass through.
pub async fn progressed_angles<O: ChartOracle + ?Sized>(
    oracle: &O,
    birth: DateTime<Utc>,
    as_of: DateTime<Utc>,
    location: GeoLocation,
) -> Result<ProgressedAngles> {
    let progressed = progressed_instant(birth, as_of);
    let chart = oracle.chart_at(progressed, location).await?;
    Ok(ProgressedAngles {
        progressed_instant: progressed,
        sun_lon: chart.sun_lon,
        moon_lon: chart.moon_lon,
        ascendant: chart.ascendant,
        mc: chart.mc,
    })
}
