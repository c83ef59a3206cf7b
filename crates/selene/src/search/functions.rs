//! Angular value functions of time evaluated through the oracle.

use crate::angles::waxing_separation;
use crate::ephemeris::{ChartOracle, GeoLocation};
use crate::error::Result;
use crate::progression::progressed_instant;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// An angle (degrees) that varies over time. Each evaluation may be a
/// network round trip.
#[async_trait]
pub trait AngularFunction: Send + Sync {
    async fn value_at(&self, instant: DateTime<Utc>) -> Result<f64>;
}

/// Progressed Moon's lead over the progressed Sun, as a function of the
/// lived (as-of) instant.
pub struct ProgressedSeparation<'a, O: ?Sized> {
    oracle: &'a O,
    birth: DateTime<Utc>,
    location: GeoLocation,
}

impl<'a, O: ChartOracle + ?Sized> ProgressedSeparation<'a, O> {
    pub fn new(oracle: &'a O, birth: DateTime<Utc>, location: GeoLocation) -> Self {
        Self {
            oracle,
            birth,
            location,
        }
    }
}

#[async_trait]
impl<'a, O: ChartOracle + ?Sized> AngularFunction for ProgressedSeparation<'a, O> {
    async fn value_at(&self, instant: DateTime<Utc>) -> Result<f64> {
        let progressed = progressed_instant(self.birth, instant);
        let chart = self.oracle.chart_at(progressed, self.location).await?;
        Ok(waxing_separation(chart.moon_lon, chart.sun_lon))
    }
}

/// Transiting (unprogressed) Sun longitude.
pub struct SunLongitude<'a, O: ?Sized> {
    oracle: &'a O,
    location: GeoLocation,
}

impl<'a, O: ChartOracle + ?Sized> SunLongitude<'a, O> {
    pub fn new(oracle: &'a O, location: GeoLocation) -> Self {
        Self { oracle, location }
    }
}

#[async_trait]
impl<'a, O: ChartOracle + ?Sized> AngularFunction for SunLongitude<'a, O> {
    async fn value_at(&self, instant: DateTime<Utc>) -> Result<f64> {
        Ok(self.oracle.chart_at(instant, self.location).await?.sun_lon)
    }
}
