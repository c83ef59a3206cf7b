//! Aries ingress: the instant the transiting Sun crosses 0° longitude.
//!
//! The search scans March 18–23 UTC hour by hour, then bisects. Results are
//! cached per (year, location rounded to 0.01°) for thirty days.

use crate::cache::TtlCache;
use crate::ephemeris::{ChartOracle, GeoLocation};
use crate::error::{CycleError, Result};
use crate::search::functions::SunLongitude;
use crate::search::locator::locate_crossing;
use crate::search::types::{BoundaryEvent, SearchConfig, SearchDirection};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;

pub const ARIES_DEG: f64 = 0.0;
pub const INGRESS_CACHE_TTL_DAYS: i64 = 30;
const WINDOW_MONTH: u32 = 3;
const WINDOW_START_DAY: u32 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IngressKey {
    pub year: i32,
    pub lat_e2: i64,
    pub lon_e2: i64,
}

impl IngressKey {
    pub fn new(year: i32, location: GeoLocation) -> Self {
        Self {
            year,
            lat_e2: (location.lat * 100.0).round() as i64,
            lon_e2: (location.lon * 100.0).round() as i64,
        }
    }
}

pub type IngressCache = TtlCache<IngressKey, DateTime<Utc>>;

pub fn ingress_cache() -> IngressCache {
    TtlCache::new(Duration::days(INGRESS_CACHE_TTL_DAYS))
}

/// First instant scanned for `year`: March 18, 00:00 UTC.
pub fn window_start(year: i32) -> Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, WINDOW_MONTH, WINDOW_START_DAY, 0, 0, 0)
        .single()
        .ok_or_else(|| CycleError::input("year", &year.to_string(), "a representable calendar year"))
}

pub struct IngressLocator<O> {
    oracle: O,
    cache: Arc<IngressCache>,
    config: SearchConfig,
}

impl<O: ChartOracle> IngressLocator<O> {
    pub fn new(oracle: O, cache: Arc<IngressCache>) -> Self {
        Self {
            oracle,
            cache,
            config: SearchConfig::ingress(),
        }
    }

    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Locate (or recall) the Aries ingress of `year` for `location`.
    pub async fn aries_ingress(&self, year: i32, location: GeoLocation) -> Result<BoundaryEvent> {
        let key = IngressKey::new(year, location);
        if let Some(instant) = self.cache.get(&key) {
            log::debug!("aries ingress {} served from cache", year);
            return Ok(BoundaryEvent {
                target_deg: ARIES_DEG,
                instant,
            });
        }

        let start = window_start(year)?;
        let sun = SunLongitude::new(&self.oracle, location);
        let event =
            locate_crossing(&sun, start, ARIES_DEG, SearchDirection::Forward, &self.config).await?;

        Ok(BoundaryEvent {
            target_deg: ARIES_DEG,
            instant: self.cache.set(key, event.instant),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_rounds_location() {
        let a = IngressKey::new(2024, GeoLocation::new(40.7128, -74.0060));
        let b = IngressKey::new(2024, GeoLocation::new(40.7149, -74.0090));
        let c = IngressKey::new(2025, GeoLocation::new(40.7128, -74.0060));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn window_starts_march_18() {
        let start = window_start(2024).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 18, 0, 0, 0).unwrap());
    }

    #[test]
    fn window_covers_through_march_23() {
        let config = SearchConfig::ingress();
        let end = window_start(2024).unwrap() + config.step() * config.max_steps as i32;
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 3, 24, 0, 0, 0).unwrap());
    }

    #[test]
    fn unrepresentable_year_is_input_error() {
        assert!(matches!(
            window_start(i32::MAX),
            Err(CycleError::InputFormat { .. })
        ));
    }
}
