//! Per-report memoization of oracle calls.
//!
//! Nested searches revisit the same candidate instants; a `MemoOracle` lives
//! for one report and answers repeats at the same (minute, location) without
//! another round trip.

use crate::ephemeris::oracle::ChartOracle;
use crate::ephemeris::types::{ChartKey, ChartSnapshot, GeoLocation};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct MemoOracle<O> {
    inner: O,
    memo: Mutex<HashMap<ChartKey, ChartSnapshot>>,
    misses: AtomicUsize,
}

impl<O: ChartOracle> MemoOracle<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            memo: Mutex::new(HashMap::new()),
            misses: AtomicUsize::new(0),
        }
    }

    /// Number of calls forwarded to the wrapped oracle.
    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.memo.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &ChartKey) -> Option<ChartSnapshot> {
        self.memo.lock().ok().and_then(|m| m.get(key).cloned())
    }

    fn remember(&self, key: ChartKey, snapshot: &ChartSnapshot) {
        if let Ok(mut memo) = self.memo.lock() {
            memo.entry(key).or_insert_with(|| snapshot.clone());
        }
    }
}

#[async_trait]
impl<O: ChartOracle> ChartOracle for MemoOracle<O> {
    async fn chart_at(
        &self,
        instant: DateTime<Utc>,
        location: GeoLocation,
    ) -> Result<ChartSnapshot> {
        let key = ChartKey::new(instant, location);
        if let Some(snapshot) = self.lookup(&key) {
            return Ok(snapshot);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let snapshot = self.inner.chart_at(instant, location).await?;
        self.remember(key, &snapshot);
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CycleError;
    use chrono::{Duration, TimeZone};

    struct Fixed;

    #[async_trait]
    impl ChartOracle for Fixed {
        async fn chart_at(
            &self,
            instant: DateTime<Utc>,
            _location: GeoLocation,
        ) -> Result<ChartSnapshot> {
            if instant.timestamp() < 0 {
                return Err(CycleError::OracleUnavailable {
                    message: "before epoch".into(),
                });
            }
            Ok(ChartSnapshot {
                instant,
                sun_lon: 10.0,
                moon_lon: 20.0,
                ascendant: None,
                mc: None,
                houses: None,
                julian_day: 0.0,
                planets: Default::default(),
            })
        }
    }

    #[tokio::test]
    async fn repeats_within_a_minute_hit_the_memo() {
        let memo = MemoOracle::new(Fixed);
        let t = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 5).unwrap();
        memo.chart_at(t, GeoLocation::ORIGIN).await.unwrap();
        memo.chart_at(t + Duration::seconds(30), GeoLocation::ORIGIN)
            .await
            .unwrap();
        assert_eq!(memo.misses(), 1);

        memo.chart_at(t + Duration::minutes(1), GeoLocation::ORIGIN)
            .await
            .unwrap();
        memo.chart_at(t, GeoLocation::new(1.0, 1.0)).await.unwrap();
        assert_eq!(memo.misses(), 3);
        assert_eq!(memo.len(), 3);
    }

    #[tokio::test]
    async fn errors_are_not_memoized() {
        let memo = MemoOracle::new(Fixed);
        let t = Utc.with_ymd_and_hms(1969, 12, 31, 0, 0, 0).unwrap();
        assert!(memo.chart_at(t, GeoLocation::ORIGIN).await.is_err());
        assert!(memo.chart_at(t, GeoLocation::ORIGIN).await.is_err());
        assert_eq!(memo.misses(), 2);
        assert!(memo.is_empty());
    }
}
