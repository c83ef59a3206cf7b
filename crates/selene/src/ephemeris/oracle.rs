use crate::angles::normalize360;
use crate::cache::TtlCache;
use crate::ephemeris::types::{
    julian_day, truncate_to_minute, ChartKey, ChartSnapshot, GeoLocation, OracleData,
    OracleRequest, OracleResponse,
};
use crate::error::{CycleError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use std::collections::BTreeMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

pub const ORACLE_URL_ENV: &str = "SELENE_ORACLE_URL";
pub const DEFAULT_ORACLE_URL: &str = "http://127.0.0.1:8001/chart";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub type ChartCache = TtlCache<ChartKey, ChartSnapshot>;

/// Source of chart snapshots. Every call is one ephemeris evaluation.
#[async_trait]
pub trait ChartOracle: Send + Sync {
    async fn chart_at(&self, instant: DateTime<Utc>, location: GeoLocation)
        -> Result<ChartSnapshot>;
}

#[async_trait]
impl<T: ChartOracle + ?Sized> ChartOracle for Arc<T> {
    async fn chart_at(
        &self,
        instant: DateTime<Utc>,
        location: GeoLocation,
    ) -> Result<ChartSnapshot> {
        (**self).chart_at(instant, location).await
    }
}

#[async_trait]
impl<T: ChartOracle + ?Sized> ChartOracle for &T {
    async fn chart_at(
        &self,
        instant: DateTime<Utc>,
        location: GeoLocation,
    ) -> Result<ChartSnapshot> {
        (**self).chart_at(instant, location).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OracleSettings {
    /// Absolute chart endpoint
    pub endpoint: String,
    /// Base the endpoint path is re-resolved against after a network failure
    pub fallback_base: Option<String>,
    pub timeout: Duration,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ORACLE_URL.to_string(),
            fallback_base: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl OracleSettings {
    /// Defaults, with the endpoint taken from `SELENE_ORACLE_URL` when set.
    pub fn from_env() -> Self {
        let endpoint = env::var(ORACLE_URL_ENV).unwrap_or_else(|_| DEFAULT_ORACLE_URL.to_string());
        Self {
            endpoint,
            ..Self::default()
        }
    }
}

/// Ephemeris oracle reached over HTTP.
///
/// A request goes to the absolute endpoint first. If that fails at the
/// network level and a fallback base is configured, the endpoint's path is
/// resolved against the base and tried exactly once more. Non-success
/// statuses are never retried.
pub struct HttpOracle {
    client: Client,
    endpoint: Url,
    fallback: Option<Url>,
    cache: Option<Arc<ChartCache>>,
}

impl HttpOracle {
    pub fn new(settings: &OracleSettings, cache: Option<Arc<ChartCache>>) -> Result<Self> {
        let endpoint = Url::parse(&settings.endpoint).map_err(|e| {
            CycleError::InvalidConfig(format!("oracle endpoint {:?}: {}", settings.endpoint, e))
        })?;
        let fallback = match &settings.fallback_base {
            Some(base) => Some(resolve_fallback(base, &endpoint)?),
            None => None,
        };
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| CycleError::InvalidConfig(format!("http client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            fallback,
            cache,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn fallback(&self) -> Option<&Url> {
        self.fallback.as_ref()
    }

    async fn post(&self, url: &Url, request: &OracleRequest) -> reqwest::Result<reqwest::Response> {
        self.client.post(url.clone()).json(request).send().await
    }

    async fn fetch(&self, request: &OracleRequest) -> Result<Vec<u8>> {
        let response = match self.post(&self.endpoint, request).await {
            Ok(response) => response,
            Err(primary) => match &self.fallback {
                Some(fallback) => {
                    log::warn!(
                        "oracle {} unreachable ({}), retrying via {}",
                        self.endpoint,
                        primary,
                        fallback
                    );
                    self.post(fallback, request)
                        .await
                        .map_err(|e| CycleError::OracleUnavailable {
                            message: format!("{} (after fallback from: {})", e, primary),
                        })?
                }
                None => {
                    return Err(CycleError::OracleUnavailable {
                        message: primary.to_string(),
                    })
                }
            },
        };

        let status = response.status();
        if !status.is_success() {
            return Err(CycleError::OracleUnavailable {
                message: format!("HTTP {}", status),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CycleError::OracleUnavailable {
                message: format!("reading response body: {}", e),
            })?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl ChartOracle for HttpOracle {
    async fn chart_at(
        &self,
        instant: DateTime<Utc>,
        location: GeoLocation,
    ) -> Result<ChartSnapshot> {
        let key = ChartKey::new(instant, location);
        if let Some(cache) = &self.cache {
            if let Some(snapshot) = cache.get(&key) {
                return Ok(snapshot);
            }
        }

        let request = OracleRequest::new(instant, location);
        let body = self.fetch(&request).await?;
        let snapshot = parse_chart_response(instant, &body)?;

        Ok(match &self.cache {
            Some(cache) => cache.set(key, snapshot),
            None => snapshot,
        })
    }
}

fn resolve_fallback(base: &str, endpoint: &Url) -> Result<Url> {
    let base = Url::parse(base)
        .map_err(|e| CycleError::InvalidConfig(format!("oracle fallback base {:?}: {}", base, e)))?;
    let mut relative = endpoint.path().to_string();
    if let Some(query) = endpoint.query() {
        relative.push('?');
        relative.push_str(query);
    }
    base.join(&relative)
        .map_err(|e| CycleError::InvalidConfig(format!("oracle fallback path: {}", e)))
}

/// Validate and normalize an oracle response body.
///
/// `ok: false` is reported as [`CycleError::OracleUnavailable`]; a body that
/// is not the documented JSON, or lacks finite `sun.lon` / `moon.lon`, as
/// [`CycleError::OracleMalformed`].
pub fn parse_chart_response(instant: DateTime<Utc>, body: &[u8]) -> Result<ChartSnapshot> {
    let response: OracleResponse =
        serde_json::from_slice(body).map_err(|e| CycleError::OracleMalformed {
            message: format!("invalid JSON: {}", e),
        })?;

    if !response.ok {
        return Err(CycleError::OracleUnavailable {
            message: response
                .error
                .unwrap_or_else(|| "oracle reported failure".to_string()),
        });
    }

    let data = response.data.ok_or_else(|| CycleError::OracleMalformed {
        message: "missing data".to_string(),
    })?;

    let sun_lon = required_longitude(&data, "sun")?;
    let moon_lon = required_longitude(&data, "moon")?;

    let planets: BTreeMap<String, f64> = data
        .planets
        .iter()
        .filter_map(|(name, planet)| match planet.lon {
            Some(lon) if lon.is_finite() => Some((name.to_lowercase(), normalize360(lon))),
            _ => None,
        })
        .collect();

    let instant = truncate_to_minute(instant);
    let julian_day = data
        .julian_day
        .filter(|jd| jd.is_finite())
        .unwrap_or_else(|| julian_day(instant));

    Ok(ChartSnapshot {
        instant,
        sun_lon,
        moon_lon,
        ascendant: finite_angle(data.ascendant),
        mc: finite_angle(data.mc),
        houses: data
            .houses
            .map(|cusps| cusps.into_iter().map(normalize360).collect())
            .filter(|cusps: &Vec<f64>| cusps.iter().all(|c| c.is_finite())),
        julian_day,
        planets,
    })
}

fn required_longitude(data: &OracleData, body: &str) -> Result<f64> {
    match data.planets.get(body).and_then(|p| p.lon) {
        Some(lon) if lon.is_finite() => Ok(normalize360(lon)),
        Some(lon) => Err(CycleError::OracleMalformed {
            message: format!("{}.lon is not finite: {}", body, lon),
        }),
        None => Err(CycleError::OracleMalformed {
            message: format!("missing {}.lon", body),
        }),
    }
}

fn finite_angle(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite()).map(normalize360)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 30).unwrap()
    }

    #[test]
    fn parses_and_normalizes_full_response() {
        let body = br#"{
            "ok": true,
            "data": {
                "julianDay": 2460463.0,
                "planets": {"sun": {"lon": 431.5}, "moon": {"lon": -20.0}, "Mars": {"lon": 10.0}},
                "houses": [370.0, 30.0],
                "ascendant": -5.0,
                "mc": 275.0
            }
        }"#;
        let snap = parse_chart_response(instant(), body).unwrap();
        assert!((snap.sun_lon - 71.5).abs() < 1e-9);
        assert!((snap.moon_lon - 340.0).abs() < 1e-9);
        assert_eq!(snap.ascendant, Some(355.0));
        assert_eq!(snap.mc, Some(275.0));
        assert_eq!(snap.houses.as_deref(), Some(&[10.0, 30.0][..]));
        assert_eq!(snap.planets.get("mars"), Some(&10.0));
        assert_eq!(snap.julian_day, 2460463.0);
        assert_eq!(snap.instant, Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let body = br#"{"ok": true, "data": {"planets": {"sun": {"lon": 1.0}, "moon": {"lon": 2.0}}}}"#;
        let snap = parse_chart_response(instant(), body).unwrap();
        assert_eq!(snap.ascendant, None);
        assert_eq!(snap.houses, None);
        assert!((snap.julian_day - julian_day(snap.instant)).abs() < 1e-9);
    }

    #[test]
    fn missing_moon_is_malformed() {
        let body = br#"{"ok": true, "data": {"planets": {"sun": {"lon": 1.0}}}}"#;
        let err = parse_chart_response(instant(), body).unwrap_err();
        assert!(matches!(err, CycleError::OracleMalformed { .. }), "{err:?}");
        assert!(err.to_string().contains("moon.lon"));
    }

    #[test]
    fn non_numeric_longitude_is_malformed() {
        let body = br#"{"ok": true, "data": {"planets": {"sun": {"lon": "12"}, "moon": {"lon": 2.0}}}}"#;
        let err = parse_chart_response(instant(), body).unwrap_err();
        assert!(matches!(err, CycleError::OracleMalformed { .. }));
    }

    #[test]
    fn not_ok_is_unavailable() {
        let body = br#"{"ok": false, "error": "ephemeris files missing"}"#;
        let err = parse_chart_response(instant(), body).unwrap_err();
        assert_eq!(
            err,
            CycleError::OracleUnavailable {
                message: "ephemeris files missing".into()
            }
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let err = parse_chart_response(instant(), b"<html>502</html>").unwrap_err();
        assert!(matches!(err, CycleError::OracleMalformed { .. }));
    }

    #[test]
    fn fallback_keeps_endpoint_path() {
        let settings = OracleSettings {
            endpoint: "http://astro.example:8001/api/chart?v=2".into(),
            fallback_base: Some("http://127.0.0.1:9000".into()),
            timeout: Duration::from_secs(1),
        };
        let oracle = HttpOracle::new(&settings, None).unwrap();
        assert_eq!(
            oracle.fallback().map(|u| u.as_str()),
            Some("http://127.0.0.1:9000/api/chart?v=2")
        );
    }

    #[test]
    fn bad_endpoint_is_config_error() {
        let settings = OracleSettings {
            endpoint: "not a url".into(),
            ..OracleSettings::default()
        };
        assert!(matches!(
            HttpOracle::new(&settings, None),
            Err(CycleError::InvalidConfig(_))
        ));
    }
}
