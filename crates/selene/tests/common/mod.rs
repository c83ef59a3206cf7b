#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use selene::{normalize360, ChartOracle, ChartSnapshot, GeoLocation, Result};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const SYNODIC_DAYS: f64 = 29.53;
pub const SUN_DEG_PER_DAY: f64 = 0.9856;
pub const TROPICAL_YEAR_DAYS: f64 = 365.2422;

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap()
}

pub fn days_since(origin: DateTime<Utc>, instant: DateTime<Utc>) -> f64 {
    (instant - origin).num_milliseconds() as f64 / 86_400_000.0
}

pub fn days_after(origin: DateTime<Utc>, days: f64) -> DateTime<Utc> {
    origin + Duration::milliseconds((days * 86_400_000.0).round() as i64)
}

pub fn snapshot(instant: DateTime<Utc>, sun: f64, moon: f64) -> ChartSnapshot {
    ChartSnapshot {
        instant,
        sun_lon: normalize360(sun),
        moon_lon: normalize360(moon),
        ascendant: None,
        mc: None,
        houses: None,
        julian_day: 0.0,
        planets: Default::default(),
    }
}

/// Moon conjoins the Sun 10 days after [`epoch`] and every 29.53 days after.
pub struct LunationOracle;

#[async_trait]
impl ChartOracle for LunationOracle {
    async fn chart_at(&self, instant: DateTime<Utc>, _location: GeoLocation) -> Result<ChartSnapshot> {
        let d = days_since(epoch(), instant);
        let sun = 280.0 + SUN_DEG_PER_DAY * d;
        let moon = sun + 360.0 * (d - 10.0) / SYNODIC_DAYS;
        Ok(snapshot(instant, sun, moon))
    }
}

/// Same chart at every instant.
pub struct ConstantOracle {
    pub sun: f64,
    pub moon: f64,
    pub ascendant: Option<f64>,
}

#[async_trait]
impl ChartOracle for ConstantOracle {
    async fn chart_at(&self, instant: DateTime<Utc>, _location: GeoLocation) -> Result<ChartSnapshot> {
        let mut snap = snapshot(instant, self.sun, self.moon);
        snap.ascendant = self.ascendant;
        Ok(snap)
    }
}

/// Sun reaches 0° at 2024-03-20 03:06 UTC and moves uniformly over a
/// tropical year.
pub struct SolarOracle;

pub fn reference_ingress() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 20, 3, 6, 0).unwrap()
}

pub fn expected_ingress(year: i32) -> DateTime<Utc> {
    days_after(reference_ingress(), (year - 2024) as f64 * TROPICAL_YEAR_DAYS)
}

#[async_trait]
impl ChartOracle for SolarOracle {
    async fn chart_at(&self, instant: DateTime<Utc>, _location: GeoLocation) -> Result<ChartSnapshot> {
        let d = days_since(reference_ingress(), instant);
        Ok(snapshot(instant, 360.0 * d / TROPICAL_YEAR_DAYS, 0.0))
    }
}

/// Counts every call reaching the wrapped oracle.
pub struct CountingOracle<O> {
    pub inner: O,
    pub calls: AtomicUsize,
}

impl<O> CountingOracle<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<O: ChartOracle> ChartOracle for CountingOracle<O> {
    async fn chart_at(&self, instant: DateTime<Utc>, location: GeoLocation) -> Result<ChartSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.chart_at(instant, location).await
    }
}

/// Serve every connection with the same HTTP response until the test ends.
pub async fn serve_fixed(status: u16, body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                read_request(&mut socket).await;
                let response = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let Ok(n) = socket.read(&mut chunk).await else {
            return;
        };
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let length = text[..header_end]
                .lines()
                .find_map(|l| {
                    let (k, v) = l.split_once(':')?;
                    k.eq_ignore_ascii_case("content-length")
                        .then(|| v.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + length {
                return;
            }
        }
    }
}
