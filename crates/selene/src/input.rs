//! Report request parsing.
//!
//! Accepts either a JSON object or newline-delimited `key: value` text:
//!
//! ```text
//! birth_datetime: 1990-05-01 10:30
//! tz_offset: -04:00
//! as_of_date: 2024-06-01
//! lat: 40.7128
//! lon: -74.0060
//! cycle: progressed_lunation
//! ```

use crate::ephemeris::GeoLocation;
use crate::error::{CycleError, Result};
use crate::report::CycleKind;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

const BIRTH_FORMAT: &str = "YYYY-MM-DD HH:MM";
const OFFSET_FORMAT: &str = "±HH:MM";
const DATE_FORMAT: &str = "YYYY-MM-DD";
const MAX_OFFSET_HOURS: i64 = 14;

lazy_static::lazy_static! {
    static ref BIRTH_RE: Regex =
        Regex::new(r"^(\d{4})-(\d{2})-(\d{2})[ T](\d{2}):(\d{2})$").unwrap();
    static ref OFFSET_RE: Regex = Regex::new(r"^([+-])(\d{2}):(\d{2})$").unwrap();
    static ref DATE_RE: Regex = Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub birth: DateTime<Utc>,
    pub as_of: DateTime<Utc>,
    pub location: GeoLocation,
    pub cycle: CycleKind,
}

impl ReportRequest {
    /// Parse a request body, JSON when it starts with `{`, key/value text otherwise.
    pub fn parse(body: &str) -> Result<Self> {
        let fields = if body.trim_start().starts_with('{') {
            json_fields(body)?
        } else {
            text_fields(body)?
        };
        Self::from_fields(&fields)
    }

    pub fn from_fields(fields: &BTreeMap<String, String>) -> Result<Self> {
        let birth_local = required(fields, "birth_datetime", BIRTH_FORMAT)?;
        let offset = match fields.get("tz_offset") {
            Some(raw) => parse_offset(raw)?,
            None => Duration::zero(),
        };
        let birth = parse_birth(birth_local)? - offset;
        let as_of = parse_as_of(required(fields, "as_of_date", DATE_FORMAT)?)?;

        let lat = optional_coordinate(fields, "lat", 90.0)?;
        let lon = optional_coordinate(fields, "lon", 180.0)?;
        let cycle = match fields.get("cycle") {
            Some(raw) => raw.parse()?,
            None => CycleKind::default(),
        };

        Ok(Self {
            birth,
            as_of,
            location: GeoLocation::new(lat, lon),
            cycle,
        })
    }
}

fn required<'a>(
    fields: &'a BTreeMap<String, String>,
    key: &str,
    expected: &'static str,
) -> Result<&'a str> {
    fields
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| CycleError::input(key, "", expected))
}

fn json_fields(body: &str) -> Result<BTreeMap<String, String>> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| CycleError::input("body", &e.to_string(), "a JSON object"))?;
    let Value::Object(map) = value else {
        return Err(CycleError::input("body", body.trim(), "a JSON object"));
    };

    let mut fields = BTreeMap::new();
    for (key, value) in map {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            other => {
                return Err(CycleError::input(
                    &key,
                    &other.to_string(),
                    "a string or number",
                ))
            }
        };
        fields.insert(key.trim().to_lowercase(), text.trim().to_string());
    }
    Ok(fields)
}

fn text_fields(body: &str) -> Result<BTreeMap<String, String>> {
    let mut fields = BTreeMap::new();
    for line in body.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line
            .split_once(':')
            .filter(|(key, _)| !key.trim().contains(char::is_whitespace))
        else {
            return Err(CycleError::input("line", line, "key: value"));
        };
        fields.insert(key.trim().to_lowercase(), value.trim().to_string());
    }
    Ok(fields)
}

fn capture_num(caps: &regex::Captures, i: usize) -> u32 {
    // groups are all \d{2} or \d{4}
    caps[i].parse().unwrap_or(0)
}

fn parse_birth(raw: &str) -> Result<DateTime<Utc>> {
    let bad = || CycleError::input("birth_datetime", raw, BIRTH_FORMAT);
    let caps = BIRTH_RE.captures(raw).ok_or_else(bad)?;
    let date = NaiveDate::from_ymd_opt(
        capture_num(&caps, 1) as i32,
        capture_num(&caps, 2),
        capture_num(&caps, 3),
    )
    .ok_or_else(bad)?;
    let naive: NaiveDateTime = date
        .and_hms_opt(capture_num(&caps, 4), capture_num(&caps, 5), 0)
        .ok_or_else(bad)?;
    Ok(Utc.from_utc_datetime(&naive))
}

fn parse_offset(raw: &str) -> Result<Duration> {
    let bad = || CycleError::input("tz_offset", raw, OFFSET_FORMAT);
    let caps = OFFSET_RE.captures(raw).ok_or_else(bad)?;
    let hours = capture_num(&caps, 2) as i64;
    let minutes = capture_num(&caps, 3) as i64;
    if hours > MAX_OFFSET_HOURS || minutes >= 60 {
        return Err(bad());
    }
    let magnitude = Duration::hours(hours) + Duration::minutes(minutes);
    Ok(if &caps[1] == "-" { -magnitude } else { magnitude })
}

/// As-of dates are taken at 00:00 UTC.
fn parse_as_of(raw: &str) -> Result<DateTime<Utc>> {
    let bad = || CycleError::input("as_of_date", raw, DATE_FORMAT);
    let caps = DATE_RE.captures(raw).ok_or_else(bad)?;
    let naive = NaiveDate::from_ymd_opt(
        capture_num(&caps, 1) as i32,
        capture_num(&caps, 2),
        capture_num(&caps, 3),
    )
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .ok_or_else(bad)?;
    Ok(Utc.from_utc_datetime(&naive))
}

fn optional_coordinate(fields: &BTreeMap<String, String>, key: &str, limit: f64) -> Result<f64> {
    let Some(raw) = fields.get(key) else {
        return Ok(0.0);
    };
    let expected = if limit == 90.0 {
        "decimal degrees in [-90, 90]"
    } else {
        "decimal degrees in [-180, 180]"
    };
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v.abs() <= limit => Ok(v),
        _ => Err(CycleError::input(key, raw, expected)),
    }
}
