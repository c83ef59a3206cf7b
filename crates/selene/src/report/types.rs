use crate::ephemeris::GeoLocation;
use crate::error::CycleError;
use crate::phases::PhasePosition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleKind {
    #[default]
    ProgressedLunation,
    AscendantYear,
    AriesIngress,
}

impl CycleKind {
    pub const ALL: [CycleKind; 3] = [
        CycleKind::ProgressedLunation,
        CycleKind::AscendantYear,
        CycleKind::AriesIngress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CycleKind::ProgressedLunation => "progressed_lunation",
            CycleKind::AscendantYear => "ascendant_year",
            CycleKind::AriesIngress => "aries_ingress",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            CycleKind::ProgressedLunation => "Progressed Lunation",
            CycleKind::AscendantYear => "Ascendant Year",
            CycleKind::AriesIngress => "Aries Ingress",
        }
    }
}

impl fmt::Display for CycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CycleKind {
    type Err = CycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "progressed_lunation" | "lunation" => Ok(CycleKind::ProgressedLunation),
            "ascendant_year" | "ascendant" => Ok(CycleKind::AscendantYear),
            "aries_ingress" | "ingress" => Ok(CycleKind::AriesIngress),
            _ => Err(CycleError::input(
                "cycle",
                s,
                "progressed_lunation | ascendant_year | aries_ingress",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryStatus {
    Located,
    Unknown,
}

/// One row of the boundary table: either a time boundary (lunation,
/// ingress) or a longitude boundary (ascendant year).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Boundary {
    pub target_deg: f64,
    pub label: String,
    pub status: BoundaryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instant: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progressed_instant: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl Boundary {
    pub fn at_instant(
        target_deg: f64,
        label: impl Into<String>,
        instant: DateTime<Utc>,
        progressed_instant: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            target_deg,
            label: label.into(),
            status: BoundaryStatus::Located,
            instant: Some(instant),
            progressed_instant,
            longitude: None,
        }
    }

    pub fn at_longitude(target_deg: f64, label: impl Into<String>, longitude: f64) -> Self {
        Self {
            target_deg,
            label: label.into(),
            status: BoundaryStatus::Located,
            instant: None,
            progressed_instant: None,
            longitude: Some(longitude),
        }
    }

    pub fn unknown(target_deg: f64, label: impl Into<String>) -> Self {
        Self {
            target_deg,
            label: label.into(),
            status: BoundaryStatus::Unknown,
            instant: None,
            progressed_instant: None,
            longitude: None,
        }
    }

    pub fn is_known(&self) -> bool {
        self.status == BoundaryStatus::Located
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub kind: CycleKind,
    pub birth: DateTime<Utc>,
    pub as_of: DateTime<Utc>,
    pub location: GeoLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progressed_instant: Option<DateTime<Utc>>,
    pub sun_lon: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moon_lon: Option<f64>,
    /// Longitude the cycle angle is measured from (ascendant, 0° Aries)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_lon: Option<f64>,
    pub current: PhasePosition,
    pub boundaries: Vec<Boundary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_since_cycle_start: Option<f64>,
    /// Searches that exhausted their budget; the matching boundaries are unknown
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unresolved: Vec<String>,
    pub summary: String,
}

impl CycleReport {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty() && self.boundaries.iter().all(Boundary::is_known)
    }

    pub fn boundary(&self, target_deg: f64) -> Option<&Boundary> {
        self.boundaries
            .iter()
            .find(|b| (b.target_deg - target_deg).abs() < 1e-9)
    }
}
