//! Assembles a [`CycleReport`] for one of the supported cycle kinds.

use crate::angles::{normalize360, waxing_separation};
use crate::ephemeris::{ChartOracle, GeoLocation, MemoOracle};
use crate::error::{CycleError, Result};
use crate::phases::{phase_boundary_targets, phase_for_angle, phase_index, PHASE_COUNT, PHASE_NAMES};
use crate::progression::{progressed_angles, progressed_instant};
use crate::report::table::render_summary;
use crate::report::types::{Boundary, CycleKind, CycleReport};
use crate::search::{
    locate_crossing, locate_value_between, BoundaryEvent, IngressCache, IngressLocator,
    ProgressedSeparation, SearchConfig, SearchDirection,
};
use chrono::{DateTime, Datelike, Utc};
use std::sync::Arc;

const CONJUNCTION_DEG: f64 = 0.0;
const FULL_CYCLE_DEG: f64 = 360.0;
const SECS_PER_DAY: f64 = 86_400.0;

type Memo = MemoOracle<Arc<dyn ChartOracle>>;

pub struct CycleReporter {
    oracle: Arc<dyn ChartOracle>,
    ingress_cache: Arc<IngressCache>,
    lunation: SearchConfig,
    ingress: SearchConfig,
}

impl CycleReporter {
    pub fn new(oracle: Arc<dyn ChartOracle>, ingress_cache: Arc<IngressCache>) -> Self {
        Self {
            oracle,
            ingress_cache,
            lunation: SearchConfig::conjunction(),
            ingress: SearchConfig::ingress(),
        }
    }

    pub fn with_search_configs(mut self, lunation: SearchConfig, ingress: SearchConfig) -> Self {
        self.lunation = lunation;
        self.ingress = ingress;
        self
    }

    pub fn lunation_config(&self) -> &SearchConfig {
        &self.lunation
    }

    pub fn ingress_config(&self) -> &SearchConfig {
        &self.ingress
    }

    /// Build the report for `kind` at `as_of`.
    ///
    /// Searches that run out of steps leave their boundaries unknown and are
    /// listed in `unresolved`; every other failure aborts the report.
    pub async fn build_cycle_report(
        &self,
        birth: DateTime<Utc>,
        as_of: DateTime<Utc>,
        location: GeoLocation,
        kind: CycleKind,
    ) -> Result<CycleReport> {
        let memo: Memo = MemoOracle::new(Arc::clone(&self.oracle));
        let mut report = match kind {
            CycleKind::ProgressedLunation => {
                self.progressed_lunation(&memo, birth, as_of, location).await?
            }
            CycleKind::AscendantYear => self.ascendant_year(&memo, birth, as_of, location).await?,
            CycleKind::AriesIngress => self.aries_ingress(&memo, birth, as_of, location).await?,
        };
        report.summary = render_summary(&report);
        log::info!(
            "{} report for {}: {} ({} oracle calls, {} unresolved)",
            kind,
            as_of,
            report.current.label(),
            memo.misses(),
            report.unresolved.len()
        );
        Ok(report)
    }

    async fn progressed_lunation(
        &self,
        memo: &Memo,
        birth: DateTime<Utc>,
        as_of: DateTime<Utc>,
        location: GeoLocation,
    ) -> Result<CycleReport> {
        let angles = progressed_angles(memo, birth, as_of, location).await?;
        let current = phase_for_angle(waxing_separation(angles.moon_lon, angles.sun_lon));
        let separation = ProgressedSeparation::new(memo, birth, location);

        let (prior, next) = tokio::join!(
            locate_crossing(
                &separation,
                as_of,
                CONJUNCTION_DEG,
                SearchDirection::Backward,
                &self.lunation
            ),
            locate_crossing(
                &separation,
                as_of,
                CONJUNCTION_DEG,
                SearchDirection::Forward,
                &self.lunation
            ),
        );

        let mut unresolved = Vec::new();
        let prior = located_or_unknown(prior, "prior progressed conjunction", &mut unresolved)?;
        let mut next = located_or_unknown(next, "next progressed conjunction", &mut unresolved)?;

        // as-of exactly on a conjunction: both searches return it
        if let (Some(p), Some(n)) = (prior, next) {
            if n.instant <= p.instant {
                let seed = as_of + self.lunation.step();
                let retry = locate_crossing(
                    &separation,
                    seed,
                    CONJUNCTION_DEG,
                    SearchDirection::Forward,
                    &self.lunation,
                )
                .await;
                next = located_or_unknown(retry, "next progressed conjunction", &mut unresolved)?;
            }
        }

        let mut boundaries = Vec::with_capacity(PHASE_COUNT + 1);
        boundaries.push(time_boundary(birth, CONJUNCTION_DEG, PHASE_NAMES[0], prior, true));
        for target in phase_boundary_targets().into_iter().skip(1) {
            let label = PHASE_NAMES[phase_index(target)];
            let event = match (prior, next) {
                (Some(p), Some(n)) => Some(
                    locate_value_between(&separation, p.instant, n.instant, target, &self.lunation)
                        .await?,
                ),
                _ => None,
            };
            boundaries.push(time_boundary(birth, target, label, event, true));
        }
        let next = next.map(|e| BoundaryEvent {
            target_deg: FULL_CYCLE_DEG,
            instant: e.instant,
        });
        boundaries.push(time_boundary(birth, FULL_CYCLE_DEG, "New (next)", next, true));

        Ok(CycleReport {
            kind: CycleKind::ProgressedLunation,
            birth,
            as_of,
            location,
            progressed_instant: Some(angles.progressed_instant),
            sun_lon: angles.sun_lon,
            moon_lon: Some(angles.moon_lon),
            anchor_lon: None,
            current,
            boundaries,
            days_since_cycle_start: prior.map(|p| days_between(p.instant, as_of)),
            unresolved,
            summary: String::new(),
        })
    }

    async fn ascendant_year(
        &self,
        memo: &Memo,
        birth: DateTime<Utc>,
        as_of: DateTime<Utc>,
        location: GeoLocation,
    ) -> Result<CycleReport> {
        let angles = progressed_angles(memo, birth, as_of, location).await?;
        let ascendant = angles.ascendant.ok_or_else(|| CycleError::OracleMalformed {
            message: "chart has no ascendant".to_string(),
        })?;
        let current = phase_for_angle(waxing_separation(angles.sun_lon, ascendant));
        let boundaries = phase_boundary_targets()
            .into_iter()
            .map(|target| {
                Boundary::at_longitude(
                    target,
                    PHASE_NAMES[phase_index(target)],
                    normalize360(ascendant + target),
                )
            })
            .collect();

        Ok(CycleReport {
            kind: CycleKind::AscendantYear,
            birth,
            as_of,
            location,
            progressed_instant: Some(angles.progressed_instant),
            sun_lon: angles.sun_lon,
            moon_lon: Some(angles.moon_lon),
            anchor_lon: Some(ascendant),
            current,
            boundaries,
            days_since_cycle_start: None,
            unresolved: Vec::new(),
            summary: String::new(),
        })
    }

    async fn aries_ingress(
        &self,
        memo: &Memo,
        birth: DateTime<Utc>,
        as_of: DateTime<Utc>,
        location: GeoLocation,
    ) -> Result<CycleReport> {
        let chart = memo.chart_at(as_of, location).await?;
        let current = phase_for_angle(waxing_separation(chart.sun_lon, CONJUNCTION_DEG));
        let locator =
            IngressLocator::new(memo, Arc::clone(&self.ingress_cache)).with_config(self.ingress);

        let year = as_of.year();
        let mut unresolved = Vec::new();
        let this_year = located_or_unknown(
            locator.aries_ingress(year, location).await,
            &format!("aries ingress {}", year),
            &mut unresolved,
        )?;

        let (start_year, start, next) = match this_year {
            Some(event) if event.instant > as_of => {
                let previous = located_or_unknown(
                    locator.aries_ingress(year - 1, location).await,
                    &format!("aries ingress {}", year - 1),
                    &mut unresolved,
                )?;
                (year - 1, previous, Some(event))
            }
            _ => {
                let following = located_or_unknown(
                    locator.aries_ingress(year + 1, location).await,
                    &format!("aries ingress {}", year + 1),
                    &mut unresolved,
                )?;
                (year, this_year, following)
            }
        };

        let boundaries = vec![
            time_boundary(
                birth,
                CONJUNCTION_DEG,
                &format!("Aries ingress {}", start_year),
                start,
                false,
            ),
            time_boundary(
                birth,
                FULL_CYCLE_DEG,
                &format!("Aries ingress {}", start_year + 1),
                next,
                false,
            ),
        ];

        Ok(CycleReport {
            kind: CycleKind::AriesIngress,
            birth,
            as_of,
            location,
            progressed_instant: None,
            sun_lon: chart.sun_lon,
            moon_lon: Some(chart.moon_lon),
            anchor_lon: Some(CONJUNCTION_DEG),
            current,
            boundaries,
            days_since_cycle_start: start.map(|s| days_between(s.instant, as_of)),
            unresolved,
            summary: String::new(),
        })
    }
}

/// Exhausted searches degrade to `None` and are noted; other errors propagate.
fn located_or_unknown(
    result: Result<BoundaryEvent>,
    what: &str,
    unresolved: &mut Vec<String>,
) -> Result<Option<BoundaryEvent>> {
    match result {
        Ok(event) => Ok(Some(event)),
        Err(err) if err.is_event_not_found() => {
            log::warn!("{} not located: {}", what, err);
            unresolved.push(format!("{}: {}", what, err));
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn time_boundary(
    birth: DateTime<Utc>,
    target_deg: f64,
    label: &str,
    event: Option<BoundaryEvent>,
    progressed: bool,
) -> Boundary {
    match event {
        Some(e) => Boundary::at_instant(
            target_deg,
            label,
            e.instant,
            progressed.then(|| progressed_instant(birth, e.instant)),
        ),
        None => Boundary::unknown(target_deg, label),
    }
}

fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_seconds() as f64 / SECS_PER_DAY
}
