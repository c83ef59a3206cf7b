use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Direction of the coarse scan away from the seed instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDirection {
    Forward,
    Backward,
}

/// Parameters of one event search: coarse step, step budget, bisection
/// budget and convergence tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Coarse step in seconds (always positive; direction picks the sign)
    pub step_secs: i64,
    /// Coarse steps taken before giving up with `EventNotFound`
    pub max_steps: usize,
    /// Bisection halvings before returning the last midpoint
    pub max_iterations: u32,
    /// Bisection stops once |delta| at the midpoint falls below this
    pub tolerance_deg: f64,
}

pub const DEFAULT_MAX_ITERATIONS: u32 = 44;
pub const DEFAULT_TOLERANCE_DEG: f64 = 0.05;

const DAY_SECS: i64 = 86_400;
const HOUR_SECS: i64 = 3_600;

impl SearchConfig {
    /// Progressed Sun–Moon conjunctions: 180-day steps, ~59-year window.
    pub fn conjunction() -> Self {
        Self {
            step_secs: 180 * DAY_SECS,
            max_steps: 120,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance_deg: DEFAULT_TOLERANCE_DEG,
        }
    }

    /// Aries ingress: hourly steps across the March 18–23 window.
    pub fn ingress() -> Self {
        Self {
            step_secs: HOUR_SECS,
            max_steps: 6 * 24,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance_deg: DEFAULT_TOLERANCE_DEG,
        }
    }

    pub fn step(&self) -> Duration {
        Duration::seconds(self.step_secs)
    }

    pub fn signed_step(&self, direction: SearchDirection) -> Duration {
        match direction {
            SearchDirection::Forward => self.step(),
            SearchDirection::Backward => -self.step(),
        }
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.step_secs <= 0 {
            return Err("step_secs must be positive");
        }
        if self.max_steps == 0 {
            return Err("max_steps must be at least 1");
        }
        if self.max_iterations == 0 {
            return Err("max_iterations must be at least 1");
        }
        if !(self.tolerance_deg.is_finite() && self.tolerance_deg > 0.0) {
            return Err("tolerance_deg must be positive and finite");
        }
        Ok(())
    }
}

/// A located crossing of `target_deg`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryEvent {
    pub target_deg: f64,
    pub instant: DateTime<Utc>,
}
