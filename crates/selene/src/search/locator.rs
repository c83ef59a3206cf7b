//! Event locator: coarse bracketing followed by bisection.
//!
//! Finds when an angular function of time reaches a target value. The
//! signed distance `signed_delta(f(t), target)` wraps to (-180, 180], so a
//! zero crossing of that distance is a crossing of the target. Each
//! evaluation is awaited in sequence; every bisection step depends on the
//! previous bracket.

use crate::angles::signed_delta;
use crate::error::{CycleError, Result};
use crate::search::functions::AngularFunction;
use crate::search::types::{BoundaryEvent, SearchConfig, SearchDirection};
use chrono::{DateTime, Utc};

/// Consecutive deltas further apart than this straddle the ±180° seam of
/// the wrapped distance, not the target.
const SEAM_JUMP_DEG: f64 = 180.0;

#[derive(Debug, Clone, Copy)]
struct Bracket {
    lo: DateTime<Utc>,
    lo_delta: f64,
    hi: DateTime<Utc>,
}

fn is_genuine_crossing(prev: f64, curr: f64) -> bool {
    prev * curr < 0.0 && (prev - curr).abs() < SEAM_JUMP_DEG
}

fn midpoint(lo: DateTime<Utc>, hi: DateTime<Utc>) -> DateTime<Utc> {
    lo + (hi - lo) / 2
}

/// Distance used by the direct value search: the function rises through
/// the target without wrapping inside the bracket.
fn rising_delta(value: f64, target: f64) -> f64 {
    value - target
}

/// Halve `bracket` until the midpoint is within tolerance or the iteration
/// budget runs out. Returns the last midpoint.
async fn refine<F: AngularFunction + ?Sized>(
    f: &F,
    mut bracket: Bracket,
    target_deg: f64,
    delta: fn(f64, f64) -> f64,
    config: &SearchConfig,
) -> Result<BoundaryEvent> {
    let mut mid = midpoint(bracket.lo, bracket.hi);
    let mut iterations = 0;
    for _ in 0..config.max_iterations {
        iterations += 1;
        mid = midpoint(bracket.lo, bracket.hi);
        let d_mid = delta(f.value_at(mid).await?, target_deg);
        if d_mid.abs() < config.tolerance_deg {
            break;
        }
        if (d_mid < 0.0) == (bracket.lo_delta < 0.0) {
            bracket.lo = mid;
            bracket.lo_delta = d_mid;
        } else {
            bracket.hi = mid;
        }
    }
    log::debug!(
        "target {}° refined to {} after {} iterations",
        target_deg,
        mid,
        iterations
    );
    Ok(BoundaryEvent {
        target_deg,
        instant: mid,
    })
}

/// Find the first crossing of `target_deg` by `f`, scanning away from
/// `seed` in `direction`.
///
/// Returns the seed or a sample instant directly when its delta is exactly
/// zero. Fails with [`CycleError::EventNotFound`] when `config.max_steps`
/// steps pass without a sign change.
pub async fn locate_crossing<F: AngularFunction + ?Sized>(
    f: &F,
    seed: DateTime<Utc>,
    target_deg: f64,
    direction: SearchDirection,
    config: &SearchConfig,
) -> Result<BoundaryEvent> {
    config
        .validate()
        .map_err(|e| CycleError::InvalidConfig(e.to_string()))?;
    let step = config.signed_step(direction);
    let not_found = CycleError::EventNotFound {
        target_deg,
        seed,
        steps: config.max_steps,
    };

    let mut t_prev = seed;
    let mut d_prev = signed_delta(f.value_at(seed).await?, target_deg);
    if d_prev == 0.0 {
        return Ok(BoundaryEvent {
            target_deg,
            instant: seed,
        });
    }

    for _ in 0..config.max_steps {
        let Some(t_curr) = t_prev.checked_add_signed(step) else {
            return Err(not_found);
        };
        let d_curr = signed_delta(f.value_at(t_curr).await?, target_deg);
        if d_curr == 0.0 {
            return Ok(BoundaryEvent {
                target_deg,
                instant: t_curr,
            });
        }

        if is_genuine_crossing(d_prev, d_curr) {
            let bracket = if t_prev < t_curr {
                Bracket {
                    lo: t_prev,
                    lo_delta: d_prev,
                    hi: t_curr,
                }
            } else {
                Bracket {
                    lo: t_curr,
                    lo_delta: d_curr,
                    hi: t_prev,
                }
            };
            let event = refine(f, bracket, target_deg, signed_delta, config).await?;
            log::info!(
                "located {}° crossing at {} ({:?} from {})",
                target_deg,
                event.instant,
                direction,
                seed
            );
            return Ok(event);
        }

        t_prev = t_curr;
        d_prev = d_curr;
    }

    log::debug!(
        "no {}° crossing within {} steps {:?} from {}",
        target_deg,
        config.max_steps,
        direction,
        seed
    );
    Err(not_found)
}

/// Bisect between two known instants for the moment `f` reaches
/// `target_deg`, with no coarse phase.
///
/// `f` must rise through the target without wrapping between `lo` and `hi`,
/// as the waxing separation does between consecutive conjunctions for any
/// target strictly inside (0, 360).
pub async fn locate_value_between<F: AngularFunction + ?Sized>(
    f: &F,
    lo: DateTime<Utc>,
    hi: DateTime<Utc>,
    target_deg: f64,
    config: &SearchConfig,
) -> Result<BoundaryEvent> {
    config
        .validate()
        .map_err(|e| CycleError::InvalidConfig(e.to_string()))?;
    if hi <= lo {
        return Err(CycleError::InvalidConfig(format!(
            "value search bracket is empty: {} .. {}",
            lo, hi
        )));
    }
    let bracket = Bracket {
        lo,
        lo_delta: -1.0,
        hi,
    };
    refine(f, bracket, target_deg, rising_delta, config).await
}
