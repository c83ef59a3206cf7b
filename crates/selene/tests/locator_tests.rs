mod common;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use common::days_since;
use selene::{
    locate_crossing, locate_value_between, normalize360, AngularFunction, CycleError, Result,
    SearchConfig, SearchDirection,
};

/// Angle growing at `deg_per_day` from 0° at `origin`.
struct Linear {
    origin: DateTime<Utc>,
    deg_per_day: f64,
}

#[async_trait]
impl AngularFunction for Linear {
    async fn value_at(&self, instant: DateTime<Utc>) -> Result<f64> {
        Ok(normalize360(self.deg_per_day * days_since(self.origin, instant)))
    }
}

fn origin() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
}

fn daily() -> SearchConfig {
    SearchConfig {
        step_secs: 86_400,
        max_steps: 60,
        ..SearchConfig::conjunction()
    }
}

#[tokio::test]
async fn forward_search_converges_on_target() {
    let f = Linear {
        origin: origin(),
        deg_per_day: 12.0,
    };
    let event = locate_crossing(&f, origin() + Duration::hours(6), 90.0, SearchDirection::Forward, &daily())
        .await
        .unwrap();
    let expected = origin() + Duration::hours(180);
    let off = (event.instant - expected).num_seconds().abs();
    // 0.05° at 12°/day is six minutes
    assert!(off <= 6 * 60, "off by {off}s at {}", event.instant);
    assert_eq!(event.target_deg, 90.0);
}

#[tokio::test]
async fn backward_search_finds_previous_wrap() {
    let f = Linear {
        origin: origin(),
        deg_per_day: 12.0,
    };
    let seed = origin() + Duration::days(40);
    let event = locate_crossing(&f, seed, 0.0, SearchDirection::Backward, &daily())
        .await
        .unwrap();
    // 0° recurs every 30 days
    let expected = origin() + Duration::days(30);
    assert!((event.instant - expected).num_seconds().abs() <= 6 * 60);
    assert!(event.instant <= seed);
}

#[tokio::test]
async fn seed_on_target_returns_seed() {
    let f = Linear {
        origin: origin(),
        deg_per_day: 12.0,
    };
    let event = locate_crossing(&f, origin(), 0.0, SearchDirection::Forward, &daily())
        .await
        .unwrap();
    assert_eq!(event.instant, origin());
}

#[tokio::test]
async fn exhausted_budget_is_event_not_found() {
    let f = Linear {
        origin: origin(),
        deg_per_day: 0.0,
    };
    let config = SearchConfig {
        max_steps: 5,
        ..daily()
    };
    let err = locate_crossing(&f, origin() + Duration::hours(1), 90.0, SearchDirection::Forward, &config)
        .await
        .unwrap_err();
    assert!(err.is_event_not_found());
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn opposition_seam_is_not_a_crossing() {
    // delta to 0° flips sign across ±180° as the angle passes opposition
    let f = Linear {
        origin: origin(),
        deg_per_day: 2.0,
    };
    let config = SearchConfig {
        max_steps: 3,
        ..daily()
    };
    let err = locate_crossing(&f, origin() + Duration::days(89), 0.0, SearchDirection::Forward, &config)
        .await
        .unwrap_err();
    assert!(err.is_event_not_found());
}

#[tokio::test]
async fn value_search_between_known_instants() {
    let f = Linear {
        origin: origin(),
        deg_per_day: 12.0,
    };
    let event = locate_value_between(&f, origin(), origin() + Duration::days(30), 225.0, &daily())
        .await
        .unwrap();
    let expected = origin() + Duration::hours(450);
    assert!((event.instant - expected).num_seconds().abs() <= 6 * 60);
}

#[tokio::test]
async fn empty_bracket_is_config_error() {
    let f = Linear {
        origin: origin(),
        deg_per_day: 12.0,
    };
    let err = locate_value_between(&f, origin(), origin(), 45.0, &daily())
        .await
        .unwrap_err();
    assert!(matches!(err, CycleError::InvalidConfig(_)));
}

#[tokio::test]
async fn invalid_config_rejected_before_searching() {
    let f = Linear {
        origin: origin(),
        deg_per_day: 12.0,
    };
    let config = SearchConfig {
        step_secs: 0,
        ..daily()
    };
    let err = locate_crossing(&f, origin(), 45.0, SearchDirection::Forward, &config)
        .await
        .unwrap_err();
    assert!(matches!(err, CycleError::InvalidConfig(_)));
}
