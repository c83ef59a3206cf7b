//! Progressed-angle cycle solver.
//!
//! Computes zodiacal and cyclic positions from ecliptic longitudes supplied by
//! a remote ephemeris oracle, then locates angular events (conjunctions,
//! Aries ingress, 45° phase boundaries) by coarse stepping and bisection over
//! time.

pub mod angles;
pub mod cache;
pub mod ephemeris;
pub mod error;
pub mod input;
pub mod phases;
pub mod progression;
pub mod report;
pub mod search;

pub use angles::{normalize360, sign_for_longitude, signed_delta, waxing_separation};
pub use cache::TtlCache;
pub use ephemeris::{
    ChartKey, ChartOracle, ChartSnapshot, GeoLocation, HttpOracle, MemoOracle, OracleSettings,
};
pub use error::{CycleError, Result};
pub use input::ReportRequest;
pub use phases::{phase_for_angle, PhasePosition};
pub use progression::{progressed_angles, progressed_instant, ProgressedAngles};
pub use report::{Boundary, BoundaryStatus, CycleKind, CycleReport, CycleReporter};
pub use search::{
    locate_crossing, locate_value_between, AngularFunction, BoundaryEvent, IngressCache,
    IngressLocator, SearchConfig, SearchDirection,
};
