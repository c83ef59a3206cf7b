//! Eight-phase cycle taxonomy.
//!
//! A cycle angle in [0, 360) is split into eight 45° phases, each divided
//! into three 15° sub-phases. The same taxonomy labels the progressed
//! lunation, the ascendant year and the solar year.

use crate::angles::normalize360;
use serde::{Deserialize, Serialize};

pub const PHASE_COUNT: usize = 8;
pub const PHASE_SPAN_DEG: f64 = 45.0;
pub const SUB_PHASE_SPAN_DEG: f64 = 15.0;

pub const PHASE_NAMES: [&str; PHASE_COUNT] = [
    "New",
    "Crescent",
    "First Quarter",
    "Gibbous",
    "Full",
    "Disseminating",
    "Last Quarter",
    "Balsamic",
];

pub const SUB_PHASE_NAMES: [&str; 3] = ["Early", "Middle", "Late"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhasePosition {
    /// Cycle angle in [0, 360)
    pub angle: f64,
    pub phase_index: u8,
    pub phase_name: String,
    pub sub_phase_index: u8,
    pub sub_phase_name: String,
    /// Degrees past the start of the current phase, in [0, 45)
    pub degrees_into_phase: f64,
}

impl PhasePosition {
    pub fn label(&self) -> String {
        format!("{} ({})", self.phase_name, self.sub_phase_name)
    }
}

pub fn phase_index(angle: f64) -> usize {
    ((normalize360(angle) / PHASE_SPAN_DEG).floor() as usize) % PHASE_COUNT
}

pub fn phase_for_angle(angle: f64) -> PhasePosition {
    let angle = normalize360(angle);
    let phase = phase_index(angle);
    let into_phase = angle - phase as f64 * PHASE_SPAN_DEG;
    let sub_phase = ((into_phase / SUB_PHASE_SPAN_DEG).floor() as usize).min(2);

    PhasePosition {
        angle,
        phase_index: phase as u8,
        phase_name: PHASE_NAMES[phase].to_string(),
        sub_phase_index: sub_phase as u8,
        sub_phase_name: SUB_PHASE_NAMES[sub_phase].to_string(),
        degrees_into_phase: into_phase,
    }
}

/// Start angle of every phase: 0, 45, .., 315.
pub fn phase_boundary_targets() -> [f64; PHASE_COUNT] {
    let mut targets = [0.0; PHASE_COUNT];
    for (i, target) in targets.iter_mut().enumerate() {
        *target = i as f64 * PHASE_SPAN_DEG;
    }
    targets
}
