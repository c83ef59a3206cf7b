//! Wraparound-safe angle arithmetic on the ecliptic.
//!
//! Every comparison or difference between longitudes goes through
//! [`normalize360`] or [`signed_delta`] so the 0°/360° seam is handled in one
//! place. Inputs are expected to be finite.

pub const FULL_CIRCLE: f64 = 360.0;
pub const SIGN_SPAN_DEG: f64 = 30.0;

pub const SIGN_NAMES: [&str; 12] = [
    "Aries",
    "Taurus",
    "Gemini",
    "Cancer",
    "Leo",
    "Virgo",
    "Libra",
    "Scorpio",
    "Sagittarius",
    "Capricorn",
    "Aquarius",
    "Pisces",
];

/// Map any finite angle into [0, 360).
pub fn normalize360(deg: f64) -> f64 {
    let d = deg.rem_euclid(FULL_CIRCLE);
    // rem_euclid rounds tiny negative inputs up to exactly 360.0
    if d >= FULL_CIRCLE {
        0.0
    } else {
        d
    }
}

/// Shortest signed distance from `b` to `a`, in (-180, 180].
///
/// An exact opposition resolves to +180, never -180.
pub fn signed_delta(a: f64, b: f64) -> f64 {
    let d = normalize360(a - b);
    if d > 180.0 {
        d - FULL_CIRCLE
    } else {
        d
    }
}

/// Unsigned separation in [0, 180].
pub fn angular_distance(a: f64, b: f64) -> f64 {
    signed_delta(a, b).abs()
}

/// How far `leading` has advanced past `trailing`, in [0, 360).
pub fn waxing_separation(leading: f64, trailing: f64) -> f64 {
    normalize360(leading - trailing)
}

/// Zodiac sign index (0 = Aries .. 11 = Pisces).
pub fn sign_for_longitude(lon: f64) -> usize {
    ((normalize360(lon) / SIGN_SPAN_DEG).floor() as usize) % 12
}

pub fn sign_name(lon: f64) -> &'static str {
    SIGN_NAMES[sign_for_longitude(lon)]
}

/// Degrees past the start of the containing sign, in [0, 30).
pub fn degree_in_sign(lon: f64) -> f64 {
    normalize360(lon) % SIGN_SPAN_DEG
}

/// "12.34° Leo" style label.
pub fn format_longitude(lon: f64) -> String {
    format!("{:.2}° {}", degree_in_sign(lon), sign_name(lon))
}
