//! Plain-text rendering of a cycle report for direct display.

use crate::angles::format_longitude;
use crate::report::types::{Boundary, CycleKind, CycleReport};
use chrono::{DateTime, Utc};
use std::fmt::Write;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
const UNKNOWN: &str = "unknown";

fn fmt_time(instant: Option<DateTime<Utc>>) -> String {
    instant
        .map(|t| format!("{} UTC", t.format(TIME_FORMAT)))
        .unwrap_or_else(|| UNKNOWN.to_string())
}

pub fn render_summary(report: &CycleReport) -> String {
    let mut out = String::new();
    // writes to a String cannot fail
    let _ = write_summary(&mut out, report);
    out
}

fn write_summary(out: &mut String, report: &CycleReport) -> std::fmt::Result {
    writeln!(out, "{}", report.kind.title())?;
    writeln!(out, "  {:<12} {}", "Birth", fmt_time(Some(report.birth)))?;
    writeln!(out, "  {:<12} {}", "As of", fmt_time(Some(report.as_of)))?;
    if let Some(progressed) = report.progressed_instant {
        writeln!(out, "  {:<12} {}", "Progressed", fmt_time(Some(progressed)))?;
    }
    writeln!(out, "  {:<12} {}", "Sun", format_longitude(report.sun_lon))?;
    if let Some(moon) = report.moon_lon {
        writeln!(out, "  {:<12} {}", "Moon", format_longitude(moon))?;
    }
    if let Some(anchor) = report.anchor_lon {
        writeln!(out, "  {:<12} {}", "Anchor", format_longitude(anchor))?;
    }
    writeln!(
        out,
        "  {:<12} {:.2}° {}",
        "Position",
        report.current.angle,
        report.current.label()
    )?;
    if let Some(days) = report.days_since_cycle_start {
        writeln!(out, "  {:<12} {:.1} days", "Since start", days)?;
    }
    writeln!(out)?;

    match report.kind {
        CycleKind::AscendantYear => write_longitude_table(out, &report.boundaries)?,
        CycleKind::ProgressedLunation | CycleKind::AriesIngress => {
            write_time_table(out, &report.boundaries)?
        }
    }

    for note in &report.unresolved {
        writeln!(out, "  ! {}", note)?;
    }
    Ok(())
}

fn write_time_table(out: &mut String, boundaries: &[Boundary]) -> std::fmt::Result {
    let with_progressed = boundaries.iter().any(|b| b.progressed_instant.is_some());
    if with_progressed {
        writeln!(
            out,
            "  {:>6}  {:<20} {:<22} {}",
            "Target", "Phase", "When", "Progressed"
        )?;
    } else {
        writeln!(out, "  {:>6}  {:<20} {}", "Target", "Phase", "When")?;
    }
    for b in boundaries {
        let target = format!("{:.0}°", b.target_deg);
        if with_progressed {
            writeln!(
                out,
                "  {:>6}  {:<20} {:<22} {}",
                target,
                b.label,
                fmt_time(b.instant),
                fmt_time(b.progressed_instant)
            )?;
        } else {
            writeln!(out, "  {:>6}  {:<20} {}", target, b.label, fmt_time(b.instant))?;
        }
    }
    Ok(())
}

fn write_longitude_table(out: &mut String, boundaries: &[Boundary]) -> std::fmt::Result {
    writeln!(out, "  {:>6}  {:<20} {}", "Target", "Phase", "Longitude")?;
    for b in boundaries {
        let longitude = b
            .longitude
            .map(format_longitude)
            .unwrap_or_else(|| UNKNOWN.to_string());
        writeln!(
            out,
            "  {:>6}  {:<20} {}",
            format!("{:.0}°", b.target_deg),
            b.label,
            longitude
        )?;
    }
    Ok(())
}
