//! Human-readable clip summary.

use std::fmt::Write;

use condenser_models::ClipReport;

const RULE: &str = "----------------------------------------------------------------------";

/// Render a report as a fixed-width clip table.
pub fn summary_table(report: &ClipReport) -> String {
    let mut out = String::new();
    if report.clips.is_empty() {
        let _ = writeln!(
            out,
            "{}: no clips detected. Try adjusting sensitivity settings.",
            report.video
        );
        return out;
    }

    let _ = writeln!(out, "Clip summary for {}", report.video);
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(
        out,
        "{:<4} {:<10} {:<10} {:<10} {:<10} {:<10}",
        "#", "Start", "End", "Duration", "Tag", "Energy"
    );
    let _ = writeln!(out, "{}", RULE);
    for (i, clip) in report.clips.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:<4} {:<10.1} {:<10.1} {:<10.1} {:<10} {:<10}",
            i + 1,
            clip.start,
            clip.end,
            clip.duration,
            clip.tag.as_str(),
            clip.peak_energy
        );
    }

    let summary = report.summary();
    let _ = write!(
        out,
        "{} rally, {} serve, {} noise ({:.1}s total)",
        summary.rally, summary.serve, summary.noise, summary.total_seconds
    );
    out
}
