//! Dynamic threshold calibration ("safety rails").
//!
//! `threshold = clamp(noise_floor + base_sensitivity, min, max)` where the
//! noise floor is the mean smoothed energy observed while players stood in
//! their serve positions. The floor guards against unusually still setups,
//! the ceiling against fidgety ones.

/// Noise floor used when no baseline readings were collected.
pub const FALLBACK_NOISE_FLOOR: f64 = 10.0;

/// Arithmetic mean, or `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Compute the calibrated energy threshold from baseline readings.
///
/// Pure and deterministic. With inverted bounds the ceiling wins; config
/// validation rejects that case before any session starts.
pub fn calibrate(
    baseline_readings: &[f64],
    base_sensitivity: f64,
    min_threshold: f64,
    max_threshold: f64,
) -> f64 {
    let noise_floor = mean(baseline_readings).unwrap_or(FALLBACK_NOISE_FLOOR);
    (noise_floor + base_sensitivity)
        .max(min_threshold)
        .min(max_threshold)
}
