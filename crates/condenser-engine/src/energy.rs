//! Movement energy estimation.
//!
//! Energy is the summed displacement of hip centres between two consecutive
//! processed frames. Skeletons carry no identity, so each frame's points are
//! paired with the previous frame's by greedy nearest-neighbour matching.
//! The raw value is noisy and is only ever consumed after exponential
//! smoothing.
//!
//! Matching is O(n^2) in the player count, which never exceeds a handful.

use condenser_models::Point;

/// Per-video energy state: previous hip centres and the smoothed signal.
#[derive(Debug, Clone)]
pub struct EnergyEstimator {
    /// Matches further apart than this are treated as different people.
    max_match_distance: f64,
    /// Exponential smoothing factor in (0, 1].
    alpha: f64,
    /// Processing width / original width.
    scale_factor: f64,
    prev_points: Vec<Point>,
    smoothed: f64,
}

impl EnergyEstimator {
    pub fn new(max_match_distance: f64, alpha: f64) -> Self {
        Self {
            max_match_distance,
            alpha,
            scale_factor: 1.0,
            prev_points: Vec::new(),
            smoothed: 0.0,
        }
    }

    /// Set the processing-resolution scale so raw energy is reported in
    /// original-resolution pixels.
    pub fn set_scale_factor(&mut self, scale_factor: f64) {
        self.scale_factor = scale_factor;
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Raw energy between the previous frame's points and `current`.
    ///
    /// Returns 0 when there is no previous frame (first call, after a reset,
    /// or after a frame with no skeletons). Unmatched points contribute
    /// nothing. `current` always becomes the new previous set.
    pub fn calculate(&mut self, current: &[Point]) -> f64 {
        if self.prev_points.is_empty() || current.is_empty() {
            self.prev_points = current.to_vec();
            return 0.0;
        }

        let mut used = vec![false; self.prev_points.len()];
        let mut total = 0.0;

        for curr in current {
            let mut best: Option<(usize, f64)> = None;

            for (i, prev) in self.prev_points.iter().enumerate() {
                if used[i] {
                    continue;
                }
                let dist = curr.distance(prev);
                if dist < self.max_match_distance && best.map_or(true, |(_, d)| dist < d) {
                    best = Some((i, dist));
                }
            }

            if let Some((i, dist)) = best {
                used[i] = true;
                total += dist;
            }
        }

        self.prev_points = current.to_vec();

        if self.scale_factor != 1.0 && self.scale_factor > 0.0 {
            total /= self.scale_factor;
        }
        total
    }

    /// Fold a raw reading into the smoothed signal and return it.
    pub fn update_smooth(&mut self, raw_energy: f64) -> f64 {
        self.smoothed = raw_energy * self.alpha + self.smoothed * (1.0 - self.alpha);
        self.smoothed
    }

    /// Current smoothed energy.
    pub fn smoothed(&self) -> f64 {
        self.smoothed
    }

    /// Forget the previous frame and the smoothed value (new video).
    pub fn reset(&mut self) {
        self.prev_points.clear();
        self.smoothed = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> EnergyEstimator {
        EnergyEstimator::new(100.0, 0.3)
    }

    #[test]
    fn test_first_frame_is_zero() {
        let mut est = estimator();
        assert_eq!(est.calculate(&[Point::new(10.0, 10.0), Point::new(300.0, 40.0)]), 0.0);
    }

    #[test]
    fn test_zero_after_reset() {
        let mut est = estimator();
        est.calculate(&[Point::new(0.0, 0.0)]);
        est.reset();
        assert_eq!(est.calculate(&[Point::new(50.0, 0.0)]), 0.0);
        assert_eq!(est.smoothed(), 0.0);
    }

    #[test]
    fn test_single_pair_distance() {
        let mut est = estimator();
        est.calculate(&[Point::new(0.0, 0.0)]);
        let raw = est.calculate(&[Point::new(3.0, 4.0)]);
        assert!((raw - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_pair_cost_independent_of_order() {
        let a = [Point::new(100.0, 100.0), Point::new(400.0, 100.0)];
        let b = [Point::new(406.0, 108.0), Point::new(103.0, 104.0)];

        let mut forward = estimator();
        forward.calculate(&a);
        let e1 = forward.calculate(&b);

        let mut backward = estimator();
        backward.calculate(&b);
        let e2 = backward.calculate(&a);

        assert!((e1 - 15.0).abs() < 1e-9);
        assert!((e1 - e2).abs() < 1e-9);
    }

    #[test]
    fn test_distant_points_not_matched() {
        let mut est = estimator();
        est.calculate(&[Point::new(0.0, 0.0)]);
        assert_eq!(est.calculate(&[Point::new(150.0, 0.0)]), 0.0);
    }

    #[test]
    fn test_new_player_contributes_nothing() {
        let mut est = estimator();
        est.calculate(&[Point::new(0.0, 0.0)]);
        let raw = est.calculate(&[Point::new(0.0, 10.0), Point::new(500.0, 500.0)]);
        assert!((raw - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_previous_point_used_once() {
        let mut est = estimator();
        est.calculate(&[Point::new(0.0, 0.0)]);
        // Both current points are near the single previous point; only the
        // first one to claim it counts.
        let raw = est.calculate(&[Point::new(0.0, 20.0), Point::new(0.0, 5.0)]);
        assert!((raw - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_scale_normalizes_to_original_pixels() {
        let mut est = estimator();
        est.set_scale_factor(0.5);
        est.calculate(&[Point::new(0.0, 0.0)]);
        let raw = est.calculate(&[Point::new(0.0, 10.0)]);
        assert!((raw - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_frame_breaks_the_chain() {
        let mut est = estimator();
        est.calculate(&[Point::new(0.0, 0.0)]);
        assert_eq!(est.calculate(&[]), 0.0);
        assert_eq!(est.calculate(&[Point::new(0.0, 10.0)]), 0.0);
    }

    #[test]
    fn test_smoothing_converges_monotonically() {
        let mut est = estimator();
        let mut prev = est.smoothed();
        for _ in 0..60 {
            let s = est.update_smooth(100.0);
            assert!(s > prev && s <= 100.0);
            prev = s;
        }
        assert!((prev - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_alpha_one_tracks_raw() {
        let mut est = EnergyEstimator::new(100.0, 1.0);
        assert_eq!(est.update_smooth(42.0), 42.0);
        assert_eq!(est.update_smooth(7.0), 7.0);
    }
}
