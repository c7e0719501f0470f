//! Adaptive threshold selection.
//!
//! A fixed candidate sweep is evaluated on the first validation sample's
//! probability map. A candidate qualifies when its foreground coverage lies
//! in a plausible road-coverage band and scores by closeness to the expected
//! coverage ratio; when nothing qualifies, a fixed default is retained so the
//! run never fails for lack of a calibration signal.

/// Candidate cutoffs, evaluated in ascending order.
pub const THRESHOLD_SWEEP: [f64; 7] = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7];

/// Threshold retained when no candidate is eligible.
pub const FALLBACK_THRESHOLD: f64 = 0.3;

/// Eligible foreground coverage band, in percent of total pixels.
const ELIGIBLE_MIN_PCT: f64 = 1.0;
const ELIGIBLE_MAX_PCT: f64 = 25.0;

/// Expected road coverage; candidates score by closeness to it.
const TARGET_PCT: f64 = 8.0;

/// One evaluated cutoff: the binary mask it induces and its coverage stats.
#[derive(Debug, Clone)]
pub struct ThresholdCandidate {
    pub threshold: f64,
    /// Binary mask (one byte per pixel, 0 or 1) at this cutoff.
    pub mask: Vec<u8>,
    pub foreground_pixels: usize,
    pub foreground_pct: f64,
}

impl ThresholdCandidate {
    /// Score within the eligibility band; `None` outside it.
    fn score(&self) -> Option<f64> {
        (ELIGIBLE_MIN_PCT..=ELIGIBLE_MAX_PCT)
            .contains(&self.foreground_pct)
            .then(|| 100.0 - (self.foreground_pct - TARGET_PCT).abs())
    }
}

/// Binarizes a probability map with a strict `p > threshold` comparison.
pub fn binarize(map: &[f32], threshold: f64) -> Vec<u8> {
    map.iter()
        .map(|&p| u8::from(f64::from(p) > threshold))
        .collect()
}

/// Foreground pixel count of `map` binarized at `threshold`.
pub fn foreground_count(map: &[f32], threshold: f64) -> usize {
    map.iter().filter(|&&p| f64::from(p) > threshold).count()
}

/// Evaluates every candidate cutoff against one probability map.
pub fn sweep(map: &[f32]) -> Vec<ThresholdCandidate> {
    let total = map.len().max(1);

    THRESHOLD_SWEEP
        .iter()
        .map(|&threshold| {
            let mask = binarize(map, threshold);
            let foreground_pixels = mask.iter().filter(|&&bit| bit > 0).count();
            let foreground_pct = 100.0 * foreground_pixels as f64 / total as f64;

            tracing::debug!(
                threshold,
                pixels = foreground_pixels,
                coverage_pct = foreground_pct,
                "threshold candidate"
            );

            ThresholdCandidate {
                threshold,
                mask,
                foreground_pixels,
                foreground_pct,
            }
        })
        .collect()
}

/// Picks the winning cutoff.
///
/// Eligible candidates ([1%, 25%] coverage) score `100 - |pct - 8|`; the
/// first strict improvement wins, so the lowest threshold takes exact ties.
/// Returns [`FALLBACK_THRESHOLD`] when no candidate is eligible.
pub fn select(candidates: &[ThresholdCandidate]) -> f64 {
    let mut best_threshold = FALLBACK_THRESHOLD;
    let mut best_score = 0.0;

    for candidate in candidates {
        if let Some(score) = candidate.score() {
            if score > best_score {
                best_score = score;
                best_threshold = candidate.threshold;
            }
        }
    }

    tracing::info!(threshold = best_threshold, "threshold selected");
    best_threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 10x10 map with `foreground` pixels at 0.9 and the rest at 0.05.
    fn map_with_foreground(foreground: usize) -> Vec<f32> {
        let mut map = vec![0.05f32; 100];
        for value in map.iter_mut().take(foreground) {
            *value = 0.9;
        }
        map
    }

    #[test]
    fn binarization_uses_a_strict_comparison() {
        let bits = binarize(&[0.5, 0.51, 0.49], 0.5);
        assert_eq!(bits, vec![0, 1, 0]);
    }

    #[test]
    fn foreground_count_is_monotonic_in_the_threshold() {
        let map: Vec<f32> = (0..100).map(|i| i as f32 / 100.0).collect();

        let mut previous = usize::MAX;
        for &threshold in &THRESHOLD_SWEEP {
            let count = foreground_count(&map, threshold);
            assert!(count <= previous);
            previous = count;
        }
    }

    #[test]
    fn sweep_reports_coverage_per_candidate() {
        let candidates = sweep(&map_with_foreground(8));

        assert_eq!(candidates.len(), THRESHOLD_SWEEP.len());
        for candidate in &candidates {
            assert_eq!(candidate.foreground_pixels, 8);
            assert!((candidate.foreground_pct - 8.0).abs() < 1e-9);
            assert_eq!(candidate.mask.len(), 100);
        }
    }

    #[test]
    fn selection_prefers_coverage_closest_to_target() {
        // 8% coverage sits exactly on the target; every candidate sees the
        // same map, so the lowest threshold wins the tie.
        let selected = select(&sweep(&map_with_foreground(8)));
        assert_eq!(selected, 0.1);
    }

    #[test]
    fn selection_is_deterministic() {
        let map = map_with_foreground(12);
        let first = select(&sweep(&map));
        let second = select(&sweep(&map));
        assert_eq!(first, second);
    }

    #[test]
    fn uniform_half_probability_map_falls_back() {
        // Every pixel at exactly 0.5: cutoffs below 0.5 see 100% coverage,
        // 0.5 and above see 0%. Nothing lands in [1%, 25%].
        let map = vec![0.5f32; 128 * 128];
        let candidates = sweep(&map);

        for candidate in &candidates {
            if candidate.threshold < 0.5 {
                assert_eq!(candidate.foreground_pixels, map.len());
            } else {
                assert_eq!(candidate.foreground_pixels, 0);
            }
        }
        assert_eq!(select(&candidates), FALLBACK_THRESHOLD);
    }

    #[test]
    fn coverage_outside_the_band_is_ineligible() {
        // 30% coverage exceeds the 25% ceiling at low thresholds and drops
        // to 0% above them; the fallback applies.
        let selected = select(&sweep(&map_with_foreground(30)));
        assert_eq!(selected, FALLBACK_THRESHOLD);
    }

    #[test]
    fn empty_map_selects_the_fallback() {
        let candidates = sweep(&[]);
        assert_eq!(select(&candidates), FALLBACK_THRESHOLD);
    }
}
