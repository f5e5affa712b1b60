//! Per-document font size statistics.

use std::collections::BTreeMap;

/// Document maximum used when no span carries a size.
const DEFAULT_MAX_SIZE: f32 = 12.0;
/// Document minimum used when no span carries a size.
const DEFAULT_MIN_SIZE: f32 = 10.0;

/// Round a font size to a 0.1pt histogram key.
pub fn size_key(size: f32) -> i32 {
    (size * 10.0).round() as i32
}

/// Font size histogram for one document.
///
/// Built from every readable span before any filtering, so the maximum and
/// minimum reflect the whole document.
#[derive(Debug, Clone, Default)]
pub struct FontStatistics {
    /// Observed sizes keyed to 0.1pt, with frequency
    size_histogram: BTreeMap<i32, usize>,
    /// Total observations
    count: usize,
}

impl FontStatistics {
    /// Create empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a font size observation. Non-positive and non-finite sizes are ignored.
    pub fn add_size(&mut self, size: f32) {
        if !size.is_finite() || size <= 0.0 {
            return;
        }
        *self.size_histogram.entry(size_key(size)).or_insert(0) += 1;
        self.count += 1;
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Check if no size was observed.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Largest observed size.
    pub fn max_size(&self) -> f32 {
        self.size_histogram
            .keys()
            .next_back()
            .map(|k| *k as f32 / 10.0)
            .unwrap_or(DEFAULT_MAX_SIZE)
    }

    /// Smallest observed size.
    pub fn min_size(&self) -> f32 {
        self.size_histogram
            .keys()
            .next()
            .map(|k| *k as f32 / 10.0)
            .unwrap_or(DEFAULT_MIN_SIZE)
    }

    /// Most common size (body text). Ties resolve to the smaller size.
    pub fn body_size(&self) -> f32 {
        self.size_histogram
            .iter()
            .max_by(|(ka, ca), (kb, cb)| ca.cmp(cb).then(kb.cmp(ka)))
            .map(|(k, _)| *k as f32 / 10.0)
            .unwrap_or(DEFAULT_MAX_SIZE)
    }

    /// Size at the given percentile (0.0..=1.0), linearly interpolated
    /// between the closest ranks.
    pub fn percentile(&self, p: f32) -> f32 {
        if self.count == 0 {
            return DEFAULT_MIN_SIZE;
        }
        let rank = p.clamp(0.0, 1.0) * (self.count - 1) as f32;
        let lower = rank.floor() as usize;
        let upper = rank.ceil() as usize;
        let (lo, hi) = (self.nth_size(lower), self.nth_size(upper));
        lo + (hi - lo) * (rank - lower as f32)
    }

    /// The n-th smallest observation (0-indexed).
    fn nth_size(&self, n: usize) -> f32 {
        let mut seen = 0;
        for (key, count) in &self.size_histogram {
            seen += count;
            if n < seen {
                return *key as f32 / 10.0;
            }
        }
        self.max_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_statistics() {
        let mut stats = FontStatistics::new();
        for _ in 0..100 {
            stats.add_size(12.0);
        }
        for _ in 0..5 {
            stats.add_size(18.0);
        }
        for _ in 0..3 {
            stats.add_size(24.0);
        }

        assert_eq!(stats.len(), 108);
        assert!((stats.body_size() - 12.0).abs() < 0.01);
        assert!((stats.max_size() - 24.0).abs() < 0.01);
        assert!((stats.min_size() - 12.0).abs() < 0.01);
    }

    #[test]
    fn test_defaults_when_empty() {
        let stats = FontStatistics::new();
        assert!(stats.is_empty());
        assert_eq!(stats.max_size(), 12.0);
        assert_eq!(stats.min_size(), 10.0);
        assert_eq!(stats.percentile(0.2), 10.0);
    }

    #[test]
    fn test_invalid_sizes_ignored() {
        let mut stats = FontStatistics::new();
        stats.add_size(f32::NAN);
        stats.add_size(0.0);
        stats.add_size(-3.0);
        assert!(stats.is_empty());
    }

    #[test]
    fn test_percentile_interpolates() {
        let mut stats = FontStatistics::new();
        for size in [10.0, 11.0, 12.0, 13.0, 14.0] {
            stats.add_size(size);
        }
        assert!((stats.percentile(0.0) - 10.0).abs() < 1e-4);
        assert!((stats.percentile(0.5) - 12.0).abs() < 1e-4);
        assert!((stats.percentile(0.2) - 10.8).abs() < 1e-4);
        assert!((stats.percentile(1.0) - 14.0).abs() < 1e-4);
    }

    #[test]
    fn test_sizes_keyed_to_tenths() {
        assert_eq!(size_key(11.96), 120);
        assert_eq!(size_key(12.04), 120);
        assert_eq!(size_key(12.06), 121);
    }
}
