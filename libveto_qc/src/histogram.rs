use std::ops::RangeInclusive;

/// Fixed-width 1D histogram with ROOT-like bin searches.
///
/// Values outside of `[min, max)` are counted as underflow/overflow and never
/// take part in any of the searches.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    bins: Vec<f64>,
    min: f64,
    max: f64,
    entries: u64,
    underflow: u64,
    overflow: u64,
}

impl Histogram {
    pub fn new(n_bins: usize, min: f64, max: f64) -> Self {
        Self {
            bins: vec![0.0; n_bins.max(1)],
            min,
            max,
            entries: 0,
            underflow: 0,
            overflow: 0,
        }
    }

    pub fn n_bins(&self) -> usize {
        self.bins.len()
    }

    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.bins.len() as f64
    }

    pub fn bin_center(&self, bin: usize) -> f64 {
        self.min + (bin as f64 + 0.5) * self.bin_width()
    }

    pub fn content(&self, bin: usize) -> f64 {
        self.bins.get(bin).copied().unwrap_or(0.0)
    }

    /// Total number of fills, including under/overflow
    pub fn entries(&self) -> u64 {
        self.entries
    }

    pub fn overflow(&self) -> u64 {
        self.overflow
    }

    pub fn underflow(&self) -> u64 {
        self.underflow
    }

    /// Bin index a value falls in, None if out of range (or NaN)
    pub fn find_bin(&self, value: f64) -> Option<usize> {
        if !(value >= self.min && value < self.max) {
            return None;
        }
        // Multiply before dividing so that exact bin edges land where expected
        let bin = ((value - self.min) * self.bins.len() as f64 / (self.max - self.min)) as usize;
        Some(bin.min(self.bins.len() - 1))
    }

    pub fn fill(&mut self, value: f64) {
        self.entries += 1;
        match self.find_bin(value) {
            Some(bin) => self.bins[bin] += 1.0,
            None if value < self.min => self.underflow += 1,
            None => self.overflow += 1,
        }
    }

    /// First bin with content strictly above `threshold`
    pub fn first_bin_above(&self, threshold: f64) -> Option<usize> {
        self.bins.iter().position(|c| *c > threshold)
    }

    /// Last bin with content strictly above `threshold`
    pub fn last_bin_above(&self, threshold: f64) -> Option<usize> {
        self.bins.iter().rposition(|c| *c > threshold)
    }

    fn clamp_range(&self, range: RangeInclusive<usize>) -> RangeInclusive<usize> {
        let last = self.bins.len() - 1;
        (*range.start()).min(last)..=(*range.end()).min(last)
    }

    /// Bin with the largest content within `range` (inclusive, clamped to the
    /// histogram). Ties resolve to the lowest bin. None if the range is empty.
    pub fn maximum_bin_in(&self, range: RangeInclusive<usize>) -> Option<usize> {
        let range = self.clamp_range(range);
        let mut best: Option<(usize, f64)> = None;
        for bin in range {
            let content = self.bins[bin];
            match best {
                Some((_, best_content)) if content <= best_content => (),
                _ => best = Some((bin, content)),
            }
        }
        best.filter(|(_, content)| *content > 0.0)
            .map(|(bin, _)| bin)
    }

    pub fn maximum_bin(&self) -> Option<usize> {
        self.maximum_bin_in(0..=self.bins.len() - 1)
    }

    /// Content-weighted mean of bin centers within `range`. None if the range is empty
    pub fn mean_in(&self, range: RangeInclusive<usize>) -> Option<f64> {
        let range = self.clamp_range(range);
        let mut sum = 0.0;
        let mut weight = 0.0;
        for bin in range {
            sum += self.bins[bin] * self.bin_center(bin);
            weight += self.bins[bin];
        }
        if weight > 0.0 {
            Some(sum / weight)
        } else {
            None
        }
    }

    /// Content-weighted RMS of bin centers within `range`
    pub fn rms_in(&self, range: RangeInclusive<usize>) -> Option<f64> {
        let mean = self.mean_in(range.clone())?;
        let range = self.clamp_range(range);
        let mut sum = 0.0;
        let mut weight = 0.0;
        for bin in range {
            let delta = self.bin_center(bin) - mean;
            sum += self.bins[bin] * delta * delta;
            weight += self.bins[bin];
        }
        Some((sum / weight).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_and_search() {
        let mut hist = Histogram::new(100, 0.0, 100.0);
        hist.fill(-1.0);
        hist.fill(150.0);
        for _ in 0..3 {
            hist.fill(10.2);
        }
        for _ in 0..5 {
            hist.fill(12.7);
        }
        hist.fill(90.0);
        assert_eq!(hist.entries(), 11);
        assert_eq!(hist.underflow(), 1);
        assert_eq!(hist.overflow(), 1);
        assert_eq!(hist.first_bin_above(1.0), Some(10));
        assert_eq!(hist.last_bin_above(1.0), Some(12));
        assert_eq!(hist.last_bin_above(0.0), Some(90));
        assert_eq!(hist.maximum_bin(), Some(12));
        assert_eq!(hist.maximum_bin_in(0..=11), Some(10));
        assert_eq!(hist.maximum_bin_in(20..=30), None);
    }

    #[test]
    fn test_mean_uses_bin_centers() {
        let mut hist = Histogram::new(1000, 0.0, 1.0);
        hist.fill(0.2001);
        hist.fill(0.4001);
        let mean = hist.mean_in(0..=999).unwrap();
        assert!((mean - 0.3005).abs() < 1e-9);
        assert!(hist.mean_in(600..=700).is_none());
        assert!(hist.rms_in(0..=999).unwrap() > 0.09);
    }

    #[test]
    fn test_exact_edges() {
        let hist = Histogram::new(100_000, 0.0, 100.0);
        assert_eq!(hist.find_bin(6.0), Some(6000));
        assert_eq!(hist.find_bin(100.0), None);
        assert_eq!(hist.find_bin(f64::NAN), None);
    }
}
