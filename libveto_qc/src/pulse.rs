use super::constants::*;
use super::histogram::Histogram;

/// How the pulser (LED) period of a run was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseMethod {
    /// Mean of the time-delta distribution around its peak
    Histogram,
    /// Run duration divided by the number of pulses
    SimpleRate,
    /// Neither method gave a usable period
    Unusable,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseEstimate {
    pub period: Option<f64>,
    pub rms: Option<f64>,
    pub method: PulseMethod,
    pub pulse_count: u32,
}

impl PulseEstimate {
    /// Period as reported, with 9999 marking an unusable period
    pub fn period_or_sentinel(&self) -> f64 {
        self.period.unwrap_or(BAD_PULSE_PERIOD)
    }

    pub fn frequency(&self) -> Option<f64> {
        self.period.map(|p| 1.0 / p)
    }

    pub fn is_bad(&self) -> bool {
        self.method == PulseMethod::Unusable
    }

    /// A period outside of the expected band, from whichever method, is an error
    pub fn is_out_of_band(&self) -> bool {
        match self.period {
            Some(p) => !(PULSE_PERIOD_LOW..=PULSE_PERIOD_HIGH).contains(&p),
            None => true,
        }
    }
}

/// Accumulates the time between consecutive high-multiplicity events of a run
#[derive(Debug, Clone)]
pub struct PulseEstimator {
    delta_t: Histogram,
    prev_pulse_time: Option<f64>,
    pulse_count: u32,
}

impl Default for PulseEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseEstimator {
    pub fn new() -> Self {
        Self {
            delta_t: Histogram::new(PULSE_DT_BINS, PULSE_DT_MIN, PULSE_DT_MAX),
            prev_pulse_time: None,
            pulse_count: 0,
        }
    }

    pub fn pulse_count(&self) -> u32 {
        self.pulse_count
    }

    /// Register an event. Only events above the multiplicity cut count as pulses
    pub fn add(&mut self, multiplicity: u32, time: f64) {
        if multiplicity <= PULSE_MULTIPLICITY {
            return;
        }
        if let Some(prev) = self.prev_pulse_time {
            self.delta_t.fill(time - prev);
        }
        self.prev_pulse_time = Some(time);
        self.pulse_count += 1;
    }

    fn histogram_period(&self) -> Option<(f64, f64)> {
        let max_bin = self.delta_t.maximum_bin()?;
        let window = max_bin.saturating_sub(PULSE_PEAK_HALF_WINDOW)..=max_bin + PULSE_PEAK_HALF_WINDOW;
        let mean = self.delta_t.mean_in(window.clone())?;
        let rms = self.delta_t.rms_in(window)?;
        Some((mean, rms))
    }

    /// Estimate the period for a run of `n_entries` lasting `duration` seconds
    pub fn estimate(&self, n_entries: usize, duration: f64) -> PulseEstimate {
        let histo = self.histogram_period();
        match histo {
            Some((period, rms)) => log::info!(
                "Histo method: LED_f: {:.8} LED_t: {:.8} RMS: {:.8}",
                1.0 / period,
                period,
                rms
            ),
            None => log::warn!("No multiplicity > {PULSE_MULTIPLICITY} event pairs!"),
        }

        if let Some((period, rms)) = histo {
            if period <= PULSE_PERIOD_HIGH && n_entries >= PULSE_MIN_RUN_ENTRIES {
                return PulseEstimate {
                    period: Some(period),
                    rms: Some(rms),
                    method: PulseMethod::Histogram,
                    pulse_count: self.pulse_count,
                };
            }
        }

        log::warn!("Short run or unphysical LED period.");
        if self.pulse_count >= PULSE_MIN_SIMPLE_COUNT && duration > 0.0 {
            let period = duration / self.pulse_count as f64;
            log::warn!("Reverting to the approx rate ({period:.2}s)...");
            PulseEstimate {
                period: Some(period),
                rms: None,
                method: PulseMethod::SimpleRate,
                pulse_count: self.pulse_count,
            }
        } else {
            log::warn!("LED info is corrupted! Will not use LED period information for this run.");
            PulseEstimate {
                period: None,
                rms: None,
                method: PulseMethod::Unusable,
                pulse_count: self.pulse_count,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_period() {
        let mut estimator = PulseEstimator::new();
        for i in 0..200 {
            let time = 0.5 * i as f64;
            let multiplicity = if i % 14 == 0 { 32 } else { 3 };
            estimator.add(multiplicity, time);
        }
        let estimate = estimator.estimate(200, 100.0);
        assert_eq!(estimate.method, PulseMethod::Histogram);
        assert!((estimate.period.unwrap() - 7.0).abs() < 0.01);
        assert!(!estimate.is_out_of_band());
        assert_eq!(estimate.pulse_count, 15);
    }

    #[test]
    fn test_short_run_uses_simple_rate() {
        let mut estimator = PulseEstimator::new();
        for i in 0..5 {
            estimator.add(25, 6.0 * i as f64);
        }
        let estimate = estimator.estimate(50, 30.0);
        assert_eq!(estimate.method, PulseMethod::SimpleRate);
        assert_eq!(estimate.period, Some(6.0));
        assert!(!estimate.is_bad());
    }

    #[test]
    fn test_unusable_period() {
        let mut estimator = PulseEstimator::new();
        estimator.add(25, 1.0);
        estimator.add(25, 20.0);
        estimator.add(21, 40.0);
        // Multiplicity of exactly 20 is not a pulse
        estimator.add(20, 45.0);
        assert_eq!(estimator.pulse_count(), 3);
        let estimate = estimator.estimate(500, 40.0);
        assert_eq!(estimate.method, PulseMethod::Unusable);
        assert!(estimate.is_bad());
        assert!(estimate.is_out_of_band());
        assert_eq!(estimate.period_or_sentinel(), BAD_PULSE_PERIOD);
    }

    #[test]
    fn test_fallback_period_still_checked() {
        let mut estimator = PulseEstimator::new();
        for i in 0..4 {
            estimator.add(30, 12.0 * i as f64);
        }
        let estimate = estimator.estimate(500, 48.0);
        assert_eq!(estimate.method, PulseMethod::SimpleRate);
        assert_eq!(estimate.period, Some(12.0));
        assert!(estimate.is_out_of_band());
    }
}
