use super::error_kind::{ErrorKind, ErrorTally};
use super::scanner::RunResult;

/// Running totals over every run of a scan
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    pub runs_scanned: usize,
    pub runs_skipped: usize,
    pub total_entries: u64,
    pub total_duration: f64,
    pub total_livetime: f64,
    /// Occurrences of each kind over the whole scan
    pub error_counts: ErrorTally,
    /// Number of runs in which each kind occurred at least once
    pub runs_with_error: ErrorTally,
    pub runs_with_any_error: usize,
    pub serious_error_count: u64,
    pub runs_with_serious_error: usize,
    pub runs_with_bad_pulse: usize,
}

impl ScanSummary {
    /// Fold a finished run into the totals
    pub fn add_run(&mut self, result: &RunResult) {
        self.runs_scanned += 1;
        self.total_entries += result.n_entries as u64;
        self.total_duration += result.duration;
        self.total_livetime += result.livetime;

        for (kind, count) in result.tally.iter() {
            if count > 0 {
                self.runs_with_error.increment(kind);
            }
        }
        self.error_counts += &result.tally;

        if result.tally.any_error_count() > 0 {
            self.runs_with_any_error += 1;
        }
        let serious = result.tally.serious_count();
        self.serious_error_count += serious;
        if serious > 0 {
            self.runs_with_serious_error += 1;
        }
        if result.has_bad_pulse() {
            self.runs_with_bad_pulse += 1;
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.error_counts.is_clean()
    }

    pub fn total_error_count(&self) -> u64 {
        self.error_counts.total()
    }

    /// Percent of all scanned entries showing this kind
    pub fn percent_of_entries(&self, kind: ErrorKind) -> f64 {
        if self.total_entries == 0 {
            return 0.0;
        }
        100.0 * self.error_counts.get(kind) as f64 / self.total_entries as f64
    }

    /// Percent of scanned runs showing this kind
    pub fn percent_of_runs(&self, kind: ErrorKind) -> f64 {
        if self.runs_scanned == 0 {
            return 0.0;
        }
        100.0 * self.runs_with_error.get(kind) as f64 / self.runs_scanned as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pulse::{PulseEstimate, PulseMethod};
    use crate::threshold::ThresholdSet;

    fn result(n_entries: usize, kinds: &[ErrorKind], bad_pulse: bool) -> RunResult {
        let mut tally = ErrorTally::new();
        for kind in kinds {
            tally.increment(*kind);
        }
        RunResult {
            run_number: 9000,
            start_time: 0,
            stop_time: 100,
            n_entries,
            duration: 100.0,
            duration_corrupted: false,
            livetime: 95.0,
            tally,
            thresholds: ThresholdSet::default_software(),
            pedestal_shifts: Vec::new(),
            pulse: PulseEstimate {
                period: if bad_pulse { None } else { Some(7.0) },
                rms: None,
                method: if bad_pulse {
                    PulseMethod::Unusable
                } else {
                    PulseMethod::Histogram
                },
                pulse_count: 10,
            },
            clock_offset: None,
            first_good: Some(0),
            first_event: None,
            last_event: None,
            clock_difference: None,
            unresolved_times: 0,
        }
    }

    #[test]
    fn test_accumulate() {
        let mut summary = ScanSummary::default();
        summary.add_run(&result(100, &[], false));
        assert!(!summary.has_errors());

        summary.add_run(&result(
            300,
            &[
                ErrorKind::ScalerCountEntryMismatch,
                ErrorKind::ScalerCountEntryMismatch,
            ],
            false,
        ));
        // Kind 10 alone does not make a run count as having errors
        assert_eq!(summary.runs_with_any_error, 0);
        assert!(summary.has_errors());

        summary.add_run(&result(
            100,
            &[ErrorKind::ClockDesync, ErrorKind::BadPulsePeriod],
            true,
        ));
        assert_eq!(summary.runs_scanned, 3);
        assert_eq!(summary.total_entries, 500);
        assert_eq!(summary.total_duration, 300.0);
        assert_eq!(summary.runs_with_any_error, 1);
        assert_eq!(summary.serious_error_count, 2);
        assert_eq!(summary.runs_with_serious_error, 1);
        assert_eq!(summary.runs_with_bad_pulse, 1);
        assert_eq!(summary.total_error_count(), 4);
        assert!((summary.percent_of_entries(ErrorKind::ScalerCountEntryMismatch) - 0.4).abs() < 1e-9);
        assert!((summary.percent_of_runs(ErrorKind::ClockDesync) - 100.0 / 3.0).abs() < 1e-9);
    }
}
