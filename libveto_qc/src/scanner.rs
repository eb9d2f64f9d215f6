//! The two-pass run scanner.
//!
//! Each run goes through the phases of [`RunPhase`] in order. The first pass walks
//! every event once to learn the run context (first good entry, clock offset,
//! pulser period, provisional times). The context is frozen into a [`RunContext`]
//! which the second pass consumes to assign final times, check the event
//! counters and clocks, and fill the amplitude histograms used for calibration.
//!
//! Everything carried from one run to the next (previous thresholds and the
//! running totals) lives in the [`ScanSession`].
use super::classifier::ErrorClassifier;
use super::error::ScanError;
use super::error_kind::{ErrorKind, ErrorTally};
use super::event::{EventCounters, RawRun, VetoEvent};
use super::pulse::{PulseEstimate, PulseEstimator};
use super::summary::ScanSummary;
use super::threshold::{find_pedestal_shifts, ChannelHistograms, PedestalShift, ThresholdSet};
use super::time_sync::{clock_offset, DesyncTracker, EventTime, TimeReconciler, TimeSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Init,
    Pass1Scanning,
    Pass1Done,
    Pass2Scanning,
    RunComplete,
}

/// Options applied to every run of a scan
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub deactivate_channels: bool,
    pub dump_skipped: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            deactivate_channels: true,
            dump_skipped: false,
        }
    }
}

/// Snapshot of the counters and clocks of one event, for the run report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventSummary {
    pub index: usize,
    pub counters: EventCounters,
    pub time_primary: f64,
    /// SBC time minus the clock offset (raw SBC time if there is no offset)
    pub time_secondary: f64,
    pub scaler_index: i64,
}

impl EventSummary {
    pub fn new(event: &VetoEvent, offset: Option<f64>) -> Self {
        Self {
            index: event.index,
            counters: event.counters,
            time_primary: event.time_primary,
            time_secondary: event.time_secondary - offset.unwrap_or(0.0),
            scaler_index: event.scaler_index,
        }
    }
}

/// First good entry: both clocks positive and neither a corrupted scaler nor a
/// missing packet
fn is_first_good_candidate(event: &VetoEvent) -> bool {
    event.time_secondary > 0.0
        && event.time_primary > 0.0
        && event.is_primary_valid()
        && !event.has_missing_packet()
}

/// Everything the first pass learned about a run
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_number: i32,
    pub n_entries: usize,
    pub duration: f64,
    pub duration_corrupted: bool,
    pub livetime: f64,
    pub first_good: Option<usize>,
    pub clock_offset: Option<f64>,
    pub last_good_time: f64,
    pub pulse: PulseEstimate,
    pub provisional_times: Vec<f64>,
    pub primary_valid: Vec<bool>,
}

impl RunContext {
    /// Continuity checks only apply after this entry
    pub fn first_good_index(&self) -> usize {
        self.first_good.unwrap_or(0)
    }
}

/// Full result of analyzing a single run in isolation
#[derive(Debug, Clone)]
pub struct RunAnalysis {
    pub context: RunContext,
    pub start_time: i64,
    pub stop_time: i64,
    pub tally: ErrorTally,
    pub times: Vec<EventTime>,
    pub unresolved_times: usize,
    pub thresholds: ThresholdSet,
    pub first_event: Option<EventSummary>,
    pub last_event: Option<EventSummary>,
    pub clock_difference: Option<f64>,
}

/// A run being scanned. Owns the classified events and the run tally.
#[derive(Debug)]
pub struct RunScan<'a> {
    raw: &'a RawRun,
    events: Vec<VetoEvent>,
    classifier: &'a ErrorClassifier,
    tally: ErrorTally,
    phase: RunPhase,
}

impl<'a> RunScan<'a> {
    /// Classify every record of the run
    pub fn new(
        raw: &'a RawRun,
        sw_thresholds: &ThresholdSet,
        classifier: &'a ErrorClassifier,
    ) -> Result<Self, ScanError> {
        if raw.records.is_empty() {
            return Err(ScanError::EmptyRun(raw.run_number));
        }
        let events = raw
            .records
            .iter()
            .enumerate()
            .map(|(idx, record)| VetoEvent::new(idx, record, sw_thresholds))
            .collect();
        Ok(Self {
            raw,
            events,
            classifier,
            tally: ErrorTally::new(),
            phase: RunPhase::Init,
        })
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn events(&self) -> &[VetoEvent] {
        &self.events
    }

    fn set_phase(&mut self, phase: RunPhase) {
        log::debug!("Run {}: {:?} -> {:?}", self.raw.run_number, self.phase, phase);
        self.phase = phase;
    }

    /// Walk all events once and freeze what was learned into a RunContext
    pub fn first_pass(mut self) -> FirstPassDone<'a> {
        self.set_phase(RunPhase::Pass1Scanning);
        let run_number = self.raw.run_number;
        let n_entries = self.events.len();
        let recorded_duration = self.raw.recorded_duration();
        let duration_ok = self.raw.stop_time != 0 && recorded_duration > 0.0;

        let mut provisional_times = Vec::with_capacity(n_entries);
        let mut primary_valid = Vec::with_capacity(n_entries);
        let mut first_good: Option<usize> = None;
        let mut last_good_time = 0.0;
        let mut pulses = PulseEstimator::new();

        for event in self.events.iter() {
            event.flags.tally_into(&mut self.tally);

            let time = if event.is_primary_valid() {
                event.time_primary
            } else if duration_ok {
                (event.index as f64 / n_entries as f64) * recorded_duration
            } else {
                0.0
            };
            provisional_times.push(time);
            primary_valid.push(event.is_primary_valid());

            if self.classifier.check_for_bad_errors(event) {
                continue;
            }

            if first_good.is_none() && is_first_good_candidate(event) {
                first_good = Some(event.index);
            }

            pulses.add(event.multiplicity, time);
            last_good_time = time;
        }

        let first_event = first_good.map(|idx| &self.events[idx]);
        let first_time = first_event.map(|e| e.time_primary).unwrap_or(0.0);
        let clock_offset = first_event.map(clock_offset);
        match first_event {
            Some(first) => log::info!(
                "First good entry: {}  |  SBCOffset: {:.2}  |  firstScalerTime: {:.6}  |  firstSBCTime: {:.6}  |  firstScalerIndex: {}",
                first.index,
                clock_offset.unwrap_or(0.0),
                first.time_primary,
                first.time_secondary,
                first.scaler_index
            ),
            None => log::warn!("Run {run_number}: no good first entry found! Clock offset unavailable."),
        }

        let duration = if duration_ok {
            recorded_duration
        } else {
            let fallback = last_good_time - first_time;
            log::warn!("Corrupted duration. Using last good timestamp method: {fallback:.2}");
            fallback
        };
        // Time before the first good scaler reading is dead time
        let livetime = if duration_ok {
            duration - first_time
        } else {
            duration
        };

        let pulse = pulses.estimate(n_entries, duration);
        log::info!(
            "\"Simple\" LED count: {}.  Approx rate: {:.3}",
            pulse.pulse_count,
            if duration > 0.0 {
                pulse.pulse_count as f64 / duration
            } else {
                0.0
            }
        );
        if pulse.is_out_of_band() {
            log::warn!(
                "Run {run_number}: LED period {:.2} s is outside of the expected band",
                pulse.period_or_sentinel()
            );
            self.tally.increment(ErrorKind::BadPulsePeriod);
        }

        let context = RunContext {
            run_number,
            n_entries,
            duration,
            duration_corrupted: !duration_ok,
            livetime,
            first_good,
            clock_offset,
            last_good_time,
            pulse,
            provisional_times,
            primary_valid,
        };
        self.set_phase(RunPhase::Pass1Done);
        FirstPassDone {
            scan: self,
            context,
        }
    }
}

/// A run whose first pass is complete
#[derive(Debug)]
pub struct FirstPassDone<'a> {
    scan: RunScan<'a>,
    context: RunContext,
}

impl<'a> FirstPassDone<'a> {
    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Re-walk all events with the frozen context, then calibrate the thresholds
    pub fn second_pass(self, deactivate_channels: bool) -> RunAnalysis {
        let FirstPassDone { mut scan, context } = self;
        scan.set_phase(RunPhase::Pass2Scanning);
        let run_number = context.run_number;
        let first_good = context.first_good_index();
        let reconciler = TimeReconciler::new(
            run_number,
            context.clock_offset,
            &context.provisional_times,
            &context.primary_valid,
        );

        let mut times = Vec::with_capacity(context.n_entries);
        let mut unresolved_times = 0;
        let mut desync = DesyncTracker::new();
        let mut clock_difference = None;
        let mut prev_good = EventCounters::default();
        let mut prev_good_index = 0;
        let mut last_event = None;
        let mut hists = ChannelHistograms::new();

        for event in scan.events.iter() {
            let index = event.index;
            let time = match reconciler.reconcile(event) {
                Ok(time) => time,
                Err(e) => {
                    log::warn!("Run {run_number}: time of entry {index} unresolved: {e}");
                    unresolved_times += 1;
                    EventTime {
                        seconds: context.provisional_times[index],
                        source: TimeSource::Unresolved,
                    }
                }
            };
            times.push(time);

            if event.has_missing_packet() {
                log::info!(
                    "{} Missing Packet. Run: {run_number}  |  entry: {index}  |  Scaler Index: {}  |  Scaler Time: {:.6}  |  SBC Time: {:.6}",
                    ErrorKind::MissingChannels,
                    event.scaler_index,
                    event.time_primary,
                    event.time_secondary
                );
            }

            if index > first_good {
                check_counters(
                    run_number,
                    event,
                    &prev_good,
                    index - prev_good_index,
                    &mut scan.tally,
                );
            }

            let primary = event.is_primary_valid().then_some(event.time_primary);
            let secondary = primary.and_then(|_| reconciler.adjusted_secondary(event));
            let checkable =
                context.clock_offset.is_some() && !event.has_missing_packet() && index > first_good;
            if let Some(found) = desync.update(primary, secondary, checkable) {
                log::info!(
                    "{} Scaler/SBC Desynch. Run: {run_number}  |  Entry: {index}  |  Scaler DeltaT: {:.6}  |  SBC DeltaT: {:.6}  |  Prev TSdifference: {:.6}  |  ScalerTime: {:.6}",
                    ErrorKind::ClockDesync,
                    found.primary_delta,
                    found.secondary_delta,
                    found.previous_difference,
                    event.time_primary
                );
                scan.tally.increment(ErrorKind::ClockDesync);
            }
            if let (Some(p), Some(s)) = (primary, secondary) {
                clock_difference = Some(p - s);
            }

            if event.is_hard_bad() {
                continue;
            }
            hists.fill(&event.amplitudes);
            prev_good = event.counters;
            prev_good_index = index;
            last_event = Some(EventSummary::new(event, context.clock_offset));
        }

        if let Some(diff) = clock_difference {
            log::info!("Run {run_number} Scaler/SBC duration difference: {diff:.6}");
        }

        let thresholds = hists.calibrate(deactivate_channels);
        let first_event = context
            .first_good
            .map(|idx| EventSummary::new(&scan.events[idx], context.clock_offset));
        scan.set_phase(RunPhase::RunComplete);

        RunAnalysis {
            start_time: scan.raw.start_time,
            stop_time: scan.raw.stop_time,
            tally: scan.tally,
            times,
            unresolved_times,
            thresholds,
            first_event,
            last_event,
            clock_difference,
            context,
        }
    }
}

/// Event counters must not reset, and must not move by more than the number of
/// entries since the last good event.
fn check_counters(
    run_number: i32,
    event: &VetoEvent,
    prev_good: &EventCounters,
    elapsed: usize,
    tally: &mut ErrorTally,
) {
    for ((value, reset, jump), (prev, _, _)) in event
        .counters
        .checks()
        .into_iter()
        .zip(prev_good.checks().into_iter())
    {
        if value == 0 {
            log::info!(
                "{reset} Counter Reset. Run: {run_number}  |  entry: {}  |  Index: {}  |  prev: {prev}",
                event.index,
                event.scaler_index
            );
            tally.increment(reset);
            continue;
        }
        let change = value - prev;
        if change < 0 || change > elapsed as i64 {
            log::info!(
                "{jump} Counter Change. Run: {run_number}  |  entry: {}  |  Index: {}  |  count: {value}  |  prev: {prev}  |  elapsed: {elapsed}",
                event.index,
                event.scaler_index
            );
            tally.increment(jump);
        }
    }
}

/// Run a complete two-pass analysis of one run
pub fn analyze_run(
    raw: &RawRun,
    sw_thresholds: &ThresholdSet,
    classifier: &ErrorClassifier,
    deactivate_channels: bool,
) -> Result<RunAnalysis, ScanError> {
    Ok(RunScan::new(raw, sw_thresholds, classifier)?
        .first_pass()
        .second_pass(deactivate_channels))
}

/// What survives of a run once it has been scanned
#[derive(Debug, Clone)]
pub struct RunResult {
    pub run_number: i32,
    pub start_time: i64,
    pub stop_time: i64,
    pub n_entries: usize,
    pub duration: f64,
    pub duration_corrupted: bool,
    pub livetime: f64,
    pub tally: ErrorTally,
    pub thresholds: ThresholdSet,
    pub pedestal_shifts: Vec<PedestalShift>,
    pub pulse: PulseEstimate,
    pub clock_offset: Option<f64>,
    pub first_good: Option<usize>,
    pub first_event: Option<EventSummary>,
    pub last_event: Option<EventSummary>,
    pub clock_difference: Option<f64>,
    pub unresolved_times: usize,
}

impl RunResult {
    pub fn has_bad_pulse(&self) -> bool {
        self.pulse.is_bad()
    }
}

/// State carried across the runs of a scan.
///
/// Runs must be fed in order; the pedestal comparison is always against the
/// previous successfully scanned run.
#[derive(Debug)]
pub struct ScanSession {
    sw_thresholds: ThresholdSet,
    classifier: ErrorClassifier,
    options: ScanOptions,
    previous_thresholds: Option<ThresholdSet>,
    summary: ScanSummary,
}

impl ScanSession {
    pub fn new(sw_thresholds: ThresholdSet, options: ScanOptions) -> Self {
        Self {
            sw_thresholds,
            classifier: ErrorClassifier::new(options.dump_skipped),
            options,
            previous_thresholds: None,
            summary: ScanSummary::default(),
        }
    }

    pub fn summary(&self) -> &ScanSummary {
        &self.summary
    }

    pub fn previous_thresholds(&self) -> Option<&ThresholdSet> {
        self.previous_thresholds.as_ref()
    }

    /// Record a run that could not be scanned
    pub fn skip_run(&mut self, run_number: i32) {
        log::warn!("Skipping run {run_number}.");
        self.summary.runs_skipped += 1;
    }

    pub fn scan_run(&mut self, raw: &RawRun) -> Result<RunResult, ScanError> {
        log::info!(
            "======= Scanning run {}, {} entries. =======",
            raw.run_number,
            raw.n_entries()
        );
        let analysis = analyze_run(
            raw,
            &self.sw_thresholds,
            &self.classifier,
            self.options.deactivate_channels,
        )?;
        let RunAnalysis {
            context,
            start_time,
            stop_time,
            mut tally,
            thresholds,
            first_event,
            last_event,
            clock_difference,
            unresolved_times,
            ..
        } = analysis;

        let pedestal_shifts = match &self.previous_thresholds {
            Some(previous) => find_pedestal_shifts(previous, &thresholds),
            None => Vec::new(),
        };
        for shift in pedestal_shifts.iter() {
            log::warn!(
                "Found pedestal shift! Panel: {}  Previous: {}  This run: {}",
                shift.channel,
                shift.previous,
                shift.current
            );
            tally.increment(ErrorKind::PedestalShift);
        }
        self.previous_thresholds = Some(thresholds.clone());

        let result = RunResult {
            run_number: context.run_number,
            start_time,
            stop_time,
            n_entries: context.n_entries,
            duration: context.duration,
            duration_corrupted: context.duration_corrupted,
            livetime: context.livetime,
            tally,
            thresholds,
            pedestal_shifts,
            pulse: context.pulse,
            clock_offset: context.clock_offset,
            first_good: context.first_good,
            first_event,
            last_event,
            clock_difference,
            unresolved_times,
        };
        self.summary.add_run(&result);
        log_run_end(&result);
        Ok(result)
    }

    pub fn finish(self) -> ScanSummary {
        self.summary
    }
}

fn event_summary_line(label: &str, event: &Option<EventSummary>) -> String {
    match event {
        Some(e) => format!(
            "[{label} EVENT] entry: {}  |  SEC: {}  |  QEC: {}  |  QEC2: {}  |  ScalerTime: {:.6}  |  SBCTime: {:.6}  |  ScalerIndex: {}",
            e.index,
            e.counters.scaler,
            e.counters.qdc1,
            e.counters.qdc2,
            e.time_primary,
            e.time_secondary,
            e.scaler_index
        ),
        None => format!("[{label} EVENT] none"),
    }
}

/// End of run banner, event summaries and tallies, one log line each
pub fn run_end_lines(result: &RunResult) -> Vec<String> {
    let mut lines = vec![
        format!(
            "=================== End Run {}. =====================",
            result.run_number
        ),
        event_summary_line("FIRST", &result.first_event),
        event_summary_line("LAST", &result.last_event),
    ];
    for (kind, count) in result.tally.iter().filter(|(_, count)| *count > 0) {
        lines.push(format!("{kind} {count}  {}", kind.description()));
    }
    if result.tally.unclassified() > 0 {
        lines.push(format!("Flag 0 events: {}", result.tally.unclassified()));
    }
    lines.push(format!(
        "Errors this run: {}  Serious: {}",
        result.tally.any_error_count(),
        result.tally.serious_count()
    ));
    lines.push(format!(
        "Duration: {:.2} seconds, Livetime: {:.2} seconds.",
        result.duration, result.livetime
    ));
    lines
}

fn log_run_end(result: &RunResult) {
    for line in run_end_lines(result) {
        log::info!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NUMBER_OF_CHANNELS;
    use crate::event::RawRecord;
    use crate::threshold::Threshold;

    const SPACING: f64 = 1.2;
    const SBC_SHIFT: f64 = 1_000.0;
    const START: i64 = 1_500_000_000;

    fn true_time(index: usize) -> f64 {
        SPACING * (index + 1) as f64
    }

    /// A clean run: pulser every 5 entries, pedestal at 100 on every channel
    fn synthetic_run(run_number: i32, n_entries: usize) -> RawRun {
        let records = (0..n_entries)
            .map(|i| {
                let pulse = i % 5 == 0;
                let count = i as i64 + 1;
                RawRecord {
                    time_primary: true_time(i),
                    time_secondary: true_time(i) + SBC_SHIFT,
                    scaler_index: 2 * i as i64,
                    scaler_count: count,
                    qdc1_count: count,
                    qdc2_count: count,
                    amplitudes: [if pulse { 1000 } else { 100 }; NUMBER_OF_CHANNELS],
                    multiplicity: Some(if pulse { 32 } else { 1 }),
                    error_code: 0,
                }
            })
            .collect();
        RawRun {
            run_number,
            start_time: START,
            stop_time: START + (SPACING * n_entries as f64) as i64,
            records,
        }
    }

    fn analyze(raw: &RawRun) -> RunAnalysis {
        analyze_run(
            raw,
            &ThresholdSet::default_software(),
            &ErrorClassifier::default(),
            true,
        )
        .unwrap()
    }

    #[test]
    fn test_clean_run() {
        let raw = synthetic_run(9000, 100);
        let analysis = analyze(&raw);
        assert!(analysis.tally.is_clean(), "{:?}", analysis.tally);
        let period = analysis.context.pulse.period.unwrap();
        assert!((period - 5.0 * SPACING).abs() < 0.01);
        assert_eq!(analysis.context.first_good, Some(0));
        assert!((analysis.context.clock_offset.unwrap() - SBC_SHIFT).abs() < 1e-9);
        assert_eq!(analysis.context.duration, 120.0);
        assert_eq!(analysis.unresolved_times, 0);
        assert!(analysis
            .times
            .iter()
            .all(|t| t.source == TimeSource::Primary));
        assert_eq!(analysis.thresholds.get(0), Threshold::Value(135));
        assert_eq!(analysis.last_event.unwrap().index, 99);
    }

    #[test]
    fn test_phases() {
        let raw = synthetic_run(9000, 10);
        let classifier = ErrorClassifier::default();
        let scan = RunScan::new(&raw, &ThresholdSet::default_software(), &classifier).unwrap();
        assert_eq!(scan.phase(), RunPhase::Init);
        let done = scan.first_pass();
        assert_eq!(done.scan.phase(), RunPhase::Pass1Done);
        assert_eq!(done.context().provisional_times.len(), 10);
        let analysis = done.second_pass(true);
        assert_eq!(analysis.times.len(), 10);
    }

    #[test]
    fn test_empty_run() {
        let raw = RawRun {
            run_number: 12,
            ..Default::default()
        };
        assert!(matches!(
            analyze_run(
                &raw,
                &ThresholdSet::default_software(),
                &ErrorClassifier::default(),
                true
            ),
            Err(ScanError::EmptyRun(12))
        ));
    }

    #[test]
    fn test_secondary_clock_bridges_bad_scaler() {
        let mut raw = synthetic_run(9000, 100);
        for i in 10..=15 {
            raw.records[i].error_code = 1 << 4;
            raw.records[i].time_primary = 1.8e19;
        }
        let analysis = analyze(&raw);
        for i in 10..=15 {
            let time = analysis.times[i];
            assert_eq!(time.source, TimeSource::Secondary);
            assert!((time.seconds - true_time(i)).abs() < 1e-6);
        }
        assert!(analysis.times[9].seconds < analysis.times[10].seconds);
        assert!(analysis.times[15].seconds < analysis.times[16].seconds);
        assert_eq!(analysis.tally.get(ErrorKind::BadTimestamp), 6);
        assert_eq!(analysis.tally.get(ErrorKind::ClockDesync), 0);
        assert_eq!(analysis.tally.get(ErrorKind::ScalerCountJump), 0);
    }

    #[test]
    fn test_old_run_interpolates_bad_scaler() {
        let mut raw = synthetic_run(8000, 100);
        raw.records[20].error_code = 1 << 4;
        let analysis = analyze(&raw);
        let time = analysis.times[20];
        assert_eq!(time.source, TimeSource::Interpolated);
        assert!((time.seconds - true_time(20)).abs() < 1e-9);
    }

    #[test]
    fn test_unresolved_time_is_flagged() {
        let mut raw = synthetic_run(8000, 100);
        raw.records[99].error_code = 1 << 4;
        let analysis = analyze(&raw);
        assert_eq!(analysis.unresolved_times, 1);
        assert_eq!(analysis.times[99].source, TimeSource::Unresolved);
    }

    #[test]
    fn test_counter_reset() {
        let mut raw = synthetic_run(9000, 100);
        for (n, record) in raw.records.iter_mut().skip(50).enumerate() {
            record.scaler_count = n as i64;
        }
        let analysis = analyze(&raw);
        assert_eq!(analysis.tally.get(ErrorKind::ScalerCountReset), 1);
        assert_eq!(analysis.tally.get(ErrorKind::ScalerCountJump), 0);
        assert_eq!(analysis.tally.get(ErrorKind::Qdc1CountReset), 0);
    }

    #[test]
    fn test_counter_reset_before_first_good_ignored() {
        let mut raw = synthetic_run(9000, 100);
        raw.records[0].time_secondary = 0.0;
        raw.records[1].time_secondary = 0.0;
        raw.records[1].qdc2_count = 0;
        let analysis = analyze(&raw);
        assert_eq!(analysis.context.first_good, Some(2));
        assert_eq!(analysis.tally.get(ErrorKind::Qdc2CountReset), 0);
    }

    #[test]
    fn test_counter_jump_respects_skipped_events() {
        let mut raw = synthetic_run(9000, 100);
        // Two hard-bad events: the counters may advance by three at entry 43
        raw.records[41].error_code = 1 << 3;
        raw.records[42].error_code = 1 << 3;
        raw.records[60].qdc1_count += 5;
        let analysis = analyze(&raw);
        assert_eq!(analysis.tally.get(ErrorKind::ScalerOnly), 2);
        assert_eq!(analysis.tally.get(ErrorKind::ScalerCountJump), 0);
        // Jump up at 60 and back down at 61
        assert_eq!(analysis.tally.get(ErrorKind::Qdc1CountJump), 2);
    }

    #[test]
    fn test_desync() {
        let mut raw = synthetic_run(9000, 100);
        for record in raw.records.iter_mut().skip(30) {
            record.time_secondary += 10.0;
        }
        let analysis = analyze(&raw);
        assert_eq!(analysis.tally.get(ErrorKind::ClockDesync), 1);
        assert!((analysis.clock_difference.unwrap() + 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_corrupted_duration() {
        let mut raw = synthetic_run(9000, 100);
        raw.stop_time = 0;
        let analysis = analyze(&raw);
        assert!(analysis.context.duration_corrupted);
        assert!((analysis.context.duration - (true_time(99) - true_time(0))).abs() < 1e-9);
    }

    #[test]
    fn test_short_run_bad_pulse() {
        let raw = synthetic_run(9000, 12);
        let analysis = analyze(&raw);
        assert!(analysis.context.pulse.is_bad());
        assert_eq!(analysis.tally.get(ErrorKind::BadPulsePeriod), 1);
    }

    /// Move the pedestal of one channel on every non-pulser record
    fn set_pedestal(raw: &mut RawRun, channel: usize, amplitude: i32) {
        for record in raw
            .records
            .iter_mut()
            .filter(|r| r.multiplicity == Some(1))
        {
            record.amplitudes[channel] = amplitude;
        }
    }

    #[test]
    fn test_pedestal_drift_between_runs() {
        let mut first = synthetic_run(9001, 100);
        let mut second = synthetic_run(9002, 100);
        set_pedestal(&mut first, 7, 485);
        set_pedestal(&mut second, 7, 565);

        let mut session = ScanSession::new(ThresholdSet::default_software(), ScanOptions::default());
        let result_one = session.scan_run(&first).unwrap();
        assert_eq!(result_one.thresholds.get(7), Threshold::Value(520));
        assert!(result_one.pedestal_shifts.is_empty());
        assert_eq!(result_one.tally.get(ErrorKind::PedestalShift), 0);

        let result_two = session.scan_run(&second).unwrap();
        assert_eq!(result_two.thresholds.get(7), Threshold::Value(600));
        assert_eq!(
            result_two.pedestal_shifts,
            vec![PedestalShift {
                channel: 7,
                previous: 520,
                current: 600
            }]
        );
        assert_eq!(result_two.tally.get(ErrorKind::PedestalShift), 1);
        assert_eq!(session.previous_thresholds(), Some(&result_two.thresholds));

        let summary = session.finish();
        assert_eq!(summary.runs_scanned, 2);
        assert_eq!(summary.error_counts.get(ErrorKind::PedestalShift), 1);
        assert_eq!(summary.runs_with_error.get(ErrorKind::PedestalShift), 1);
    }

    #[test]
    fn test_end_of_run_lines() {
        let mut raw = synthetic_run(9000, 100);
        for (n, record) in raw.records.iter_mut().skip(50).enumerate() {
            record.scaler_count = n as i64;
        }
        let mut session = ScanSession::new(ThresholdSet::default_software(), ScanOptions::default());
        let result = session.scan_run(&raw).unwrap();
        let lines = run_end_lines(&result);
        assert_eq!(lines[0], "=================== End Run 9000. =====================");
        assert!(lines[1].starts_with("[FIRST EVENT] entry: 0  |  SEC: 1  |"));
        assert!(lines[2].starts_with("[LAST EVENT] entry: 99  |"));
        assert!(lines
            .iter()
            .any(|line| line.starts_with("Error[19] 1  Scaler Event Count reset")));
        assert!(lines.iter().any(|line| line == "Errors this run: 1  Serious: 1"));
    }
}
