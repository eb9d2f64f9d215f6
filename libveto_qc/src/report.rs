use std::fmt::Write as FmtWrite;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use super::error::ReportError;
use super::error_kind::ErrorKind;
use super::scanner::{EventSummary, RunResult};
use super::summary::ScanSummary;

/// Render a unix timestamp for the report. Corrupted timestamps are printed raw.
fn format_timestamp(unix_seconds: i64) -> String {
    let formatted = OffsetDateTime::from_unix_timestamp(unix_seconds)
        .ok()
        .and_then(|time| time.format(&Rfc3339).ok());
    match formatted {
        Some(text) => text,
        None => {
            log::warn!("Timestamp {unix_seconds} cannot be represented as a date; writing it raw");
            format!("{unix_seconds} (unix seconds, invalid)")
        }
    }
}

fn format_event(label: &str, event: &Option<EventSummary>) -> String {
    match event {
        Some(e) => format!(
            "{label} good entry: {}  |  ScalerCount: {}  |  QDC1Count: {}  |  QDC2Count: {}  |  ScalerTime: {:.6}  |  SBCTime: {:.6}  |  ScalerIndex: {}\n",
            e.index,
            e.counters.scaler,
            e.counters.qdc1,
            e.counters.qdc2,
            e.time_primary,
            e.time_secondary,
            e.scaler_index
        ),
        None => format!("{label} good entry: none\n"),
    }
}

/// One block of the report for a single run
pub fn format_run(result: &RunResult) -> String {
    // Writing to a String never fails
    let mut out = String::new();
    let _ = writeln!(out, "======== Run {} ========", result.run_number);
    let _ = writeln!(
        out,
        "Start: {}  Stop: {}",
        format_timestamp(result.start_time),
        format_timestamp(result.stop_time)
    );
    let _ = writeln!(
        out,
        "Entries: {}  Duration: {:.2} s{}  Livetime: {:.2} s",
        result.n_entries,
        result.duration,
        if result.duration_corrupted {
            " (corrupted, from last good timestamp)"
        } else {
            ""
        },
        result.livetime
    );
    match result.clock_offset {
        Some(offset) => {
            let _ = writeln!(out, "SBC offset: {offset:.2}");
        }
        None => out.push_str("SBC offset: unavailable\n"),
    }
    out.push_str(&format_event("First", &result.first_event));
    out.push_str(&format_event("Last", &result.last_event));
    if let Some(diff) = result.clock_difference {
        let _ = writeln!(out, "Scaler/SBC duration difference: {diff:.6}");
    }
    if result.unresolved_times > 0 {
        let _ = writeln!(out, "Unresolved event times: {}", result.unresolved_times);
    }

    let pulse = &result.pulse;
    let _ = writeln!(
        out,
        "LED period: {:.4} s ({:?}, {} pulses){}",
        pulse.period_or_sentinel(),
        pulse.method,
        pulse.pulse_count,
        if pulse.is_out_of_band() { "  BAD" } else { "" }
    );

    let thresholds: Vec<String> = result
        .thresholds
        .thresholds()
        .iter()
        .map(|t| t.to_string())
        .collect();
    let _ = writeln!(out, "Thresholds: {}", thresholds.join(" "));
    for shift in result.pedestal_shifts.iter() {
        let _ = writeln!(
            out,
            "Pedestal shift: panel {}  previous {}  this run {}",
            shift.channel, shift.previous, shift.current
        );
    }

    for (kind, count) in result.tally.iter().filter(|(_, count)| *count > 0) {
        let _ = writeln!(out, "{kind}: {count}  {}", kind.description());
    }
    if result.tally.unclassified() > 0 {
        let _ = writeln!(
            out,
            "Events with flag 0: {}  (skipped, no error kind)",
            result.tally.unclassified()
        );
    }
    let _ = writeln!(
        out,
        "Errors this run: {}  Serious: {}",
        result.tally.any_error_count(),
        result.tally.serious_count()
    );
    out
}

/// Totals of the whole scan, with the per-kind table when anything was found
pub fn format_summary(summary: &ScanSummary) -> String {
    let mut out = String::new();
    out.push_str("======== Scan summary ========\n");
    let _ = writeln!(
        out,
        "Runs scanned: {}  Runs skipped: {}",
        summary.runs_scanned, summary.runs_skipped
    );
    let _ = writeln!(
        out,
        "Total entries: {}  Total duration: {:.2} s  Total livetime: {:.2} s",
        summary.total_entries, summary.total_duration, summary.total_livetime
    );
    let _ = writeln!(
        out,
        "Total errors: {}  Runs with errors: {}",
        summary.total_error_count(),
        summary.runs_with_any_error
    );
    let _ = writeln!(
        out,
        "Serious errors: {}  Runs with serious errors: {}",
        summary.serious_error_count, summary.runs_with_serious_error
    );
    let _ = writeln!(out, "Runs with bad LED: {}", summary.runs_with_bad_pulse);
    if summary.error_counts.unclassified() > 0 {
        let _ = writeln!(
            out,
            "Events with flag 0: {}",
            summary.error_counts.unclassified()
        );
    }

    if !summary.has_errors() {
        out.push_str("No errors found.\n");
        return out;
    }

    out.push_str("---- Errors by kind ----\n");
    for (kind, count) in summary.error_counts.iter().filter(|(_, count)| *count > 0) {
        let runs = summary.runs_with_error.get(kind);
        if kind == ErrorKind::BadPulsePeriod {
            let _ = writeln!(
                out,
                "{kind}: {runs} runs ({:.4}%)",
                summary.percent_of_runs(kind)
            );
        } else {
            let _ = writeln!(
                out,
                "{kind}: {count} events ({:.4}%)  {runs} runs ({:.4}%)",
                summary.percent_of_entries(kind),
                summary.percent_of_runs(kind)
            );
        }
    }

    out.push_str("---- Error reference ----\n");
    for kind in ErrorKind::ALL.iter() {
        let _ = writeln!(out, "{kind}: {}", kind.description());
    }
    out.push_str("Serious errors are 1, 18-26\n");
    out
}

/// Text report of a scan, written one run block at a time
#[derive(Debug)]
pub struct ReportWriter {
    writer: BufWriter<File>,
}

impl ReportWriter {
    pub fn new(path: &Path) -> Result<Self, ReportError> {
        let file = File::create(path)?;
        log::info!("Writing report to {}", path.to_string_lossy());
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    pub fn write_run(&mut self, result: &RunResult) -> Result<(), ReportError> {
        self.writer.write_all(format_run(result).as_bytes())?;
        Ok(())
    }

    pub fn write_summary(&mut self, summary: &ScanSummary) -> Result<(), ReportError> {
        self.writer.write_all(format_summary(summary).as_bytes())?;
        Ok(())
    }

    pub fn close(mut self) -> Result<(), ReportError> {
        self.writer.flush()?;
        Ok(())
    }
}
