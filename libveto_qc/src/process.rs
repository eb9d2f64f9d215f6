use std::sync::mpsc::Sender;

use super::config::Config;
use super::constants::THRESHOLD_TABLE_NAME;
use super::error::ProcessorError;
use super::report::ReportWriter;
use super::scan_status::ScanStatus;
use super::scanner::ScanSession;
use super::source::{EventSource, YamlRunSource};
use super::summary::ScanSummary;
use super::threshold::{ThresholdSet, ThresholdTable};

/// Software thresholds used to compute multiplicity when the source does not supply one.
///
/// A missing or unreadable table is not fatal; every channel falls back to the default.
pub fn load_input_thresholds(config: &Config) -> ThresholdSet {
    let Some(table_path) = &config.threshold_table_path else {
        log::info!("No threshold table given, using default software thresholds.");
        return ThresholdSet::default_software();
    };
    // A directory is taken to hold the table under its usual name
    let table_path = if table_path.is_dir() {
        table_path.join(THRESHOLD_TABLE_NAME)
    } else {
        table_path.clone()
    };
    match ThresholdTable::new(&table_path) {
        Ok(table) => table.input_thresholds(&config.get_dataset_name()),
        Err(e) => {
            log::warn!("Could not load threshold table: {e}. Using default software thresholds.");
            ThresholdSet::default_software()
        }
    }
}

/// Scan every run of `runs` in order from `source`, writing each run to the report.
///
/// Runs which cannot be read or scanned are skipped; the scan continues.
pub fn scan_runs<S: EventSource>(
    source: &mut S,
    runs: &[i32],
    sw_thresholds: ThresholdSet,
    config: &Config,
    report: &mut ReportWriter,
    tx: &Sender<ScanStatus>,
) -> Result<ScanSummary, ProcessorError> {
    let mut session = ScanSession::new(sw_thresholds, config.scan_options());
    let runs_total = runs.len();
    tx.send(ScanStatus::new(runs.first().copied().unwrap_or(0), 0, runs_total))?;

    for (idx, run_number) in runs.iter().enumerate() {
        match source.read_run(*run_number) {
            Ok(raw) => match session.scan_run(&raw) {
                Ok(result) => report.write_run(&result)?,
                Err(e) => {
                    log::warn!("Scan of run {run_number} failed: {e}");
                    session.skip_run(*run_number);
                }
            },
            Err(e) => {
                log::warn!("{e}");
                session.skip_run(*run_number);
            }
        }
        tx.send(ScanStatus::new(*run_number, idx + 1, runs_total))?;
    }

    Ok(session.finish())
}

fn log_summary(summary: &ScanSummary) {
    log::info!(
        "Scanned {} runs ({} skipped), {} entries, {:.2} s total livetime.",
        summary.runs_scanned,
        summary.runs_skipped,
        summary.total_entries,
        summary.total_livetime
    );
    log::info!(
        "Total errors: {}  Runs with errors: {}  Serious errors: {}  Runs with serious errors: {}  Runs with bad LED: {}",
        summary.total_error_count(),
        summary.runs_with_any_error,
        summary.serious_error_count,
        summary.runs_with_serious_error,
        summary.runs_with_bad_pulse
    );
}

/// The main loop of veto_qc.
///
/// Scans the runs of the configured run list and writes the text report. Meant to be
/// called by a separate thread (typically the UI) which watches the `ScanStatus` messages.
pub fn process(config: &Config, tx: &Sender<ScanStatus>) -> Result<ScanSummary, ProcessorError> {
    let runs = config.read_run_list()?;
    log::info!("Found {} runs in the run list.", runs.len());
    let report_path = config.get_report_file_name()?;
    let sw_thresholds = load_input_thresholds(config);
    let deactivated = sw_thresholds.deactivated_channels();
    if !deactivated.is_empty() {
        log::warn!("Input thresholds deactivate channels {deactivated:?}");
    }

    let mut report = ReportWriter::new(&report_path)?;
    let mut source = YamlRunSource::new(&config.data_path);
    let summary = scan_runs(&mut source, &runs, sw_thresholds, config, &mut report, tx)?;
    report.write_summary(&summary)?;
    report.close()?;

    log_summary(&summary);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NUMBER_OF_CHANNELS;
    use crate::error_kind::ErrorKind;
    use crate::event::{RawRecord, RawRun};
    use crate::source::MemorySource;
    use std::sync::mpsc::channel;

    fn small_run(run_number: i32) -> RawRun {
        let records = (0..150)
            .map(|i| {
                let pulse = i % 6 == 0;
                RawRecord {
                    time_primary: 1.0 + i as f64,
                    time_secondary: 501.0 + i as f64,
                    scaler_index: i as i64,
                    scaler_count: i as i64 + 1,
                    qdc1_count: i as i64 + 1,
                    qdc2_count: i as i64 + 1,
                    amplitudes: [if pulse { 2000 } else { 90 }; NUMBER_OF_CHANNELS],
                    multiplicity: None,
                    error_code: 0,
                }
            })
            .collect();
        RawRun {
            run_number,
            start_time: 1_600_000_000,
            stop_time: 1_600_000_150,
            records,
        }
    }

    #[test]
    fn test_scan_runs_skips_missing() {
        let dir = std::env::temp_dir().join("veto_qc_process_scan_test");
        std::fs::create_dir_all(&dir).unwrap();
        let config = Config {
            output_path: dir.clone(),
            ..Default::default()
        };
        let mut report = ReportWriter::new(&dir.join("report.txt")).unwrap();
        let mut source = MemorySource::new(vec![small_run(9001), small_run(9003)]);
        let (tx, rx) = channel();

        let summary = scan_runs(
            &mut source,
            &[9001, 9002, 9003],
            ThresholdSet::default_software(),
            &config,
            &mut report,
            &tx,
        )
        .unwrap();
        report.close().unwrap();

        assert_eq!(summary.runs_scanned, 2);
        assert_eq!(summary.runs_skipped, 1);
        assert_eq!(summary.total_entries, 300);
        assert_eq!(summary.error_counts.get(ErrorKind::PedestalShift), 0);
        let statuses: Vec<ScanStatus> = rx.try_iter().collect();
        assert_eq!(statuses.len(), 4);
        assert_eq!(statuses.last().unwrap().progress, 1.0);
    }

    #[test]
    fn test_corrupted_timestamp_does_not_stop_scan() {
        let dir = std::env::temp_dir().join("veto_qc_process_timestamp_test");
        std::fs::create_dir_all(&dir).unwrap();
        let config = Config {
            output_path: dir.clone(),
            ..Default::default()
        };
        let report_path = dir.join("report.txt");
        let mut report = ReportWriter::new(&report_path).unwrap();
        let mut corrupted = small_run(9002);
        corrupted.start_time = 0x0000_FFFF_FFFF_FFFF;
        let mut source = MemorySource::new(vec![small_run(9001), corrupted, small_run(9003)]);
        let (tx, _rx) = channel();

        let summary = scan_runs(
            &mut source,
            &[9001, 9002, 9003],
            ThresholdSet::default_software(),
            &config,
            &mut report,
            &tx,
        )
        .unwrap();
        report.write_summary(&summary).unwrap();
        report.close().unwrap();

        assert_eq!(summary.runs_scanned, 3);
        assert_eq!(summary.runs_skipped, 0);
        let contents = std::fs::read_to_string(&report_path).unwrap();
        assert!(contents.contains("Run 9002"));
        assert!(contents.contains("Run 9003"));
        assert!(contents.contains("Scan summary"));
    }

    #[test]
    fn test_process_end_to_end() {
        let dir = std::env::temp_dir().join("veto_qc_process_e2e_test");
        let data_dir = dir.join("data");
        std::fs::create_dir_all(&data_dir).unwrap();
        let list_path = dir.join("DS_test.txt");
        std::fs::write(&list_path, "9201\n9202\n").unwrap();
        let run = small_run(9201);
        let source = YamlRunSource::new(&data_dir);
        std::fs::write(source.run_path(9201), serde_yaml::to_string(&run).unwrap()).unwrap();

        let config = Config {
            run_list_path: list_path,
            data_path: data_dir,
            output_path: dir.clone(),
            ..Default::default()
        };
        let (tx, _rx) = channel();
        let summary = process(&config, &tx).unwrap();
        assert_eq!(summary.runs_scanned, 1);
        assert_eq!(summary.runs_skipped, 1);

        let report = std::fs::read_to_string(dir.join("vPerf_DS_test.txt")).unwrap();
        assert!(report.contains("Run 9201"));
        assert!(report.contains("Scan summary"));
    }

    #[test]
    fn test_missing_run_list_is_fatal() {
        let config = Config::default();
        let (tx, _rx) = channel();
        assert!(matches!(
            process(&config, &tx),
            Err(ProcessorError::RunListError(_))
        ));
    }
}
