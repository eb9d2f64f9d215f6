//! # veto_qc
//!
//! veto_qc is the data-quality scanner for the muon veto, written in Rust. It reads the
//! raw veto records of a list of runs, classifies every event against the hardware and
//! run-level error taxonomy, reconciles the scaler and SBC clocks, estimates the LED
//! pulser period, calibrates per-channel QDC thresholds, and writes a text report with
//! per-run and whole-scan error summaries.
//!
//! ## Building & Install
//!
//! To build and install the CLI use `cargo install --path ./veto_qc_cli` from the top
//! level repository. The binary is installed to your cargo install location (typically
//! `~/.cargo/bin/`).
//!
//! ## Configuration
//!
//! A scan is driven by a YAML configuration file. A template can be made using
//! `veto_qc_cli -p config.yml new`. The format is as follows:
//!
//! ```yml
//! run_list_path: /path/to/DS5.txt
//! data_path: /path/to/veto/data/
//! threshold_table_path: /path/to/vetoSWThresholds.txt
//! dataset_name: null
//! output_path: /path/to/output/
//! deactivate_channels: true
//! dump_skipped: false
//! ```
//!
//! - `run_list_path`: text file of whitespace separated run numbers, scanned in order.
//! - `data_path`: directory holding one `run_NNNN.yml` file per run.
//! - `threshold_table_path`: optional software threshold table. If `null`, or if the
//! dataset is not in the table, every channel uses the default threshold of 500.
//! - `dataset_name`: key into the threshold table. If `null`, the stem of the run list
//! file is used.
//! - `output_path`: directory in which the report `vPerf_<run list stem>.txt` is written.
//! - `deactivate_channels`: mark channels whose QDC spectrum never reaches 300 as
//! deactivated (threshold 9999).
//! - `dump_skipped`: log a dump of every event skipped for a hardware error.
//!
//! ### Threshold Table Format
//!
//! Whitespace separated tokens: a dataset name followed by 32 integer thresholds, repeated
//! for each dataset. A threshold of 9999 marks a deactivated channel.
//!
//! ```text
//! P3KJR 112 103 ... 9999 120
//! P3LQK 110 101 ... 115 119
//! ```
//!
//! ### Run Data Format
//!
//! ```yml
//! run_number: 9001
//! start_time: 1500000000   # unix seconds
//! stop_time: 1500003600    # 0 if the stop time was lost
//! records:
//!   - time_primary: 1.2    # scaler clock, seconds
//!     time_secondary: 1001.2 # SBC clock, seconds
//!     scaler_index: 0
//!     scaler_count: 1
//!     qdc1_count: 1
//!     qdc2_count: 1
//!     amplitudes: [100, 100, ...] # 32 QDC values
//!     multiplicity: 1      # optional, computed from the input thresholds if absent
//!     error_code: 0        # bit q set means primitive hardware flag q
//! ```
//!
//! ## Output
//!
//! The report holds one block per scanned run (start/stop time, duration and livetime,
//! clock offset, first and last good events, LED period, calibrated thresholds, pedestal
//! shifts, and error counts) followed by the scan summary. When any error was found, the
//! summary lists every kind with its event and run percentages and a reference table of
//! the error kinds. All detailed diagnostics are emitted through the `log` facade.
pub mod classifier;
pub mod config;
pub mod constants;
pub mod error;
pub mod error_kind;
pub mod event;
pub mod histogram;
pub mod process;
pub mod pulse;
pub mod report;
pub mod scan_status;
pub mod scanner;
pub mod source;
pub mod summary;
pub mod threshold;
pub mod time_sync;
