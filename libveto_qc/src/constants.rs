// Detector geometry
pub const NUMBER_OF_CHANNELS: usize = 32;
pub const NUMBER_OF_PRIMITIVE_FLAGS: usize = 18;

// Software (input) thresholds
pub const DEFAULT_SW_THRESHOLD: i32 = 500;
pub const THRESHOLD_TABLE_NAME: &str = "vetoSWThresholds.txt";

// Amplitude (QDC) histograms, one amplitude unit per bin
pub const QDC_BINS: usize = 4096;
pub const QDC_MIN: f64 = 0.0;
pub const QDC_MAX: f64 = 4096.0;
pub const PEDESTAL_MIN_COUNT: f64 = 1.0;
pub const PEDESTAL_WINDOW_LOW: usize = 10;
pub const PEDESTAL_WINDOW_HIGH: usize = 50;
pub const THRESHOLD_MARGIN: f64 = 35.0;
pub const ACTIVE_AMPLITUDE_FLOOR: usize = 300;
pub const DEACTIVATED_THRESHOLD: i32 = 9999;
pub const DRIFT_RATIO_LOW: f64 = 0.9;
pub const DRIFT_RATIO_HIGH: f64 = 1.1;

// Clocks
pub const SBC_TRUSTED_AFTER_RUN: i32 = 8557;
pub const SBC_TIME_CEILING: f64 = 2_000_000_000.0;
pub const DESYNC_TOLERANCE: f64 = 2.0;

// Pulser (LED)
pub const PULSE_MULTIPLICITY: u32 = 20;
pub const PULSE_DT_BINS: usize = 100_000;
pub const PULSE_DT_MIN: f64 = 0.0;
pub const PULSE_DT_MAX: f64 = 100.0;
pub const PULSE_PEAK_HALF_WINDOW: usize = 100; // +/- 0.1 s
pub const PULSE_MIN_RUN_ENTRIES: usize = 100;
pub const PULSE_MIN_SIMPLE_COUNT: u32 = 4;
pub const PULSE_PERIOD_LOW: f64 = 5.0;
pub const PULSE_PERIOD_HIGH: f64 = 9.0;
pub const BAD_PULSE_PERIOD: f64 = 9999.0;
