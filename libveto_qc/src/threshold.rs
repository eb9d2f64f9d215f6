use std::fmt::Display;
use std::path::Path;

use fxhash::FxHashMap;

use super::constants::*;
use super::error::ThresholdTableError;
use super::histogram::Histogram;

/// A single channel threshold. Deactivated channels carry no numeric value at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Threshold {
    Value(i32),
    Deactivated,
}

impl Threshold {
    /// Interpret a raw table value, where 9999 marks a deactivated channel
    pub fn from_raw(raw: i32) -> Self {
        if raw == DEACTIVATED_THRESHOLD {
            Self::Deactivated
        } else {
            Self::Value(raw)
        }
    }

    /// The raw value as written in tables and reports
    pub fn as_raw(&self) -> i32 {
        match self {
            Self::Value(v) => *v,
            Self::Deactivated => DEACTIVATED_THRESHOLD,
        }
    }

    pub fn value(&self) -> Option<i32> {
        match self {
            Self::Value(v) => Some(*v),
            Self::Deactivated => None,
        }
    }
}

impl Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_raw())
    }
}

/// One threshold per veto channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdSet {
    thresholds: [Threshold; NUMBER_OF_CHANNELS],
}

impl ThresholdSet {
    pub fn new(thresholds: [Threshold; NUMBER_OF_CHANNELS]) -> Self {
        Self { thresholds }
    }

    pub fn from_raw(raw: &[i32; NUMBER_OF_CHANNELS]) -> Self {
        Self {
            thresholds: (*raw).map(Threshold::from_raw),
        }
    }

    /// The conservative fallback used when no table entry exists
    pub fn default_software() -> Self {
        Self {
            thresholds: [Threshold::Value(DEFAULT_SW_THRESHOLD); NUMBER_OF_CHANNELS],
        }
    }

    pub fn get(&self, channel: usize) -> Threshold {
        self.thresholds[channel]
    }

    pub fn thresholds(&self) -> &[Threshold; NUMBER_OF_CHANNELS] {
        &self.thresholds
    }

    pub fn raw(&self) -> [i32; NUMBER_OF_CHANNELS] {
        self.thresholds.map(|t| t.as_raw())
    }

    /// Does the amplitude count as a hit on this channel. Deactivated channels never fire
    pub fn is_hit(&self, channel: usize, amplitude: i32) -> bool {
        match self.thresholds[channel] {
            Threshold::Value(v) => amplitude > v,
            Threshold::Deactivated => false,
        }
    }

    pub fn deactivated_channels(&self) -> Vec<usize> {
        self.thresholds
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == Threshold::Deactivated)
            .map(|(ch, _)| ch)
            .collect()
    }
}

/// A channel whose threshold moved outside of the allowed ratio between runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PedestalShift {
    pub channel: usize,
    pub previous: i32,
    pub current: i32,
}

/// Compare this run's thresholds to the previous run's.
///
/// Channels deactivated in either run, or with a zero previous value, are not compared.
pub fn find_pedestal_shifts(previous: &ThresholdSet, current: &ThresholdSet) -> Vec<PedestalShift> {
    let mut shifts = Vec::new();
    for channel in 0..NUMBER_OF_CHANNELS {
        let (Some(prev), Some(cur)) = (previous.get(channel).value(), current.get(channel).value())
        else {
            continue;
        };
        if prev == 0 {
            continue;
        }
        let ratio = cur as f64 / prev as f64;
        if !(DRIFT_RATIO_LOW..=DRIFT_RATIO_HIGH).contains(&ratio) {
            shifts.push(PedestalShift {
                channel,
                previous: prev,
                current: cur,
            });
        }
    }
    shifts
}

/// Per-channel amplitude histograms accumulated over the hard-good events of a run
#[derive(Debug, Clone)]
pub struct ChannelHistograms {
    hists: Vec<Histogram>,
}

impl Default for ChannelHistograms {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelHistograms {
    pub fn new() -> Self {
        Self {
            hists: (0..NUMBER_OF_CHANNELS)
                .map(|_| Histogram::new(QDC_BINS, QDC_MIN, QDC_MAX))
                .collect(),
        }
    }

    pub fn fill(&mut self, amplitudes: &[i32; NUMBER_OF_CHANNELS]) {
        for (hist, amp) in self.hists.iter_mut().zip(amplitudes.iter()) {
            hist.fill(*amp as f64);
        }
    }

    pub fn channel(&self, channel: usize) -> &Histogram {
        &self.hists[channel]
    }

    /// Derive the threshold of every channel
    pub fn calibrate(&self, deactivate: bool) -> ThresholdSet {
        let mut thresholds = [Threshold::Deactivated; NUMBER_OF_CHANNELS];
        for (channel, hist) in self.hists.iter().enumerate() {
            thresholds[channel] = find_qdc_threshold(hist, channel, deactivate);
        }
        ThresholdSet::new(thresholds)
    }
}

/// Place the threshold a fixed margin above the pedestal peak.
///
/// With `deactivate` set, channels with no populated amplitude above 300 are
/// turned off. Channels with no populated bins at all are always turned off.
pub fn find_qdc_threshold(hist: &Histogram, channel: usize, deactivate: bool) -> Threshold {
    let Some(last_bin) = hist.last_bin_above(PEDESTAL_MIN_COUNT) else {
        log::warn!("Panel: {channel}  No populated QDC bins! Deactivating panel...");
        return Threshold::Deactivated;
    };
    if deactivate && last_bin < ACTIVE_AMPLITUDE_FLOOR {
        log::warn!(
            "Panel: {channel}  Found last nonzero bin: {last_bin}  No QDC entries over {ACTIVE_AMPLITUDE_FLOOR}! Deactivating panel..."
        );
        return Threshold::Deactivated;
    }

    // last_bin exists, so first_bin does too
    let first_bin = hist.first_bin_above(PEDESTAL_MIN_COUNT).unwrap_or(last_bin);
    let window = first_bin.saturating_sub(PEDESTAL_WINDOW_LOW)..=first_bin + PEDESTAL_WINDOW_HIGH;
    let peak = hist.maximum_bin_in(window).unwrap_or(first_bin);
    Threshold::Value((hist.bin_center(peak) + THRESHOLD_MARGIN) as i32)
}

/// The software threshold dictionary, keyed by dataset name.
///
/// The file is a whitespace separated list of entries, each entry being a dataset
/// name followed by 32 integer thresholds.
#[derive(Debug, Clone, Default)]
pub struct ThresholdTable {
    table: FxHashMap<String, ThresholdSet>,
}

impl ThresholdTable {
    pub fn new(path: &Path) -> Result<Self, ThresholdTableError> {
        if !path.exists() {
            return Err(ThresholdTableError::BadFilePath(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ThresholdTableError> {
        let mut table = ThresholdTable::default();
        let mut tokens = contents.split_whitespace();
        while let Some(name) = tokens.next() {
            let mut raw = [0; NUMBER_OF_CHANNELS];
            for (idx, value) in raw.iter_mut().enumerate() {
                let token = tokens
                    .next()
                    .ok_or_else(|| ThresholdTableError::MissingThresholds(name.to_string(), idx))?;
                *value = token
                    .parse()
                    .map_err(|e| ThresholdTableError::ParsingError(name.to_string(), e))?;
            }
            table
                .table
                .insert(name.to_string(), ThresholdSet::from_raw(&raw));
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn get(&self, dataset: &str) -> Option<&ThresholdSet> {
        self.table.get(dataset)
    }

    /// Get the input thresholds for a dataset, falling back to the defaults
    pub fn input_thresholds(&self, dataset: &str) -> ThresholdSet {
        match self.get(dataset) {
            Some(set) => {
                log::info!("Found SW threshold values for: {dataset}");
                set.clone()
            }
            None => {
                log::warn!(
                    "Didn't find SW threshold values for {dataset}. Using defaults ({DEFAULT_SW_THRESHOLD})..."
                );
                ThresholdSet::default_software()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pedestal_hist(peak: i32) -> Histogram {
        let mut hist = Histogram::new(QDC_BINS, QDC_MIN, QDC_MAX);
        for _ in 0..50 {
            hist.fill(peak as f64);
        }
        for _ in 0..10 {
            hist.fill((peak - 3) as f64);
            hist.fill((peak + 4) as f64);
        }
        for _ in 0..5 {
            hist.fill(1200.0);
        }
        hist
    }

    #[test]
    fn test_threshold_above_pedestal() {
        let hist = pedestal_hist(120);
        assert_eq!(find_qdc_threshold(&hist, 0, true), Threshold::Value(155));
        // Recomputing must not change anything
        assert_eq!(find_qdc_threshold(&hist, 0, true), Threshold::Value(155));
    }

    #[test]
    fn test_inactive_channels() {
        let empty = Histogram::new(QDC_BINS, QDC_MIN, QDC_MAX);
        assert_eq!(find_qdc_threshold(&empty, 1, true), Threshold::Deactivated);
        assert_eq!(find_qdc_threshold(&empty, 1, false), Threshold::Deactivated);

        let mut quiet = Histogram::new(QDC_BINS, QDC_MIN, QDC_MAX);
        for _ in 0..20 {
            quiet.fill(100.0);
        }
        assert_eq!(find_qdc_threshold(&quiet, 2, true), Threshold::Deactivated);
        assert_eq!(find_qdc_threshold(&quiet, 2, false), Threshold::Value(135));
    }

    #[test]
    fn test_pedestal_shift() {
        let mut prev_raw = [520; NUMBER_OF_CHANNELS];
        prev_raw[3] = DEACTIVATED_THRESHOLD;
        let mut cur_raw = prev_raw;
        cur_raw[7] = 600;
        cur_raw[3] = 100;
        cur_raw[9] = 570; // ratio 1.096
        let previous = ThresholdSet::from_raw(&prev_raw);
        let current = ThresholdSet::from_raw(&cur_raw);
        let shifts = find_pedestal_shifts(&previous, &current);
        assert_eq!(
            shifts,
            vec![PedestalShift {
                channel: 7,
                previous: 520,
                current: 600
            }]
        );
        assert!(find_pedestal_shifts(&current, &current).is_empty());
    }

    #[test]
    fn test_parse_table() {
        let mut contents = String::from("P3KJR_a");
        for ch in 0..NUMBER_OF_CHANNELS {
            contents.push_str(&format!(" {}", 100 + ch));
        }
        contents.push_str("\nP3KJR_b");
        for _ in 0..NUMBER_OF_CHANNELS {
            contents.push_str(" 9999");
        }
        contents.push('\n');
        let table = ThresholdTable::parse(&contents).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get("P3KJR_a").unwrap().get(31),
            Threshold::Value(131)
        );
        assert_eq!(
            table.get("P3KJR_b").unwrap().deactivated_channels().len(),
            NUMBER_OF_CHANNELS
        );
        assert_eq!(
            table.input_thresholds("missing"),
            ThresholdSet::default_software()
        );
    }

    #[test]
    fn test_parse_table_truncated() {
        match ThresholdTable::parse("P3KJR 1 2 3") {
            Err(ThresholdTableError::MissingThresholds(name, n)) => {
                assert_eq!(name, "P3KJR");
                assert_eq!(n, 3);
            }
            _ => panic!(),
        }
        assert!(ThresholdTable::parse("P3KJR x").is_err());
    }
}
