use serde::{Deserialize, Serialize};

use super::classifier::HardwareFlags;
use super::constants::NUMBER_OF_CHANNELS;
use super::error_kind::ErrorKind;
use super::threshold::ThresholdSet;

/// One raw veto record as delivered by an [`EventSource`](super::source::EventSource).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub time_primary: f64,
    pub time_secondary: f64,
    #[serde(default)]
    pub scaler_index: i64,
    pub scaler_count: i64,
    pub qdc1_count: i64,
    pub qdc2_count: i64,
    pub amplitudes: [i32; NUMBER_OF_CHANNELS],
    #[serde(default)]
    pub multiplicity: Option<u32>,
    #[serde(default)]
    pub error_code: u32,
}

/// All of the raw data for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRun {
    pub run_number: i32,
    pub start_time: i64,
    pub stop_time: i64,
    pub records: Vec<RawRecord>,
}

impl RawRun {
    pub fn n_entries(&self) -> usize {
        self.records.len()
    }

    /// Duration recorded by the DAQ. Zero means the stop time was corrupted
    pub fn recorded_duration(&self) -> f64 {
        (self.stop_time - self.start_time) as f64
    }
}

/// The three hardware event counters carried by every veto event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventCounters {
    pub scaler: i64,
    pub qdc1: i64,
    pub qdc2: i64,
}

impl EventCounters {
    /// (counter value, reset kind, jump kind) for each counter
    pub fn checks(&self) -> [(i64, ErrorKind, ErrorKind); 3] {
        [
            (
                self.scaler,
                ErrorKind::ScalerCountReset,
                ErrorKind::ScalerCountJump,
            ),
            (
                self.qdc1,
                ErrorKind::Qdc1CountReset,
                ErrorKind::Qdc1CountJump,
            ),
            (
                self.qdc2,
                ErrorKind::Qdc2CountReset,
                ErrorKind::Qdc2CountJump,
            ),
        ]
    }
}

/// A classified veto event.
///
/// Built from a [`RawRecord`] by decoding its error code. Everything but the
/// reconciled time is fixed once the event is built.
#[derive(Debug, Clone, PartialEq)]
pub struct VetoEvent {
    pub index: usize,
    pub time_primary: f64,
    pub time_secondary: f64,
    pub scaler_index: i64,
    pub counters: EventCounters,
    pub amplitudes: [i32; NUMBER_OF_CHANNELS],
    pub multiplicity: u32,
    pub flags: HardwareFlags,
}

impl VetoEvent {
    pub fn new(index: usize, record: &RawRecord, sw_thresholds: &ThresholdSet) -> Self {
        let multiplicity = match record.multiplicity {
            Some(m) => m,
            None => record
                .amplitudes
                .iter()
                .enumerate()
                .filter(|(channel, amp)| sw_thresholds.is_hit(*channel, **amp))
                .count() as u32,
        };
        Self {
            index,
            time_primary: record.time_primary,
            time_secondary: record.time_secondary,
            scaler_index: record.scaler_index,
            counters: EventCounters {
                scaler: record.scaler_count,
                qdc1: record.qdc1_count,
                qdc2: record.qdc2_count,
            },
            amplitudes: record.amplitudes,
            multiplicity,
            flags: HardwareFlags::decode(record.error_code),
        }
    }

    /// The primary (scaler) clock is corrupted whenever the bad timestamp flag is up
    pub fn is_primary_valid(&self) -> bool {
        !self.flags.has(ErrorKind::BadTimestamp)
    }

    pub fn is_hard_bad(&self) -> bool {
        self.flags.is_hard_bad()
    }

    pub fn has_missing_packet(&self) -> bool {
        self.flags.has(ErrorKind::MissingChannels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplicity_from_thresholds() {
        let mut record = RawRecord::default();
        for ch in 0..5 {
            record.amplitudes[ch] = 600;
        }
        record.amplitudes[5] = 500;
        let event = VetoEvent::new(0, &record, &ThresholdSet::default_software());
        assert_eq!(event.multiplicity, 5);

        record.multiplicity = Some(25);
        let event = VetoEvent::new(0, &record, &ThresholdSet::default_software());
        assert_eq!(event.multiplicity, 25);
    }

    #[test]
    fn test_bad_timestamp_invalidates_primary() {
        let record = RawRecord {
            error_code: 1 << 4,
            ..Default::default()
        };
        let event = VetoEvent::new(3, &record, &ThresholdSet::default_software());
        assert!(!event.is_primary_valid());
        assert!(!event.is_hard_bad());
    }
}
