//! The error taxonomy of the veto QC scan.
//!
//! Kinds 1-17 are primitive hardware-integrity flags decoded from each event's
//! error code. Kinds 18-26 are run-level integrity checks raised by the scanner.
//! The numbering is the historical one used in every vetoPerformance report, so
//! it is kept explicit in [`ErrorKind::code`] rather than relying on enum order.
use std::fmt::Display;
use std::ops::{AddAssign, Index};

/// Number of slots in the historical tally table (slot 0 is unused).
pub const NUMBER_OF_ERROR_SLOTS: usize = 27;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingChannels,
    ExtraChannels,
    ScalerOnly,
    BadTimestamp,
    QdcScalerIndexOffset,
    DuplicateChannels,
    HardwareCountMismatch,
    RunNumberMismatch,
    VetoDataCastFailed,
    ScalerCountEntryMismatch,
    ScalerQdc1CountMismatch,
    Qdc1Qdc2CountMismatch,
    Qdc1IndexFarFromScaler,
    Qdc2IndexFarFromScaler,
    QdcIndexPrecedesScaler,
    QdcIndexEqualsScaler,
    UnknownCard,
    ClockDesync,
    ScalerCountReset,
    ScalerCountJump,
    Qdc1CountReset,
    Qdc1CountJump,
    Qdc2CountReset,
    Qdc2CountJump,
    BadPulsePeriod,
    PedestalShift,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 26] = [
        ErrorKind::MissingChannels,
        ErrorKind::ExtraChannels,
        ErrorKind::ScalerOnly,
        ErrorKind::BadTimestamp,
        ErrorKind::QdcScalerIndexOffset,
        ErrorKind::DuplicateChannels,
        ErrorKind::HardwareCountMismatch,
        ErrorKind::RunNumberMismatch,
        ErrorKind::VetoDataCastFailed,
        ErrorKind::ScalerCountEntryMismatch,
        ErrorKind::ScalerQdc1CountMismatch,
        ErrorKind::Qdc1Qdc2CountMismatch,
        ErrorKind::Qdc1IndexFarFromScaler,
        ErrorKind::Qdc2IndexFarFromScaler,
        ErrorKind::QdcIndexPrecedesScaler,
        ErrorKind::QdcIndexEqualsScaler,
        ErrorKind::UnknownCard,
        ErrorKind::ClockDesync,
        ErrorKind::ScalerCountReset,
        ErrorKind::ScalerCountJump,
        ErrorKind::Qdc1CountReset,
        ErrorKind::Qdc1CountJump,
        ErrorKind::Qdc2CountReset,
        ErrorKind::Qdc2CountJump,
        ErrorKind::BadPulsePeriod,
        ErrorKind::PedestalShift,
    ];

    /// The report number of this kind (1-26)
    pub fn code(&self) -> usize {
        match self {
            ErrorKind::MissingChannels => 1,
            ErrorKind::ExtraChannels => 2,
            ErrorKind::ScalerOnly => 3,
            ErrorKind::BadTimestamp => 4,
            ErrorKind::QdcScalerIndexOffset => 5,
            ErrorKind::DuplicateChannels => 6,
            ErrorKind::HardwareCountMismatch => 7,
            ErrorKind::RunNumberMismatch => 8,
            ErrorKind::VetoDataCastFailed => 9,
            ErrorKind::ScalerCountEntryMismatch => 10,
            ErrorKind::ScalerQdc1CountMismatch => 11,
            ErrorKind::Qdc1Qdc2CountMismatch => 12,
            ErrorKind::Qdc1IndexFarFromScaler => 13,
            ErrorKind::Qdc2IndexFarFromScaler => 14,
            ErrorKind::QdcIndexPrecedesScaler => 15,
            ErrorKind::QdcIndexEqualsScaler => 16,
            ErrorKind::UnknownCard => 17,
            ErrorKind::ClockDesync => 18,
            ErrorKind::ScalerCountReset => 19,
            ErrorKind::ScalerCountJump => 20,
            ErrorKind::Qdc1CountReset => 21,
            ErrorKind::Qdc1CountJump => 22,
            ErrorKind::Qdc2CountReset => 23,
            ErrorKind::Qdc2CountJump => 24,
            ErrorKind::BadPulsePeriod => 25,
            ErrorKind::PedestalShift => 26,
        }
    }

    /// Map a primitive flag position (bit of the event error code) to its kind.
    ///
    /// Position 0 carries no meaning and returns None.
    pub fn from_flag_position(position: usize) -> Option<Self> {
        if (1..=17).contains(&position) {
            Some(Self::ALL[position - 1])
        } else {
            None
        }
    }

    /// Soft kinds are counted but never make an event unusable
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            ErrorKind::BadTimestamp
                | ErrorKind::HardwareCountMismatch
                | ErrorKind::ScalerCountEntryMismatch
                | ErrorKind::ScalerQdc1CountMismatch
                | ErrorKind::Qdc1Qdc2CountMismatch
        )
    }

    /// Serious kinds exclude a run from downstream physics analysis
    pub fn is_serious(&self) -> bool {
        self.code() == 1 || self.code() > 17
    }

    /// Kinds 10 and 11 fire on nearly every run and are left out of the
    /// "runs with errors" count
    pub fn counts_toward_run_errors(&self) -> bool {
        !matches!(
            self,
            ErrorKind::ScalerCountEntryMismatch | ErrorKind::ScalerQdc1CountMismatch
        )
    }

    pub fn description(&self) -> &'static str {
        match self {
            ErrorKind::MissingChannels => "Missing channels (< 32 veto datas in event)",
            ErrorKind::ExtraChannels => "Extra Channels (> 32 veto datas in event)",
            ErrorKind::ScalerOnly => "Scaler only (no QDC data)",
            ErrorKind::BadTimestamp => "Bad Timestamp: FFFF FFFF FFFF FFFF",
            ErrorKind::QdcScalerIndexOffset => "QDCIndex - ScalerIndex != 1 or 2",
            ErrorKind::DuplicateChannels => "Duplicate channels (channel shows up multiple times)",
            ErrorKind::HardwareCountMismatch => "HW Count Mismatch (SEC - QEC != 1 or 2)",
            ErrorKind::RunNumberMismatch => "Run number doesn't match input file",
            ErrorKind::VetoDataCastFailed => "Veto data cast failed (missing QDC data)",
            ErrorKind::ScalerCountEntryMismatch => "Scaler EventCount doesn't match entry",
            ErrorKind::ScalerQdc1CountMismatch => "Scaler EventCount doesn't match QDC1 EventCount",
            ErrorKind::Qdc1Qdc2CountMismatch => "QDC1 EventCount doesn't match QDC2 EventCount",
            ErrorKind::Qdc1IndexFarFromScaler => "Indexes of QDC1 and Scaler differ by more than 2",
            ErrorKind::Qdc2IndexFarFromScaler => "Indexes of QDC2 and Scaler differ by more than 2",
            ErrorKind::QdcIndexPrecedesScaler => {
                "Indexes of either QDC1 or QDC2 PRECEDE the scaler index"
            }
            ErrorKind::QdcIndexEqualsScaler => "Indexes of either QDC1 or QDC2 EQUAL the scaler index",
            ErrorKind::UnknownCard => "Unknown Card is present",
            ErrorKind::ClockDesync => "Scaler & SBC Timestamp Desynch",
            ErrorKind::ScalerCountReset => "Scaler Event Count reset",
            ErrorKind::ScalerCountJump => "Scaler Event Count change by more than entries elapsed",
            ErrorKind::Qdc1CountReset => "QDC1 Event Count reset",
            ErrorKind::Qdc1CountJump => "QDC1 Event Count change by more than entries elapsed",
            ErrorKind::Qdc2CountReset => "QDC2 Event Count reset",
            ErrorKind::Qdc2CountJump => "QDC2 Event Count change by more than entries elapsed",
            ErrorKind::BadPulsePeriod => "LED frequency very low/high",
            ErrorKind::PedestalShift => "Threshold shift by more than 10%",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error[{}]", self.code())
    }
}

/// Dense count table indexed by [`ErrorKind`].
///
/// Counts are only ever incremented or folded together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorTally {
    counts: [u64; NUMBER_OF_ERROR_SLOTS],
}

impl ErrorTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, kind: ErrorKind) {
        self.counts[kind.code()] += 1;
    }

    pub fn get(&self, kind: ErrorKind) -> u64 {
        self.counts[kind.code()]
    }

    /// Slot 0 holds events raising primitive flag 0, which has no kind of its own
    pub fn increment_unclassified(&mut self) {
        self.counts[0] += 1;
    }

    pub fn unclassified(&self) -> u64 {
        self.counts[0]
    }

    pub fn has(&self, kind: ErrorKind) -> bool {
        self.get(kind) > 0
    }

    /// Iterate over every kind with its count, in report order
    pub fn iter(&self) -> impl Iterator<Item = (ErrorKind, u64)> + '_ {
        ErrorKind::ALL.iter().map(|kind| (*kind, self.get(*kind)))
    }

    /// Sum over the 26 kinds. Flag 0 events are not included
    pub fn total(&self) -> u64 {
        self.iter().map(|(_, count)| count).sum()
    }

    /// Sum of all kinds which count toward "runs with errors"
    pub fn any_error_count(&self) -> u64 {
        self.iter()
            .filter(|(kind, _)| kind.counts_toward_run_errors())
            .map(|(_, count)| count)
            .sum()
    }

    pub fn serious_count(&self) -> u64 {
        self.iter()
            .filter(|(kind, _)| kind.is_serious())
            .map(|(_, count)| count)
            .sum()
    }

    pub fn is_clean(&self) -> bool {
        self.counts.iter().all(|count| *count == 0)
    }
}

impl Index<ErrorKind> for ErrorTally {
    type Output = u64;
    fn index(&self, kind: ErrorKind) -> &Self::Output {
        &self.counts[kind.code()]
    }
}

impl AddAssign<&ErrorTally> for ErrorTally {
    fn add_assign(&mut self, rhs: &ErrorTally) {
        for (lhs, rhs) in self.counts.iter_mut().zip(rhs.counts.iter()) {
            *lhs += rhs;
        }
    }
}
