use bitvec::prelude::*;

use super::constants::NUMBER_OF_PRIMITIVE_FLAGS;
use super::error_kind::{ErrorKind, ErrorTally};
use super::event::VetoEvent;

/// Flag positions known to be benign. They are tallied but never block an event.
pub const SOFT_FLAG_POSITIONS: [usize; 5] = [4, 7, 10, 11, 12];

/// The 18 primitive hardware-integrity flags of one event.
///
/// Bit `q` of the raw error code is flag `q`. Bits above the 18th are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HardwareFlags {
    code: u32,
}

impl HardwareFlags {
    pub fn decode(error_code: u32) -> Self {
        let mut code = error_code;
        code.view_bits_mut::<Lsb0>()[NUMBER_OF_PRIMITIVE_FLAGS..].fill(false);
        Self { code }
    }

    fn bits(&self) -> &BitSlice<u32, Lsb0> {
        self.code.view_bits::<Lsb0>()
    }

    pub fn is_clean(&self) -> bool {
        self.bits().not_any()
    }

    pub fn is_set(&self, position: usize) -> bool {
        position < NUMBER_OF_PRIMITIVE_FLAGS && self.bits()[position]
    }

    pub fn has(&self, kind: ErrorKind) -> bool {
        self.is_set(kind.code())
    }

    /// Positions of every flag that is up
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits().iter_ones()
    }

    /// Kinds of every flag that is up. Position 0 has no kind and is not listed
    pub fn kinds(&self) -> impl Iterator<Item = ErrorKind> + '_ {
        self.positions().filter_map(ErrorKind::from_flag_position)
    }

    /// An event is hard-bad if any flag outside the soft subset is up
    pub fn is_hard_bad(&self) -> bool {
        self.positions()
            .any(|position| !SOFT_FLAG_POSITIONS.contains(&position))
    }

    /// Count each raised flag into the tally. Flag 0 goes to the unclassified slot
    pub fn tally_into(&self, tally: &mut ErrorTally) {
        if self.is_set(0) {
            tally.increment_unclassified();
        }
        for kind in self.kinds() {
            tally.increment(kind);
        }
    }
}

/// Applies the soft/hard filter to events, optionally dumping the ones it rejects.
#[derive(Debug, Clone, Default)]
pub struct ErrorClassifier {
    dump_skipped: bool,
}

impl ErrorClassifier {
    pub fn new(dump_skipped: bool) -> Self {
        Self { dump_skipped }
    }

    /// Returns true if the event must be skipped for histograms and good-event bookkeeping
    pub fn check_for_bad_errors(&self, event: &VetoEvent) -> bool {
        if !event.is_hard_bad() {
            return false;
        }
        if event.flags.is_set(0) {
            log::debug!("Entry {} raised primitive flag 0; skipping", event.index);
        }
        if self.dump_skipped {
            log::info!("Skipped Entry: {}\n{}", event.index, describe_event(event));
        }
        true
    }
}

/// Human readable dump of an event for audit logs
pub fn describe_event(event: &VetoEvent) -> String {
    let flags: Vec<String> = event
        .flags
        .positions()
        .map(|position| position.to_string())
        .collect();
    format!(
        "  Flags: [{}]  |  ScalerIndex: {}  |  ScalerTime: {:.6}  |  SBCTime: {:.6}\n  SEC: {}  |  QEC: {}  |  QEC2: {}  |  Multiplicity: {}\n  QDC: {:?}",
        flags.join(","),
        event.scaler_index,
        event.time_primary,
        event.time_secondary,
        event.counters.scaler,
        event.counters.qdc1,
        event.counters.qdc2,
        event.multiplicity,
        event.amplitudes,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_flags_alone_are_usable() {
        for position in SOFT_FLAG_POSITIONS {
            let flags = HardwareFlags::decode(1 << position);
            assert!(!flags.is_hard_bad(), "flag {position} should be soft");
        }
        let all_soft = SOFT_FLAG_POSITIONS
            .iter()
            .fold(0u32, |code, position| code | (1 << position));
        assert!(!HardwareFlags::decode(all_soft).is_hard_bad());
    }

    #[test]
    fn test_other_flags_are_hard() {
        for position in 0..NUMBER_OF_PRIMITIVE_FLAGS {
            if SOFT_FLAG_POSITIONS.contains(&position) {
                continue;
            }
            let flags = HardwareFlags::decode(1 << position);
            assert!(flags.is_hard_bad(), "flag {position} should be hard");
            let mixed = HardwareFlags::decode((1 << position) | (1 << 4));
            assert!(mixed.is_hard_bad());
        }
    }

    #[test]
    fn test_high_bits_ignored() {
        let flags = HardwareFlags::decode(1 << 20);
        assert!(flags.is_clean());
        assert!(!flags.is_hard_bad());
    }

    #[test]
    fn test_tally_counts_soft_flags() {
        let flags = HardwareFlags::decode((1 << 4) | (1 << 11) | (1 << 1));
        let mut tally = ErrorTally::new();
        flags.tally_into(&mut tally);
        assert_eq!(tally.get(ErrorKind::BadTimestamp), 1);
        assert_eq!(tally.get(ErrorKind::ScalerQdc1CountMismatch), 1);
        assert_eq!(tally.get(ErrorKind::MissingChannels), 1);
        assert_eq!(tally.total(), 3);
        assert_eq!(tally.unclassified(), 0);
    }

    #[test]
    fn test_flag_zero_is_counted_unclassified() {
        let flags = HardwareFlags::decode(1);
        assert!(flags.is_hard_bad());
        assert_eq!(flags.kinds().count(), 0);
        let mut tally = ErrorTally::new();
        flags.tally_into(&mut tally);
        assert_eq!(tally.unclassified(), 1);
        assert_eq!(tally.total(), 0);
        assert!(!tally.is_clean());

        let mut folded = ErrorTally::new();
        folded += &tally;
        assert_eq!(folded.unclassified(), 1);
    }
}
