//! Reconciliation of the scaler (primary) and SBC (secondary) clocks.
//!
//! The scaler clock is trusted whenever its reading is not flagged corrupted.
//! Otherwise the SBC clock, shifted by the per-run offset, is used for runs where
//! the SBC clock is known to be reliable. As a last resort the time is
//! interpolated between the closest good scaler readings.
use super::constants::{DESYNC_TOLERANCE, SBC_TIME_CEILING, SBC_TRUSTED_AFTER_RUN};
use super::error::TimeError;
use super::event::VetoEvent;

/// Which method produced an event time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    Primary,
    Secondary,
    Interpolated,
    /// No method worked; the time is the pass-1 provisional estimate
    Unresolved,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventTime {
    pub seconds: f64,
    pub source: TimeSource,
}

/// Is the SBC clock reading usable for this run
pub fn is_secondary_trusted(run_number: i32, time_secondary: f64) -> bool {
    run_number > SBC_TRUSTED_AFTER_RUN && time_secondary < SBC_TIME_CEILING
}

/// Offset between the two clocks, taken from the first good event of a run
pub fn clock_offset(first_good: &VetoEvent) -> f64 {
    first_good.time_secondary - first_good.time_primary
}

/// Time of `entry` from the nearest good scaler readings.
///
/// A good entry returns its own time. Otherwise the mean of the closest good
/// readings before and after is returned. Both neighbors must exist.
pub fn interpolate_time(
    entry: usize,
    times: &[f64],
    primary_valid: &[bool],
) -> Result<f64, TimeError> {
    let n_entries = times.len().min(primary_valid.len());
    if entry >= n_entries {
        return Err(TimeError::EntryOutOfRange(entry, n_entries));
    }
    if primary_valid[entry] {
        return Ok(times[entry]);
    }

    let upper = (entry + 1..n_entries)
        .find(|idx| primary_valid[*idx])
        .map(|idx| times[idx])
        .ok_or(TimeError::NoUpperBracket(entry))?;
    let lower = (0..entry)
        .rev()
        .find(|idx| primary_valid[*idx])
        .map(|idx| times[idx])
        .ok_or(TimeError::NoLowerBracket(entry))?;

    Ok((upper + lower) / 2.0)
}

/// Picks the best time for each event in the second pass
#[derive(Debug)]
pub struct TimeReconciler<'a> {
    run_number: i32,
    offset: Option<f64>,
    times: &'a [f64],
    primary_valid: &'a [bool],
}

impl<'a> TimeReconciler<'a> {
    pub fn new(
        run_number: i32,
        offset: Option<f64>,
        times: &'a [f64],
        primary_valid: &'a [bool],
    ) -> Self {
        Self {
            run_number,
            offset,
            times,
            primary_valid,
        }
    }

    /// SBC time shifted onto the scaler clock, if the SBC clock can be trusted
    pub fn adjusted_secondary(&self, event: &VetoEvent) -> Option<f64> {
        let offset = self.offset?;
        if is_secondary_trusted(self.run_number, event.time_secondary) {
            Some(event.time_secondary - offset)
        } else {
            None
        }
    }

    pub fn reconcile(&self, event: &VetoEvent) -> Result<EventTime, TimeError> {
        if event.is_primary_valid() {
            return Ok(EventTime {
                seconds: event.time_primary,
                source: TimeSource::Primary,
            });
        }

        if let Some(seconds) = self.adjusted_secondary(event) {
            if let Ok(interp) = interpolate_time(event.index, self.times, self.primary_valid) {
                log::debug!(
                    "Entry {} : SBC method: {:.2}  Interp method: {:.2}  sbc-interp: {:.2}",
                    event.index,
                    seconds,
                    interp,
                    seconds - interp
                );
            }
            return Ok(EventTime {
                seconds,
                source: TimeSource::Secondary,
            });
        }

        let seconds = interpolate_time(event.index, self.times, self.primary_valid)?;
        log::debug!("Entry {} : Interp method: {:.2}", event.index, seconds);
        Ok(EventTime {
            seconds,
            source: TimeSource::Interpolated,
        })
    }
}

/// A scaler/SBC disagreement found by [`DesyncTracker`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Desync {
    pub primary_delta: f64,
    pub secondary_delta: f64,
    pub previous_difference: f64,
}

/// Follows the elapsed time on both clocks from event to event.
///
/// Events without a good reading on both clocks reset the previous reading to
/// zero, exactly as if the clocks had read zero.
#[derive(Debug, Clone, Default)]
pub struct DesyncTracker {
    prev_primary: f64,
    prev_secondary: f64,
    difference: f64,
}

impl DesyncTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Running primary - secondary difference, updated at each desync
    pub fn difference(&self) -> f64 {
        self.difference
    }

    /// Compare the elapsed times since the previous event.
    ///
    /// `primary` and `secondary` are the readings of this event when valid (the
    /// secondary one already offset adjusted). `checkable` gates the comparison
    /// itself; the previous readings are always advanced.
    pub fn update(
        &mut self,
        primary: Option<f64>,
        secondary: Option<f64>,
        checkable: bool,
    ) -> Option<Desync> {
        let primary = primary.unwrap_or(0.0);
        let secondary = secondary.unwrap_or(0.0);
        let mut result = None;
        if checkable && primary > 0.0 && secondary > 0.0 {
            let primary_delta = primary - self.prev_primary;
            let secondary_delta = secondary - self.prev_secondary;
            if (primary_delta - secondary_delta).abs() > DESYNC_TOLERANCE {
                result = Some(Desync {
                    primary_delta,
                    secondary_delta,
                    previous_difference: self.difference,
                });
                self.difference = primary - secondary;
            }
        }
        self.prev_primary = primary;
        self.prev_secondary = secondary;
        result
    }
}
