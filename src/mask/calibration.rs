use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::model::DepthRange;
use crate::error::{MaskError, Result};

/// Ping-number epoch of the current LSSS setup.
pub const DEFAULT_PING_EPOCH: i64 = 13_189_164_000;

/// Divisor applied to raw mask times before subtracting the epoch.
///
/// The example files store 100 ns ticks but label them milliseconds; the
/// divisor should become 10000 once that mismatch is fixed upstream.
pub const DEFAULT_PING_SCALE: i64 = 1000;

/// Empirical offset added to the start of every depth range.
pub const DEFAULT_DEPTH_OFFSET_MIN: f64 = 50.0;

/// Empirical offset added to the stop of every depth range.
pub const DEFAULT_DEPTH_OFFSET_MAX: f64 = 57.0;

// ---------------------------------------------------------------------------
// Ping clock – raw mask time → ping number
// ---------------------------------------------------------------------------

/// Maps a raw mask timestamp to the ping number LSSS uses.
pub trait PingClock: fmt::Debug {
    /// Fails when `time` has no representable ping number.
    fn ping_number(&self, time: f64) -> Result<i64>;
}

/// `floor(time / scale) - epoch`. Not calendar aware: it assumes the time
/// axis is a linear integer count compatible with the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearPingClock {
    pub scale: i64,
    pub epoch: i64,
}

impl Default for LinearPingClock {
    fn default() -> Self {
        LinearPingClock {
            scale: DEFAULT_PING_SCALE,
            epoch: DEFAULT_PING_EPOCH,
        }
    }
}

impl LinearPingClock {
    fn out_of_range(&self, time: f64) -> MaskError {
        MaskError::Decode(format!(
            "mask time {time} is out of range for ping scale {} and epoch {}",
            self.scale, self.epoch
        ))
    }
}

impl PingClock for LinearPingClock {
    fn ping_number(&self, time: f64) -> Result<i64> {
        let ticks = (time / self.scale as f64).floor();
        // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
        if !ticks.is_finite() || ticks < i64::MIN as f64 || ticks >= i64::MAX as f64 {
            return Err(self.out_of_range(time));
        }
        (ticks as i64)
            .checked_sub(self.epoch)
            .ok_or_else(|| self.out_of_range(time))
    }
}

// ---------------------------------------------------------------------------
// Depth correction
// ---------------------------------------------------------------------------

/// Fixed offsets applied to each `(start, stop)` depth pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthCorrection {
    pub min_offset: f64,
    pub max_offset: f64,
}

impl Default for DepthCorrection {
    fn default() -> Self {
        DepthCorrection {
            min_offset: DEFAULT_DEPTH_OFFSET_MIN,
            max_offset: DEFAULT_DEPTH_OFFSET_MAX,
        }
    }
}

impl DepthCorrection {
    pub fn apply(&self, start: f64, stop: f64) -> DepthRange {
        DepthRange {
            min: start + self.min_offset,
            max: stop + self.max_offset,
        }
    }
}

// ---------------------------------------------------------------------------
// Calibration – everything the transform needs
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Calibration {
    pub clock: Box<dyn PingClock>,
    pub depth: DepthCorrection,
}

impl Default for Calibration {
    fn default() -> Self {
        Calibration {
            clock: Box::new(LinearPingClock::default()),
            depth: DepthCorrection::default(),
        }
    }
}

impl Calibration {
    pub fn new(clock: impl PingClock + 'static, depth: DepthCorrection) -> Self {
        Calibration {
            clock: Box::new(clock),
            depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_clock_matches_observed_formula() {
        let clock = LinearPingClock::default();
        assert_eq!(clock.ping_number(100_000.0).unwrap(), 100 - 13_189_164_000);
        assert_eq!(clock.ping_number(100_999.0).unwrap(), 100 - 13_189_164_000);
        assert_eq!(clock.ping_number(13_189_218_001_000.0).unwrap(), 54_001);
    }

    #[test]
    fn custom_scale_is_honoured() {
        let clock = LinearPingClock {
            scale: 10_000,
            epoch: 0,
        };
        assert_eq!(clock.ping_number(123_456.0).unwrap(), 12);
    }

    #[test]
    fn times_outside_i64_range_are_rejected() {
        let clock = LinearPingClock::default();
        for time in [f64::MAX, f64::MIN, f64::NAN, f64::INFINITY, 1e40] {
            let err = clock.ping_number(time).unwrap_err();
            assert!(matches!(err, MaskError::Decode(_)), "{time}: {err}");
        }
    }

    #[test]
    fn epoch_subtraction_does_not_overflow() {
        let clock = LinearPingClock {
            scale: 1,
            epoch: -2048,
        };
        // 2^63 - 1024 fits in i64; adding 2048 for the negative epoch does not.
        let near_max = (i64::MAX - 1023) as f64;
        assert!(matches!(clock.ping_number(near_max), Err(MaskError::Decode(_))));
        assert_eq!(clock.ping_number(41.0).unwrap(), 2089);

        let clock = LinearPingClock {
            scale: 1,
            epoch: i64::MAX,
        };
        assert!(matches!(
            clock.ping_number(-10.0),
            Err(MaskError::Decode(_))
        ));
    }

    #[test]
    fn depth_correction_offsets_each_end() {
        let range = DepthCorrection::default().apply(10.0, 20.0);
        assert_eq!(range, DepthRange { min: 60.0, max: 77.0 });
    }
}
